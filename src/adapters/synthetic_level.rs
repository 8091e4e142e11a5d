//! A small procedurally generated side-scrolling level.
//!
//! Stands in for a real game engine: flat ground broken by pits, walking
//! enemies that can be stomped or shot, and a finish line. Coordinates are
//! pixels with `y` growing downwards; tiles are 16 px.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    features::{AgentStatus, KillCounters, Observation, OccupancyGrid},
    ports::Environment,
    types::{Button, ButtonVector},
};

const TILE: f64 = 16.0;
/// Tile row whose top edge is the walking surface.
const GROUND_ROW: isize = 13;
const SURFACE_Y: f64 = GROUND_ROW as f64 * TILE;
const GRAVITY: f64 = 1.0;
const JUMP_VELOCITY: f64 = -9.0;
const MAX_FALL_SPEED: f64 = 12.0;
const WALK_SPEED: f64 = 2.0;
const RUN_SPEED: f64 = 4.0;
const ENEMY_SPEED: f64 = 0.5;
const CONTACT_RANGE: f64 = 12.0;
const FIRE_RANGE: f64 = 48.0;
const FIRE_COOLDOWN: u32 = 10;
/// Below this the agent is out of the level for good.
const DEATH_Y: f64 = 15.0 * TILE + 32.0;
/// Tiles at the start kept free of pits and enemies.
const SAFE_TILES: usize = 6;

/// Level generation and episode settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Level length in tiles; reaching the end finishes the episode
    pub length_tiles: usize,
    /// Chance that a tile starts a pit
    pub pit_chance: f64,
    /// Chance that a tile spawns an enemy
    pub enemy_chance: f64,
    /// Steps before the episode times out
    pub time_limit: usize,
    /// Side of the square observation grids
    pub grid_size: usize,
    /// Seed for level generation
    pub seed: u64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            length_tiles: 128,
            pit_chance: 0.06,
            enemy_chance: 0.05,
            time_limit: 2000,
            grid_size: 19,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Enemy {
    x: f64,
    alive: bool,
}

/// Deterministic synthetic platformer level.
#[derive(Debug, Clone)]
pub struct SyntheticLevel {
    config: LevelConfig,
    ground: Vec<bool>,
    spawn: Vec<f64>,
    enemies: Vec<Enemy>,
    x: f64,
    y: f64,
    vy: f64,
    on_ground: bool,
    mode: u8,
    kills: KillCounters,
    fire_cooldown: u32,
    steps: usize,
    dead: bool,
}

impl SyntheticLevel {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a level shorter than its
    /// safe start or an even grid size.
    pub fn new(config: LevelConfig) -> Result<Self> {
        if config.length_tiles <= SAFE_TILES {
            return Err(Error::invalid_config(format!(
                "level must be longer than {SAFE_TILES} tiles"
            )));
        }
        if config.grid_size % 2 == 0 {
            return Err(Error::invalid_config("observation grid size must be odd"));
        }
        let mut level = Self {
            config,
            ground: Vec::new(),
            spawn: Vec::new(),
            enemies: Vec::new(),
            x: 0.0,
            y: 0.0,
            vy: 0.0,
            on_ground: true,
            mode: 2,
            kills: KillCounters::default(),
            fire_cooldown: 0,
            steps: 0,
            dead: false,
        };
        level.generate();
        level.restart();
        Ok(level)
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Agent position in pixels.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Whether the agent crossed the finish line.
    pub fn reached_goal(&self) -> bool {
        self.x >= self.goal_x()
    }

    fn goal_x(&self) -> f64 {
        self.config.length_tiles as f64 * TILE
    }

    fn generate(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let n = self.config.length_tiles;
        self.ground = vec![true; n];
        self.spawn.clear();

        let mut tile = SAFE_TILES;
        while tile < n.saturating_sub(2) {
            if rng.random::<f64>() < self.config.pit_chance {
                let width = rng.random_range(2..=3);
                for t in tile..(tile + width).min(n - 2) {
                    self.ground[t] = false;
                }
                tile += width + 2;
                continue;
            }
            if rng.random::<f64>() < self.config.enemy_chance {
                self.spawn.push(tile as f64 * TILE + TILE / 2.0);
            }
            tile += 1;
        }
        debug!(
            seed = self.config.seed,
            pits = self.ground.iter().filter(|g| !**g).count(),
            enemies = self.spawn.len(),
            "synthetic level generated"
        );
    }

    fn restart(&mut self) {
        self.enemies = self
            .spawn
            .iter()
            .map(|&x| Enemy { x, alive: true })
            .collect();
        self.x = 32.0;
        self.y = SURFACE_Y;
        self.vy = 0.0;
        self.on_ground = true;
        self.mode = 2;
        self.kills = KillCounters::default();
        self.fire_cooldown = 0;
        self.steps = 0;
        self.dead = false;
    }

    fn has_ground(&self, col: isize) -> bool {
        match usize::try_from(col) {
            Ok(c) => self.ground.get(c).copied().unwrap_or(true),
            Err(_) => true,
        }
    }

    fn column(x: f64) -> isize {
        (x / TILE).floor() as isize
    }

    fn move_agent(&mut self, buttons: ButtonVector) {
        let speed = if buttons.is_pressed(Button::Speed) {
            RUN_SPEED
        } else {
            WALK_SPEED
        };
        let vx = match (
            buttons.is_pressed(Button::Left),
            buttons.is_pressed(Button::Right),
        ) {
            (true, false) => -speed,
            (false, true) => speed,
            _ => 0.0,
        };
        if buttons.is_pressed(Button::Jump) && self.on_ground {
            self.vy = JUMP_VELOCITY;
        }
        self.vy = (self.vy + GRAVITY).min(MAX_FALL_SPEED);

        let previous_y = self.y;
        self.x = (self.x + vx).max(0.0);
        self.y += self.vy;

        let landed = self.has_ground(Self::column(self.x))
            && self.y >= SURFACE_Y
            && previous_y <= SURFACE_Y;
        if landed {
            self.y = SURFACE_Y;
            self.vy = 0.0;
        }
        self.on_ground = landed;
    }

    fn shoot(&mut self, buttons: ButtonVector) {
        if self.fire_cooldown > 0 {
            self.fire_cooldown -= 1;
            return;
        }
        if self.mode < 2 || !buttons.is_pressed(Button::Speed) {
            return;
        }
        let x = self.x;
        let target = self
            .enemies
            .iter_mut()
            .filter(|e| e.alive && e.x > x && e.x - x <= FIRE_RANGE)
            .min_by(|a, b| a.x.total_cmp(&b.x));
        if let Some(enemy) = target {
            enemy.alive = false;
            self.kills.fire += 1;
            self.fire_cooldown = FIRE_COOLDOWN;
        }
    }

    fn resolve_contacts(&mut self) {
        let descending = self.vy > 0.0 && !self.on_ground;
        for enemy in self.enemies.iter_mut().filter(|e| e.alive) {
            enemy.x -= ENEMY_SPEED;
            if (enemy.x - self.x).abs() >= CONTACT_RANGE || self.y < SURFACE_Y - 2.0 * TILE {
                continue;
            }
            enemy.alive = false;
            if descending {
                self.kills.stomp += 1;
                self.vy = JUMP_VELOCITY / 2.0;
            } else if self.mode == 0 {
                self.dead = true;
            } else {
                self.mode -= 1;
            }
        }
    }

    fn grid(&self, occupied: impl Fn(isize, isize) -> bool) -> OccupancyGrid {
        let size = self.config.grid_size;
        let centre = (size / 2) as isize;
        let agent_row = ((self.y - 1.0) / TILE).floor() as isize;
        let agent_col = Self::column(self.x);
        let mut grid = OccupancyGrid::new(size, size);
        for r in 0..size {
            for c in 0..size {
                let row = agent_row + r as isize - centre;
                let col = agent_col + c as isize - centre;
                if occupied(row, col) {
                    grid.set(r, c, 1);
                }
            }
        }
        grid
    }
}

impl Environment for SyntheticLevel {
    fn reset(&mut self) -> Result<()> {
        self.restart();
        Ok(())
    }

    fn observe(&self) -> Result<Observation> {
        let terrain = self.grid(|row, col| row >= GROUND_ROW && self.has_ground(col));
        let enemies = self.grid(|row, col| {
            row == GROUND_ROW - 1
                && self
                    .enemies
                    .iter()
                    .any(|e| e.alive && Self::column(e.x) == col)
        });
        Ok(Observation {
            terrain,
            enemies,
            status: AgentStatus {
                mode: self.mode,
                can_jump: self.on_ground,
                on_ground: self.on_ground,
                can_shoot: self.mode == 2 && self.fire_cooldown == 0,
            },
            position: (self.x, self.y),
            kills: self.kills,
        })
    }

    fn apply(&mut self, buttons: ButtonVector) -> Result<()> {
        if self.is_finished() {
            return Err(Error::Environment {
                message: "episode is over; reset before applying actions".to_string(),
            });
        }
        self.move_agent(buttons);
        self.shoot(buttons);
        self.resolve_contacts();
        self.steps += 1;
        if self.dead {
            debug!(x = self.x, "agent lost its last life");
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.dead
            || self.y > DEATH_Y
            || self.reached_goal()
            || self.steps >= self.config.time_limit
    }

    fn set_seed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.generate();
        self.restart();
    }
}
