//! Raw observation types supplied by an environment each step.

use serde::{Deserialize, Serialize};

/// Row-major occupancy grid centred on the agent.
///
/// Non-zero cells are occupied. The agent sits at `(height / 2, width / 2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl OccupancyGrid {
    /// Empty grid of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    /// Build from nested rows. Short rows are padded with empty cells.
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(width, height);
        for (r, row) in rows.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                grid.cells[r * width + c] = cell;
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell value, `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Set a cell; out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = value;
        }
    }

    /// Occupancy of the cell at a signed offset from the agent cell.
    pub fn occupied_at_offset(&self, row_offset: isize, col_offset: isize) -> bool {
        let row = (self.height / 2) as isize + row_offset;
        let col = (self.width / 2) as isize + col_offset;
        if row < 0 || col < 0 {
            return false;
        }
        self.get(row as usize, col as usize)
            .is_some_and(|cell| cell != 0)
    }
}

/// Agent status flags reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Power-mode level (0 = small, 1 = large, 2 = fire).
    pub mode: u8,
    pub can_jump: bool,
    pub on_ground: bool,
    pub can_shoot: bool,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self {
            mode: 2,
            can_jump: true,
            on_ground: true,
            can_shoot: true,
        }
    }
}

/// Cumulative kill counters since the start of the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KillCounters {
    pub stomp: u32,
    pub fire: u32,
    pub shell: u32,
}

/// Everything the environment exposes for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub terrain: OccupancyGrid,
    pub enemies: OccupancyGrid,
    pub status: AgentStatus,
    /// Agent position `(x, y)`; `y` grows downwards.
    pub position: (f64, f64),
    pub kills: KillCounters,
}
