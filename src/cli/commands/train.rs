//! Train command - Collect a batch, build the state abstraction, run Q-learning

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::{
    app::{AgentConfig, App},
    cli::{config::CommonArgs, output},
    pipeline::{
        EvaluationReport, JsonlObserver, ProgressObserver, TrainingPipeline, TrainingResult,
    },
    q_learning::{GreedyFloor, TrainingMetadata},
};

#[derive(Debug, Serialize)]
struct TrainingSummaryFile<'a> {
    training: &'a TrainingResult,
    evaluation: Option<&'a EvaluationReport>,
    config: &'a AgentConfig,
}

fn sanitize_summary_path(raw: &Path) -> PathBuf {
    let mut normalized = raw.to_path_buf();
    let raw_str = raw.as_os_str().to_string_lossy();

    // Trailing separator or no file name means a directory target.
    if raw_str.ends_with(std::path::MAIN_SEPARATOR) || normalized.file_name().is_none() {
        normalized.push("training_summary.json");
        return normalized;
    }

    match normalized.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => normalized,
        _ => {
            normalized.set_extension("json");
            normalized
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Train a Q-learning agent", allow_negative_numbers = true)]
pub struct TrainArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of learning episodes
    #[arg(long, short = 'e')]
    pub episodes: Option<usize>,

    /// Feature vectors collected to train the abstraction
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Random-policy episodes used for batch collection
    #[arg(long)]
    pub collection_episodes: Option<usize>,

    /// Number of PCA components
    #[arg(long)]
    pub components: Option<usize>,

    /// Number of prototypes (negative keeps every projected sample)
    #[arg(long)]
    pub clusters: Option<i64>,

    /// K-means iterations
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Bound the projection cache to this many entries
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// Exploration rate
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Learning rate
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Discount factor
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Value of unseen state-action pairs
    #[arg(long)]
    pub initial_value: Option<f64>,

    /// Start the greedy search at zero and fall back to Stay
    #[arg(long, default_value_t = false)]
    pub legacy_greedy: bool,

    /// Output file for the trained agent
    #[arg(long, short = 'O')]
    pub output: Option<PathBuf>,

    /// Optional file for JSONL episode observations
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Optional path for writing a summary JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Greedy evaluation episodes to run after training
    #[arg(long, default_value_t = 0)]
    pub eval_episodes: usize,

    /// Show progress bar
    #[arg(long, default_value_t = true)]
    pub progress: bool,
}

impl TrainArgs {
    fn config(&self) -> Result<AgentConfig> {
        let mut config = self.common.load()?;
        if let Some(episodes) = self.episodes {
            config = config.with_episodes(episodes);
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(collection_episodes) = self.collection_episodes {
            config.training.collection_episodes = collection_episodes;
        }
        if let Some(components) = self.components {
            config = config.with_components(components);
        }
        if let Some(clusters) = self.clusters {
            config = config.with_clusters(clusters);
        }
        if let Some(iterations) = self.iterations {
            config = config.with_cluster_iterations(iterations);
        }
        if let Some(capacity) = self.cache_capacity {
            config = config.with_cache_capacity(capacity);
        }
        if let Some(epsilon) = self.epsilon {
            config = config.with_epsilon(epsilon);
        }
        if let Some(alpha) = self.alpha {
            config = config.with_alpha(alpha);
        }
        if let Some(gamma) = self.gamma {
            config = config.with_gamma(gamma);
        }
        if let Some(initial_value) = self.initial_value {
            config = config.with_initial_value(initial_value);
        }
        if self.legacy_greedy {
            config = config.with_greedy_floor(GreedyFloor::Zero);
        }
        config.validate().context("Invalid training configuration")?;
        Ok(config)
    }
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let config = args.config()?;
    let app = App::new();

    output::print_section("Training Q-learning agent");
    output::print_stats_table(&[
        ("Episodes", &output::format_number(config.training.episodes)),
        ("Batch size", &output::format_number(config.training.batch_size)),
        ("Components", &config.abstraction.components.to_string()),
        ("Clusters", &config.abstraction.clusters.to_string()),
        (
            "Seed",
            &config
                .seed
                .map_or_else(|| "random".to_string(), |s| s.to_string()),
        ),
    ]);

    let mut agent = app
        .create_agent(&config)
        .context("Failed to create agent")?;
    let mut level = app
        .create_level(&config)
        .context("Failed to create level")?;

    let mut pipeline = TrainingPipeline::new(config.training.clone());
    if args.progress {
        pipeline = pipeline.with_observer(Box::new(ProgressObserver::new()));
    }
    if let Some(path) = &args.observations {
        let observer = JsonlObserver::new(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        pipeline = pipeline.with_observer(Box::new(observer));
    }

    let result = pipeline
        .run(&mut level, &mut agent)
        .context("Training failed")?;

    output::print_subsection("Training results");
    output::print_stats_table(&[
        ("Abstract states", &output::format_number(result.codebook_size)),
        ("Learned pairs", &output::format_number(result.learned_pairs)),
        ("Mean reward", &format!("{:.2}", result.mean_reward)),
        ("Best distance", &format!("{:.1}", result.best_distance)),
        (
            "Deaths",
            &format!("{}/{}", result.terminal_episodes, result.episodes),
        ),
        (
            "Cache hits",
            &format!("{}/{}", result.cache.hits, result.cache.hits + result.cache.misses),
        ),
    ]);

    let evaluation = if args.eval_episodes > 0 {
        let report = pipeline
            .evaluate(&mut level, &mut agent, args.eval_episodes)
            .context("Evaluation failed")?;
        output::print_subsection("Greedy evaluation");
        output::print_evaluation(&report);
        Some(report)
    } else {
        None
    };

    if let Some(path) = &args.output {
        let metadata = TrainingMetadata {
            episodes_trained: Some(result.episodes),
            batch_size: Some(result.batch_size),
            seed: config.seed,
            saved_at: None,
            environment: Some("synthetic-level".to_string()),
        };
        app.save_agent(&agent, metadata, path)
            .with_context(|| format!("Failed to save agent to {}", path.display()))?;
        println!("\nSaved agent to {}", path.display());
    }

    if let Some(raw) = &args.summary {
        let path = sanitize_summary_path(raw);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        to_writer_pretty(
            file,
            &TrainingSummaryFile {
                training: &result,
                evaluation: evaluation.as_ref(),
                config: &config,
            },
        )?;
        println!("Wrote summary to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_path_gets_json_extension() {
        assert_eq!(
            sanitize_summary_path(Path::new("out/summary")),
            PathBuf::from("out/summary.json")
        );
        assert_eq!(
            sanitize_summary_path(Path::new("out/run.JSON")),
            PathBuf::from("out/run.JSON")
        );
    }

    #[test]
    fn test_summary_path_directory_target() {
        let raw = format!("out{}", std::path::MAIN_SEPARATOR);
        assert_eq!(
            sanitize_summary_path(Path::new(&raw)),
            PathBuf::from("out").join("training_summary.json")
        );
    }

    #[test]
    fn test_overrides_reach_config() {
        let args = TrainArgs::parse_from([
            "train",
            "--clusters",
            "-1",
            "--episodes",
            "3",
            "--legacy-greedy",
            "--seed",
            "7",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.abstraction.clusters, -1);
        assert_eq!(config.training.episodes, 3);
        assert_eq!(config.learning.greedy_floor, GreedyFloor::Zero);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = TrainArgs::parse_from(["train", "--gamma", "2.0"]);
        assert!(args.config().is_err());
    }
}
