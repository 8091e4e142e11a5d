//! Evaluate command - Run a saved agent greedily on the synthetic level

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    app::App,
    cli::{config::CommonArgs, output},
    pipeline::TrainingPipeline,
};

#[derive(Parser, Debug)]
#[command(about = "Evaluate a trained agent")]
pub struct EvaluateArgs {
    /// Path to trained agent file
    pub agent: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of evaluation episodes
    #[arg(long, short = 'e', default_value_t = 10)]
    pub episodes: usize,

    /// Bound the projection cache to this many entries
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// Export the report as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,
}

pub fn execute(args: EvaluateArgs) -> Result<()> {
    let config = args.common.load()?;
    let app = App::new();

    println!("Loading trained agent from: {}", args.agent.display());
    let mut agent = app
        .load_agent(&args.agent, args.cache_capacity)
        .with_context(|| format!("Failed to load agent from {}", args.agent.display()))?;
    let mut level = app.create_level(&config).context("Failed to create level")?;

    output::print_section("Agent");
    output::print_stats_table(&[
        ("Abstract states", &agent.abstractor().codebook_size().to_string()),
        (
            "Learned pairs",
            &output::format_number(agent.learner().table().len()),
        ),
    ]);

    let pipeline = TrainingPipeline::new(config.training.clone());
    let report = pipeline
        .evaluate(&mut level, &mut agent, args.episodes)
        .context("Evaluation failed")?;

    output::print_section("Evaluation");
    output::print_evaluation(&report);

    if let Some(path) = &args.export {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
        println!("\nExported report to {}", path.display());
    }

    Ok(())
}
