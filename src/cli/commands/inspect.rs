//! Inspect command - Summarize a saved agent without running it

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    app::App,
    cli::output,
    q_learning::{SavedAgent, ValueRecord},
    types::Action,
};

#[derive(Parser, Debug)]
#[command(about = "Inspect a saved agent")]
pub struct InspectArgs {
    /// Path to trained agent file
    pub agent: PathBuf,

    /// Number of highest-valued state-action pairs to list
    #[arg(long, short = 't', default_value_t = 10)]
    pub top: usize,
}

/// Records sorted by value, highest first.
fn top_records(saved: &SavedAgent, count: usize) -> Vec<ValueRecord> {
    let mut records = saved.values.records.clone();
    records.sort_by(|a, b| b.value.total_cmp(&a.value));
    records.truncate(count);
    records
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let app = App::new();
    let saved = app
        .agent_repository()
        .load(&args.agent)
        .with_context(|| format!("Failed to load agent from {}", args.agent.display()))?;

    output::print_section(&format!("Agent {}", args.agent.display()));
    let meta = &saved.metadata;
    let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "unknown".to_string());
    output::print_stats_table(&[
        (
            "Episodes trained",
            &or_unknown(meta.episodes_trained.map(output::format_number)),
        ),
        (
            "Batch size",
            &or_unknown(meta.batch_size.map(output::format_number)),
        ),
        ("Seed", &or_unknown(meta.seed.map(|s| s.to_string()))),
        ("Saved at (unix)", &or_unknown(meta.saved_at.map(|s| s.to_string()))),
        ("Environment", &or_unknown(meta.environment.clone())),
    ]);

    output::print_subsection("Abstraction");
    let basis = &saved.codebook.basis;
    let eigenvalues = basis
        .eigenvalues()
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(", ");
    output::print_stats_table(&[
        ("Feature length", &basis.dimension().to_string()),
        ("Components", &basis.components().to_string()),
        ("Eigenvalues", &eigenvalues),
        (
            "Prototypes",
            &output::format_number(saved.codebook.prototypes.len()),
        ),
    ]);

    output::print_subsection("Learning");
    let params = &saved.params;
    output::print_stats_table(&[
        ("Epsilon", &params.epsilon.to_string()),
        ("Alpha", &params.alpha.to_string()),
        ("Gamma", &params.gamma.to_string()),
        ("Initial value", &params.initial_value.to_string()),
        ("Greedy floor", &format!("{:?}", params.greedy_floor)),
        (
            "Learned pairs",
            &output::format_number(saved.values.records.len()),
        ),
    ]);

    let top = top_records(&saved, args.top);
    if !top.is_empty() {
        output::print_subsection("Highest values");
        println!("  {:>8}  {:<16} {:>12}", "state", "action", "value");
        for record in top {
            let action = Action::from_id(record.action_id)
                .map_or_else(|_| format!("#{}", record.action_id), |a| a.to_string());
            println!("  {:>8}  {:<16} {:>12.4}", record.state_id, action, record.value);
        }
    }

    Ok(())
}
