//! Export command - Export parts of a saved agent in various formats

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use crate::{app::App, q_learning::SavedAgent};

#[derive(Parser, Debug)]
#[command(about = "Export data in various formats")]
pub struct ExportArgs {
    /// Type of data to export
    #[arg(value_enum)]
    pub data_type: DataType,

    /// Path to trained agent file
    pub agent: PathBuf,

    /// Output file path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Export format (some combinations not supported)
    #[arg(long, short = 'f', default_value = "json")]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataType {
    /// Learned state-action values
    Values,
    /// PCA basis and prototypes
    Codebook,
    /// Extractor settings and learning parameters
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// MessagePack format
    Msgpack,
}

pub fn execute(args: ExportArgs) -> Result<()> {
    let app = App::new();
    let saved = app
        .agent_repository()
        .load(&args.agent)
        .with_context(|| format!("Failed to load agent from {}", args.agent.display()))?;

    export(&saved, args.data_type, args.format, &args.output)?;
    println!(
        "Exported {:?} as {:?} to {}",
        args.data_type,
        args.format,
        args.output.display()
    );
    Ok(())
}

/// Write one part of `saved` to `output`.
pub fn export(
    saved: &SavedAgent,
    data_type: DataType,
    format: ExportFormat,
    output: &Path,
) -> Result<()> {
    match (data_type, format) {
        (DataType::Values, ExportFormat::Csv) => {
            let table = saved.value_table()?;
            table.write_csv(create(output)?)?;
        }
        (DataType::Values, ExportFormat::Msgpack) => {
            let blob = saved.value_table()?.export()?;
            write_bytes(output, &blob)?;
        }
        (DataType::Values, ExportFormat::Json) => write_json(output, &saved.values)?,
        (DataType::Codebook, ExportFormat::Msgpack) => saved.codebook.save_to_file(output)?,
        (DataType::Codebook, ExportFormat::Json) => write_json(output, &saved.codebook)?,
        (DataType::Config, ExportFormat::Json) => write_json(
            output,
            &serde_json::json!({
                "extractor": saved.extractor,
                "learning": saved.params,
                "metadata": saved.metadata,
            }),
        )?,
        (data_type, format) => bail!("Cannot export {data_type:?} as {format:?}"),
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut writer = create(path)?;
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
