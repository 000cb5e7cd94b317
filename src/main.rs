//! # rusty-eem
//!
//! Command-line front end for the EEM cache of a data directory.
//!
//! ```bash
//! # Remember the directory holding the instrument exports
//! rusty-eem set-path /data/eem
//!
//! # Ingest new exports into the raw and corrected caches
//! rusty-eem ingest --corrected
//!
//! # Emission spectra of two samples between 300 and 500 nm
//! rusty-eem series --sample "S1 FROM run1.csv" --sample "S2 FROM run1.csv" --em 300 500
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{StringArray, TimestampMicrosecondArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};
use log::info;

use rusty_eem::config::CONFIG_FILE;
use rusty_eem::query::ColorbarMode;
use rusty_eem::{
    AppConfig, CacheTable, CorrectionMode, SampleKey, Selection, WavelengthRange, Workspace,
};

/// Ingest, cache and query fluorescence excitation-emission matrices
#[derive(Parser)]
#[command(name = "rusty-eem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the data directory in the configuration file
    SetPath {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Ingest new exports into the raw cache (and the corrected one with --corrected)
    Ingest {
        #[command(flatten)]
        source: SourceArgs,

        /// Rebuild the cache from scratch
        #[arg(long)]
        purge: bool,
    },

    /// List the cached samples
    Show {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Write the flattened table ("<ex>EX/<em>EM" columns) as CSV to stdout
    Flat {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Emission spectra of the selected samples as JSON
    Series {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Contour grids of the selected samples as JSON
    Grids {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        query: QueryArgs,

        /// Omit per-panel colour scales
        #[arg(long)]
        hide_colorbar: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Data directory (defaults to `data_path` from the configuration)
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Use the scatter-corrected cache
    #[arg(long)]
    corrected: bool,
}

impl SourceArgs {
    fn mode(&self) -> CorrectionMode {
        if self.corrected {
            CorrectionMode::Corrected
        } else {
            CorrectionMode::Raw
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    /// Table position of a sample (repeatable)
    #[arg(short, long = "index", value_name = "N")]
    indices: Vec<usize>,

    /// Sample as "<Name> FROM <Batch>" (repeatable)
    #[arg(short, long = "sample", value_name = "LABEL", conflicts_with = "indices")]
    samples: Vec<String>,

    /// Emission window in nm
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [200.0, 800.0])]
    em: Vec<f64>,

    /// Excitation window in nm
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [200.0, 800.0])]
    ex: Vec<f64>,
}

impl QueryArgs {
    fn selection(&self) -> Result<Selection> {
        if !self.indices.is_empty() {
            return Ok(Selection::Indices(self.indices.clone()));
        }
        if self.samples.is_empty() {
            return Ok(Selection::All);
        }
        let keys = self
            .samples
            .iter()
            .map(|label| {
                SampleKey::parse_search_label(label)
                    .with_context(|| format!("expected \"<Name> FROM <Batch>\", got {label:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Selection::Samples(keys))
    }

    fn range(&self) -> WavelengthRange {
        WavelengthRange {
            emission: (self.em[0], self.em[1]),
            excitation: (self.ex[0], self.ex[1]),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to read {}", cli.config.display()))?;

    match cli.command {
        Commands::SetPath { dir } => run_set_path(&cli.config, config, dir),
        Commands::Ingest { source, purge } => run_ingest(config, &source, purge),
        Commands::Show { source } => run_show(config, &source),
        Commands::Flat { source } => run_flat(config, &source),
        Commands::Series { source, query } => run_series(config, &source, &query),
        Commands::Grids {
            source,
            query,
            hide_colorbar,
        } => run_grids(config, &source, &query, hide_colorbar),
    }
}

fn workspace(config: AppConfig, source: &SourceArgs) -> Result<Workspace> {
    let dir = match source.dir.clone().or_else(|| config.data_path.clone()) {
        Some(dir) => dir,
        None => bail!("No data directory given; pass --dir or run `rusty-eem set-path <DIR>`"),
    };
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    Ok(Workspace::new(dir, config))
}

fn run_set_path(config_path: &Path, config: AppConfig, dir: PathBuf) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let dir = dir.canonicalize()?;
    config
        .with_data_path(&dir)
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Data path set to {}", dir.display());
    Ok(())
}

fn run_ingest(config: AppConfig, source: &SourceArgs, purge: bool) -> Result<()> {
    let mut workspace = workspace(config, source)?;
    info!("Ingesting {}", workspace.data_dir().display());

    let modes: &[CorrectionMode] = if source.corrected {
        &[CorrectionMode::Raw, CorrectionMode::Corrected]
    } else {
        &[CorrectionMode::Raw]
    };
    for &mode in modes {
        let report = workspace.reload_mode(mode, purge)?;
        println!(
            "{:?}: {} files, {} new, {} records added",
            mode,
            report.files_found,
            report.new_files.len(),
            report.records_added
        );
        for name in &report.new_files {
            println!("  + {name}");
        }
    }
    Ok(())
}

/// One summary row per record: batch, name, time and axis lengths.
fn summary_batch(table: &CacheTable) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("#", DataType::UInt32, false),
        Field::new("batch", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new(
            "acquisition_time",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("excitations", DataType::UInt32, false),
        Field::new("emissions", DataType::UInt32, false),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(UInt32Array::from_iter_values(0..table.len() as u32)),
            Arc::new(StringArray::from_iter_values(table.iter().map(|r| r.batch.as_str()))),
            Arc::new(StringArray::from_iter_values(table.iter().map(|r| r.name.as_str()))),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    table.iter().map(|r| r.metadata.acquisition_time.timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
            Arc::new(UInt32Array::from_iter_values(
                table.iter().map(|r| r.metadata.excitation.len() as u32),
            )),
            Arc::new(UInt32Array::from_iter_values(
                table.iter().map(|r| r.metadata.emission.len() as u32),
            )),
        ],
    )?;
    Ok(batch)
}

fn run_show(config: AppConfig, source: &SourceArgs) -> Result<()> {
    let mut workspace = workspace(config, source)?;
    let table = workspace.table(source.mode())?;
    if table.is_empty() {
        println!("The cache is empty.");
        return Ok(());
    }
    println!("{}", pretty_format_batches(&[summary_batch(table)?])?);
    println!("{} records in {} batches", table.len(), table.batches().len());
    Ok(())
}

fn run_flat(config: AppConfig, source: &SourceArgs) -> Result<()> {
    let mut workspace = workspace(config, source)?;
    let flat = workspace.table(source.mode())?.flattened();

    let stdout = std::io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    let mut header = vec!["batch".to_string(), "name".to_string()];
    header.extend(flat.columns.iter().cloned());
    writer.write_record(&header)?;
    for (key, row) in flat.keys.iter().zip(&flat.rows) {
        let mut fields = vec![key.batch.clone(), key.name.clone()];
        fields.extend(row.iter().map(|v| if v.is_nan() { String::new() } else { v.to_string() }));
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn run_series(config: AppConfig, source: &SourceArgs, query: &QueryArgs) -> Result<()> {
    let mut workspace = workspace(config, source)?;
    let set = workspace.line_series(source.mode(), &query.selection()?, &query.range())?;
    print_json(&set)
}

fn run_grids(
    config: AppConfig,
    source: &SourceArgs,
    query: &QueryArgs,
    hide_colorbar: bool,
) -> Result<()> {
    let colorbar = if hide_colorbar {
        ColorbarMode::Hide
    } else {
        ColorbarMode::Individual
    };
    let mut workspace = workspace(config, source)?;
    let set = workspace.grids(source.mode(), &query.selection()?, &query.range(), colorbar)?;
    print_json(&set)
}
