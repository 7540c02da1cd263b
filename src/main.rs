//! snexport: export reconstructed events to text records or Parquet tables.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use snexport::export::registry;
use snexport::exporter::EventExporter;
use snexport::output::{EventSink, ParquetSink, TextSink};
use snexport::parquet::{ColumnarExportEvent, DEFAULT_FLUSH_ROWS};
use snexport::processing::files::{LIST_FILENAMES_KEY, MODE_KEY};
use snexport::processing::GEO_LABEL_KEY;
use snexport::source::{EventRecord, GeometryManager, GeometrySetup, Properties};
use snexport::{ExportModule, ProcessStatus, Services};

/// Geometry service label used when the configuration names none.
const DEFAULT_GEO_LABEL: &str = "geometry";

#[derive(Parser)]
#[command(name = "snexport")]
#[command(about = "Flattened export of reconstructed detector events")]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Parquet,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a JSON-lines event stream
    Export {
        /// Module configuration (flat JSON object)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Geometry setup (JSON); defaults to the built-in demonstrator layout
        #[arg(short, long)]
        geometry: Option<PathBuf>,

        /// Input events, one JSON object per line; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Output file; repeat to rotate through several files
        #[arg(short, long)]
        output: Vec<PathBuf>,

        /// Rows buffered per Parquet row group
        #[arg(long, default_value_t = DEFAULT_FLUSH_ROWS)]
        flush_rows: usize,
    },
    /// Print the layout of every exported record type
    Schema,
    /// Print the exporter setup and the column tree for a configuration
    Describe {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        geometry: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Properties> {
    match path {
        Some(path) => Properties::load_json(path),
        None => Ok(Properties::new()),
    }
}

fn load_geometry(path: Option<&Path>) -> Result<GeometrySetup> {
    match path {
        Some(path) => GeometrySetup::load_json(path),
        None => Ok(GeometrySetup::snemo()),
    }
}

fn run_export(
    config: Option<PathBuf>,
    geometry: Option<PathBuf>,
    input: Option<PathBuf>,
    format: Format,
    output: Vec<PathBuf>,
    flush_rows: usize,
) -> Result<()> {
    let mut setup = load_config(config.as_deref())?;
    if !output.is_empty() {
        setup.set_string(MODE_KEY, "list");
        setup.set_strings(
            LIST_FILENAMES_KEY,
            output.iter().map(|p| p.display().to_string()).collect(),
        );
    }
    if !setup.has_key(GEO_LABEL_KEY) {
        setup.set_string(GEO_LABEL_KEY, DEFAULT_GEO_LABEL);
    }
    let geo_label = setup.fetch_string(GEO_LABEL_KEY).unwrap_or(DEFAULT_GEO_LABEL);

    let mut services = Services::new();
    services.add_geometry(geo_label, Box::new(load_geometry(geometry.as_deref())?));

    let sink: Box<dyn EventSink> = match format {
        Format::Text => Box::new(TextSink::new()),
        Format::Parquet => Box::new(ParquetSink::new(flush_rows)),
    };
    let mut module = ExportModule::new("export", sink);
    module.initialize(&setup, &services)?;

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("Failed to open input events: {}", path.display())
        })?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut read = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input events")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event on input line {}", number + 1))?;
        read += 1;
        match module
            .process(&record)
            .with_context(|| format!("Failed to export event on input line {}", number + 1))?
        {
            ProcessStatus::Success => debug!(line = number + 1, "exported event"),
            ProcessStatus::Stop => {
                info!("output limits reached, ignoring the remaining events");
                break;
            }
            ProcessStatus::Fatal => bail!("No output file left for input line {}", number + 1),
        }
    }

    let stored = module.io_accounting().record_counter;
    module.reset()?;
    info!(read, stored, "export complete");
    Ok(())
}

fn run_schema() {
    for schema in registry().iter() {
        println!(
            "{} (version {}): {}",
            schema.type_name,
            schema.version,
            schema.description()
        );
    }
}

fn run_describe(config: Option<PathBuf>, geometry: Option<PathBuf>) -> Result<()> {
    let setup = load_config(config.as_deref())?;
    let geometry = load_geometry(geometry.as_deref())?;
    println!(
        "Geometry: '{}' (version {})",
        geometry.setup_label(),
        geometry.setup_version()
    );

    let mut exporter = EventExporter::new();
    exporter.set_geom_manager(&geometry)?;
    exporter.initialize(&setup.export_starting_with("export."))?;
    print!("{}", exporter.dump());

    let mut columnar = ColumnarExportEvent::new();
    columnar.construct(exporter.export_flags(), &exporter.topics())?;
    print!("{}", columnar.dump());
    println!(
        "{} columns, {} active",
        columnar.branches().len(),
        columnar.branches().active_count()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Export {
            config,
            geometry,
            input,
            format,
            output,
            flush_rows,
        } => run_export(config, geometry, input, format, output, flush_rows),
        Commands::Schema => {
            run_schema();
            Ok(())
        }
        Commands::Describe { config, geometry } => run_describe(config, geometry),
    }
}
