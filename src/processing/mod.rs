//! Export module: drives the exporter and a sink over an event stream,
//! rotating output files.
//!
//! The module owns the output files. It opens the next name of its file list
//! lazily on the first event after a rotation, and stops once a record or
//! file limit is reached or the last name has been filled.

pub mod files;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, info, trace, warn};

use crate::export::ExportEvent;
use crate::exporter::EventExporter;
use crate::output::{EventSink, SinkSetup};
use crate::source::data::EventRecord;
use crate::source::geom::GeometryManager;
use crate::source::properties::Properties;

pub use files::FilenameList;

pub const GEO_LABEL_KEY: &str = "Geo_label";
pub const USE_ASCII_COMMENTS_KEY: &str = "use_ascii_comments";
pub const MAX_RECORDS_TOTAL_KEY: &str = "max_records_total";
pub const MAX_RECORDS_PER_FILE_KEY: &str = "max_records_per_file";
pub const MAX_FILES_KEY: &str = "max_files";
const EXPORTER_PREFIX: &str = "export.";

/// Outcome of processing one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The event was stored.
    Success,
    /// Output is complete; the event was not stored.
    Stop,
    /// No output file is left to store the event in.
    Fatal,
}

/// Named services available to modules at initialization.
#[derive(Default)]
pub struct Services {
    geometry: BTreeMap<String, Box<dyn GeometryManager>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, label: impl Into<String>, manager: Box<dyn GeometryManager>) {
        self.geometry.insert(label.into(), manager);
    }

    pub fn geometry(&self, label: &str) -> Option<&dyn GeometryManager> {
        self.geometry.get(label).map(|g| g.as_ref())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.geometry.keys().map(String::as_str)
    }
}

/// Module settings read from a property bag.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleConfig {
    pub files: FilenameList,
    pub geo_label: String,
    pub use_ascii_comments: bool,
    /// Zero means unlimited for the three limits.
    pub max_records_total: u64,
    pub max_records_per_file: u64,
    pub max_files: u64,
    /// `export.*` keys forwarded to the exporter.
    pub exporter: Properties,
}

fn limit(setup: &Properties, key: &str) -> u64 {
    setup.fetch_integer(key).map_or(0, |v| v.max(0) as u64)
}

impl ModuleConfig {
    pub fn from_properties(setup: &Properties) -> Result<Self> {
        let files = FilenameList::from_properties(setup).context("Invalid list of file names")?;
        ensure!(!files.is_empty(), "Invalid list of file names");
        let geo_label = setup
            .fetch_string(GEO_LABEL_KEY)
            .with_context(|| format!("Missing '{GEO_LABEL_KEY}' property"))?
            .to_string();
        Ok(Self {
            files,
            geo_label,
            use_ascii_comments: setup.has_flag(USE_ASCII_COMMENTS_KEY),
            max_records_total: limit(setup, MAX_RECORDS_TOTAL_KEY),
            max_records_per_file: limit(setup, MAX_RECORDS_PER_FILE_KEY),
            max_files: limit(setup, MAX_FILES_KEY),
            exporter: setup.export_starting_with(EXPORTER_PREFIX),
        })
    }
}

/// Record and file counters of a running module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoAccounting {
    pub max_records_per_file: u64,
    pub max_records_total: u64,
    pub max_files: u64,
    pub terminated: bool,
    pub file_record_counter: u64,
    pub record_counter: u64,
    /// Index of the current (or last used) file name.
    pub file_index: Option<usize>,
}

impl IoAccounting {
    fn from_config(config: &ModuleConfig) -> Self {
        Self {
            max_records_per_file: config.max_records_per_file,
            max_records_total: config.max_records_total,
            max_files: config.max_files,
            ..Default::default()
        }
    }

    fn next_file_index(&self) -> usize {
        self.file_index.map_or(0, |i| i + 1)
    }

    fn files_used(&self) -> u64 {
        self.next_file_index() as u64
    }
}

/// Exports events through `S`, one file of the configured list at a time.
pub struct ExportModule<'g, S: EventSink> {
    name: String,
    sink: S,
    exporter: EventExporter<'g>,
    config: Option<ModuleConfig>,
    io: IoAccounting,
    event: ExportEvent,
}

impl<'g, S: EventSink> ExportModule<'g, S> {
    pub fn new(name: impl Into<String>, sink: S) -> Self {
        Self {
            name: name.into(),
            sink,
            exporter: EventExporter::new(),
            config: None,
            io: IoAccounting::default(),
            event: ExportEvent::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn is_terminated(&self) -> bool {
        self.io.terminated
    }

    pub fn io_accounting(&self) -> &IoAccounting {
        &self.io
    }

    pub fn exporter(&self) -> &EventExporter<'g> {
        &self.exporter
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The last exported event.
    pub fn last_event(&self) -> &ExportEvent {
        &self.event
    }

    pub fn initialize(&mut self, setup: &Properties, services: &'g Services) -> Result<()> {
        ensure!(
            !self.is_initialized(),
            "Module '{}' is already initialized",
            self.name
        );
        let config = ModuleConfig::from_properties(setup)
            .with_context(|| format!("Module '{}' has an invalid setup", self.name))?;

        let Some(geometry) = services.geometry(&config.geo_label) else {
            bail!(
                "Module '{}' has no '{}' geometry service",
                self.name,
                config.geo_label
            );
        };
        let mut exporter = EventExporter::new();
        exporter.set_geom_manager(geometry)?;
        exporter.initialize(&config.exporter)?;

        self.sink.prepare(&SinkSetup {
            store_bits: exporter.export_flags(),
            topics: exporter.topics(),
            add_comments: config.use_ascii_comments,
        })?;

        info!(
            module = %self.name,
            files = %config.files,
            flags = %exporter.export_flags(),
            "export module initialized"
        );
        self.exporter = exporter;
        self.io = IoAccounting::from_config(&config);
        self.config = Some(config);
        Ok(())
    }

    /// Close any open file and return to the uninitialized state.
    pub fn reset(&mut self) -> Result<()> {
        ensure!(self.is_initialized(), "Module '{}' is not initialized", self.name);
        let closed = self.sink.close();
        self.config = None;
        self.io = IoAccounting::default();
        self.event.clear_data();
        self.exporter
            .reset()
            .with_context(|| format!("Failed to reset exporter of module '{}'", self.name))?;
        closed
    }

    pub fn process(&mut self, record: &EventRecord) -> Result<ProcessStatus> {
        let Some(config) = &self.config else {
            bail!("Module '{}' is not initialized", self.name);
        };
        if self.io.terminated {
            return Ok(ProcessStatus::Stop);
        }

        if !self.sink.is_open() {
            let index = self.io.next_file_index();
            let Some(path) = config.files.get(index) else {
                warn!(module = %self.name, index, "no output file left");
                return Ok(ProcessStatus::Fatal);
            };
            self.io.file_index = Some(index);
            ensure_parent_dir(&path)?;
            self.sink.open(&path)?;
            self.io.file_record_counter = 0;
        }

        self.exporter
            .run(record, &mut self.event)
            .context("Failed to export event")?;
        self.sink.store(&self.event)?;
        self.io.file_record_counter += 1;
        self.io.record_counter += 1;
        trace!(
            file_records = self.io.file_record_counter,
            records = self.io.record_counter,
            "stored event"
        );

        let mut stop_file = false;
        let mut stop_output = false;
        if self.io.max_records_total > 0 && self.io.record_counter >= self.io.max_records_total {
            info!(
                module = %self.name,
                max = self.io.max_records_total,
                "reached the maximum number of stored records"
            );
            stop_file = true;
            stop_output = true;
        }
        if self.io.max_records_per_file > 0
            && self.io.file_record_counter >= self.io.max_records_per_file
        {
            info!(
                module = %self.name,
                max = self.io.max_records_per_file,
                "reached the maximum number of records in the current file"
            );
            stop_file = true;
        }

        if stop_file {
            self.sink.close()?;
            self.io.file_record_counter = 0;
            if self.io.max_files > 0 && self.io.files_used() >= self.io.max_files {
                info!(module = %self.name, max = self.io.max_files, "reached the maximum number of files");
                stop_output = true;
            }
            if self.io.file_index.is_some_and(|i| config.files.is_last(i)) {
                info!(module = %self.name, "filled the last output file");
                stop_output = true;
            }
        }
        if stop_output {
            self.io.terminated = true;
        }
        Ok(ProcessStatus::Success)
    }
}

impl<S: EventSink> Drop for ExportModule<'_, S> {
    fn drop(&mut self) {
        if self.is_initialized() {
            if let Err(e) = self.reset() {
                warn!(module = %self.name, "failed to close output: {e:#}");
            }
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        ensure!(dir.is_dir(), "Path '{}' is not a directory", dir.display());
        debug!(dir = %dir.display(), "output directory already exists");
        return Ok(());
    }
    info!(dir = %dir.display(), "creating output directory");
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemorySink, ParquetSink};
    use crate::source::data::{Bank, EventHeaderData};
    use crate::source::geom::GeometrySetup;

    fn services() -> Services {
        let mut services = Services::new();
        services.add_geometry("geometry", Box::new(GeometrySetup::snemo()));
        services
    }

    fn setup(files: &[&str]) -> Properties {
        let mut setup = Properties::new();
        setup.set_string(GEO_LABEL_KEY, "geometry");
        setup.set_string(files::MODE_KEY, "list");
        setup.set_strings(
            files::LIST_FILENAMES_KEY,
            files.iter().map(|f| f.to_string()).collect(),
        );
        setup.set_flag("export.event_header");
        setup
    }

    fn record(event_number: i32) -> EventRecord {
        let mut record = EventRecord::new();
        record.add(
            "EH",
            Bank::EventHeader(EventHeaderData {
                run_number: 1,
                event_number,
                ..Default::default()
            }),
        );
        record
    }

    fn file_sizes(module: &ExportModule<'_, MemorySink>) -> Vec<usize> {
        module.sink().files().iter().map(|f| f.events.len()).collect()
    }

    #[test]
    fn test_initialize_requirements() {
        let services = services();
        let mut module = ExportModule::new("export", MemorySink::new());
        assert!(module.process(&record(0)).is_err());

        let mut bad = setup(&["a"]);
        bad.set_string(GEO_LABEL_KEY, "nope");
        assert!(module.initialize(&bad, &services).is_err());
        bad.remove(GEO_LABEL_KEY);
        assert!(module.initialize(&bad, &services).is_err());
        assert!(module.reset().is_err());

        module.initialize(&setup(&["a"]), &services).unwrap();
        assert!(module.initialize(&setup(&["a"]), &services).is_err());
        let prepared = module.sink().setup().unwrap();
        assert_eq!(prepared.store_bits, crate::exporter::ExportFlags::EVENT_HEADER);
        module.reset().unwrap();
        assert!(!module.is_initialized());
    }

    #[test]
    fn test_records_per_file_rotation() {
        let services = services();
        let mut setup = setup(&["a", "b", "c"]);
        setup.set_integer(MAX_RECORDS_PER_FILE_KEY, 2);
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup, &services).unwrap();

        let statuses: Vec<_> = (0..8).map(|i| module.process(&record(i)).unwrap()).collect();
        assert_eq!(&statuses[..6], &[ProcessStatus::Success; 6]);
        assert_eq!(&statuses[6..], &[ProcessStatus::Stop; 2]);
        assert!(module.is_terminated());
        assert_eq!(file_sizes(&module), vec![2, 2, 2]);
        assert!(module.sink().files().iter().all(|f| f.closed));
        assert_eq!(module.last_event().event_header.event_number, 5);
    }

    #[test]
    fn test_total_and_file_limits() {
        let services = services();
        let mut setup = setup(&["a", "b", "c"]);
        setup.set_integer(MAX_RECORDS_PER_FILE_KEY, 2);
        setup.set_integer(MAX_RECORDS_TOTAL_KEY, 3);
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup, &services).unwrap();
        for i in 0..5 {
            module.process(&record(i)).unwrap();
        }
        assert_eq!(file_sizes(&module), vec![2, 1]);
        assert_eq!(module.io_accounting().record_counter, 3);

        let mut setup = self::setup(&["a", "b", "c"]);
        setup.set_integer(MAX_RECORDS_PER_FILE_KEY, 1);
        setup.set_integer(MAX_FILES_KEY, 2);
        setup.set_integer(MAX_RECORDS_TOTAL_KEY, -5);
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup, &services).unwrap();
        for i in 0..5 {
            module.process(&record(i)).unwrap();
        }
        assert_eq!(file_sizes(&module), vec![1, 1]);
        assert_eq!(module.io_accounting().max_records_total, 0);
    }

    #[test]
    fn test_unlimited_single_file() {
        let services = services();
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup(&["only"]), &services).unwrap();
        for i in 0..10 {
            assert_eq!(module.process(&record(i)).unwrap(), ProcessStatus::Success);
        }
        assert!(module.sink().is_open());
        assert_eq!(file_sizes(&module), vec![10]);
        module.reset().unwrap();
        assert!(!module.sink().is_open());
    }

    #[test]
    fn test_missing_bank_is_an_error() {
        let services = services();
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup(&["a"]), &services).unwrap();
        assert!(module.process(&EventRecord::new()).is_err());
    }

    #[test]
    fn test_reset_unbinds_exporter() {
        let services = services();
        let mut module = ExportModule::new("export", MemorySink::new());
        module.initialize(&setup(&["a"]), &services).unwrap();
        assert!(module.exporter().is_initialized());
        assert!(module.exporter().has_geom_manager());
        module.reset().unwrap();
        assert!(!module.exporter().is_initialized());
        assert!(!module.exporter().has_geom_manager());
    }

    #[test]
    fn test_parquet_module_reinitialize() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = dir.path().join("first.parquet").display().to_string();
        let second = dir.path().join("second.parquet").display().to_string();
        let services = services();
        let mut module = ExportModule::new("export", ParquetSink::default());

        module.initialize(&setup(&[&first]), &services).unwrap();
        module.process(&record(0)).unwrap();
        module.reset().unwrap();

        module.initialize(&setup(&[&second]), &services).unwrap();
        assert!(module.sink().columnar().is_constructed());
        assert_eq!(module.process(&record(1)).unwrap(), ProcessStatus::Success);
        module.reset().unwrap();
        assert!(dir.path().join("first.parquet").exists());
        assert!(dir.path().join("second.parquet").exists());
    }
}
