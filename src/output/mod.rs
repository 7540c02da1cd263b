//! Output sink abstraction layer
//!
//! The `EventSink` trait lets the export module write flattened events
//! without knowing the output format. A sink is prepared once with the
//! exporter's topic selection, then cycles through open / store / close for
//! every output file the module rotates through.
//!
//! Implementations:
//! - [`TextSink`]: line-oriented text records
//! - [`ParquetSink`]: one `snemodata` table row per event
//! - [`MemorySink`]: keeps events in memory, for tests and dry runs

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::export::constants::TopicLevel;
use crate::export::ExportEvent;
use crate::exporter::flags::ExportFlags;
use crate::parquet::{ColumnarExportEvent, ParquetTable, DEFAULT_FLUSH_ROWS};
use crate::text::TextEventWriter;

/// What a sink needs to know about the export before the first file opens.
#[derive(Clone, Debug, Default)]
pub struct SinkSetup {
    pub store_bits: ExportFlags,
    pub topics: BTreeMap<String, TopicLevel>,
    /// Interleave self-describing comment lines (text sink only).
    pub add_comments: bool,
}

/// Trait for abstracting event output formats (text, Parquet, ...)
pub trait EventSink {
    /// Called once, after the exporter is initialized and before any file
    /// is opened.
    fn prepare(&mut self, setup: &SinkSetup) -> Result<()>;

    /// Create `path`, truncating any existing file.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Write one event to the open file.
    fn store(&mut self, ee: &ExportEvent) -> Result<()>;

    /// Flush and close the open file. No-op when nothing is open.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn prepare(&mut self, setup: &SinkSetup) -> Result<()> {
        (**self).prepare(setup)
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        (**self).open(path)
    }

    fn store(&mut self, ee: &ExportEvent) -> Result<()> {
        (**self).store(ee)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Text records, one file at a time.
#[derive(Default)]
pub struct TextSink {
    writer: TextEventWriter,
    store_bits: ExportFlags,
    out: Option<(PathBuf, BufWriter<File>)>,
}

impl TextSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for TextSink {
    fn prepare(&mut self, setup: &SinkSetup) -> Result<()> {
        self.writer = TextEventWriter::new(setup.add_comments);
        self.store_bits = setup.store_bits;
        Ok(())
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        if let Some((current, _)) = &self.out {
            bail!("Text sink already has '{}' open", current.display());
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create text output: {}", path.display()))?;
        info!(path = %path.display(), "opened text output");
        self.out = Some((path.to_path_buf(), BufWriter::new(file)));
        Ok(())
    }

    fn store(&mut self, ee: &ExportEvent) -> Result<()> {
        let Some((path, out)) = &mut self.out else {
            bail!("Text sink has no open file");
        };
        self.writer
            .store(out, ee, self.store_bits)
            .with_context(|| format!("Failed to write event to {}", path.display()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some((path, mut out)) = self.out.take() {
            out.flush()
                .with_context(|| format!("Failed to flush text output: {}", path.display()))?;
            info!(path = %path.display(), "closed text output");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.out.is_some()
    }
}

/// Parquet tables built from the columnar export event.
pub struct ParquetSink {
    columnar: ColumnarExportEvent,
    flush_rows: usize,
    table: Option<ParquetTable>,
}

impl Default for ParquetSink {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_ROWS)
    }
}

impl ParquetSink {
    pub fn new(flush_rows: usize) -> Self {
        Self {
            columnar: ColumnarExportEvent::new(),
            flush_rows,
            table: None,
        }
    }

    pub fn columnar(&self) -> &ColumnarExportEvent {
        &self.columnar
    }
}

impl EventSink for ParquetSink {
    fn prepare(&mut self, setup: &SinkSetup) -> Result<()> {
        self.close()?;
        self.columnar = ColumnarExportEvent::new();
        self.columnar
            .construct(setup.store_bits, &setup.topics)
            .context("Failed to construct export columns")
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        if let Some(table) = &self.table {
            bail!("Parquet sink already has '{}' open", table.path().display());
        }
        let table = self
            .columnar
            .setup_table(path, self.flush_rows)
            .with_context(|| format!("Failed to create Parquet output: {}", path.display()))?;
        self.table = Some(table);
        Ok(())
    }

    fn store(&mut self, ee: &ExportEvent) -> Result<()> {
        let Some(table) = &mut self.table else {
            bail!("Parquet sink has no open file");
        };
        self.columnar
            .fill_memory(ee)
            .context("Failed to materialize event columns")?;
        self.columnar
            .commit_row(table)
            .with_context(|| format!("Failed to append row to {}", table.path().display()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(table) = self.table.take() {
            self.columnar.detach_branches();
            let path = table.path().to_path_buf();
            table
                .finish()
                .with_context(|| format!("Failed to finish Parquet output: {}", path.display()))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.table.is_some()
    }
}

/// Events stored in one output "file" of a [`MemorySink`].
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    pub path: PathBuf,
    pub events: Vec<ExportEvent>,
    pub closed: bool,
}

/// Keeps every stored event in memory, grouped by output file.
#[derive(Debug, Default)]
pub struct MemorySink {
    setup: Option<SinkSetup>,
    files: Vec<MemoryFile>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup(&self) -> Option<&SinkSetup> {
        self.setup.as_ref()
    }

    pub fn files(&self) -> &[MemoryFile] {
        &self.files
    }

    pub fn event_count(&self) -> usize {
        self.files.iter().map(|f| f.events.len()).sum()
    }

    fn current(&mut self) -> Option<&mut MemoryFile> {
        self.files.last_mut().filter(|f| !f.closed)
    }
}

impl EventSink for MemorySink {
    fn prepare(&mut self, setup: &SinkSetup) -> Result<()> {
        self.setup = Some(setup.clone());
        Ok(())
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        if self.is_open() {
            bail!("Memory sink already has a file open");
        }
        debug!(path = %path.display(), "opened memory output");
        self.files.push(MemoryFile {
            path: path.to_path_buf(),
            ..Default::default()
        });
        Ok(())
    }

    fn store(&mut self, ee: &ExportEvent) -> Result<()> {
        match self.current() {
            Some(file) => {
                file.events.push(ee.clone());
                Ok(())
            }
            None => bail!("Memory sink has no open file"),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.current() {
            file.closed = true;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.files.last().is_some_and(|f| !f.closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use std::fs;
    use tempfile::TempDir;

    fn header_only() -> SinkSetup {
        SinkSetup {
            store_bits: ExportFlags::EVENT_HEADER,
            ..Default::default()
        }
    }

    #[test]
    fn test_text_sink_writes_events() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let mut sink = TextSink::new();
        sink.prepare(&header_only()).unwrap();
        assert!(sink.store(&ExportEvent::new()).is_err());

        sink.open(&path).unwrap();
        assert!(sink.open(&path).is_err());
        let mut ee = ExportEvent::new();
        ee.event_header.run_number = 3;
        sink.store(&ee).unwrap();
        sink.store(&ee).unwrap();
        sink.close().unwrap();
        assert!(!sink.is_open());

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("0 1 \n").count(), 2);
        assert!(text.contains("0 3 -1 0 -1 -1 0 \n"));
    }

    #[test]
    fn test_parquet_sink_counts_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.parquet");
        let mut sink = ParquetSink::new(2);
        sink.prepare(&header_only()).unwrap();
        sink.open(&path).unwrap();
        for _ in 0..5 {
            sink.store(&ExportEvent::new()).unwrap();
        }
        sink.close().unwrap();
        sink.close().unwrap();

        let file = File::open(&path).unwrap();
        let reader = SerializedFileReader::new(file).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 5);
        assert_eq!(reader.metadata().num_row_groups(), 3);
    }

    #[test]
    fn test_parquet_sink_prepares_again() {
        let dir = TempDir::new().unwrap();
        let mut sink = ParquetSink::new(2);
        sink.prepare(&header_only()).unwrap();
        sink.open(&dir.path().join("a.parquet")).unwrap();
        sink.store(&ExportEvent::new()).unwrap();

        sink.prepare(&SinkSetup {
            store_bits: ExportFlags::ALL,
            ..Default::default()
        })
        .unwrap();
        assert!(!sink.is_open());
        assert!(sink.columnar().is_constructed());
        assert_eq!(sink.columnar().store_bits(), ExportFlags::ALL);
        sink.open(&dir.path().join("b.parquet")).unwrap();
        sink.store(&ExportEvent::new()).unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn test_memory_sink_groups_by_file() {
        let mut sink = MemorySink::new();
        sink.prepare(&header_only()).unwrap();
        sink.open(Path::new("a")).unwrap();
        sink.store(&ExportEvent::new()).unwrap();
        sink.close().unwrap();
        assert!(sink.store(&ExportEvent::new()).is_err());
        sink.open(Path::new("b")).unwrap();
        sink.store(&ExportEvent::new()).unwrap();
        sink.store(&ExportEvent::new()).unwrap();

        assert_eq!(sink.files().len(), 2);
        assert_eq!(sink.files()[1].events.len(), 2);
        assert!(sink.is_open());
        assert_eq!(sink.event_count(), 3);
    }
}
