//! Line-oriented text sink.
//!
//! One event renders as:
//! - `<format_version> <flags> ` on the first line;
//! - for the header, one line `<record_version> <field> <field> ... `;
//! - for each collection, a line holding the element count followed by one
//!   record line per element.
//!
//! Every token is followed by a single space and an empty line closes the
//! event. With comments enabled, `#@record_begin:`, `#@data:` and
//! `#@record_end:` lines describe each block for self-describing readers.

use std::fmt::{self, Write as _};
use std::io;

use crate::error::{ExportError, Result};
use crate::export::constants::EXPORT_EVENT_VERSION;
use crate::export::event::BankView;
use crate::export::schema::registry;
use crate::export::ExportEvent;
use crate::exporter::flags::ExportFlags;

/// Topic blocks written by the text sink, in output order.
///
/// Clustering and trajectory banks have no text representation.
const SECTIONS: [(ExportFlags, &str, &[&str]); 6] = [
    (ExportFlags::EVENT_HEADER, "eventRecord/header", &["header"]),
    (
        ExportFlags::TRUE_PARTICLES,
        "eventRecord/trueParticles",
        &["trueVertices", "trueParticles"],
    ),
    (ExportFlags::TRUE_STEP_HITS, "eventRecord/trueStepHits", &["trueStepHits"]),
    (
        ExportFlags::TRUE_HITS,
        "eventRecord/trueHits",
        &["trueCaloHits", "trueXcaloHits", "trueGvetoHits", "trueGgHits"],
    ),
    (
        ExportFlags::CALIB_CALORIMETER_HITS,
        "eventRecord/calibScinHits",
        &["calibScinHits"],
    ),
    (
        ExportFlags::CALIB_TRACKER_HITS,
        "eventRecord/calibTrackerHits",
        &["calibTrackerHits"],
    ),
];

const EVENT_TAG: &str = "eventRecord";

/// Renders export events as text records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextEventWriter {
    add_comments: bool,
}

impl TextEventWriter {
    pub fn new(add_comments: bool) -> Self {
        Self { add_comments }
    }

    pub fn with_comments(&self) -> bool {
        self.add_comments
    }

    /// Text of one event record.
    pub fn render(&self, ee: &ExportEvent, flags: ExportFlags) -> Result<String> {
        let mut out = String::new();
        self.render_into(&mut out, ee, flags)?;
        Ok(out)
    }

    /// Render and write one event record to `out`.
    pub fn store<W: io::Write>(&self, out: &mut W, ee: &ExportEvent, flags: ExportFlags) -> Result<()> {
        let text = self.render(ee, flags)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn render_into(&self, out: &mut String, ee: &ExportEvent, flags: ExportFlags) -> Result<()> {
        if self.add_comments {
            record_begin(out, EVENT_TAG)?;
            data_info(out, EVENT_TAG, None, "store_bits/int32_t")?;
        }
        writeln!(out, "{} {} ", EXPORT_EVENT_VERSION, flags.bits())?;

        for (bit, tag, banks) in SECTIONS {
            if !flags.contains(bit) {
                continue;
            }
            if self.add_comments {
                record_begin(out, tag)?;
            }
            for name in banks {
                let view = ee.bank(name).ok_or_else(|| {
                    ExportError::SchemaMismatch(format!("no container bank named '{name}'"))
                })?;
                let schema = registry().get(view.spec().record_type)?;
                let array = view.spec().array;
                if self.add_comments {
                    let size = array.then(|| format!("{name}@size/uint32_t"));
                    data_info(out, name, size.as_deref(), schema.description())?;
                }
                if array {
                    writeln!(out, "{} ", view.len())?;
                }
                for index in 0..view.len() {
                    write_record(out, &view, index, schema.version, schema.fields.len())?;
                }
            }
            if self.add_comments {
                record_end(out, tag)?;
            }
        }

        if self.add_comments {
            record_end(out, EVENT_TAG)?;
        }
        out.push('\n');
        Ok(())
    }
}

fn write_record(
    out: &mut String,
    view: &BankView<'_>,
    index: usize,
    version: u32,
    field_count: usize,
) -> fmt::Result {
    write!(out, "{version} ")?;
    for leaf in 0..field_count {
        if let Some(value) = view.value(index, leaf) {
            write!(out, "{value} ")?;
        }
    }
    out.push('\n');
    Ok(())
}

fn record_begin(out: &mut String, tag: &str) -> fmt::Result {
    writeln!(out, "#@record_begin: name={tag}")
}

fn record_end(out: &mut String, tag: &str) -> fmt::Result {
    writeln!(out, "#@record_end: name={tag}")
}

/// `size` is only given for collections.
fn data_info(out: &mut String, name: &str, size: Option<&str>, layout: &str) -> fmt::Result {
    write!(out, "#@data: name={name} ")?;
    match size {
        Some(size) => write!(out, "type=collection size={size} ")?,
        None => write!(out, "type=single ")?,
    }
    writeln!(out, "layout=store_version/uint32_t;{layout} ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::models::{TrueParticle, TrueVertex};

    fn sample_event() -> ExportEvent {
        let mut ee = ExportEvent::new();
        ee.event_header.run_number = 7;
        ee.event_header.event_number = 42;
        ee.event_header.simulated = true;
        ee.event_header.seconds = 0;
        ee.event_header.picoseconds = 0;
        ee.event_header.export_cat_infos = false;
        ee.true_vertices.push(TrueVertex {
            vertex_id: 0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            time: 0.0,
        });
        ee.true_particles.push(TrueParticle {
            track_id: 0,
            particle_type: 11,
            px: 1.0,
            py: 2.0,
            pz: 3.0,
            time: 0.5,
            vertex_id: 0,
        });
        ee
    }

    #[test]
    fn test_header_and_particles() {
        let flags = ExportFlags::EVENT_HEADER | ExportFlags::TRUE_PARTICLES;
        let text = TextEventWriter::new(false)
            .render(&sample_event(), flags)
            .unwrap();
        let expected = "0 3 \n\
                        0 7 42 1 0 0 0 \n\
                        1 \n\
                        0 0 0 0 0 0 \n\
                        1 \n\
                        0 0 11 1 2 3 0.5 0 \n\
                        \n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_disabled_topics_and_empty_collections() {
        let mut ee = sample_event();
        ee.clear_data();
        let text = TextEventWriter::new(false)
            .render(&ee, ExportFlags::TRUE_HITS | ExportFlags::TRACKER_CLUSTERING)
            .unwrap();
        assert_eq!(text, "0 72 \n0 \n0 \n0 \n0 \n\n");
    }

    #[test]
    fn test_comment_lines() {
        let text = TextEventWriter::new(true)
            .render(&sample_event(), ExportFlags::EVENT_HEADER)
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "#@record_begin: name=eventRecord");
        assert_eq!(
            lines[1],
            "#@data: name=eventRecord type=single layout=store_version/uint32_t;store_bits/int32_t "
        );
        assert_eq!(lines[2], "0 1 ");
        assert_eq!(lines[3], "#@record_begin: name=eventRecord/header");
        assert!(lines[4].starts_with("#@data: name=header type=single layout=store_version/uint32_t;runNumber/int32_t;"));
        assert_eq!(lines[5], "0 7 42 1 0 0 0 ");
        assert_eq!(lines[6], "#@record_end: name=eventRecord/header");
        assert_eq!(lines[7], "#@record_end: name=eventRecord");

        let text = TextEventWriter::new(true)
            .render(&sample_event(), ExportFlags::TRUE_PARTICLES)
            .unwrap();
        assert!(text.contains(
            "#@data: name=trueVertices type=collection size=trueVertices@size/uint32_t layout=store_version/uint32_t;vertexId/int32_t;x/double[mm];"
        ));
    }

    #[test]
    fn test_nan_rendering() {
        let mut ee = ExportEvent::new();
        ee.true_vertices.push(TrueVertex::default());
        let text = TextEventWriter::new(false)
            .render(&ee, ExportFlags::TRUE_PARTICLES)
            .unwrap();
        assert!(text.contains("0 -1 NaN NaN NaN NaN \n"));
    }
}
