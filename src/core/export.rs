// LogKeeper - core/export.rs
//
// CSV and JSON rendering of operation results.
// Core layer: writes to any Write trait object.

use crate::core::model::LineOccurrenceTable;
use crate::util::error::ExportError;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Output encoding for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Export a path list as single-column CSV with a `path` header.
pub fn export_paths_csv<W: Write>(paths: &[PathBuf], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["path"])
        .map_err(|source| ExportError::Csv { source })?;

    for path in paths {
        csv_writer
            .write_record([path.display().to_string()])
            .map_err(|source| ExportError::Csv { source })?;
    }

    csv_writer
        .flush()
        .map_err(|source| ExportError::Io { source })?;
    Ok(paths.len())
}

/// Export an occurrence table as `line,count` CSV, most frequent first.
pub fn export_table_csv<W: Write>(
    table: &LineOccurrenceTable,
    writer: W,
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["line", "count"])
        .map_err(|source| ExportError::Csv { source })?;

    let rows = table.sorted();
    for (line, count) in &rows {
        csv_writer
            .write_record([*line, count.to_string().as_str()])
            .map_err(|source| ExportError::Csv { source })?;
    }

    csv_writer
        .flush()
        .map_err(|source| ExportError::Io { source })?;
    Ok(rows.len())
}

/// Export any serialisable result as pretty-printed JSON followed by a newline.
pub fn export_json<W: Write, T: Serialize + ?Sized>(
    value: &T,
    mut writer: W,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|source| ExportError::Json { source })?;
    writeln!(writer).map_err(|source| ExportError::Io { source })
}
