//! CSV output.
//!
//! Rows are written to a temporary file next to the target and renamed into
//! place once flushed, so the target path only ever holds a complete file.

use crate::error::{LitReviewError, Result};
use crate::record::{Record, Schema};
use std::path::Path;
use tracing::info;

/// Mode requested for the output file; the process umask still applies
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Write `records` under a header row for `schema` to `path`.
///
/// The header is written even when `records` is empty.
pub fn write_csv(path: &Path, records: &[Record], schema: Schema) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // tempfile defaults to 0600, which would survive the rename
    let mut builder = tempfile::Builder::new();
    builder.prefix(".litreview").suffix(".csv.tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(OUTPUT_MODE));
    }
    let tmp = builder.tempfile_in(dir)?;
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file());

        wtr.write_record(schema.columns())?;
        for record in records {
            wtr.write_record(record.values(schema))?;
        }
        wtr.flush()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .map_err(|e| LitReviewError::Io(e.error))?;

    info!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NOT_AVAILABLE;
    use tempfile::tempdir;

    const HEADER: &str = "keyword,title,authors,year,source title,DOI,link,abstract,author keywords,index keywords";

    #[test]
    fn test_empty_writes_header_only() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("papers.csv");

        write_csv(&path, &[], Schema::Standard)?;

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(content, format!("{}\n", HEADER));
        Ok(())
    }

    #[test]
    fn test_quotes_embedded_delimiters() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("papers.csv");
        let record = Record {
            keyword: "ai tts".to_string(),
            title: "Speech, text, and \"reading\"".to_string(),
            abstract_text: "line one\nline two".to_string(),
            ..Default::default()
        };

        write_csv(&path, &[record], Schema::Standard)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(headers.len(), 10);
        assert_eq!(&headers[5], "DOI");

        let rows: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "Speech, text, and \"reading\"");
        assert_eq!(&rows[0][7], "line one\nline two");
        assert_eq!(&rows[0][5], NOT_AVAILABLE);
        Ok(())
    }

    #[test]
    fn test_extended_schema_columns() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("extended.csv");

        write_csv(&path, &[Record::default()], Schema::Extended)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(headers.len(), 13);
        assert_eq!(&headers[10], "aim");
        assert_eq!(&headers[11], "expected output");
        Ok(())
    }

    #[test]
    fn test_overwrites_previous_run() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("papers.csv");
        std::fs::write(&path, "stale")?;

        write_csv(&path, &[], Schema::Standard)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with("keyword,"));
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_output_mode_matches_plain_create() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let path = dir.path().join("papers.csv");
        let plain = dir.path().join("plain.csv");

        write_csv(&path, &[], Schema::Standard)?;
        std::fs::write(&plain, "x")?;

        let mode = std::fs::metadata(&path)?.permissions().mode() & 0o777;
        let plain_mode = std::fs::metadata(&plain)?.permissions().mode() & 0o777;
        assert_eq!(mode, plain_mode);
        Ok(())
    }
}
