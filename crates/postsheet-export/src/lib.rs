// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod pdf;

use anyhow::{Context, Result};
use postsheet_app::{Row, RowField};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub use pdf::{PdfTextLine, render_pdf, to_pdf_text};

pub const CSV_FILE_NAME: &str = "spreadsheet.csv";
pub const PDF_FILE_NAME: &str = "spreadsheet.pdf";

/// One line per row in [`RowField::ALL`] order, no header.
///
/// Values are written verbatim: a comma inside a cell shifts every later
/// column of that line.
pub fn to_csv(rows: &[Row]) -> String {
    rows.iter()
        .map(|row| {
            RowField::ALL
                .iter()
                .map(|field| row.field(*field))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_csv(dir: &Path, rows: &[Row]) -> Result<PathBuf> {
    let path = export_path(dir, CSV_FILE_NAME)?;
    fs::write(&path, to_csv(rows)).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

pub fn write_pdf(dir: &Path, rows: &[Row], now: OffsetDateTime) -> Result<PathBuf> {
    let path = export_path(dir, PDF_FILE_NAME)?;
    let bytes = render_pdf(rows, now)?;
    fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn export_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create export directory {}", dir.display()))?;
    Ok(dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::to_csv;
    use postsheet_app::{RowField, RowStore};

    #[test]
    fn empty_rows_produce_empty_csv() {
        assert_eq!(to_csv(&[]), "");
    }

    #[test]
    fn csv_uses_fixed_column_order_without_header() {
        let mut store = RowStore::new();
        let id = store.add_row();
        store.update_field(id, RowField::Account, "acct");
        store.update_field(id, RowField::BusinessAccount, "biz");
        store.update_field(id, RowField::Label, "tag");
        store.update_field(id, RowField::ContentA, "one");
        store.update_field(id, RowField::ContentB, "two");
        store.update_field(id, RowField::ContentC, "three");
        store.add_row();

        assert_eq!(to_csv(store.rows()), "acct,biz,tag,one,two,three\n,,,,,");
    }

    #[test]
    fn csv_does_not_escape_embedded_commas() {
        let mut store = RowStore::new();
        let id = store.add_row();
        store.update_field(id, RowField::ContentA, "hello, world");

        let csv = to_csv(store.rows());
        assert_eq!(csv, ",,,hello, world,,");
        assert_eq!(csv.split(',').count(), 7);
    }
}
