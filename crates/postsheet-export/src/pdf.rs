// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use postsheet_app::Row;
use std::fmt::Write as _;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const LEFT_MARGIN_MM: f32 = 10.0;
const TOP_MARGIN_MM: f32 = 10.0;
const LINE_ADVANCE_MM: f32 = 10.0;
const FONT_SIZE_PT: u8 = 16;
const PAGE_WIDTH_PT: f32 = 595.28;
const PAGE_HEIGHT_PT: f32 = 841.89;
const PT_PER_MM: f32 = 72.0 / 25.4;

/// A line of text placed on the page, measured in millimetres from the
/// top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfTextLine {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
}

/// One labelled line per row, each a fixed distance below the last.
///
/// There is no page breaking: rows past the bottom of the page keep their
/// computed offsets and fall outside the visible area.
pub fn to_pdf_text(rows: &[Row]) -> Vec<PdfTextLine> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| PdfTextLine {
            text: format!(
                "Account: {}, Business: {}, Label: {}, A: {}, B: {}, C: {}",
                row.account,
                row.business_account,
                row.label,
                row.content_a,
                row.content_b,
                row.content_c
            ),
            x_mm: LEFT_MARGIN_MM,
            y_mm: TOP_MARGIN_MM + LINE_ADVANCE_MM * index as f32,
        })
        .collect()
}

/// Single-page A4 document holding [`to_pdf_text`] in Helvetica.
pub fn render_pdf(rows: &[Row], now: OffsetDateTime) -> Result<Vec<u8>> {
    let stream = content_stream(&to_pdf_text(rows));
    let created = now
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year][month][day][hour][minute][second]"
        ))
        .context("format PDF creation date")?;

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(6);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec());
    objects.push(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH_PT:.2} {PAGE_HEIGHT_PT:.2}] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>"
        )
        .into_bytes(),
    );
    let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
    content.extend_from_slice(&stream);
    content.extend_from_slice(b"\nendstream");
    objects.push(content);
    objects.push(
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_vec(),
    );
    objects.push(format!("<< /Producer (postsheet) /CreationDate (D:{created}Z) >>").into_bytes());

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(trailer, "{offset:010} 00000 n ");
    }
    let _ = write!(
        trailer,
        "trailer\n<< /Size {} /Root 1 0 R /Info 6 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(trailer.as_bytes());
    Ok(out)
}

fn content_stream(lines: &[PdfTextLine]) -> Vec<u8> {
    let mut out = Vec::new();
    for line in lines {
        let x = line.x_mm * PT_PER_MM;
        let y = PAGE_HEIGHT_PT - line.y_mm * PT_PER_MM;
        out.extend_from_slice(format!("BT /F1 {FONT_SIZE_PT} Tf {x:.2} {y:.2} Td (").as_bytes());
        out.extend_from_slice(&encode_text(&line.text));
        out.extend_from_slice(b") Tj ET\n");
    }
    out
}

// WinAnsi covers Latin-1; anything wider is replaced.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            ' '..='~' | '\u{a0}'..='\u{ff}' => out.push(ch as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}
