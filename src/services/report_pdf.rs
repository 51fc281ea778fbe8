// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PDF report layout.
//!
//! Reports are built in two steps: records are mapped into a [`ReportTable`]
//! (pure data, easy to test), then tables are laid out on US-letter pages
//! with the builtin Helvetica fonts.

use crate::error::AppError;
use crate::models::{SensorDay, UserLogEntry};
use crate::time_utils::format_reading_datetime;
use chrono::FixedOffset;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};
use serde_json::Value;

/// Report title block.
pub const REPORT_TITLE: &str =
    "AQUA - A Cross-platform Application for Hydroponics Monitoring System";

/// Label on the first header bar of daily reports.
pub const DAILY_REPORTS_LABEL: &str = "Daily Reports";

const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const MARGIN_PT: f32 = 40.0;
const ROW_HEIGHT_PT: f32 = 16.0;
const BAR_HEIGHT_PT: f32 = 22.0;
const BODY_FONT_PT: f32 = 10.0;
const TITLE_FONT_PT: f32 = 14.0;

/// Rough average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

const LIGHT_GREEN: (u8, u8, u8) = (0x74, 0xFF, 0x99);
const DARK_BLUE: (u8, u8, u8) = (0x0B, 0x0E, 0x98);

/// Column of a tabular report: which record property it shows and how wide.
#[derive(Debug, Clone, PartialEq)]
pub struct TableField {
    pub property: &'static str,
    pub label: &'static str,
    /// Column width in points
    pub width: f32,
}

/// Columns of the simple per-sensor table.
pub const SENSOR_FIELDS: [TableField; 2] = [
    TableField {
        property: "value",
        label: "Value",
        width: 60.0,
    },
    TableField {
        property: "convertedDatetime",
        label: "Datetime",
        width: 150.0,
    },
];

/// Columns of the user-log table.
pub const USER_LOG_FIELDS: [TableField; 3] = [
    TableField {
        property: "email",
        label: "Email",
        width: 170.0,
    },
    TableField {
        property: "datetime",
        label: "Date/Time",
        width: 120.0,
    },
    TableField {
        property: "activity",
        label: "Activity",
        width: 240.0,
    },
];

/// A titled table ready for layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportTable {
    pub title: String,
    pub subtitle: Option<String>,
    pub headers: Vec<String>,
    pub widths: Vec<f32>,
    pub rows: Vec<Vec<String>>,
}

/// Map JSON records onto table columns.
///
/// Each field pulls `record[property]`; strings are used as-is, other scalars
/// are stringified and missing properties become empty cells.
pub fn create_tabular_report(
    title: &str,
    subtitle: Option<&str>,
    fields: &[TableField],
    records: &[Value],
) -> ReportTable {
    let rows = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| cell_text(record.get(field.property)))
                .collect()
        })
        .collect();

    ReportTable {
        title: title.to_string(),
        subtitle: subtitle.map(str::to_string),
        headers: fields.iter().map(|f| f.label.to_string()).collect(),
        widths: fields.iter().map(|f| f.width).collect(),
        rows,
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Simple `Value | Datetime` table of one sensor's day.
pub fn sensor_table(day: &SensorDay, date: &str, offset: &FixedOffset) -> ReportTable {
    let label = day.kind.label();
    let records: Vec<Value> = day
        .readings
        .iter()
        .map(|r| {
            serde_json::json!({
                "value": r.value,
                "convertedDatetime": format_reading_datetime(r.datetime, offset),
            })
        })
        .collect();

    create_tabular_report(
        label,
        Some(&format!("Records of {label} for the day of {date}")),
        &SENSOR_FIELDS,
        &records,
    )
}

/// Min/max table: `Highest | Lowest` holds the day's values sorted highest
/// first, `Date | Value` pairs each reading's time and value, newest first.
pub fn min_max_table(day: &SensorDay, offset: &FixedOffset) -> ReportTable {
    let sorted = day.values_descending();
    let rows = day
        .readings
        .iter()
        .enumerate()
        .map(|(i, r)| {
            vec![
                sorted.get(i).map(|v| format_value(*v)).unwrap_or_default(),
                format!("{} {}", format_reading_datetime(r.datetime, offset), r.value),
            ]
        })
        .collect();

    ReportTable {
        title: String::new(),
        subtitle: None,
        headers: vec!["Highest | Lowest".to_string(), "Date | Value".to_string()],
        widths: vec![234.0, 234.0],
        rows,
    }
}

/// `Email | Date/Time | Activity` table of one day's log entries.
pub fn user_log_table(entries: &[UserLogEntry], date: &str) -> ReportTable {
    let records: Vec<Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "email": e.email,
                "datetime": e.datetime,
                "activity": e.activity,
            })
        })
        .collect();

    create_tabular_report(
        "User Logs",
        Some(&format!("User activity for the day of {date}")),
        &USER_LOG_FIELDS,
        &records,
    )
}

/// Shortest form of a reading value (`7`, `7.25`).
pub fn format_value(value: f64) -> String {
    value.to_string()
}

/// Render the min/max daily report of one sensor.
pub fn render_min_max_report(
    day: &SensorDay,
    date: &str,
    offset: &FixedOffset,
) -> Result<Vec<u8>, AppError> {
    let label = day.kind.label();
    let mut writer = PageWriter::new(&format!("{label} {date}"))?;

    writer.title_block(date);
    writer.line(&format!("SYSTEM REPORT FOR {label}"), BODY_FONT_PT, false);
    writer.bar(LIGHT_GREEN, DAILY_REPORTS_LABEL, false);
    writer.bar(DARK_BLUE, label, true);

    if let Some((min, max)) = day.min_max() {
        writer.line(
            &format!(
                "Highest: {}    Lowest: {}",
                format_value(max),
                format_value(min)
            ),
            BODY_FONT_PT,
            true,
        );
    }

    writer.table(&min_max_table(day, offset));

    writer.finish()
}

/// Render one or more tables under the title block.
pub fn render_tables(doc_title: &str, date: &str, tables: &[ReportTable]) -> Result<Vec<u8>, AppError> {
    let mut writer = PageWriter::new(doc_title)?;
    writer.title_block(date);

    for table in tables {
        writer.table(table);
    }

    writer.finish()
}

/// Cursor-based page layout. `cursor` is measured in points from the top.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    cursor: f32,
    pages: usize,
}

impl PageWriter {
    fn new(doc_title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) = PdfDocument::new(
            doc_title,
            mm(PAGE_WIDTH_PT),
            mm(PAGE_HEIGHT_PT),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::Report(format!("Failed to load font: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::Report(format!("Failed to load font: {e}")))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            font,
            bold,
            cursor: MARGIN_PT,
            pages: 1,
        })
    }

    fn title_block(&mut self, date: &str) {
        self.line(REPORT_TITLE, TITLE_FONT_PT, true);
        self.line(&format!("Report date: {date}"), BODY_FONT_PT, false);
        self.cursor += ROW_HEIGHT_PT / 2.0;
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(size + 6.0);
        let baseline = self.cursor + size;
        self.text(text, size, MARGIN_PT, baseline, bold);
        self.cursor = baseline + 6.0;
    }

    fn bar(&mut self, rgb: (u8, u8, u8), label: &str, light_text: bool) {
        self.ensure_space(BAR_HEIGHT_PT + 4.0);
        let top = self.cursor;
        self.fill_rect(
            rgb,
            MARGIN_PT,
            top,
            PAGE_WIDTH_PT - 2.0 * MARGIN_PT,
            BAR_HEIGHT_PT,
        );

        let text_rgb = if light_text { (0xFF, 0xFF, 0xFF) } else { (0, 0, 0) };
        self.set_fill(text_rgb);
        self.text(label, BODY_FONT_PT + 2.0, MARGIN_PT + 6.0, top + 15.0, true);
        self.set_fill((0, 0, 0));

        self.cursor = top + BAR_HEIGHT_PT + 4.0;
    }

    fn table(&mut self, table: &ReportTable) {
        if !table.title.is_empty() {
            self.line(&table.title, BODY_FONT_PT + 2.0, true);
        }
        if let Some(subtitle) = &table.subtitle {
            self.line(subtitle, BODY_FONT_PT, false);
        }

        self.row(&table.headers, &table.widths, MARGIN_PT, true);
        for row in &table.rows {
            if self.ensure_space(ROW_HEIGHT_PT) {
                self.row(&table.headers, &table.widths, MARGIN_PT, true);
            }
            self.row(row, &table.widths, MARGIN_PT, false);
        }
        self.cursor += ROW_HEIGHT_PT / 2.0;
    }

    fn row(&mut self, cells: &[String], widths: &[f32], left: f32, bold: bool) {
        let baseline = self.cursor + ROW_HEIGHT_PT - 4.0;
        let mut x = left;
        for (cell, width) in cells.iter().zip(widths) {
            let fitted = fit_to_width(cell, *width - 4.0, BODY_FONT_PT);
            self.text(&fitted, BODY_FONT_PT, x + 2.0, baseline, bold);
            x += width;
        }
        self.cursor += ROW_HEIGHT_PT;
    }

    /// Start a new page if `needed` points do not fit. Returns true on a break.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.cursor + needed <= PAGE_HEIGHT_PT - MARGIN_PT {
            return false;
        }

        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            mm(PAGE_WIDTH_PT),
            mm(PAGE_HEIGHT_PT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = MARGIN_PT;
        true
    }

    fn text(&self, text: &str, size: f32, x: f32, baseline_from_top: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(
            text,
            size,
            mm(x),
            mm(PAGE_HEIGHT_PT - baseline_from_top),
            font,
        );
    }

    fn fill_rect(&self, rgb: (u8, u8, u8), x: f32, top: f32, width: f32, height: f32) {
        self.set_fill(rgb);
        let rect = Rect::new(
            mm(x),
            mm(PAGE_HEIGHT_PT - top - height),
            mm(x + width),
            mm(PAGE_HEIGHT_PT - top),
        )
        .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
        self.set_fill((0, 0, 0));
    }

    fn set_fill(&self, (r, g, b): (u8, u8, u8)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            None,
        )));
    }

    fn finish(self) -> Result<Vec<u8>, AppError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| AppError::Report(format!("Failed to serialize PDF: {e}")))
    }
}

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Truncate `text` with an ellipsis so it fits roughly within `width` points.
fn fit_to_width(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * GLYPH_WIDTH_RATIO)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
