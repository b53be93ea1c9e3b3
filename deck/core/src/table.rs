//! Table Layout Generator
//!
//! Turns tab-separated text into a one-slide deck. The first line is a layout
//! header with one `x:align` pair per column; every following line becomes a
//! row of positioned `<text>` elements with an optional rule underneath.
//!
//! ```text
//! 10:left\t60:right          <deck><slide>
//! Apples\t12          ──▶    <text xp="10" yp="82" sp="3" align="left">Apples</text>
//!                            <text xp="60" yp="82" sp="3" align="right">12</text>
//!                            <line xp1="10" yp1="79.71" xp2="65" yp2="79.71" sp="0.05"/>
//!                            </slide></deck>
//! ```
//!
//! Input is processed line by line and written as it goes; nothing but the
//! current line is held in memory. Cell bytes are copied through untouched,
//! so input in a non-UTF-8 encoding keeps its encoding in the markup.
//!
//! # Malformed Headers
//!
//! A header column that is not exactly one `x:align` pair stops generation on
//! the spot. Whatever was already written stays in the sink and the closing
//! `</slide></deck>` is never emitted, so a truncated file is the visible
//! trace of the failure. The generator also returns
//! [`TableError::MalformedHeader`] so callers do not have to sniff the output.

use std::io::{self, BufRead, BufWriter, Write};

use thiserror::Error;
use tracing::{debug, warn};

/// Columns beyond this are ignored
pub const MAX_COLUMNS: usize = 10;

/// Errors from [`generate`]
#[derive(Debug, Error)]
pub enum TableError {
    /// A header column did not split into `x:align`
    #[error("malformed table header in column {column}: {field:?}")]
    MalformedHeader {
        /// Zero-based column index
        column: usize,
        /// Offending header field
        field: String,
    },

    /// Reading the input or writing the markup failed
    #[error("table I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Geometry of the generated slide
#[derive(Clone, Debug, PartialEq)]
pub struct TableStyle {
    /// Vertical position of the header line; rows start one spacing below
    pub start_y: f64,
    /// Vertical distance between lines
    pub line_spacing: f64,
    /// Text size of every cell
    pub text_size: f64,
    /// Divisor of the spacing that places the rule under the baseline
    pub tightness: f64,
    /// Draw a rule under each data row
    pub show_rule: bool,
    /// Stroke width of the rule
    pub rule_stroke: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            start_y: 90.0,
            line_spacing: 8.0,
            text_size: 3.0,
            tightness: 3.5,
            show_rule: true,
            rule_stroke: 0.05,
        }
    }
}

/// Placement of one column, taken from the header
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutColumn {
    /// Horizontal position
    pub x: f64,
    /// Alignment token, copied verbatim into the markup
    pub align: String,
}

impl LayoutColumn {
    /// Parse an `x:align` header field
    ///
    /// Returns `None` unless the field has exactly one `:`. An x that is not
    /// a number (surrounding spaces included) is placed at 0.
    #[must_use]
    pub fn parse(field: &str) -> Option<Self> {
        Self::parse_bytes(field.as_bytes())
    }

    fn parse_bytes(field: &[u8]) -> Option<Self> {
        let mut parts = field.split(|&b| b == b':');
        let (x, align) = match (parts.next(), parts.next(), parts.next()) {
            (Some(x), Some(align), None) => (x, align),
            _ => return None,
        };

        let x = std::str::from_utf8(x)
            .ok()
            .and_then(|x| x.parse::<f64>().ok())
            .unwrap_or_else(|| {
                warn!(field = %String::from_utf8_lossy(field), "Unparsable column position, using 0");
                0.0
            });

        Some(Self {
            x,
            align: String::from_utf8_lossy(align).into_owned(),
        })
    }
}

/// Counts reported after a complete table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableSummary {
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Columns declared by the header
    pub columns: usize,
}

/// Generate a table with the default style
///
/// # Errors
///
/// See [`TableLayout::generate`].
pub fn generate<R: BufRead, W: Write>(input: R, output: W) -> Result<TableSummary, TableError> {
    TableLayout::default().generate(input, output)
}

/// Table generator with a fixed style
#[derive(Clone, Debug, Default)]
pub struct TableLayout {
    style: TableStyle,
}

impl TableLayout {
    /// Create a generator with a custom style
    #[must_use]
    pub fn new(style: TableStyle) -> Self {
        Self { style }
    }

    /// Stream `input` into deck markup on `output`
    ///
    /// Output written before a failure is flushed, never rolled back.
    ///
    /// # Errors
    ///
    /// [`TableError::MalformedHeader`] for a bad header line,
    /// [`TableError::Io`] for read or write failures.
    pub fn generate<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<TableSummary, TableError> {
        let mut out = BufWriter::new(output);
        let result = self.write_table(input, &mut out);
        out.flush()?;
        result
    }

    fn write_table<R: BufRead, W: Write>(
        &self,
        mut input: R,
        out: &mut W,
    ) -> Result<TableSummary, TableError> {
        let style = &self.style;
        let mut columns: Vec<LayoutColumn> = vec![LayoutColumn::default(); MAX_COLUMNS];
        let mut summary = TableSummary::default();
        let mut y = style.start_y;
        let mut buf = Vec::new();

        out.write_all(b"<deck><slide>\n")?;

        for line_no in 0.. {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let fields: Vec<&[u8]> = trim_newline(&buf)
                .split(|&b| b == b'\t')
                .take(MAX_COLUMNS)
                .collect();

            if line_no == 0 {
                for (i, field) in fields.iter().enumerate() {
                    let Some(column) = LayoutColumn::parse_bytes(field) else {
                        let field = String::from_utf8_lossy(field).into_owned();
                        warn!(column = i, field = %field, "Malformed table header, aborting");
                        return Err(TableError::MalformedHeader { column: i, field });
                    };
                    columns[i] = column;
                }
                summary.columns = fields.len();
                debug!(columns = summary.columns, "Parsed table header");
            } else {
                for (column, value) in columns.iter().zip(&fields) {
                    write!(
                        out,
                        r#"<text xp="{}" yp="{}" sp="{}" align="{}">"#,
                        column.x, y, style.text_size, column.align
                    )?;
                    out.write_all(value)?;
                    out.write_all(b"</text>\n")?;
                }
                if style.show_rule {
                    let rule_y = y - (style.line_spacing / style.tightness);
                    let last = &columns[fields.len() - 1];
                    writeln!(
                        out,
                        r#"<line xp1="{}" yp1="{:.2}" xp2="{}" yp2="{:.2}" sp="{}"/>"#,
                        columns[0].x,
                        rule_y,
                        last.x + 5.0,
                        rule_y,
                        style.rule_stroke
                    )?;
                }
                summary.rows += 1;
            }

            y -= style.line_spacing;
        }

        out.write_all(b"</slide></deck>\n")?;
        Ok(summary)
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
