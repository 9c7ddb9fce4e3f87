//! Template index: maps device/command attributes to template names.
//!
//! The index is comma separated text. The first non-comment line is the
//! header; its first column must be `Template`, the rest name attributes:
//!
//! ```text
//! # Specific rows first, generic fallbacks last.
//! Template, Hostname, Vendor, Command
//! cisco_version, .*, Cisco, sh[[ow]] ve[[rsion]]
//! generic_version, .*, .*, sh[[ow]] ve[[rsion]]
//! ```
//!
//! Rows are tried in file order and the first row whose patterns all match
//! wins. There is no specificity ranking, so generic rows must come last.

mod expand;

pub use expand::expand_command;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TemplateError, TemplateErrorKind, TemplateNotFound};

/// Column holding the template name(s).
pub const TEMPLATE_COLUMN: &str = "Template";

/// Attribute column that accepts `word[[suffix]]` abbreviations.
pub const COMMAND_COLUMN: &str = "Command";

/// Hostname attribute column.
pub const HOSTNAME_COLUMN: &str = "Hostname";

/// Vendor attribute column.
pub const VENDOR_COLUMN: &str = "Vendor";

/// Name used in errors raised while loading an index.
const INDEX_SOURCE: &str = "index";

/// Blanks between a separator and an opening quote; the reader only honours
/// quotes at the very start of a cell.
static QUOTED_CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)(^|,)[ \t]+""#).unwrap());

/// One index row.
#[derive(Debug, Clone)]
pub struct IndexRow {
    templates: Vec<String>,
    patterns: Vec<(String, Option<Regex>)>,
    line: usize,
}

impl IndexRow {
    /// First template name of the row.
    pub fn template(&self) -> &str {
        &self.templates[0]
    }

    /// Every template named by the row (`a:b` lists several).
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Compiled pattern for an attribute column (`None` when the cell is empty).
    pub fn pattern(&self, column: &str) -> Option<&Regex> {
        self.patterns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, re)| re.as_ref())
    }

    /// Index source line of this row.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Check the row against `(column, value)` attributes.
    ///
    /// Attributes without a column, and empty cells, never reject a row.
    pub fn matches(&self, attributes: &[(&str, &str)]) -> bool {
        attributes.iter().all(|(column, value)| match self.pattern(column) {
            Some(re) => re.is_match(value),
            None => true,
        })
    }
}

/// An ordered, parsed template index.
#[derive(Debug, Clone)]
pub struct Index {
    columns: Vec<String>,
    rows: Vec<IndexRow>,
}

impl Index {
    /// Parse index text.
    ///
    /// Cells are comma separated and trimmed; a cell whose pattern contains a
    /// comma must be double quoted (`"r\d{1,3}"`).
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let source = QUOTED_CELL_RE.replace_all(source, "${1}\"");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source.as_bytes());

        let header = reader.headers().map_err(csv_error)?;
        let header_line = line_of(header.position());
        let columns: Vec<String> = header.iter().map(String::from).collect();

        match columns.first() {
            None => return Err(invalid(0, "missing header row")),
            Some(first) if first.is_empty() && columns.len() == 1 => {
                return Err(invalid(0, "missing header row"));
            }
            Some(first) if first != TEMPLATE_COLUMN => {
                return Err(invalid(
                    header_line,
                    format!("first column must be '{TEMPLATE_COLUMN}', found '{first}'"),
                ));
            }
            Some(_) => {}
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line_num = line_of(record.position());
            if record.len() != columns.len() {
                return Err(invalid(
                    line_num,
                    format!("expected {} columns, found {}", columns.len(), record.len()),
                ));
            }
            let cells: Vec<&str> = record.iter().collect();
            rows.push(parse_row(&columns, &cells, line_num)?);
        }

        debug!("Loaded index: {} columns, {} rows", columns.len(), rows.len());
        Ok(Self { columns, rows })
    }

    /// Header columns, `Template` first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    /// First row matching every attribute.
    pub fn select_with(&self, attributes: &[(&str, &str)]) -> Result<&IndexRow, TemplateNotFound> {
        find_row(&self.rows, attributes)
    }

    /// Resolve the template for a hostname/vendor/command triple.
    pub fn select(&self, hostname: &str, vendor: &str, command: &str) -> Result<&str, TemplateNotFound> {
        select_template(&self.rows, hostname, vendor, command)
    }

    /// Every distinct template name referenced by the index.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.rows.iter().flat_map(|r| r.templates.iter()) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

/// Parse index text into its rows.
pub fn load_index(source: &str) -> Result<Vec<IndexRow>, TemplateError> {
    Index::parse(source).map(|index| index.rows)
}

/// Resolve the template for a hostname/vendor/command triple.
pub fn select_template<'a>(
    rows: &'a [IndexRow],
    hostname: &str,
    vendor: &str,
    command: &str,
) -> Result<&'a str, TemplateNotFound> {
    let attributes = [
        (HOSTNAME_COLUMN, hostname),
        (VENDOR_COLUMN, vendor),
        (COMMAND_COLUMN, command),
    ];
    find_row(rows, &attributes).map(IndexRow::template)
}

fn find_row<'a>(rows: &'a [IndexRow], attributes: &[(&str, &str)]) -> Result<&'a IndexRow, TemplateNotFound> {
    match rows.iter().find(|row| row.matches(attributes)) {
        Some(row) => {
            debug!(
                "Index row {} selected template '{}'",
                row.line,
                row.templates.join(":")
            );
            Ok(row)
        }
        None => {
            let rendered = attributes
                .iter()
                .map(|(column, value)| format!("{column}='{value}'"))
                .collect::<Vec<_>>()
                .join(", ");
            trace!("No index row matched {}", rendered);
            Err(TemplateNotFound { attributes: rendered })
        }
    }
}

fn parse_row(header: &[String], cells: &[&str], line_num: usize) -> Result<IndexRow, TemplateError> {
    let templates: Vec<String> = cells[0]
        .split(':')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    if templates.is_empty() {
        return Err(invalid(line_num, "empty Template cell"));
    }

    let mut patterns = Vec::with_capacity(header.len() - 1);
    for (column, cell) in header.iter().zip(cells).skip(1) {
        let regex = if cell.is_empty() {
            None
        } else {
            let pattern = if column == COMMAND_COLUMN {
                expand_command(cell)
            } else {
                cell.to_string()
            };
            // Start-anchored: the pattern must match a prefix of the attribute.
            let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
                TemplateError::new(INDEX_SOURCE, line_num, TemplateErrorKind::InvalidPattern(e))
            })?;
            Some(regex)
        };
        patterns.push((column.clone(), regex));
    }

    Ok(IndexRow {
        templates,
        patterns,
        line: line_num,
    })
}

fn line_of(position: Option<&csv::Position>) -> usize {
    position.map_or(0, |p| p.line() as usize)
}

fn csv_error(e: csv::Error) -> TemplateError {
    invalid(line_of(e.position()), e.to_string())
}

fn invalid(line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::new(
        INDEX_SOURCE,
        line,
        TemplateErrorKind::InvalidIndex {
            message: message.into(),
        },
    )
}
