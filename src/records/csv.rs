//! Small CSV reader for the record files: header row, quoted fields
//! (including embedded delimiters, doubled quotes and newlines), trimmed
//! cells, empty cells as null.

use std::path::Path;

use super::RecordsError;

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// A parsed CSV file. Header names are trimmed and lower-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    /// Read and parse `path`. A missing file is `RecordsError::NotFound`.
    pub fn load(path: &Path) -> Result<Self, RecordsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecordsError::NotFound(format!(
                    "file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(RecordsError::Io(e)),
        };
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = parse_records(text).into_iter();

        let Some(header) = records.next() else {
            return Self::default();
        };
        let columns: Vec<String> = header.into_iter().map(|c| c.to_lowercase()).collect();

        let rows = records
            .map(|record| {
                let mut row: Vec<Option<String>> = record
                    .into_iter()
                    .map(|cell| if cell.is_empty() { None } else { Some(cell) })
                    .collect();
                row.resize(columns.len(), None);
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom. `None` when the column is absent.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = Option<&'a str>> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    /// Cell at (`row`, `name`).
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// One row as a JSON object keyed by column name (empty cells → null).
    pub fn row_json(&self, row: usize) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        if let Some(cells) = self.rows.get(row) {
            for (name, cell) in self.columns.iter().zip(cells) {
                let value = match cell {
                    Some(v) => serde_json::Value::String(v.clone()),
                    None => serde_json::Value::Null,
                };
                object.insert(name.clone(), value);
            }
        }
        serde_json::Value::Object(object)
    }
}

/// Split text into records of trimmed fields. Blank lines are skipped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut finish_record = |fields: &mut Vec<String>, current: &mut String| {
        fields.push(current.trim().to_string());
        current.clear();
        let record = std::mem::take(fields);
        if !(record.len() == 1 && record[0].is_empty()) {
            records.push(record);
        }
    };

    while let Some(c) = chars.next() {
        if c == QUOTE {
            if in_quotes {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                in_quotes = true;
            }
        } else if in_quotes {
            current.push(c);
        } else if c == DELIMITER {
            fields.push(current.trim().to_string());
            current.clear();
        } else if c == '\n' {
            finish_record(&mut fields, &mut current);
        } else if c != '\r' {
            current.push(c);
        }
    }
    if !fields.is_empty() || !current.trim().is_empty() {
        finish_record(&mut fields, &mut current);
    }

    records
}
