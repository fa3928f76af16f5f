//! Tabular dataset loading for drift audits
//!
//! CSV with a header row. A column is numeric when every non-empty cell
//! parses as a finite `f64` and at least one cell does; anything else
//! (names, country codes) is kept as a non-numeric column and never analyzed.

use std::path::Path;

use super::DriftError;

/// One column of a loaded dataset
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Parsed values with empty cells skipped; `None` for non-numeric columns
    pub values: Option<Vec<f64>>,
}

/// A loaded dataset, columns in header order
#[derive(Debug, Clone)]
pub struct Dataset {
    label: String,
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Read a CSV file; `label` names the dataset in errors ("reference", ...)
    pub fn load_csv(label: &str, path: impl AsRef<Path>) -> Result<Self, DriftError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DriftError::Io {
            dataset: label.to_string(),
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::parse_csv(label, &text)?;
        tracing::debug!(
            dataset = label,
            rows = dataset.rows,
            columns = dataset.columns.len(),
            "Loaded {}",
            path.display()
        );
        Ok(dataset)
    }

    /// Parse CSV text
    pub fn parse_csv(label: &str, text: &str) -> Result<Self, DriftError> {
        let parse_error = |line: usize, reason: String| DriftError::Parse {
            dataset: label.to_string(),
            line,
            reason,
        };

        let mut records = split_records(text)
            .map_err(|line| parse_error(line, "unterminated quoted field".to_string()))?
            .into_iter();

        let Some((_, names)) = records.next() else {
            return Err(parse_error(1, "missing header row".to_string()));
        };

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        let mut rows = 0;
        for (line, record) in records {
            if record.len() != names.len() {
                return Err(parse_error(
                    line,
                    format!("expected {} fields, found {}", names.len(), record.len()),
                ));
            }
            for (column, cell) in cells.iter_mut().zip(record) {
                column.push(cell);
            }
            rows += 1;
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column {
                name: name.trim().to_string(),
                values: parse_numeric(&raw),
            })
            .collect();

        Ok(Self {
            label: label.to_string(),
            columns,
            rows,
        })
    }

    /// Build directly from numeric columns
    pub fn from_columns<I, S>(label: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| Column {
                name: name.into(),
                values: Some(values),
            })
            .collect();
        let rows = columns
            .iter()
            .filter_map(|c| c.values.as_ref().map(Vec::len))
            .max()
            .unwrap_or(0);

        Self {
            label: label.to_string(),
            columns,
            rows,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Values of a numeric column
    pub fn numeric_column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.values.as_deref())
    }

    /// Names of numeric columns, in header order
    pub fn numeric_column_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.values.is_some())
            .map(|c| c.name.as_str())
    }
}

fn parse_numeric(raw: &[String]) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(raw.len());
    for cell in raw {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            _ => return None,
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Split CSV text into records, each tagged with the line it starts on.
///
/// Double quotes may wrap commas, `""` escapes and line breaks. A leading
/// byte order mark is dropped. Blank lines are skipped. On an unterminated
/// quote the error is the line where the open record started.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, usize> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut blank = true;
    let mut line = 1;
    let mut start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => {
                quoted = !quoted;
                blank = false;
            }
            '\n' if quoted => {
                field.push('\n');
                line += 1;
            }
            '\r' if !quoted => {}
            '\n' => {
                if !blank {
                    fields.push(std::mem::take(&mut field));
                    records.push((start, std::mem::take(&mut fields)));
                }
                field.clear();
                blank = true;
                line += 1;
                start = line;
            }
            ',' if !quoted => {
                fields.push(std::mem::take(&mut field));
                blank = false;
            }
            _ => {
                blank &= c.is_whitespace();
                field.push(c);
            }
        }
    }

    if quoted {
        return Err(start);
    }
    if !blank {
        fields.push(field);
        records.push((start, fields));
    }
    Ok(records)
}
