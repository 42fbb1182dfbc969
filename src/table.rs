//! Delimited-file tables: load rows keyed by canonical field names, render them back under the original headers.
//!
//! Cells are kept as raw text so that rows nobody touched are written back
//! exactly as they were read. Numeric interpretation happens above this layer.

use crate::case::{canonical_field_name, placeholder_name};
use crate::config::Schema;
use crate::error::{StoreError, StoreResult};
use crate::service::coerce::cell_text;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One row: canonical field name -> value, in column order.
pub type Record = Map<String, Value>;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A column as found in (or destined for) the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    pub header: String,
}

#[derive(Clone, Debug)]
pub struct Table {
    path: PathBuf,
    columns: Vec<Column>,
    rows: Vec<Record>,
    key_found: bool,
    bom: bool,
    crlf: bool,
}

impl Table {
    /// Load `path`. A missing file is an empty table with the declared headers.
    pub fn load(path: &Path, schema: &Schema) -> StoreResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "file missing, starting empty");
            return Ok(Self::empty(path, schema));
        }
        let bytes = std::fs::read(path).map_err(|e| StoreError::from_io(path, e))?;
        Self::parse(path, schema, &bytes)
    }

    fn empty(path: &Path, schema: &Schema) -> Self {
        Table {
            path: path.to_path_buf(),
            columns: schema
                .columns
                .iter()
                .map(|c| Column {
                    field: c.field.clone(),
                    header: c.header.clone(),
                })
                .collect(),
            rows: Vec::new(),
            key_found: true,
            bom: false,
            crlf: false,
        }
    }

    pub fn parse(path: &Path, schema: &Schema, bytes: &[u8]) -> StoreResult<Self> {
        let (bom, body) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, bytes),
        };
        let crlf = body.windows(2).any(|w| w == b"\r\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body);
        let mut records = reader.records();

        let header_row = match records.next() {
            Some(r) => r.map_err(|e| csv_error(path, e))?,
            None => return Ok(Self::empty(path, schema)),
        };
        let mut columns = canonical_columns(header_row.iter());

        let mut raw_rows = Vec::new();
        for r in records {
            let r = r.map_err(|e| csv_error(path, e))?;
            while columns.len() < r.len() {
                let i = columns.len();
                columns.push(Column {
                    field: placeholder_name(i),
                    header: String::new(),
                });
            }
            raw_rows.push(r);
        }

        apply_aliases(&mut columns, schema);
        let key_found = columns.iter().any(|c| c.field == schema.primary_key);

        let mut rows = Vec::with_capacity(raw_rows.len());
        let mut dropped = 0usize;
        for r in &raw_rows {
            let mut row = Record::new();
            for (i, col) in columns.iter().enumerate() {
                let cell = r.get(i).unwrap_or("");
                row.insert(col.field.clone(), Value::String(cell.to_string()));
            }
            if key_found && row.get(&schema.primary_key).map(cell_text).unwrap_or_default().trim().is_empty() {
                dropped += 1;
                continue;
            }
            rows.push(row);
        }

        tracing::debug!(
            path = %path.display(),
            rows = rows.len(),
            dropped,
            columns = columns.len(),
            "loaded table"
        );
        Ok(Table {
            path: path.to_path_buf(),
            columns,
            rows,
            key_found,
            bom,
            crlf,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Record> {
        &mut self.rows
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c.field == field)
    }

    pub fn key_found(&self) -> bool {
        self.key_found
    }

    /// Canonical names of every column, for diagnostics.
    pub fn available_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.field.clone()).collect()
    }

    /// Fail with `MalformedSchema` unless the primary key column was located.
    pub fn require_key(&self, schema: &Schema) -> StoreResult<()> {
        if self.key_found {
            return Ok(());
        }
        Err(StoreError::MalformedSchema {
            path: self.path.clone(),
            column: schema.key_header().to_string(),
            available: self.available_columns(),
        })
    }

    /// Register `field` as a column, using the declared header or the field name itself.
    pub fn ensure_column(&mut self, schema: &Schema, field: &str) {
        if self.has_column(field) {
            return;
        }
        let header = schema.header_for(field).unwrap_or(field).to_string();
        self.columns.push(Column {
            field: field.to_string(),
            header,
        });
    }

    /// Final column layout: declared columns in declared order (when present
    /// or retained), then every other column in file order.
    fn output_columns(&self, schema: &Schema) -> Vec<Column> {
        let mut out: Vec<Column> = Vec::with_capacity(self.columns.len());
        let mut placed = HashSet::new();
        for spec in &schema.columns {
            if let Some(col) = self.columns.iter().find(|c| c.field == spec.field) {
                out.push(col.clone());
                placed.insert(spec.field.as_str());
            } else if spec.retain {
                out.push(Column {
                    field: spec.field.clone(),
                    header: spec.header.clone(),
                });
                placed.insert(spec.field.as_str());
            }
        }
        for col in &self.columns {
            if !placed.contains(col.field.as_str()) {
                out.push(col.clone());
            }
        }
        out
    }

    /// Serialize under the original headers, keeping BOM and line endings of the source file.
    pub fn render(&self, schema: &Schema) -> StoreResult<Vec<u8>> {
        let columns = self.output_columns(schema);
        let terminator = if self.crlf {
            csv::Terminator::CRLF
        } else {
            csv::Terminator::Any(b'\n')
        };
        let mut buf = Vec::new();
        if self.bom {
            buf.extend_from_slice(UTF8_BOM);
        }
        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(terminator)
                .flexible(false)
                .from_writer(&mut buf);
            writer
                .write_record(columns.iter().map(|c| c.header.as_str()))
                .map_err(|e| csv_error(&self.path, e))?;
            for row in &self.rows {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| row.get(&c.field).map(cell_text).unwrap_or_default())
                    .collect();
                writer.write_record(&cells).map_err(|e| csv_error(&self.path, e))?;
            }
            writer
                .flush()
                .map_err(|e| StoreError::from_io(&self.path, e))?;
        }
        Ok(buf)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        reason: format!("malformed delimited file: {}", err),
    }
}

/// Canonicalize raw headers. Blank headers get positional placeholders; repeats get a positional suffix.
fn canonical_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<Column> {
    let mut seen = HashSet::new();
    headers
        .enumerate()
        .map(|(i, h)| {
            let mut field = canonical_field_name(h);
            if field.is_empty() {
                field = placeholder_name(i);
            }
            if !seen.insert(field.clone()) {
                field = format!("{}_{}", field, i);
                seen.insert(field.clone());
            }
            Column {
                field,
                header: h.to_string(),
            }
        })
        .collect()
}

/// Rename columns onto declared fields: declared aliases first, then the
/// primary key's token rule. Never renames onto a field that already exists.
fn apply_aliases(columns: &mut [Column], schema: &Schema) {
    for spec in &schema.columns {
        if columns.iter().any(|c| c.field == spec.field) {
            continue;
        }
        let declared: HashSet<&str> = schema.columns.iter().map(|c| c.field.as_str()).collect();
        let hit = spec
            .aliases
            .iter()
            .find_map(|alias| columns.iter().position(|c| &c.field == alias && !declared.contains(c.field.as_str())));
        if let Some(i) = hit {
            tracing::debug!(from = %columns[i].field, to = %spec.field, "column matched by alias");
            columns[i].field = spec.field.clone();
        }
    }

    if columns.iter().any(|c| c.field == schema.primary_key) || schema.key_tokens.is_empty() {
        return;
    }
    let declared: HashSet<&str> = schema.columns.iter().map(|c| c.field.as_str()).collect();
    let hit = columns.iter().position(|c| {
        !declared.contains(c.field.as_str()) && schema.key_tokens.iter().all(|t| c.field.contains(t.as_str()))
    });
    if let Some(i) = hit {
        tracing::debug!(from = %columns[i].field, to = %schema.primary_key, "key column matched by tokens");
        columns[i].field = schema.primary_key.clone();
    }
}
