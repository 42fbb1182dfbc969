//! Record store engine: one generic CRUD core per configured collection.
//!
//! Every call reloads the backing file, so the file stays the source of truth.
//! Mutations hold the collection's write lock across load, mutate and save.

use crate::case::canonical_field_name;
use crate::config::{MissingKeyPolicy, ResolvedCollection, Schema};
use crate::error::{StoreError, StoreResult};
use crate::matcher;
use crate::service::coerce::{cell_text, coerce, parse_number, values_equal};
use crate::service::validation::RequestValidator;
use crate::table::{Record, Table};
use crate::writer;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// Field added to every returned record, holding the primary-key value.
pub const ID_FIELD: &str = "id";

const SIMILAR_KEYS_LIMIT: usize = 5;

/// Result of `update`. Missing keys and write failures are errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    /// The key did not resolve and the collection inserts on update.
    Created,
    /// Every provided field already held the same value; nothing was written.
    NoChanges,
}

impl UpdateOutcome {
    pub fn no_changes(self) -> bool {
        self == UpdateOutcome::NoChanges
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

pub struct RecordStore {
    collection: ResolvedCollection,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(collection: ResolvedCollection) -> Self {
        Self {
            collection,
            write_lock: Mutex::new(()),
        }
    }

    pub fn collection(&self) -> &ResolvedCollection {
        &self.collection
    }

    fn schema(&self) -> &Schema {
        &self.collection.schema
    }

    fn load(&self) -> StoreResult<Table> {
        Table::load(&self.collection.path, self.schema())
    }

    fn load_keyed(&self) -> StoreResult<Table> {
        let table = self.load()?;
        table.require_key(self.schema())?;
        Ok(table)
    }

    fn save(&self, table: &Table) -> StoreResult<()> {
        writer::persist(table.path(), || table.render(self.schema()))
    }

    /// Every row, presented. A file without the key column lists as empty.
    pub fn list(&self) -> StoreResult<Vec<Record>> {
        let table = self.load()?;
        if !table.key_found() {
            self.warn_missing_key(&table);
            return Ok(Vec::new());
        }
        Ok(table.rows().iter().map(|r| self.present(&table, r)).collect())
    }

    pub fn get(&self, key: &str) -> StoreResult<Record> {
        let table = self.load_keyed()?;
        let i = self.locate(&table, key)?;
        Ok(self.present(&table, &table.rows()[i]))
    }

    /// Append one row. Duplicate keys are not checked.
    pub fn create(&self, fields: &Record) -> StoreResult<Record> {
        let _guard = self.write_lock.lock();
        let mut table = self.load_keyed()?;
        let input = self.canonical_input(&table, fields);

        let key = key_text(&input, &self.schema().primary_key);
        if key.is_empty() {
            return Err(StoreError::Validation(format!("{} is required", self.schema().key_header())));
        }
        RequestValidator::validate(&input, &self.collection.validation)?;
        RequestValidator::validate_numbers(&input, self.schema())?;

        let row = self.build_row(&mut table, &input, None);
        table.rows_mut().push(row.clone());
        self.save(&table)?;
        tracing::info!(collection = %self.collection.name, key = %key, "created");
        Ok(self.present(&table, &row))
    }

    /// Merge `fields` into the row `key` resolves to. Only provided fields are compared and written.
    pub fn update(&self, key: &str, fields: &Record) -> StoreResult<UpdateOutcome> {
        let _guard = self.write_lock.lock();
        let mut table = self.load_keyed()?;
        let input = self.canonical_input(&table, fields);
        RequestValidator::validate_partial(&input, &self.collection.validation)?;
        RequestValidator::validate_numbers(&input, self.schema())?;
        // A blank key would make the row vanish on the next load.
        if input.contains_key(&self.schema().primary_key) && key_text(&input, &self.schema().primary_key).is_empty() {
            return Err(StoreError::Validation(format!("{} is required", self.schema().key_header())));
        }

        let Some(i) = matcher::resolve(table.rows(), &self.schema().primary_key, key) else {
            return match self.collection.on_missing_key {
                MissingKeyPolicy::Reject => Err(self.not_found(&table, key)),
                MissingKeyPolicy::Insert => self.insert_on_update(&mut table, key, input),
            };
        };

        let schema = self.schema();
        let current = &table.rows()[i];
        let changed = input
            .iter()
            .any(|(f, v)| !values_equal(schema.is_numeric(f), current.get(f), Some(v)));
        if !changed {
            tracing::debug!(collection = %self.collection.name, key = %key.trim(), "update without changes, skipping write");
            return Ok(UpdateOutcome::NoChanges);
        }

        for field in input.keys() {
            table.ensure_column(schema, field);
        }
        let row = &mut table.rows_mut()[i];
        for (f, v) in &input {
            row.insert(f.clone(), stored(schema.is_numeric(f), v));
        }
        self.save(&table)?;
        tracing::info!(collection = %self.collection.name, key = %key.trim(), fields = input.len(), "updated");
        Ok(UpdateOutcome::Updated)
    }

    fn insert_on_update(&self, table: &mut Table, key: &str, mut input: Record) -> StoreResult<UpdateOutcome> {
        let pk = self.schema().primary_key.clone();
        if key_text(&input, &pk).is_empty() {
            input.insert(pk.clone(), Value::String(key.trim().to_string()));
        }
        let new_key = key_text(&input, &pk);
        if new_key.is_empty() {
            return Err(StoreError::Validation(format!("{} is required", self.schema().key_header())));
        }
        let row = self.build_row(table, &input, None);
        table.rows_mut().push(row);
        self.save(table)?;
        tracing::info!(collection = %self.collection.name, key = %new_key, "key not found on update, inserted");
        Ok(UpdateOutcome::Created)
    }

    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let mut table = self.load_keyed()?;
        let i = self.locate(&table, key)?;
        table.rows_mut().remove(i);
        self.save(&table)?;
        tracing::info!(collection = %self.collection.name, key = %key.trim(), "deleted");
        Ok(())
    }

    /// Replace rows whose key resolves, append the rest, and write the file once.
    /// Records without a key are skipped.
    pub fn bulk_upsert(&self, records: &[Record]) -> StoreResult<BulkOutcome> {
        if records.is_empty() {
            return Err(StoreError::Validation("no data provided".into()));
        }
        let _guard = self.write_lock.lock();
        let mut table = self.load_keyed()?;
        let pk = self.schema().primary_key.clone();
        let mut outcome = BulkOutcome::default();
        let mut dirty = false;

        for (index, fields) in records.iter().enumerate() {
            let input = self.canonical_input(&table, fields);
            let key = key_text(&input, &pk);
            if key.is_empty() {
                tracing::warn!(collection = %self.collection.name, index, "bulk row without key skipped");
                outcome.skipped += 1;
                continue;
            }
            match matcher::resolve(table.rows(), &pk, &key) {
                Some(i) => {
                    let base = table.rows()[i].clone();
                    let row = self.build_row(&mut table, &input, Some(&base));
                    if row != base {
                        table.rows_mut()[i] = row;
                        dirty = true;
                    }
                    outcome.updated += 1;
                }
                None => {
                    let row = self.build_row(&mut table, &input, None);
                    table.rows_mut().push(row);
                    dirty = true;
                    outcome.inserted += 1;
                }
            }
        }

        if dirty {
            self.save(&table)?;
        }
        tracing::info!(
            collection = %self.collection.name,
            inserted = outcome.inserted,
            updated = outcome.updated,
            skipped = outcome.skipped,
            written = dirty,
            "bulk upsert"
        );
        Ok(outcome)
    }

    fn locate(&self, table: &Table, key: &str) -> StoreResult<usize> {
        matcher::resolve(table.rows(), &self.schema().primary_key, key).ok_or_else(|| self.not_found(table, key))
    }

    fn not_found(&self, table: &Table, key: &str) -> StoreError {
        let similar = matcher::similar_keys(table.rows(), &self.schema().primary_key, key, SIMILAR_KEYS_LIMIT);
        tracing::debug!(collection = %self.collection.name, key = %key, ?similar, "key did not resolve");
        StoreError::not_found(&self.collection.name, key)
    }

    fn warn_missing_key(&self, table: &Table) {
        tracing::warn!(
            collection = %self.collection.name,
            path = %table.path().display(),
            column = %self.schema().key_header(),
            available = ?table.available_columns(),
            "key column not found, listing as empty"
        );
    }

    /// Map request keys onto canonical fields. Declared fields resolve through
    /// headers, aliases and camelCase; other keys must name an existing column.
    /// When several keys land on one field the first non-blank value wins.
    fn canonical_input(&self, table: &Table, fields: &Record) -> Record {
        let mut out = Record::new();
        for (k, v) in fields {
            let field = match self.schema().resolve_request_key(k) {
                Some(f) => f,
                None => {
                    let c = canonical_field_name(k);
                    if c == ID_FIELD || !table.has_column(&c) {
                        tracing::debug!(collection = %self.collection.name, key = %k, "ignoring unknown field");
                        continue;
                    }
                    c
                }
            };
            let keep_existing = out.get(&field).map(|e| !is_blank(e)).unwrap_or(false);
            if !keep_existing {
                out.insert(field, v.clone());
            }
        }
        out
    }

    /// A full row for `input`. Declared columns take the input value, else the
    /// column default, else blank (zero for numeric columns). Columns outside
    /// the declared set keep their `base` values unless provided.
    fn build_row(&self, table: &mut Table, input: &Record, base: Option<&Record>) -> Record {
        let schema = &self.collection.schema;
        let mut row = base.cloned().unwrap_or_default();
        for spec in &schema.columns {
            let provided = input.get(&spec.field).filter(|v| !is_blank(v));
            if provided.is_none() && !spec.retain && !table.has_column(&spec.field) {
                continue;
            }
            table.ensure_column(schema, &spec.field);
            let value = match provided.or(spec.default.as_ref()) {
                Some(v) => stored(spec.numeric, v),
                None if spec.numeric => Value::String("0".into()),
                None => Value::String(String::new()),
            };
            row.insert(spec.field.clone(), value);
        }
        for (f, v) in input {
            if schema.column(f).is_none() {
                table.ensure_column(schema, f);
                row.insert(f.clone(), stored(false, v));
            }
        }
        row
    }

    /// Caller-facing view: `id` first, numeric columns parsed, text trimmed.
    fn present(&self, table: &Table, row: &Record) -> Record {
        let schema = self.schema();
        let mut out = Record::new();
        out.insert(ID_FIELD.into(), Value::String(key_text(row, &schema.primary_key)));
        for col in table.columns() {
            let v = row.get(&col.field);
            let shown = if schema.is_numeric(&col.field) {
                Value::Number(parse_number(v).into())
            } else {
                Value::String(v.map(cell_text).unwrap_or_default().trim().to_string())
            };
            out.insert(col.field.clone(), shown);
        }
        out
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn key_text(row: &Record, pk: &str) -> String {
    row.get(pk).map(cell_text).unwrap_or_default().trim().to_string()
}

/// Cell text as written to the file.
fn stored(numeric: bool, v: &Value) -> Value {
    Value::String(cell_text(&coerce(numeric, v)))
}
