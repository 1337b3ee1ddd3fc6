use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use sonda_analyze::{QueryAnalyzer, QueryObservation};
use sonda_core::{
    mapped_rust_type, Error, RelationshipInfo, RelationshipKind, Result, TableInfo,
};

use crate::executor::{ExecOutcome, Row, StatementExecutor};
use crate::sql;

/// Builds repositories bound to one executor/analyzer pair.
///
/// The finder capability set is precomputed here, once per table: the
/// dynamic per-column method surface of the design becomes an explicit
/// lookup instead of runtime reflection.
pub struct RepositoryFactory {
    executor: Arc<dyn StatementExecutor>,
    analyzer: Arc<QueryAnalyzer>,
    custom_type_mappings: BTreeMap<String, String>,
}

impl RepositoryFactory {
    pub fn new(
        executor: Arc<dyn StatementExecutor>,
        analyzer: Arc<QueryAnalyzer>,
        custom_type_mappings: BTreeMap<String, String>,
    ) -> Self {
        Self {
            executor,
            analyzer,
            custom_type_mappings,
        }
    }

    /// Synthesize the repository for one table. `relationships` is the full
    /// schema-wide list; the repository keeps the edges it owns.
    pub fn build(&self, table: &TableInfo, relationships: &[RelationshipInfo]) -> Repository {
        let key_columns = table.effective_key();
        let finder_columns: BTreeSet<String> = table
            .columns
            .iter()
            .filter(|column| !table.primary_key.contains(&column.name))
            .map(|column| column.name.clone())
            .collect();
        let relationships: Vec<RelationshipInfo> = relationships
            .iter()
            .filter(|rel| rel.from_table == table.name)
            .cloned()
            .collect();

        Repository {
            table: table.clone(),
            key_columns,
            finder_columns,
            relationships,
            executor: Arc::clone(&self.executor),
            analyzer: Arc::clone(&self.analyzer),
            custom_type_mappings: self.custom_type_mappings.clone(),
        }
    }
}

/// Stateless CRUD façade over one table.
///
/// Holds no row state; every call delegates to the statement executor and
/// is observed by the query analyzer. Instances are cached by the engine
/// and invalidated on schema refresh.
pub struct Repository {
    table: TableInfo,
    key_columns: Vec<String>,
    finder_columns: BTreeSet<String>,
    relationships: Vec<RelationshipInfo>,
    executor: Arc<dyn StatementExecutor>,
    analyzer: Arc<QueryAnalyzer>,
    custom_type_mappings: BTreeMap<String, String>,
}

impl Repository {
    pub fn table(&self) -> &TableInfo {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// Relationship names this table owns (valid inputs for the
    /// relationship-loading calls).
    pub fn relationship_names(&self) -> Vec<String> {
        self.relationships
            .iter()
            .map(|rel| rel.name.clone())
            .collect()
    }

    /// Columns accepted by the generic finder entry points.
    pub fn finder_columns(&self) -> Vec<String> {
        self.finder_columns.iter().cloned().collect()
    }

    /// Rust-side types per column, honoring the configured overrides.
    pub fn column_types(&self) -> BTreeMap<String, String> {
        self.table
            .columns
            .iter()
            .map(|column| {
                (
                    column.name.clone(),
                    mapped_rust_type(column, &self.custom_type_mappings),
                )
            })
            .collect()
    }

    pub async fn find_by_id(&self, id: &Value) -> Result<Option<Row>> {
        let key = self.key_values(id)?;
        let statement = sql::select_by_key(
            &self.table.name,
            &self.key_columns,
            self.executor.param_style(),
        );
        self.fetch_optional(&statement, &key).await
    }

    pub async fn find_all(&self) -> Result<Vec<Row>> {
        let statement = sql::select_all(&self.table.name);
        self.fetch_all(&statement, &[]).await
    }

    /// Insert a row and return it as stored.
    ///
    /// Unknown columns are rejected with the valid column list; a missing
    /// required column (non-nullable, no default, not auto-assigned) is a
    /// validation error.
    pub async fn create(&self, data: Row) -> Result<Row> {
        self.check_known_columns(&data)?;
        self.check_required_columns(&data)?;

        let columns: Vec<String> = self
            .table
            .columns
            .iter()
            .filter(|column| data.contains_key(&column.name))
            .map(|column| column.name.clone())
            .collect();
        let params: Vec<Value> = columns
            .iter()
            .map(|column| data[column].clone())
            .collect();
        let style = self.executor.param_style();

        if self.executor.supports_returning() {
            let statement = sql::insert_returning(&self.table.name, &columns, style);
            let inserted = self.fetch_optional(&statement, &params).await?;
            return inserted.ok_or_else(|| {
                Error::Validation(format!("insert into {} returned no row", self.table.name))
            });
        }

        let statement = sql::insert(&self.table.name, &columns, style);
        let outcome = self.execute(&statement, &params).await?;
        self.reread_created(&data, outcome).await
    }

    /// Update a row addressed by the key columns carried in `entity`.
    /// Raises [`Error::RowNotFound`] when the key matches nothing.
    pub async fn update(&self, entity: Row) -> Result<Row> {
        self.check_known_columns(&entity)?;

        let mut key = Vec::with_capacity(self.key_columns.len());
        for column in &self.key_columns {
            let value = entity.get(column).cloned().ok_or_else(|| {
                Error::Validation(format!(
                    "update on {} requires key column `{column}`",
                    self.table.name
                ))
            })?;
            key.push(value);
        }

        let set_columns: Vec<String> = self
            .table
            .columns
            .iter()
            .filter(|column| {
                entity.contains_key(&column.name) && !self.key_columns.contains(&column.name)
            })
            .map(|column| column.name.clone())
            .collect();
        if set_columns.is_empty() {
            return Err(Error::Validation(format!(
                "update on {} carries no non-key columns",
                self.table.name
            )));
        }

        let mut params: Vec<Value> = set_columns
            .iter()
            .map(|column| entity[column].clone())
            .collect();
        params.extend(key.iter().cloned());

        let statement = sql::update(
            &self.table.name,
            &set_columns,
            &self.key_columns,
            self.executor.param_style(),
        );
        let outcome = self.execute(&statement, &params).await?;
        if outcome.rows_affected == 0 {
            return Err(Error::RowNotFound {
                table: self.table.name.clone(),
                key: render_key(&key),
            });
        }

        let statement = sql::select_by_key(
            &self.table.name,
            &self.key_columns,
            self.executor.param_style(),
        );
        let row = self.fetch_optional(&statement, &key).await?;
        row.ok_or_else(|| Error::RowNotFound {
            table: self.table.name.clone(),
            key: render_key(&key),
        })
    }

    /// Delete by key. A missing row is a no-op returning `false`.
    pub async fn delete(&self, id: &Value) -> Result<bool> {
        let key = self.key_values(id)?;
        let statement = sql::delete(
            &self.table.name,
            &self.key_columns,
            self.executor.param_style(),
        );
        let outcome = self.execute(&statement, &key).await?;
        Ok(outcome.rows_affected > 0)
    }

    /// First row matching `column = value`, in storage order.
    ///
    /// No uniqueness is implied: on a non-unique column this returns an
    /// arbitrary one of the matches, which the name makes explicit.
    pub async fn find_first_by(&self, column: &str, value: &Value) -> Result<Option<Row>> {
        self.check_finder_column(column)?;
        let statement = sql::select_by_column(
            &self.table.name,
            column,
            self.executor.param_style(),
        );
        let rows = self.fetch_all(&statement, &[value.clone()]).await?;
        Ok(rows.into_iter().next())
    }

    /// All rows matching `column = value`.
    pub async fn find_many_by(&self, column: &str, value: &Value) -> Result<Vec<Row>> {
        self.check_finder_column(column)?;
        let statement = sql::select_by_column(
            &self.table.name,
            column,
            self.executor.param_style(),
        );
        self.fetch_all(&statement, &[value.clone()]).await
    }

    /// Load an entity and attach the named relationships by single-entity
    /// lookup.
    pub async fn find_with_relations(
        &self,
        id: &Value,
        relation_names: &[&str],
    ) -> Result<Option<Row>> {
        let entity = match self.find_by_id(id).await? {
            Some(entity) => entity,
            None => return Ok(None),
        };

        let mut entities = vec![entity];
        for name in relation_names {
            let rel = self.relationship(name)?;
            self.attach_relationship(&mut entities, rel).await?;
        }
        Ok(entities.pop())
    }

    /// Batch relationship loading: one `IN` query per relationship,
    /// regardless of entity count, grouped and assigned per entity.
    /// Observationally identical to per-entity loading; entities with no
    /// related rows get `null` or an empty array per cardinality.
    pub async fn load_relationships(
        &self,
        entities: &mut [Row],
        relation_names: &[&str],
    ) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        for name in relation_names {
            let rel = self.relationship(name)?;
            self.attach_relationship(entities, rel).await?;
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let statement = sql::count(&self.table.name);
        let row = self.fetch_optional(&statement, &[]).await?;
        Ok(count_from_row(row))
    }

    pub async fn exists(&self, id: &Value) -> Result<bool> {
        let key = self.key_values(id)?;
        let statement = sql::count_by_key(
            &self.table.name,
            &self.key_columns,
            self.executor.param_style(),
        );
        let row = self.fetch_optional(&statement, &key).await?;
        Ok(count_from_row(row) > 0)
    }

    /// Zip a caller-supplied key against the key columns positionally.
    fn key_values(&self, id: &Value) -> Result<Vec<Value>> {
        if self.key_columns.is_empty() {
            return Err(Error::Validation(format!(
                "table {} has no usable key",
                self.table.name
            )));
        }
        match id {
            Value::Array(values) => {
                if values.len() != self.key_columns.len() {
                    return Err(Error::Validation(format!(
                        "key for {} needs {} values in primary-key order, got {}",
                        self.table.name,
                        self.key_columns.len(),
                        values.len()
                    )));
                }
                Ok(values.clone())
            }
            scalar if self.key_columns.len() == 1 => Ok(vec![scalar.clone()]),
            _ => Err(Error::Validation(format!(
                "composite key for {} must be an array of {} values",
                self.table.name,
                self.key_columns.len()
            ))),
        }
    }

    fn relationship(&self, name: &str) -> Result<&RelationshipInfo> {
        self.relationships
            .iter()
            .find(|rel| rel.name == name)
            .ok_or_else(|| Error::RelationshipNotFound {
                table: self.table.name.clone(),
                name: name.to_string(),
                available: self.relationship_names(),
            })
    }

    fn check_finder_column(&self, column: &str) -> Result<()> {
        if self.finder_columns.contains(column) {
            Ok(())
        } else {
            Err(Error::ColumnNotFound {
                table: self.table.name.clone(),
                name: column.to_string(),
                available: self.finder_columns(),
            })
        }
    }

    fn check_known_columns(&self, data: &Row) -> Result<()> {
        for name in data.keys() {
            // The implicit rowid key is addressable even though it is not
            // in the column list.
            if self.table.column(name).is_none() && !self.key_columns.contains(name) {
                return Err(Error::ColumnNotFound {
                    table: self.table.name.clone(),
                    name: name.clone(),
                    available: self.table.column_names(),
                });
            }
        }
        Ok(())
    }

    fn check_required_columns(&self, data: &Row) -> Result<()> {
        for column in &self.table.columns {
            let required = !column.is_nullable
                && column.default.is_none()
                && !column.is_auto_increment;
            let provided = data
                .get(&column.name)
                .map(|value| !value.is_null())
                .unwrap_or(false);
            if required && !provided {
                return Err(Error::Validation(format!(
                    "insert into {} is missing required column `{}`",
                    self.table.name, column.name
                )));
            }
        }
        Ok(())
    }

    /// Re-read the row just inserted: by its client-supplied key when the
    /// data carried one, else by the database-assigned id on a
    /// single-column auto key. When neither identifies the row, the input
    /// is returned as the best available echo.
    async fn reread_created(&self, data: &Row, outcome: ExecOutcome) -> Result<Row> {
        let key_provided = self
            .key_columns
            .iter()
            .all(|column| data.get(column).map(|v| !v.is_null()).unwrap_or(false));

        let key: Option<Vec<Value>> = if key_provided {
            Some(
                self.key_columns
                    .iter()
                    .map(|column| data[column].clone())
                    .collect(),
            )
        } else if self.key_columns.len() == 1 && self.table.has_auto_increment() {
            outcome.last_insert_id.map(|id| vec![Value::from(id)])
        } else {
            None
        };

        match key {
            Some(key) => {
                let statement = sql::select_by_key(
                    &self.table.name,
                    &self.key_columns,
                    self.executor.param_style(),
                );
                let row = self.fetch_optional(&statement, &key).await?;
                row.ok_or_else(|| Error::RowNotFound {
                    table: self.table.name.clone(),
                    key: render_key(&key),
                })
            }
            None => Ok(data.clone()),
        }
    }

    async fn attach_relationship(
        &self,
        entities: &mut [Row],
        rel: &RelationshipInfo,
    ) -> Result<()> {
        match rel.kind {
            RelationshipKind::ManyToMany => self.attach_many_to_many(entities, rel).await,
            _ => self.attach_direct(entities, rel).await,
        }
    }

    /// Forward and reverse foreign-key edges share one shape: collect the
    /// distinct local values, issue one `IN` query against the far column,
    /// group, and assign by cardinality.
    async fn attach_direct(&self, entities: &mut [Row], rel: &RelationshipInfo) -> Result<()> {
        let keys = distinct_values(entities, &rel.from_column);

        let groups = if keys.is_empty() {
            HashMap::new()
        } else {
            let statement = sql::select_in(
                &rel.to_table,
                &rel.to_column,
                keys.len(),
                self.executor.param_style(),
            );
            let rows = self.fetch_all_for(&rel.to_table, &statement, &keys).await?;
            group_by_column(rows, &rel.to_column)
        };

        for entity in entities.iter_mut() {
            let local = entity.get(&rel.from_column).cloned().unwrap_or(Value::Null);
            let related = groups.get(&canonical(&local));
            let attached = match rel.kind {
                RelationshipKind::ManyToOne => related
                    .and_then(|rows| rows.first())
                    .map(|row| Value::Object(row.clone()))
                    .unwrap_or(Value::Null),
                _ => Value::Array(
                    related
                        .map(|rows| rows.iter().cloned().map(Value::Object).collect())
                        .unwrap_or_default(),
                ),
            };
            entity.insert(rel.name.clone(), attached);
        }
        Ok(())
    }

    /// Two hops through the junction table: local values to junction rows,
    /// junction targets to related rows.
    async fn attach_many_to_many(
        &self,
        entities: &mut [Row],
        rel: &RelationshipInfo,
    ) -> Result<()> {
        let (junction, junction_from, junction_to) = match (
            &rel.junction_table,
            &rel.junction_from_column,
            &rel.junction_to_column,
        ) {
            (Some(table), Some(from), Some(to)) => (table, from, to),
            _ => {
                return Err(Error::InvalidSchema(format!(
                    "many-to-many relationship `{}` lacks junction metadata",
                    rel.name
                )))
            }
        };

        let keys = distinct_values(entities, &rel.from_column);
        let mut targets_per_local: HashMap<String, Vec<Value>> = HashMap::new();
        let mut related_by_key: HashMap<String, Vec<Row>> = HashMap::new();

        if !keys.is_empty() {
            let statement = sql::select_in(
                junction,
                junction_from,
                keys.len(),
                self.executor.param_style(),
            );
            let junction_rows = self.fetch_all_for(junction, &statement, &keys).await?;

            let mut target_keys: Vec<Value> = Vec::new();
            let mut seen = BTreeSet::new();
            for row in &junction_rows {
                let local = row.get(junction_from).cloned().unwrap_or(Value::Null);
                let target = row.get(junction_to).cloned().unwrap_or(Value::Null);
                if target.is_null() {
                    continue;
                }
                if seen.insert(canonical(&target)) {
                    target_keys.push(target.clone());
                }
                targets_per_local
                    .entry(canonical(&local))
                    .or_default()
                    .push(target);
            }

            if !target_keys.is_empty() {
                let statement = sql::select_in(
                    &rel.to_table,
                    &rel.to_column,
                    target_keys.len(),
                    self.executor.param_style(),
                );
                let rows = self
                    .fetch_all_for(&rel.to_table, &statement, &target_keys)
                    .await?;
                related_by_key = group_by_column(rows, &rel.to_column);
            }
        }

        for entity in entities.iter_mut() {
            let local = entity.get(&rel.from_column).cloned().unwrap_or(Value::Null);
            let related: Vec<Value> = targets_per_local
                .get(&canonical(&local))
                .map(|targets| {
                    targets
                        .iter()
                        .filter_map(|target| related_by_key.get(&canonical(target)))
                        .flat_map(|rows| rows.iter().cloned().map(Value::Object))
                        .collect()
                })
                .unwrap_or_default();
            entity.insert(rel.name.clone(), Value::Array(related));
        }
        Ok(())
    }

    async fn fetch_all(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.fetch_all_for(&self.table.name, statement, params).await
    }

    async fn fetch_all_for(
        &self,
        table: &str,
        statement: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let start = Instant::now();
        let result = self.executor.fetch_all(statement, params).await;
        self.analyzer.observe(QueryObservation {
            sql: statement.to_string(),
            duration: start.elapsed(),
            rows: result.as_ref().ok().map(|rows| rows.len() as u64),
            table: Some(table.to_string()),
        });
        result
    }

    async fn fetch_optional(&self, statement: &str, params: &[Value]) -> Result<Option<Row>> {
        let start = Instant::now();
        let result = self.executor.fetch_optional(statement, params).await;
        self.analyzer.observe(QueryObservation {
            sql: statement.to_string(),
            duration: start.elapsed(),
            rows: result
                .as_ref()
                .ok()
                .map(|row| if row.is_some() { 1 } else { 0 }),
            table: Some(self.table.name.clone()),
        });
        result
    }

    async fn execute(&self, statement: &str, params: &[Value]) -> Result<ExecOutcome> {
        let start = Instant::now();
        let result = self.executor.execute(statement, params).await;
        self.analyzer.observe(QueryObservation {
            sql: statement.to_string(),
            duration: start.elapsed(),
            rows: None,
            table: Some(self.table.name.clone()),
        });
        result
    }
}

/// Canonical grouping key for a JSON value; `1` and `1.0` stay distinct,
/// which is correct for join-column grouping.
fn canonical(value: &Value) -> String {
    value.to_string()
}

fn distinct_values(entities: &[Row], column: &str) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for entity in entities {
        let value = match entity.get(column) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        if seen.insert(canonical(value)) {
            values.push(value.clone());
        }
    }
    values
}

fn group_by_column(rows: Vec<Row>, column: &str) -> HashMap<String, Vec<Row>> {
    let mut groups: HashMap<String, Vec<Row>> = HashMap::new();
    for row in rows {
        let key = row.get(column).cloned().unwrap_or(Value::Null);
        groups.entry(canonical(&key)).or_default().push(row);
    }
    groups
}

fn count_from_row(row: Option<Row>) -> u64 {
    row.and_then(|row| row.get("count").cloned())
        .and_then(|value| value.as_u64())
        .unwrap_or(0)
}

fn render_key(key: &[Value]) -> String {
    key.iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
