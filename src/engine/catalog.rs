// Catalog
// Holds every table and stored procedure of one database and executes parsed
// statements against them. Every change is recorded in an undo journal so a
// failed statement or a rolled-back transaction can be reverted

use super::parser::{Filter, Operand, ParsedStatement, Projection, Query};
use super::procedure::Procedure;
use crate::storage::{table::Table, Row, Schema, Value};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Rows returned from a SELECT (or a procedure wrapping one)
    Rows { columns: Vec<String>, rows: Vec<Row> },
    /// Rows touched by a write; DDL reports zero
    Count {
        affected: u64,
        generated_key: Option<i64>,
    },
}

/// One reversible change
#[derive(Debug, Clone)]
pub enum UndoEntry {
    CreateTable { name: String },
    CreateIndex { table: String, column: String },
    Insert { table: String, row_id: usize },
    Update { table: String, row_id: usize, old: Row },
    Delete { table: String, row_id: usize, row: Row },
}

/// A WHERE clause with its placeholders resolved and column names looked up
enum BoundFilter {
    Eq(usize, Value),
    IsNull(usize, bool),
    And(Box<BoundFilter>, Box<BoundFilter>),
    Or(Box<BoundFilter>, Box<BoundFilter>),
}

impl BoundFilter {
    fn bind(filter: &Filter, schema: &Schema, params: &[Value]) -> Result<Self> {
        let column_index = |column: &str| {
            schema
                .get_column_index(column)
                .ok_or_else(|| anyhow!("Column not found: {}", column))
        };

        Ok(match filter {
            Filter::Eq { column, value } => {
                let index = column_index(column)?;
                let value = schema.columns[index]
                    .data_type
                    .coerce(value.resolve(params)?)?;
                BoundFilter::Eq(index, value)
            }
            Filter::IsNull { column, negated } => BoundFilter::IsNull(column_index(column)?, *negated),
            Filter::And(left, right) => BoundFilter::And(
                Box::new(Self::bind(left, schema, params)?),
                Box::new(Self::bind(right, schema, params)?),
            ),
            Filter::Or(left, right) => BoundFilter::Or(
                Box::new(Self::bind(left, schema, params)?),
                Box::new(Self::bind(right, schema, params)?),
            ),
        })
    }

    fn matches(&self, row: &Row) -> bool {
        match self {
            // NULL never equals anything, not even NULL
            BoundFilter::Eq(index, value) => !value.is_null() && row.values[*index] == *value,
            BoundFilter::IsNull(index, negated) => row.values[*index].is_null() != *negated,
            BoundFilter::And(left, right) => left.matches(row) && right.matches(row),
            BoundFilter::Or(left, right) => left.matches(row) || right.matches(row),
        }
    }

    /// An equality every matching row must satisfy, usable for an index probe
    fn probe(&self) -> Option<(usize, &Value)> {
        match self {
            BoundFilter::Eq(index, value) => Some((*index, value)),
            BoundFilter::And(left, right) => left.probe().or_else(|| right.probe()),
            _ => None,
        }
    }
}

/// The catalog manages all tables and procedures and executes statements
#[derive(Default)]
pub struct Catalog {
    /// Tables keyed by lower-cased name
    tables: HashMap<String, Table>,
    /// Procedures keyed by lower-cased name
    procedures: HashMap<String, Arc<Procedure>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a parsed statement with its bound parameter values
    /// Changes are appended to `journal`
    pub fn execute(
        &mut self,
        statement: &ParsedStatement,
        params: &[Value],
        journal: &mut Vec<UndoEntry>,
    ) -> Result<Outcome> {
        if params.len() != statement.parameter_count {
            return Err(anyhow!(
                "Statement has {} placeholder(s) but {} value(s) were bound",
                statement.parameter_count,
                params.len()
            ));
        }
        self.run(&statement.query, params, journal)
    }

    fn run(&mut self, query: &Query, params: &[Value], journal: &mut Vec<UndoEntry>) -> Result<Outcome> {
        match query {
            Query::CreateTable { name, schema } => {
                let key = name.to_ascii_lowercase();
                if self.tables.contains_key(&key) {
                    return Err(anyhow!("Table '{}' already exists", name));
                }

                self.tables
                    .insert(key.clone(), Table::new(name.clone(), schema.clone()));
                journal.push(UndoEntry::CreateTable { name: key });
                Ok(Self::no_rows())
            }

            Query::CreateIndex {
                table_name,
                column_name,
            } => {
                let key = table_name.to_ascii_lowercase();
                self.table_mut(table_name)?.create_index(column_name)?;
                journal.push(UndoEntry::CreateIndex {
                    table: key,
                    column: column_name.clone(),
                });
                Ok(Self::no_rows())
            }

            Query::Insert {
                table_name,
                columns,
                rows,
            } => {
                let key = table_name.to_ascii_lowercase();
                let table = self.table_mut(table_name)?;
                let width = table.schema.columns.len();

                // Map the column list (or schema order) to value positions
                let positions: Vec<usize> = match columns {
                    Some(columns) => columns
                        .iter()
                        .map(|c| {
                            table
                                .schema
                                .get_column_index(c)
                                .ok_or_else(|| anyhow!("Column not found: {}", c))
                        })
                        .collect::<Result<_>>()?,
                    None => (0..width).collect(),
                };

                let mut affected = 0;
                let mut generated_key = None;
                for row in rows {
                    if row.len() != positions.len() {
                        return Err(anyhow!(
                            "Expected {} values, got {}",
                            positions.len(),
                            row.len()
                        ));
                    }

                    let mut values = vec![Value::Null; width];
                    for (position, operand) in positions.iter().zip(row) {
                        values[*position] = operand.resolve(params)?;
                    }

                    let (row_id, generated) = table.insert(values)?;
                    journal.push(UndoEntry::Insert {
                        table: key.clone(),
                        row_id,
                    });
                    generated_key = generated.or(generated_key);
                    affected += 1;
                }

                Ok(Outcome::Count {
                    affected,
                    generated_key,
                })
            }

            Query::Select {
                table_name,
                projection,
                filter,
            } => {
                let table = self.table(table_name)?;
                let schema = table.get_schema();

                let (indices, columns): (Vec<usize>, Vec<String>) = match projection {
                    Projection::All => (0..schema.columns.len())
                        .map(|i| (i, schema.columns[i].name.clone()))
                        .unzip(),
                    Projection::Columns(selected) => selected
                        .iter()
                        .map(|(source, label)| {
                            schema
                                .get_column_index(source)
                                .map(|i| (i, label.clone()))
                                .ok_or_else(|| anyhow!("Column not found: {}", source))
                        })
                        .collect::<Result<Vec<_>>>()?
                        .into_iter()
                        .unzip(),
                };

                let filter = match filter {
                    Some(filter) => Some(BoundFilter::bind(filter, schema, params)?),
                    None => None,
                };

                let rows = Self::matching_rows(table, filter.as_ref())
                    .into_iter()
                    .filter_map(|row_id| table.get(row_id))
                    .map(|row| Row {
                        values: indices.iter().map(|i| row.values[*i].clone()).collect(),
                    })
                    .collect();

                Ok(Outcome::Rows { columns, rows })
            }

            Query::Update {
                table_name,
                assignments,
                filter,
            } => {
                let key = table_name.to_ascii_lowercase();
                let table = self.table_mut(table_name)?;

                let mut changes = Vec::with_capacity(assignments.len());
                for (column, operand) in assignments {
                    let index = table
                        .schema
                        .get_column_index(column)
                        .ok_or_else(|| anyhow!("Column not found: {}", column))?;
                    changes.push((index, operand.resolve(params)?));
                }
                let filter = BoundFilter::bind(filter, &table.schema, params)?;

                let row_ids = Self::matching_rows(table, Some(&filter));
                for row_id in &row_ids {
                    let old = table.update_row(*row_id, &changes)?;
                    journal.push(UndoEntry::Update {
                        table: key.clone(),
                        row_id: *row_id,
                        old,
                    });
                }

                Ok(Outcome::Count {
                    affected: row_ids.len() as u64,
                    generated_key: None,
                })
            }

            Query::Delete { table_name, filter } => {
                let key = table_name.to_ascii_lowercase();
                let table = self.table_mut(table_name)?;
                let filter = BoundFilter::bind(filter, &table.schema, params)?;

                let mut affected = 0;
                for row_id in Self::matching_rows(table, Some(&filter)) {
                    if let Some(row) = table.delete_row(row_id) {
                        journal.push(UndoEntry::Delete {
                            table: key.clone(),
                            row_id,
                            row,
                        });
                        affected += 1;
                    }
                }

                Ok(Outcome::Count {
                    affected,
                    generated_key: None,
                })
            }

            Query::Call { procedure, args } => {
                let procedure = self
                    .procedures
                    .get(&procedure.to_ascii_lowercase())
                    .cloned()
                    .ok_or_else(|| anyhow!("Procedure '{}' not found", procedure))?;

                let values = args
                    .iter()
                    .map(|arg: &Operand| arg.resolve(params))
                    .collect::<Result<Vec<_>>>()?;
                let values = procedure.bind_arguments(values)?;

                self.run(&procedure.body.query, &values, journal)
            }
        }
    }

    fn no_rows() -> Outcome {
        Outcome::Count {
            affected: 0,
            generated_key: None,
        }
    }

    /// Row IDs matching a filter, in storage order
    /// Uses an index when the filter pins an indexed column to a value
    fn matching_rows(table: &Table, filter: Option<&BoundFilter>) -> Vec<usize> {
        let probed = filter.and_then(BoundFilter::probe).and_then(|(index, value)| {
            table.lookup(&table.schema.columns[index].name, value)
        });

        let mut candidates = match probed {
            Some(row_ids) => row_ids,
            // No usable index - do a full table scan
            None => table.scan().into_iter().map(|(row_id, _)| row_id).collect(),
        };
        candidates.sort_unstable();

        candidates.retain(|row_id| {
            table
                .get(*row_id)
                .is_some_and(|row| filter.map_or(true, |f| f.matches(row)))
        });
        candidates
    }

    /// Revert journaled changes, newest first
    pub fn undo(&mut self, journal: Vec<UndoEntry>) {
        for entry in journal.into_iter().rev() {
            match entry {
                UndoEntry::CreateTable { name } => {
                    self.tables.remove(&name);
                }
                UndoEntry::CreateIndex { table, column } => {
                    if let Some(table) = self.tables.get_mut(&table) {
                        table.drop_index(&column);
                    }
                }
                UndoEntry::Insert { table, row_id } => {
                    if let Some(table) = self.tables.get_mut(&table) {
                        table.delete_row(row_id);
                    }
                }
                UndoEntry::Update { table, row_id, old } => {
                    if let Some(table) = self.tables.get_mut(&table) {
                        table.replace_row(row_id, old);
                    }
                }
                UndoEntry::Delete { table, row_id, row } => {
                    if let Some(table) = self.tables.get_mut(&table) {
                        table.restore_row(row_id, row);
                    }
                }
            }
        }
    }

    /// Register (or replace) a stored procedure
    pub fn define_procedure(&mut self, procedure: Procedure) {
        self.procedures
            .insert(procedure.name.to_ascii_lowercase(), Arc::new(procedure));
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("Table '{}' not found", name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("Table '{}' not found", name))
    }

    /// Get a reference to a table (useful for direct access)
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    /// List all tables in the database, sorted by name
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.values().map(|t| t.name.clone()).collect();
        names.sort();
        names
    }

    /// List all procedure names, sorted
    pub fn list_procedures(&self) -> Vec<String> {
        let mut names: Vec<String> = self.procedures.values().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::QueryParser;

    fn run(catalog: &mut Catalog, sql: &str, params: &[Value]) -> Result<Outcome> {
        let statement = QueryParser::parse(sql)?;
        let mut journal = Vec::new();
        catalog.execute(&statement, params, &mut journal)
    }

    fn fixture() -> Catalog {
        let mut catalog = Catalog::new();
        run(&mut catalog, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[]).unwrap();
        for id in [1, 5, 9] {
            run(
                &mut catalog,
                "INSERT INTO t VALUES (?, ?)",
                &[Value::Integer(id), Value::Text(format!("row {}", id))],
            )
            .unwrap();
        }
        catalog
    }

    #[test]
    fn test_select_by_bound_key() {
        let mut catalog = fixture();
        let outcome = run(&mut catalog, "SELECT * FROM t WHERE id = ?", &[Value::Integer(5)]).unwrap();

        match outcome {
            Outcome::Rows { columns, rows } => {
                assert_eq!(columns, vec!["id", "name"]);
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].values[0], Value::Integer(5));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let mut catalog = fixture();
        assert!(run(&mut catalog, "SELECT * FROM t WHERE id = ?", &[]).is_err());
    }

    #[test]
    fn test_undo_reverts_writes() {
        let mut catalog = fixture();
        let mut journal = Vec::new();

        let delete = QueryParser::parse("DELETE FROM t WHERE id = ?").unwrap();
        catalog
            .execute(&delete, &[Value::Integer(1)], &mut journal)
            .unwrap();
        let update = QueryParser::parse("UPDATE t SET name = ? WHERE id = ?").unwrap();
        catalog
            .execute(&update, &[Value::Text("renamed".into()), Value::Integer(5)], &mut journal)
            .unwrap();
        let insert = QueryParser::parse("INSERT INTO t (name) VALUES ('fresh')").unwrap();
        let outcome = catalog.execute(&insert, &[], &mut journal).unwrap();
        assert_eq!(
            outcome,
            Outcome::Count {
                affected: 1,
                generated_key: Some(10)
            }
        );

        catalog.undo(journal);

        let table = catalog.get_table("t").unwrap();
        assert_eq!(table.row_count(), 3);
        let names: Vec<String> = table
            .scan()
            .into_iter()
            .map(|(_, row)| row.values[1].to_string())
            .collect();
        assert_eq!(names, vec!["row 1", "row 5", "row 9"]);
    }

    #[test]
    fn test_procedure_call() {
        let mut catalog = fixture();
        catalog.define_procedure(Procedure::new("sp_rename", "UPDATE t SET name = ? WHERE id = ?").unwrap());

        let outcome = run(
            &mut catalog,
            "{call sp_rename(?, 9)}",
            &[Value::Text("nine".into())],
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Count {
                affected: 1,
                generated_key: None
            }
        );

        assert!(run(&mut catalog, "{call sp_rename(?)}", &[Value::Text("x".into())]).is_err());
        assert!(run(&mut catalog, "{call sp_missing()}", &[]).is_err());
    }
}
