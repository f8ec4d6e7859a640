// SQL Parser
// This module converts SQL strings into structured queries
// We use the sqlparser crate to handle the SQL grammar; positional `?`
// placeholders are numbered left to right while the AST is walked

use crate::storage::{Column, DataType, Schema, Value};
use anyhow::{anyhow, Result};
use sqlparser::ast::{
    AssignmentTarget, BinaryOperator, ColumnOption, DataType as SqlDataType, Expr, FromTable,
    FunctionArg, FunctionArgExpr, FunctionArguments, ObjectName, Select, SelectItem, SetExpr,
    Statement, TableFactor, TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Something that produces a value at execution time
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal written in the SQL text
    Literal(Value),
    /// The n-th (zero-based) positional placeholder
    Param(usize),
}

impl Operand {
    /// Resolve against the bound parameter values
    pub fn resolve(&self, params: &[Value]) -> Result<Value> {
        match self {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Param(index) => params
                .get(*index)
                .cloned()
                .ok_or_else(|| anyhow!("No value bound for parameter {}", index + 1)),
        }
    }
}

/// A WHERE clause: equality and NULL tests combined with AND / OR
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Operand },
    IsNull { column: String, negated: bool },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

/// What a SELECT returns
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    /// (source column, output label) pairs
    Columns(Vec<(String, String)>),
}

/// Represents the different types of statements we support
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// CREATE TABLE tablename (col1 TYPE, col2 TYPE, ...)
    CreateTable { name: String, schema: Schema },
    /// CREATE INDEX ON tablename (column)
    CreateIndex {
        table_name: String,
        column_name: String,
    },
    /// INSERT INTO tablename [(cols)] VALUES (...), (...)
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Operand>>,
    },
    /// SELECT * | cols FROM tablename [WHERE ...]
    Select {
        table_name: String,
        projection: Projection,
        filter: Option<Filter>,
    },
    /// UPDATE tablename SET col = value, ... WHERE ...
    Update {
        table_name: String,
        assignments: Vec<(String, Operand)>,
        filter: Filter,
    },
    /// DELETE FROM tablename WHERE ...
    Delete { table_name: String, filter: Filter },
    /// CALL procedure(arg, ...) or the {call procedure(arg, ...)} escape
    Call {
        procedure: String,
        args: Vec<Operand>,
    },
}

/// A parsed statement together with the number of `?` placeholders it holds
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub query: Query,
    pub parameter_count: usize,
}

/// Hands out placeholder positions in the order they appear
#[derive(Default)]
struct Placeholders {
    next: usize,
}

impl Placeholders {
    fn take(&mut self) -> usize {
        let index = self.next;
        self.next += 1;
        index
    }
}

/// The query parser
pub struct QueryParser;

impl QueryParser {
    /// Parse a single SQL statement
    pub fn parse(sql: &str) -> Result<ParsedStatement> {
        let sql = Self::unwrap_call_escape(sql)?;
        let mut statements = Self::parse_script(sql)?;

        if statements.len() != 1 {
            return Err(anyhow!("Only single statements are supported"));
        }
        Ok(statements.remove(0))
    }

    /// Parse a `;`-separated script into its statements
    pub fn parse_script(sql: &str) -> Result<Vec<ParsedStatement>> {
        let dialect = GenericDialect {};
        let ast = Parser::parse_sql(&dialect, sql)
            .map_err(|e| anyhow!("SQL parsing error: {}", e))?;

        ast.iter().map(Self::parse_statement).collect()
    }

    /// Strip the JDBC-style `{call name(...)}` escape down to `call name(...)`
    fn unwrap_call_escape(sql: &str) -> Result<&str> {
        let trimmed = sql.trim().trim_end_matches(';').trim_end();
        let Some(inner) = trimmed.strip_prefix('{') else {
            return Ok(sql);
        };

        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| anyhow!("Unterminated escape sequence"))?
            .trim();
        let is_call = inner
            .get(..4)
            .is_some_and(|keyword| keyword.eq_ignore_ascii_case("call"));
        if !is_call {
            return Err(anyhow!("Unsupported escape sequence: {}", trimmed));
        }
        Ok(inner)
    }

    fn parse_statement(statement: &Statement) -> Result<ParsedStatement> {
        let mut params = Placeholders::default();

        let query = match statement {
            Statement::CreateTable(create_table) => Self::parse_create_table(create_table)?,
            Statement::CreateIndex(create_index) => Self::parse_create_index(create_index)?,
            Statement::Insert(insert) => Self::parse_insert(insert, &mut params)?,
            Statement::Query(query) => Self::parse_select(query, &mut params)?,
            Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => Self::parse_update(table, assignments, selection, &mut params)?,
            Statement::Delete(delete) => Self::parse_delete(delete, &mut params)?,
            Statement::Call(function) => Self::parse_call(function, &mut params)?,
            _ => return Err(anyhow!("Unsupported SQL statement")),
        };

        Ok(ParsedStatement {
            query,
            parameter_count: params.next,
        })
    }

    /// Parse CREATE TABLE statement
    fn parse_create_table(create_table: &sqlparser::ast::CreateTable) -> Result<Query> {
        let mut columns = Vec::new();

        for column_def in &create_table.columns {
            let data_type = Self::parse_data_type(&column_def.data_type)?;

            let primary_key = column_def.options.iter().any(|opt| {
                matches!(
                    opt.option,
                    ColumnOption::Unique {
                        is_primary: true,
                        ..
                    }
                )
            });

            let nullable = !column_def
                .options
                .iter()
                .any(|opt| matches!(opt.option, ColumnOption::NotNull));

            columns.push(Column {
                name: column_def.name.value.clone(),
                data_type,
                primary_key,
                nullable,
            });
        }

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(anyhow!("Only single column primary keys are supported"));
        }

        Ok(Query::CreateTable {
            name: Self::object_name(&create_table.name),
            schema: Schema::new(columns),
        })
    }

    /// Parse CREATE INDEX statement
    fn parse_create_index(create_index: &sqlparser::ast::CreateIndex) -> Result<Query> {
        if create_index.columns.len() != 1 {
            return Err(anyhow!("Only single column indexes are supported"));
        }

        Ok(Query::CreateIndex {
            table_name: Self::object_name(&create_index.table_name),
            column_name: Self::column_name(&create_index.columns[0].expr)?,
        })
    }

    /// Parse INSERT statement
    fn parse_insert(insert: &sqlparser::ast::Insert, params: &mut Placeholders) -> Result<Query> {
        let table_name = Self::object_name(&insert.table_name);

        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.iter().map(|c| c.value.clone()).collect())
        };

        let rows = match &insert.source {
            Some(source) => match source.body.as_ref() {
                SetExpr::Values(values) => {
                    if values.rows.is_empty() {
                        return Err(anyhow!("No values provided"));
                    }

                    let mut rows = Vec::with_capacity(values.rows.len());
                    for row in &values.rows {
                        rows.push(Self::parse_operands(row, params)?);
                    }
                    rows
                }
                _ => return Err(anyhow!("Unsupported INSERT format")),
            },
            None => return Err(anyhow!("No values provided")),
        };

        Ok(Query::Insert {
            table_name,
            columns,
            rows,
        })
    }

    /// Parse SELECT statement
    fn parse_select(query: &sqlparser::ast::Query, params: &mut Placeholders) -> Result<Query> {
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            _ => return Err(anyhow!("Unsupported SELECT format")),
        };

        let table_name = Self::extract_table_name(select)?;
        let projection = Self::parse_projection(&select.projection)?;

        let filter = match &select.selection {
            Some(selection) => Some(Self::parse_filter(selection, params)?),
            None => None,
        };

        Ok(Query::Select {
            table_name,
            projection,
            filter,
        })
    }

    fn parse_projection(items: &[SelectItem]) -> Result<Projection> {
        if let [SelectItem::Wildcard(_)] = items {
            return Ok(Projection::All);
        }

        let mut columns = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    let name = Self::column_name(expr)?;
                    columns.push((name.clone(), name));
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    columns.push((Self::column_name(expr)?, alias.value.clone()));
                }
                _ => return Err(anyhow!("Only column names or a lone * may be selected")),
            }
        }
        Ok(Projection::Columns(columns))
    }

    /// Parse UPDATE statement
    fn parse_update(
        table: &TableWithJoins,
        assignments: &[sqlparser::ast::Assignment],
        selection: &Option<Expr>,
        params: &mut Placeholders,
    ) -> Result<Query> {
        let table_name = Self::relation_name(table)?;

        let mut parsed = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let column = match &assignment.target {
                AssignmentTarget::ColumnName(name) => name
                    .0
                    .last()
                    .map(|ident| ident.value.clone())
                    .ok_or_else(|| anyhow!("Empty assignment target"))?,
                _ => return Err(anyhow!("Unsupported assignment target")),
            };
            parsed.push((column, Self::parse_operand(&assignment.value, params)?));
        }

        // WHERE clause is required for updates (safety feature)
        let filter = match selection {
            Some(expr) => Self::parse_filter(expr, params)?,
            None => return Err(anyhow!("UPDATE requires WHERE clause")),
        };

        Ok(Query::Update {
            table_name,
            assignments: parsed,
            filter,
        })
    }

    /// Parse DELETE statement
    fn parse_delete(delete: &sqlparser::ast::Delete, params: &mut Placeholders) -> Result<Query> {
        let tables = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        let table_name = match tables.as_slice() {
            [table] => Self::relation_name(table)?,
            [] => return Err(anyhow!("No table specified")),
            _ => return Err(anyhow!("Only single table deletes are supported")),
        };

        // WHERE clause is required for deletes (safety feature)
        let filter = match &delete.selection {
            Some(expr) => Self::parse_filter(expr, params)?,
            None => return Err(anyhow!("DELETE requires WHERE clause")),
        };

        Ok(Query::Delete { table_name, filter })
    }

    /// Parse CALL statement
    fn parse_call(function: &sqlparser::ast::Function, params: &mut Placeholders) -> Result<Query> {
        let procedure = Self::object_name(&function.name);

        let args = match &function.args {
            FunctionArguments::None => Vec::new(),
            FunctionArguments::List(list) => {
                let mut args = Vec::with_capacity(list.args.len());
                for arg in &list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => {
                            args.push(Self::parse_operand(expr, params)?)
                        }
                        _ => return Err(anyhow!("Only positional procedure arguments are supported")),
                    }
                }
                args
            }
            FunctionArguments::Subquery(_) => {
                return Err(anyhow!("Subquery procedure arguments are not supported"))
            }
        };

        Ok(Query::Call { procedure, args })
    }

    /// Helper: Parse data type
    fn parse_data_type(sql_type: &SqlDataType) -> Result<DataType> {
        match sql_type {
            SqlDataType::Int(..)
            | SqlDataType::Integer(..)
            | SqlDataType::BigInt(..)
            | SqlDataType::SmallInt(..)
            | SqlDataType::TinyInt(..) => Ok(DataType::Integer),
            SqlDataType::Text
            | SqlDataType::Varchar(..)
            | SqlDataType::Char(..)
            | SqlDataType::String(..) => Ok(DataType::Text),
            SqlDataType::Boolean | SqlDataType::Bool => Ok(DataType::Boolean),
            SqlDataType::Blob(..)
            | SqlDataType::Bytea
            | SqlDataType::Binary(..)
            | SqlDataType::Varbinary(..) => Ok(DataType::Blob),
            SqlDataType::Time(..) => Ok(DataType::Time),
            SqlDataType::Date => Ok(DataType::Date),
            SqlDataType::Timestamp(..) | SqlDataType::Datetime(..) => Ok(DataType::Timestamp),
            _ => Err(anyhow!("Unsupported data type: {:?}", sql_type)),
        }
    }

    fn parse_operands(exprs: &[Expr], params: &mut Placeholders) -> Result<Vec<Operand>> {
        let mut operands = Vec::with_capacity(exprs.len());
        for expr in exprs {
            operands.push(Self::parse_operand(expr, params)?);
        }
        Ok(operands)
    }

    /// Helper: Parse a literal or a placeholder
    fn parse_operand(expr: &Expr, params: &mut Placeholders) -> Result<Operand> {
        match expr {
            Expr::Value(SqlValue::Placeholder(p)) if p == "?" => Ok(Operand::Param(params.take())),
            Expr::Value(SqlValue::Placeholder(p)) => {
                Err(anyhow!("Only positional '?' placeholders are supported, got {}", p))
            }
            Expr::Value(value) => Ok(Operand::Literal(Self::parse_literal(value)?)),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => match Self::parse_operand(expr, params)? {
                Operand::Literal(Value::Integer(i)) => Ok(Operand::Literal(Value::Integer(-i))),
                _ => Err(anyhow!("Only numbers can be negated")),
            },
            Expr::Nested(inner) => Self::parse_operand(inner, params),
            _ => Err(anyhow!("Unsupported value expression: {}", expr)),
        }
    }

    fn parse_literal(value: &SqlValue) -> Result<Value> {
        match value {
            SqlValue::Number(n, _) => n
                .parse()
                .map(Value::Integer)
                .map_err(|_| anyhow!("Only integer literals are supported, got {}", n)),
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                Ok(Value::Text(s.clone()))
            }
            SqlValue::Boolean(b) => Ok(Value::Boolean(*b)),
            SqlValue::Null => Ok(Value::Null),
            _ => Err(anyhow!("Unsupported literal: {}", value)),
        }
    }

    /// Helper: Parse a WHERE clause
    fn parse_filter(expr: &Expr, params: &mut Placeholders) -> Result<Filter> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let left = Self::parse_filter(left, params)?;
                let right = Self::parse_filter(right, params)?;
                Ok(Filter::And(Box::new(left), Box::new(right)))
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                let left = Self::parse_filter(left, params)?;
                let right = Self::parse_filter(right, params)?;
                Ok(Filter::Or(Box::new(left), Box::new(right)))
            }
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                // Accept both `column = value` and `value = column`
                if let Ok(column) = Self::column_name(left) {
                    let value = Self::parse_operand(right, params)?;
                    Ok(Filter::Eq { column, value })
                } else {
                    let value = Self::parse_operand(left, params)?;
                    let column = Self::column_name(right)?;
                    Ok(Filter::Eq { column, value })
                }
            }
            Expr::BinaryOp { op, .. } => Err(anyhow!("Unsupported operator in WHERE clause: {}", op)),
            Expr::IsNull(inner) => Ok(Filter::IsNull {
                column: Self::column_name(inner)?,
                negated: false,
            }),
            Expr::IsNotNull(inner) => Ok(Filter::IsNull {
                column: Self::column_name(inner)?,
                negated: true,
            }),
            Expr::Nested(inner) => Self::parse_filter(inner, params),
            _ => Err(anyhow!("Unsupported WHERE clause format")),
        }
    }

    fn column_name(expr: &Expr) -> Result<String> {
        match expr {
            Expr::Identifier(ident) => Ok(ident.value.clone()),
            // table.column: the table prefix is redundant with a single table
            Expr::CompoundIdentifier(idents) => idents
                .last()
                .map(|ident| ident.value.clone())
                .ok_or_else(|| anyhow!("Empty column reference")),
            _ => Err(anyhow!("Expected column name, got {}", expr)),
        }
    }

    fn object_name(name: &ObjectName) -> String {
        name.0
            .iter()
            .map(|i| i.value.clone())
            .collect::<Vec<_>>()
            .join(".")
    }

    fn relation_name(table: &TableWithJoins) -> Result<String> {
        if !table.joins.is_empty() {
            return Err(anyhow!("Joins are not supported"));
        }
        match &table.relation {
            TableFactor::Table { name, .. } => Ok(Self::object_name(name)),
            _ => Err(anyhow!("Unsupported table reference")),
        }
    }

    /// Helper: Extract table name from SELECT
    fn extract_table_name(select: &Select) -> Result<String> {
        match select.from.as_slice() {
            [table] => Self::relation_name(table),
            [] => Err(anyhow!("No table specified in SELECT")),
            _ => Err(anyhow!("Only single table queries are supported")),
        }
    }
}
