use std::fmt::Write as _;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::fields::{FieldValue, UserField};

const BASE_TABLE: &str = "users";

/// Logical combinator between filter terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    /// `exclude_id` means the last argument is an id that must not match.
    Select { combinator: Combinator, exclude_id: bool },
    /// The argument after the SET values is the target id.
    Update,
    Delete,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            StatementKind::Insert => "insert",
            StatementKind::Select { .. } => "select",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

/// Rendered statement. `columns[i]` is bound to `args[i]` (`$i+1`); trailing
/// arguments past `columns.len()` are ids, as described by `kind`.
#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub columns: Vec<UserField>,
    pub args: Vec<FieldValue>,
}

impl Statement {
    fn new(kind: StatementKind, sql: String) -> Self {
        Self {
            kind,
            sql,
            columns: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Pushes a value and returns its placeholder number.
    fn bind(&mut self, value: FieldValue) -> usize {
        self.args.push(value);
        self.args.len()
    }

    /// Values bound to `columns`, in order.
    #[cfg(test)]
    pub fn column_values(&self) -> impl Iterator<Item = (UserField, &FieldValue)> {
        self.columns.iter().copied().zip(self.args.iter())
    }

    /// The id argument following the column values, if any.
    #[cfg(test)]
    pub fn trailing_id(&self) -> Option<i64> {
        match self.args.get(self.columns.len()) {
            Some(FieldValue::Int(id)) => Some(*id),
            _ => None,
        }
    }
}

/// Renders parameterized statements against one user table.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
}

impl QueryBuilder {
    /// `service` prefixes the table name, e.g. `billing_users`.
    pub fn for_service(service: Option<&str>) -> anyhow::Result<Self> {
        lazy_static! {
            static ref SERVICE_RE: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
        }
        let table = match service {
            None => BASE_TABLE.to_string(),
            Some(s) if SERVICE_RE.is_match(s) => format!("{s}_{BASE_TABLE}"),
            Some(s) => anyhow::bail!("invalid service name {s:?}: expected [a-z][a-z0-9_]*"),
        };
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password BYTEA NOT NULL,
                time_created TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            self.table
        )
    }

    pub fn insert(&self, fields: Vec<(UserField, FieldValue)>) -> Statement {
        let mut stmt = Statement::new(StatementKind::Insert, String::new());
        let mut names = String::new();
        let mut params = String::new();
        for (field, value) in fields {
            if !stmt.columns.is_empty() {
                names.push_str(", ");
                params.push_str(", ");
            }
            stmt.columns.push(field);
            let n = stmt.bind(value);
            names.push_str(field.column());
            let _ = write!(params, "${n}");
        }
        stmt.sql = format!(
            "INSERT INTO {} ({names}) VALUES ({params}) RETURNING id",
            self.table
        );
        stmt
    }

    /// An empty filter selects every row.
    pub fn select(&self, filter: Vec<(UserField, FieldValue)>, op: Combinator) -> Statement {
        self.render_select(filter, op, None)
    }

    /// Select that additionally requires `id <> exclude_id`.
    pub fn select_excluding(
        &self,
        filter: Vec<(UserField, FieldValue)>,
        op: Combinator,
        exclude_id: i64,
    ) -> Statement {
        self.render_select(filter, op, Some(exclude_id))
    }

    fn render_select(
        &self,
        filter: Vec<(UserField, FieldValue)>,
        op: Combinator,
        exclude_id: Option<i64>,
    ) -> Statement {
        let kind = StatementKind::Select {
            combinator: op,
            exclude_id: exclude_id.is_some(),
        };
        let mut stmt = Statement::new(kind, format!("SELECT * FROM {}", self.table));
        let mut terms = String::new();
        for (field, value) in filter {
            if !stmt.columns.is_empty() {
                let _ = write!(terms, " {} ", op.as_sql());
            }
            stmt.columns.push(field);
            let n = stmt.bind(value);
            let _ = write!(terms, "{}=${n}", field.column());
        }

        match (terms.is_empty(), exclude_id) {
            (true, None) => {}
            (false, None) => {
                let _ = write!(stmt.sql, " WHERE {terms}");
            }
            (true, Some(id)) => {
                let n = stmt.bind(FieldValue::Int(id));
                let _ = write!(stmt.sql, " WHERE id<>${n}");
            }
            (false, Some(id)) => {
                let n = stmt.bind(FieldValue::Int(id));
                let _ = write!(stmt.sql, " WHERE ({terms}) AND id<>${n}");
            }
        }
        stmt.sql.push_str(" ORDER BY id");
        stmt
    }

    pub fn update(&self, id: i64, fields: Vec<(UserField, FieldValue)>) -> Statement {
        let mut stmt = Statement::new(StatementKind::Update, format!("UPDATE {} SET ", self.table));
        for (field, value) in fields {
            if !stmt.columns.is_empty() {
                stmt.sql.push_str(", ");
            }
            stmt.columns.push(field);
            let n = stmt.bind(value);
            let _ = write!(stmt.sql, "{}=${n}", field.column());
        }
        let n = stmt.bind(FieldValue::Int(id));
        let _ = write!(stmt.sql, " WHERE id=${n}");
        stmt
    }

    pub fn delete(&self, id: i64) -> Statement {
        let mut stmt = Statement::new(
            StatementKind::Delete,
            format!("DELETE FROM {} WHERE id=$1", self.table),
        );
        stmt.bind(FieldValue::Int(id));
        stmt
    }
}
