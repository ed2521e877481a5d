use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgArguments, postgres::PgPoolOptions, Arguments, PgPool};
use tracing::info;

use crate::{
    config::AppConfig,
    error::StoreError,
    users::{
        fields::FieldValue,
        query::{QueryBuilder, Statement, StatementKind},
        repo_types::User,
        store::UserStore,
    },
};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Creates the user table (with its unique email constraint) if absent.
pub async fn ensure_schema(db: &PgPool, queries: &QueryBuilder) -> anyhow::Result<()> {
    sqlx::query(&queries.create_table())
        .execute(db)
        .await
        .with_context(|| format!("create table {}", queries.table()))?;
    info!(table = queries.table(), "schema ready");
    Ok(())
}

/// Binds a statement's arguments in placeholder order.
fn arguments(stmt: &Statement) -> PgArguments {
    let mut args = PgArguments::default();
    for value in &stmt.args {
        match value {
            FieldValue::Int(v) => args.add(*v),
            FieldValue::Text(v) => args.add(v.clone()),
            FieldValue::Bytes(v) => args.add(v.clone()),
            FieldValue::Timestamp(v) => args.add(*v),
        }
    }
    args
}

/// Refuses to run a statement through the wrong executor method.
fn expect_kind(stmt: &Statement, ok: bool, method: &str) -> Result<(), StoreError> {
    if ok {
        return Ok(());
    }
    Err(StoreError::Malformed(format!(
        "{method} cannot run a {} statement",
        stmt.kind.name()
    )))
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn fetch_users(&self, stmt: &Statement) -> Result<Vec<User>, StoreError> {
        expect_kind(stmt, matches!(stmt.kind, StatementKind::Select { .. }), "fetch_users")?;
        let users = sqlx::query_as_with::<_, User, _>(&stmt.sql, arguments(stmt))
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    async fn insert_returning_id(&self, stmt: &Statement) -> Result<i64, StoreError> {
        expect_kind(stmt, stmt.kind == StatementKind::Insert, "insert_returning_id")?;
        let id = sqlx::query_scalar_with::<_, i64, _>(&stmt.sql, arguments(stmt))
            .fetch_one(&self.db)
            .await?;
        Ok(id)
    }

    async fn execute(&self, stmt: &Statement) -> Result<u64, StoreError> {
        let ok = matches!(stmt.kind, StatementKind::Update | StatementKind::Delete);
        expect_kind(stmt, ok, "execute")?;
        let result = sqlx::query_with(&stmt.sql, arguments(stmt))
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::query::Combinator;

    // The pool is never connected: every call is refused before a query runs.
    fn store() -> PgUserStore {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://gram@localhost/gram")
            .unwrap();
        PgUserStore::new(db)
    }

    #[tokio::test]
    async fn statements_of_the_wrong_kind_are_refused() {
        let store = store();
        let queries = QueryBuilder::for_service(None).unwrap();

        let err = store.fetch_users(&queries.delete(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "malformed statement: fetch_users cannot run a delete statement");

        let select = queries.select(vec![], Combinator::And);
        let err = store.insert_returning_id(&select).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));

        let err = store.execute(&select).await.unwrap_err();
        assert!(err.to_string().contains("execute cannot run a select"));
    }
}
