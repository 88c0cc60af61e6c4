use anyhow::anyhow;
use futures_util::StreamExt as _;
use sqlx::{Connection, SqliteConnection, sqlite::SqliteConnectOptions};

use super::{DBResult, versions::prelude::*};
use crate::types::PhoneRecord;

#[derive(Debug)]
pub struct Database {
    conn: sqlx::SqliteConnection,
}

#[async_trait::async_trait]
pub trait DatabaseCheckExt {
    fn conn_(&mut self) -> &mut sqlx::SqliteConnection;

    async fn check_database_table(&mut self) -> sqlx::Result<bool> {
        Ok(
            sqlx::query(r#"SELECT 1 FROM sqlite_master WHERE type='table' AND "name" = 'meta'"#)
                .fetch_optional(self.conn_())
                .await?
                .is_some(),
        )
    }

    async fn check_database_version(&mut self) -> sqlx::Result<Option<String>> {
        Ok(
            sqlx::query_as::<_, (String,)>(r#"SELECT "value" FROM "meta" WHERE "key" = 'version'"#)
                .fetch_optional(self.conn_())
                .await?
                .map(|(x,)| x),
        )
    }

    async fn insert_database_version(&mut self) -> sqlx::Result<()> {
        sqlx::query(r#"INSERT INTO "meta" VALUES ('version', ?)"#)
            .bind(current::VERSION)
            .execute(self.conn_())
            .await?;
        Ok(())
    }

    async fn create_db(&mut self) -> sqlx::Result<()> {
        let mut executer = sqlx::raw_sql(current::CREATE_STATEMENT).execute_many(self.conn_());
        while let Some(ret) = executer.next().await {
            ret?;
        }
        Ok(())
    }
}

impl Database {
    pub async fn connect(database: &str) -> DBResult<Self> {
        let conn = SqliteConnection::connect_with(
            &SqliteConnectOptions::new()
                .create_if_missing(true)
                .filename(database),
        )
        .await?;
        Ok(Self { conn })
    }

    pub async fn init(&mut self) -> anyhow::Result<()> {
        if !self.check_database_table().await? {
            self.create_db().await?;
            self.insert_database_version().await?;
        }
        let version = self
            .check_database_version()
            .await?
            .ok_or_else(|| anyhow!("Database version missing"))?;
        match version.as_str() {
            current::VERSION => Ok(()),
            _ => Err(anyhow!("Unknown database version: {version}")),
        }
    }

    pub async fn query_all_phones(&mut self) -> DBResult<Vec<PhoneRecord>> {
        sqlx::query_as(r#"SELECT * FROM "phone""#)
            .fetch_all(&mut self.conn)
            .await
    }

    pub async fn upsert_phone(&mut self, record: &PhoneRecord) -> DBResult<()> {
        sqlx::query(r#"INSERT OR REPLACE INTO "phone" VALUES (?, ?, ?, ?, ?, ?, ?)"#)
            .bind(record.number())
            .bind(record.first_seen())
            .bind(record.last_seen())
            .bind(record.count())
            .bind(record.first_user())
            .bind(record.first_user_name())
            .bind(record.users_to_str())
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete_phones(&mut self, numbers: &[String]) -> DBResult<()> {
        if numbers.is_empty() {
            return Ok(());
        }
        let mut transaction = self.conn.begin().await?;
        for number in numbers {
            sqlx::query(r#"DELETE FROM "phone" WHERE "number" = ?"#)
                .bind(number)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await
    }

    pub async fn clear_phones(&mut self) -> DBResult<()> {
        sqlx::query(r#"DELETE FROM "phone""#)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn close(self) -> DBResult<()> {
        self.conn.close().await
    }
}

impl DatabaseCheckExt for Database {
    fn conn_(&mut self) -> &mut sqlx::SqliteConnection {
        &mut self.conn
    }
}
