use crate::{MySQLConnector, describe};
use dorm_core::{
    ColumnInfo, ConnectionGuard, Error, ReusableConnection, Result, SchemaCache, SchemaKey,
    TableShape, Transaction,
};
use std::{sync::Arc, time::Duration};

pub type MySQLTransaction = Transaction<MySQLConnector>;

/// Timing of the reusable connection of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSourceOptions {
    /// Longest wait for the connection lock.
    pub acquire_timeout: Duration,
    /// Period of the keep-alive probe, zero disables it.
    pub keep_alive: Duration,
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(5),
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// A configured MySQL database: its reusable connection and the cache of the
/// table fields found so far.
pub struct MySQLDataSource {
    id: String,
    default_database: String,
    acquire_timeout: Duration,
    connection: ReusableConnection<MySQLConnector>,
    schema: SchemaCache,
}

impl MySQLDataSource {
    pub fn new(id: impl Into<String>, connector: MySQLConnector, options: DataSourceOptions) -> Self {
        let id = id.into();
        let default_database = connector.database().unwrap_or_default().to_string();
        Self {
            connection: ReusableConnection::new(id.clone(), connector, options.keep_alive),
            id,
            default_database,
            acquire_timeout: options.acquire_timeout,
            schema: SchemaCache::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn connection(&self) -> &ReusableConnection<MySQLConnector> {
        &self.connection
    }

    /// Locks the connection, `operation` prefixes the id shown in the logs.
    pub async fn acquire(&self, operation: &str) -> Result<ConnectionGuard<MySQLConnector>> {
        self.connection
            .acquire_for(operation, self.acquire_timeout)
            .await
    }

    pub async fn begin(&self) -> Result<MySQLTransaction> {
        Transaction::begin(&self.connection, self.acquire_timeout).await
    }

    fn database<'a>(&'a self, database: Option<&'a str>) -> Result<&'a str> {
        match database.filter(|v| !v.is_empty()) {
            Some(database) => Ok(database),
            None if !self.default_database.is_empty() => Ok(&self.default_database),
            None => Err(Error::validation(format!(
                "data source `{}` has no default database, a database name is required",
                self.id
            ))),
        }
    }

    fn key(&self, database: Option<&str>, table: &str) -> Result<SchemaKey> {
        Ok(SchemaKey::new(&self.id, self.database(database)?, table))
    }

    fn check_transaction(&self, tx: &MySQLTransaction) -> Result<()> {
        if tx.data_source() != self.id {
            return Err(Error::validation(format!(
                "transaction {} belongs to the data source `{}`, not `{}`",
                tx.id(),
                tx.data_source(),
                self.id
            )));
        }
        Ok(())
    }

    /// Catalog description of a table, never cached.
    ///
    /// Runs inside `tx` when given, the connection is held by it until it ends.
    pub async fn describe(
        &self,
        database: Option<&str>,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Vec<ColumnInfo>> {
        let database = self.database(database)?;
        match tx {
            Some(tx) => {
                self.check_transaction(tx)?;
                describe(tx, database, table).await
            }
            None => {
                let mut guard = self.acquire("describe-").await?;
                describe(&mut guard, database, table).await
            }
        }
    }

    /// Field names of a table, loaded once then served from the cache.
    pub async fn fields(
        &self,
        database: Option<&str>,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Arc<[String]>> {
        let key = self.key(database, table)?;
        let (database, table) = (key.database.clone(), key.table.clone());
        self.schema
            .fields(&key, move || async move {
                let columns = self.describe(Some(&database), &table, tx).await?;
                Ok::<_, dorm_core::anyhow::Error>(
                    columns.into_iter().map(|v| v.name).collect::<Vec<_>>(),
                )
            })
            .await
    }

    /// Shape of a table, qualified with the database name when one is given.
    pub async fn shape(
        &self,
        database: Option<&str>,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<TableShape> {
        let fields = self.fields(database, table, tx).await?;
        match database.filter(|v| !v.is_empty()) {
            Some(database) => TableShape::new(format!("{database}.{table}"), fields),
            None => TableShape::new(table, fields),
        }
    }

    /// Forgets the cached fields of a table, returns whether they were cached.
    pub fn remove_model(&self, database: Option<&str>, table: &str) -> Result<bool> {
        Ok(self.schema.remove(&self.key(database, table)?))
    }

    pub fn clear_models(&self) {
        self.schema.clear();
    }

    pub async fn close(&self) -> Result<()> {
        self.clear_models();
        self.connection.close().await
    }
}
