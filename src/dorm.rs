use crate::{DataSourceConfig, DormConfig, InsertMiddleware, Middlewares, QueryMiddleware};
use dorm_core::{
    ConditionTree, ConnectionGuard, Delete, Error, Executor, Filter, FromRow, Insert, Query,
    Record, Result, RowLabeled, RowsAffected, TableShape, Update, UpdateColumns, Value, execute,
    select_many,
};
use dorm_mysql::{MySQLConnector, MySQLDataSource, MySQLTransaction};
use std::{
    collections::BTreeMap,
    future::Future,
    sync::{Arc, RwLock},
};

/// Splits `database.table`, a bare table name lives in the default database.
fn split_table(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((database, table)) => (Some(database), table),
        None => (None, name),
    }
}

/// Connection used by one facade call: freshly acquired or the one held by a
/// transaction.
enum Session<'t> {
    Acquired(ConnectionGuard<MySQLConnector>),
    Transaction(&'t mut MySQLTransaction),
}

impl Executor for Session<'_> {
    fn fetch(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        async move {
            match self {
                Session::Acquired(guard) => guard.fetch(sql, args).await,
                Session::Transaction(tx) => tx.fetch(sql, args).await,
            }
        }
    }

    fn fetch_first(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move {
            match self {
                Session::Acquired(guard) => guard.fetch_first(sql, args).await,
                Session::Transaction(tx) => tx.fetch_first(sql, args).await,
            }
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            match self {
                Session::Acquired(guard) => guard.execute(sql, args).await,
                Session::Transaction(tx) => tx.execute(sql, args).await,
            }
        }
    }
}

/// Entry point: the configured data sources and the middlewares.
///
/// Every terminal call takes the id of the data source and an optional
/// transaction. Without a transaction the call locks the connection of the data
/// source for its own duration only.
#[derive(Default)]
pub struct Dorm {
    data_sources: RwLock<BTreeMap<String, Arc<MySQLDataSource>>>,
    middlewares: Middlewares,
}

impl Dorm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the data sources described by a `{"data_source": {...}}` document.
    pub fn init(config: serde_json::Value) -> Result<Self> {
        Self::from_config(DormConfig::from_json(config)?)
    }

    pub fn from_config(config: DormConfig) -> Result<Self> {
        let dorm = Self::new();
        for (id, data_source) in config.data_source {
            dorm.add_data_source(id, data_source)?;
        }
        log::info!("Dorm initialized");
        Ok(dorm)
    }

    pub fn add_data_source(
        &self,
        id: impl Into<String>,
        config: DataSourceConfig,
    ) -> Result<Arc<MySQLDataSource>> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::configuration("data source id is required"));
        }
        config.validate()?;
        let mut data_sources = self
            .data_sources
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if data_sources.contains_key(&id) {
            return Err(Error::configuration(format!(
                "data source with id `{id}` already exists"
            )));
        }
        let data_source = Arc::new(MySQLDataSource::new(
            id.clone(),
            config.connector(),
            config.options(),
        ));
        data_sources.insert(id.clone(), data_source.clone());
        log::info!(
            "Added the data source `{id}` ({}:{}/{})",
            config.host,
            config.port,
            config.database
        );
        Ok(data_source)
    }

    pub fn data_source(&self, id: &str) -> Result<Arc<MySQLDataSource>> {
        self.data_sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| Error::configuration(format!("data source with id `{id}` not found")))
    }

    pub fn data_source_ids(&self) -> Vec<String> {
        self.data_sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Unregisters and closes a data source.
    pub async fn remove_data_source(&self, id: &str) -> Result<()> {
        let removed = self
            .data_sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        match removed {
            Some(data_source) => data_source.close().await,
            None => Err(Error::configuration(format!(
                "data source with id `{id}` not found"
            ))),
        }
    }

    /// Closes every data source, the first error is returned after all of them were closed.
    pub async fn close(&self) -> Result<()> {
        let data_sources = self
            .data_sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect::<Vec<_>>();
        let mut result = Ok(());
        for data_source in data_sources {
            if let Err(e) = data_source.close().await {
                log::error!("{:#}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub fn use_query_middleware(
        &self,
        middleware: impl Fn(&str, &mut ConditionTree) -> Result<()> + Send + Sync + 'static,
    ) {
        self.middlewares
            .add_query(Arc::new(middleware) as QueryMiddleware);
    }

    pub fn use_insert_middleware(
        &self,
        middleware: impl Fn(&str, &mut Record) -> Result<()> + Send + Sync + 'static,
    ) {
        self.middlewares
            .add_insert(Arc::new(middleware) as InsertMiddleware);
    }

    /// Runs the query middlewares on `statement`, the conditions they add are
    /// validated like the ones of the caller.
    pub fn scope<F: Filter>(&self, mut statement: F) -> Result<F> {
        let table = statement.table().to_string();
        self.middlewares
            .apply_query(&table, statement.predicate_mut())?;
        for condition in statement.predicate().conditions() {
            statement.check_condition(condition)?;
        }
        Ok(statement)
    }

    /// Runs the insert middlewares on `records`.
    pub fn scope_records<'r>(
        &self,
        insert: &Insert,
        records: impl IntoIterator<Item = &'r mut Record>,
    ) -> Result<()> {
        self.middlewares
            .apply_insert(&insert.shape().table, records)
    }

    async fn session<'t>(
        &self,
        data_source: &str,
        operation: &str,
        tx: Option<&'t mut MySQLTransaction>,
    ) -> Result<Session<'t>> {
        match tx {
            Some(tx) if tx.data_source() != data_source => Err(Error::validation(format!(
                "transaction {} belongs to the data source `{}`, not `{data_source}`",
                tx.id(),
                tx.data_source()
            ))),
            Some(tx) => Ok(Session::Transaction(tx)),
            None => Ok(Session::Acquired(
                self.data_source(data_source)?.acquire(operation).await?,
            )),
        }
    }

    /// Shape of `table` (or `database.table`) from the schema cache.
    ///
    /// A table not cached yet is looked up inside `tx` when one is given.
    pub async fn shape(
        &self,
        data_source: &str,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<TableShape> {
        let (database, table) = split_table(table);
        self.data_source(data_source)?
            .shape(database, table, tx)
            .await
    }

    pub async fn query(
        &self,
        data_source: &str,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Query> {
        Ok(Query::from_shape(self.shape(data_source, table, tx).await?))
    }

    pub async fn insert_into(
        &self,
        data_source: &str,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Insert> {
        Ok(Insert::from_shape(self.shape(data_source, table, tx).await?))
    }

    pub async fn update_table(
        &self,
        data_source: &str,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Update> {
        Ok(Update::from_shape(self.shape(data_source, table, tx).await?))
    }

    pub async fn delete_from(
        &self,
        data_source: &str,
        table: &str,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Delete> {
        Ok(Delete::from_shape(self.shape(data_source, table, tx).await?))
    }

    pub async fn one(
        &self,
        data_source: &str,
        query: Query,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Option<RowLabeled>> {
        let query = self.scope(query)?;
        let mut session = self.session(data_source, "query-", tx).await?;
        query.one(&mut session).await
    }

    pub async fn one_as<T: FromRow>(
        &self,
        data_source: &str,
        query: Query,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Option<T>> {
        self.one(data_source, query, tx)
            .await?
            .map(T::from_row)
            .transpose()
    }

    pub async fn list(
        &self,
        data_source: &str,
        query: Query,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Vec<RowLabeled>> {
        let query = self.scope(query)?;
        let mut session = self.session(data_source, "query-", tx).await?;
        query.list(&mut session).await
    }

    pub async fn list_as<T: FromRow>(
        &self,
        data_source: &str,
        query: Query,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Vec<T>> {
        self.list(data_source, query, tx)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    /// Rows of page `page` (from 1) and the total count of matching rows.
    pub async fn page(
        &self,
        data_source: &str,
        query: Query,
        page: u64,
        page_size: u64,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<(Vec<RowLabeled>, u64)> {
        let query = self.scope(query)?;
        let mut session = self.session(data_source, "query-", tx).await?;
        query.page(&mut session, page, page_size).await
    }

    pub async fn count(
        &self,
        data_source: &str,
        query: Query,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<u64> {
        let query = self.scope(query)?;
        let mut session = self.session(data_source, "query-", tx).await?;
        query.count(&mut session).await
    }

    pub async fn insert(
        &self,
        data_source: &str,
        insert: &Insert,
        mut record: Record,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<RowsAffected> {
        self.scope_records(insert, [&mut record])?;
        let mut session = self.session(data_source, "insert-", tx).await?;
        insert.insert(&mut session, &record).await
    }

    pub async fn insert_bulk(
        &self,
        data_source: &str,
        insert: &Insert,
        mut records: Vec<Record>,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<RowsAffected> {
        self.scope_records(insert, records.iter_mut())?;
        let mut session = self.session(data_source, "insert-", tx).await?;
        insert.insert_bulk(&mut session, &records).await
    }

    pub async fn upsert(
        &self,
        data_source: &str,
        insert: &Insert,
        mut record: Record,
        update: &UpdateColumns,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<RowsAffected> {
        self.scope_records(insert, [&mut record])?;
        let mut session = self.session(data_source, "insert-", tx).await?;
        insert.upsert(&mut session, &record, update).await
    }

    pub async fn upsert_bulk(
        &self,
        data_source: &str,
        insert: &Insert,
        mut records: Vec<Record>,
        update: &UpdateColumns,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<RowsAffected> {
        self.scope_records(insert, records.iter_mut())?;
        let mut session = self.session(data_source, "insert-", tx).await?;
        insert.upsert_bulk(&mut session, &records, update).await
    }

    /// Returns the number of rows changed.
    pub async fn update(
        &self,
        data_source: &str,
        update: Update,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<u64> {
        let update = self.scope(update)?;
        let mut session = self.session(data_source, "update-", tx).await?;
        update.update(&mut session).await
    }

    /// Returns the number of rows removed.
    pub async fn delete(
        &self,
        data_source: &str,
        delete: Delete,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<u64> {
        let delete = self.scope(delete)?;
        let mut session = self.session(data_source, "delete-", tx).await?;
        delete.delete(&mut session).await
    }

    /// Runs a hand written query, `?` marks the positional arguments.
    pub async fn raw_query(
        &self,
        data_source: &str,
        sql: &str,
        args: Vec<Value>,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<Vec<RowLabeled>> {
        let mut session = self.session(data_source, "raw-", tx).await?;
        select_many(&mut session, sql, args).await
    }

    pub async fn raw_execute(
        &self,
        data_source: &str,
        sql: &str,
        args: Vec<Value>,
        tx: Option<&mut MySQLTransaction>,
    ) -> Result<RowsAffected> {
        let mut session = self.session(data_source, "raw-", tx).await?;
        execute(&mut session, sql, args).await
    }

    /// Starts a transaction, it keeps the connection of the data source locked
    /// until it is committed, rolled back or dropped.
    pub async fn begin(&self, data_source: &str) -> Result<MySQLTransaction> {
        self.data_source(data_source)?.begin().await
    }
}
