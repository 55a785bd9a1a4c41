use crate::{RowWrap, ValueWrap};
use dorm_core::{
    Connection, Connector, Context, Error, Executor, Result, RowLabeled, RowsAffected, Value,
    printable_query,
};
use mysql_async::{Conn, DriverError, Opts, OptsBuilder, Params, prelude::Queryable};
use std::future::Future;
use url::Url;

pub struct MySQLConnection {
    pub(crate) connection: Conn,
}

fn params(args: Vec<Value>) -> Result<Params> {
    if args.is_empty() {
        return Ok(Params::Empty);
    }
    Ok(Params::Positional(
        args.into_iter()
            .map(|v| mysql_async::Value::try_from(ValueWrap(v)))
            .collect::<Result<_>>()?,
    ))
}

fn query_context(sql: &str) -> String {
    format!("While running the query:\n{}", printable_query(sql))
}

impl Executor for MySQLConnection {
    fn fetch(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        async move {
            let result = async {
                let rows = self
                    .connection
                    .exec::<mysql_async::Row, _, _>(sql, params(args)?)
                    .await?;
                rows.into_iter()
                    .map(|row| RowWrap::try_from(row).map(|v| v.0))
                    .collect::<Result<Vec<_>>>()
            }
            .await
            .with_context(|| query_context(sql));
            if let Err(e) = &result {
                log::error!("{:#}", e);
            }
            result
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let result = async {
                if args.is_empty() {
                    self.connection.query_drop(sql).await?;
                } else {
                    self.connection.exec_drop(sql, params(args)?).await?;
                }
                Ok::<_, dorm_core::anyhow::Error>(RowsAffected {
                    rows_affected: self.connection.affected_rows(),
                    last_affected_id: self.connection.last_insert_id(),
                })
            }
            .await
            .with_context(|| query_context(sql));
            if let Err(e) = &result {
                log::error!("{:#}", e);
            }
            result
        }
    }
}

impl Connection for MySQLConnection {
    fn ping(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move { Ok(self.connection.ping().await?) }
    }

    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.connection
                .query_drop("BEGIN")
                .await
                .context("While starting a transaction")
        }
    }

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.connection
                .query_drop("COMMIT")
                .await
                .context("While committing a transaction")
        }
    }

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.connection
                .query_drop("ROLLBACK")
                .await
                .context("While rolling back a transaction")
        }
    }

    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async move { Ok(self.connection.disconnect().await?) }
    }
}

/// Opens the connections of one MySQL data source.
#[derive(Debug, Clone)]
pub struct MySQLConnector {
    opts: Opts,
}

impl MySQLConnector {
    pub fn new(opts: impl Into<Opts>) -> Self {
        Self { opts: opts.into() }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        let context = || format!("While parsing the url `{}`", printable_query(url));
        let parsed = Url::parse(url).with_context(context)?;
        if parsed.scheme() != "mysql" {
            let error = Error::configuration("MySQL connection url must start with `mysql://`")
                .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let opts = Opts::from_url(parsed.as_str()).with_context(context)?;
        Ok(Self::new(opts))
    }

    /// Connection options from discrete settings, `charset` is applied with
    /// `SET NAMES` on every new connection.
    pub fn from_parts(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
        charset: Option<&str>,
    ) -> Self {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port)
            .user(Some(user))
            .pass(Some(password))
            .db_name(Some(database).filter(|v| !v.is_empty()));
        if let Some(charset) = charset {
            builder = builder.setup(vec![format!("SET NAMES {charset}")]);
        }
        Self::new(builder)
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Database selected when a connection opens, if any.
    pub fn database(&self) -> Option<&str> {
        self.opts.db_name()
    }
}

/// Server codes reported when the session is gone: connection killed, client
/// interaction timeout, server gone away, server lost.
const CONNECTION_LOST_CODES: [u16; 4] = [1927, 4031, 2006, 2013];

fn is_connection_lost(error: &mysql_async::Error) -> bool {
    match error {
        mysql_async::Error::Io(..) | mysql_async::Error::Driver(DriverError::ConnectionClosed) => {
            true
        }
        mysql_async::Error::Server(e) => CONNECTION_LOST_CODES.contains(&e.code),
        _ => false,
    }
}

impl Connector for MySQLConnector {
    type Connection = MySQLConnection;

    fn connect(&self) -> impl Future<Output = Result<MySQLConnection>> + Send {
        async move {
            let connection = Conn::new(self.opts.clone()).await.with_context(|| {
                format!(
                    "While trying to connect to `{}:{}`",
                    self.opts.ip_or_hostname(),
                    self.opts.tcp_port()
                )
            })?;
            Ok(MySQLConnection { connection })
        }
    }

    fn is_fatal(&self, error: &dorm_core::anyhow::Error) -> bool {
        error
            .downcast_ref::<mysql_async::Error>()
            .into_iter()
            .chain(
                error
                    .chain()
                    .filter_map(|e| e.downcast_ref::<mysql_async::Error>()),
            )
            .any(is_connection_lost)
    }
}
