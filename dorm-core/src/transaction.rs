use crate::{
    ConnectionGuard, Connector, Error, Executor, ReusableConnection, Result, RowLabeled,
    RowsAffected, Value,
};
use std::{future::Future, time::Duration};

/// Explicit transaction, holds the connection of its data source until it ends.
///
/// It is consumed by [`Transaction::commit`] or [`Transaction::rollback`]. Dropping
/// it unfinished discards the connection, the server then rolls back.
///
/// Once the connection dies the server has already rolled back. The transaction
/// is then aborted: statements and [`Transaction::commit`] fail, only
/// [`Transaction::rollback`] succeeds.
pub struct Transaction<C: Connector> {
    guard: ConnectionGuard<C>,
    finished: bool,
}

impl<C: Connector> Transaction<C> {
    pub async fn begin(connection: &ReusableConnection<C>, timeout: Duration) -> Result<Self> {
        let mut guard = connection.acquire_for("tx-", timeout).await?;
        guard.begin().await?;
        log::debug!("{} began on `{}`", guard.id(), guard.data_source());
        Ok(Self {
            guard,
            finished: false,
        })
    }

    pub fn id(&self) -> &str {
        self.guard.id()
    }

    pub fn data_source(&self) -> &str {
        self.guard.data_source()
    }

    /// True when the connection died after `BEGIN`.
    pub fn is_aborted(&self) -> bool {
        self.guard.lost_connection()
    }

    fn check_aborted(&self) -> Result<()> {
        if self.is_aborted() {
            return Err(Error::connection(format!(
                "{} lost the connection of `{}`, the transaction was rolled back by the server",
                self.id(),
                self.data_source()
            )));
        }
        Ok(())
    }

    pub async fn commit(mut self) -> Result<()> {
        if let Err(e) = self.check_aborted() {
            self.finished = true;
            log::error!("{:#}", e);
            return Err(e);
        }
        self.guard.commit().await?;
        self.finished = true;
        log::debug!("{} committed", self.id());
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        if self.is_aborted() {
            self.finished = true;
            log::debug!("{} was already rolled back by the server", self.id());
            return Ok(());
        }
        self.guard.rollback().await?;
        self.finished = true;
        log::debug!("{} rolled back", self.id());
        Ok(())
    }
}

impl<C: Connector> Executor for Transaction<C> {
    fn placeholder(&self) -> &'static str {
        self.guard.placeholder()
    }

    fn fetch(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        async move {
            self.check_aborted()?;
            self.guard.fetch(sql, args).await
        }
    }

    fn fetch_first(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move {
            self.check_aborted()?;
            self.guard.fetch_first(sql, args).await
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            self.check_aborted()?;
            self.guard.execute(sql, args).await
        }
    }
}

impl<C: Connector> Drop for Transaction<C> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!(
                "{} on `{}` dropped without commit or rollback",
                self.guard.id(),
                self.guard.data_source()
            );
            self.guard.discard();
        }
    }
}
