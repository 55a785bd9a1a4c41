use crate::{
    Connection, Connector, Context, Error, Executor, Result, RowLabeled, RowsAffected, Value,
    operation_id,
};
use std::{
    fmt::{self, Display},
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

const PROBER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the physical connection held by a [`ReusableConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected yet.
    Uninitialized,
    /// Connected and not locked by anyone.
    Idle,
    /// Locked by a caller or by the keep-alive probe.
    Busy,
    /// The last (re)connection attempt failed, the next acquisition retries it.
    Broken,
    Closed,
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Idle => "idle",
            ConnectionState::Busy => "busy",
            ConnectionState::Broken => "broken",
            ConnectionState::Closed => "closed",
        })
    }
}

struct Shared<C: Connector> {
    name: String,
    connector: C,
    slot: Arc<AsyncMutex<Option<C::Connection>>>,
    state: Mutex<ConnectionState>,
}

impl<C: Connector> Shared<C> {
    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Closed is final.
    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *current != ConnectionState::Closed {
            *current = state;
        }
    }

    fn set_released(&self, slot: &Option<C::Connection>) {
        self.set_state(if slot.is_some() {
            ConnectionState::Idle
        } else {
            ConnectionState::Broken
        });
    }

    async fn create(&self, slot: &mut Option<C::Connection>) -> Result<()> {
        let connection = self
            .connector
            .connect()
            .await
            .with_context(|| format!("While connecting the data source `{}`", self.name))?;
        *slot = Some(connection);
        log::info!("Connected the data source `{}`", self.name);
        Ok(())
    }

    /// Drops the current connection, if any, and opens a new one.
    async fn recreate(&self, slot: &mut Option<C::Connection>) -> Result<()> {
        if slot.take().is_some() {
            log::info!("Discarded the connection of `{}`", self.name);
        }
        self.create(slot).await
    }

    async fn probe(&self) {
        if self.state() != ConnectionState::Idle {
            return;
        }
        let Ok(mut slot) = self.slot.clone().try_lock_owned() else {
            log::trace!("Keep-alive of `{}` skipped, connection in use", self.name);
            return;
        };
        if self.state() != ConnectionState::Idle {
            return;
        }
        let Some(connection) = slot.as_mut() else {
            return;
        };
        self.set_state(ConnectionState::Busy);
        let result = connection.ping().await;
        match result {
            Ok(()) => log::trace!("Keep-alive of `{}` succeeded", self.name),
            Err(e) => {
                log::warn!("Keep-alive of `{}` failed, reconnecting: {:#}", self.name, e);
                if let Err(e) = self.recreate(&mut slot).await {
                    log::error!("{:#}", e);
                }
            }
        }
        self.set_released(&slot);
    }
}

async fn keep_alive<C: Connector>(
    shared: Arc<Shared<C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
        shared.probe().await;
    }
    log::debug!("Keep-alive of `{}` stopped", shared.name);
}

struct Prober {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The single physical connection of a data source, shared by every caller.
///
/// Callers lock it through [`ReusableConnection::acquire`], which creates the
/// connection on first use and after a failed reconnection. Once acquired, a
/// background task pings the connection every `keep_alive` period while it is idle
/// and reconnects it when the ping fails.
pub struct ReusableConnection<C: Connector> {
    shared: Arc<Shared<C>>,
    keep_alive: Duration,
    prober: Mutex<Option<Prober>>,
}

impl<C: Connector> ReusableConnection<C> {
    /// A zero `keep_alive` disables the background probe.
    pub fn new(name: impl Into<String>, connector: C, keep_alive: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                connector,
                slot: Arc::new(AsyncMutex::new(None)),
                state: Mutex::new(ConnectionState::Uninitialized),
            }),
            keep_alive,
            prober: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn connector(&self) -> &C {
        &self.shared.connector
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    fn closed_error(&self, id: &str) -> anyhow::Error {
        Error::connection(format!(
            "{id} cannot use the data source `{}`, it is closed",
            self.shared.name
        ))
    }

    pub async fn acquire(&self, timeout: Duration) -> Result<ConnectionGuard<C>> {
        self.acquire_for("query-", timeout).await
    }

    /// Same as [`ReusableConnection::acquire`], `operation` prefixes the id that
    /// follows this acquisition in the logs.
    pub async fn acquire_for(&self, operation: &str, timeout: Duration) -> Result<ConnectionGuard<C>> {
        let id = operation_id(operation);
        let name = &self.shared.name;
        if self.state() == ConnectionState::Closed {
            return Err(self.closed_error(&id));
        }
        log::trace!("{id} waiting for the connection of `{name}`");
        let Ok(mut slot) = time::timeout(timeout, self.shared.slot.clone().lock_owned()).await
        else {
            let error = Error::connection(format!(
                "{id} could not acquire the connection of `{name}` within {timeout:?}"
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        if self.state() == ConnectionState::Closed {
            return Err(self.closed_error(&id));
        }
        if slot.is_none() {
            if let Err(e) = self.shared.create(&mut slot).await {
                self.shared.set_state(ConnectionState::Broken);
                drop(slot);
                let error = e.context(Error::Connection(format!(
                    "{id} has no connection to `{name}`"
                )));
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        self.shared.set_state(ConnectionState::Busy);
        log::trace!("{id} acquired the connection of `{name}`");
        self.start_keep_alive();
        Ok(ConnectionGuard {
            id,
            shared: self.shared.clone(),
            slot,
            lost: false,
        })
    }

    fn start_keep_alive(&self) {
        if self.keep_alive.is_zero() {
            return;
        }
        let mut prober = self.prober.lock().unwrap_or_else(|e| e.into_inner());
        if prober.is_some() {
            return;
        }
        let (shutdown, receiver) = watch::channel(false);
        let handle = tokio::spawn(keep_alive(self.shared.clone(), self.keep_alive, receiver));
        log::debug!(
            "Keep-alive of `{}` started, every {:?}",
            self.shared.name,
            self.keep_alive
        );
        *prober = Some(Prober { shutdown, handle });
    }

    /// Stops the keep-alive and disconnects. Calling it again does nothing.
    ///
    /// Waits for the caller currently holding the connection, if any, to release it.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == ConnectionState::Closed {
                return Ok(());
            }
            *state = ConnectionState::Closed;
        }
        let name = &self.shared.name;
        let prober = self
            .prober
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(Prober {
            shutdown,
            mut handle,
        }) = prober
        {
            let _ = shutdown.send(true);
            if time::timeout(PROBER_STOP_TIMEOUT, &mut handle).await.is_err() {
                log::warn!("Keep-alive of `{name}` did not stop in time, aborting it");
                handle.abort();
            }
        }
        let mut slot = self.shared.slot.lock().await;
        if let Some(connection) = slot.take() {
            connection
                .disconnect()
                .await
                .with_context(|| format!("While disconnecting the data source `{name}`"))?;
            log::info!("Disconnected the data source `{name}`");
        }
        Ok(())
    }
}

impl<C: Connector> Drop for ReusableConnection<C> {
    fn drop(&mut self) {
        let prober = self
            .prober
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(prober) = prober {
            prober.handle.abort();
        }
    }
}

/// Exclusive access to the connection, released when dropped.
///
/// When the driver reports the connection dead, the guard reconnects before
/// returning the error. The failed statement is not run again.
pub struct ConnectionGuard<C: Connector> {
    id: String,
    shared: Arc<Shared<C>>,
    slot: OwnedMutexGuard<Option<C::Connection>>,
    lost: bool,
}

impl<C: Connector> ConnectionGuard<C> {
    /// Operation id of this acquisition.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data_source(&self) -> &str {
        &self.shared.name
    }

    /// False after a failed reconnection, every statement then fails.
    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    /// True once a statement failed because the connection died, even if it was reopened.
    pub fn lost_connection(&self) -> bool {
        self.lost
    }

    fn connection(&mut self) -> Result<&mut C::Connection> {
        match self.slot.as_mut() {
            Some(connection) => Ok(connection),
            None => Err(Error::connection(format!(
                "{} the connection of `{}` is not active",
                self.id, self.shared.name
            ))),
        }
    }

    async fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        let Err(e) = result else {
            return result;
        };
        if !self.shared.connector.is_fatal(&e) {
            return Err(e);
        }
        self.lost = true;
        log::warn!(
            "{} lost the connection of `{}`, reconnecting: {:#}",
            self.id,
            self.shared.name,
            e
        );
        if let Err(e) = self.shared.recreate(&mut self.slot).await {
            log::error!("{:#}", e);
        }
        Err(e.context(Error::Connection(format!(
            "{} lost the connection of `{}`",
            self.id, self.shared.name
        ))))
    }

    pub async fn ping(&mut self) -> Result<()> {
        let result = self.connection()?.ping().await;
        self.check(result).await
    }

    pub async fn begin(&mut self) -> Result<()> {
        let result = self.connection()?.begin().await;
        self.check(result).await
    }

    pub async fn commit(&mut self) -> Result<()> {
        let result = self.connection()?.commit().await;
        self.check(result).await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        let result = self.connection()?.rollback().await;
        self.check(result).await
    }

    /// Throws the connection away, the next acquisition opens a new one.
    pub fn discard(&mut self) {
        if self.slot.take().is_some() {
            log::info!(
                "{} discarded the connection of `{}`",
                self.id,
                self.shared.name
            );
        }
    }

    pub fn release(self) {}
}

impl<C: Connector> Executor for ConnectionGuard<C> {
    fn placeholder(&self) -> &'static str {
        self.slot.as_ref().map_or("?", |v| v.placeholder())
    }

    fn fetch(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        async move {
            let result = self.connection()?.fetch(sql, args).await;
            self.check(result).await
        }
    }

    fn fetch_first(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move {
            let result = self.connection()?.fetch_first(sql, args).await;
            self.check(result).await
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let result = self.connection()?.execute(sql, args).await;
            self.check(result).await
        }
    }
}

impl<C: Connector> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.shared.set_released(&self.slot);
        log::trace!(
            "{} released the connection of `{}`",
            self.id,
            self.shared.name
        );
    }
}
