use crate::{Executor, Result};
use std::future::Future;

/// A physical connection to the database.
pub trait Connection: Executor + Sized + 'static {
    /// Round trip to verify the connection is still usable.
    fn ping(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Gracefully closes the connection.
    fn disconnect(self) -> impl Future<Output = Result<()>> + Send;
}

/// Creates the physical connections of one data source.
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Whether `error` means the connection is gone and must be recreated.
    fn is_fatal(&self, error: &anyhow::Error) -> bool {
        let _ = error;
        false
    }
}
