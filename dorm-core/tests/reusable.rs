#[cfg(test)]
mod tests {
    use dorm_core::{
        Connection, ConnectionState, Connector, Executor, Result, ReusableConnection, RowLabeled,
        RowsAffected, Transaction, Value, is_connection, select_one,
    };
    use std::{
        fmt,
        future::Future,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio::time::sleep;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[derive(Debug)]
    struct ConnectionLost;
    impl fmt::Display for ConnectionLost {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("connection lost")
        }
    }
    impl std::error::Error for ConnectionLost {}

    #[derive(Default)]
    struct Server {
        connects: AtomicUsize,
        pings: AtomicUsize,
        statements: AtomicUsize,
        disconnects: AtomicUsize,
        refuse: AtomicBool,
        fail_pings: AtomicBool,
        log: Mutex<Vec<String>>,
    }

    impl Server {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct MockConnection {
        server: Arc<Server>,
        serial: usize,
    }

    impl Executor for MockConnection {
        fn fetch(
            &mut self,
            sql: &str,
            _args: Vec<Value>,
        ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
            self.server.statements.fetch_add(1, Ordering::SeqCst);
            self.server
                .log
                .lock()
                .unwrap()
                .push(format!("{}: {sql}", self.serial));
            let result = if sql.contains("dead") {
                Err(ConnectionLost.into())
            } else if sql.contains("bad") {
                Err(dorm_core::anyhow::anyhow!("syntax error"))
            } else {
                Ok(vec![RowLabeled::new(
                    Arc::from(vec!["serial".to_string()]),
                    Box::new([Value::UInt64(self.serial as u64)]),
                )])
            };
            async move { result }
        }

        fn execute(
            &mut self,
            sql: &str,
            args: Vec<Value>,
        ) -> impl Future<Output = Result<RowsAffected>> + Send {
            let fetch = self.fetch(sql, args);
            async move {
                fetch.await?;
                Ok(RowsAffected {
                    rows_affected: 1,
                    last_affected_id: None,
                })
            }
        }
    }

    impl Connection for MockConnection {
        fn ping(&mut self) -> impl Future<Output = Result<()>> + Send {
            self.server.pings.fetch_add(1, Ordering::SeqCst);
            let failed = self.server.fail_pings.swap(false, Ordering::SeqCst);
            async move {
                if failed {
                    Err(ConnectionLost.into())
                } else {
                    Ok(())
                }
            }
        }
        fn begin(&mut self) -> impl Future<Output = Result<()>> + Send {
            let result = self.fetch("BEGIN", vec![]);
            async move { result.await.map(|_| ()) }
        }
        fn commit(&mut self) -> impl Future<Output = Result<()>> + Send {
            let result = self.fetch("COMMIT", vec![]);
            async move { result.await.map(|_| ()) }
        }
        fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send {
            let result = self.fetch("ROLLBACK", vec![]);
            async move { result.await.map(|_| ()) }
        }
        fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
            self.server.disconnects.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }
    }

    struct MockConnector {
        server: Arc<Server>,
    }

    impl Connector for MockConnector {
        type Connection = MockConnection;

        fn connect(&self) -> impl Future<Output = Result<MockConnection>> + Send {
            let server = self.server.clone();
            async move {
                if server.refuse.load(Ordering::SeqCst) {
                    return Err(dorm_core::anyhow::anyhow!("connection refused"));
                }
                let serial = server.connects.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(MockConnection { server, serial })
            }
        }

        fn is_fatal(&self, error: &dorm_core::anyhow::Error) -> bool {
            error.downcast_ref::<ConnectionLost>().is_some()
        }
    }

    fn reusable(keep_alive: Duration) -> (Arc<Server>, Arc<ReusableConnection<MockConnector>>) {
        let server = Arc::new(Server::default());
        let connection = ReusableConnection::new(
            "mock",
            MockConnector {
                server: server.clone(),
            },
            keep_alive,
        );
        (server, Arc::new(connection))
    }

    async fn serial<E: Executor>(executor: &mut E) -> u64 {
        select_one(executor, "SELECT serial", vec![])
            .await
            .expect("Query failed")
            .expect("No row")
            .get("serial")
            .expect("No serial column")
    }

    #[tokio::test]
    async fn lazy_creation() {
        let (server, connection) = reusable(Duration::ZERO);
        assert_eq!(connection.state(), ConnectionState::Uninitialized);
        assert_eq!(server.connects.load(Ordering::SeqCst), 0);
        {
            let mut guard = connection.acquire(TIMEOUT).await.unwrap();
            assert_eq!(connection.state(), ConnectionState::Busy);
            assert!(guard.id().starts_with("query-"));
            assert_eq!(serial(&mut guard).await, 1);
        }
        assert_eq!(connection.state(), ConnectionState::Idle);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        assert_eq!(serial(&mut guard).await, 1);
        guard.release();
        assert_eq!(server.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn mutual_exclusion() {
        let (server, connection) = reusable(Duration::ZERO);
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let tasks = (0..16)
            .map(|_| {
                let connection = connection.clone();
                let inside = inside.clone();
                let overlaps = overlaps.clone();
                tokio::spawn(async move {
                    let mut guard = connection
                        .acquire(Duration::from_secs(10))
                        .await
                        .expect("Could not acquire");
                    if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    serial(&mut guard).await;
                    sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(server.statements.load(Ordering::SeqCst), 16);
        assert_eq!(server.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn acquire_timeout() {
        let (_, connection) = reusable(Duration::ZERO);
        let _guard = connection.acquire(TIMEOUT).await.unwrap();
        let error = connection
            .acquire(Duration::from_millis(50))
            .await
            .err()
            .expect("Acquired a locked connection");
        assert!(is_connection(&error));
    }

    #[tokio::test]
    async fn creation_failure_releases_lock() {
        let (server, connection) = reusable(Duration::ZERO);
        server.refuse.store(true, Ordering::SeqCst);
        let error = connection.acquire(TIMEOUT).await.err().expect("Connected");
        assert!(is_connection(&error));
        assert_eq!(connection.state(), ConnectionState::Broken);
        server.refuse.store(false, Ordering::SeqCst);
        let mut guard = connection
            .acquire(Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(serial(&mut guard).await, 1);
    }

    #[tokio::test]
    async fn fatal_error_recreates() {
        let (server, connection) = reusable(Duration::ZERO);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        assert_eq!(serial(&mut guard).await, 1);
        let error = select_one(&mut guard, "SELECT dead", vec![])
            .await
            .unwrap_err();
        assert!(is_connection(&error));
        assert!(guard.is_active());
        assert_eq!(server.connects.load(Ordering::SeqCst), 2);
        assert_eq!(serial(&mut guard).await, 2);
        assert_eq!(
            server.log(),
            ["1: SELECT serial", "1: SELECT dead", "2: SELECT serial"]
        );

        let error = select_one(&mut guard, "SELECT bad", vec![])
            .await
            .unwrap_err();
        assert!(!is_connection(&error));
        assert_eq!(server.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_recreation_breaks_guard() {
        let (server, connection) = reusable(Duration::ZERO);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        server.refuse.store(true, Ordering::SeqCst);
        assert!(select_one(&mut guard, "SELECT dead", vec![]).await.is_err());
        assert!(!guard.is_active());
        let error = select_one(&mut guard, "SELECT serial", vec![])
            .await
            .unwrap_err();
        assert!(is_connection(&error));
        drop(guard);
        assert_eq!(connection.state(), ConnectionState::Broken);
        server.refuse.store(false, Ordering::SeqCst);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        assert_eq!(serial(&mut guard).await, 2);
    }

    #[tokio::test]
    async fn close() {
        let (server, connection) = reusable(Duration::ZERO);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        serial(&mut guard).await;
        drop(guard);
        connection.close().await.unwrap();
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert_eq!(server.disconnects.load(Ordering::SeqCst), 1);
        let error = connection.acquire(TIMEOUT).await.err().expect("Acquired");
        assert!(is_connection(&error));
        connection.close().await.unwrap();
        assert_eq!(server.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keep_alive() {
        let (server, connection) = reusable(Duration::from_millis(20));
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        serial(&mut guard).await;
        drop(guard);
        sleep(Duration::from_millis(150)).await;
        assert!(server.pings.load(Ordering::SeqCst) > 0);

        server.fail_pings.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(server.connects.load(Ordering::SeqCst), 2);
        assert_eq!(connection.state(), ConnectionState::Idle);

        connection.close().await.unwrap();
        let pings = server.pings.load(Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(server.pings.load(Ordering::SeqCst), pings);
    }

    #[tokio::test]
    async fn keep_alive_skips_busy() {
        let (server, connection) = reusable(Duration::from_millis(10));
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        serial(&mut guard).await;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(server.pings.load(Ordering::SeqCst), 0);
        drop(guard);
        connection.close().await.unwrap();
    }

    #[tokio::test]
    async fn transaction_commit() {
        let (server, connection) = reusable(Duration::ZERO);
        let mut tx = Transaction::begin(&connection, TIMEOUT).await.unwrap();
        assert!(tx.id().starts_with("tx-"));
        assert_eq!(tx.data_source(), "mock");
        assert!(
            connection.acquire(Duration::from_millis(20)).await.is_err(),
            "The transaction must hold the connection"
        );
        serial(&mut tx).await;
        tx.commit().await.unwrap();
        assert_eq!(connection.state(), ConnectionState::Idle);
        let tx = Transaction::begin(&connection, TIMEOUT).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(
            server.log(),
            ["1: BEGIN", "1: SELECT serial", "1: COMMIT", "1: BEGIN", "1: ROLLBACK"]
        );
    }

    #[tokio::test]
    async fn transaction_lost_connection() {
        let (server, connection) = reusable(Duration::ZERO);
        let mut tx = Transaction::begin(&connection, TIMEOUT).await.unwrap();
        serial(&mut tx).await;
        assert!(!tx.is_aborted());
        let error = select_one(&mut tx, "SELECT dead", vec![])
            .await
            .unwrap_err();
        assert!(is_connection(&error));
        assert!(tx.is_aborted());
        let error = select_one(&mut tx, "SELECT serial", vec![])
            .await
            .unwrap_err();
        assert!(is_connection(&error));
        let error = tx.execute("UPDATE serial", vec![]).await.unwrap_err();
        assert!(is_connection(&error));
        let error = tx.commit().await.unwrap_err();
        assert!(is_connection(&error));
        assert_eq!(
            server.log(),
            ["1: BEGIN", "1: SELECT serial", "1: SELECT dead"]
        );

        // The reopened connection is clean and usable
        assert_eq!(connection.state(), ConnectionState::Idle);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        assert_eq!(serial(&mut guard).await, 2);
        drop(guard);

        let mut tx = Transaction::begin(&connection, TIMEOUT).await.unwrap();
        select_one(&mut tx, "SELECT dead", vec![])
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();
        assert_eq!(server.connects.load(Ordering::SeqCst), 3);
        assert_eq!(
            server.log()[3..],
            ["2: SELECT serial", "2: BEGIN", "2: SELECT dead"]
        );
    }

    #[tokio::test]
    async fn transaction_dropped() {
        let (server, connection) = reusable(Duration::ZERO);
        {
            let mut tx = Transaction::begin(&connection, TIMEOUT).await.unwrap();
            serial(&mut tx).await;
        }
        assert_eq!(connection.state(), ConnectionState::Broken);
        let mut guard = connection.acquire(TIMEOUT).await.unwrap();
        assert_eq!(serial(&mut guard).await, 2);
        assert_eq!(server.connects.load(Ordering::SeqCst), 2);
    }
}
