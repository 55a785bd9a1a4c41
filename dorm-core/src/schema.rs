use crate::{Result, TableShape};
use std::{
    collections::HashMap,
    fmt::{self, Display},
    future::Future,
    sync::{Arc, Mutex},
};
use tokio::sync::OnceCell;

/// One column as reported by the database catalog.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    /// Index membership, `PRI`, `UNI`, `MUL` or empty.
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
    pub comment: String,
}

/// A table declared statically, used instead of the catalog lookup.
///
/// ```
/// use dorm_core::{Entity, Query};
/// struct User;
/// impl Entity for User {
///     const TABLE: &'static str = "user";
///     const FIELDS: &'static [&'static str] = &["id", "name", "age"];
/// }
/// let (sql, _) = Query::of::<User>().build_select().unwrap();
/// assert_eq!(sql, "SELECT id,name,age FROM user");
/// ```
pub trait Entity {
    const TABLE: &'static str;
    const FIELDS: &'static [&'static str];

    fn shape() -> TableShape {
        TableShape {
            table: Self::TABLE.into(),
            fields: Self::FIELDS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Identifies one table of one data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub data_source: String,
    pub database: String,
    pub table: String,
}

impl SchemaKey {
    pub fn new(
        data_source: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            data_source: data_source.into(),
            database: database.into(),
            table: table.into(),
        }
    }
}

impl Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.data_source, self.database, self.table)
    }
}

type Slot = Arc<OnceCell<Arc<[String]>>>;

/// Memoized field lists, each table is introspected once.
///
/// Concurrent callers of the same key wait for the single running load. A failed
/// load leaves the entry empty so the next call tries again.
#[derive(Default, Debug)]
pub struct SchemaCache {
    entries: Mutex<HashMap<SchemaKey, Slot>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &SchemaKey) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key.clone()).or_default().clone()
    }

    pub async fn fields<F, Fut>(&self, key: &SchemaKey, loader: F) -> Result<Arc<[String]>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        let slot = self.slot(key);
        let fields = slot
            .get_or_try_init(|| async move {
                log::debug!("Loading the fields of {key}");
                let fields = loader().await?;
                Ok::<_, anyhow::Error>(Arc::<[String]>::from(fields))
            })
            .await?;
        Ok(fields.clone())
    }

    /// The cached fields without triggering a load.
    pub fn cached(&self, key: &SchemaKey) -> Option<Arc<[String]>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).and_then(|v| v.get().cloned())
    }

    /// Returns whether the key was present.
    pub fn remove(&self, key: &SchemaKey) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let removed = entries.remove(key).is_some();
        if !removed {
            log::warn!("No cached fields for {key}");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
