use dorm_core::{ConditionTree, Record, Result};
use std::sync::{Arc, RwLock};

/// Runs before a query, update or delete is compiled, it can alter the predicate
/// (e.g. restrict every statement to the current tenant).
pub type QueryMiddleware = Arc<dyn Fn(&str, &mut ConditionTree) -> Result<()> + Send + Sync>;

/// Runs on every record before an insert is compiled.
pub type InsertMiddleware = Arc<dyn Fn(&str, &mut Record) -> Result<()> + Send + Sync>;

/// Middlewares in registration order.
#[derive(Default)]
pub struct Middlewares {
    query: RwLock<Vec<QueryMiddleware>>,
    insert: RwLock<Vec<InsertMiddleware>>,
}

impl Middlewares {
    pub fn add_query(&self, middleware: QueryMiddleware) {
        self.query
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(middleware);
    }

    pub fn add_insert(&self, middleware: InsertMiddleware) {
        self.insert
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(middleware);
    }

    pub fn apply_query(&self, table: &str, predicate: &mut ConditionTree) -> Result<()> {
        let middlewares = self.query.read().unwrap_or_else(|e| e.into_inner()).clone();
        for middleware in middlewares {
            middleware(table, predicate)?;
        }
        Ok(())
    }

    pub fn apply_insert<'r>(
        &self,
        table: &str,
        records: impl IntoIterator<Item = &'r mut Record>,
    ) -> Result<()> {
        let middlewares = self.insert.read().unwrap_or_else(|e| e.into_inner()).clone();
        if middlewares.is_empty() {
            return Ok(());
        }
        for record in records {
            for middleware in &middlewares {
                middleware(table, record)?;
            }
        }
        Ok(())
    }
}
