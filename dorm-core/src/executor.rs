use crate::{Result, RowLabeled, Value, printable_query};
use std::{borrow::Cow, future::Future};

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted identifier when available.
    pub last_affected_id: Option<u64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Something that can run a statement: a physical connection, an acquired
/// [`crate::ConnectionGuard`] or a [`crate::Transaction`].
///
/// Implementations receive the SQL already translated to their placeholder syntax.
pub trait Executor: Send {
    /// Placeholder token of the wire dialect, the statements are compiled with `?`.
    fn placeholder(&self) -> &'static str {
        "?"
    }

    /// Execute the query and return the rows.
    fn fetch(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send;

    /// Execute the query and return the first row, if any.
    fn fetch_first(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move { Ok(self.fetch(sql, args).await?.into_iter().next()) }
    }

    /// Execute the statement and return the number of rows affected.
    fn execute(
        &mut self,
        sql: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;
}

/// Replaces every generic `?` placeholder outside of quoted sections with `placeholder`.
pub fn translate_placeholders<'s>(sql: &'s str, placeholder: &str) -> Cow<'s, str> {
    if placeholder == "?" || !sql.contains('?') {
        return Cow::Borrowed(sql);
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote = None;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), c) if q == c => {
                quote = None;
                out.push(c);
            }
            (None, '?') => out.push_str(placeholder),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn log_statement(sql: &str, args: &[Value]) {
    log::debug!("{}", printable_query(sql));
    if !args.is_empty() {
        log::debug!("### {:?}", args);
    }
}

/// Runs a query and returns its first row.
pub async fn select_one<E: Executor>(
    executor: &mut E,
    sql: &str,
    args: Vec<Value>,
) -> Result<Option<RowLabeled>> {
    log_statement(sql, &args);
    let sql = translate_placeholders(sql, executor.placeholder());
    executor.fetch_first(&sql, args).await
}

/// Runs a query and returns all its rows, no rows is an empty `Vec`.
pub async fn select_many<E: Executor>(
    executor: &mut E,
    sql: &str,
    args: Vec<Value>,
) -> Result<Vec<RowLabeled>> {
    log_statement(sql, &args);
    let sql = translate_placeholders(sql, executor.placeholder());
    executor.fetch(&sql, args).await
}

/// Runs an INSERT, UPDATE or DELETE statement.
pub async fn execute<E: Executor>(
    executor: &mut E,
    sql: &str,
    args: Vec<Value>,
) -> Result<RowsAffected> {
    log_statement(sql, &args);
    let sql = translate_placeholders(sql, executor.placeholder());
    executor.execute(&sql, args).await
}

/// Runs the same statement once per argument row, the result accumulates the
/// affected rows and keeps the last generated id.
pub async fn execute_many<E: Executor>(
    executor: &mut E,
    sql: &str,
    rows: Vec<Vec<Value>>,
) -> Result<RowsAffected> {
    log::debug!("{}", printable_query(sql));
    log::debug!("### {} rows", rows.len());
    let sql = translate_placeholders(sql, executor.placeholder());
    let mut result = RowsAffected::default();
    for args in rows {
        let affected = executor.execute(&sql, args).await?;
        result.extend([affected]);
    }
    Ok(result)
}
