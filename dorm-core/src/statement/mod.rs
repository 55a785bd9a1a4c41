mod delete;
mod insert;
mod query;
mod record;
mod update;

pub use delete::*;
pub use insert::*;
pub use query::*;
pub use record::*;
pub use update::*;

use crate::{ConditionTree, Error, Result, Value};
use std::sync::Arc;

/// Table name and the fields a statement is allowed to reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub table: String,
    pub fields: Arc<[String]>,
}

impl TableShape {
    pub fn new(table: impl Into<String>, fields: impl Into<Arc<[String]>>) -> Result<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            return Err(Error::validation("table is required"));
        }
        Ok(Self {
            table,
            fields: fields.into(),
        })
    }
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|v| v == field)
    }
}

/// Appends ` WHERE <predicate>` when the tree holds at least one condition.
pub(crate) fn write_where(out: &mut String, args: &mut Vec<Value>, predicate: &ConditionTree) {
    if predicate.is_empty() {
        return;
    }
    out.push_str(" WHERE ");
    predicate.write(out, args);
}

/// Same as [`write_where`] but an empty predicate is refused, used by the
/// statements that would otherwise touch the whole table.
pub(crate) fn write_required_where(
    out: &mut String,
    args: &mut Vec<Value>,
    predicate: &ConditionTree,
    table: &str,
    statement: &str,
) -> Result<()> {
    if predicate.is_empty() {
        return Err(Error::validation(format!(
            "{statement} on [{table}] requires at least one condition"
        )));
    }
    write_where(out, args, predicate);
    Ok(())
}
