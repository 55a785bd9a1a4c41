use crate::{
    ConditionTree, Entity, Executor, Filter, Result, TableShape, Value, execute,
    write_required_where,
};
use std::sync::Arc;

/// `DELETE` statement wrapper, refuses to run without a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    shape: TableShape,
    predicate: ConditionTree,
}

impl Delete {
    pub fn new(table: impl Into<String>, known_fields: impl Into<Arc<[String]>>) -> Result<Self> {
        Ok(Self::from_shape(TableShape::new(table, known_fields)?))
    }
    pub fn from_shape(shape: TableShape) -> Self {
        Self {
            shape,
            predicate: Default::default(),
        }
    }
    pub fn of<E: Entity>() -> Self {
        Self::from_shape(E::shape())
    }
    pub fn shape(&self) -> &TableShape {
        &self.shape
    }

    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        let mut out = String::from("DELETE FROM ");
        out.push_str(&self.shape.table);
        let mut args = Vec::new();
        write_required_where(
            &mut out,
            &mut args,
            &self.predicate,
            &self.shape.table,
            "delete",
        )?;
        Ok((out, args))
    }

    /// Returns the number of rows removed.
    pub async fn delete<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        let (sql, args) = self.build()?;
        Ok(execute(executor, &sql, args).await?.rows_affected)
    }
}

impl Filter for Delete {
    fn table(&self) -> &str {
        &self.shape.table
    }
    fn known_fields(&self) -> &[String] {
        &self.shape.fields
    }
    fn predicate(&self) -> &ConditionTree {
        &self.predicate
    }
    fn predicate_mut(&mut self) -> &mut ConditionTree {
        &mut self.predicate
    }
}
