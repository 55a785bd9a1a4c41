use crate::{
    AsValue, ConditionTree, Entity, Error, Executor, Filter, Record, Result, TableShape, Value,
    check_field, execute, separated_by, write_required_where,
};
use std::sync::Arc;

/// `UPDATE` statement wrapper, refuses to run without a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    shape: TableShape,
    predicate: ConditionTree,
    assignments: Record,
}

impl Update {
    pub fn new(table: impl Into<String>, known_fields: impl Into<Arc<[String]>>) -> Result<Self> {
        Ok(Self::from_shape(TableShape::new(table, known_fields)?))
    }
    pub fn from_shape(shape: TableShape) -> Self {
        Self {
            shape,
            predicate: Default::default(),
            assignments: Record::new(),
        }
    }
    pub fn of<E: Entity>() -> Self {
        Self::from_shape(E::shape())
    }
    pub fn shape(&self) -> &TableShape {
        &self.shape
    }
    pub fn assignments(&self) -> &Record {
        &self.assignments
    }

    /// Assigns `value` to `field`, a second assignment to the same field replaces the first.
    pub fn set(mut self, field: &str, value: impl AsValue) -> Result<Self> {
        check_field(&self.shape.table, &self.shape.fields, field)?;
        self.assignments.set(field, value.as_value());
        Ok(self)
    }

    /// Assigns every known field of `record`, the unknown ones are dropped.
    pub fn set_record(mut self, record: &Record) -> Result<Self> {
        for (field, value) in record.iter() {
            if self.shape.contains(field) {
                self.assignments.set(field, value.clone());
            } else {
                log::debug!(
                    "Dropping field [{field}] not in table [{}] from the update",
                    self.shape.table
                );
            }
        }
        Ok(self)
    }

    /// Arguments are the assigned values followed by the predicate ones.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        if self.assignments.is_empty() {
            return Err(Error::validation(format!(
                "update on [{}] has no value to set",
                self.shape.table
            )));
        }
        let mut out = String::from("UPDATE ");
        out.push_str(&self.shape.table);
        out.push_str(" SET ");
        let mut args = Vec::with_capacity(self.assignments.len());
        separated_by(
            &mut out,
            self.assignments.iter(),
            |out, (k, v)| {
                out.push_str(k);
                out.push_str("=?");
                args.push(v.clone());
            },
            ",",
        );
        write_required_where(
            &mut out,
            &mut args,
            &self.predicate,
            &self.shape.table,
            "update",
        )?;
        Ok((out, args))
    }

    /// Returns the number of rows changed.
    pub async fn update<E: Executor>(&self, executor: &mut E) -> Result<u64> {
        let (sql, args) = self.build()?;
        Ok(execute(executor, &sql, args).await?.rows_affected)
    }
}

impl Filter for Update {
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
