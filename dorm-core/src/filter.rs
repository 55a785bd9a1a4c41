use crate::{
    AsValue, Condition, ConditionTree, Error, Logic, Operator, Result, Value, Where,
};
use std::fmt::Display;

pub(crate) fn check_field(table: &str, known_fields: &[String], field: &str) -> Result<()> {
    if known_fields.iter().any(|v| v == field) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "invalid field [{field}] in table [{table}]"
        )))
    }
}

/// Predicate methods shared by the statements having a `WHERE` clause.
///
/// Every field is checked against the table's known fields when the predicate is
/// added, so an invalid chain fails before any SQL is produced.
pub trait Filter: Sized {
    fn table(&self) -> &str;
    fn known_fields(&self) -> &[String];
    fn predicate(&self) -> &ConditionTree;
    fn predicate_mut(&mut self) -> &mut ConditionTree;

    fn check_field(&self, field: &str) -> Result<()> {
        check_field(self.table(), self.known_fields(), field)
    }

    fn check_condition(&self, condition: &Condition) -> Result<()> {
        self.check_field(condition.field())?;
        if condition.operator() == Operator::In
            && matches!(condition.value(), Value::List(values) if values.is_empty())
        {
            return Err(Error::validation(format!(
                "empty value list for [{} in] in table [{}]",
                condition.field(),
                self.table()
            )));
        }
        Ok(())
    }

    fn condition(mut self, condition: Condition) -> Result<Self> {
        self.check_condition(&condition)?;
        self.predicate_mut().add_condition(condition);
        Ok(self)
    }

    fn eq(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Eq, value))
    }
    fn ne(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Ne, value))
    }
    fn gt(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Gt, value))
    }
    fn ge(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Ge, value))
    }
    fn lt(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Lt, value))
    }
    fn le(self, field: &str, value: impl AsValue) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Le, value))
    }
    fn is_in<V: AsValue>(self, field: &str, values: impl IntoIterator<Item = V>) -> Result<Self> {
        let values = values.into_iter().map(AsValue::as_value).collect::<Vec<_>>();
        self.condition(Condition::new(field, Operator::In, Value::List(values)))
    }
    fn l_like(self, field: &str, value: impl Display) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Like, format!("{value}%")))
    }
    fn r_like(self, field: &str, value: impl Display) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Like, format!("%{value}")))
    }
    fn like(self, field: &str, value: impl Display) -> Result<Self> {
        self.condition(Condition::new(field, Operator::Like, format!("%{value}%")))
    }

    /// Nests `group` with its own logic, every condition inside is validated.
    fn group(mut self, group: Where) -> Result<Self> {
        let tree = group.into_tree();
        for condition in tree.conditions() {
            self.check_condition(condition)?;
        }
        self.predicate_mut().add_tree(tree);
        Ok(self)
    }
    fn or(self, mut group: Where) -> Result<Self> {
        group.tree_mut().set_logic(Logic::Or);
        self.group(group)
    }
    fn and(self, mut group: Where) -> Result<Self> {
        group.tree_mut().set_logic(Logic::And);
        self.group(group)
    }
}
