use crate::{AsValue, Condition, ConditionTree, Logic, Operator, Value};
use std::fmt::Display;

/// Fluent builder for a [`ConditionTree`].
///
/// ```
/// use dorm_core::Where;
/// let (sql, args) = Where::all()
///     .eq("a", 1)
///     .or(Where::any().eq("b", 2).eq("c", 3))
///     .tree()
///     .parse();
/// assert_eq!(sql, "a = ? and (b = ? or c = ?)");
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    tree: ConditionTree,
}

impl Where {
    /// Children joined with `and`.
    pub fn all() -> Self {
        Self {
            tree: ConditionTree::new(Logic::And),
        }
    }
    /// Children joined with `or`.
    pub fn any() -> Self {
        Self {
            tree: ConditionTree::new(Logic::Or),
        }
    }
    pub fn tree(&self) -> &ConditionTree {
        &self.tree
    }
    pub fn tree_mut(&mut self) -> &mut ConditionTree {
        &mut self.tree
    }
    pub fn into_tree(self) -> ConditionTree {
        self.tree
    }
    pub fn count(&self) -> usize {
        self.tree.count()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.tree.add_condition(condition);
        self
    }
    fn push(self, field: &str, operator: Operator, value: impl AsValue) -> Self {
        self.condition(Condition::new(field, operator, value))
    }

    pub fn eq(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Eq, value)
    }
    pub fn ne(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Ne, value)
    }
    pub fn gt(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Gt, value)
    }
    pub fn ge(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Ge, value)
    }
    pub fn lt(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Lt, value)
    }
    pub fn le(self, field: &str, value: impl AsValue) -> Self {
        self.push(field, Operator::Le, value)
    }
    pub fn is_in<V: AsValue>(self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(AsValue::as_value).collect::<Vec<_>>();
        self.push(field, Operator::In, Value::List(values))
    }
    /// Matches values starting with `value`.
    pub fn l_like(self, field: &str, value: impl Display) -> Self {
        self.push(field, Operator::Like, format!("{value}%"))
    }
    /// Matches values ending with `value`.
    pub fn r_like(self, field: &str, value: impl Display) -> Self {
        self.push(field, Operator::Like, format!("%{value}"))
    }
    /// Matches values containing `value`.
    pub fn like(self, field: &str, value: impl Display) -> Self {
        self.push(field, Operator::Like, format!("%{value}%"))
    }

    /// Nests `group` as a parenthesized `or` group.
    pub fn or(mut self, mut group: Where) -> Self {
        group.tree.set_logic(Logic::Or);
        self.tree.add_tree(group.tree);
        self
    }
    /// Nests `group` as a parenthesized `and` group.
    pub fn and(mut self, mut group: Where) -> Self {
        group.tree.set_logic(Logic::And);
        self.tree.add_tree(group.tree);
        self
    }
}

impl From<Where> for ConditionTree {
    fn from(value: Where) -> Self {
        value.tree
    }
}
