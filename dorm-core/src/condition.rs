use crate::{AsValue, Value, separated_by};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    Like,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "in",
            Operator::Like => "like",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn keyword(&self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }
}

/// A single `field operator value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl AsValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.as_value(),
        }
    }
    pub fn field(&self) -> &str {
        &self.field
    }
    pub fn operator(&self) -> Operator {
        self.operator
    }
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Writes the fragment into `out` and appends the arguments, one per placeholder.
    pub(crate) fn write(&self, out: &mut String, args: &mut Vec<Value>) {
        out.push_str(&self.field);
        out.push(' ');
        out.push_str(self.operator.symbol());
        match (&self.operator, &self.value) {
            (Operator::In, Value::List(values)) => {
                out.push_str(" (");
                if values.is_empty() {
                    out.push_str("NULL");
                } else {
                    separated_by(out, values, |out, _| out.push('?'), ",");
                    args.extend(values.iter().cloned());
                }
                out.push(')');
            }
            (_, value) => {
                out.push_str(" ?");
                args.push(value.clone());
            }
        }
    }

    pub fn parse(&self) -> (String, Vec<Value>) {
        let mut out = String::new();
        let mut args = Vec::new();
        self.write(&mut out, &mut args);
        (out, args)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Condition(Condition),
    Tree(ConditionTree),
}

/// Boolean composite of conditions and nested trees.
///
/// The children are kept in insertion order, which is also the order of the
/// fragments in the compiled SQL and of the positional arguments. A tree joins all
/// its children with the same logic, mixed precedence is expressed by nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTree {
    logic: Logic,
    children: Vec<Node>,
}

impl Default for ConditionTree {
    fn default() -> Self {
        Self::new(Logic::And)
    }
}

impl ConditionTree {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            children: Vec::new(),
        }
    }
    pub fn logic(&self) -> Logic {
        self.logic
    }
    pub(crate) fn set_logic(&mut self, logic: Logic) {
        self.logic = logic;
    }
    pub fn children(&self) -> &[Node] {
        &self.children
    }
    /// Number of direct children.
    pub fn count(&self) -> usize {
        self.children.len()
    }
    /// True when the tree holds no condition at any depth.
    pub fn is_empty(&self) -> bool {
        self.children
            .iter()
            .all(|node| matches!(node, Node::Tree(tree) if tree.is_empty()))
    }
    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.children.push(Node::Condition(condition));
        self
    }
    pub fn add_tree(&mut self, tree: ConditionTree) -> &mut Self {
        self.children.push(Node::Tree(tree));
        self
    }

    /// Iterates over every leaf condition, depth first.
    pub fn conditions(&self) -> Box<dyn Iterator<Item = &Condition> + '_> {
        Box::new(self.children.iter().flat_map(|node| match node {
            Node::Condition(c) => {
                Box::new(std::iter::once(c)) as Box<dyn Iterator<Item = &Condition> + '_>
            }
            Node::Tree(t) => t.conditions(),
        }))
    }

    pub(crate) fn write(&self, out: &mut String, args: &mut Vec<Value>) {
        let separator = format!(" {} ", self.logic.keyword());
        separated_by(
            out,
            self.children.iter().filter(|node| match node {
                Node::Tree(tree) => !tree.is_empty(),
                Node::Condition(..) => true,
            }),
            |out, node| match node {
                Node::Condition(condition) => condition.write(out, args),
                Node::Tree(tree) => {
                    out.push('(');
                    tree.write(out, args);
                    out.push(')');
                }
            },
            &separator,
        );
    }

    /// Compiles the tree into a fragment and its positional arguments.
    ///
    /// An empty tree yields an empty fragment and no arguments, the caller decides
    /// whether that is acceptable.
    pub fn parse(&self) -> (String, Vec<Value>) {
        let mut out = String::new();
        let mut args = Vec::new();
        self.write(&mut out, &mut args);
        (out, args)
    }
}
