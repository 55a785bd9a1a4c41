use crate::{AsValue, Value};

/// Ordered `field -> value` list, the input of insert statements.
///
/// Insertion order is preserved and decides the column order of the compiled
/// statement. Setting an existing field replaces its value in place.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, field: impl Into<String>, value: impl AsValue) -> Self {
        self.set(field, value);
        self
    }
    pub fn set(&mut self, field: impl Into<String>, value: impl AsValue) -> &mut Self {
        let field = field.into();
        let value = value.as_value();
        match self.entries.iter_mut().find(|(k, _)| *k == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
        self
    }
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == field)?;
        Some(self.entries.remove(index).1)
    }
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: AsValue> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
