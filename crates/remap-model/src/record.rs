//! Records: one row of source or destination data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A mapping from field name to value representing one row.
///
/// Field order is insertion order, which matters for the nest rule's
/// first-appearance grouping guarantee. Equality ignores order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert or overwrite a field. Overwriting keeps the field's
    /// original position.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a field if present, preserving the order of the rest.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields holding a non-null value. Batch runs prune
    /// output rows where this is zero.
    pub fn non_null_values(&self) -> usize {
        self.0.values().filter(|v| !v.is_null()).count()
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Self(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let mut record = Record::new();
        record.set("name", "Dave");
        record.set("age", 42i64);

        assert_eq!(record.get("name"), Some(&Value::from("Dave")));
        assert_eq!(record.len(), 2);

        record.remove("name");
        assert!(!record.contains("name"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn preserves_insertion_order() {
        let record: Record = [("b", 1i64), ("a", 2i64), ("c", 3i64)]
            .into_iter()
            .collect();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn counts_non_null_values() {
        let record: Record = [("a", Value::Null), ("b", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(record.non_null_values(), 1);
    }

    #[test]
    fn deserializes_from_json_object() {
        let record: Record =
            serde_json::from_str(r#"{"name": "Dave", "age": 42}"#).unwrap();
        assert_eq!(record.get("age"), Some(&Value::from(42i64)));
    }
}
