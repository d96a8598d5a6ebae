//! value representation
//!
//! Definitions, parameters and attribute arguments all share one data model:
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! There is no `null`. A `null` coming from a loaded document means "not set": object entries
//! and array elements holding `null` are dropped during conversion, so an attribute sees the
//! parameter as absent.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub type Object = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Look up a key when this is an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|object| object.get(key))
    }

    /// Whether a parameter counts as "given"
    ///
    /// Only `false` is treated like a missing parameter. Empty strings and zero are given.
    pub fn is_set(&self) -> bool {
        !matches!(self, Value::Boolean(false))
    }

    /// Shorthand for `get(key)` filtered by [Value::is_set]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|value| value.is_set())
    }

    /// Text form used for document leaves and string interpolation
    pub fn to_text(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => serde_json::to_string(self)
                .unwrap_or_else(|_| String::from("<unserializable>")),
        }
    }

    /// Deep merge `other` into `self`
    ///
    /// Objects are merged key by key (recursively), `other` wins for everything else.
    /// Keys that only exist in `other` are appended, existing keys keep their position.
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Object(target), Value::Object(source)) => {
                for (key, value) in source {
                    match target.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            target.insert(key, value);
                        }
                    }
                }
            }
            (target, other) => *target = other,
        }
    }

    /// Convert a loaded yaml document, `None` for `null`
    pub fn from_yaml(value: serde_yaml::Value) -> Option<Value> {
        use serde_yaml::Value as Yaml;

        Some(match value {
            Yaml::Null => return None,
            Yaml::Bool(b) => b.into(),
            Yaml::Number(n) => match n.as_i64() {
                Some(int) => Value::Integer(int),
                None => Value::Decimal(n.as_f64()?),
            },
            Yaml::String(s) => s.into(),
            Yaml::Sequence(sequence) => Value::Array(
                sequence
                    .into_iter()
                    .filter_map(Value::from_yaml)
                    .collect(),
            ),
            Yaml::Mapping(mapping) => Value::Object(
                mapping
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let key = match key {
                            Yaml::String(s) => s,
                            Yaml::Bool(b) => b.to_string(),
                            Yaml::Number(n) => n.to_string(),
                            _ => return None,
                        };
                        Value::from_yaml(value).map(|value| (key, value))
                    })
                    .collect(),
            ),
            Yaml::Tagged(tagged) => return Value::from_yaml(tagged.value),
        })
    }

    /// Convert a loaded json document, `None` for `null`
    pub fn from_json(value: serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        Some(match value {
            Json::Null => return None,
            Json::Bool(b) => b.into(),
            Json::Number(n) => match n.as_i64() {
                Some(int) => Value::Integer(int),
                None => Value::Decimal(n.as_f64()?),
            },
            Json::String(s) => s.into(),
            Json::Array(array) => {
                Value::Array(array.into_iter().filter_map(Value::from_json).collect())
            }
            Json::Object(object) => Value::Object(
                object
                    .into_iter()
                    .filter_map(|(key, value)| Value::from_json(value).map(|value| (key, value)))
                    .collect(),
            ),
        })
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Value::Integer)
            .unwrap_or(Value::Decimal(value as f64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(source: &str) -> Value {
        Value::from_yaml(serde_yaml::from_str(source).unwrap()).unwrap()
    }

    #[test]
    fn null_entries_are_dropped() {
        let value = yaml("a: 1\nb:\nc: [x, ~, y]");

        assert_eq!(value.get("b"), None);
        assert_eq!(value.get("c"), Some(&Value::from(vec!["x", "y"])));
    }

    #[test]
    fn merge_is_deep_and_keeps_order() {
        let mut base = yaml("days: 5\nscm: {branch: main, depth: 1}\nkeep: yes");
        base.merge(yaml("scm: {depth: 3}\ndays: 10\nextra: true"));

        assert_eq!(
            base,
            yaml("days: 10\nscm: {branch: main, depth: 3}\nkeep: yes\nextra: true")
        );
        let keys: Vec<_> = base.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["days", "scm", "keep", "extra"]);
    }

    #[test]
    fn unset_parameters() {
        let value = yaml("off: false\nempty: ''\nzero: 0");

        assert_eq!(value.param("off"), None);
        assert_eq!(value.param("empty"), Some(&Value::from("")));
        assert_eq!(value.param("zero"), Some(&Value::Integer(0)));
    }

    #[test]
    fn text_form() {
        assert_eq!(Value::from(true).to_text(), "true");
        assert_eq!(Value::from(-1i64).to_text(), "-1");
        assert_eq!(Value::from(vec!["a"]).to_text(), r#"["a"]"#);
    }
}
