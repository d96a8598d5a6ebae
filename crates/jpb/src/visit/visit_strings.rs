use super::VisitMut;
use crate::value::Value;

/// Recursively visit all string leaves mutably
///
/// The visitor receives the [Value] holding the string (always a [Value::String]) so it may
/// replace it with a value of another type. Object keys are not visited.
pub trait VisitStringsMut {
    fn visit_strings_mut(&mut self, visitor: &mut dyn VisitMut<Value>);
}

impl VisitStringsMut for Value {
    fn visit_strings_mut(&mut self, visitor: &mut dyn VisitMut<Value>) {
        match self {
            Value::String(_) => visitor.visit_mut(self),
            Value::Array(array) => {
                for value in array {
                    value.visit_strings_mut(visitor);
                }
            }
            Value::Object(object) => {
                for value in object.values_mut() {
                    value.visit_strings_mut(visitor);
                }
            }
            Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) => {}
        }
    }
}

impl<T: VisitStringsMut> VisitStringsMut for Vec<T> {
    fn visit_strings_mut(&mut self, visitor: &mut dyn VisitMut<Value>) {
        for value in self {
            value.visit_strings_mut(visitor);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_nested_strings_only() {
        let mut value: Value = [
            ("a", Value::from("x")),
            ("b", Value::from(vec![Value::from("y"), Value::from(1i64)])),
        ]
        .into_iter()
        .collect();

        let mut seen = vec![];
        value.visit_strings_mut(&mut |value: &mut Value| {
            seen.push(value.to_text());
            *value = Value::Boolean(true);
        });

        assert_eq!(seen, ["x", "y"]);
        assert_eq!(value.get("a"), Some(&Value::Boolean(true)));
    }
}
