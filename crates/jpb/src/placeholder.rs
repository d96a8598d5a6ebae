//! `{{token}}` placeholder substitution
use crate::error::Error;
use crate::value::{Object, Value};
use crate::visit;

/// One segment of a string split at its placeholders
#[derive(Debug, PartialEq)]
enum Segment<'s> {
    Literal(&'s str),
    Placeholder(&'s str),
}

/// Split `input` into literals and `{{ token }}` placeholders
///
/// An opening `{{` without a matching `}}` is kept as literal text.
fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut segments = vec![];
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };

        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        segments.push(Segment::Placeholder(rest[start + 2..start + 2 + len].trim()));
        rest = &rest[start + 2 + len + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    segments
}

/// Tokens referenced by `input`, in order of appearance
pub fn placeholders(input: &str) -> Vec<&str> {
    segments(input)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(token) => Some(token),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Substitute all placeholders of `input` in a single pass
///
/// A string that is exactly one placeholder evaluates to the parameter itself (keeping its
/// type). Otherwise the parameters are rendered into the string. Text coming from a parameter
/// is never scanned for placeholders again.
pub fn substitute(input: &str, params: &Object) -> Result<Value, Error> {
    let segments = segments(input);

    if let [Segment::Placeholder(token)] = segments.as_slice() {
        return lookup(token, params).cloned();
    }

    let mut output = String::with_capacity(input.len());
    for segment in segments {
        match segment {
            Segment::Literal(literal) => output.push_str(literal),
            Segment::Placeholder(token) => output.push_str(&lookup(token, params)?.to_text()),
        }
    }

    Ok(Value::String(output))
}

fn lookup<'p>(token: &str, params: &'p Object) -> Result<&'p Value, Error> {
    params.get(token).ok_or_else(|| Error::UnresolvedPlaceholder {
        token: token.to_string(),
    })
}

/// Rewrites every visited string with [substitute]
///
/// The first unresolved token is remembered and reported by [PlaceholderRewriter::finish].
#[derive(derive_new::new)]
pub(crate) struct PlaceholderRewriter<'p> {
    params: &'p Object,
    #[new(default)]
    error: Option<Error>,
}

impl<'p> PlaceholderRewriter<'p> {
    pub fn finish(self) -> Result<(), Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<'p> visit::VisitMut<Value> for PlaceholderRewriter<'p> {
    #[tracing::instrument(level = "trace", skip_all)]
    fn visit_mut(&mut self, value: &mut Value) {
        let Value::String(input) = value else {
            return;
        };

        if !input.contains("{{") {
            return;
        }

        match substitute(input, self.params) {
            Ok(substituted) => {
                tracing::trace!(from = %input, to = %substituted, "substituted");
                *value = substituted;
            }
            Err(error) => {
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::visit::VisitStringsMut;
    use pretty_assertions::assert_eq;

    fn params() -> Object {
        [
            ("name", Value::from("PullRequest-PR1")),
            ("days", Value::from(10i64)),
            ("nested", Value::from("{{name}}")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn renders_into_string() {
        let value = substitute("{{name}}-10-SampleJob", &params()).unwrap();
        assert_eq!(value, Value::from("PullRequest-PR1-10-SampleJob"));
    }

    #[test]
    fn whole_placeholder_keeps_type() {
        assert_eq!(substitute("{{ days }}", &params()).unwrap(), Value::Integer(10));
        assert_eq!(
            substitute("keep {{days}}", &params()).unwrap(),
            Value::from("keep 10")
        );
    }

    #[test]
    fn single_pass() {
        let value = substitute("x-{{nested}}", &params()).unwrap();
        assert_eq!(value, Value::from("x-{{name}}"));
    }

    #[test]
    fn unresolved_token_is_named() {
        let err = substitute("{{name}}-{{branch}}", &params()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder { token } if token == "branch"));
    }

    #[test]
    fn unclosed_braces_are_literal() {
        assert_eq!(placeholders("a {{b"), Vec::<&str>::new());
        assert_eq!(substitute("a {{b", &params()).unwrap(), Value::from("a {{b"));
    }

    #[test]
    fn rewriter_reports_first_error() {
        let params = params();
        let mut value = Value::from(vec!["{{name}}", "{{missing}}", "{{other}}"]);
        let mut rewriter = PlaceholderRewriter::new(&params);
        value.visit_strings_mut(&mut rewriter);

        let err = rewriter.finish().unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder { token } if token == "missing"));
        assert_eq!(value.as_array().unwrap()[0], Value::from("PullRequest-PR1"));
    }
}
