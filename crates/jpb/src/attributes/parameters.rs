use super::{path, text_or};
use crate::document::Element;
use crate::error::Error;
use crate::registry::AttributeDescriptor;
use crate::value::Value;

/// Type of a build parameter, unknown types are plain strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    #[default]
    String,
    Boolean,
    Text,
    Password,
    Choice,
}

impl ParameterKind {
    pub fn class_name(self) -> &'static str {
        match self {
            ParameterKind::String => "hudson.model.StringParameterDefinition",
            ParameterKind::Boolean => "hudson.model.BooleanParameterDefinition",
            ParameterKind::Text => "hudson.model.TextParameterDefinition",
            ParameterKind::Password => "hudson.model.PasswordParameterDefinition",
            ParameterKind::Choice => "hudson.model.ChoiceParameterDefinition",
        }
    }
}

impl From<&str> for ParameterKind {
    fn from(value: &str) -> Self {
        match value {
            "bool" | "boolean" => ParameterKind::Boolean,
            "text" => ParameterKind::Text,
            "password" => ParameterKind::Password,
            "choice" => ParameterKind::Choice,
            _ => ParameterKind::String,
        }
    }
}

fn definition(item: &Value) -> Result<Element, Error> {
    let name = item
        .param("name")
        .ok_or_else(|| Error::missing_parameter("parameters", "name"))?;
    let kind = item
        .param("type")
        .and_then(Value::as_str)
        .map(ParameterKind::from)
        .unwrap_or_default();

    let choices = (kind == ParameterKind::Choice).then(|| {
        let values = item
            .get("values")
            .and_then(Value::as_array)
            .unwrap_or_default();
        Element::new("choices")
            .attr("class", "java.util.Arrays$ArrayList")
            .child(
                values
                    .iter()
                    .fold(Element::new("a").attr("class", "string-array"), |a, v| {
                        a.child(Element::leaf("string", v))
                    }),
            )
    });

    Ok(Element::new(kind.class_name())
        .child(Element::leaf("name", name))
        .child(Element::leaf("description", text_or(item, "description", "")))
        .child(Element::leaf(
            "defaultValue",
            item.get("default").map(Value::to_text).unwrap_or_default(),
        ))
        .child_if(choices, |choices| choices))
}

/// Every invocation adds its own property, so parameters of templates and jobs accumulate
pub(super) fn parameters() -> AttributeDescriptor {
    AttributeDescriptor::new("parameters", path("//properties"), |params| {
        let items = match params {
            Value::Array(items) => items.as_slice(),
            Value::Object(_) => std::slice::from_ref(params),
            other => {
                return Err(Error::InvalidDefinition {
                    name: "parameters".to_string(),
                    reason: format!("expected a list of parameters, got `{other}`"),
                })
            }
        };

        let definitions = items
            .iter()
            .map(definition)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .fold(Element::new("parameterDefinitions"), Element::child);

        Ok(Element::new("hudson.model.ParametersDefinitionProperty")
            .child(definitions)
            .into())
    })
    .description("Parameters allow you to prompt users for one or more inputs that will be passed into a build.")
    .display_name("This build is parameterized")
}
