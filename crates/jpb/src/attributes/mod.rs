//! built-in attribute catalog
//!
//! The engine does not depend on any of these, they are registered like any other
//! [AttributeDescriptor] by [register_builtin].
mod job_attributes;
mod parameters;

pub use parameters::ParameterKind;

use crate::document::{Document, Path};
use crate::registry::{AttributeDescriptor, AttributeRegistry};
use crate::value::Value;

pub fn register_builtin(registry: &mut AttributeRegistry) {
    let descriptors: [AttributeDescriptor; 9] = [
        job_attributes::description(),
        job_attributes::scm_params(),
        job_attributes::hipchat(),
        job_attributes::priority(),
        parameters::parameters(),
        job_attributes::discard_old(),
        job_attributes::throttle(),
        job_attributes::prepare_environment(),
        job_attributes::concurrent_build(),
    ];

    for descriptor in descriptors {
        registry.register(descriptor);
    }
}

/// Parse a path of the built-in catalog
fn path(path: &str) -> Path {
    path.parse().expect("built-in attribute paths are valid")
}

/// Remove the element at `path` when `params` sets `key`
fn remove_if_set(document: &mut Document, params: &Value, key: &str, path: &str) {
    if params.param(key).is_some() {
        document.remove(&self::path(path));
    }
}

/// Text of a parameter, `default` when it is not set
fn text_or(params: &Value, key: &str, default: &str) -> String {
    params
        .param(key)
        .map(Value::to_text)
        .unwrap_or_else(|| default.to_string())
}
