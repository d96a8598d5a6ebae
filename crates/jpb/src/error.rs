//! error kinds shared by resolution, building and publishing
use crate::definition::Kind;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("attribute `{attribute}` requires parameter `{parameter}`")]
    MissingParameter { attribute: String, parameter: String },
    #[error("unresolved placeholder `{token}`")]
    UnresolvedPlaceholder { token: String },
    #[error("template cycle: {}", .chain.join(" -> "))]
    TemplateCycle { chain: Vec<String> },
    #[error("template `{name}` not found")]
    TemplateNotFound { name: String },
    #[error("`{from}` references unknown `{name}`")]
    DanglingReference { from: String, name: String },
    #[error("{kind} name `{name}` defined more than once")]
    DuplicateName { kind: Kind, name: String },
    #[error("attribute `{attribute}` needs plugin `{capability}` which is not installed")]
    MissingCapability {
        attribute: String,
        capability: String,
    },
    #[error("invalid definition `{name}`: {reason}")]
    InvalidDefinition { name: String, reason: String },
    #[error("invalid document path")]
    Path(#[from] crate::document::PathError),
    #[error("server request failed: {0}")]
    Client(#[from] crate::client::ClientError),
}

impl Error {
    pub fn missing_parameter(attribute: &str, parameter: &str) -> Self {
        Error::MissingParameter {
            attribute: attribute.to_string(),
            parameter: parameter.to_string(),
        }
    }
}

/// An [Error] attributed to the job it happened in
#[derive(thiserror::Error, Debug)]
#[error("job `{job}`{}: {error}", .attribute.as_ref().map(|a| format!(" (attribute `{a}`)")).unwrap_or_default())]
pub struct JobError {
    pub job: String,
    pub attribute: Option<String>,
    #[source]
    pub error: Error,
}

impl JobError {
    pub fn new(job: impl Into<String>, error: impl Into<Error>) -> Self {
        Self {
            job: job.into(),
            attribute: None,
            error: error.into(),
        }
    }

    pub fn in_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}
