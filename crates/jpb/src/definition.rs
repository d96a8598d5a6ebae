//! typed job/template/project/view definitions
//!
//! A loaded document is a list of single-key entries. The key selects the [Kind], the value is
//! the body:
//!
//! ```yaml
//! - job_template:
//!     name: base
//!     vars: { days: 5 }
//!     discard_old: { days: "{{days}}" }
//! - job:
//!     name: "{{name}}-10-SampleJob"
//!     extends: base
//!     vars: { days: 10 }
//!     scm_params: { refspec: "refs/pull/*:refs/remotes/origin/pr/*" }
//! - project:
//!     name: SamplePipeline
//!     jobs:
//!       - "{{name}}-10-SampleJob"
//!       - "{{name}}-20-Deploy": { target: staging }
//!     views: [ "{{name}} View" ]
//! ```
//!
//! Job and template bodies: `name`, `extends` and `vars` are reserved, every other key is an
//! attribute invocation (in declaration order).
//! Project bodies: `name`, `jobs`, `views` and `pull_request` are reserved, every other key is
//! a project variable available to the referenced definitions.
//! View bodies: `name`, `extends`, `vars` and `jobs` are reserved, `regex` and `description`
//! are view variables, every other key is an attribute invocation.
use crate::error::Error;
use crate::value::{Object, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Template,
    Job,
    Project,
    View,
}

impl Kind {
    /// Parse the key of a document entry
    pub fn from_entry_key(key: &str) -> Option<Kind> {
        match key {
            "job_template" | "template" => Some(Kind::Template),
            "job" => Some(Kind::Job),
            "project" => Some(Kind::Project),
            "view" => Some(Kind::View),
            _ => None,
        }
    }

    /// Whether definitions of this kind become a document on the server
    pub fn is_published(&self) -> bool {
        matches!(self, Kind::Job | Kind::View)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Template => f.write_str("template"),
            Kind::Job => f.write_str("job"),
            Kind::Project => f.write_str("project"),
            Kind::View => f.write_str("view"),
        }
    }
}

/// An attribute applied to a job with its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub attribute: String,
    pub params: Value,
}

/// Weak reference by name, with call-site parameter overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub overrides: Object,
}

impl Reference {
    fn parse(owner: &str, value: &Value) -> Result<Self, Error> {
        let single = match value {
            Value::String(name) => {
                return Ok(Reference {
                    name: name.clone(),
                    overrides: Object::new(),
                })
            }
            Value::Object(object) if object.len() == 1 => object.first(),
            _ => None,
        };

        let Some((name, overrides)) = single else {
            return Err(invalid(
                owner,
                "references must be a name or a single-key map of name to overrides",
            ));
        };
        let Value::Object(overrides) = overrides else {
            return Err(invalid(owner, format!("overrides of `{name}` must be a map")));
        };

        Ok(Reference {
            name: name.clone(),
            overrides: overrides.clone(),
        })
    }
}

/// Settings of projects that get instantiated once per open pull request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PullRequestSettings {
    /// Name prefix of instantiated projects, `<project>-PR` when not given
    pub prefix: Option<String>,
    /// `owner/repo` to query for open pull requests
    pub github: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    pub kind: Kind,
    pub name: String,
    pub extends: Option<String>,
    pub vars: Object,
    pub attributes: Vec<Invocation>,
    pub jobs: Vec<Reference>,
    pub views: Vec<Reference>,
    pub pull_request: Option<PullRequestSettings>,
}

impl JobDefinition {
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            extends: None,
            vars: Object::new(),
            attributes: vec![],
            jobs: vec![],
            views: vec![],
            pull_request: None,
        }
    }

    pub fn from_body(kind: Kind, body: Object) -> Result<Self, Error> {
        let name = match body.get("name").map(Value::to_text) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(invalid("<unnamed>", format!("{kind} has no name"))),
        };

        let mut definition = JobDefinition::new(kind, name.clone());

        for (key, value) in body {
            match (kind, key.as_str()) {
                (_, "name") => {}
                (Kind::Job | Kind::Template | Kind::View, "extends") => {
                    let Value::String(parent) = value else {
                        return Err(invalid(&name, "`extends` must be a template name"));
                    };
                    definition.extends = Some(parent);
                }
                (Kind::Job | Kind::Template | Kind::View, "vars") => {
                    let Value::Object(vars) = value else {
                        return Err(invalid(&name, "`vars` must be a map"));
                    };
                    definition.vars.extend(vars);
                }
                (Kind::Project | Kind::View, "jobs") => {
                    definition.jobs = parse_references(&name, &value)?;
                }
                (Kind::Project, "views") => {
                    definition.views = parse_references(&name, &value)?;
                }
                (Kind::Project, "pull_request") => {
                    definition.pull_request = Some(parse_pull_request(&name, &value)?);
                }
                (Kind::Project, _) | (Kind::View, "regex" | "description") => {
                    definition.vars.insert(key, value);
                }
                (Kind::Job | Kind::Template | Kind::View, _) => {
                    definition.attributes.push(Invocation {
                        attribute: key,
                        params: value,
                    });
                }
            }
        }

        Ok(definition)
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>, params: impl Into<Value>) -> Self {
        self.attributes.push(Invocation {
            attribute: attribute.into(),
            params: params.into(),
        });
        self
    }

    pub fn extending(mut self, template: impl Into<String>) -> Self {
        self.extends = Some(template.into());
        self
    }

    pub fn with_job(mut self, name: impl Into<String>) -> Self {
        self.jobs.push(Reference {
            name: name.into(),
            overrides: Object::new(),
        });
        self
    }
}

fn parse_references(owner: &str, value: &Value) -> Result<Vec<Reference>, Error> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| Reference::parse(owner, item))
            .collect(),
        single => Ok(vec![Reference::parse(owner, single)?]),
    }
}

fn parse_pull_request(owner: &str, value: &Value) -> Result<PullRequestSettings, Error> {
    match value {
        Value::Boolean(_) => Ok(PullRequestSettings::default()),
        Value::Object(object) => {
            let string = |key: &str| -> Result<Option<String>, Error> {
                match object.get(key) {
                    None => Ok(None),
                    Some(Value::String(s)) => Ok(Some(s.clone())),
                    Some(_) => Err(invalid(owner, format!("`pull_request.{key}` must be a string"))),
                }
            };
            Ok(PullRequestSettings {
                prefix: string("prefix")?,
                github: string("github")?,
            })
        }
        _ => Err(invalid(owner, "`pull_request` must be a map")),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidDefinition {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(source: &str) -> Object {
        match Value::from_yaml(serde_yaml::from_str(source).unwrap()) {
            Some(Value::Object(object)) => object,
            other => panic!("not a map: {other:?}"),
        }
    }

    #[test]
    fn job_keys_become_attributes_in_order() {
        let job = JobDefinition::from_body(
            Kind::Job,
            body("name: a\nextends: base\nvars: {days: 10}\ndiscard_old: {days: 1}\ndescription: hi"),
        )
        .unwrap();

        assert_eq!(job.extends.as_deref(), Some("base"));
        assert_eq!(job.vars.get("days"), Some(&Value::Integer(10)));
        let names: Vec<_> = job.attributes.iter().map(|i| i.attribute.as_str()).collect();
        assert_eq!(names, ["discard_old", "description"]);
    }

    #[test]
    fn project_keys_become_vars() {
        let project = JobDefinition::from_body(
            Kind::Project,
            body("name: P\ngit_repo: x\njobs: ['{{name}}-a', {'{{name}}-b': {target: s}}]\npull_request: {prefix: P-PR}"),
        )
        .unwrap();

        assert_eq!(project.vars.get("git_repo"), Some(&Value::from("x")));
        assert!(project.attributes.is_empty());
        assert_eq!(project.jobs.len(), 2);
        assert_eq!(project.jobs[1].name, "{{name}}-b");
        assert_eq!(project.jobs[1].overrides.get("target"), Some(&Value::from("s")));
        assert_eq!(project.pull_request.unwrap().prefix.as_deref(), Some("P-PR"));
    }

    #[test]
    fn view_regex_is_a_var() {
        let view = JobDefinition::from_body(Kind::View, body("name: v\nregex: '.*'\njobs: [a]")).unwrap();
        assert_eq!(view.vars.get("regex"), Some(&Value::from(".*")));
        assert_eq!(view.jobs[0].name, "a");
    }

    #[test]
    fn name_is_required() {
        let err = JobDefinition::from_body(Kind::Job, body("description: x")).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition { .. }));
    }

    #[test]
    fn malformed_reference() {
        let err = JobDefinition::from_body(Kind::Project, body("name: p\njobs: [{a: 1, b: 2}]"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition { name, .. } if name == "p"));
    }
}
