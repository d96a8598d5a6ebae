//! end to end runs: load, resolve, validate, build and publish
//!
//! Problems of the definition graph (template cycles, duplicate names, dangling references)
//! abort a run before anything is published. Problems of a single job (unknown attribute,
//! missing parameter, rejected by the server, ...) are collected in the [Report] while the
//! remaining jobs are still published. Nothing already published is rolled back.
use crate::builder::Builder;
use crate::client::{ClientError, JobServer};
use crate::definition::{JobDefinition, Kind};
use crate::definitions::{Definitions, LoadError};
use crate::error::JobError;
use crate::graph::{self, GraphIssues};
use crate::planner::{owned_by, ReconciliationPlan};
use crate::pull_request::{self, PullRequestSource};
use crate::registry::AttributeRegistry;
use crate::resolver::{ResolvedSet, Resolver};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("failed to load definitions")]
    Load(#[from] LoadError),
    #[error("invalid definitions: {0}")]
    Graph(#[from] GraphIssues),
    #[error("server request failed")]
    Client(#[from] ClientError),
    #[error("no {kind} named `{name}`")]
    NotFound { kind: Kind, name: String },
    #[error("failed to write `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a run that got to publishing
#[derive(Debug, Default)]
pub struct Report {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub errors: Vec<JobError>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Generator {
    registry: AttributeRegistry,
    server: Box<dyn JobServer>,
    strict_capabilities: bool,
}

impl Generator {
    /// Generator publishing to `server` with the built-in attributes
    pub fn new(server: impl JobServer + 'static) -> Self {
        Self::boxed(Box::new(server))
    }

    pub fn boxed(server: Box<dyn JobServer>) -> Self {
        Self {
            registry: AttributeRegistry::with_builtin(),
            server,
            strict_capabilities: false,
        }
    }

    pub fn with_registry(mut self, registry: AttributeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Fail jobs using attributes of plugins the server does not have
    pub fn strict_capabilities(mut self, strict: bool) -> Self {
        self.strict_capabilities = strict;
        self
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.registry
    }

    /// Ask the server which capabilities are installed
    pub fn refresh_capabilities(&mut self) -> Result<(), ClientError> {
        match self.server.list_installed_plugins()? {
            Some(plugins) => self.registry.set_installed_capabilities(plugins),
            None => self.registry.clear_versions(),
        }
        Ok(())
    }

    /// Load `path` and publish the project (or job, or view) `name`, everything if `None`
    pub fn bootstrap(&mut self, path: &Path, name: Option<&str>) -> Result<Report, RunError> {
        let definitions = Definitions::from_path(path)?;
        tracing::info!(path = %path.display(), count = definitions.len(), "definitions loaded");
        self.bootstrap_with(&definitions, name)
    }

    /// Publish from already loaded definitions, see [resolve] for what `name` selects
    #[tracing::instrument(level = "debug", skip(self, definitions))]
    pub fn bootstrap_with(
        &mut self,
        definitions: &Definitions,
        name: Option<&str>,
    ) -> Result<Report, RunError> {
        let mut set = resolve(definitions, name)?;
        let order = graph::validate(&set)?;
        self.refresh_capabilities()?;

        let existing: HashSet<String> = self.server.list_jobs()?.into_iter().collect();
        let mut report = Report {
            errors: std::mem::take(&mut set.errors),
            ..Default::default()
        };
        self.publish(&set, &order, &existing, &mut report)?;

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            errors = report.errors.len(),
            "bootstrap done"
        );
        Ok(report)
    }

    /// Load `path` and publish one instance of the project `name` per open pull request
    pub fn pull_request(
        &mut self,
        path: &Path,
        name: &str,
        source: &dyn PullRequestSource,
    ) -> Result<Report, RunError> {
        let definitions = Definitions::from_path(path)?;
        self.pull_request_with(&definitions, name, source)
    }

    /// Publish pull request instances from already loaded definitions
    ///
    /// Jobs named with the instance prefix that no open pull request produces any more are
    /// deleted.
    #[tracing::instrument(level = "debug", skip(self, definitions, source))]
    pub fn pull_request_with(
        &mut self,
        definitions: &Definitions,
        name: &str,
        source: &dyn PullRequestSource,
    ) -> Result<Report, RunError> {
        let project = definitions
            .find(Kind::Project, name)
            .ok_or_else(|| RunError::NotFound {
                kind: Kind::Project,
                name: name.to_string(),
            })?;
        let prefix = pull_request_prefix(project);

        graph::check_templates(definitions)?;

        let numbers = source.open_pull_requests()?;
        tracing::info!(project = %project.name, %prefix, ?numbers, "open pull requests");

        let resolver = Resolver::new(definitions);
        let mut set = ResolvedSet::default();
        for number in numbers {
            let (instance, vars) = pull_request::instance(&prefix, number);
            tracing::debug!(%instance, "resolve instance");
            resolver.resolve_project(project, &vars, &mut set);
        }

        let order = graph::validate(&set)?;
        self.refresh_capabilities()?;

        let existing = self.server.list_jobs()?;
        // failed jobs stay desired, their last good version is kept
        let desired = set
            .job_names()
            .chain(set.failed.iter().map(String::as_str));
        let plan = ReconciliationPlan::new(desired, owned_by(&prefix, &existing));

        let mut report = Report {
            errors: std::mem::take(&mut set.errors),
            ..Default::default()
        };
        let existing: HashSet<String> = existing.into_iter().collect();
        self.publish(&set, &order, &existing, &mut report)?;

        for name in &plan.purge {
            match self.server.delete_job(name) {
                Ok(()) => {
                    tracing::info!(%name, "deleted");
                    report.deleted.push(name.clone());
                }
                Err(error) => report.errors.push(JobError::new(name, error)),
            }
        }

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            errors = report.errors.len(),
            "pull request run done"
        );
        Ok(report)
    }

    /// Write the configuration of job `name` as the server has it to `<dir>/<name>.xml`
    pub fn dump(&self, name: &str, dir: &Path) -> Result<PathBuf, RunError> {
        let config = self
            .server
            .get_job_config(name)?
            .ok_or_else(|| RunError::NotFound {
                kind: Kind::Job,
                name: name.to_string(),
            })?;

        let path = crate::client::config_file(dir, name);
        std::fs::write(&path, config).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "dumped");
        Ok(path)
    }

    /// Build and publish jobs and views of `set` in build order
    fn publish(
        &self,
        set: &ResolvedSet,
        order: &[(Kind, String)],
        existing_jobs: &HashSet<String>,
        report: &mut Report,
    ) -> Result<(), RunError> {
        let builder = Builder::new(&self.registry).strict_capabilities(self.strict_capabilities);

        let existing_views: HashSet<String> = if set.views.is_empty() {
            HashSet::new()
        } else {
            self.server.list_views()?.into_iter().collect()
        };

        for (kind, name) in order {
            let (definitions, existing) = match kind {
                Kind::Job => (&set.jobs, existing_jobs),
                Kind::View => (&set.views, &existing_views),
                _ => continue,
            };
            let Some(definition) = definitions.iter().find(|d| &d.name == name) else {
                continue;
            };

            let config = match builder.build(definition) {
                Ok(document) => document.to_xml(),
                Err(error) => {
                    tracing::warn!(%error, "not published");
                    report.errors.push(error);
                    continue;
                }
            };

            let exists = existing.contains(name);
            let result = match (kind, exists) {
                (Kind::View, true) => self.server.update_view(name, &config),
                (Kind::View, false) => self.server.create_view(name, &config),
                (_, true) => self.server.update_job(name, &config),
                (_, false) => self.server.create_job(name, &config),
            };

            match result {
                Ok(()) if exists => {
                    tracing::info!(%kind, %name, "updated");
                    report.updated.push(name.clone());
                }
                Ok(()) => {
                    tracing::info!(%kind, %name, "created");
                    report.created.push(name.clone());
                }
                Err(error) => {
                    tracing::warn!(%kind, %name, %error, "publish failed");
                    report.errors.push(JobError::new(name, error));
                }
            }
        }

        Ok(())
    }
}

/// Resolve the project (or job, or view) `name` of `definitions`, everything if `None`
///
/// Without `name` every project is resolved except those instantiated per pull request,
/// along with every job and view no project references.
pub fn resolve(definitions: &Definitions, name: Option<&str>) -> Result<ResolvedSet, RunError> {
    graph::check_templates(definitions)?;

    let resolver = Resolver::new(definitions);
    let mut set = ResolvedSet::default();

    match name {
        Some(name) => {
            if let Some(project) = definitions.find(Kind::Project, name) {
                resolver.resolve_project(project, &Default::default(), &mut set);
            } else if let Some(definition) = definitions
                .find(Kind::Job, name)
                .or_else(|| definitions.find(Kind::View, name))
            {
                resolver.resolve_standalone(definition, &mut set);
            } else {
                return Err(RunError::NotFound {
                    kind: Kind::Project,
                    name: name.to_string(),
                });
            }
        }
        None => {
            let projects: Vec<&JobDefinition> = definitions
                .of_kind(Kind::Project)
                .filter(|project| project.pull_request.is_none())
                .collect();
            let referenced: HashSet<(Kind, &str)> = definitions
                .of_kind(Kind::Project)
                .flat_map(|project| {
                    let jobs = project.jobs.iter().map(|r| (Kind::Job, r.name.as_str()));
                    let views = project.views.iter().map(|r| (Kind::View, r.name.as_str()));
                    jobs.chain(views)
                })
                .collect();

            for project in projects {
                resolver.resolve_project(project, &Default::default(), &mut set);
            }
            for kind in [Kind::Job, Kind::View] {
                for definition in definitions.of_kind(kind) {
                    if !referenced.contains(&(kind, definition.name.as_str())) {
                        resolver.resolve_standalone(definition, &mut set);
                    }
                }
            }
        }
    }

    Ok(set)
}

/// Name prefix of the pull request instances of `project`
pub fn pull_request_prefix(project: &JobDefinition) -> String {
    project
        .pull_request
        .as_ref()
        .and_then(|settings| settings.prefix.clone())
        .unwrap_or_else(|| format!("{}-PR", project.name))
}
