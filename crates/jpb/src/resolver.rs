//! template and parameter resolution
//!
//! [Resolver::resolve] turns a definition that may `extend` templates into a concrete one:
//!
//! 1. the `extends` chain is followed up to a definition without parent, each step is merged
//!    on top of its parent (see [merge])
//! 2. the parameter set is layered: context (project variables) < template vars < job vars
//!    < call-site overrides
//! 3. every string in vars, attribute parameters and references, as well as the name, gets
//!    its `{{placeholders}}` substituted in a single pass against that parameter set
//!
//! [Resolver::resolve_project] does this for every job and view a project references and
//! collects the results in a [ResolvedSet].
use crate::definition::{JobDefinition, Kind, Reference};
use crate::definitions::Definitions;
use crate::error::{Error, JobError};
use crate::placeholder::{self, PlaceholderRewriter};
use crate::value::{Object, Value};
use crate::visit::VisitStringsMut;

/// Definitions produced by one run, ready for validation and building
#[derive(Debug, Default)]
pub struct ResolvedSet {
    pub jobs: Vec<JobDefinition>,
    pub views: Vec<JobDefinition>,
    pub projects: Vec<JobDefinition>,
    /// Per-definition failures, the definitions themselves are missing from the set
    pub errors: Vec<JobError>,
    /// Names of definitions that failed to resolve (as far as they could be computed)
    pub failed: Vec<String>,
}

impl ResolvedSet {
    pub fn push(&mut self, definition: JobDefinition) {
        match definition.kind {
            Kind::Job => self.jobs.push(definition),
            Kind::View => self.views.push(definition),
            Kind::Project => self.projects.push(definition),
            Kind::Template => {
                tracing::debug!(name = %definition.name, "templates are not part of a resolved set")
            }
        }
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|job| job.name.as_str())
    }
}

#[derive(derive_new::new)]
pub struct Resolver<'d> {
    definitions: &'d Definitions,
}

impl<'d> Resolver<'d> {
    /// Resolve a definition into a concrete one without template reference
    ///
    /// `context` holds the lowest-precedence parameters (the variables of the referencing
    /// project), `overrides` the highest-precedence ones (call-site parameters).
    #[tracing::instrument(level = "debug", skip_all, fields(name = %definition.name))]
    pub fn resolve(
        &self,
        definition: &JobDefinition,
        context: &Object,
        overrides: &Object,
    ) -> Result<JobDefinition, Error> {
        // only templates can be part of a chain, a job may share its template's name
        let mut stack = match definition.kind {
            Kind::Template => vec![definition.name.clone()],
            _ => Vec::new(),
        };
        let mut merged = self.flatten(definition, &mut stack)?;

        let mut params = context.clone();
        params.extend(merged.vars.clone());
        params.extend(overrides.clone());

        let mut rewriter = PlaceholderRewriter::new(&params);
        for value in merged.vars.values_mut() {
            value.visit_strings_mut(&mut rewriter);
        }
        for invocation in &mut merged.attributes {
            invocation.params.visit_strings_mut(&mut rewriter);
        }
        rewriter.finish()?;

        for (key, value) in overrides {
            merged.vars.insert(key.clone(), value.clone());
        }

        for reference in merged.jobs.iter_mut().chain(merged.views.iter_mut()) {
            reference.name = substitute_name(&reference.name, &params)?;
        }
        merged.name = substitute_name(&merged.name, &params)?;

        tracing::debug!(resolved = %merged.name, "resolved");
        Ok(merged)
    }

    /// Follow the `extends` chain and merge it into a single definition
    fn flatten(
        &self,
        definition: &JobDefinition,
        stack: &mut Vec<String>,
    ) -> Result<JobDefinition, Error> {
        let Some(parent_name) = &definition.extends else {
            return Ok(definition.clone());
        };

        if stack.iter().any(|name| name == parent_name) {
            let mut chain = stack.clone();
            chain.push(parent_name.clone());
            return Err(Error::TemplateCycle { chain });
        }

        let parent = self
            .definitions
            .find(Kind::Template, parent_name)
            .ok_or_else(|| Error::TemplateNotFound {
                name: parent_name.clone(),
            })?;

        stack.push(parent_name.clone());
        let base = self.flatten(parent, stack)?;
        stack.pop();

        Ok(merge(base, definition))
    }

    /// Resolve a project and everything it references
    ///
    /// The project variables plus `name` (the project name) are the context of every
    /// referenced definition. References to unknown definitions are kept in the project's
    /// reference list so validation can report them.
    ///
    /// Project variables may use placeholders themselves. If one does not resolve, the project
    /// fails as a whole and none of its references are resolved.
    pub fn resolve_project(&self, project: &JobDefinition, extra: &Object, set: &mut ResolvedSet) {
        let mut context = project.vars.clone();
        context.insert("name".into(), Value::from(project.name.as_str()));
        context.extend(extra.clone());

        let project_name = context
            .get("name")
            .map(Value::to_text)
            .unwrap_or_else(|| project.name.clone());

        let params = context.clone();
        let mut rewriter = PlaceholderRewriter::new(&params);
        for value in context.values_mut() {
            value.visit_strings_mut(&mut rewriter);
        }
        if let Err(error) = rewriter.finish() {
            tracing::debug!(project = %project_name, %error, "project variables failed");
            // keep what the project would have produced, so nothing gets purged for it
            for reference in &project.jobs {
                let name = substitute_name(&reference.name, &params)
                    .unwrap_or_else(|_| reference.name.clone());
                set.failed.push(name);
            }
            set.errors.push(JobError::new(project_name, error));
            return;
        }

        let mut resolved_project = JobDefinition::new(Kind::Project, project_name.clone());
        resolved_project.vars = context.clone();

        let references = project
            .jobs
            .iter()
            .map(|reference| (Kind::Job, reference))
            .chain(project.views.iter().map(|reference| (Kind::View, reference)));

        for (kind, reference) in references {
            let resolved_reference =
                self.resolve_reference(&project_name, kind, reference, &context, set);

            if let Some(name) = resolved_reference {
                let target = match kind {
                    Kind::View => &mut resolved_project.views,
                    _ => &mut resolved_project.jobs,
                };
                target.push(Reference {
                    name,
                    overrides: Object::new(),
                });
            }
        }

        set.push(resolved_project);
    }

    /// Resolve a referenced definition into `set`
    ///
    /// Returns the name the project should reference, `None` if the definition failed.
    fn resolve_reference(
        &self,
        project_name: &str,
        kind: Kind,
        reference: &Reference,
        context: &Object,
        set: &mut ResolvedSet,
    ) -> Option<String> {
        let Some(definition) = self.definitions.find(kind, &reference.name) else {
            let name = substitute_name(&reference.name, context)
                .unwrap_or_else(|_| reference.name.clone());
            tracing::debug!(project = %project_name, %name, "reference to unknown {kind}");
            return Some(name);
        };

        match self.resolve(definition, context, &reference.overrides) {
            Ok(resolved) => {
                let name = resolved.name.clone();
                set.push(resolved);
                Some(name)
            }
            Err(error) => {
                let mut params = context.clone();
                params.extend(reference.overrides.clone());
                let name = substitute_name(&reference.name, &params)
                    .unwrap_or_else(|_| reference.name.clone());
                tracing::debug!(project = %project_name, %name, %error, "resolution failed");
                set.failed.push(name.clone());
                set.errors.push(JobError::new(name, error));
                None
            }
        }
    }

    /// Resolve a definition outside of any project
    pub fn resolve_standalone(&self, definition: &JobDefinition, set: &mut ResolvedSet) {
        match self.resolve(definition, &Object::new(), &Object::new()) {
            Ok(resolved) => set.push(resolved),
            Err(error) => {
                set.failed.push(definition.name.clone());
                set.errors.push(JobError::new(definition.name.clone(), error));
            }
        }
    }
}

fn substitute_name(name: &str, params: &Object) -> Result<String, Error> {
    Ok(placeholder::substitute(name, params)?.to_text())
}

/// Merge `child` on top of its already flattened parent
///
/// - vars: child wins for identical keys
/// - attributes: an attribute the parent already invokes is deep merged in place (child wins),
///   new attributes are appended
/// - references: appended
fn merge(mut base: JobDefinition, child: &JobDefinition) -> JobDefinition {
    base.kind = child.kind;
    base.name = child.name.clone();
    base.extends = None;

    for (key, value) in &child.vars {
        base.vars.insert(key.clone(), value.clone());
    }

    for invocation in &child.attributes {
        match base
            .attributes
            .iter_mut()
            .find(|existing| existing.attribute == invocation.attribute)
        {
            Some(existing) => existing.params.merge(invocation.params.clone()),
            None => base.attributes.push(invocation.clone()),
        }
    }

    base.jobs.extend(child.jobs.iter().cloned());
    base.views.extend(child.views.iter().cloned());
    if child.pull_request.is_some() {
        base.pull_request = child.pull_request.clone();
    }

    base
}
