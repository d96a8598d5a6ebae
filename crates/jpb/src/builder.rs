//! resolved definition -> job/view document
//!
//! Every published kind starts from a skeleton carrying the server's defaults. Attribute
//! invocations are applied in declaration order on top of it.
use crate::definition::{JobDefinition, Kind};
use crate::document::{Document, Element};
use crate::error::{Error, JobError};
use crate::registry::AttributeRegistry;

#[derive(derive_new::new)]
pub struct Builder<'r> {
    registry: &'r AttributeRegistry,
    /// Fail on attributes whose capability is not installed instead of warning
    #[new(value = "false")]
    strict_capabilities: bool,
}

impl<'r> Builder<'r> {
    pub fn strict_capabilities(mut self, strict: bool) -> Self {
        self.strict_capabilities = strict;
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = %definition.kind, name = %definition.name))]
    pub fn build(&self, definition: &JobDefinition) -> Result<Document, JobError> {
        let mut document = match definition.kind {
            Kind::Job => freestyle(),
            Kind::View => list_view(definition),
            kind => {
                return Err(JobError::new(
                    &definition.name,
                    Error::InvalidDefinition {
                        name: definition.name.clone(),
                        reason: format!("a {kind} is not published"),
                    },
                ))
            }
        };

        for invocation in &definition.attributes {
            let fail = |error: Error| {
                JobError::new(&definition.name, error).in_attribute(&invocation.attribute)
            };

            let descriptor = self.registry.lookup(&invocation.attribute).map_err(fail)?;

            if let Err(error) = self.registry.check_capability(descriptor) {
                if self.strict_capabilities {
                    return Err(fail(error));
                }
                tracing::warn!(job = %definition.name, "{error}");
            }

            descriptor
                .apply(&mut document, &invocation.params)
                .map_err(fail)?;
        }

        Ok(document)
    }
}

/// Skeleton of a freestyle job
pub fn freestyle() -> Document {
    Document::new(
        Element::new("project")
            .child(Element::new("actions"))
            .child(Element::new("description"))
            .child(Element::leaf("keepDependencies", false))
            .child(Element::new("properties"))
            .child(Element::new("scm").attr("class", "hudson.scm.NullSCM"))
            .child(Element::leaf("canRoam", true))
            .child(Element::leaf("disabled", false))
            .child(Element::leaf("blockBuildWhenDownstreamBuilding", false))
            .child(Element::leaf("blockBuildWhenUpstreamBuilding", false))
            .child(Element::new("triggers"))
            .child(Element::leaf("concurrentBuild", false))
            .child(Element::new("builders"))
            .child(Element::new("publishers"))
            .child(Element::new("buildWrappers")),
    )
}

const COLUMNS: [&str; 7] = [
    "hudson.views.StatusColumn",
    "hudson.views.WeatherColumn",
    "hudson.views.JobColumn",
    "hudson.views.LastSuccessColumn",
    "hudson.views.LastFailureColumn",
    "hudson.views.LastDurationColumn",
    "hudson.views.BuildButtonColumn",
];

/// Skeleton of a list view showing the jobs `view` references
///
/// The server keeps job names sorted case insensitively, so they are written that way.
pub fn list_view(view: &JobDefinition) -> Document {
    let mut jobs: Vec<&str> = view.jobs.iter().map(|job| job.name.as_str()).collect();
    jobs.sort_by_key(|name| name.to_lowercase());
    jobs.dedup();

    let job_names = jobs.into_iter().fold(
        Element::new("jobNames")
            .child(Element::new("comparator").attr("class", "hudson.util.CaseInsensitiveComparator")),
        |names, job| names.child(Element::leaf("string", job)),
    );

    let columns = COLUMNS
        .into_iter()
        .fold(Element::new("columns"), |columns, column| {
            columns.child(Element::new(column))
        });

    Document::new(
        Element::new("hudson.model.ListView")
            .child(Element::leaf("name", &view.name))
            .child_if(view.vars.get("description").filter(|v| v.is_set()), |v| {
                Element::leaf("description", v)
            })
            .child(Element::leaf("filterExecutors", false))
            .child(Element::leaf("filterQueue", false))
            .child(Element::new("properties").attr("class", "hudson.model.View$PropertyList"))
            .child(job_names)
            .child(Element::new("jobFilters"))
            .child(columns)
            .child_if(view.vars.get("regex").filter(|v| v.is_set()), |v| {
                Element::leaf("includeRegex", v)
            })
            .child(Element::leaf("recurse", false)),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Path;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn job_from_attributes() {
        let registry = AttributeRegistry::with_builtin();
        let job = JobDefinition::new(Kind::Job, "a")
            .with_attribute("description", "Builds a")
            .with_attribute("concurrent_build", true);

        let document = Builder::new(&registry).build(&job).unwrap();
        assert_eq!(
            document.find(&path("/project/description")).unwrap().text.as_deref(),
            Some("Builds a")
        );
        assert_eq!(
            document.find(&path("//concurrentBuild")).unwrap().text.as_deref(),
            Some("true")
        );
    }

    #[test]
    fn errors_carry_job_and_attribute() {
        let registry = AttributeRegistry::with_builtin();
        let job = JobDefinition::new(Kind::Job, "a")
            .with_attribute("description", "x")
            .with_attribute("nonsense", true);

        let err = Builder::new(&registry).build(&job).unwrap_err();
        assert_eq!(err.job, "a");
        assert_eq!(err.attribute.as_deref(), Some("nonsense"));
        assert!(matches!(err.error, Error::UnknownAttribute(_)));
    }

    #[test]
    fn missing_capability_strict_and_lenient() {
        let mut registry = AttributeRegistry::with_builtin();
        registry.set_installed_capabilities(Default::default());
        let job = JobDefinition::new(Kind::Job, "a")
            .with_attribute("throttle", Value::from_iter([("max_total", 1i64)]));

        assert!(Builder::new(&registry).build(&job).is_ok());

        let err = Builder::new(&registry)
            .strict_capabilities(true)
            .build(&job)
            .unwrap_err();
        assert!(matches!(err.error, Error::MissingCapability { .. }));
    }

    #[test]
    fn rebuilding_is_identical() {
        let registry = AttributeRegistry::with_builtin();
        let job = JobDefinition::new(Kind::Job, "a")
            .with_attribute("priority", Value::from_iter([("job_priority", 3i64)]));
        let builder = Builder::new(&registry);
        assert_eq!(
            builder.build(&job).unwrap().to_xml(),
            builder.build(&job).unwrap().to_xml()
        );
    }

    #[test]
    fn view_document() {
        let registry = AttributeRegistry::default();
        let mut view = JobDefinition::new(Kind::View, "P View")
            .with_job("b-job")
            .with_job("A-job");
        view.vars.insert("regex".into(), "P-.*".into());

        let xml = Builder::new(&registry).build(&view).unwrap().to_xml();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<hudson.model.ListView>
  <name>P View</name>
  <filterExecutors>false</filterExecutors>
  <filterQueue>false</filterQueue>
  <properties class="hudson.model.View$PropertyList"/>
  <jobNames>
    <comparator class="hudson.util.CaseInsensitiveComparator"/>
    <string>A-job</string>
    <string>b-job</string>
  </jobNames>
  <jobFilters/>
  <columns>
    <hudson.views.StatusColumn/>
    <hudson.views.WeatherColumn/>
    <hudson.views.JobColumn/>
    <hudson.views.LastSuccessColumn/>
    <hudson.views.LastFailureColumn/>
    <hudson.views.LastDurationColumn/>
    <hudson.views.BuildButtonColumn/>
  </columns>
  <includeRegex>P-.*</includeRegex>
  <recurse>false</recurse>
</hudson.model.ListView>
"#
        );
    }

    #[test]
    fn projects_are_not_built() {
        let registry = AttributeRegistry::default();
        let err = Builder::new(&registry)
            .build(&JobDefinition::new(Kind::Project, "P"))
            .unwrap_err();
        assert!(matches!(err.error, Error::InvalidDefinition { .. }));
    }
}
