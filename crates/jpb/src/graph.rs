//! dependency validation and build order
//!
//! Everything found here invalidates a whole run: a template cycle, two definitions of the same
//! kind resolving to one name, or a project/view referencing a name that does not exist.
//! All issues are collected before failing so they can be reported in one go.
use crate::definition::{JobDefinition, Kind};
use crate::definitions::Definitions;
use crate::error::Error;
use crate::resolver::ResolvedSet;
use std::collections::{HashMap, HashSet};

#[derive(derive_new::new, Debug)]
pub struct GraphIssues {
    #[new(default)]
    issues: Vec<Error>,
}

impl GraphIssues {
    pub fn log(&mut self, issue: Error) {
        tracing::trace!(?issue, "issue found");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    fn into_result(self) -> Result<(), GraphIssues> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::error::Error for GraphIssues {}

impl std::fmt::Display for GraphIssues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut issues = self.issues.iter();
        if let Some(first) = issues.next() {
            write!(f, "{first}")?;
        }
        for issue in issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

/// Check the loaded templates before anything is resolved
///
/// Logs duplicate template names and every `extends` chain that loops back on itself.
/// Missing templates are left to the resolver, they only affect the definitions using them.
pub fn check_templates(definitions: &Definitions) -> Result<(), GraphIssues> {
    let mut issues = GraphIssues::new();

    let mut templates: HashMap<&str, &JobDefinition> = HashMap::new();
    for template in definitions.of_kind(Kind::Template) {
        if templates.insert(&template.name, template).is_some() {
            issues.log(Error::DuplicateName {
                kind: Kind::Template,
                name: template.name.clone(),
            });
        }
    }

    let mut reported: HashSet<Vec<String>> = HashSet::new();
    for template in definitions.of_kind(Kind::Template) {
        let mut chain = vec![template.name.clone()];
        let mut current = template;

        while let Some(parent) = &current.extends {
            if let Some(start) = chain.iter().position(|name| name == parent) {
                let mut cycle = chain[start..].to_vec();
                // the same loop is found from each of its members, report it once
                let mut key = cycle.clone();
                key.sort();
                cycle.push(parent.clone());
                if reported.insert(key) {
                    issues.log(Error::TemplateCycle { chain: cycle });
                }
                break;
            }

            let Some(next) = templates.get(parent.as_str()).copied() else {
                break;
            };
            chain.push(parent.clone());
            current = next;
        }
    }

    issues.into_result()
}

/// Validate a resolved set and compute its build order
///
/// Order: jobs, then projects, then views (templates are already merged away). Within a kind
/// the resolution order is kept.
pub fn validate(set: &ResolvedSet) -> Result<Vec<(Kind, String)>, GraphIssues> {
    let mut issues = GraphIssues::new();

    for definitions in [&set.jobs, &set.projects, &set.views] {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for definition in definitions {
            if !seen.insert(definition.name.as_str()) && reported.insert(definition.name.as_str()) {
                issues.log(Error::DuplicateName {
                    kind: definition.kind,
                    name: definition.name.clone(),
                });
            }
        }
    }

    let failed: HashSet<&str> = set.failed.iter().map(String::as_str).collect();
    let jobs: HashSet<&str> = set.job_names().collect();
    let views: HashSet<&str> = set.views.iter().map(|view| view.name.as_str()).collect();

    for owner in set.projects.iter().chain(set.views.iter()) {
        let references = owner
            .jobs
            .iter()
            .map(|reference| (&jobs, reference))
            .chain(owner.views.iter().map(|reference| (&views, reference)));

        for (known, reference) in references {
            let name = reference.name.as_str();
            if !known.contains(name) && !failed.contains(name) {
                issues.log(Error::DanglingReference {
                    from: owner.name.clone(),
                    name: name.to_string(),
                });
            }
        }
    }

    issues.into_result()?;

    let mut order: Vec<(Kind, String)> = set
        .jobs
        .iter()
        .chain(set.projects.iter())
        .chain(set.views.iter())
        .map(|definition| (definition.kind, definition.name.clone()))
        .collect();
    order.sort_by_key(|(kind, _)| *kind);

    Ok(order)
}
