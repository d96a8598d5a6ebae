//! desired vs. existing job sets
use std::collections::BTreeSet;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub create: BTreeSet<String>,
    pub update: BTreeSet<String>,
    pub purge: BTreeSet<String>,
}

impl ReconciliationPlan {
    /// Plan how to get from `existing` (the names this run owns on the server) to `desired`
    pub fn new<'a>(
        desired: impl IntoIterator<Item = &'a str>,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let desired: BTreeSet<&str> = desired.into_iter().collect();
        let existing: BTreeSet<&str> = existing.into_iter().collect();

        let plan = Self {
            create: owned(desired.difference(&existing)),
            update: owned(desired.intersection(&existing)),
            purge: owned(existing.difference(&desired)),
        };
        tracing::debug!(?plan, "reconciliation plan");
        plan
    }

    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.purge.is_empty()
    }
}

fn owned<'a>(names: impl Iterator<Item = &'a &'a str>) -> BTreeSet<String> {
    names.map(|name| name.to_string()).collect()
}

/// Names of jobs a run with the ownership marker `prefix` is responsible for
pub fn owned_by<'a>(prefix: &'a str, names: &'a [String]) -> impl Iterator<Item = &'a str> {
    names
        .iter()
        .map(String::as_str)
        .filter(move |name| name.starts_with(prefix))
}
