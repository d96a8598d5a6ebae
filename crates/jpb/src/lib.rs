//! # jpb - pipeline builder
//!
//! Turns declarative job definitions into job and view configuration documents of a CI
//! server and publishes them.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `jpb` works internally.
//!
//! ### Loading files
//!
//! A definition file (yaml or json) is a list of single-key entries, see [definition] for the
//! format. [definitions::Definitions] stores every [definition::JobDefinition] of every loaded
//! file and tracks its source path. At this point definitions only have to be well-formed,
//! names are not checked for uniqueness and references are not followed.
//!
//! ### Resolution
//!
//! see [resolver::Resolver]
//!
//! A project references jobs and views by (unsubstituted) name. Each of them is resolved in
//! the context of the project:
//!
//! - the `extends` chain is flattened, templates are merged into the definition
//! - parameters are layered: project variables < template vars < job vars < call-site overrides
//! - `{{placeholders}}` are substituted in a single pass
//!
//! **Example**
//!
//! ```yaml
//! - job_template: { name: base, vars: { days: 5 }, discard_old: { days: "{{days}}" } }
//! - job: { name: "{{name}}-10-SampleJob", extends: base, vars: { days: 10 } }
//! - project: { name: SamplePipeline, jobs: ["{{name}}-10-SampleJob"] }
//! ```
//!
//! resolves to a job `SamplePipeline-10-SampleJob` keeping 10 days of builds.
//!
//! ### Validation
//!
//! [graph] rejects the whole run on template cycles, duplicate names and references to
//! definitions that do not exist. Everything else only fails the job it happens in.
//!
//! ### Building
//!
//! [builder::Builder] starts with a skeleton [document::Document] for the kind and applies
//! each attribute invocation through the [registry::AttributeRegistry]. The built-in
//! attributes live in [attributes].
//!
//! ### Publishing
//!
//! [generator::Generator] runs all of the above and publishes the documents through a
//! [client::JobServer]. For pull request instances it deletes the jobs no open pull request
//! produces any more ([planner]).
//!
pub mod attributes;
pub mod builder;
pub mod client;
pub mod config;
pub mod definition;
pub mod definitions;
pub mod document;
pub mod error;
pub mod generator;
pub mod graph;
pub mod placeholder;
pub mod planner;
pub mod pull_request;
pub mod registry;
pub mod resolver;
pub mod value;
mod visit;
