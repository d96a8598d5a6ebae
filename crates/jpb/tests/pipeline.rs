//! End to end runs against in-memory and file backed servers
use jpb::client::{LocalServer, MemoryServer};
use jpb::error::Error;
use jpb::generator::{Generator, RunError};
use pretty_assertions::assert_eq;

const PIPELINE: &str = r#"
- job_template:
    name: base
    vars: { days: 5 }
    discard_old: { days: "{{days}}" }
- job:
    name: "{{name}}-10-SampleJob"
    extends: base
    vars: { days: 10 }
    scm_params: { local_branch: "{{pr_branch}}" }
- project:
    name: PullRequest
    pull_request: { prefix: PullRequest-PR }
    jobs: ["{{name}}-10-SampleJob"]
"#;

fn write(dir: &std::path::Path, name: &str, source: &str) {
    std::fs::write(dir.join(name), source).unwrap();
}

#[test]
fn pull_request_instances() {
    let definitions_dir = tempfile::tempdir().unwrap();
    write(definitions_dir.path(), "pipeline.yaml", PIPELINE);

    let server = MemoryServer::new();
    let mut generator = Generator::new(server.clone());
    let report = generator
        .pull_request(definitions_dir.path(), "PullRequest", &vec![1u64])
        .unwrap();

    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(report.created, ["PullRequest-PR1-10-SampleJob"]);

    let config = server.job("PullRequest-PR1-10-SampleJob").unwrap();
    // job vars win over template vars
    assert!(config.contains("<daysToKeep>10</daysToKeep>"));
    assert!(config.contains("<localBranch>origin/pr/1/head</localBranch>"));

    // the same run again only updates
    let report = generator
        .pull_request(definitions_dir.path(), "PullRequest", &vec![1u64])
        .unwrap();
    assert_eq!(report.updated, ["PullRequest-PR1-10-SampleJob"]);
    assert_eq!(server.job("PullRequest-PR1-10-SampleJob").unwrap(), config);

    // closed pull requests lose their jobs
    let report = generator
        .pull_request(definitions_dir.path(), "PullRequest", &vec![2u64])
        .unwrap();
    assert_eq!(report.created, ["PullRequest-PR2-10-SampleJob"]);
    assert_eq!(report.deleted, ["PullRequest-PR1-10-SampleJob"]);
}

#[test]
fn unresolved_placeholder_is_not_published() {
    let server = MemoryServer::new();
    let mut generator = Generator::new(server.clone());
    let definitions = jpb::definitions! {r#"
    - job: { name: "{{name}}-ok" }
    - job: { name: "{{name}}-broken", description: "{{nowhere}}" }
    - project: { name: P, jobs: ["{{name}}-ok", "{{name}}-broken"] }
    "#};

    let report = generator.bootstrap_with(&definitions, Some("P")).unwrap();
    assert_eq!(report.created, ["P-ok"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].job, "P-broken");
    assert!(matches!(
        &report.errors[0].error,
        Error::UnresolvedPlaceholder { token } if token == "nowhere"
    ));
    assert!(server.job("P-broken").is_none());
}

#[test]
fn job_named_like_its_template() {
    let server = MemoryServer::new();
    let mut generator = Generator::new(server.clone());
    let definitions = jpb::definitions! {r#"
    - job_template: { name: build, description: shared }
    - job: { name: build, extends: build }
    "#};

    let report = generator.bootstrap_with(&definitions, None).unwrap();
    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(report.created, ["build"]);
    assert!(server
        .job("build")
        .unwrap()
        .contains("<description>shared</description>"));
}

#[test]
fn unresolved_project_variable_is_not_published() {
    let server = MemoryServer::new();
    let mut generator = Generator::new(server.clone());
    let definitions = jpb::definitions! {r#"
    - job: { name: "{{name}}-a", description: "{{repo}}" }
    - project: { name: P, repo: "{{nope}}", jobs: ["{{name}}-a"] }
    "#};

    let report = generator.bootstrap_with(&definitions, Some("P")).unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].job, "P");
    assert!(matches!(
        &report.errors[0].error,
        Error::UnresolvedPlaceholder { token } if token == "nope"
    ));
    assert!(server.job("P-a").is_none());
}

#[test]
fn template_cycle_aborts() {
    let server = MemoryServer::new();
    let mut generator = Generator::new(server.clone());
    let definitions = jpb::definitions! {r#"
    - job_template: { name: a, extends: b }
    - job_template: { name: b, extends: a }
    - job: { name: j, extends: a }
    - job: { name: fine }
    "#};

    let issues = match generator.bootstrap_with(&definitions, None) {
        Err(RunError::Graph(issues)) => issues,
        other => panic!("expected graph issues, got {other:?}"),
    };
    assert!(matches!(issues.issues()[0], Error::TemplateCycle { .. }));
    assert!(server.jobs().is_empty());
}

#[test]
fn debug_mode_writes_files() {
    let definitions_dir = tempfile::tempdir().unwrap();
    write(
        definitions_dir.path(),
        "jobs.yml",
        "- job: { name: a, description: first }\n",
    );
    write(
        definitions_dir.path(),
        "more.json",
        r#"[{"job": {"name": "b", "concurrent_build": true}}]"#,
    );

    let output = tempfile::tempdir().unwrap();
    let mut generator = Generator::new(LocalServer::new(output.path()));
    let report = generator.bootstrap(definitions_dir.path(), None).unwrap();
    assert!(report.is_success(), "{:?}", report.errors);

    let a = std::fs::read_to_string(output.path().join("a.xml")).unwrap();
    assert!(a.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>"));
    assert!(a.contains("<description>first</description>"));

    let b = std::fs::read_to_string(output.path().join("b.xml")).unwrap();
    assert!(b.contains("<concurrentBuild>true</concurrentBuild>"));

    // a second run updates the files in place
    let report = generator.bootstrap(definitions_dir.path(), None).unwrap();
    let mut updated = report.updated.clone();
    updated.sort();
    assert_eq!(updated, ["a", "b"]);
}

#[test]
fn empty_directory_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut generator = Generator::new(MemoryServer::new());
    assert!(matches!(
        generator.bootstrap(dir.path(), None),
        Err(RunError::Load(jpb::definitions::LoadError::NoFilesFound))
    ));
}
