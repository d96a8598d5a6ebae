//! Snapshot tests
//!
//! Loads each *.yaml file in /tests/ individually and compares if the
//! documents built from it change.
use jpb::builder::Builder;
use jpb::definition::Kind;
use jpb::definitions::Definitions;
use jpb::registry::AttributeRegistry;

#[test]
fn snapshots() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("JPB_LOG"))
        .with_writer(std::io::stderr)
        .init();

    insta::glob!("*.yaml", |path| {
        let mut definitions = Definitions::default();
        definitions
            .load_file(path)
            .expect("must be valid definitions");

        let set = jpb::generator::resolve(&definitions, None).expect("must resolve");
        assert!(set.errors.is_empty(), "{:?}", set.errors);
        let order = jpb::graph::validate(&set).expect("must be a valid graph");

        let registry = AttributeRegistry::with_builtin();
        let builder = Builder::new(&registry);

        let mut rendered = String::new();
        for (kind, name) in order {
            let resolved = match kind {
                Kind::Job => &set.jobs,
                Kind::View => &set.views,
                _ => continue,
            };
            let definition = resolved.iter().find(|d| d.name == name).unwrap();
            let document = builder.build(definition).expect("must build");
            rendered.push_str(&format!("{kind} {name}\n{document}\n"));
        }

        insta::assert_snapshot!(rendered);
    });
}
