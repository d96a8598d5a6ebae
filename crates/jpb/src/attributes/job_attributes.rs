use super::{path, remove_if_set, text_or};
use crate::document::Element;
use crate::error::Error;
use crate::registry::{AttributeDescriptor, Injection};
use crate::value::Value;

pub(super) fn description() -> AttributeDescriptor {
    AttributeDescriptor::new("description", path("//project"), |description| {
        Ok(Element::leaf("description", description).into())
    })
    .description("This is the description of your job.")
    .display_name("Description")
    .announced(false)
    .before(|document, _| {
        document.remove(&path("//project/description"));
        Ok(())
    })
}

pub(super) fn scm_params() -> AttributeDescriptor {
    AttributeDescriptor::new("scm_params", path("//scm"), |params| {
        let remote = ["remote_name", "refspec", "url"]
            .iter()
            .any(|key| params.param(key).is_some());

        let remote_config = Element::new("userRemoteConfigs").child(
            Element::new("hudson.plugins.git.UserRemoteConfig")
                .child_if(params.param("remote_name"), |v| Element::leaf("name", v))
                .child_if(params.param("refspec"), |v| Element::leaf("refspec", v))
                .child_if(params.param("url"), |v| Element::leaf("url", v)),
        );

        let elements = [
            ("local_branch", "localBranch"),
            ("recursive_update", "recursiveSubmodules"),
            ("wipe_workspace", "wipeOutWorkspace"),
            ("excluded_users", "excludedUsers"),
        ]
        .into_iter()
        .filter_map(|(key, tag)| params.param(key).map(|v| Element::leaf(tag, v)))
        .chain(remote.then_some(remote_config))
        .chain(
            [
                ("skip_tag", "skipTag"),
                ("excluded_regions", "excludedRegions"),
                ("included_regions", "includedRegions"),
            ]
            .into_iter()
            .filter_map(|(key, tag)| params.param(key).map(|v| Element::leaf(tag, v))),
        )
        .collect();

        Ok(Injection::Elements(elements))
    })
    .capability("git")
    .description(
        "NOTE: This only supports git currently. This plugin allows use of Git as a build SCM.",
    )
    .display_name("Git (inside 'Source Code Management')")
    .announced(false)
    .before(|document, params| {
        remove_if_set(document, params, "local_branch", "//scm/localBranch");
        remove_if_set(document, params, "recursive_update", "//scm/recursiveSubmodules");
        remove_if_set(document, params, "wipe_workspace", "//scm/wipeOutWorkspace");
        remove_if_set(document, params, "excluded_users", "//scm/excludedUsers");
        for key in ["remote_name", "refspec", "url"] {
            remove_if_set(document, params, key, "//scm/userRemoteConfigs");
        }
        remove_if_set(document, params, "skip_tag", "//scm/skipTag");
        remove_if_set(document, params, "excluded_regions", "//scm/excludedRegions");
        remove_if_set(document, params, "included_regions", "//scm/includedRegions");
        Ok(())
    })
}

const HIPCHAT_PROPERTY: &str = "jenkins.plugins.hipchat.HipChatNotifier_-HipChatJobProperty";

pub(super) fn hipchat() -> AttributeDescriptor {
    AttributeDescriptor::new("hipchat", path("//properties"), |params| {
        let room = params
            .param("room")
            .ok_or_else(|| Error::missing_parameter("hipchat", "room"))?;

        Ok(Element::new(HIPCHAT_PROPERTY)
            .child(Element::leaf("room", room))
            .child(Element::leaf(
                "startNotification",
                text_or(params, "start-notify", "false"),
            ))
            .into())
    })
    .capability("hipchat")
    .description(
        "This plugin allows your team to setup build notifications to be sent to HipChat rooms.",
    )
    .display_name("HipChat Notifications")
    .announced(false)
    .before(|document, _| {
        document.remove(&path(&format!("//properties/{HIPCHAT_PROPERTY}")));
        Ok(())
    })
}

pub(super) fn priority() -> AttributeDescriptor {
    AttributeDescriptor::new("priority", path("//properties"), |params| {
        Ok(
            Element::new("jenkins.advancedqueue.AdvancedQueueSorterJobProperty")
                .attr("plugin", "PrioritySorter")
                .child(Element::leaf(
                    "useJobPriority",
                    text_or(params, "use_priority", "false"),
                ))
                .child(Element::leaf(
                    "priority",
                    text_or(params, "job_priority", "-1"),
                ))
                .into(),
        )
    })
    .capability("PrioritySorter")
    .description(
        "This plugin adds the ability to assign different priorities to Jobs, the lower priority \
         the job has the sooner the Job will run.",
    )
    .display_name("Use specific priority for this Job")
    .announced(false)
    .before(|document, _| {
        document.remove(&path(
            "//properties/jenkins.advancedqueue.AdvancedQueueSorterJobProperty",
        ));
        Ok(())
    })
}

pub(super) fn discard_old() -> AttributeDescriptor {
    AttributeDescriptor::new("discard_old", path("//project"), |params| {
        Ok(Element::new("logRotator")
            .attr("class", "hudson.tasks.LogRotator")
            .child_if(params.param("days"), |v| Element::leaf("daysToKeep", v))
            .child(Element::leaf("numToKeep", text_or(params, "number", "-1")))
            .child(Element::leaf(
                "artifactDaysToKeep",
                text_or(params, "artifact_days", "-1"),
            ))
            .child(Element::leaf(
                "artifactNumToKeep",
                text_or(params, "artifact_number", "-1"),
            ))
            .into())
    })
    .description("Allows you to discard old builds.")
    .display_name("Discard Old Builds")
    .announced(false)
    .before(|document, _| {
        document.remove(&path("//project/logRotator"));
        Ok(())
    })
}

pub(super) fn throttle() -> AttributeDescriptor {
    AttributeDescriptor::new("throttle", path("//properties"), |params| {
        let option = text_or(params, "option", "alone");
        let category = params
            .param("category")
            .filter(|_| option == "category");

        Ok(
            Element::new("hudson.plugins.throttleconcurrents.ThrottleJobProperty")
                .attr("plugin", "throttle-concurrents")
                .child(Element::leaf(
                    "maxConcurrentPerNode",
                    text_or(params, "max_per_node", "0"),
                ))
                .child(Element::leaf(
                    "maxConcurrentTotal",
                    text_or(params, "max_total", "0"),
                ))
                .child(Element::leaf("throttleEnabled", true))
                .child(Element::leaf("throttleOption", option))
                .child(
                    Element::new("categories")
                        .child_if(category, |v| Element::leaf("string", v)),
                )
                .into(),
        )
    })
    .capability("throttle-concurrents")
    .description(
        "This plugin allows for throttling the number of concurrent builds of a project running \
         per node or globally.",
    )
    .display_name("Throttle Concurrent Builds")
    .announced(false)
    .before(|document, _| {
        document.remove(&path(
            "//properties/hudson.plugins.throttleconcurrents.ThrottleJobProperty",
        ));
        Ok(())
    })
}

pub(super) fn prepare_environment() -> AttributeDescriptor {
    AttributeDescriptor::new("prepare_environment", path("//properties"), |params| {
        Ok(Element::new("EnvInjectJobProperty")
            .child(
                Element::new("info")
                    .child_if(params.param("properties_content"), |v| {
                        Element::leaf("propertiesContent", v)
                    })
                    .child_if(params.param("load_from_master"), |v| {
                        Element::leaf("loadFilesFromMaster", v)
                    }),
            )
            .child(Element::leaf("on", true))
            .child_if(params.param("keep_environment"), |v| {
                Element::leaf("keepJenkinsSystemVariables", v)
            })
            .child_if(params.param("keep_build"), |v| {
                Element::leaf("keepBuildVariables", v)
            })
            .into())
    })
    .capability("envinject")
    .description("This plugin makes it possible to have an isolated environment for your jobs.")
    .display_name("Prepare an environment for the run")
    .announced(false)
    .before(|document, _| {
        document.remove(&path("//properties/EnvInjectJobProperty"));
        Ok(())
    })
}

pub(super) fn concurrent_build() -> AttributeDescriptor {
    AttributeDescriptor::new("concurrent_build", path("//concurrentBuild"), |params| {
        let enabled = matches!(params, Value::Boolean(true));
        Ok(Injection::Text(enabled.to_string()))
    })
    .description("Allows toggling of concurrent builds.")
    .display_name("Execute concurrent builds if necessary")
    .announced(false)
}

#[cfg(test)]
mod test {
    use crate::document::{Document, Element};
    use crate::error::Error;
    use crate::registry::AttributeRegistry;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn skeleton() -> Document {
        Document::new(
            Element::new("project")
                .child(Element::new("description"))
                .child(Element::new("properties"))
                .child(Element::new("scm").attr("class", "hudson.scm.NullSCM"))
                .child(Element::leaf("concurrentBuild", false)),
        )
    }

    fn yaml(source: &str) -> Value {
        Value::from_yaml(serde_yaml::from_str(source).unwrap()).unwrap()
    }

    fn apply(attribute: &str, params: &str) -> Result<Document, Error> {
        let registry = AttributeRegistry::with_builtin();
        let mut document = skeleton();
        registry
            .lookup(attribute)?
            .apply(&mut document, &yaml(params))?;
        Ok(document)
    }

    fn properties(document: &Document) -> String {
        let mut out = String::new();
        for child in &document.find(&"//properties".parse().unwrap()).unwrap().children {
            out.push_str(&Document::new(child.clone()).to_xml());
        }
        out.replace("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n", "")
    }

    #[test]
    fn description_replaces_default() {
        let document = apply("description", "'Builds {x}'").unwrap();
        let descriptions: Vec<_> = document
            .root()
            .children
            .iter()
            .filter(|child| child.tag == "description")
            .collect();
        assert_eq!(descriptions.len(), 1);
        assert_eq!(descriptions[0].text.as_deref(), Some("Builds {x}"));
    }

    #[test]
    fn scm_params_only_touches_given_fields() {
        let registry = AttributeRegistry::with_builtin();
        let scm_params = registry.lookup("scm_params").unwrap();
        let mut document = skeleton();

        scm_params
            .apply(&mut document, &yaml("{local_branch: main, skip_tag: true}"))
            .unwrap();
        scm_params
            .apply(&mut document, &yaml("{local_branch: dev, refspec: 'refs/pull/*'}"))
            .unwrap();

        let scm = document.find(&"//scm".parse().unwrap()).unwrap();
        let tags: Vec<_> = scm.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, ["skipTag", "localBranch", "userRemoteConfigs"]);
        assert_eq!(scm.first_child("localBranch").unwrap().text.as_deref(), Some("dev"));
        assert_eq!(
            document
                .find(&"//userRemoteConfigs/hudson.plugins.git.UserRemoteConfig/refspec".parse().unwrap())
                .unwrap()
                .text
                .as_deref(),
            Some("refs/pull/*")
        );
    }

    #[test]
    fn empty_string_is_still_injected() {
        let document = apply("scm_params", "{local_branch: '', skip_tag: false}").unwrap();

        let scm = document.find(&"//scm".parse().unwrap()).unwrap();
        let tags: Vec<_> = scm.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, ["localBranch"]);
        assert_eq!(scm.first_child("localBranch").unwrap().text.as_deref(), Some(""));
    }

    #[test]
    fn hipchat_requires_room() {
        let err = apply("hipchat", "{start-notify: true}").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingParameter { attribute, parameter } if attribute == "hipchat" && parameter == "room"
        ));

        let document = apply("hipchat", "{room: builds}").unwrap();
        assert_eq!(
            properties(&document),
            "<jenkins.plugins.hipchat.HipChatNotifier_-HipChatJobProperty>\n  <room>builds</room>\n  <startNotification>false</startNotification>\n</jenkins.plugins.hipchat.HipChatNotifier_-HipChatJobProperty>\n"
        );
    }

    #[test]
    fn discard_old_defaults() {
        let document = apply("discard_old", "{days: 5}").unwrap();
        let rotator = document.find(&"//logRotator".parse().unwrap()).unwrap();
        let values: Vec<_> = rotator
            .children
            .iter()
            .map(|c| format!("{}={}", c.tag, c.text.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(
            values,
            ["daysToKeep=5", "numToKeep=-1", "artifactDaysToKeep=-1", "artifactNumToKeep=-1"]
        );
    }

    #[test]
    fn throttle_category_only_with_category_option() {
        let alone = apply("throttle", "{category: c}").unwrap();
        assert!(properties(&alone).contains("<categories/>"));

        let category = apply("throttle", "{option: category, category: c, max_total: 2}").unwrap();
        let xml = properties(&category);
        assert!(xml.contains("<string>c</string>"));
        assert!(xml.contains("<maxConcurrentTotal>2</maxConcurrentTotal>"));
        assert!(xml.contains("<throttleOption>category</throttleOption>"));
    }

    #[test]
    fn prepare_environment_conditional_fields() {
        let document = apply("prepare_environment", "{properties_content: 'A=1', keep_build: true}").unwrap();
        assert_eq!(
            properties(&document),
            "<EnvInjectJobProperty>\n  <info>\n    <propertiesContent>A=1</propertiesContent>\n  </info>\n  <on>true</on>\n  <keepBuildVariables>true</keepBuildVariables>\n</EnvInjectJobProperty>\n"
        );
    }

    #[test]
    fn priority_replaces_itself() {
        let registry = AttributeRegistry::with_builtin();
        let priority = registry.lookup("priority").unwrap();
        let mut document = skeleton();
        priority.apply(&mut document, &yaml("{job_priority: 1}")).unwrap();
        priority.apply(&mut document, &yaml("{job_priority: 2, use_priority: true}")).unwrap();

        assert_eq!(
            properties(&document),
            "<jenkins.advancedqueue.AdvancedQueueSorterJobProperty plugin=\"PrioritySorter\">\n  <useJobPriority>true</useJobPriority>\n  <priority>2</priority>\n</jenkins.advancedqueue.AdvancedQueueSorterJobProperty>\n"
        );
    }

    #[test]
    fn concurrent_build_sets_text() {
        let on = apply("concurrent_build", "true").unwrap();
        assert_eq!(
            on.find(&"//concurrentBuild".parse().unwrap()).unwrap().text.as_deref(),
            Some("true")
        );
        let off = apply("concurrent_build", "'yes'").unwrap();
        assert_eq!(
            off.find(&"//concurrentBuild".parse().unwrap()).unwrap().text.as_deref(),
            Some("false")
        );
    }
}
