use super::{ClientError, JobServer, Plugins};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Client of the Jenkins remote access API
pub struct JenkinsClient {
    base: Url,
    username: String,
    password: String,
    http: Client,
}

#[derive(Deserialize)]
struct PluginList {
    #[serde(default)]
    plugins: Vec<Plugin>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Plugin {
    short_name: String,
    version: String,
}

#[derive(Deserialize)]
struct ItemList {
    #[serde(default)]
    jobs: Vec<Named>,
    #[serde(default)]
    views: Vec<Named>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

impl JenkinsClient {
    pub fn new(
        server_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = Url::parse(server_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(server_url.to_string()))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base,
            username: username.into(),
            password: password.into(),
            http,
        })
    }

    /// Server url extended by `segments`, each one escaped on its own
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> Result<Response, ClientError> {
        tracing::debug!(%url, "GET");
        Ok(self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()?)
    }

    fn post_xml(&self, url: Url, config: &str) -> Result<(), ClientError> {
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(config.to_string())
            .send()?;
        check(response)?;
        Ok(())
    }

    fn items(&self, tree: &str) -> Result<ItemList, ClientError> {
        let mut url = self.url(&["api", "json"]);
        url.query_pairs_mut().append_pair("tree", tree);
        Ok(check(self.get(url)?)?.json()?)
    }
}

fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().unwrap_or_default();
    Err(ClientError::Status {
        url,
        status: status.as_u16(),
        body,
    })
}

impl JobServer for JenkinsClient {
    fn list_installed_plugins(&self) -> Result<Option<Plugins>, ClientError> {
        let mut url = self.url(&["pluginManager", "api", "json"]);
        url.query_pairs_mut().append_pair("depth", "1");

        let response = self.get(url)?;
        if matches!(response.status(), StatusCode::FORBIDDEN | StatusCode::NOT_FOUND) {
            tracing::debug!(status = %response.status(), "plugin list not available");
            return Ok(None);
        }

        let list: PluginList = check(response)?.json()?;
        Ok(Some(
            list.plugins
                .into_iter()
                .map(|plugin| (plugin.short_name, plugin.version))
                .collect(),
        ))
    }

    fn list_jobs(&self) -> Result<Vec<String>, ClientError> {
        let items = self.items("jobs[name]")?;
        Ok(items.jobs.into_iter().map(|job| job.name).collect())
    }

    fn get_job_config(&self, name: &str) -> Result<Option<String>, ClientError> {
        let response = self.get(self.url(&["job", name, "config.xml"]))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response)?.text()?))
    }

    fn create_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        let mut url = self.url(&["createItem"]);
        url.query_pairs_mut().append_pair("name", name);
        self.post_xml(url, config)
    }

    fn update_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        self.post_xml(self.url(&["job", name, "config.xml"]), config)
    }

    fn delete_job(&self, name: &str) -> Result<(), ClientError> {
        let url = self.url(&["job", name, "doDelete"]);
        tracing::debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        check(response)?;
        Ok(())
    }

    fn list_views(&self) -> Result<Vec<String>, ClientError> {
        let items = self.items("views[name]")?;
        Ok(items.views.into_iter().map(|view| view.name).collect())
    }

    fn create_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        let mut url = self.url(&["createView"]);
        url.query_pairs_mut().append_pair("name", name);
        self.post_xml(url, config)
    }

    fn update_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        self.post_xml(self.url(&["view", name, "config.xml"]), config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn client(url: &str) -> JenkinsClient {
        JenkinsClient::new(url, "user", "secret", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn urls_escape_names() {
        let client = client("https://ci.example.com/jenkins/");
        assert_eq!(
            client.url(&["job", "P View/1", "config.xml"]).as_str(),
            "https://ci.example.com/jenkins/job/P%20View%2F1/config.xml"
        );
        assert_eq!(
            client.url(&["api", "json"]).as_str(),
            "https://ci.example.com/jenkins/api/json"
        );
    }

    #[test]
    fn rejects_invalid_urls() {
        for url in ["not a url", "mailto:ci@example.com"] {
            assert!(matches!(
                JenkinsClient::new(url, "u", "p", Duration::from_secs(1)),
                Err(ClientError::InvalidUrl(_))
            ));
        }
    }

    #[test]
    fn parses_plugin_list() {
        let list: PluginList = serde_json::from_str(
            r#"{"plugins": [{"shortName": "git", "version": "4.0", "active": true}]}"#,
        )
        .unwrap();
        assert_eq!(list.plugins[0].short_name, "git");
        assert_eq!(list.plugins[0].version, "4.0");

        let items: ItemList = serde_json::from_str(r#"{"jobs": [{"name": "a"}]}"#).unwrap();
        assert_eq!(items.jobs[0].name, "a");
        assert!(items.views.is_empty());
    }
}
