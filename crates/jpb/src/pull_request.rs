//! open pull requests of a repository
//!
//! A project declaring `pull_request` is instantiated once per open pull request, see
//! [crate::generator::Generator::pull_request].
use crate::client::ClientError;
use crate::value::{Object, Value};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

pub const GITHUB_API: &str = "https://api.github.com";

pub trait PullRequestSource {
    /// Numbers of the open pull requests, ascending
    fn open_pull_requests(&self) -> Result<Vec<u64>, ClientError>;
}

/// A fixed list of pull request numbers
impl PullRequestSource for Vec<u64> {
    fn open_pull_requests(&self) -> Result<Vec<u64>, ClientError> {
        let mut numbers = self.clone();
        numbers.sort_unstable();
        numbers.dedup();
        Ok(numbers)
    }
}

/// Open pull requests of a GitHub repository via the REST API
pub struct GitHub {
    api: Url,
    repository: String,
    token: Option<String>,
    http: Client,
}

#[derive(Deserialize)]
struct PullRequest {
    number: u64,
}

impl GitHub {
    /// `repository` is `owner/name`
    pub fn new(
        repository: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Self::with_api(GITHUB_API, repository, token, timeout)
    }

    pub fn with_api(
        api: &str,
        repository: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let api = Url::parse(api)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(api.to_string()))?;

        let repository = repository.into();
        if repository.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(ClientError::InvalidUrl(repository));
        }

        Ok(Self {
            api,
            repository,
            token,
            http: Client::builder().timeout(timeout).build()?,
        })
    }

    fn pulls_url(&self, page: usize) -> Url {
        let mut url = self.api.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("repos")
                .extend(self.repository.split('/'))
                .push("pulls");
        }
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("per_page", "100")
            .append_pair("page", &page.to_string());
        url
    }
}

impl PullRequestSource for GitHub {
    #[tracing::instrument(level = "debug", skip_all, fields(repository = %self.repository))]
    fn open_pull_requests(&self) -> Result<Vec<u64>, ClientError> {
        let mut numbers = vec![];

        for page in 1.. {
            let url = self.pulls_url(page);
            let mut request = self
                .http
                .get(url.clone())
                .header(reqwest::header::USER_AGENT, env!("CARGO_PKG_NAME"))
                .header(reqwest::header::ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: response.text().unwrap_or_default(),
                });
            }

            let pulls: Vec<PullRequest> = response.json()?;
            let done = pulls.len() < 100;
            numbers.extend(pulls.into_iter().map(|pull| pull.number));
            if done {
                break;
            }
        }

        numbers.sort_unstable();
        tracing::debug!(?numbers, "open pull requests");
        Ok(numbers)
    }
}

/// Project name and extra variables of the instance for pull request `number`
pub fn instance(prefix: &str, number: u64) -> (String, Object) {
    let name = format!("{prefix}{number}");
    let vars = Object::from([
        ("name".to_string(), Value::from(name.as_str())),
        ("pr".to_string(), Value::from(number)),
        (
            "pr_branch".to_string(),
            Value::from(format!("origin/pr/{number}/head")),
        ),
    ]);
    (name, vars)
}
