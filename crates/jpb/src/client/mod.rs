//! CI server access
//!
//! Everything that talks to a server goes through [JobServer], so a run can publish to the
//! real thing ([JenkinsClient]), to a directory ([LocalServer]) or to memory ([MemoryServer]).
mod jenkins;
mod local;
mod memory;

pub use jenkins::JenkinsClient;
pub use local::{config_file, LocalServer};
pub use memory::MemoryServer;

use indexmap::IndexMap;

/// Installed plugin short name -> version
pub type Plugins = IndexMap<String, String>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid server url `{0}`")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{0}` does not exist")]
    Missing(String),
    #[error("server rejected `{0}`")]
    Rejected(String),
}

pub trait JobServer {
    /// Installed plugins, `None` when the server does not tell
    fn list_installed_plugins(&self) -> Result<Option<Plugins>, ClientError>;

    fn list_jobs(&self) -> Result<Vec<String>, ClientError>;

    /// Config document of a job, `None` if there is no such job
    fn get_job_config(&self, name: &str) -> Result<Option<String>, ClientError>;

    fn create_job(&self, name: &str, config: &str) -> Result<(), ClientError>;

    fn update_job(&self, name: &str, config: &str) -> Result<(), ClientError>;

    fn delete_job(&self, name: &str) -> Result<(), ClientError>;

    fn list_views(&self) -> Result<Vec<String>, ClientError>;

    fn create_view(&self, name: &str, config: &str) -> Result<(), ClientError>;

    fn update_view(&self, name: &str, config: &str) -> Result<(), ClientError>;
}
