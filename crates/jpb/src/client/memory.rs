use super::{ClientError, JobServer, Plugins};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    jobs: IndexMap<String, String>,
    views: IndexMap<String, String>,
    plugins: Option<Plugins>,
    /// Names every write of is rejected
    rejected: HashSet<String>,
}

/// Server kept in memory, clones share their state
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<State>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_job(self, name: impl Into<String>, config: impl Into<String>) -> Self {
        self.state().jobs.insert(name.into(), config.into());
        self
    }

    pub fn with_plugins(self, plugins: Plugins) -> Self {
        self.state().plugins = Some(plugins);
        self
    }

    /// Reject every create, update and delete of `name`
    pub fn reject(self, name: impl Into<String>) -> Self {
        self.state().rejected.insert(name.into());
        self
    }

    /// Snapshot of job name -> config
    pub fn jobs(&self) -> IndexMap<String, String> {
        self.state().jobs.clone()
    }

    pub fn job(&self, name: &str) -> Option<String> {
        self.state().jobs.get(name).cloned()
    }

    pub fn view(&self, name: &str) -> Option<String> {
        self.state().views.get(name).cloned()
    }

    fn write(&self, views: bool, name: &str, config: Option<&str>) -> Result<(), ClientError> {
        let mut state = self.state();
        if state.rejected.contains(name) {
            return Err(ClientError::Rejected(name.to_string()));
        }

        let items = if views { &mut state.views } else { &mut state.jobs };
        match config {
            Some(config) => {
                items.insert(name.to_string(), config.to_string());
            }
            None => {
                items
                    .shift_remove(name)
                    .ok_or_else(|| ClientError::Missing(name.to_string()))?;
            }
        }
        Ok(())
    }
}

impl JobServer for MemoryServer {
    fn list_installed_plugins(&self) -> Result<Option<Plugins>, ClientError> {
        Ok(self.state().plugins.clone())
    }

    fn list_jobs(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.state().jobs.keys().cloned().collect())
    }

    fn get_job_config(&self, name: &str) -> Result<Option<String>, ClientError> {
        Ok(self.job(name))
    }

    fn create_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        self.write(false, name, Some(config))
    }

    fn update_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        if self.job(name).is_none() {
            return Err(ClientError::Missing(name.to_string()));
        }
        self.write(false, name, Some(config))
    }

    fn delete_job(&self, name: &str) -> Result<(), ClientError> {
        self.write(false, name, None)
    }

    fn list_views(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.state().views.keys().cloned().collect())
    }

    fn create_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        self.write(true, name, Some(config))
    }

    fn update_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        self.write(true, name, Some(config))
    }
}
