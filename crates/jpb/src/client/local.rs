use super::{ClientError, JobServer, Plugins};
use std::path::{Path, PathBuf};

/// Writes every published document to `<dir>/<name>.xml` (views under `<dir>/views`)
///
/// Used to inspect what a run would publish without touching a server.
#[derive(Debug, Clone)]
pub struct LocalServer {
    dir: PathBuf,
}

impl LocalServer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn views(&self) -> PathBuf {
        self.dir.join("views")
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ClientError + '_ {
    move |source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `<dir>/<name>.xml`, folder-style names (`team/job`) become `team_job.xml`
///
/// Separators never reach the file name, so the file always lands directly in `dir`.
pub fn config_file(dir: &Path, name: &str) -> PathBuf {
    let name: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{name}.xml"))
}

fn list(dir: &Path) -> Result<Vec<String>, ClientError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let mut names = vec![];
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("xml") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn write(dir: &Path, name: &str, config: &str) -> Result<(), ClientError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    let path = config_file(dir, name);
    tracing::info!(path = %path.display(), "write");
    std::fs::write(&path, config).map_err(io_error(&path))
}

impl JobServer for LocalServer {
    fn list_installed_plugins(&self) -> Result<Option<Plugins>, ClientError> {
        Ok(None)
    }

    fn list_jobs(&self) -> Result<Vec<String>, ClientError> {
        list(&self.dir)
    }

    fn get_job_config(&self, name: &str) -> Result<Option<String>, ClientError> {
        let path = config_file(&self.dir, name);
        match std::fs::read_to_string(&path) {
            Ok(config) => Ok(Some(config)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn create_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        write(&self.dir, name, config)
    }

    fn update_job(&self, name: &str, config: &str) -> Result<(), ClientError> {
        write(&self.dir, name, config)
    }

    fn delete_job(&self, name: &str) -> Result<(), ClientError> {
        let path = config_file(&self.dir, name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ClientError::Missing(name.to_string()))
            }
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn list_views(&self) -> Result<Vec<String>, ClientError> {
        list(&self.views())
    }

    fn create_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        write(&self.views(), name, config)
    }

    fn update_view(&self, name: &str, config: &str) -> Result<(), ClientError> {
        write(&self.views(), name, config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn jobs_are_files() {
        let dir = tempfile::tempdir().unwrap();
        let server = LocalServer::new(dir.path());

        assert_eq!(server.list_jobs().unwrap(), Vec::<String>::new());
        server.create_job("b", "<project/>").unwrap();
        server.create_job("a", "<project/>").unwrap();
        server.create_view("v", "<hudson.model.ListView/>").unwrap();

        assert_eq!(server.list_jobs().unwrap(), ["a", "b"]);
        assert_eq!(server.list_views().unwrap(), ["v"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.xml")).unwrap(),
            "<project/>"
        );

        server.update_job("a", "<project>x</project>").unwrap();
        assert_eq!(
            server.get_job_config("a").unwrap().as_deref(),
            Some("<project>x</project>")
        );

        server.delete_job("a").unwrap();
        assert_eq!(server.get_job_config("a").unwrap(), None);
        assert!(matches!(server.delete_job("a"), Err(ClientError::Missing(_))));
    }

    #[test]
    fn folder_names_stay_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let server = LocalServer::new(dir.path().join("out"));

        server.create_job("team/job", "<project/>").unwrap();
        server.create_job("../escape", "<project/>").unwrap();

        assert!(dir.path().join("out/team_job.xml").is_file());
        assert!(dir.path().join("out/.._escape.xml").is_file());
        assert!(!dir.path().join("escape.xml").exists());
        assert_eq!(
            server.get_job_config("team/job").unwrap().as_deref(),
            Some("<project/>")
        );
    }
}
