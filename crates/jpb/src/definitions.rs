//! collection of loaded definitions and the path to their source file
//!
//! [Definitions] tracks
//! - the source path
//! - every [JobDefinition] of every loaded document
//! and defines a numeric index for each. Once added those indices are stable (removal is not possible)
use crate::definition::{JobDefinition, Kind};
use crate::value::Value;
use std::path::Path;

#[derive(Default, Debug)]
pub struct Definitions {
    sources: Vec<Source>,
    definitions: Vec<(usize, JobDefinition)>,
}

impl Definitions {
    /// Inserts and indexes the definitions of one document
    pub fn insert(
        &mut self,
        document: Vec<JobDefinition>,
        path: impl Into<Option<std::path::PathBuf>>,
    ) {
        let source_index = self.sources.len();
        self.sources.push(path.into());

        for definition in document {
            self.definitions.push((source_index, definition));
        }
    }

    pub fn get(&self, index: usize) -> SourceDefinition {
        let (source_index, definition) = &self.definitions[index];
        (index, &self.sources[*source_index], definition)
    }

    pub fn iter(&self) -> impl Iterator<Item = SourceDefinition> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(index, (source_index, definition))| {
                (index, &self.sources[*source_index], definition)
            })
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &JobDefinition> {
        self.definitions
            .iter()
            .map(|(_, definition)| definition)
            .filter(move |definition| definition.kind == kind)
    }

    /// First definition of `kind` with the (unsubstituted) `name`
    pub fn find(&self, kind: Kind, name: &str) -> Option<&JobDefinition> {
        self.of_kind(kind).find(|definition| definition.name == name)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Definitions {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path)?;
        let document = match Format::of(&file_path) {
            Some(Format::Json) => parse_json(&file_contents)?,
            Some(Format::Yaml) | None => parse_yaml(&file_contents)?,
        };

        self.insert(document, Some(file_path));
        Ok(())
    }

    /// Load every yaml/json file of a directory, in file name order
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut file_paths = vec![];

        let read_dir = std::fs::read_dir(dir_path)?;
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let file_path = dir_entry.path();
            if Format::of(&file_path).is_none() {
                continue;
            }

            file_paths.push(file_path);
        }

        if file_paths.is_empty() {
            return Err(LoadError::NoFilesFound);
        }

        file_paths.sort();
        for file_path in file_paths {
            self.load_file(&file_path)?;
        }

        Ok(())
    }

    /// Load a file or all files of a directory
    pub fn load_path(&mut self, path: &Path) -> Result<(), LoadError> {
        if path.is_dir() {
            self.load_directory(path)
        } else {
            self.load_file(path)
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let mut definitions = Definitions::default();
        definitions.load_path(path)?;
        Ok(definitions)
    }
}

enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Format> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

pub fn parse_yaml(source: &str) -> Result<Vec<JobDefinition>, LoadError> {
    let document: serde_yaml::Value = serde_yaml::from_str(source)?;
    parse_document(Value::from_yaml(document))
}

pub fn parse_json(source: &str) -> Result<Vec<JobDefinition>, LoadError> {
    let document: serde_json::Value = serde_json::from_str(source)?;
    parse_document(Value::from_json(document))
}

/// Turn a list of single-key entries into definitions
fn parse_document(document: Option<Value>) -> Result<Vec<JobDefinition>, LoadError> {
    let entries = match document {
        None => return Ok(vec![]),
        Some(Value::Array(entries)) => entries,
        Some(entry @ Value::Object(_)) => vec![entry],
        Some(_) => return Err(LoadError::NotAList),
    };

    let mut definitions = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let Value::Object(entry) = entry else {
            return Err(LoadError::MalformedEntry(position));
        };
        if entry.len() != 1 {
            return Err(LoadError::MalformedEntry(position));
        }

        let Some((key, body)) = entry.into_iter().next() else {
            return Err(LoadError::MalformedEntry(position));
        };
        let kind = Kind::from_entry_key(&key).ok_or(LoadError::UnknownEntry(key))?;
        let Value::Object(body) = body else {
            return Err(LoadError::MalformedEntry(position));
        };

        definitions.push(JobDefinition::from_body(kind, body)?);
    }

    Ok(definitions)
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse yaml file")]
    YamlParseFailed(#[from] serde_yaml::Error),
    #[error("Unable to parse json file")]
    JsonParseFailed(#[from] serde_json::Error),
    #[error("Document must be a list of entries")]
    NotAList,
    #[error("Entry #{0} must be a map with a single key")]
    MalformedEntry(usize),
    #[error("Unknown entry type `{0}`")]
    UnknownEntry(String),
    #[error("Invalid definition")]
    InvalidDefinition(#[from] crate::error::Error),
}

impl From<Vec<JobDefinition>> for Definitions {
    fn from(value: Vec<JobDefinition>) -> Self {
        let mut definitions = Definitions::default();
        definitions.insert(value, None);
        definitions
    }
}

/// Utility macro to create [Definitions] from yaml
///
/// Create from a single document
/// ```
/// # use jpb::definitions;
/// definitions!("- job: { name: a }");
/// ```
///
/// Create from multiple documents (path required)
/// ```
/// # use jpb::definitions;
/// definitions! {
///   "one.yaml" => "- job: { name: a }",
///   "two.yaml" => "- job: { name: b }"
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use jpb::definitions;
/// definitions!("- unknown: { name: a }");
/// ```
#[macro_export]
macro_rules! definitions {
    // single document without source
    { $expr:expr } => {
        $crate::definitions::Definitions::from($crate::definitions::parse_yaml($expr).expect("definitions must parse"))
    };
    // multi document with sources
    { $($source:expr => $expr:expr),+ } => {{
        let mut docs = $crate::definitions::Definitions::default();
        $(
            docs.insert($crate::definitions::parse_yaml($expr).expect("definitions must parse"), Some(::std::path::PathBuf::from($source)));
        )+

        docs
    }};
}

pub type Source = Option<std::path::PathBuf>;
pub type SourceDefinition<'a> = (usize, &'a Source, &'a JobDefinition);
