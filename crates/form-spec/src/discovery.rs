use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use thiserror::Error;
use tracing::debug;

use crate::definition::FormDefinition;
use crate::error::FormError;
use crate::form::Form;

/// Directory levels searched below each root.
pub const DEFAULT_DEPTH: usize = 2;
pub const DEFAULT_FILTER: &str = "*.form.json";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse form definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid discovery filter: {0}")]
    Pattern(#[from] globset::Error),
    #[error("form '{name}' is defined twice ({first} and {second})")]
    DuplicateForm {
        name: String,
        first: String,
        second: String,
    },
    #[error("unable to find form '{0}'")]
    FormNotFound(String),
    #[error(transparent)]
    Build(#[from] FormError),
}

/// Finds JSON form definitions below a set of directories.
#[derive(Debug, Clone, Copy)]
pub struct Discovery {
    depth: usize,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl Discovery {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Registers every file whose name matches `filter`, keyed by form name.
    pub fn discover<P: AsRef<Path>>(
        &self,
        directories: &[P],
        filter: &str,
    ) -> Result<FormRegistry, DiscoveryError> {
        let matcher = Glob::new(filter)?.compile_matcher();
        let mut files = Vec::new();
        for directory in directories {
            self.search_files(directory.as_ref(), 0, &matcher, &mut files)?;
        }

        let mut registry = FormRegistry::new();
        for path in files {
            let contents = fs::read_to_string(&path).map_err(|source| DiscoveryError::Io {
                path: path.clone(),
                source,
            })?;
            let definition = FormDefinition::from_json(&contents).map_err(|source| {
                DiscoveryError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
            debug!(form = %definition.name, path = %path.display(), "discovered form");
            registry.register(definition, Some(path))?;
        }
        Ok(registry)
    }

    fn search_files(
        &self,
        directory: &Path,
        level: usize,
        matcher: &GlobMatcher,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), DiscoveryError> {
        let entries = fs::read_dir(directory).map_err(|source| DiscoveryError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
        let mut paths = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                if level < self.depth {
                    self.search_files(&path, level + 1, matcher, files)?;
                }
            } else if path
                .file_name()
                .is_some_and(|name| matcher.is_match(Path::new(name)))
            {
                files.push(path);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct RegisteredForm {
    definition: FormDefinition,
    source: Option<PathBuf>,
}

/// Form definitions by name, built into fresh forms on request.
#[derive(Debug, Clone, Default)]
pub struct FormRegistry {
    forms: BTreeMap<String, RegisteredForm>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition; `source` is reported when a name is registered twice.
    pub fn register(
        &mut self,
        definition: FormDefinition,
        source: Option<PathBuf>,
    ) -> Result<(), DiscoveryError> {
        if let Some(existing) = self.forms.get(&definition.name) {
            return Err(DiscoveryError::DuplicateForm {
                name: definition.name.clone(),
                first: describe_source(existing.source.as_deref()),
                second: describe_source(source.as_deref()),
            });
        }
        self.forms.insert(
            definition.name.clone(),
            RegisteredForm { definition, source },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&FormDefinition, DiscoveryError> {
        self.forms
            .get(name)
            .map(|registered| &registered.definition)
            .ok_or_else(|| DiscoveryError::FormNotFound(name.to_string()))
    }

    pub fn source(&self, name: &str) -> Option<&Path> {
        self.forms
            .get(name)
            .and_then(|registered| registered.source.as_deref())
    }

    pub fn build(&self, name: &str) -> Result<Form, DiscoveryError> {
        Ok(self.get(name)?.build()?)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormDefinition> {
        self.forms.values().map(|registered| &registered.definition)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn describe_source(source: Option<&Path>) -> String {
    source
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<registered>".to_string())
}
