//! Block definition registry for blockflow.
//!
//! The registry loads block description files (TOML, one block per
//! `*.block.toml` file), checks their structural invariants, and indexes the
//! resulting [`BlockDefinition`]s by id. It is built once at startup and then
//! shared read-only, usually behind an `Arc`, with every graph that needs it.
//!
//! # Example
//!
//! ```rust
//! use blockflow_registry::DefinitionRegistry;
//!
//! let mut registry = DefinitionRegistry::new();
//! registry
//!     .load_str(
//!         "sink.block.toml",
//!         r#"
//!         id = "sink"
//!         [[inputs]]
//!         label = "in"
//!         dtype = "float"
//!         [templates]
//!         ref = "sink()"
//!         "#,
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.all_ids(), vec!["sink"]);
//! assert!(registry.get("source").is_err());
//! ```

mod error;
mod file;
pub mod paths;
mod tree;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use blockflow_core::{BlockDefinition, CustomValidator, TemplateRenderer};

pub use error::{DefinitionError, DefinitionErrorKind, UnknownBlockError};
pub use tree::CategoryTree;

/// Source name recorded for definitions registered in code.
const PROGRAMMATIC_SOURCE: &str = "<registered>";

#[derive(Debug, Clone)]
struct Entry {
    definition: Arc<BlockDefinition>,
    source: PathBuf,
}

/// Outcome of loading a directory or search path.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids of definitions loaded, in load order.
    pub loaded: Vec<String>,
    /// Category tree files merged.
    pub trees: Vec<PathBuf>,
    /// Files that failed, one error each.
    pub errors: Vec<DefinitionError>,
}

impl LoadReport {
    fn absorb(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.trees.extend(other.trees);
        self.errors.extend(other.errors);
    }
}

/// Index of block definitions by id.
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    entries: BTreeMap<String, Entry>,
    by_source: HashMap<PathBuf, String>,
    tree: CategoryTree,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads one description file.
    ///
    /// Re-loading a path replaces the definition it produced before. A block
    /// id already registered from a different file is an error.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<BlockDefinition>, DefinitionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DefinitionError::new(path, DefinitionErrorKind::Read(e)))?;
        self.load_str(path, &text)
    }

    /// Loads a description from memory. `source` names it in errors and
    /// plays the role of the path for replacement.
    pub fn load_str(
        &mut self,
        source: impl AsRef<Path>,
        text: &str,
    ) -> Result<Arc<BlockDefinition>, DefinitionError> {
        let source = source.as_ref();
        let parsed: file::BlockFile = toml::from_str(text).map_err(|e| {
            let err = DefinitionError::new(
                source,
                DefinitionErrorKind::Syntax {
                    message: e.message().to_string(),
                },
            );
            match e.span() {
                Some(span) => err.at(error::line_col(text, span.start)),
                None => err,
            }
        })?;
        self.insert(source, parsed.into_definition())
    }

    /// Registers a definition built in code.
    pub fn register(&mut self, definition: BlockDefinition) -> Result<Arc<BlockDefinition>, DefinitionError> {
        let source = PathBuf::from(format!("{PROGRAMMATIC_SOURCE}/{}", definition.id));
        self.insert(&source, definition)
    }

    fn insert(
        &mut self,
        source: &Path,
        definition: BlockDefinition,
    ) -> Result<Arc<BlockDefinition>, DefinitionError> {
        file::check_definition(&definition)
            .map_err(|(location, kind)| DefinitionError::new(source, kind).at(location))?;

        if let Some(existing) = self.entries.get(&definition.id)
            && existing.source != source
        {
            return Err(DefinitionError::new(
                source,
                DefinitionErrorKind::DuplicateBlockId {
                    id: definition.id.clone(),
                    existing: existing.source.clone(),
                },
            ));
        }

        if let Some(previous) = self.by_source.remove(source) {
            self.entries.remove(&previous);
        }

        let definition = Arc::new(definition);
        tracing::debug!(
            id = %definition.id,
            source = %source.display(),
            "registry_insert"
        );
        self.by_source
            .insert(source.to_path_buf(), definition.id.clone());
        self.entries.insert(
            definition.id.clone(),
            Entry {
                definition: Arc::clone(&definition),
                source: source.to_path_buf(),
            },
        );
        Ok(definition)
    }

    /// Loads a category tree file.
    pub fn load_tree(&mut self, path: impl AsRef<Path>) -> Result<(), DefinitionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DefinitionError::new(path, DefinitionErrorKind::Read(e)))?;
        let table: toml::Table = toml::from_str(&text).map_err(|e| {
            DefinitionError::new(
                path,
                DefinitionErrorKind::Syntax {
                    message: e.message().to_string(),
                },
            )
        })?;
        self.tree.merge_table(&table);
        Ok(())
    }

    /// Loads every description and tree file under `dir`, recursively and in
    /// sorted order. A bad file is recorded in the report and skipped.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> LoadReport {
        let dir = dir.as_ref();
        let mut report = LoadReport::default();
        for path in paths::collect_block_files(dir) {
            let result = if paths::is_tree_file(&path) {
                self.load_tree(&path).map(|()| report.trees.push(path.clone()))
            } else {
                self.load(&path).map(|def| report.loaded.push(def.id.clone()))
            };
            if let Err(err) = result {
                tracing::warn!(error = %err, "skipping definition file");
                report.errors.push(err);
            }
        }
        tracing::info!(
            dir = %dir.display(),
            loaded = report.loaded.len(),
            errors = report.errors.len(),
            "loaded block definitions"
        );
        report
    }

    /// Loads each directory of a search path in order. Missing directories
    /// are skipped.
    pub fn load_search_path<P: AsRef<Path>>(&mut self, dirs: &[P]) -> LoadReport {
        let mut report = LoadReport::default();
        for dir in dirs {
            let dir = dir.as_ref();
            if dir.is_dir() {
                report.absorb(self.load_dir(dir));
            } else {
                tracing::debug!(dir = %dir.display(), "search path entry missing");
            }
        }
        report
    }

    /// Looks up a definition.
    pub fn get(&self, id: &str) -> Result<Arc<BlockDefinition>, UnknownBlockError> {
        self.entries
            .get(id)
            .map(|e| Arc::clone(&e.definition))
            .ok_or_else(|| UnknownBlockError { id: id.to_string() })
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered ids, alphabetically.
    pub fn all_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where a definition was loaded from.
    pub fn source(&self, id: &str) -> Option<&Path> {
        self.entries.get(id).map(|e| e.source.as_path())
    }

    /// Attaches a custom validator to a registered definition.
    pub fn set_validator(
        &mut self,
        id: &str,
        validator: Arc<dyn CustomValidator>,
    ) -> Result<(), UnknownBlockError> {
        let entry = self.entry_mut(id)?;
        Arc::make_mut(&mut entry.definition).validator = Some(validator);
        Ok(())
    }

    /// Attaches a custom renderer to a registered definition.
    pub fn set_renderer(
        &mut self,
        id: &str,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<(), UnknownBlockError> {
        let entry = self.entry_mut(id)?;
        Arc::make_mut(&mut entry.definition).renderer = Some(renderer);
        Ok(())
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Entry, UnknownBlockError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| UnknownBlockError { id: id.to_string() })
    }

    /// The category tree: tree files plus each definition's own category,
    /// restricted to registered blocks. Uncategorized blocks sit at the root.
    pub fn categories(&self) -> CategoryTree {
        let mut tree = self.tree.filtered(&|id| self.entries.contains_key(id));
        let listed: std::collections::HashSet<String> =
            tree.block_ids().into_iter().map(str::to_string).collect();
        for entry in self.entries.values() {
            let def = &entry.definition;
            if def.category.is_empty() && listed.contains(&def.id) {
                continue;
            }
            tree.insert(&def.category, &def.id);
        }
        tree
    }

    /// Renders a definition back to description-file TOML.
    pub fn to_toml(definition: &BlockDefinition) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&file::BlockFile::from_definition(definition))
    }
}
