//! Error types for definition loading and lookup.

use std::path::PathBuf;

use thiserror::Error;

/// A description file that could not be turned into a definition.
///
/// Fatal to the one definition being loaded, never to the registry.
#[derive(Debug, Error)]
#[error("{}{}: {kind}", .file.display(), .location.as_ref().map(|l| format!(" ({l})")).unwrap_or_default())]
pub struct DefinitionError {
    /// File (or in-memory source name) the definition came from.
    pub file: PathBuf,
    /// Where in the file, when known: `line N, column M` or a field path.
    pub location: Option<String>,
    /// What went wrong.
    #[source]
    pub kind: DefinitionErrorKind,
}

impl DefinitionError {
    /// Create an error without a location.
    pub fn new(file: impl Into<PathBuf>, kind: DefinitionErrorKind) -> Self {
        Self {
            file: file.into(),
            location: None,
            kind,
        }
    }

    /// Attach a location.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// The ways a description file can be wrong.
#[derive(Debug, Error)]
pub enum DefinitionErrorKind {
    /// Failed to read the file
    #[error("failed to read file: {0}")]
    Read(#[source] std::io::Error),

    /// TOML syntax or schema violation
    #[error("{message}")]
    Syntax {
        /// Parser message.
        message: String,
    },

    /// Enumerated parameter without options
    #[error("enum param '{param}' has no options")]
    NoOptions {
        /// Parameter id.
        param: String,
    },

    /// Two options of one parameter share a key
    #[error("param '{param}' has duplicate option key '{key}'")]
    DuplicateOption {
        /// Parameter id.
        param: String,
        /// Repeated key.
        key: String,
    },

    /// Enum default that is not an option key
    #[error("default '{default}' of param '{param}' is not one of its options")]
    DefaultNotAnOption {
        /// Parameter id.
        param: String,
        /// The offending default.
        default: String,
    },

    /// Two parameters share an id
    #[error("duplicate param id '{param}'")]
    DuplicateParam {
        /// Parameter id.
        param: String,
    },

    /// Two ports on the same side share a label
    #[error("duplicate {direction} port label '{label}'")]
    DuplicatePort {
        /// `input` or `output`.
        direction: &'static str,
        /// Repeated label.
        label: String,
    },

    /// A port whose minimum multiplicity exceeds its maximum
    #[error("port '{label}' has min_streams {min} greater than max_streams {max}")]
    InvalidStreamRange {
        /// Port label.
        label: String,
        /// Declared minimum.
        min: usize,
        /// Declared maximum.
        max: usize,
    },

    /// An evaluatable block whose value parameter is not declared
    #[error("evaluatable block has no param '{param}' to hold its value")]
    MissingValueParam {
        /// Expected parameter id.
        param: String,
    },

    /// Block id already registered from a different source
    #[error("block id '{id}' is already defined in '{}'", .existing.display())]
    DuplicateBlockId {
        /// Block id.
        id: String,
        /// Source that registered it first.
        existing: PathBuf,
    },
}

/// Lookup of a block id the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown block type '{id}'")]
pub struct UnknownBlockError {
    /// The id that was looked up.
    pub id: String,
}

/// Converts a byte offset in `text` to a 1-based `line N, column M` string.
pub(crate) fn line_col(text: &str, offset: usize) -> String {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    format!("line {line}, column {column}")
}
