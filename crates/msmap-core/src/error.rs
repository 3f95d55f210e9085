use std::path::PathBuf;

/// Errors raised while loading the map or persisting local state.
///
/// Empty wizard results and unknown checklist ids are not errors.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed map document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("edge '{edge}' references unknown node '{endpoint}'")]
    DanglingEdge { edge: String, endpoint: String },

    #[error("checklist store: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
