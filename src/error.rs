use thiserror::Error;

use crate::model::Role;

/// Coarse classification of a failure, used by callers to decide whether to
/// skip the page, stop on it, or report the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The page/record combination is outside this engine's remit.
    NotApplicable,
    /// Stored representations disagree; do not guess which one is right.
    InconsistentData,
    /// A projection or geodesic collaborator failed.
    ProviderFailure,
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("malformed grid reference {0:?}")]
    MalformedGridReference(String),

    #[error("({easting}, {northing}) is outside the {system} letter grid")]
    OutOfGrid {
        system: &'static str,
        easting: f64,
        northing: f64,
    },

    #[error("unsupported grid reference length {0}")]
    UnsupportedDigits(u8),

    #[error("unknown grid system index {0}")]
    UnknownGridSystem(u8),

    #[error("image {0} not found in the archive mirror")]
    NotInArchive(u64),

    #[error("no {{{{{0}}}}} template on page")]
    MissingTemplate(&'static str),

    #[error("{count} {{{{{name}}}}} or equivalent templates on one page")]
    AmbiguousTemplates { name: &'static str, count: usize },

    #[error("broken {{{{{0}}}}} template")]
    BadTemplate(&'static str),

    #[error("structured {0} statement disagrees with the wikitext template")]
    StatementMismatch(Role),

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl LocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocationError::StatementMismatch(_) => ErrorKind::InconsistentData,
            LocationError::Provider(_) => ErrorKind::ProviderFailure,
            _ => ErrorKind::NotApplicable,
        }
    }
}
