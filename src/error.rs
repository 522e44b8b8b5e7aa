//! Error types shared by the engine and its collaborators

use crate::domain::MissionIndex;

/// Errors surfaced by collaborators (remote store, catalog, identity) and config.
///
/// None of these are fatal to a running session: the engine logs them and
/// degrades to a usable state.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Remote progress read failed: {0}")]
    RemoteRead(String),

    #[error("Remote write for mission {index} failed: {reason}")]
    RemoteWrite { index: MissionIndex, reason: String },

    #[error("Remote selection write failed: {0}")]
    SelectionWrite(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Malformed push event: {0}")]
    MalformedPush(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Session closed")]
    SessionClosed,
}

impl BoardError {
    /// Short machine-readable label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RemoteRead(_) => "remote_read",
            Self::RemoteWrite { .. } => "remote_write",
            Self::SelectionWrite(_) => "selection_write",
            Self::CatalogUnavailable(_) => "catalog_unavailable",
            Self::IdentityUnavailable(_) => "identity_unavailable",
            Self::MalformedPush(_) => "malformed_push",
            Self::Config(_) => "config",
            Self::SessionClosed => "session_closed",
        }
    }
}
