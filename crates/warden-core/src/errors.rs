/// Core error type.
///
/// Adapter crates map their specific errors into this type so the bot core can
/// handle failures consistently. Per-target delivery failures are *not* in
/// here; those are classified separately as `messaging::types::SendError` so a
/// broadcast run can record and skip them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scheduling failure: {0}")]
    Scheduling(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
