use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up sinks. Write failures at runtime are
/// logged by the sink worker and never surface here.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("sink '{sink}': invalid value {value:?} for '{key}'")]
    InvalidParam {
        sink: String,
        key: &'static str,
        value: String,
    },

    #[error("sink '{sink}': cannot prepare output at {}: {source}", path.display())]
    OutputDir {
        sink: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}
