use std::error::Error;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

/// One line per error in the chain; causes are indented under the first.
pub fn format_error_chain<E: Error + ?Sized>(error: &E) -> String {
    let mut out = error.to_string();
    let mut cause = error.source();
    while let Some(err) = cause {
        out.push_str("\n  caused by: ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

pub fn log_error<E: Error + ?Sized>(context: &str, error: &E) {
    tracing::error!(context, error = %format_error_chain(error), "operation failed");
}

/// Converts a `Result` into the `Result<T, String>` shape Tauri commands return.
pub fn result_to_string<T, E: Error>(result: Result<T, E>) -> Result<T, String> {
    result.map_err(|e| format_error_chain(&e))
}
