use thiserror::Error;

/// Common error types used across the application.
///
/// Transport-level delivery failures are deliberately NOT represented here.
/// They are classified as [`crate::messenger::MessengerError`] and handled
/// locally by the delivery path; `AppError` covers the failures that abort a
/// broadcast outright.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
