//! Error sanitization for client-facing messages.
//!
//! Prevents leaking internal details (store errors, paths) to clients.

/// Sanitize an error for client consumption.
///
/// Logs the full error server-side, returns generic message for client.
pub fn sanitize_error<E: std::fmt::Display>(error: &E, context: &str) -> String {
    tracing::error!(
        error = %error,
        context = context,
        "Internal error occurred"
    );

    format!("An error occurred while {}", context)
}

/// Sanitize a repository error.
pub fn sanitize_repo_error<E: std::fmt::Display>(error: &E, operation: &str) -> String {
    tracing::error!(
        error = %error,
        operation = operation,
        "Repository error"
    );

    format!("Failed to {} - please try again", operation)
}

/// Common error messages for client consumption.
pub mod messages {
    pub const INTERNAL_ERROR: &str = "An internal error occurred";
    pub const INVALID_DATA: &str = "Invalid data received";
    pub const AUTHENTICATION_FAILED: &str = "Authentication failed";
}
