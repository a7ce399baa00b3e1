/// Exit codes for the lintbridge binary
///
/// The server itself never exits with a lint result; these codes only tell
/// a wrapper whether startup succeeded.
/// Success - The command completed or the client ended the session
pub const SUCCESS: i32 = 0;

/// Tool error - Configuration error, I/O error, or failure to start the server
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{SUCCESS, TOOL_ERROR};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
