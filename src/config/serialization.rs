//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML format with comments
    /// Used for generating the default config file
    pub fn to_toml(&self) -> String {
        format!(
            r#"# corral configuration
# Environment variables override these settings.

# Base URL of the CRM backend (env: CORRAL_API_URL)
api_url = "{api_url}"

# Transport timeout for backend calls, in seconds (env: CORRAL_TIMEOUT_SECS)
request_timeout_secs = {request_timeout_secs}

[logging]
# Log level: trace, debug, info, warn, error
level = "{log_level}"

# Enable file logging (in addition to the in-app log view)
file_enabled = {file_enabled}

# Directory for log files
file_dir = "{file_dir}"

# Log file rotation: hourly, daily, never
file_rotation = "{file_rotation}"

# Prefix for log file names (e.g., "corral" -> "corral.2026-08-29.log")
file_prefix = "{file_prefix}"

[assistant]
# Maximum suggestions shown before the first message is sent
suggestion_limit = {suggestion_limit}
"#,
            api_url = self.api_url,
            request_timeout_secs = self.request_timeout_secs,
            log_level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
            suggestion_limit = self.assistant.suggestion_limit,
        )
    }
}
