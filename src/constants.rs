//! Constants for the functions-otel-lite package.
//!
//! This file centralizes all constants to ensure consistency across the codebase
//! and provide a single source of truth for configuration parameters.

/// Environment variable names for configuration.
pub mod env_vars {
    /// Controls whether application log decoration is enabled at all.
    pub const APPLICATION_LOGGING_ENABLED: &str = "FUNCTIONS_APM_APPLICATION_LOGGING_ENABLED";

    /// Controls whether log lines are decorated locally (per-call patching).
    pub const LOCAL_DECORATING_ENABLED: &str = "FUNCTIONS_APM_LOCAL_DECORATING_ENABLED";

    /// Log level for the crate's own diagnostic output.
    pub const LOG_LEVEL: &str = "FUNCTIONS_APM_LOG_LEVEL";

    /// Service name for telemetry.
    pub const SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

    /// Resource attributes in KEY=VALUE,KEY2=VALUE2 format.
    pub const RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";

    /// Azure Functions app name (used as fallback service name).
    pub const SITE_NAME: &str = "WEBSITE_SITE_NAME";

    /// Azure region the function app runs in.
    pub const REGION_NAME: &str = "REGION_NAME";

    /// Azure Functions host runtime version.
    pub const EXTENSION_VERSION: &str = "FUNCTIONS_EXTENSION_VERSION";

    /// Instance id of the host running this function app.
    pub const INSTANCE_ID: &str = "WEBSITE_INSTANCE_ID";

    /// Log format used by the host worker ("json" enables JSON console output).
    pub const WORKER_LOG_FORMAT: &str = "FUNCTIONS_WORKER_LOG_FORMAT";
}

/// Default values for configuration parameters.
pub mod defaults {
    /// Application log decoration is on unless explicitly disabled.
    pub const APPLICATION_LOGGING_ENABLED: bool = true;

    /// Local decoration is on unless explicitly disabled.
    pub const LOCAL_DECORATING_ENABLED: bool = true;

    /// Default service name if none can be detected.
    pub const SERVICE_NAME: &str = "unknown_service";

    /// Default value for enabling the fmt layer.
    pub const ENABLE_FMT_LAYER: bool = false;
}

/// Printf-style substitution tokens recognized in log message heads.
///
/// A head containing any of these receives correlation metadata inline;
/// any other head gets it as a trailing argument instead.
pub const SUBSTITUTION_PLACEHOLDERS: [&str; 7] = ["%o", "%O", "%d", "%i", "%f", "%s", "%c"];
