//! Package-level constants.

/// Current version of hfml (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "hfml";

/// `User-Agent` sent on every outgoing request (`hfml/<version>`).
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}

/// Token scope for the Azure Resource Manager audience.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Base URL of the Azure Resource Manager control plane.
pub const MANAGEMENT_URL: &str = "https://management.azure.com";

/// API version used for every `Microsoft.MachineLearningServices` request.
pub const ARM_API_VERSION: &str = "2023-10-01";

/// Session configuration file read when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Where the synthesized workspace config is written when discovery fails.
pub const DEFAULT_FALLBACK_CONFIG_PATH: &str = "../.azureml/config.json";

/// Directory that receives scoring request files.
pub const DEFAULT_REQUEST_DIR: &str = ".";

/// Interval between long-running-operation status polls when the service
/// sends no `Retry-After`.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default log filter for the CLI.
pub const DEFAULT_LOG_LEVEL: &str = "info";
