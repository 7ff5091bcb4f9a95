//! Provider configuration.

use std::path::Path;
use std::time::Duration;

use azrm_arm::client::{DEFAULT_ENDPOINT, DEFAULT_POLL_INTERVAL};
use clap::Args;

use crate::error::{ProviderError, Result};
use crate::state::ResourceData;

/// Connection settings shared by every resource binding.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Management endpoint, e.g. `https://management.azure.com`.
    pub endpoint: String,
    pub subscription_id: String,
    pub access_token: String,
    /// Poll interval used when the service sends no `Retry-After`.
    pub poll_interval: Duration,
    /// Overrides every per-resource timeout when set.
    pub operation_timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(subscription_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.into(),
            access_token: access_token.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.trim().is_empty() {
            return Err(ProviderError::Config("subscription id is empty".to_string()));
        }
        if self.access_token.trim().is_empty() {
            return Err(ProviderError::Config("access token is empty".to_string()));
        }
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ProviderError::Config(format!(
                "endpoint {:?} must be an http(s) URL",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// Command-line arguments for [`ProviderConfig`].
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Management API endpoint
    #[arg(long, env = "ARM_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Subscription the resources live in
    #[arg(long, env = "ARM_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// Bearer token for the management API
    #[arg(long, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Default poll interval in seconds for long-running operations
    #[arg(long, env = "ARM_POLL_INTERVAL_SECS", default_value = "10")]
    pub poll_interval_secs: u64,

    /// Timeout in seconds applied to every operation
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl ProviderArgs {
    pub fn into_config(self) -> Result<ProviderConfig> {
        let subscription_id = self
            .subscription_id
            .ok_or_else(|| ProviderError::Config("ARM_SUBSCRIPTION_ID is not set".to_string()))?;
        let access_token = self
            .access_token
            .ok_or_else(|| ProviderError::Config("ARM_ACCESS_TOKEN is not set".to_string()))?;

        let mut config = ProviderConfig::new(subscription_id, access_token)
            .with_endpoint(self.endpoint)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs));
        if let Some(secs) = self.timeout_secs {
            config = config.with_operation_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}

/// Load a desired configuration from a JSON file.
pub fn load_resource_data(path: &Path) -> Result<ResourceData> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProviderError::Config(format!("reading {}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| ProviderError::Config(format!("parsing {}: {}", path.display(), e)))?;
    ResourceData::from_value(value)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        provider: ProviderArgs,
    }

    #[test]
    fn validate_rejects_blank_credentials_and_bad_endpoints() {
        assert!(ProviderConfig::new("sub", "token").validate().is_ok());
        assert!(ProviderConfig::new(" ", "token").validate().is_err());
        assert!(ProviderConfig::new("sub", "").validate().is_err());
        assert!(
            ProviderConfig::new("sub", "token")
                .with_endpoint("ftp://example.com")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn args_build_config() {
        let cli = Cli::parse_from([
            "azrm",
            "--endpoint",
            "http://127.0.0.1:8080",
            "--subscription-id",
            "sub",
            "--access-token",
            "t",
            "--poll-interval-secs",
            "1",
            "--timeout-secs",
            "60",
        ]);
        let config = cli.provider.into_config().unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.operation_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn load_resource_data_reads_json_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "job", "streaming_units": 3}}"#).unwrap();
        let data = load_resource_data(file.path()).unwrap();
        assert_eq!(data.get_i64("streaming_units"), Some(3));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "[1, 2]").unwrap();
        assert!(load_resource_data(bad.path()).is_err());

        let err = load_resource_data(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
