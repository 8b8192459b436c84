//! Deployment resource configuration.
//!
//! [`ResourceConfig`] is the raw shape read from a deployment file; keys
//! are camelCase and the historical names (`restApi`, `lambdaRole`,
//! `lamdaFunctionName`, `lambdaMemory`) are accepted as aliases.
//! [`ResourceConfig::validate`] turns it into [`DeploymentSettings`] with
//! every default applied, or fails before anything remote is touched.

use crate::error::{Error, Result};
use cloudkit::{Arn, RetryConfig, StaticCredentials};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default function memory size in MB.
pub const DEFAULT_MEMORY_MB: u32 = 512;

/// Default function timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 3;

/// Default handler entry point inside the package.
pub const DEFAULT_HANDLER: &str = "entrypoint.handler";

/// Default function runtime.
pub const DEFAULT_RUNTIME: &str = "nodejs20.x";

/// Memory range the compute service accepts, in MB.
const MEMORY_RANGE_MB: std::ops::RangeInclusive<u32> = 128..=10_240;

/// Timeout range the compute service accepts, in seconds.
const TIMEOUT_RANGE_SECONDS: std::ops::RangeInclusive<u32> = 1..=900;

/// Retry settings as written in a deployment file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Attempts per remote call when throttled (1 = no retry).
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Raw deployment resources, as read from a deployment file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Name of the API container (required).
    #[serde(default, alias = "restApi")]
    pub rest_api_name: Option<String>,

    /// Function name; defaults to the API name.
    #[serde(default, alias = "lamdaFunctionName")]
    pub lambda_function_name: Option<String>,

    /// Execution role ARN (required).
    #[serde(default, rename = "lambdaRoleArn", alias = "lambdaRole")]
    pub lambda_role_arn: Option<String>,

    /// Function memory in MB.
    #[serde(default, rename = "lambdaMemoryMB", alias = "lambdaMemory")]
    pub lambda_memory_mb: Option<u32>,

    /// Function timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u32>,

    /// Region; the default provider chain applies when unset.
    #[serde(default)]
    pub region: Option<String>,

    /// Static access keys (`accessKeyId`, `secretAccessKey`, `sessionToken`).
    #[serde(flatten)]
    pub credentials: Option<StaticCredentials>,

    /// Handler entry point.
    #[serde(default)]
    pub handler: Option<String>,

    /// Runtime identifier.
    #[serde(default)]
    pub runtime: Option<String>,

    /// Remove invoke statements left by earlier artifacts.
    #[serde(default)]
    pub prune_stale_permissions: bool,

    /// Retry settings for throttled calls.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Validated deployment settings with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSettings {
    /// Name of the API container.
    pub rest_api_name: String,
    /// Function name.
    pub function_name: String,
    /// Execution role ARN.
    pub role_arn: String,
    /// Function memory in MB.
    pub memory_size_mb: u32,
    /// Function timeout in seconds.
    pub timeout_seconds: u32,
    /// Handler entry point.
    pub handler: String,
    /// Runtime identifier.
    pub runtime: String,
    /// Region override.
    pub region: Option<String>,
    /// Static credentials override.
    pub credentials: Option<StaticCredentials>,
    /// Remove invoke statements left by earlier artifacts.
    pub prune_stale_permissions: bool,
    /// Retry policy for remote calls.
    pub retry: RetryConfig,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ResourceConfig {
    /// Validate and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the API name or role is
    /// missing, the role is not an `arn:aws...` identifier, or a numeric
    /// setting is out of the range the service accepts.
    pub fn validate(&self) -> Result<DeploymentSettings> {
        let rest_api_name = non_empty(self.rest_api_name.as_ref())
            .ok_or_else(|| Error::config("restApiName is required"))?;
        let role_arn = non_empty(self.lambda_role_arn.as_ref())
            .ok_or_else(|| Error::config("lambdaRoleArn is required"))?;

        if !role_arn.starts_with("arn:aws") {
            return Err(Error::config(format!(
                "lambdaRoleArn must be the ARN of the role, got {role_arn:?}"
            )));
        }
        role_arn
            .parse::<Arn>()
            .map_err(|e| Error::config(format!("lambdaRoleArn: {e}")))?;

        let function_name = non_empty(self.lambda_function_name.as_ref()).unwrap_or(rest_api_name);

        let memory_size_mb = self.lambda_memory_mb.unwrap_or(DEFAULT_MEMORY_MB);
        if !MEMORY_RANGE_MB.contains(&memory_size_mb) {
            return Err(Error::config(format!(
                "lambdaMemoryMB must be between {} and {}, got {memory_size_mb}",
                MEMORY_RANGE_MB.start(),
                MEMORY_RANGE_MB.end()
            )));
        }

        let timeout_seconds = self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        if !TIMEOUT_RANGE_SECONDS.contains(&timeout_seconds) {
            return Err(Error::config(format!(
                "timeoutSeconds must be between {} and {}, got {timeout_seconds}",
                TIMEOUT_RANGE_SECONDS.start(),
                TIMEOUT_RANGE_SECONDS.end()
            )));
        }

        let retry = match self.retry.max_attempts {
            Some(0) => return Err(Error::config("retry.maxAttempts must be at least 1")),
            Some(n) => RetryConfig::new(n, Duration::from_secs(1), 2.0),
            None => RetryConfig::no_retry(),
        };

        Ok(DeploymentSettings {
            rest_api_name: rest_api_name.to_string(),
            function_name: function_name.to_string(),
            role_arn: role_arn.to_string(),
            memory_size_mb,
            timeout_seconds,
            handler: non_empty(self.handler.as_ref())
                .unwrap_or(DEFAULT_HANDLER)
                .to_string(),
            runtime: non_empty(self.runtime.as_ref())
                .unwrap_or(DEFAULT_RUNTIME)
                .to_string(),
            region: non_empty(self.region.as_ref()).map(str::to_string),
            credentials: self.credentials.clone(),
            prune_stale_permissions: self.prune_stale_permissions,
            retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ResourceConfig {
        ResourceConfig {
            rest_api_name: Some("my-api".to_string()),
            lambda_role_arn: Some("arn:aws:iam::123456789012:role/webda".to_string()),
            ..ResourceConfig::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let settings = minimal().validate().unwrap();
        assert_eq!(settings.function_name, "my-api");
        assert_eq!(settings.memory_size_mb, 512);
        assert_eq!(settings.timeout_seconds, 3);
        assert_eq!(settings.handler, "entrypoint.handler");
        assert_eq!(settings.runtime, "nodejs20.x");
        assert_eq!(settings.retry.max_attempts, 1);
        assert!(!settings.prune_stale_permissions);
    }

    #[test]
    fn test_role_must_be_an_arn() {
        let config = ResourceConfig {
            lambda_role_arn: Some("not-an-arn".to_string()),
            ..minimal()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("not-an-arn"));
    }

    #[test]
    fn test_required_fields() {
        let missing_role = ResourceConfig {
            lambda_role_arn: None,
            ..minimal()
        };
        assert!(missing_role.validate().is_err());

        let blank_api = ResourceConfig {
            rest_api_name: Some("  ".to_string()),
            ..minimal()
        };
        assert!(blank_api.validate().is_err());
    }

    #[test]
    fn test_memory_and_timeout_ranges() {
        let small = ResourceConfig {
            lambda_memory_mb: Some(64),
            ..minimal()
        };
        assert!(small.validate().is_err());

        let long = ResourceConfig {
            timeout_seconds: Some(901),
            ..minimal()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "restApiName": "my-api",
            "lambdaFunctionName": "my-fn",
            "lambdaRoleArn": "arn:aws:iam::123456789012:role/webda",
            "lambdaMemoryMB": 1024,
            "timeoutSeconds": 10,
            "region": "eu-west-1",
            "pruneStalePermissions": true,
            "retry": {"maxAttempts": 4}
        }"#;
        let config: ResourceConfig = serde_json::from_str(json).unwrap();
        let settings = config.validate().unwrap();
        assert_eq!(settings.function_name, "my-fn");
        assert_eq!(settings.memory_size_mb, 1024);
        assert_eq!(settings.timeout_seconds, 10);
        assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
        assert!(settings.prune_stale_permissions);
        assert_eq!(settings.retry.max_attempts, 4);
        assert!(settings.credentials.is_none());
    }

    #[test]
    fn test_deserialize_historical_keys() {
        let json = r#"{
            "restApi": "legacy",
            "lamdaFunctionName": "legacy-fn",
            "lambdaRole": "arn:aws:iam::123456789012:role/webda",
            "lambdaMemory": 256,
            "accessKeyId": "AKIDEXAMPLE",
            "secretAccessKey": "secret"
        }"#;
        let config: ResourceConfig = serde_json::from_str(json).unwrap();
        let settings = config.validate().unwrap();
        assert_eq!(settings.rest_api_name, "legacy");
        assert_eq!(settings.function_name, "legacy-fn");
        assert_eq!(settings.memory_size_mb, 256);
        assert_eq!(
            settings.credentials.map(|c| c.access_key_id).as_deref(),
            Some("AKIDEXAMPLE")
        );
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = ResourceConfig {
            retry: RetrySettings {
                max_attempts: Some(0),
            },
            ..minimal()
        };
        assert!(config.validate().is_err());
    }
}
