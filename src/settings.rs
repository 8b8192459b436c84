//! Deployment file loading.
//!
//! A deployment file names the deployment identifier, the packaged
//! artifact, the deployment resources and the route table:
//!
//! ```toml
//! deployment = "prod"
//! artifact = "lambda.zip"
//!
//! [resources]
//! restApiName = "my-api"
//! lambdaRoleArn = "arn:aws:iam::123456789012:role/webda"
//!
//! [routes."/users"]
//! method = ["GET", "POST"]
//! ```

use anyhow::{Context, Result, bail};
use deployer::{DeployRequest, ResourceConfig, RouteTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifact path used when the file names none.
pub const DEFAULT_ARTIFACT: &str = "lambda.zip";

/// Contents of a deployment file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentFile {
    /// Deployment identifier, used as the stage name.
    #[serde(default)]
    pub deployment: Option<String>,
    /// Packaged artifact path, relative to the file.
    #[serde(default)]
    pub artifact: Option<String>,
    /// Deployment resources.
    #[serde(default)]
    pub resources: ResourceConfig,
    /// Route table; keys not starting with `/` are ignored.
    #[serde(default)]
    pub routes: BTreeMap<String, serde_json::Value>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Overrides coming from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub stage: Option<String>,
    pub artifact: Option<PathBuf>,
    pub force_rebind: bool,
}

impl DeploymentFile {
    /// Load a deployment file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut file = Self::parse(&content, is_json(path))
            .with_context(|| format!("Invalid deployment file {}", path.display()))?;
        file.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        log::debug!("Loaded deployment file {}", path.display());
        Ok(file)
    }

    fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Resolved artifact path, `~` expanded.
    pub fn artifact_path(&self, overridden: Option<&Path>) -> PathBuf {
        if let Some(path) = overridden {
            return path.to_path_buf();
        }
        let raw = self.artifact.as_deref().unwrap_or(DEFAULT_ARTIFACT);
        let expanded = PathBuf::from(shellexpand::tilde(raw).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    /// Build the deploy request.
    pub fn into_request(self, overrides: &Overrides) -> Result<DeployRequest> {
        let deployment = match overrides.stage.clone().or_else(|| self.deployment.clone()) {
            Some(deployment) => deployment,
            None => bail!("No deployment identifier: set `deployment` in the file or pass --stage"),
        };
        let routes = RouteTable::from_config(&self.routes)?;
        if routes.is_empty() {
            log::warn!("The deployment file declares no routes");
        }
        let artifact = self.artifact_path(overrides.artifact.as_deref());
        Ok(
            DeployRequest::new(self.resources, routes, artifact, deployment)
                .force_rebind(overrides.force_rebind),
        )
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOML: &str = r#"
deployment = "prod"
artifact = "build/lambda.zip"

[resources]
restApiName = "my-api"
lambdaRoleArn = "arn:aws:iam::123456789012:role/webda"
lambdaMemoryMB = 1024

[routes."/"]
method = "GET"

[routes."/users"]
method = ["GET", "POST"]

[routes.cors]
enabled = true
"#;

    #[test]
    fn test_load_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webda.toml");
        fs::write(&path, TOML).unwrap();

        let file = DeploymentFile::load(&path).unwrap();
        assert_eq!(file.resources.lambda_memory_mb, Some(1024));

        let request = file.into_request(&Overrides::default()).unwrap();
        assert_eq!(request.deployment, "prod");
        assert_eq!(request.artifact, temp.path().join("build/lambda.zip"));
        assert_eq!(request.routes.len(), 2);
        assert_eq!(request.routes.get("/users").unwrap().methods, vec!["GET", "POST"]);
    }

    #[test]
    fn test_load_json_by_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deployment.json");
        fs::write(
            &path,
            r#"{
                "resources": { "restApi": "my-api", "lambdaRole": "arn:aws:iam::1:role/r" },
                "routes": { "/items": { "method": "get" } }
            }"#,
        )
        .unwrap();

        let file = DeploymentFile::load(&path).unwrap();
        assert_eq!(file.resources.rest_api_name.as_deref(), Some("my-api"));
        assert_eq!(file.artifact_path(None), temp.path().join(DEFAULT_ARTIFACT));
    }

    #[test]
    fn test_stage_override_wins() {
        let file: DeploymentFile = toml::from_str(TOML).unwrap();
        let overrides = Overrides {
            stage: Some("staging".to_string()),
            artifact: Some(PathBuf::from("/tmp/other.zip")),
            force_rebind: true,
        };
        let request = file.into_request(&overrides).unwrap();
        assert_eq!(request.deployment, "staging");
        assert_eq!(request.artifact, PathBuf::from("/tmp/other.zip"));
        assert!(request.force_rebind);
    }

    #[test]
    fn test_missing_deployment_identifier() {
        let file = DeploymentFile::default();
        let err = file.into_request(&Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("--stage"));
    }

    #[test]
    fn test_invalid_route_is_reported() {
        let file: DeploymentFile = toml::from_str(
            r#"
deployment = "prod"
[routes."/x"]
method = "FETCH"
"#,
        )
        .unwrap();
        assert!(file.into_request(&Overrides::default()).is_err());
    }
}
