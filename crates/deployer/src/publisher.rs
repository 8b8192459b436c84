//! Compute function publishing, gated on the artifact digest.

use crate::artifact::{Artifact, ArtifactDigest};
use crate::config::DeploymentSettings;
use crate::error::{Error, InPhase, Phase, Result};
use cloudkit::{Arn, ComputeBackend, FunctionSpec, RemoteFunction, RetryConfig, retrying};
use declarative::{ApplyResult, ChangeKind};

/// The published function, as later phases need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Function name.
    pub name: String,
    /// Digest of the deployed code.
    pub digest: ArtifactDigest,
    /// Memory size in MB.
    pub memory_size_mb: u32,
    /// Timeout in seconds.
    pub timeout_seconds: u32,
    /// Execution role ARN.
    pub role_arn: String,
    /// Function ARN.
    pub arn: Arn,
    /// URI the gateway integration invokes.
    pub invocation_arn: String,
}

impl FunctionDescriptor {
    /// Describe a function reported by the service.
    pub fn from_remote(function: &RemoteFunction) -> Result<Self> {
        let arn: Arn = function
            .arn
            .parse()
            .map_err(|e: cloudkit::InvalidArn| Error::Remote {
                phase: Phase::Publish,
                source: cloudkit::Error::Other(format!(
                    "function {} reports an invalid ARN: {e}",
                    function.name
                )),
            })?;
        Ok(Self {
            name: function.name.clone(),
            digest: ArtifactDigest::from_encoded(function.code_sha256.clone()),
            memory_size_mb: function.memory_size_mb,
            timeout_seconds: function.timeout_seconds,
            role_arn: function.role.clone(),
            invocation_arn: arn.invocation_uri(),
            arn,
        })
    }
}

/// What publishing would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPlan {
    /// The remote code hash already matches.
    Unchanged(RemoteFunction),
    /// The function exists with different code.
    Update(RemoteFunction),
    /// No function with the target name exists.
    Create,
}

impl PublishPlan {
    /// Kind of change, `None` when unchanged.
    #[must_use]
    pub fn change_kind(&self) -> Option<ChangeKind> {
        match self {
            Self::Unchanged(_) => None,
            Self::Update(_) => Some(ChangeKind::Modify),
            Self::Create => Some(ChangeKind::Create),
        }
    }
}

/// Description stored on the function; embeds the digest.
#[must_use]
pub fn function_description(rest_api_name: &str, digest: &ArtifactDigest) -> String {
    format!("Deployed with Webda for API: {rest_api_name}/{digest}")
}

/// Desired function configuration for a deployment.
#[must_use]
pub fn function_spec(settings: &DeploymentSettings, digest: &ArtifactDigest) -> FunctionSpec {
    FunctionSpec {
        name: settings.function_name.clone(),
        role: settings.role_arn.clone(),
        handler: settings.handler.clone(),
        runtime: settings.runtime.clone(),
        memory_size_mb: settings.memory_size_mb,
        timeout_seconds: settings.timeout_seconds,
        description: function_description(&settings.rest_api_name, digest),
    }
}

/// Creates or updates the deployment's function.
pub struct FunctionPublisher<'a> {
    backend: &'a dyn ComputeBackend,
    retry: &'a RetryConfig,
}

impl<'a> FunctionPublisher<'a> {
    /// Create a publisher over a compute backend.
    pub fn new(backend: &'a dyn ComputeBackend, retry: &'a RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Decide what publishing `name` with `digest` would do. Read-only.
    ///
    /// # Errors
    ///
    /// Fails when the target is not on the first page of the listing and
    /// the listing has more pages: creating it could duplicate a function
    /// that lives on a later page.
    pub fn plan(&self, name: &str, digest: &ArtifactDigest) -> Result<PublishPlan> {
        let page = retrying(self.retry, || self.backend.list_functions()).in_phase(Phase::Publish)?;

        if let Some(function) = page.items.iter().find(|f| f.name == name) {
            return Ok(if function.code_sha256 == digest.as_str() {
                PublishPlan::Unchanged(function.clone())
            } else {
                PublishPlan::Update(function.clone())
            });
        }

        if page.is_truncated() {
            return Err(cloudkit::Error::Truncated {
                operation: "ListFunctions",
            })
            .in_phase(Phase::Publish);
        }
        Ok(PublishPlan::Create)
    }

    /// Make the remote function run `artifact` with `spec`.
    ///
    /// An unchanged digest is a no-op. A changed one replaces the code and
    /// then the configuration. A missing function is created.
    pub fn publish(
        &self,
        spec: &FunctionSpec,
        artifact: &Artifact,
    ) -> Result<(FunctionDescriptor, ApplyResult)> {
        let digest = artifact.digest();
        let (function, result) = match self.plan(&spec.name, digest)? {
            PublishPlan::Unchanged(function) => {
                log::info!("Function {} unchanged, not updating", spec.name);
                (function, ApplyResult::NoChange)
            }
            PublishPlan::Update(previous) => {
                log::info!(
                    "Updating function {} ({} -> {digest})",
                    spec.name,
                    previous.code_sha256
                );
                retrying(self.retry, || {
                    self.backend.update_function_code(&spec.name, artifact.bytes())
                })
                .in_phase(Phase::Publish)?;
                let function =
                    retrying(self.retry, || self.backend.update_function_configuration(spec))
                        .in_phase(Phase::Publish)?;
                (function, ApplyResult::Modified)
            }
            PublishPlan::Create => {
                log::info!("Creating function {}", spec.name);
                let function =
                    retrying(self.retry, || self.backend.create_function(spec, artifact.bytes()))
                        .in_phase(Phase::Publish)?;
                (function, ApplyResult::Created)
            }
        };

        if function.code_sha256 != digest.as_str() {
            return Err(Error::DigestMismatch {
                function: function.name,
                expected: digest.to_string(),
                remote: function.code_sha256,
            });
        }

        Ok((FunctionDescriptor::from_remote(&function)?, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;
    use cloudkit::MockBackend;

    fn settings() -> DeploymentSettings {
        ResourceConfig {
            rest_api_name: Some("my-api".to_string()),
            lambda_role_arn: Some("arn:aws:iam::123456789012:role/webda".to_string()),
            ..ResourceConfig::default()
        }
        .validate()
        .unwrap()
    }

    fn artifact(bytes: &[u8]) -> Artifact {
        Artifact::from_bytes("lambda.zip", bytes.to_vec())
    }

    #[test]
    fn test_description_embeds_digest() {
        let digest = ArtifactDigest::from_encoded("abc=");
        assert_eq!(
            function_description("my-api", &digest),
            "Deployed with Webda for API: my-api/abc="
        );
    }

    #[test]
    fn test_publish_creates_missing_function() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let publisher = FunctionPublisher::new(&mock, &retry);
        let artifact = artifact(b"v1");
        let spec = function_spec(&settings(), artifact.digest());

        let (descriptor, result) = publisher.publish(&spec, &artifact).unwrap();
        assert_eq!(result, ApplyResult::Created);
        assert_eq!(&descriptor.digest, artifact.digest());
        assert_eq!(descriptor.name, "my-api");
        assert!(descriptor.invocation_arn.ends_with("function:my-api/invocations"));
        assert_eq!(mock.call_count("CreateFunction"), 1);
    }

    #[test]
    fn test_unchanged_digest_makes_no_update_calls() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let artifact = artifact(b"v1");
        let spec = function_spec(&settings(), artifact.digest());
        mock.seed_function(&spec, b"v1");

        let publisher = FunctionPublisher::new(&mock, &retry);
        let (_, result) = publisher.publish(&spec, &artifact).unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_changed_digest_updates_code_then_configuration() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let old = artifact(b"v1");
        mock.seed_function(&function_spec(&settings(), old.digest()), b"v1");

        let new = artifact(b"v2");
        let spec = function_spec(&settings(), new.digest());
        let publisher = FunctionPublisher::new(&mock, &retry);
        let (descriptor, result) = publisher.publish(&spec, &new).unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(&descriptor.digest, new.digest());
        let ops: Vec<_> = mock.mutations().iter().map(|c| c.operation).collect();
        assert_eq!(ops, vec!["UpdateFunctionCode", "UpdateFunctionConfiguration"]);
        assert_eq!(
            mock.function("my-api").unwrap().description.unwrap(),
            function_description("my-api", new.digest())
        );
    }

    #[test]
    fn test_truncated_listing_fails_instead_of_creating() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let other = FunctionSpec {
            name: "another".to_string(),
            ..function_spec(&settings(), &ArtifactDigest::of(b""))
        };
        mock.seed_function(&other, b"");
        mock.seed_function(
            &FunctionSpec {
                name: "zzz".to_string(),
                ..other.clone()
            },
            b"",
        );
        mock.set_page_size(1);

        let artifact = artifact(b"v1");
        let spec = function_spec(&settings(), artifact.digest());
        let err = FunctionPublisher::new(&mock, &retry)
            .publish(&spec, &artifact)
            .unwrap_err();

        assert_eq!(err.phase(), Phase::Publish);
        assert_eq!(err.category(), Some(cloudkit::ErrorCategory::Truncated));
        assert_eq!(mock.call_count("CreateFunction"), 0);
    }

    #[test]
    fn test_plan_is_read_only() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let publisher = FunctionPublisher::new(&mock, &retry);

        let plan = publisher.plan("my-api", &ArtifactDigest::of(b"v1")).unwrap();
        assert_eq!(plan, PublishPlan::Create);
        assert_eq!(plan.change_kind(), Some(ChangeKind::Create));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_remote_failure_is_publish_phase() {
        let mock = MockBackend::new();
        mock.fail_on("CreateFunction", "AccessDeniedException");
        let retry = RetryConfig::default();
        let artifact = artifact(b"v1");
        let spec = function_spec(&settings(), artifact.digest());

        let err = FunctionPublisher::new(&mock, &retry)
            .publish(&spec, &artifact)
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Publish);
        assert_eq!(err.category(), Some(cloudkit::ErrorCategory::Auth));
    }
}
