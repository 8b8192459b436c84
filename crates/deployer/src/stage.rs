//! Named stage of the API.

use crate::error::{InPhase, Phase, Result};
use cloudkit::{GatewayBackend, RetryConfig, Stage, retrying};
use declarative::ApplyResult;

/// Ensures a stage exists for the deployment identifier.
///
/// An existing stage is returned as is; there is no update path.
pub struct StageDeployer<'a> {
    backend: &'a dyn GatewayBackend,
    retry: &'a RetryConfig,
}

impl<'a> StageDeployer<'a> {
    /// Create a stage deployer over a gateway backend.
    pub fn new(backend: &'a dyn GatewayBackend, retry: &'a RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Stage named `name`, if any. Read-only.
    pub fn find_stage(&self, api_id: &str, name: &str) -> Result<Option<Stage>> {
        let stages =
            retrying(self.retry, || self.backend.get_stages(api_id)).in_phase(Phase::Stage)?;
        Ok(stages.into_iter().find(|stage| stage.name == name))
    }

    /// Return the stage named `name`, deploying it if absent.
    pub fn ensure_stage(&self, api_id: &str, name: &str) -> Result<(Stage, ApplyResult)> {
        if let Some(stage) = self.find_stage(api_id, name)? {
            log::debug!("Stage {name} exists on API {api_id}");
            return Ok((stage, ApplyResult::NoChange));
        }
        log::info!("Deploying stage {name} on API {api_id}");
        let stage = retrying(self.retry, || self.backend.create_deployment(api_id, name))
            .in_phase(Phase::Stage)?;
        Ok((stage, ApplyResult::Created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudkit::MockBackend;

    #[test]
    fn test_missing_stage_is_deployed_once() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let retry = RetryConfig::default();
        let deployer = StageDeployer::new(&mock, &retry);

        let (stage, result) = deployer.ensure_stage(&api_id, "prod").unwrap();
        assert_eq!(result, ApplyResult::Created);
        assert_eq!(stage.name, "prod");
        assert!(stage.deployment_id.is_some());

        let (again, result) = deployer.ensure_stage(&api_id, "prod").unwrap();
        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(again, stage);
        assert_eq!(mock.call_count("CreateDeployment"), 1);
        assert_eq!(mock.stages(&api_id).len(), 1);
    }

    #[test]
    fn test_other_stages_do_not_match() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let retry = RetryConfig::default();
        let deployer = StageDeployer::new(&mock, &retry);

        deployer.ensure_stage(&api_id, "staging").unwrap();
        assert!(deployer.find_stage(&api_id, "prod").unwrap().is_none());
    }

    #[test]
    fn test_unknown_api_fails_in_stage_phase() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let err = StageDeployer::new(&mock, &retry)
            .ensure_stage("nope", "prod")
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Stage);
    }
}
