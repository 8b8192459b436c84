//! Deploy run sequencing.
//!
//! A run moves strictly forward through its phases:
//!
//! ```text
//! Init -> ArtifactInspected -> FunctionPublished -> ResourceTreeSynced
//!      -> StageDeployed -> PermissionGranted
//! ```
//!
//! The first failure ends the run in `Failed(phase)`. Nothing is retried
//! beyond the throttling policy of the settings, and nothing is rolled back.

use crate::artifact::{Artifact, ArtifactDigest, ArtifactInspector};
use crate::config::{DeploymentSettings, ResourceConfig};
use crate::error::{Error, Phase, Result};
use crate::permission::{PermissionGrantor, statement_id};
use crate::publisher::{FunctionDescriptor, FunctionPublisher, PublishPlan, function_spec};
use crate::routes::RouteTable;
use crate::stage::StageDeployer;
use crate::synchronizer::ResourceTreeSynchronizer;
use crate::tree::ResourceTree;
use cloudkit::{ComputeBackend, GatewayBackend, RestApi, Stage};
use declarative::{
    ApplyResult, Change, ChangeKind, DiffSummary, ExecuteSummary, NoProgress, ProgressCallback,
    compute_changes,
};
use std::fmt;
use std::path::PathBuf;

/// State of a deploy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    /// Nothing done yet.
    Init,
    /// The artifact was read and hashed.
    ArtifactInspected,
    /// The function runs the artifact.
    FunctionPublished,
    /// The resource tree mirrors the routes.
    ResourceTreeSynced,
    /// The stage exists.
    StageDeployed,
    /// Terminal success.
    PermissionGranted,
    /// Terminal failure in the given phase.
    Failed(Phase),
}

impl DeployState {
    /// Whether the run has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionGranted | Self::Failed(_))
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::ArtifactInspected => f.write_str("artifact inspected"),
            Self::FunctionPublished => f.write_str("function published"),
            Self::ResourceTreeSynced => f.write_str("resource tree synced"),
            Self::StageDeployed => f.write_str("stage deployed"),
            Self::PermissionGranted => f.write_str("permission granted"),
            Self::Failed(phase) => write!(f, "failed during {phase}"),
        }
    }
}

/// Everything a deploy run needs.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Raw deployment resources; validated before anything else.
    pub resources: ResourceConfig,
    /// Desired routes.
    pub routes: RouteTable,
    /// Path of the packaged artifact.
    pub artifact: PathBuf,
    /// Deployment identifier, used as the stage name.
    pub deployment: String,
    /// Rebuild found routes even when their methods match.
    pub force_rebind: bool,
}

impl DeployRequest {
    /// Create a request.
    pub fn new(
        resources: ResourceConfig,
        routes: RouteTable,
        artifact: impl Into<PathBuf>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            resources,
            routes,
            artifact: artifact.into(),
            deployment: deployment.into(),
            force_rebind: false,
        }
    }

    /// Set whether found routes are rebuilt unconditionally.
    #[must_use]
    pub fn force_rebind(mut self, force: bool) -> Self {
        self.force_rebind = force;
        self
    }

    /// Validate the request. No remote call is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for invalid resources or an empty
    /// deployment identifier.
    pub fn validate(&self) -> Result<DeploymentSettings> {
        let settings = self.resources.validate()?;
        if self.deployment.trim().is_empty() {
            return Err(Error::config("the deployment identifier must not be empty"));
        }
        Ok(settings)
    }
}

/// Outcome of a successful deploy run.
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Final state.
    pub state: DeployState,
    /// States the run went through, in order.
    pub transitions: Vec<DeployState>,
    /// Digest of the deployed artifact.
    pub digest: ArtifactDigest,
    /// The published function.
    pub function: FunctionDescriptor,
    /// The API the routes were converged on.
    pub api: RestApi,
    /// The deployment's stage.
    pub stage: Stage,
    /// Results of every applied step.
    pub summary: ExecuteSummary,
}

/// What a deploy run would change.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    /// Digest of the artifact.
    pub digest: ArtifactDigest,
    /// Id of the API, `None` when it would be created.
    pub api_id: Option<String>,
    /// Changes in execution order.
    pub changes: Vec<Change>,
}

impl DeployPlan {
    /// Change counts.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_changes(&self.changes)
    }

    /// Whether a deploy would change anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Capability of converging a deployment target.
pub trait Deployer {
    /// Run a deploy, reporting tree mutations to `progress`.
    ///
    /// # Errors
    ///
    /// Fails at the first rejected step; the error names the phase.
    fn deploy_with(
        &self,
        request: &DeployRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<DeployReport>;

    /// Run a deploy.
    fn deploy(&self, request: &DeployRequest) -> Result<DeployReport> {
        self.deploy_with(request, &mut NoProgress)
    }

    /// Report what [`Deployer::deploy`] would change, without mutating.
    fn plan(&self, request: &DeployRequest) -> Result<DeployPlan>;
}

/// Forward-only state tracking of one run.
struct Run {
    transitions: Vec<DeployState>,
}

impl Run {
    fn new() -> Self {
        Self {
            transitions: vec![DeployState::Init],
        }
    }

    fn state(&self) -> DeployState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(DeployState::Init)
    }

    fn advance(&mut self, next: DeployState) {
        log::info!("{} -> {next}", self.state());
        self.transitions.push(next);
    }
}

/// Deploys routes onto an API gateway backed by one compute function.
pub struct GatewayDeployer<B> {
    backend: B,
}

impl<B: ComputeBackend + GatewayBackend> GatewayDeployer<B> {
    /// Create a deployer over a backend serving both services.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn run(
        &self,
        request: &DeployRequest,
        progress: &mut dyn ProgressCallback,
        run: &mut Run,
    ) -> Result<DeployReport> {
        let settings = request.validate()?;
        let retry = &settings.retry;
        let mut summary = ExecuteSummary::default();

        let artifact = ArtifactInspector::inspect(&request.artifact)?;
        run.advance(DeployState::ArtifactInspected);

        let spec = function_spec(&settings, artifact.digest());
        let (function, result) = FunctionPublisher::new(&self.backend, retry).publish(&spec, &artifact)?;
        summary.add_result(&result);
        run.advance(DeployState::FunctionPublished);

        let outcome = ResourceTreeSynchronizer::new(&self.backend, retry)
            .force_rebind(request.force_rebind)
            .synchronize(
                &settings.rest_api_name,
                &request.routes,
                &function.invocation_arn,
                progress,
            )?;
        if outcome.api_created {
            summary.add_result(&ApplyResult::Created);
        }
        summary.merge(&outcome.summary);
        run.advance(DeployState::ResourceTreeSynced);

        let (stage, result) =
            StageDeployer::new(&self.backend, retry).ensure_stage(&outcome.api.id, &request.deployment)?;
        summary.add_result(&result);
        run.advance(DeployState::StageDeployed);

        let result = PermissionGrantor::new(&self.backend, retry)
            .prune_stale(settings.prune_stale_permissions)
            .grant_invoke(&function, &outcome.api.id, artifact.digest())?;
        summary.add_result(&result);
        run.advance(DeployState::PermissionGranted);

        Ok(DeployReport {
            state: run.state(),
            transitions: run.transitions.clone(),
            digest: artifact.digest().clone(),
            function,
            api: outcome.api,
            stage,
            summary,
        })
    }

    fn plan_function(
        &self,
        settings: &DeploymentSettings,
        artifact: &Artifact,
        changes: &mut Vec<Change>,
    ) -> Result<Option<FunctionDescriptor>> {
        let name = &settings.function_name;
        let plan = FunctionPublisher::new(&self.backend, &settings.retry).plan(name, artifact.digest())?;
        let remote = match &plan {
            PublishPlan::Unchanged(function) | PublishPlan::Update(function) => {
                Some(FunctionDescriptor::from_remote(function)?)
            }
            PublishPlan::Create => None,
        };
        if let Some(kind) = plan.change_kind() {
            let description = match kind {
                ChangeKind::Create => format!("create function {name}"),
                _ => format!("update function {name} to {}", artifact.digest()),
            };
            changes.push(Change::new(name.as_str(), "function", kind, description));
        }
        Ok(remote)
    }
}

impl<B: ComputeBackend + GatewayBackend> Deployer for GatewayDeployer<B> {
    fn deploy_with(
        &self,
        request: &DeployRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<DeployReport> {
        let mut run = Run::new();
        self.run(request, progress, &mut run).inspect_err(|err| {
            run.advance(DeployState::Failed(err.phase()));
            log::warn!("Deploy of {} stopped: {err}", request.deployment);
        })
    }

    fn plan(&self, request: &DeployRequest) -> Result<DeployPlan> {
        let settings = request.validate()?;
        let retry = &settings.retry;
        let artifact = ArtifactInspector::inspect(&request.artifact)?;
        let mut changes = Vec::new();

        let function = self.plan_function(&settings, &artifact, &mut changes)?;

        let synchronizer =
            ResourceTreeSynchronizer::new(&self.backend, retry).force_rebind(request.force_rebind);
        let api = synchronizer.find_api(&settings.rest_api_name)?;
        let mut tree = match &api {
            Some(api) => synchronizer.fetch_tree(&api.id)?,
            None => {
                changes.push(Change::new(
                    settings.rest_api_name.as_str(),
                    "api",
                    ChangeKind::Create,
                    format!("create API {}", settings.rest_api_name),
                ));
                ResourceTree::pending_root()
            }
        };
        let invocation_arn = function.as_ref().map(|f| f.invocation_arn.as_str());
        let mutations = synchronizer.plan(&mut tree, &request.routes, invocation_arn);
        changes.extend(compute_changes(&mutations));

        let stage_exists = match &api {
            Some(api) => StageDeployer::new(&self.backend, retry)
                .find_stage(&api.id, &request.deployment)?
                .is_some(),
            None => false,
        };
        if !stage_exists {
            changes.push(Change::new(
                request.deployment.as_str(),
                "stage",
                ChangeKind::Create,
                format!("deploy stage {}", request.deployment),
            ));
        }

        match (&function, &api) {
            (Some(function), Some(api)) => {
                let plan = PermissionGrantor::new(&self.backend, retry).plan(
                    function,
                    &api.id,
                    artifact.digest(),
                )?;
                if let Some(grant) = plan.grant {
                    changes.push(Change::new(
                        grant.statement_id.as_str(),
                        "permission",
                        ChangeKind::Create,
                        format!("grant invoke on {} to API {}", function.name, api.id),
                    ));
                }
                if settings.prune_stale_permissions {
                    changes.extend(plan.stale.iter().map(|id| {
                        Change::new(
                            id.as_str(),
                            "permission",
                            ChangeKind::Remove,
                            format!("remove stale statement {id}"),
                        )
                    }));
                }
            }
            _ => {
                let target = api.as_ref().map_or_else(
                    || settings.function_name.clone(),
                    |api| statement_id(artifact.digest(), &api.id),
                );
                changes.push(Change::new(
                    target,
                    "permission",
                    ChangeKind::Create,
                    format!("grant invoke on {}", settings.function_name),
                ));
            }
        }

        Ok(DeployPlan {
            digest: artifact.digest().clone(),
            api_id: api.map(|api| api.id),
            changes,
        })
    }
}
