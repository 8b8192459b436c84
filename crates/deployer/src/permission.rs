//! Invoke permission of the gateway on the function.

use crate::artifact::ArtifactDigest;
use crate::error::{InPhase, Phase, Result};
use crate::publisher::FunctionDescriptor;
use cloudkit::{ComputeBackend, InvokeGrant, PermissionStatement, RetryConfig, retrying};
use declarative::ApplyResult;

/// Action granted to the gateway.
pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";

/// Principal of the gateway service.
pub const GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";

/// Prefix of every statement id this tool creates.
pub const STATEMENT_PREFIX: &str = "Webda";

/// Length of an unpadded SHA-256 digest in base64.
const DIGEST_CHARS: usize = 43;

/// Statement id for a digest on an API.
///
/// Padding is dropped and the base64 characters the service rejects in
/// statement ids are mapped: `+` to `-`, `/` to `_`.
#[must_use]
pub fn statement_id(digest: &ArtifactDigest, api_id: &str) -> String {
    let digest: String = digest
        .unpadded()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    format!("{STATEMENT_PREFIX}{digest}{api_id}")
}

/// Whether `id` has the shape of a [`statement_id`] for `api_id`, for any digest.
#[must_use]
pub fn is_statement_for(id: &str, api_id: &str) -> bool {
    id.strip_prefix(STATEMENT_PREFIX)
        .and_then(|rest| rest.strip_suffix(api_id))
        .is_some_and(|digest| {
            digest.len() == DIGEST_CHARS
                && digest
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// What granting would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionPlan {
    /// Statement to add, `None` when it already exists.
    pub grant: Option<InvokeGrant>,
    /// Statements of earlier digests on the same API.
    pub stale: Vec<String>,
}

impl PermissionPlan {
    /// Whether applying the plan would change the policy.
    #[must_use]
    pub fn has_changes(&self, prune: bool) -> bool {
        self.grant.is_some() || (prune && !self.stale.is_empty())
    }
}

/// Ensures the gateway may invoke the function.
pub struct PermissionGrantor<'a> {
    backend: &'a dyn ComputeBackend,
    retry: &'a RetryConfig,
    prune_stale: bool,
}

impl<'a> PermissionGrantor<'a> {
    /// Create a grantor over a compute backend.
    pub fn new(backend: &'a dyn ComputeBackend, retry: &'a RetryConfig) -> Self {
        Self {
            backend,
            retry,
            prune_stale: false,
        }
    }

    /// Remove statements left by earlier digests after granting.
    pub fn prune_stale(mut self, prune: bool) -> Self {
        self.prune_stale = prune;
        self
    }

    /// Current statements of the function; a missing policy is empty.
    fn statements(&self, function: &str) -> Result<Vec<PermissionStatement>> {
        let policy = retrying(self.retry, || self.backend.get_policy(function))
            .in_phase(Phase::Permission)?;
        Ok(policy.unwrap_or_default())
    }

    /// Decide what granting would do. Read-only.
    pub fn plan(
        &self,
        function: &FunctionDescriptor,
        api_id: &str,
        digest: &ArtifactDigest,
    ) -> Result<PermissionPlan> {
        let statements = self.statements(&function.name)?;
        Ok(plan_statements(&statements, function, api_id, digest))
    }

    /// Grant the gateway invoke permission for `digest` on `api_id`.
    ///
    /// A statement already present under the derived id is left alone, so
    /// granting twice leaves exactly one statement.
    pub fn grant_invoke(
        &self,
        function: &FunctionDescriptor,
        api_id: &str,
        digest: &ArtifactDigest,
    ) -> Result<ApplyResult> {
        let plan = self.plan(function, api_id, digest)?;

        let mut result = ApplyResult::NoChange;
        if let Some(grant) = &plan.grant {
            log::info!(
                "Granting {GATEWAY_PRINCIPAL} invoke on {} ({})",
                function.name,
                grant.statement_id
            );
            retrying(self.retry, || self.backend.add_permission(&function.name, grant))
                .in_phase(Phase::Permission)?;
            result = ApplyResult::Created;
        } else {
            log::debug!("Invoke permission on {} already granted", function.name);
        }

        if self.prune_stale {
            for statement_id in &plan.stale {
                log::info!("Removing stale statement {statement_id} from {}", function.name);
                retrying(self.retry, || {
                    self.backend.remove_permission(&function.name, statement_id)
                })
                .in_phase(Phase::Permission)?;
                if result == ApplyResult::NoChange {
                    result = ApplyResult::Modified;
                }
            }
        } else if !plan.stale.is_empty() {
            log::debug!(
                "{} stale statement(s) kept on {}",
                plan.stale.len(),
                function.name
            );
        }
        Ok(result)
    }
}

fn plan_statements(
    statements: &[PermissionStatement],
    function: &FunctionDescriptor,
    api_id: &str,
    digest: &ArtifactDigest,
) -> PermissionPlan {
    let current = statement_id(digest, api_id);
    let grant = (!statements.iter().any(|s| s.statement_id == current)).then(|| InvokeGrant {
        statement_id: current.clone(),
        action: INVOKE_ACTION.to_string(),
        principal: GATEWAY_PRINCIPAL.to_string(),
        source_arn: function.arn.execute_api_source(api_id),
    });
    let stale = statements
        .iter()
        .map(|s| s.statement_id.as_str())
        .filter(|id| *id != current && is_statement_for(id, api_id))
        .map(str::to_string)
        .collect();
    PermissionPlan { grant, stale }
}
