//! Core types for remote function and gateway state.
//!
//! These mirror what the remote services report, trimmed to the fields a
//! deployment reads or writes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Compute the code hash the compute service reports for a package.
///
/// SHA-256 of the bytes, standard base64 with padding.
///
/// # Example
///
/// ```
/// let digest = cloudkit::code_sha256(b"");
/// assert_eq!(digest, "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
/// ```
#[must_use]
pub fn code_sha256(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Static access keys, used instead of the default credential chain.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .finish()
    }
}

/// One page of a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Continuation token when more pages exist.
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A complete listing that fits in one page.
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// Whether the service reported more pages.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.next.is_some()
    }
}

// =============================================================================
// Compute
// =============================================================================

/// A compute function as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFunction {
    /// Function name.
    pub name: String,
    /// Unqualified function ARN.
    pub arn: String,
    /// Hash of the deployed code (see [`code_sha256`]).
    pub code_sha256: String,
    /// Memory size in MB.
    pub memory_size_mb: u32,
    /// Timeout in seconds.
    pub timeout_seconds: u32,
    /// Execution role ARN.
    pub role: String,
    /// Handler entry point.
    pub handler: Option<String>,
    /// Runtime identifier.
    pub runtime: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
}

/// Desired configuration of a compute function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name.
    pub name: String,
    /// Execution role ARN.
    pub role: String,
    /// Handler entry point.
    pub handler: String,
    /// Runtime identifier.
    pub runtime: String,
    /// Memory size in MB.
    pub memory_size_mb: u32,
    /// Timeout in seconds.
    pub timeout_seconds: u32,
    /// Description stored on the function.
    pub description: String,
}

/// One statement of a function's resource policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatement {
    /// Statement id (`Sid`).
    pub statement_id: String,
    /// Source ARN condition, when the statement has one.
    pub source_arn: Option<String>,
}

/// A permission to add to a function's resource policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeGrant {
    /// Statement id for the new statement.
    pub statement_id: String,
    /// Action granted (e.g. `lambda:InvokeFunction`).
    pub action: String,
    /// Service principal receiving the grant.
    pub principal: String,
    /// ARN the grant is scoped to.
    pub source_arn: String,
}

// =============================================================================
// Gateway
// =============================================================================

/// An API container on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestApi {
    /// API id.
    pub id: String,
    /// API name.
    pub name: String,
}

/// Wiring of one bound method, as a resource listing reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundMethod {
    /// Backend URI of the integration; `None` when the method has none.
    pub integration_uri: Option<String>,
    /// Status codes declared as method responses.
    pub method_responses: BTreeSet<String>,
    /// Status codes mapped by integration responses.
    pub integration_responses: BTreeSet<String>,
}

impl BoundMethod {
    /// Whether the method invokes `uri` and maps `status_code` both ways.
    #[must_use]
    pub fn is_wired_to(&self, uri: &str, status_code: &str) -> bool {
        self.integration_uri.as_deref() == Some(uri)
            && self.method_responses.contains(status_code)
            && self.integration_responses.contains(status_code)
    }
}

/// One path segment materialized on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResourceNode {
    /// Resource id.
    pub id: String,
    /// Absolute path (`/`, `/users`, `/users/{id}`).
    pub path: String,
    /// Parent resource id; `None` for the root.
    pub parent_id: Option<String>,
    /// HTTP methods currently bound on this resource, with their wiring.
    pub methods: BTreeMap<String, BoundMethod>,
}

impl RemoteResourceNode {
    /// Create a node with no bound methods.
    pub fn new(id: impl Into<String>, path: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            parent_id,
            methods: BTreeMap::new(),
        }
    }

    /// Whether this is the root resource.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Names of the bound methods.
    #[must_use]
    pub fn bound_methods(&self) -> BTreeSet<String> {
        self.methods.keys().cloned().collect()
    }
}

/// Integration types supported by the gateway, as far as deployments use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationKind {
    /// Service integration with request/response mapping templates.
    Aws,
    /// Service integration passing the raw request through.
    AwsProxy,
}

impl IntegrationKind {
    /// Wire name of the integration type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::AwsProxy => "AWS_PROXY",
        }
    }
}

/// Integration attached to a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSpec {
    /// Integration type.
    pub kind: IntegrationKind,
    /// HTTP method used to call the backend.
    pub integration_http_method: String,
    /// Backend URI (the function's invocation ARN).
    pub uri: String,
    /// Request mapping templates keyed by content type.
    pub request_templates: BTreeMap<String, String>,
}

/// A method response or integration response mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// HTTP status code.
    pub status_code: String,
    /// Models (method response) or templates (integration response) keyed by
    /// content type. An empty template passes the body through unchanged.
    pub mappings: BTreeMap<String, String>,
}

/// A deployed stage of an API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name.
    pub name: String,
    /// Deployment the stage points to.
    pub deployment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_sha256_is_padded_base64() {
        let digest = code_sha256(b"hello world");
        assert_eq!(digest, "uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=");
        assert_eq!(digest.len(), 44);
    }

    #[test]
    fn test_page_truncation() {
        let page = Page {
            items: vec![1, 2],
            next: Some("token".to_string()),
        };
        assert!(page.is_truncated());
        assert!(!Page::complete(vec![1]).is_truncated());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = StaticCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: Some("token".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("\"token\""));
    }

    #[test]
    fn test_root_node() {
        assert!(RemoteResourceNode::new("r", "/", None).is_root());
        assert!(!RemoteResourceNode::new("u", "/users", Some("r".into())).is_root());
    }

    #[test]
    fn test_bound_method_wiring() {
        let uri = "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/f/invocations";
        let mut method = BoundMethod {
            integration_uri: Some(uri.to_string()),
            method_responses: BTreeSet::from(["200".to_string()]),
            integration_responses: BTreeSet::new(),
        };
        assert!(!method.is_wired_to(uri, "200"));

        method.integration_responses.insert("200".to_string());
        assert!(method.is_wired_to(uri, "200"));
        assert!(!method.is_wired_to("other", "200"));
        assert!(!BoundMethod::default().is_wired_to(uri, "200"));
    }
}
