//! Backend traits for the remote compute and gateway services.
//!
//! The deployer only talks to the services through [`ComputeBackend`] and
//! [`GatewayBackend`]. Both are synchronous: an implementation backed by an
//! async client drives it to completion before returning.
//!
//! Implementations:
//! - [`MockBackend`]: in-memory, call-recording, for tests
//! - [`aws::AwsBackend`]: the AWS SDK (feature `aws`)
//!
//! # Testing
//!
//! ```
//! use cloudkit::backend::{GatewayBackend, MockBackend};
//!
//! let mock = MockBackend::new();
//! let api_id = mock.seed_rest_api("my-api");
//!
//! let page = mock.get_resources(&api_id, 500).unwrap();
//! assert_eq!(page.items.len(), 1);
//! assert_eq!(page.items[0].path, "/");
//! ```

#[cfg(feature = "aws")]
pub mod aws;
pub mod mock;

pub use mock::{Call, MockBackend};

use crate::error::Result;
use crate::types::{
    FunctionSpec, IntegrationSpec, InvokeGrant, Page, PermissionStatement, RemoteFunction,
    RemoteResourceNode, ResponseSpec, RestApi, Stage,
};

/// Serverless compute service.
pub trait ComputeBackend: Send + Sync {
    /// List functions (first page only).
    fn list_functions(&self) -> Result<Page<RemoteFunction>>;

    /// Create and publish a function from a code package.
    ///
    /// # Errors
    ///
    /// Fails with a conflict if a function with the same name exists.
    fn create_function(&self, spec: &FunctionSpec, code: &[u8]) -> Result<RemoteFunction>;

    /// Replace the code of an existing function.
    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<RemoteFunction>;

    /// Replace the configuration of an existing function.
    fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<RemoteFunction>;

    /// Fetch the statements of a function's resource policy.
    ///
    /// Returns `None` when the function has no policy.
    fn get_policy(&self, function: &str) -> Result<Option<Vec<PermissionStatement>>>;

    /// Add a statement to a function's resource policy.
    fn add_permission(&self, function: &str, grant: &InvokeGrant) -> Result<()>;

    /// Remove a statement from a function's resource policy.
    fn remove_permission(&self, function: &str, statement_id: &str) -> Result<()>;
}

/// HTTP API gateway service.
pub trait GatewayBackend: Send + Sync {
    /// List APIs (first page only).
    fn list_rest_apis(&self) -> Result<Page<RestApi>>;

    /// Create an API. The service creates its root resource `/`.
    fn create_rest_api(&self, name: &str, description: &str) -> Result<RestApi>;

    /// List up to `limit` resources of an API, with their bound methods.
    fn get_resources(&self, api_id: &str, limit: u32) -> Result<Page<RemoteResourceNode>>;

    /// Create a child resource under `parent_id`.
    fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<RemoteResourceNode>;

    /// Delete a resource together with its whole subtree.
    fn delete_resource(&self, api_id: &str, resource_id: &str) -> Result<()>;

    /// Bind an HTTP method on a resource.
    fn put_method(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        authorization: &str,
    ) -> Result<()>;

    /// Unbind an HTTP method, dropping its integration and responses.
    fn delete_method(&self, api_id: &str, resource_id: &str, http_method: &str) -> Result<()>;

    /// Attach a backend integration to a bound method.
    fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        integration: &IntegrationSpec,
    ) -> Result<()>;

    /// Declare a method response.
    fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()>;

    /// Map an integration result onto a method response.
    fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()>;

    /// List the stages of an API.
    fn get_stages(&self, api_id: &str) -> Result<Vec<Stage>>;

    /// Snapshot the current wiring into a deployment published as `stage_name`.
    fn create_deployment(&self, api_id: &str, stage_name: &str) -> Result<Stage>;
}
