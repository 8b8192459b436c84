//! # cloudkit
//!
//! Remote-service seam for deploying an HTTP API onto a serverless
//! function behind an API gateway.
//!
//! This crate provides:
//! - [`ComputeBackend`] and [`GatewayBackend`], the only way the deployer
//!   touches remote state
//! - Remote data types and the content hash the compute service reports
//! - An error taxonomy with retry categories, and a throttling-only retry
//!   helper
//! - [`MockBackend`], an in-memory backend that records every call
//! - `backend::aws::AwsBackend`, backed by the AWS SDK (feature `aws`)
//!
//! ## Example
//!
//! ```
//! use cloudkit::{ComputeBackend, FunctionSpec, MockBackend, code_sha256};
//!
//! let backend = MockBackend::new();
//! let spec = FunctionSpec {
//!     name: "my-api".to_string(),
//!     role: "arn:aws:iam::123456789012:role/webda".to_string(),
//!     handler: "entrypoint.handler".to_string(),
//!     runtime: "nodejs20.x".to_string(),
//!     memory_size_mb: 512,
//!     timeout_seconds: 3,
//!     description: "example".to_string(),
//! };
//!
//! let function = backend.create_function(&spec, b"package").unwrap();
//! assert_eq!(function.code_sha256, code_sha256(b"package"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arn;
pub mod backend;
pub mod error;
pub mod policy;
pub mod retry;
pub mod types;

pub use arn::{Arn, InvalidArn};
pub use backend::{Call, ComputeBackend, GatewayBackend, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use retry::{RetryCallback, RetryConfig, retrying, with_retry};
pub use types::{
    BoundMethod, FunctionSpec, IntegrationKind, IntegrationSpec, InvokeGrant, Page,
    PermissionStatement, RemoteFunction, RemoteResourceNode, ResponseSpec, RestApi, Stage, StaticCredentials,
    code_sha256,
};
