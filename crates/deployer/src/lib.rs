//! # deployer
//!
//! Converges a declarative route table onto an API gateway backed by one
//! serverless function, without tearing anything down between runs.
//!
//! A deploy run:
//! 1. inspects the packaged artifact and computes its digest
//! 2. publishes the function, skipping the upload when the digest matches
//! 3. synchronizes the gateway's resource tree with the routes and wires
//!    every method to the function
//! 4. ensures the deployment's stage
//! 5. grants the gateway a digest-keyed invoke permission
//!
//! Every remote mutation runs through a [`declarative::SerialQueue`] or a
//! single call; nothing runs concurrently against the same API.
//!
//! ## Example
//!
//! ```
//! use cloudkit::MockBackend;
//! use deployer::{DeployRequest, Deployer, DesiredRoute, GatewayDeployer, ResourceConfig, RouteTable};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let artifact = dir.path().join("lambda.zip");
//! std::fs::write(&artifact, b"package").unwrap();
//!
//! let resources = ResourceConfig {
//!     rest_api_name: Some("my-api".to_string()),
//!     lambda_role_arn: Some("arn:aws:iam::123456789012:role/webda".to_string()),
//!     ..ResourceConfig::default()
//! };
//! let routes = RouteTable::new([DesiredRoute::new("/users", &["GET"]).unwrap()]);
//!
//! let deployer = GatewayDeployer::new(MockBackend::new());
//! let report = deployer
//!     .deploy(&DeployRequest::new(resources, routes, &artifact, "prod"))
//!     .unwrap();
//! assert_eq!(report.stage.name, "prod");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod mutation;
pub mod orchestrator;
pub mod permission;
pub mod publisher;
pub mod routes;
pub mod stage;
pub mod synchronizer;
pub mod tree;
pub mod wirer;

pub use artifact::{Artifact, ArtifactDigest, ArtifactInspector};
pub use config::{DeploymentSettings, ResourceConfig, RetrySettings};
pub use error::{Error, Phase, Result};
pub use mutation::Mutation;
pub use orchestrator::{DeployPlan, DeployReport, DeployRequest, DeployState, Deployer, GatewayDeployer};
pub use permission::{PermissionGrantor, PermissionPlan, is_statement_for, statement_id};
pub use publisher::{FunctionDescriptor, FunctionPublisher, PublishPlan};
pub use routes::{DesiredRoute, RouteTable};
pub use stage::StageDeployer;
pub use synchronizer::{ResourceTreeSynchronizer, SyncOutcome};
pub use tree::{ResourceTree, TreeEntry};
pub use wirer::MethodWirer;
