//! AWS SDK backend (Lambda + API Gateway).
//!
//! The SDK is async; [`AwsBackend`] owns a current-thread runtime and
//! blocks on every call, so callers see the same synchronous seam as the
//! mock. Service errors keep their error code so [`ErrorCategory`] can
//! classify them.
//!
//! [`ErrorCategory`]: crate::ErrorCategory

use crate::backend::{ComputeBackend, GatewayBackend};
use crate::error::{Error, Result};
use crate::policy::parse_policy;
use crate::types::{
    BoundMethod, FunctionSpec, IntegrationSpec, InvokeGrant, Page, PermissionStatement, RemoteFunction,
    RemoteResourceNode, ResponseSpec, RestApi, Stage, StaticCredentials,
};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionCode, LastUpdateStatus, Runtime, State};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::time::Duration;

/// Page size requested from listing calls.
const LIST_PAGE_SIZE: i32 = 50;

/// How long to wait for a function update to settle.
const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const UPDATE_POLL_ATTEMPTS: u32 = 120;

/// Remote backend talking to the AWS APIs.
///
/// # Example
///
/// ```no_run
/// use cloudkit::backend::aws::AwsBackend;
/// use cloudkit::backend::GatewayBackend;
///
/// let backend = AwsBackend::connect(Some("us-east-1"), None).unwrap();
/// let apis = backend.list_rest_apis().unwrap();
/// println!("{} APIs", apis.items.len());
/// ```
pub struct AwsBackend {
    runtime: tokio::runtime::Runtime,
    lambda: aws_sdk_lambda::Client,
    gateway: aws_sdk_apigateway::Client,
}

impl AwsBackend {
    /// Resolve configuration and build the service clients.
    ///
    /// `region` and `credentials` override the default provider chain
    /// (environment, profile, instance metadata).
    pub fn connect(region: Option<&str>, credentials: Option<&StaticCredentials>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(creds) = credentials {
            loader = loader.credentials_provider(aws_sdk_lambda::config::Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                "webda-deploy",
            ));
        }
        let sdk_config = runtime.block_on(loader.load());
        log::debug!(
            "AWS region: {}",
            sdk_config
                .region()
                .map_or("<unset>", |r| r.as_ref())
        );

        Ok(Self {
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            gateway: aws_sdk_apigateway::Client::new(&sdk_config),
            runtime,
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Wait until a function accepts further updates.
    ///
    /// The service rejects a configuration update while a code update is
    /// still being applied.
    async fn wait_until_settled(&self, name: &str) -> Result<()> {
        for _ in 0..UPDATE_POLL_ATTEMPTS {
            let config = self
                .lambda
                .get_function_configuration()
                .function_name(name)
                .send()
                .await
                .map_err(|e| remote_error("GetFunctionConfiguration", e))?;

            let pending = matches!(config.state(), Some(State::Pending))
                || matches!(config.last_update_status(), Some(LastUpdateStatus::InProgress));
            if !pending {
                return Ok(());
            }
            log::debug!("waiting for function {name} to settle");
            tokio::time::sleep(UPDATE_POLL_INTERVAL).await;
        }
        Err(Error::Other(format!(
            "function {name} did not settle after {UPDATE_POLL_ATTEMPTS} polls"
        )))
    }
}

/// Convert an SDK error, keeping the service error code.
fn remote_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_string);
    Error::remote(operation, code, message)
}

/// Wiring of a method embedded in a resource listing.
fn listed_method(method: &aws_sdk_apigateway::types::Method) -> BoundMethod {
    fn codes<V>(responses: Option<&HashMap<String, V>>) -> BTreeSet<String> {
        responses
            .map(|responses| responses.keys().cloned().collect())
            .unwrap_or_default()
    }
    let integration = method.method_integration();
    BoundMethod {
        integration_uri: integration.and_then(|i| i.uri()).map(str::to_string),
        method_responses: codes(method.method_responses()),
        integration_responses: codes(integration.and_then(|i| i.integration_responses())),
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or_default()
}

/// Build a [`RemoteFunction`] from any of the SDK's function configuration
/// shapes; they share accessor names but not a type.
macro_rules! remote_function {
    ($operation:literal, $out:expr) => {{
        let out = $out;
        RemoteFunction {
            name: out
                .function_name()
                .ok_or(Error::MissingField {
                    operation: $operation,
                    field: "FunctionName",
                })?
                .to_string(),
            arn: out
                .function_arn()
                .ok_or(Error::MissingField {
                    operation: $operation,
                    field: "FunctionArn",
                })?
                .to_string(),
            code_sha256: out
                .code_sha256()
                .ok_or(Error::MissingField {
                    operation: $operation,
                    field: "CodeSha256",
                })?
                .to_string(),
            memory_size_mb: to_u32(out.memory_size()),
            timeout_seconds: to_u32(out.timeout()),
            role: out.role().unwrap_or_default().to_string(),
            handler: out.handler().map(str::to_string),
            runtime: out.runtime().map(|r| r.as_str().to_string()),
            description: out.description().map(str::to_string),
        }
    }};
}

impl ComputeBackend for AwsBackend {
    fn list_functions(&self) -> Result<Page<RemoteFunction>> {
        self.block_on(async {
            let out = self
                .lambda
                .list_functions()
                .max_items(LIST_PAGE_SIZE)
                .send()
                .await
                .map_err(|e| remote_error("ListFunctions", e))?;

            let items = out
                .functions()
                .iter()
                .map(|f| -> Result<RemoteFunction> { Ok(remote_function!("ListFunctions", f)) })
                .collect::<Result<Vec<_>>>()?;
            Ok(Page {
                items,
                next: out.next_marker().map(str::to_string),
            })
        })
    }

    fn create_function(&self, spec: &FunctionSpec, code: &[u8]) -> Result<RemoteFunction> {
        self.block_on(async {
            let out = self
                .lambda
                .create_function()
                .function_name(&spec.name)
                .role(&spec.role)
                .handler(&spec.handler)
                .runtime(Runtime::from(spec.runtime.as_str()))
                .memory_size(to_i32(spec.memory_size_mb))
                .timeout(to_i32(spec.timeout_seconds))
                .description(&spec.description)
                .publish(true)
                .code(FunctionCode::builder().zip_file(Blob::new(code)).build())
                .send()
                .await
                .map_err(|e| remote_error("CreateFunction", e))?;
            Ok(remote_function!("CreateFunction", &out))
        })
    }

    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<RemoteFunction> {
        self.block_on(async {
            let out = self
                .lambda
                .update_function_code()
                .function_name(name)
                .zip_file(Blob::new(code))
                .publish(true)
                .send()
                .await
                .map_err(|e| remote_error("UpdateFunctionCode", e))?;
            Ok(remote_function!("UpdateFunctionCode", &out))
        })
    }

    fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<RemoteFunction> {
        self.block_on(async {
            self.wait_until_settled(&spec.name).await?;
            let out = self
                .lambda
                .update_function_configuration()
                .function_name(&spec.name)
                .role(&spec.role)
                .handler(&spec.handler)
                .runtime(Runtime::from(spec.runtime.as_str()))
                .memory_size(to_i32(spec.memory_size_mb))
                .timeout(to_i32(spec.timeout_seconds))
                .description(&spec.description)
                .send()
                .await
                .map_err(|e| remote_error("UpdateFunctionConfiguration", e))?;
            Ok(remote_function!("UpdateFunctionConfiguration", &out))
        })
    }

    fn get_policy(&self, function: &str) -> Result<Option<Vec<PermissionStatement>>> {
        self.block_on(async {
            match self.lambda.get_policy().function_name(function).send().await {
                Ok(out) => match out.policy() {
                    Some(document) => parse_policy(function, document).map(Some),
                    None => Ok(None),
                },
                // A function without a policy reports the policy as missing
                Err(e) if e.code() == Some("ResourceNotFoundException") => Ok(None),
                Err(e) => Err(remote_error("GetPolicy", e)),
            }
        })
    }

    fn add_permission(&self, function: &str, grant: &InvokeGrant) -> Result<()> {
        self.block_on(async {
            self.lambda
                .add_permission()
                .function_name(function)
                .statement_id(&grant.statement_id)
                .action(&grant.action)
                .principal(&grant.principal)
                .source_arn(&grant.source_arn)
                .send()
                .await
                .map_err(|e| remote_error("AddPermission", e))?;
            Ok(())
        })
    }

    fn remove_permission(&self, function: &str, statement_id: &str) -> Result<()> {
        self.block_on(async {
            self.lambda
                .remove_permission()
                .function_name(function)
                .statement_id(statement_id)
                .send()
                .await
                .map_err(|e| remote_error("RemovePermission", e))?;
            Ok(())
        })
    }
}

impl GatewayBackend for AwsBackend {
    fn list_rest_apis(&self) -> Result<Page<RestApi>> {
        self.block_on(async {
            let out = self
                .gateway
                .get_rest_apis()
                .limit(500)
                .send()
                .await
                .map_err(|e| remote_error("GetRestApis", e))?;

            let items = out
                .items()
                .iter()
                .filter_map(|api| {
                    Some(RestApi {
                        id: api.id()?.to_string(),
                        name: api.name().unwrap_or_default().to_string(),
                    })
                })
                .collect();
            Ok(Page {
                items,
                next: out.position().map(str::to_string),
            })
        })
    }

    fn create_rest_api(&self, name: &str, description: &str) -> Result<RestApi> {
        self.block_on(async {
            let out = self
                .gateway
                .create_rest_api()
                .name(name)
                .description(description)
                .send()
                .await
                .map_err(|e| remote_error("CreateRestApi", e))?;
            Ok(RestApi {
                id: out
                    .id()
                    .ok_or(Error::MissingField {
                        operation: "CreateRestApi",
                        field: "id",
                    })?
                    .to_string(),
                name: out.name().unwrap_or(name).to_string(),
            })
        })
    }

    fn get_resources(&self, api_id: &str, limit: u32) -> Result<Page<RemoteResourceNode>> {
        self.block_on(async {
            let out = self
                .gateway
                .get_resources()
                .rest_api_id(api_id)
                .limit(to_i32(limit))
                .embed("methods")
                .send()
                .await
                .map_err(|e| remote_error("GetResources", e))?;

            let items = out
                .items()
                .iter()
                .filter_map(|resource| {
                    let methods = resource
                        .resource_methods()
                        .map(|methods| {
                            methods
                                .iter()
                                .map(|(name, method)| (name.clone(), listed_method(method)))
                                .collect()
                        })
                        .unwrap_or_default();
                    Some(RemoteResourceNode {
                        id: resource.id()?.to_string(),
                        path: resource.path()?.to_string(),
                        parent_id: resource.parent_id().map(str::to_string),
                        methods,
                    })
                })
                .collect();
            Ok(Page {
                items,
                next: out.position().map(str::to_string),
            })
        })
    }

    fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<RemoteResourceNode> {
        self.block_on(async {
            let out = self
                .gateway
                .create_resource()
                .rest_api_id(api_id)
                .parent_id(parent_id)
                .path_part(path_part)
                .send()
                .await
                .map_err(|e| remote_error("CreateResource", e))?;
            let missing = |field| Error::MissingField {
                operation: "CreateResource",
                field,
            };
            Ok(RemoteResourceNode::new(
                out.id().ok_or_else(|| missing("id"))?,
                out.path().ok_or_else(|| missing("path"))?,
                Some(parent_id.to_string()),
            ))
        })
    }

    fn delete_resource(&self, api_id: &str, resource_id: &str) -> Result<()> {
        self.block_on(async {
            self.gateway
                .delete_resource()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .send()
                .await
                .map_err(|e| remote_error("DeleteResource", e))?;
            Ok(())
        })
    }

    fn put_method(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        authorization: &str,
    ) -> Result<()> {
        self.block_on(async {
            self.gateway
                .put_method()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .http_method(http_method)
                .authorization_type(authorization)
                .send()
                .await
                .map_err(|e| remote_error("PutMethod", e))?;
            Ok(())
        })
    }

    fn delete_method(&self, api_id: &str, resource_id: &str, http_method: &str) -> Result<()> {
        self.block_on(async {
            self.gateway
                .delete_method()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .http_method(http_method)
                .send()
                .await
                .map_err(|e| remote_error("DeleteMethod", e))?;
            Ok(())
        })
    }

    fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        integration: &IntegrationSpec,
    ) -> Result<()> {
        let templates: HashMap<String, String> = integration
            .request_templates
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.block_on(async {
            self.gateway
                .put_integration()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .http_method(http_method)
                .r#type(aws_sdk_apigateway::types::IntegrationType::from(
                    integration.kind.as_str(),
                ))
                .integration_http_method(&integration.integration_http_method)
                .uri(&integration.uri)
                .set_request_templates(Some(templates))
                .send()
                .await
                .map_err(|e| remote_error("PutIntegration", e))?;
            Ok(())
        })
    }

    fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()> {
        let models: HashMap<String, String> = response
            .mappings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.block_on(async {
            self.gateway
                .put_method_response()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .http_method(http_method)
                .status_code(&response.status_code)
                .set_response_models(Some(models))
                .send()
                .await
                .map_err(|e| remote_error("PutMethodResponse", e))?;
            Ok(())
        })
    }

    fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()> {
        let templates: HashMap<String, String> = response
            .mappings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.block_on(async {
            self.gateway
                .put_integration_response()
                .rest_api_id(api_id)
                .resource_id(resource_id)
                .http_method(http_method)
                .status_code(&response.status_code)
                .set_response_templates(Some(templates))
                .send()
                .await
                .map_err(|e| remote_error("PutIntegrationResponse", e))?;
            Ok(())
        })
    }

    fn get_stages(&self, api_id: &str) -> Result<Vec<Stage>> {
        self.block_on(async {
            let out = self
                .gateway
                .get_stages()
                .rest_api_id(api_id)
                .send()
                .await
                .map_err(|e| remote_error("GetStages", e))?;
            Ok(out
                .item()
                .iter()
                .filter_map(|stage| {
                    Some(Stage {
                        name: stage.stage_name()?.to_string(),
                        deployment_id: stage.deployment_id().map(str::to_string),
                    })
                })
                .collect())
        })
    }

    fn create_deployment(&self, api_id: &str, stage_name: &str) -> Result<Stage> {
        self.block_on(async {
            let out = self
                .gateway
                .create_deployment()
                .rest_api_id(api_id)
                .stage_name(stage_name)
                .send()
                .await
                .map_err(|e| remote_error("CreateDeployment", e))?;
            Ok(Stage {
                name: stage_name.to_string(),
                deployment_id: out.id().map(str::to_string),
            })
        })
    }
}
