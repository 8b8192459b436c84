//! In-memory backend for testing without network access.
//!
//! [`MockBackend`] behaves like the remote services where the deployer
//! depends on it: duplicate creations conflict, deleting a resource drops
//! its subtree, a missing policy is reported as `None`. Every call is
//! recorded so tests can assert on exactly which calls were made and in
//! which order.

use crate::backend::{ComputeBackend, GatewayBackend};
use crate::error::{Error, Result};
use crate::types::{
    BoundMethod, FunctionSpec, IntegrationSpec, InvokeGrant, Page, PermissionStatement, RemoteFunction,
    RemoteResourceNode, ResponseSpec, RestApi, Stage, code_sha256,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Region reported in mock ARNs.
pub const MOCK_REGION: &str = "us-east-1";

/// Account reported in mock ARNs.
pub const MOCK_ACCOUNT: &str = "123456789012";

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Service operation name (`CreateResource`, `PutMethod`, ...).
    pub operation: &'static str,
    /// What the call acted on, e.g. `/users GET`.
    pub target: String,
}

impl Call {
    /// Whether the call changes remote state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !(self.operation.starts_with("List") || self.operation.starts_with("Get"))
    }
}

/// Wiring of one bound method.
#[derive(Debug, Clone, Default)]
struct MockMethod {
    authorization: String,
    integration: Option<IntegrationSpec>,
    method_responses: BTreeMap<String, ResponseSpec>,
    integration_responses: BTreeMap<String, ResponseSpec>,
}

impl MockMethod {
    fn listed(&self) -> BoundMethod {
        BoundMethod {
            integration_uri: self.integration.as_ref().map(|i| i.uri.clone()),
            method_responses: self.method_responses.keys().cloned().collect(),
            integration_responses: self.integration_responses.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct MockResource {
    node: RemoteResourceNode,
    methods: BTreeMap<String, MockMethod>,
}

impl MockResource {
    /// The node as a resource listing reports it.
    fn listed(&self) -> RemoteResourceNode {
        RemoteResourceNode {
            methods: self
                .methods
                .iter()
                .map(|(name, method)| (name.clone(), method.listed()))
                .collect(),
            ..self.node.clone()
        }
    }
}

#[derive(Debug)]
struct MockApi {
    api: RestApi,
    resources: BTreeMap<String, MockResource>,
    stages: Vec<Stage>,
}

impl MockApi {
    fn resource_by_path(&self, path: &str) -> Option<&MockResource> {
        self.resources.values().find(|r| r.node.path == path)
    }

    fn resource(&mut self, operation: &'static str, id: &str) -> Result<&mut MockResource> {
        self.resources
            .get_mut(id)
            .ok_or_else(|| Error::not_found(operation, "Invalid Resource identifier specified"))
    }
}

#[derive(Debug)]
enum Failure {
    Always(String),
    Throttle(u32),
}

#[derive(Debug, Default)]
struct MockState {
    functions: BTreeMap<String, RemoteFunction>,
    policies: HashMap<String, Vec<PermissionStatement>>,
    apis: Vec<MockApi>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, Failure>,
    page_size: Option<usize>,
    next_id: u64,
}

impl MockState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    /// Record a call and apply any injected failure for its operation.
    fn record(&mut self, operation: &'static str, target: impl Into<String>) -> Result<()> {
        self.calls.push(Call {
            operation,
            target: target.into(),
        });

        match self.failures.get_mut(operation) {
            Some(Failure::Always(code)) => Err(Error::remote(
                operation,
                Some(code.clone()),
                "injected failure",
            )),
            Some(Failure::Throttle(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::remote(
                    operation,
                    Some("TooManyRequestsException"),
                    "Too Many Requests",
                ))
            }
            _ => Ok(()),
        }
    }

    fn api(&mut self, operation: &'static str, api_id: &str) -> Result<&mut MockApi> {
        self.apis
            .iter_mut()
            .find(|a| a.api.id == api_id)
            .ok_or_else(|| Error::not_found(operation, "Invalid API identifier specified"))
    }

    fn paged<T: Clone>(&self, items: Vec<T>, limit: Option<usize>) -> Page<T> {
        let size = match (self.page_size, limit) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => usize::MAX,
        };
        if items.len() > size {
            Page {
                items: items[..size].to_vec(),
                next: Some(format!("page-{size}")),
            }
        } else {
            Page::complete(items)
        }
    }

    fn path_of(&self, api_id: &str, resource_id: &str) -> String {
        self.apis
            .iter()
            .find(|a| a.api.id == api_id)
            .and_then(|a| a.resources.get(resource_id))
            .map_or_else(|| resource_id.to_string(), |r| r.node.path.clone())
    }

    fn insert_api(&mut self, name: &str) -> RestApi {
        let api = RestApi {
            id: self.new_id("api"),
            name: name.to_string(),
        };
        let root_id = self.new_id("res");
        let mut resources = BTreeMap::new();
        resources.insert(
            root_id.clone(),
            MockResource {
                node: RemoteResourceNode::new(root_id, "/", None),
                methods: BTreeMap::new(),
            },
        );
        self.apis.push(MockApi {
            api: api.clone(),
            resources,
            stages: Vec::new(),
        });
        api
    }

    fn remote_function(&self, spec: &FunctionSpec, code: &[u8]) -> RemoteFunction {
        RemoteFunction {
            name: spec.name.clone(),
            arn: mock_function_arn(&spec.name),
            code_sha256: code_sha256(code),
            memory_size_mb: spec.memory_size_mb,
            timeout_seconds: spec.timeout_seconds,
            role: spec.role.clone(),
            handler: Some(spec.handler.clone()),
            runtime: Some(spec.runtime.clone()),
            description: Some(spec.description.clone()),
        }
    }
}

/// ARN the mock assigns to a function.
#[must_use]
pub fn mock_function_arn(name: &str) -> String {
    format!("arn:aws:lambda:{MOCK_REGION}:{MOCK_ACCOUNT}:function:{name}")
}

fn child_path(parent: &str, part: &str) -> String {
    if parent == "/" {
        format!("/{part}")
    } else {
        format!("{parent}/{part}")
    }
}

/// Mock backend implementing both services in memory.
///
/// Clones share state, so one mock can be handed to the code under test
/// while the test keeps a handle for seeding and inspection.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Seed a function as if it had been deployed with `code`.
    pub fn seed_function(&self, spec: &FunctionSpec, code: &[u8]) -> RemoteFunction {
        let mut state = self.state();
        let function = state.remote_function(spec, code);
        state
            .functions
            .insert(function.name.clone(), function.clone());
        function
    }

    /// Seed a permission statement on a function's policy.
    pub fn seed_statement(&self, function: &str, statement_id: &str, source_arn: Option<&str>) {
        self.state()
            .policies
            .entry(function.to_string())
            .or_default()
            .push(PermissionStatement {
                statement_id: statement_id.to_string(),
                source_arn: source_arn.map(str::to_string),
            });
    }

    /// Seed an API with its root resource. Returns the API id.
    pub fn seed_rest_api(&self, name: &str) -> String {
        self.state().insert_api(name).id
    }

    /// Seed a resource (and any missing ancestors) with bound methods.
    ///
    /// Returns the resource id.
    pub fn seed_resource(&self, api_id: &str, path: &str, methods: &[&str]) -> Result<String> {
        let mut state = self.state();
        let mut current = "/".to_string();
        let mut current_id = state
            .api("SeedResource", api_id)?
            .resource_by_path("/")
            .map(|r| r.node.id.clone())
            .ok_or_else(|| Error::Other("seeded API has no root".to_string()))?;

        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = child_path(&current, part);
            let existing = state
                .api("SeedResource", api_id)?
                .resource_by_path(&current)
                .map(|r| r.node.id.clone());
            current_id = match existing {
                Some(id) => id,
                None => {
                    let id = state.new_id("res");
                    let node = RemoteResourceNode::new(id.clone(), current.clone(), Some(current_id));
                    state.api("SeedResource", api_id)?.resources.insert(
                        id.clone(),
                        MockResource {
                            node,
                            methods: BTreeMap::new(),
                        },
                    );
                    id
                }
            };
        }

        let resource = state
            .api("SeedResource", api_id)?
            .resource("SeedResource", &current_id)?;
        for method in methods {
            resource.methods.insert(
                (*method).to_string(),
                MockMethod {
                    authorization: "NONE".to_string(),
                    ..MockMethod::default()
                },
            );
        }
        Ok(current_id)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Make every call to `operation` fail with the given service error code.
    pub fn fail_on(&self, operation: &'static str, code: &str) {
        self.state()
            .failures
            .insert(operation, Failure::Always(code.to_string()));
    }

    /// Make the next `times` calls to `operation` fail as throttled.
    pub fn throttle(&self, operation: &'static str, times: u32) {
        self.state()
            .failures
            .insert(operation, Failure::Throttle(times));
    }

    /// Cap every listing at `size` items, reporting more pages beyond it.
    pub fn set_page_size(&self, size: usize) {
        self.state().page_size = Some(size);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded calls that change remote state, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Number of recorded calls to `operation`.
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Id of the first API with the given name.
    #[must_use]
    pub fn api_id(&self, name: &str) -> Option<String> {
        self.state()
            .apis
            .iter()
            .find(|a| a.api.name == name)
            .map(|a| a.api.id.clone())
    }

    /// Number of APIs with the given name.
    #[must_use]
    pub fn api_count(&self, name: &str) -> usize {
        self.state()
            .apis
            .iter()
            .filter(|a| a.api.name == name)
            .count()
    }

    /// Sorted paths of every resource of an API.
    #[must_use]
    pub fn resource_paths(&self, api_id: &str) -> Vec<String> {
        let state = self.state();
        let mut paths: Vec<String> = state
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .map(|a| a.resources.values().map(|r| r.node.path.clone()).collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Resource at `path`, if any.
    #[must_use]
    pub fn resource(&self, api_id: &str, path: &str) -> Option<RemoteResourceNode> {
        self.state()
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .and_then(|a| a.resource_by_path(path))
            .map(MockResource::listed)
    }

    /// Methods bound on the resource at `path`.
    #[must_use]
    pub fn bound_methods(&self, api_id: &str, path: &str) -> BTreeSet<String> {
        self.resource(api_id, path)
            .map(|n| n.bound_methods())
            .unwrap_or_default()
    }

    fn method(&self, api_id: &str, path: &str, http_method: &str) -> Option<MockMethod> {
        self.state()
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .and_then(|a| a.resource_by_path(path))
            .and_then(|r| r.methods.get(http_method).cloned())
    }

    /// Authorization type of a bound method.
    #[must_use]
    pub fn authorization(&self, api_id: &str, path: &str, http_method: &str) -> Option<String> {
        self.method(api_id, path, http_method)
            .map(|m| m.authorization)
    }

    /// Integration attached to a bound method.
    #[must_use]
    pub fn integration(
        &self,
        api_id: &str,
        path: &str,
        http_method: &str,
    ) -> Option<IntegrationSpec> {
        self.method(api_id, path, http_method)
            .and_then(|m| m.integration)
    }

    /// Method response for a status code.
    #[must_use]
    pub fn method_response(
        &self,
        api_id: &str,
        path: &str,
        http_method: &str,
        status: &str,
    ) -> Option<ResponseSpec> {
        self.method(api_id, path, http_method)
            .and_then(|m| m.method_responses.get(status).cloned())
    }

    /// Integration response for a status code.
    #[must_use]
    pub fn integration_response(
        &self,
        api_id: &str,
        path: &str,
        http_method: &str,
        status: &str,
    ) -> Option<ResponseSpec> {
        self.method(api_id, path, http_method)
            .and_then(|m| m.integration_responses.get(status).cloned())
    }

    /// Statements on a function's policy.
    #[must_use]
    pub fn statements(&self, function: &str) -> Vec<PermissionStatement> {
        self.state()
            .policies
            .get(function)
            .cloned()
            .unwrap_or_default()
    }

    /// Stages of an API.
    #[must_use]
    pub fn stages(&self, api_id: &str) -> Vec<Stage> {
        self.state()
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .map(|a| a.stages.clone())
            .unwrap_or_default()
    }

    /// Function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<RemoteFunction> {
        self.state().functions.get(name).cloned()
    }
}

impl ComputeBackend for MockBackend {
    fn list_functions(&self) -> Result<Page<RemoteFunction>> {
        let mut state = self.state();
        state.record("ListFunctions", "")?;
        let items: Vec<RemoteFunction> = state.functions.values().cloned().collect();
        Ok(state.paged(items, None))
    }

    fn create_function(&self, spec: &FunctionSpec, code: &[u8]) -> Result<RemoteFunction> {
        let mut state = self.state();
        state.record("CreateFunction", &spec.name)?;
        if state.functions.contains_key(&spec.name) {
            return Err(Error::remote(
                "CreateFunction",
                Some("ResourceConflictException"),
                format!("Function already exist: {}", spec.name),
            ));
        }
        let function = state.remote_function(spec, code);
        state
            .functions
            .insert(function.name.clone(), function.clone());
        Ok(function)
    }

    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<RemoteFunction> {
        let mut state = self.state();
        state.record("UpdateFunctionCode", name)?;
        let function = state.functions.get_mut(name).ok_or_else(|| {
            Error::remote(
                "UpdateFunctionCode",
                Some("ResourceNotFoundException"),
                format!("Function not found: {name}"),
            )
        })?;
        function.code_sha256 = code_sha256(code);
        Ok(function.clone())
    }

    fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<RemoteFunction> {
        let mut state = self.state();
        state.record("UpdateFunctionConfiguration", &spec.name)?;
        let function = state.functions.get_mut(&spec.name).ok_or_else(|| {
            Error::remote(
                "UpdateFunctionConfiguration",
                Some("ResourceNotFoundException"),
                format!("Function not found: {}", spec.name),
            )
        })?;
        function.memory_size_mb = spec.memory_size_mb;
        function.timeout_seconds = spec.timeout_seconds;
        function.role = spec.role.clone();
        function.handler = Some(spec.handler.clone());
        function.runtime = Some(spec.runtime.clone());
        function.description = Some(spec.description.clone());
        Ok(function.clone())
    }

    fn get_policy(&self, function: &str) -> Result<Option<Vec<PermissionStatement>>> {
        let mut state = self.state();
        state.record("GetPolicy", function)?;
        if !state.functions.contains_key(function) {
            return Err(Error::remote(
                "GetPolicy",
                Some("ResourceNotFoundException"),
                format!("Function not found: {function}"),
            ));
        }
        Ok(state
            .policies
            .get(function)
            .filter(|statements| !statements.is_empty())
            .cloned())
    }

    fn add_permission(&self, function: &str, grant: &InvokeGrant) -> Result<()> {
        let mut state = self.state();
        state.record("AddPermission", format!("{function} {}", grant.statement_id))?;
        if !state.functions.contains_key(function) {
            return Err(Error::remote(
                "AddPermission",
                Some("ResourceNotFoundException"),
                format!("Function not found: {function}"),
            ));
        }
        let statements = state.policies.entry(function.to_string()).or_default();
        if statements
            .iter()
            .any(|s| s.statement_id == grant.statement_id)
        {
            return Err(Error::remote(
                "AddPermission",
                Some("ResourceConflictException"),
                format!(
                    "The statement id ({}) provided already exists",
                    grant.statement_id
                ),
            ));
        }
        statements.push(PermissionStatement {
            statement_id: grant.statement_id.clone(),
            source_arn: Some(grant.source_arn.clone()),
        });
        Ok(())
    }

    fn remove_permission(&self, function: &str, statement_id: &str) -> Result<()> {
        let mut state = self.state();
        state.record("RemovePermission", format!("{function} {statement_id}"))?;
        let statements = state.policies.entry(function.to_string()).or_default();
        let before = statements.len();
        statements.retain(|s| s.statement_id != statement_id);
        if statements.len() == before {
            return Err(Error::remote(
                "RemovePermission",
                Some("ResourceNotFoundException"),
                format!("Statement {statement_id} is not found in resource policy"),
            ));
        }
        Ok(())
    }
}

impl GatewayBackend for MockBackend {
    fn list_rest_apis(&self) -> Result<Page<RestApi>> {
        let mut state = self.state();
        state.record("GetRestApis", "")?;
        let items: Vec<RestApi> = state.apis.iter().map(|a| a.api.clone()).collect();
        Ok(state.paged(items, None))
    }

    fn create_rest_api(&self, name: &str, _description: &str) -> Result<RestApi> {
        let mut state = self.state();
        state.record("CreateRestApi", name)?;
        Ok(state.insert_api(name))
    }

    fn get_resources(&self, api_id: &str, limit: u32) -> Result<Page<RemoteResourceNode>> {
        let mut state = self.state();
        state.record("GetResources", api_id)?;
        let mut items: Vec<RemoteResourceNode> = state
            .api("GetResources", api_id)?
            .resources
            .values()
            .map(MockResource::listed)
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(state.paged(items, Some(limit as usize)))
    }

    fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<RemoteResourceNode> {
        let mut state = self.state();
        let parent_path = state.path_of(api_id, parent_id);
        let path = child_path(&parent_path, path_part);
        state.record("CreateResource", &path)?;

        if path_part.is_empty() || path_part.contains('/') {
            return Err(Error::remote(
                "CreateResource",
                Some("BadRequestException"),
                format!("Invalid path part: {path_part:?}"),
            ));
        }
        let id = state.new_id("res");
        let api = state.api("CreateResource", api_id)?;
        if !api.resources.contains_key(parent_id) {
            return Err(Error::not_found(
                "CreateResource",
                "Invalid Resource identifier specified",
            ));
        }
        if api.resource_by_path(&path).is_some() {
            return Err(Error::conflict(
                "CreateResource",
                format!("Another resource with the same parent already has this name: {path_part}"),
            ));
        }
        let node = RemoteResourceNode::new(id.clone(), path, Some(parent_id.to_string()));
        api.resources.insert(
            id,
            MockResource {
                node: node.clone(),
                methods: BTreeMap::new(),
            },
        );
        Ok(node)
    }

    fn delete_resource(&self, api_id: &str, resource_id: &str) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record("DeleteResource", &path)?;
        let api = state.api("DeleteResource", api_id)?;
        let resource = api.resource("DeleteResource", resource_id)?;
        if resource.node.is_root() {
            return Err(Error::remote(
                "DeleteResource",
                Some("BadRequestException"),
                "Cannot delete root resource",
            ));
        }
        let prefix = format!("{}/", resource.node.path);
        api.resources
            .retain(|id, r| id != resource_id && !r.node.path.starts_with(&prefix));
        Ok(())
    }

    fn put_method(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        authorization: &str,
    ) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record("PutMethod", format!("{path} {http_method}"))?;
        let resource = state
            .api("PutMethod", api_id)?
            .resource("PutMethod", resource_id)?;
        if resource.methods.contains_key(http_method) {
            return Err(Error::conflict(
                "PutMethod",
                "Method already exists for this resource",
            ));
        }
        resource.methods.insert(
            http_method.to_string(),
            MockMethod {
                authorization: authorization.to_string(),
                ..MockMethod::default()
            },
        );
        Ok(())
    }

    fn delete_method(&self, api_id: &str, resource_id: &str, http_method: &str) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record("DeleteMethod", format!("{path} {http_method}"))?;
        let resource = state
            .api("DeleteMethod", api_id)?
            .resource("DeleteMethod", resource_id)?;
        if resource.methods.remove(http_method).is_none() {
            return Err(Error::not_found("DeleteMethod", "Invalid Method identifier specified"));
        }
        Ok(())
    }

    fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        integration: &IntegrationSpec,
    ) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record("PutIntegration", format!("{path} {http_method}"))?;
        let method = state
            .api("PutIntegration", api_id)?
            .resource("PutIntegration", resource_id)?
            .methods
            .get_mut(http_method)
            .ok_or_else(|| {
                Error::not_found("PutIntegration", "Invalid Method identifier specified")
            })?;
        method.integration = Some(integration.clone());
        Ok(())
    }

    fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record(
            "PutMethodResponse",
            format!("{path} {http_method} {}", response.status_code),
        )?;
        let method = state
            .api("PutMethodResponse", api_id)?
            .resource("PutMethodResponse", resource_id)?
            .methods
            .get_mut(http_method)
            .ok_or_else(|| {
                Error::not_found("PutMethodResponse", "Invalid Method identifier specified")
            })?;
        if method.method_responses.contains_key(&response.status_code) {
            return Err(Error::conflict("PutMethodResponse", "Response already exists"));
        }
        method
            .method_responses
            .insert(response.status_code.clone(), response.clone());
        Ok(())
    }

    fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
        response: &ResponseSpec,
    ) -> Result<()> {
        let mut state = self.state();
        let path = state.path_of(api_id, resource_id);
        state.record(
            "PutIntegrationResponse",
            format!("{path} {http_method} {}", response.status_code),
        )?;
        let method = state
            .api("PutIntegrationResponse", api_id)?
            .resource("PutIntegrationResponse", resource_id)?
            .methods
            .get_mut(http_method)
            .ok_or_else(|| {
                Error::not_found("PutIntegrationResponse", "Invalid Method identifier specified")
            })?;
        if method.integration.is_none() {
            return Err(Error::not_found(
                "PutIntegrationResponse",
                "No integration defined for method",
            ));
        }
        method
            .integration_responses
            .insert(response.status_code.clone(), response.clone());
        Ok(())
    }

    fn get_stages(&self, api_id: &str) -> Result<Vec<Stage>> {
        let mut state = self.state();
        state.record("GetStages", api_id)?;
        Ok(state.api("GetStages", api_id)?.stages.clone())
    }

    fn create_deployment(&self, api_id: &str, stage_name: &str) -> Result<Stage> {
        let mut state = self.state();
        state.record("CreateDeployment", stage_name)?;
        let deployment_id = state.new_id("dep");
        let api = state.api("CreateDeployment", api_id)?;
        let stage = Stage {
            name: stage_name.to_string(),
            deployment_id: Some(deployment_id),
        };
        match api.stages.iter_mut().find(|s| s.name == stage_name) {
            Some(existing) => *existing = stage.clone(),
            None => api.stages.push(stage.clone()),
        }
        Ok(stage)
    }
}
