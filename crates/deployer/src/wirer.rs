//! Method wiring: method, integration and response mapping per HTTP method.

use crate::error::{Error, InPhase, Phase, Result};
use crate::mutation::Mutation;
use cloudkit::{
    BoundMethod, GatewayBackend, IntegrationKind, IntegrationSpec, RemoteResourceNode,
    ResponseSpec, RetryConfig, retrying,
};
use declarative::{ApplyResult, ExecuteSummary, NoProgress, SerialQueue};
use std::collections::BTreeMap;

/// Mapping template normalizing a request into the function payload.
///
/// Carries the body, parameters per location, stage variables and the
/// caller context.
pub const REQUEST_TEMPLATE: &str = include_str!("request_template.vtl");

/// Content type every mapping is keyed by.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Status code of the success response.
pub const STATUS_OK: &str = "200";

/// Authorization type of bound methods.
pub const AUTHORIZATION_NONE: &str = "NONE";

/// Integration of a method with the function.
#[must_use]
pub fn integration(invocation_arn: &str) -> IntegrationSpec {
    IntegrationSpec {
        kind: IntegrationKind::Aws,
        integration_http_method: "POST".to_string(),
        uri: invocation_arn.to_string(),
        request_templates: BTreeMap::from([(
            JSON_CONTENT_TYPE.to_string(),
            REQUEST_TEMPLATE.to_string(),
        )]),
    }
}

/// Success method response with an empty body model.
#[must_use]
pub fn method_response() -> ResponseSpec {
    ResponseSpec {
        status_code: STATUS_OK.to_string(),
        mappings: BTreeMap::from([(JSON_CONTENT_TYPE.to_string(), "Empty".to_string())]),
    }
}

/// Success integration response passing the body through.
#[must_use]
pub fn integration_response() -> ResponseSpec {
    ResponseSpec {
        status_code: STATUS_OK.to_string(),
        mappings: BTreeMap::from([(JSON_CONTENT_TYPE.to_string(), String::new())]),
    }
}

/// The mutations wiring `methods` on `path`, one method at a time in order.
#[must_use]
pub fn steps(path: &str, methods: &[String]) -> Vec<Mutation> {
    methods
        .iter()
        .flat_map(|method| {
            let (path, method) = (path.to_string(), method.clone());
            [
                Mutation::PutMethod {
                    path: path.clone(),
                    method: method.clone(),
                },
                Mutation::PutIntegration {
                    path: path.clone(),
                    method: method.clone(),
                },
                Mutation::PutMethodResponse {
                    path: path.clone(),
                    method: method.clone(),
                },
                Mutation::PutIntegrationResponse { path, method },
            ]
        })
        .collect()
}

/// Whether `node` binds exactly `methods`, each fully wired to `invocation_arn`.
///
/// A method bound without its integration or either success response
/// (a previous run stopped midway) is not wired.
#[must_use]
pub fn is_wired(node: &RemoteResourceNode, methods: &[String], invocation_arn: &str) -> bool {
    node.methods.len() == methods.len()
        && methods.iter().all(|method| {
            node.methods
                .get(method)
                .is_some_and(|bound| bound.is_wired_to(invocation_arn, STATUS_OK))
        })
}

/// Attaches methods on resources to the function's invocation endpoint.
pub struct MethodWirer<'a> {
    backend: &'a dyn GatewayBackend,
    retry: &'a RetryConfig,
    api_id: &'a str,
    integration: IntegrationSpec,
}

impl<'a> MethodWirer<'a> {
    /// Create a wirer for one API and one function.
    pub fn new(
        backend: &'a dyn GatewayBackend,
        retry: &'a RetryConfig,
        api_id: &'a str,
        invocation_arn: &str,
    ) -> Self {
        Self {
            backend,
            retry,
            api_id,
            integration: integration(invocation_arn),
        }
    }

    /// Run one wiring step against the resource `resource_id`.
    ///
    /// Only the four wiring mutations are accepted.
    pub fn apply_step(&self, step: &Mutation, resource_id: &str) -> Result<ApplyResult> {
        let (api, backend) = (self.api_id, self.backend);
        let outcome = match step {
            Mutation::PutMethod { method, .. } => retrying(self.retry, || {
                backend.put_method(api, resource_id, method, AUTHORIZATION_NONE)
            }),
            Mutation::PutIntegration { method, .. } => retrying(self.retry, || {
                backend.put_integration(api, resource_id, method, &self.integration)
            }),
            Mutation::PutMethodResponse { method, .. } => retrying(self.retry, || {
                backend.put_method_response(api, resource_id, method, &method_response())
            }),
            Mutation::PutIntegrationResponse { method, .. } => retrying(self.retry, || {
                backend.put_integration_response(api, resource_id, method, &integration_response())
            }),
            other => {
                return Err(Error::Tree(format!(
                    "{other:?} is not a method wiring step"
                )));
            }
        };
        outcome.in_phase(Phase::TreeSync)?;
        Ok(ApplyResult::Created)
    }

    /// Reflect an applied wiring step on the local copy of its node.
    pub fn record(&self, step: &Mutation, node: &mut RemoteResourceNode) {
        match step {
            Mutation::PutMethod { method, .. } => {
                node.methods.insert(method.clone(), BoundMethod::default());
            }
            Mutation::PutIntegration { method, .. } => {
                if let Some(bound) = node.methods.get_mut(method) {
                    bound.integration_uri = Some(self.integration.uri.clone());
                }
            }
            Mutation::PutMethodResponse { method, .. } => {
                if let Some(bound) = node.methods.get_mut(method) {
                    bound.method_responses.insert(STATUS_OK.to_string());
                }
            }
            Mutation::PutIntegrationResponse { method, .. } => {
                if let Some(bound) = node.methods.get_mut(method) {
                    bound.integration_responses.insert(STATUS_OK.to_string());
                }
            }
            _ => {}
        }
    }

    /// Wire `methods` on one existing resource, strictly in order.
    ///
    /// Standalone entry point for a single resolved node. A synchronization
    /// interleaves the same [`steps`] with resource creations in one queue
    /// and runs them through [`MethodWirer::apply_step`] instead. The methods
    /// must not be bound yet.
    pub fn bind(
        &self,
        node: &mut RemoteResourceNode,
        methods: &[String],
    ) -> Result<ExecuteSummary> {
        let queue: SerialQueue<Mutation> = steps(&node.path, methods).into_iter().collect();
        let id = node.id.clone();
        queue.drain(&mut NoProgress, |step| {
            let result = self.apply_step(step, &id)?;
            self.record(step, node);
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudkit::MockBackend;

    const INVOCATION: &str = "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/\
                              arn:aws:lambda:us-east-1:123456789012:function:f/invocations";

    fn methods(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn test_template_carries_request_and_context() {
        for needle in [
            "\"body-json\"",
            "\"params\"",
            "\"stage-variables\"",
            "\"source-ip\"",
            "\"resource-path\"",
            "\"cognito-identity-pool-id\"",
        ] {
            assert!(REQUEST_TEMPLATE.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn test_steps_wire_one_method_at_a_time() {
        let labels: Vec<String> = steps("/users", &methods(&["GET", "POST"]))
            .iter()
            .map(declarative::Task::label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "bind GET /users",
                "integrate GET /users",
                "declare response GET /users",
                "map response GET /users",
                "bind POST /users",
                "integrate POST /users",
                "declare response POST /users",
                "map response POST /users",
            ]
        );
    }

    #[test]
    fn test_bind_wires_method_to_function() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &[]).unwrap();
        let mut node = mock.resource(&api_id, "/users").unwrap();
        let retry = RetryConfig::default();

        let wirer = MethodWirer::new(&mock, &retry, &api_id, INVOCATION);
        let summary = wirer.bind(&mut node, &methods(&["GET"])).unwrap();
        assert_eq!(summary.created, 4);
        assert!(is_wired(&node, &methods(&["GET"]), INVOCATION));
        assert_eq!(node, mock.resource(&api_id, "/users").unwrap());

        assert_eq!(
            mock.authorization(&api_id, "/users", "GET").as_deref(),
            Some("NONE")
        );
        let integration = mock.integration(&api_id, "/users", "GET").unwrap();
        assert_eq!(integration.kind, IntegrationKind::Aws);
        assert_eq!(integration.integration_http_method, "POST");
        assert_eq!(integration.uri, INVOCATION);
        assert_eq!(
            integration.request_templates.get(JSON_CONTENT_TYPE).map(String::as_str),
            Some(REQUEST_TEMPLATE)
        );
        let response = mock.method_response(&api_id, "/users", "GET", "200").unwrap();
        assert_eq!(response.mappings[JSON_CONTENT_TYPE], "Empty");
        assert!(mock.integration_response(&api_id, "/users", "GET", "200").is_some());
    }

    #[test]
    fn test_bind_stops_on_first_rejection() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &[]).unwrap();
        let mut node = mock.resource(&api_id, "/users").unwrap();
        mock.fail_on("PutIntegration", "BadRequestException");
        let retry = RetryConfig::default();

        let err = MethodWirer::new(&mock, &retry, &api_id, INVOCATION)
            .bind(&mut node, &methods(&["GET", "POST"]))
            .unwrap_err();
        assert_eq!(err.phase(), Phase::TreeSync);
        assert_eq!(mock.call_count("PutMethod"), 1);
        assert_eq!(mock.call_count("PutMethodResponse"), 0);
        // Bound but not integrated
        assert!(node.methods.contains_key("GET"));
        assert!(!is_wired(&node, &methods(&["GET"]), INVOCATION));
    }

    #[test]
    fn test_is_wired_checks_target_and_method_set() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &[]).unwrap();
        let mut node = mock.resource(&api_id, "/users").unwrap();
        let retry = RetryConfig::default();
        MethodWirer::new(&mock, &retry, &api_id, INVOCATION)
            .bind(&mut node, &methods(&["GET", "POST"]))
            .unwrap();

        assert!(is_wired(&node, &methods(&["GET", "POST"]), INVOCATION));
        assert!(!is_wired(&node, &methods(&["GET"]), INVOCATION));
        assert!(!is_wired(&node, &methods(&["GET", "POST", "PUT"]), INVOCATION));
        let other = INVOCATION.replace("function:f/", "function:g/");
        assert!(!is_wired(&node, &methods(&["GET", "POST"]), &other));
    }
}
