//! Resource tree synchronization.
//!
//! Converges the gateway's resource tree onto a route table:
//!
//! 1. Routes already present are rebuilt: their bound methods are unbound
//!    and the desired ones wired again. A route is left alone only when it
//!    binds exactly the desired methods and each of them is fully wired to
//!    the function being deployed, unless a rebind is forced.
//! 2. Missing routes are created in lexicographic path order, so a parent
//!    is always created before its children. Intermediate segments are
//!    created once, however many routes share them.
//! 3. Remote resources that no route needs are deleted. The root and the
//!    ancestors of desired routes stay (only their methods go), and an
//!    orphan subtree is deleted through its topmost node only.
//!
//! All three stages form one [`SerialQueue`]: mutations run one at a time
//! against the API, in the order above.

use crate::error::{Error, InPhase, Phase, Result};
use crate::mutation::Mutation;
use crate::routes::RouteTable;
use crate::tree::{ResourceTree, ancestors, is_ancestor, parent_path, path_part};
use crate::wirer::{self, MethodWirer};
use cloudkit::{GatewayBackend, RemoteResourceNode, RestApi, RetryConfig, retrying};
use declarative::{ApplyResult, ExecuteSummary, ProgressCallback, SerialQueue};
use std::collections::BTreeSet;

/// Description given to APIs created by a deploy.
pub const API_DESCRIPTION: &str = "Webda Auto Deployed";

/// Page size of the resource listing.
pub const RESOURCE_PAGE_LIMIT: u32 = 500;

/// Result of a synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The API the tree belongs to.
    pub api: RestApi,
    /// Whether the API was created by this run.
    pub api_created: bool,
    /// Results of the executed mutations.
    pub summary: ExecuteSummary,
}

/// Converges the resource tree of one API.
pub struct ResourceTreeSynchronizer<'a> {
    backend: &'a dyn GatewayBackend,
    retry: &'a RetryConfig,
    force_rebind: bool,
}

impl<'a> ResourceTreeSynchronizer<'a> {
    /// Create a synchronizer over a gateway backend.
    pub fn new(backend: &'a dyn GatewayBackend, retry: &'a RetryConfig) -> Self {
        Self {
            backend,
            retry,
            force_rebind: false,
        }
    }

    /// Rebuild found routes even when their methods already match.
    pub fn force_rebind(mut self, force: bool) -> Self {
        self.force_rebind = force;
        self
    }

    /// Find the API named `name`. Read-only.
    ///
    /// # Errors
    ///
    /// Fails when the API is not on the first page of a truncated listing.
    pub fn find_api(&self, name: &str) -> Result<Option<RestApi>> {
        let page = retrying(self.retry, || self.backend.list_rest_apis()).in_phase(Phase::TreeSync)?;
        if let Some(api) = page.items.into_iter().find(|api| api.name == name) {
            return Ok(Some(api));
        }
        if page.next.is_some() {
            return Err(cloudkit::Error::Truncated {
                operation: "GetRestApis",
            })
            .in_phase(Phase::TreeSync);
        }
        Ok(None)
    }

    /// Find the API named `name`, creating it if absent.
    pub fn ensure_api(&self, name: &str) -> Result<(RestApi, bool)> {
        if let Some(api) = self.find_api(name)? {
            log::debug!("Using API {name} ({})", api.id);
            return Ok((api, false));
        }
        log::info!("Creating API {name}");
        let api = retrying(self.retry, || self.backend.create_rest_api(name, API_DESCRIPTION))
            .in_phase(Phase::TreeSync)?;
        Ok((api, true))
    }

    /// Fetch and index the API's resources.
    ///
    /// # Errors
    ///
    /// Fails when the listing is truncated; deleting or recreating what
    /// could not be seen would corrupt the tree.
    pub fn fetch_tree(&self, api_id: &str) -> Result<ResourceTree> {
        let page = retrying(self.retry, || {
            self.backend.get_resources(api_id, RESOURCE_PAGE_LIMIT)
        })
        .in_phase(Phase::TreeSync)?;
        if page.is_truncated() {
            return Err(cloudkit::Error::Truncated {
                operation: "GetResources",
            })
            .in_phase(Phase::TreeSync);
        }
        log::debug!("API {api_id} has {} resource(s)", page.items.len());
        Ok(ResourceTree::from_nodes(page.items))
    }

    /// Plan the mutations converging `tree` onto `routes`. No remote calls.
    ///
    /// `invocation_arn` is the endpoint methods must invoke; `None` when the
    /// function does not exist yet, in which case no found route counts as
    /// converged. Planned creations are recorded in `tree` as pending entries.
    pub fn plan(
        &self,
        tree: &mut ResourceTree,
        routes: &RouteTable,
        invocation_arn: Option<&str>,
    ) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        let orphans = orphan_mutations(tree, routes);

        // Found routes: full rebuild unless already converged
        let mut to_create = Vec::new();
        for route in routes.iter() {
            if !tree.contains(&route.path) {
                to_create.push(route);
                continue;
            }
            let node = tree.node(&route.path);
            let converged = match (node, invocation_arn) {
                (Some(node), Some(arn)) => wirer::is_wired(node, &route.methods, arn),
                _ => false,
            };
            if converged && !self.force_rebind {
                log::trace!("{} is converged", route.path);
                continue;
            }
            let bound: BTreeSet<String> = node
                .map(RemoteResourceNode::bound_methods)
                .unwrap_or_default();
            mutations.extend(bound.into_iter().map(|method| Mutation::DeleteMethod {
                path: route.path.clone(),
                method,
            }));
            mutations.extend(wirer::steps(&route.path, &route.methods));
        }

        // Missing routes, parents first
        to_create.sort_by(|a, b| a.path.cmp(&b.path));
        for route in to_create {
            for ancestor in ancestors(&route.path) {
                if !tree.contains(ancestor) {
                    tree.mark_pending(ancestor);
                    mutations.push(Mutation::CreateResource {
                        path: ancestor.to_string(),
                    });
                }
            }
            if !tree.contains(&route.path) {
                tree.mark_pending(&route.path);
                mutations.push(Mutation::CreateResource {
                    path: route.path.clone(),
                });
            }
            mutations.extend(wirer::steps(&route.path, &route.methods));
        }

        mutations.extend(orphans);
        mutations
    }

    /// Run planned mutations strictly in order, keeping `tree` current.
    pub fn apply(
        &self,
        api_id: &str,
        tree: &mut ResourceTree,
        mutations: Vec<Mutation>,
        invocation_arn: &str,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExecuteSummary> {
        let wirer = MethodWirer::new(self.backend, self.retry, api_id, invocation_arn);
        let queue: SerialQueue<Mutation> = mutations.into_iter().collect();
        queue.drain(progress, |mutation| {
            self.apply_one(api_id, tree, &wirer, mutation)
        })
    }

    fn apply_one(
        &self,
        api_id: &str,
        tree: &mut ResourceTree,
        wirer: &MethodWirer<'_>,
        mutation: &Mutation,
    ) -> Result<ApplyResult> {
        let backend = self.backend;
        match mutation {
            Mutation::CreateResource { path } => {
                let parent = parent_path(path)
                    .ok_or_else(|| Error::Tree("the root resource cannot be created".to_string()))?;
                let parent_id = tree.resource_id(parent)?;
                let node = retrying(self.retry, || {
                    backend.create_resource(api_id, parent_id, path_part(path))
                })
                .in_phase(Phase::TreeSync)?;
                log::debug!("Created {path} ({})", node.id);
                tree.resolve(node);
                Ok(ApplyResult::Created)
            }
            Mutation::DeleteResource { path } => {
                let id = tree.resource_id(path)?;
                retrying(self.retry, || backend.delete_resource(api_id, id))
                    .in_phase(Phase::TreeSync)?;
                tree.remove_subtree(path);
                Ok(ApplyResult::Removed)
            }
            Mutation::DeleteMethod { path, method } => {
                let id = tree.resource_id(path)?;
                retrying(self.retry, || backend.delete_method(api_id, id, method))
                    .in_phase(Phase::TreeSync)?;
                if let Some(node) = tree.node_mut(path) {
                    node.methods.remove(method);
                }
                Ok(ApplyResult::Removed)
            }
            step => {
                let result = wirer.apply_step(step, tree.resource_id(step.path())?)?;
                if let Some(node) = tree.node_mut(step.path()) {
                    wirer.record(step, node);
                }
                Ok(result)
            }
        }
    }

    /// Converge the API named `api_name` onto `routes`, wiring methods to
    /// `invocation_arn`.
    pub fn synchronize(
        &self,
        api_name: &str,
        routes: &RouteTable,
        invocation_arn: &str,
        progress: &mut dyn ProgressCallback,
    ) -> Result<SyncOutcome> {
        let (api, api_created) = self.ensure_api(api_name)?;
        let mut tree = self.fetch_tree(&api.id)?;
        let mutations = self.plan(&mut tree, routes, Some(invocation_arn));
        log::info!(
            "Synchronizing {} route(s) on API {}: {} mutation(s)",
            routes.len(),
            api.id,
            mutations.len()
        );
        let summary = self.apply(&api.id, &mut tree, mutations, invocation_arn, progress)?;
        Ok(SyncOutcome {
            api,
            api_created,
            summary,
        })
    }
}

/// Deletions for resources no route needs, in path order.
fn orphan_mutations(tree: &ResourceTree, routes: &RouteTable) -> Vec<Mutation> {
    let structural = |path: &str| path == "/" || routes.paths().any(|p| is_ancestor(path, p));
    let deleted = |path: &str| !routes.contains(path) && !structural(path);

    let mut mutations = Vec::new();
    for node in tree.nodes() {
        if routes.contains(&node.path) {
            continue;
        }
        if structural(&node.path) {
            // Kept for its children; nothing may stay bound on it
            mutations.extend(node.methods.keys().map(|method| Mutation::DeleteMethod {
                path: node.path.clone(),
                method: method.clone(),
            }));
            continue;
        }
        // The topmost deleted node takes its subtree with it
        if ancestors(&node.path).into_iter().any(deleted) {
            continue;
        }
        if deleted(&node.path) {
            mutations.push(Mutation::DeleteResource {
                path: node.path.clone(),
            });
        }
    }
    mutations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::DesiredRoute;
    use cloudkit::MockBackend;
    use declarative::{NoProgress, RecordingProgress, Task};

    const INVOCATION: &str = "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/\
                              arn:aws:lambda:us-east-1:123456789012:function:my-api/invocations";

    fn routes(list: &[(&str, &[&str])]) -> RouteTable {
        RouteTable::new(
            list.iter()
                .map(|(path, methods)| DesiredRoute::new(*path, *methods).unwrap()),
        )
    }

    fn sync(mock: &MockBackend, table: &RouteTable) -> SyncOutcome {
        let retry = RetryConfig::default();
        ResourceTreeSynchronizer::new(mock, &retry)
            .synchronize("my-api", table, INVOCATION, &mut NoProgress)
            .unwrap()
    }

    fn created_paths(mock: &MockBackend) -> Vec<String> {
        mock.calls()
            .into_iter()
            .filter(|c| c.operation == "CreateResource")
            .map(|c| c.target)
            .collect()
    }

    #[test]
    fn test_scenario_from_root_only() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let table = routes(&[
            ("/", &["GET"]),
            ("/users", &["GET", "POST"]),
            ("/users/{id}", &["GET"]),
        ]);

        let outcome = sync(&mock, &table);
        assert!(!outcome.api_created);
        assert_eq!(
            mock.resource_paths(&api_id),
            vec!["/", "/users", "/users/{id}"]
        );
        assert_eq!(created_paths(&mock), vec!["/users", "/users/{id}"]);

        let users = mock.resource(&api_id, "/users").unwrap();
        let user = mock.resource(&api_id, "/users/{id}").unwrap();
        let root = mock.resource(&api_id, "/").unwrap();
        assert_eq!(users.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(user.parent_id.as_deref(), Some(users.id.as_str()));

        assert_eq!(mock.bound_methods(&api_id, "/").len(), 1);
        assert_eq!(
            mock.bound_methods(&api_id, "/users").into_iter().collect::<Vec<_>>(),
            vec!["GET", "POST"]
        );
        assert!(mock.bound_methods(&api_id, "/users/{id}").contains("GET"));
        assert!(mock.integration(&api_id, "/users/{id}", "GET").is_some());
    }

    #[test]
    fn test_second_run_makes_no_mutations() {
        let mock = MockBackend::new();
        mock.seed_rest_api("my-api");
        let table = routes(&[("/", &["GET"]), ("/users", &["GET", "POST"])]);

        sync(&mock, &table);
        mock.clear_calls();
        let outcome = sync(&mock, &table);

        assert!(mock.mutations().is_empty());
        assert_eq!(outcome.summary.total(), 0);
    }

    #[test]
    fn test_convergence_from_empty_account() {
        let mock = MockBackend::new();
        let table = routes(&[
            ("/a", &["GET"]),
            ("/b/c", &["PUT"]),
            ("/b/d/e", &["DELETE"]),
        ]);

        let outcome = sync(&mock, &table);
        assert!(outcome.api_created);
        assert_eq!(mock.api_count("my-api"), 1);

        let api_id = outcome.api.id;
        assert_eq!(
            mock.resource_paths(&api_id),
            vec!["/", "/a", "/b", "/b/c", "/b/d", "/b/d/e"]
        );
        for path in ["/a", "/b/c", "/b/d/e"] {
            assert_eq!(mock.bound_methods(&api_id, path).len(), 1, "{path}");
        }
        // Intermediate segments carry no methods
        assert!(mock.bound_methods(&api_id, "/b").is_empty());
        assert!(mock.bound_methods(&api_id, "/b/d").is_empty());
        // Created once each, parents first
        assert_eq!(
            created_paths(&mock),
            vec!["/a", "/b", "/b/c", "/b/d", "/b/d/e"]
        );
    }

    #[test]
    fn test_orphan_subtree_deleted_once() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &["GET"]).unwrap();
        mock.seed_resource(&api_id, "/legacy/{id}", &["GET"]).unwrap();
        mock.seed_resource(&api_id, "/legacy/{id}/items", &["GET"]).unwrap();

        sync(&mock, &routes(&[("/users", &["GET"])]));

        let deletes: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|c| c.operation == "DeleteResource")
            .map(|c| c.target)
            .collect();
        assert_eq!(deletes, vec!["/legacy"]);
        assert_eq!(mock.resource_paths(&api_id), vec!["/", "/users"]);
    }

    #[test]
    fn test_ancestor_of_desired_route_is_kept() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &["GET"]).unwrap();
        mock.seed_resource(&api_id, "/users/{id}", &["GET"]).unwrap();

        sync(&mock, &routes(&[("/users/{id}", &["GET"])]));

        assert_eq!(
            mock.resource_paths(&api_id),
            vec!["/", "/users", "/users/{id}"]
        );
        assert!(mock.bound_methods(&api_id, "/users").is_empty());
        assert_eq!(mock.call_count("DeleteResource"), 0);
    }

    #[test]
    fn test_root_is_never_deleted() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/", &["GET"]).unwrap();

        sync(&mock, &routes(&[("/users", &["GET"])]));

        assert!(mock.resource(&api_id, "/").is_some());
        assert!(mock.bound_methods(&api_id, "/").is_empty());
    }

    #[test]
    fn test_found_route_rebuilt_when_methods_differ() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/users", &["GET", "DELETE"]).unwrap();

        sync(&mock, &routes(&[("/users", &["GET", "POST"])]));

        let labels: Vec<String> = mock
            .mutations()
            .into_iter()
            .filter(|c| matches!(c.operation, "DeleteMethod" | "PutMethod"))
            .map(|c| format!("{} {}", c.operation, c.target))
            .collect();
        assert_eq!(
            labels,
            vec![
                "DeleteMethod /users DELETE",
                "DeleteMethod /users GET",
                "PutMethod /users GET",
                "PutMethod /users POST",
            ]
        );
        assert_eq!(
            mock.bound_methods(&api_id, "/users").into_iter().collect::<Vec<_>>(),
            vec!["GET", "POST"]
        );
    }

    #[test]
    fn test_force_rebind_rebuilds_converged_route() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let table = routes(&[("/users", &["GET"])]);
        sync(&mock, &table);
        mock.clear_calls();

        let retry = RetryConfig::default();
        ResourceTreeSynchronizer::new(&mock, &retry)
            .force_rebind(true)
            .synchronize("my-api", &table, INVOCATION, &mut NoProgress)
            .unwrap();

        assert_eq!(mock.call_count("DeleteMethod"), 1);
        assert_eq!(mock.call_count("PutMethod"), 1);
        assert!(mock.bound_methods(&api_id, "/users").contains("GET"));
    }

    #[test]
    fn test_changed_invocation_target_rebinds_found_routes() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let table = routes(&[("/users", &["GET", "POST"])]);
        sync(&mock, &table);
        mock.clear_calls();

        let other = INVOCATION.replace("function:my-api/", "function:other-fn/");
        let retry = RetryConfig::default();
        let synchronizer = ResourceTreeSynchronizer::new(&mock, &retry);
        synchronizer
            .synchronize("my-api", &table, &other, &mut NoProgress)
            .unwrap();

        assert_eq!(mock.call_count("DeleteMethod"), 2);
        assert_eq!(mock.call_count("PutIntegration"), 2);
        for method in ["GET", "POST"] {
            let integration = mock.integration(&api_id, "/users", method).unwrap();
            assert_eq!(integration.uri, other, "{method}");
        }

        mock.clear_calls();
        synchronizer
            .synchronize("my-api", &table, &other, &mut NoProgress)
            .unwrap();
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_resume_after_failed_integration() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let table = routes(&[("/users", &["GET"])]);
        mock.throttle("PutIntegration", 1);
        let retry = RetryConfig::default();

        let err = ResourceTreeSynchronizer::new(&mock, &retry)
            .synchronize("my-api", &table, INVOCATION, &mut NoProgress)
            .unwrap_err();
        assert_eq!(err.category(), Some(cloudkit::ErrorCategory::Throttled));
        assert!(mock.bound_methods(&api_id, "/users").contains("GET"));
        assert!(mock.integration(&api_id, "/users", "GET").is_none());

        mock.clear_calls();
        sync(&mock, &table);
        assert_eq!(mock.call_count("CreateResource"), 0);
        assert_eq!(mock.call_count("DeleteMethod"), 1);
        assert_eq!(
            mock.integration(&api_id, "/users", "GET").map(|i| i.uri).as_deref(),
            Some(INVOCATION)
        );
        assert!(mock.method_response(&api_id, "/users", "GET", "200").is_some());
        assert!(mock.integration_response(&api_id, "/users", "GET", "200").is_some());

        mock.clear_calls();
        sync(&mock, &table);
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_unknown_target_never_counts_as_converged() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        let table = routes(&[("/users", &["GET"])]);
        sync(&mock, &table);
        let retry = RetryConfig::default();
        let synchronizer = ResourceTreeSynchronizer::new(&mock, &retry);

        let mut tree = synchronizer.fetch_tree(&api_id).unwrap();
        assert!(synchronizer.plan(&mut tree, &table, Some(INVOCATION)).is_empty());
        let labels: Vec<String> = synchronizer
            .plan(&mut tree, &table, None)
            .iter()
            .map(Task::label)
            .collect();
        assert_eq!(labels.first().map(String::as_str), Some("unbind GET /users"));
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn test_plan_orders_updates_creations_then_deletions() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/old", &[]).unwrap();
        let synchronizer = ResourceTreeSynchronizer::new(&mock, &retry);

        let mut tree = synchronizer.fetch_tree(&api_id).unwrap();
        let plan = synchronizer.plan(
            &mut tree,
            &routes(&[("/", &["GET"]), ("/new", &[])]),
            Some(INVOCATION),
        );
        let labels: Vec<String> = plan.iter().map(Task::label).collect();

        assert_eq!(
            labels,
            vec![
                "bind GET /",
                "integrate GET /",
                "declare response GET /",
                "map response GET /",
                "create resource /new",
                "delete resource /old",
            ]
        );
        assert!(matches!(tree.get("/new"), Some(crate::tree::TreeEntry::Pending)));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_mutations_run_strictly_in_plan_order() {
        let mock = MockBackend::new();
        let retry = RetryConfig::default();
        let api_id = mock.seed_rest_api("my-api");
        let synchronizer = ResourceTreeSynchronizer::new(&mock, &retry);
        let table = routes(&[("/users/{id}", &["GET"])]);

        let mut tree = synchronizer.fetch_tree(&api_id).unwrap();
        let plan = synchronizer.plan(&mut tree, &table, Some(INVOCATION));
        let expected: Vec<String> = plan.iter().map(Task::label).collect();

        let mut progress = RecordingProgress::default();
        synchronizer
            .apply(&api_id, &mut tree, plan, INVOCATION, &mut progress)
            .unwrap();

        assert_eq!(progress.started, expected);
        assert_eq!(progress.completed, expected);
        assert_eq!(tree.resource_id("/users").unwrap(), mock.resource(&api_id, "/users").unwrap().id);
    }

    #[test]
    fn test_failure_aborts_remaining_chain() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.fail_on("CreateResource", "ConflictException");
        let retry = RetryConfig::default();

        let err = ResourceTreeSynchronizer::new(&mock, &retry)
            .synchronize(
                "my-api",
                &routes(&[("/a", &["GET"]), ("/b", &["GET"])]),
                INVOCATION,
                &mut NoProgress,
            )
            .unwrap_err();

        assert_eq!(err.phase(), Phase::TreeSync);
        assert_eq!(mock.call_count("CreateResource"), 1);
        assert_eq!(mock.call_count("PutMethod"), 0);
        assert_eq!(mock.resource_paths(&api_id), vec!["/"]);
    }

    #[test]
    fn test_truncated_resource_listing_fails() {
        let mock = MockBackend::new();
        let api_id = mock.seed_rest_api("my-api");
        mock.seed_resource(&api_id, "/a", &[]).unwrap();
        mock.set_page_size(1);
        let retry = RetryConfig::default();

        let err = ResourceTreeSynchronizer::new(&mock, &retry)
            .fetch_tree(&api_id)
            .unwrap_err();
        assert_eq!(err.category(), Some(cloudkit::ErrorCategory::Truncated));
    }

    #[test]
    fn test_throttled_call_retried_when_configured() {
        let mock = MockBackend::new();
        mock.seed_rest_api("my-api");
        mock.throttle("CreateResource", 1);
        let retry = RetryConfig {
            max_attempts: 2,
            base_delay: std::time::Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: std::time::Duration::from_millis(1),
        };

        ResourceTreeSynchronizer::new(&mock, &retry)
            .synchronize("my-api", &routes(&[("/a", &[])]), INVOCATION, &mut NoProgress)
            .unwrap();
        assert_eq!(mock.call_count("CreateResource"), 2);
    }
}
