//! Desired HTTP routes.
//!
//! A route table is read from a configuration map where only keys that
//! start with `/` are routes; every other key belongs to someone else and
//! is skipped. Each route entry carries a `method` that is either a single
//! string or an ordered list.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP methods the gateway can bind.
pub const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "ANY",
];

/// `method` value of a route entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodSpec {
    /// A single method.
    One(String),
    /// An ordered list of methods.
    Many(Vec<String>),
}

impl MethodSpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(method) => vec![method],
            Self::Many(methods) => methods,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    method: MethodSpec,
}

/// One desired route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRoute {
    /// Absolute path, starting with `/`.
    pub path: String,
    /// Methods to bind, in wiring order.
    pub methods: Vec<String>,
}

impl DesiredRoute {
    /// Create a route, normalizing and validating it.
    pub fn new<S: AsRef<str>>(path: impl Into<String>, methods: &[S]) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;

        let mut normalized: Vec<String> = Vec::with_capacity(methods.len());
        for method in methods {
            let method = method.as_ref().trim().to_ascii_uppercase();
            if !HTTP_METHODS.contains(&method.as_str()) {
                return Err(Error::config(format!(
                    "route {path}: unsupported method {method:?}"
                )));
            }
            // Duplicates would be bound twice and rejected remotely
            if !normalized.contains(&method) {
                normalized.push(method);
            }
        }

        Ok(Self {
            path,
            methods: normalized,
        })
    }
}

fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::config(format!("route {path:?} must start with '/'")));
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::config(format!(
            "route {path:?} must not end with '/'"
        )));
    }
    if path[1..].split('/').any(str::is_empty) {
        return Err(Error::config(format!(
            "route {path:?} has an empty path segment"
        )));
    }
    Ok(())
}

/// Desired routes keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, DesiredRoute>,
}

impl RouteTable {
    /// Build a table from routes. Later routes replace earlier ones with
    /// the same path.
    pub fn new(routes: impl IntoIterator<Item = DesiredRoute>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|route| (route.path.clone(), route))
                .collect(),
        }
    }

    /// Read routes from a configuration map.
    ///
    /// Keys that do not start with `/` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a route entry has no usable
    /// `method` or an invalid path.
    pub fn from_config(config: &BTreeMap<String, serde_json::Value>) -> Result<Self> {
        let mut routes = BTreeMap::new();
        for (key, value) in config {
            if !key.starts_with('/') {
                log::trace!("skipping non-route key {key}");
                continue;
            }
            let entry = RouteEntry::deserialize(value)
                .map_err(|e| Error::config(format!("route {key}: {e}")))?;
            let route = DesiredRoute::new(key.clone(), &entry.method.into_vec())?;
            routes.insert(key.clone(), route);
        }
        Ok(Self { routes })
    }

    /// Route at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&DesiredRoute> {
        self.routes.get(path)
    }

    /// Whether `path` is a desired route.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// Routes in path order.
    pub fn iter(&self) -> impl Iterator<Item = &DesiredRoute> {
        self.routes.values()
    }

    /// Desired paths in path order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> BTreeMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_config_ignores_non_route_keys() {
        let table = RouteTable::from_config(&config(json!({
            "/": {"method": "GET"},
            "/users": {"method": ["GET", "POST"], "executor": "users"},
            "parameters": {"website": "https://example.com"},
            "services": {"method": "GET"}
        })))
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.paths().collect::<Vec<_>>(), vec!["/", "/users"]);
        assert_eq!(table.get("/users").unwrap().methods, vec!["GET", "POST"]);
        assert!(!table.contains("services"));
    }

    #[test]
    fn test_methods_are_normalized() {
        let route = DesiredRoute::new("/users", &["get", "POST", "GET"]).unwrap();
        assert_eq!(route.methods, vec!["GET", "POST"]);
    }

    #[test]
    fn test_method_order_is_kept() {
        let route = DesiredRoute::new("/users", &["POST", "GET", "DELETE"]).unwrap();
        assert_eq!(route.methods, vec!["POST", "GET", "DELETE"]);
    }

    #[test]
    fn test_invalid_routes_rejected() {
        assert!(DesiredRoute::new("/users/", &["GET"]).is_err());
        assert!(DesiredRoute::new("/users//x", &["GET"]).is_err());
        assert!(DesiredRoute::new("/users", &["FETCH"]).is_err());
        assert!(DesiredRoute::new("users", &["GET"]).is_err());
    }

    #[test]
    fn test_route_without_method_rejected() {
        let err = RouteTable::from_config(&config(json!({
            "/users": {"executor": "users"}
        })))
        .unwrap_err();
        assert!(err.to_string().contains("/users"));
    }
}
