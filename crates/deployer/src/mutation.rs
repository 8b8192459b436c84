//! Planned gateway mutations.
//!
//! Mutations address resources by path. The resource id is looked up in
//! the tree when the mutation runs, so a mutation can target a resource
//! that a previous mutation of the same queue creates.

use declarative::{ChangeKind, Task};

/// One remote mutation of the resource tree or its method wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create the resource at `path` under its parent.
    CreateResource {
        /// Absolute path.
        path: String,
    },
    /// Delete the resource at `path` and its subtree.
    DeleteResource {
        /// Absolute path.
        path: String,
    },
    /// Unbind a method.
    DeleteMethod {
        /// Absolute path.
        path: String,
        /// HTTP method.
        method: String,
    },
    /// Bind a method without authorization.
    PutMethod {
        /// Absolute path.
        path: String,
        /// HTTP method.
        method: String,
    },
    /// Attach the function integration to a bound method.
    PutIntegration {
        /// Absolute path.
        path: String,
        /// HTTP method.
        method: String,
    },
    /// Declare the success method response.
    PutMethodResponse {
        /// Absolute path.
        path: String,
        /// HTTP method.
        method: String,
    },
    /// Map the integration result onto the success response.
    PutIntegrationResponse {
        /// Absolute path.
        path: String,
        /// HTTP method.
        method: String,
    },
}

impl Mutation {
    /// Path of the resource the mutation acts on.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::CreateResource { path }
            | Self::DeleteResource { path }
            | Self::DeleteMethod { path, .. }
            | Self::PutMethod { path, .. }
            | Self::PutIntegration { path, .. }
            | Self::PutMethodResponse { path, .. }
            | Self::PutIntegrationResponse { path, .. } => path,
        }
    }

    /// HTTP method, for method-level mutations.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::CreateResource { .. } | Self::DeleteResource { .. } => None,
            Self::DeleteMethod { method, .. }
            | Self::PutMethod { method, .. }
            | Self::PutIntegration { method, .. }
            | Self::PutMethodResponse { method, .. }
            | Self::PutIntegrationResponse { method, .. } => Some(method),
        }
    }
}

impl Task for Mutation {
    fn label(&self) -> String {
        match self {
            Self::CreateResource { path } => format!("create resource {path}"),
            Self::DeleteResource { path } => format!("delete resource {path}"),
            Self::DeleteMethod { path, method } => format!("unbind {method} {path}"),
            Self::PutMethod { path, method } => format!("bind {method} {path}"),
            Self::PutIntegration { path, method } => format!("integrate {method} {path}"),
            Self::PutMethodResponse { path, method } => {
                format!("declare response {method} {path}")
            }
            Self::PutIntegrationResponse { path, method } => {
                format!("map response {method} {path}")
            }
        }
    }

    fn task_type(&self) -> &'static str {
        match self {
            Self::CreateResource { .. } | Self::DeleteResource { .. } => "resource",
            Self::DeleteMethod { .. } | Self::PutMethod { .. } => "method",
            Self::PutIntegration { .. } => "integration",
            Self::PutMethodResponse { .. } | Self::PutIntegrationResponse { .. } => "response",
        }
    }

    fn kind(&self) -> ChangeKind {
        match self {
            Self::DeleteResource { .. } | Self::DeleteMethod { .. } => ChangeKind::Remove,
            _ => ChangeKind::Create,
        }
    }

    fn target(&self) -> String {
        match self.method() {
            Some(method) => format!("{} {method}", self.path()),
            None => self.path().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_targets() {
        let create = Mutation::CreateResource {
            path: "/users".to_string(),
        };
        assert_eq!(create.label(), "create resource /users");
        assert_eq!(create.target(), "/users");
        assert_eq!(create.kind(), ChangeKind::Create);

        let unbind = Mutation::DeleteMethod {
            path: "/users".to_string(),
            method: "GET".to_string(),
        };
        assert_eq!(unbind.label(), "unbind GET /users");
        assert_eq!(unbind.target(), "/users GET");
        assert_eq!(unbind.task_type(), "method");
        assert_eq!(unbind.kind(), ChangeKind::Remove);
    }
}
