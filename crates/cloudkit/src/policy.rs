//! Function resource-policy documents.
//!
//! The compute service returns a function's policy as a JSON string. Only
//! the statement ids and their source-ARN conditions matter here.

use crate::error::{Error, Result};
use crate::types::PermissionStatement;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    statements: Vec<StatementEntry>,
}

#[derive(Debug, Deserialize)]
struct StatementEntry {
    #[serde(rename = "Sid", default)]
    sid: Option<String>,
    #[serde(rename = "Condition", default)]
    condition: HashMap<String, HashMap<String, serde_json::Value>>,
}

impl StatementEntry {
    fn source_arn(&self) -> Option<String> {
        self.condition
            .get("ArnLike")
            .and_then(|c| c.get("AWS:SourceArn"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}

/// Parse the statements of a policy document.
///
/// Statements without a `Sid` are skipped.
pub fn parse_policy(function: &str, document: &str) -> Result<Vec<PermissionStatement>> {
    let policy: PolicyDocument =
        serde_json::from_str(document).map_err(|source| Error::Policy {
            function: function.to_string(),
            source,
        })?;

    Ok(policy
        .statements
        .into_iter()
        .filter_map(|entry| {
            let source_arn = entry.source_arn();
            entry.sid.map(|statement_id| PermissionStatement {
                statement_id,
                source_arn,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy_statements() {
        let document = r#"{
            "Version": "2012-10-17",
            "Id": "default",
            "Statement": [
                {
                    "Sid": "Webdaabc123",
                    "Effect": "Allow",
                    "Principal": {"Service": "apigateway.amazonaws.com"},
                    "Action": "lambda:InvokeFunction",
                    "Resource": "arn:aws:lambda:us-east-1:123456789012:function:f",
                    "Condition": {"ArnLike": {"AWS:SourceArn": "arn:aws:execute-api:us-east-1:123456789012:abc123/*"}}
                },
                {"Sid": "bare", "Effect": "Allow"},
                {"Effect": "Allow"}
            ]
        }"#;

        let statements = parse_policy("f", document).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].statement_id, "Webdaabc123");
        assert_eq!(
            statements[0].source_arn.as_deref(),
            Some("arn:aws:execute-api:us-east-1:123456789012:abc123/*")
        );
        assert_eq!(statements[1].source_arn, None);
    }

    #[test]
    fn test_parse_policy_rejects_garbage() {
        let err = parse_policy("f", "not json").unwrap_err();
        assert!(matches!(err, Error::Policy { .. }));
        assert!(err.to_string().contains("for f"));
    }
}
