//! ARN parsing and the ARNs derived from a function ARN.

use std::fmt;
use std::str::FromStr;

/// A parsed Amazon Resource Name.
///
/// Format: `arn:<partition>:<service>:<region>:<account>:<resource>`.
/// The resource part may itself contain `:` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    /// Partition (`aws`, `aws-cn`, ...).
    pub partition: String,
    /// Service namespace.
    pub service: String,
    /// Region, empty for global services.
    pub region: String,
    /// Account id, empty for some resource types.
    pub account: String,
    /// Everything after the account field.
    pub resource: String,
}

/// Error returned when a string is not an ARN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not an ARN: {0:?}")]
pub struct InvalidArn(pub String);

impl FromStr for Arn {
    type Err = InvalidArn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(6, ':');
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(InvalidArn(s.to_string()));
        };

        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return Err(InvalidArn(s.to_string()));
        }

        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.to_string(),
        })
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

impl Arn {
    /// Gateway invocation URI for a function ARN.
    ///
    /// `arn:<partition>:apigateway:<region>:lambda:path/2015-03-31/functions/<fn>/invocations`
    #[must_use]
    pub fn invocation_uri(&self) -> String {
        format!(
            "arn:{}:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
            self.partition, self.region, self
        )
    }

    /// Source ARN covering every method and stage of an API, in the
    /// function's partition, region and account.
    #[must_use]
    pub fn execute_api_source(&self, api_id: &str) -> String {
        format!(
            "arn:{}:execute-api:{}:{}:{}/*",
            self.partition, self.region, self.account, api_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:my-api";

    #[test]
    fn test_parse_function_arn() {
        let arn: Arn = FUNCTION_ARN.parse().unwrap();
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "lambda");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.account, "123456789012");
        assert_eq!(arn.resource, "function:my-api");
        assert_eq!(arn.to_string(), FUNCTION_ARN);
    }

    #[test]
    fn test_parse_role_arn_without_region() {
        let arn: Arn = "arn:aws:iam::123456789012:role/webda".parse().unwrap();
        assert_eq!(arn.region, "");
        assert_eq!(arn.resource, "role/webda");
    }

    #[test]
    fn test_parse_rejects_non_arn() {
        assert!("not-an-arn".parse::<Arn>().is_err());
        assert!("arn:aws:lambda".parse::<Arn>().is_err());
        assert!("urn:aws:lambda:r:a:function:x".parse::<Arn>().is_err());
    }

    #[test]
    fn test_invocation_uri() {
        let arn: Arn = FUNCTION_ARN.parse().unwrap();
        assert_eq!(
            arn.invocation_uri(),
            "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/\
             arn:aws:lambda:us-east-1:123456789012:function:my-api/invocations"
        );
    }

    #[test]
    fn test_execute_api_source_uses_function_account() {
        let arn: Arn = "arn:aws-cn:lambda:cn-north-1:999:function:f".parse().unwrap();
        assert_eq!(
            arn.execute_api_source("abc123"),
            "arn:aws-cn:execute-api:cn-north-1:999:abc123/*"
        );
    }
}
