use crate::constants::*;
use http::{HeaderMap, HeaderName, HeaderValue};
use sagemaker_mlflow_core::{Error, Result};
use std::fmt::{Display, Formatter};

/// Type of the SageMaker resource an [`MlflowArn`] points to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// `mlflow-tracking-server`
    TrackingServer,
    /// `mlflow-app`
    App,
    /// Any other resource type.
    ///
    /// Parsing accepts it; endpoint resolution, routing headers and signing
    /// reject it with `UnsupportedResourceType`.
    Other(String),
}

impl ResourceType {
    fn from_segment(s: &str) -> Self {
        match s {
            "mlflow-tracking-server" => ResourceType::TrackingServer,
            "mlflow-app" => ResourceType::App,
            v => ResourceType::Other(v.to_string()),
        }
    }

    /// The resource type as it appears in the ARN.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::TrackingServer => "mlflow-tracking-server",
            ResourceType::App => "mlflow-app",
            ResourceType::Other(v) => v,
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed ARN of a SageMaker MLflow tracking server or app.
///
/// The ARN may carry a role to assume behind a `#`:
///
/// ```text
/// arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw#arn:aws:iam::0123456789:role/role-name
/// ```
///
/// The role part is kept verbatim and only validated by
/// [`MlflowArn::assume_role_arn`], so a malformed role never makes the
/// resource ARN itself unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlflowArn {
    arn: String,
    partition: String,
    service: String,
    region: String,
    account: String,
    resource_type: ResourceType,
    resource_id: String,
    role_arn: Option<String>,
}

impl MlflowArn {
    /// Parse an MLflow resource ARN, optionally suffixed with `#<role arn>`.
    pub fn parse(s: &str) -> Result<Self> {
        let (arn, role_arn) = match s.split_once(ROLE_ARN_SEPARATOR) {
            Some((arn, role)) if !role.is_empty() => (arn, Some(role.to_string())),
            Some((arn, _)) => (arn, None),
            None => (s, None),
        };

        let parts = ArnParts::split(arn)
            .ok_or_else(|| Error::invalid_identifier(format!("{s} is not a valid arn")))?;
        if parts.service != SAGEMAKER_SERVICE {
            return Err(Error::invalid_identifier(format!(
                "{s} is not a valid arn: service must be {SAGEMAKER_SERVICE}"
            )));
        }

        Ok(Self {
            arn: arn.to_string(),
            partition: parts.partition.to_string(),
            service: parts.service.to_string(),
            region: parts.region.to_string(),
            account: parts.account.to_string(),
            resource_type: ResourceType::from_segment(parts.resource_type),
            resource_id: parts.resource_id.to_string(),
            role_arn,
        })
    }

    /// The resource ARN without the role suffix.
    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Partition, e.g. `aws` or `aws-us-gov`.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Service, always `sagemaker` for a parsed value.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region, e.g. `us-west-2`.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Account id.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Resource id, the name of the tracking server or app.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// The role to assume, validated on every call.
    ///
    /// Returns `Ok(None)` when the ARN carries no role suffix and
    /// `DelegatedRoleInvalid` when the suffix is not an IAM ARN.
    pub fn assume_role_arn(&self) -> Result<Option<&str>> {
        match &self.role_arn {
            None => Ok(None),
            Some(role) => validate_role_arn(role).map(Some),
        }
    }

    /// Name SigV4 signs requests to this resource under.
    ///
    /// Tracking servers sign as `sagemaker-mlflow`, apps as `sagemaker`.
    pub fn signing_service(&self) -> Result<&'static str> {
        match &self.resource_type {
            ResourceType::TrackingServer => Ok(SAGEMAKER_MLFLOW_SIGNING_SERVICE),
            ResourceType::App => Ok(SAGEMAKER_SERVICE),
            ResourceType::Other(v) => Err(unsupported_resource_type(v)),
        }
    }

    /// Headers the MLflow frontend routes requests with.
    ///
    /// Exactly one header is returned, carrying the resource ARN as the
    /// caller wrote it minus any role suffix.
    pub fn request_headers(&self) -> Result<HeaderMap> {
        let name = match &self.resource_type {
            ResourceType::TrackingServer => X_MLFLOW_SM_TRACKING_SERVER_ARN,
            ResourceType::App => X_SM_MLFLOW_APP_ARN,
            ResourceType::Other(v) => return Err(unsupported_resource_type(v)),
        };

        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(&self.arn).map_err(|e| {
                Error::invalid_identifier(format!("{} is not a valid header value", self.arn))
                    .with_source(e)
            })?,
        );
        Ok(headers)
    }
}

impl Display for MlflowArn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.arn)?;
        if let Some(role) = &self.role_arn {
            write!(f, "{ROLE_ARN_SEPARATOR}{role}")?;
        }
        Ok(())
    }
}

/// Validate that `s` is an IAM ARN with a non-empty resource type and id.
///
/// Used for role suffixes and for roles coming from
/// `SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN`.
pub fn validate_role_arn(s: &str) -> Result<&str> {
    match ArnParts::split(s) {
        Some(parts) if parts.service == IAM_SERVICE => Ok(s),
        _ => Err(Error::delegated_role_invalid(format!(
            "{s} is not a valid arn"
        ))),
    }
}

pub(crate) fn unsupported_resource_type(v: &str) -> Error {
    Error::unsupported_resource_type(format!("resource type {v} is not supported"))
}

/// Colon separated view of an ARN.
struct ArnParts<'a> {
    partition: &'a str,
    service: &'a str,
    region: &'a str,
    account: &'a str,
    resource_type: &'a str,
    resource_id: &'a str,
}

impl<'a> ArnParts<'a> {
    /// `arn:<partition>:<service>:<region>:<account>:<type>/<id>`
    ///
    /// Returns `None` with fewer than six segments, or when the sixth segment
    /// has no `/` or an empty type or id.
    fn split(s: &'a str) -> Option<Self> {
        let mut segments = s.splitn(6, ':');
        let _prefix = segments.next()?;
        let partition = segments.next()?;
        let service = segments.next()?;
        let region = segments.next()?;
        let account = segments.next()?;
        let resource = segments.next()?;

        // The id is the segment right after the type, later segments are ignored.
        let mut resource = resource.split('/');
        let resource_type = resource.next()?;
        let resource_id = resource.next()?;
        if resource_type.is_empty() || resource_id.is_empty() {
            return None;
        }

        Some(Self {
            partition,
            service,
            region,
            account,
            resource_type,
            resource_id,
        })
    }
}
