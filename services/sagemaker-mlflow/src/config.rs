use crate::arn::validate_role_arn;
use crate::constants::*;
use sagemaker_mlflow_core::{Context, Error, Result};
use std::time::Duration;

/// Config for SageMaker MLflow signing.
///
/// Empty env values count as unset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// `custom_endpoint` replaces the resolved MLflow endpoint.
    ///
    /// - this field if it's `is_some`
    /// - env value: [`SAGEMAKER_MLFLOW_CUSTOM_ENDPOINT`]
    pub custom_endpoint: Option<String>,
    /// `assume_role_arn` is the role to sign with when the ARN carries no
    /// `#<role arn>` suffix.
    ///
    /// - this field if it's `is_some`
    /// - env value: [`SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN`]
    pub assume_role_arn: Option<String>,
    /// `assume_role_credential_ttl` is how long assumed role credentials stay
    /// cached, always within [300s, 3600s].
    ///
    /// - env value: [`SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL`] in seconds
    /// - default to 3300s
    pub assume_role_credential_ttl: Duration,
    /// `sagemaker_endpoint_url` replaces the SageMaker API endpoint used to
    /// create presigned urls.
    ///
    /// - this field if it's `is_some`
    /// - env value: [`SAGEMAKER_ENDPOINT_URL`]
    pub sagemaker_endpoint_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            custom_endpoint: None,
            assume_role_arn: None,
            assume_role_credential_ttl: Duration::from_secs(DEFAULT_ASSUME_ROLE_CREDENTIAL_TTL),
            sagemaker_endpoint_url: None,
        }
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Fails with `ConfigInvalid` when the TTL isn't an integer.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if let Some(v) = ctx.env_var_non_empty(SAGEMAKER_MLFLOW_CUSTOM_ENDPOINT) {
            self.custom_endpoint.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var_non_empty(SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN) {
            self.assume_role_arn.get_or_insert(v);
        }
        if let Some(v) = ctx.env_var_non_empty(SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL) {
            let secs = v.trim().parse::<i64>().map_err(|e| {
                Error::config_invalid(format!(
                    "{SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL} must be an integer, got {v}"
                ))
                .with_source(e)
            })?;
            self.assume_role_credential_ttl = clamp_ttl(secs);
        }
        if let Some(v) = ctx.env_var_non_empty(SAGEMAKER_ENDPOINT_URL) {
            self.sagemaker_endpoint_url.get_or_insert(v);
        }

        Ok(self)
    }

    /// The configured role to assume, validated.
    ///
    /// Fails with `DelegatedRoleInvalid` when the role isn't an IAM ARN.
    pub fn assume_role_arn(&self) -> Result<Option<&str>> {
        match &self.assume_role_arn {
            None => Ok(None),
            Some(role) => validate_role_arn(role).map(Some),
        }
    }
}

/// Clamp a TTL in seconds into [300, 3600].
pub(crate) fn clamp_ttl(secs: i64) -> Duration {
    let secs = secs.clamp(
        MIN_ASSUME_ROLE_CREDENTIAL_TTL as i64,
        MAX_ASSUME_ROLE_CREDENTIAL_TTL as i64,
    );
    Duration::from_secs(secs as u64)
}
