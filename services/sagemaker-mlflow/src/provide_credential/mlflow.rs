use crate::arn::validate_role_arn;
use crate::config::clamp_ttl;
use crate::constants::DEFAULT_ASSUME_ROLE_CREDENTIAL_TTL;
use crate::provide_credential::{AssumeRoleCredentialProvider, DefaultCredentialProvider};
use crate::{Credential, CredentialCache};
use async_trait::async_trait;
use log::debug;
use sagemaker_mlflow_core::{
    Context, Error, ErrorKind, ProvideCredential, Result, SigningCredential,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// MlflowCredentialProvider resolves the credential MLflow requests are
/// signed with.
///
/// Without a role it returns the ambient credential, reusing it while it's
/// valid. With a role it returns the cached credential of that role, or
/// assumes the role with the ambient credential and caches the result for
/// the configured TTL.
///
/// Every call consults the cache, so evicted or expired entries are never
/// handed out again.
#[derive(Debug)]
pub struct MlflowCredentialProvider {
    region: String,
    role_arn: Option<String>,
    ttl: Duration,
    cache: Arc<CredentialCache>,
    ambient: Arc<dyn ProvideCredential<Credential = Credential>>,
    ambient_credential: Mutex<Option<Credential>>,
    sts_endpoint: Option<String>,
}

impl MlflowCredentialProvider {
    /// Create a provider for `region` backed by [`DefaultCredentialProvider`]
    /// and a private cache.
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            role_arn: None,
            ttl: Duration::from_secs(DEFAULT_ASSUME_ROLE_CREDENTIAL_TTL),
            cache: Arc::new(CredentialCache::new()),
            ambient: Arc::new(DefaultCredentialProvider::new()),
            ambient_credential: Mutex::new(None),
            sts_endpoint: None,
        }
    }

    /// Set the role to assume. It is validated when credentials are loaded.
    pub fn with_role_arn(mut self, role_arn: &str) -> Self {
        self.role_arn = Some(role_arn.to_string());
        self
    }

    /// Set how long assumed credentials stay cached, clamped into
    /// [300s, 3600s].
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = clamp_ttl(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        self
    }

    /// Share `cache` with other providers.
    pub fn with_cache(mut self, cache: Arc<CredentialCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the provider of the ambient credential.
    pub fn with_ambient(mut self, ambient: impl ProvideCredential<Credential = Credential>) -> Self {
        self.ambient = Arc::new(ambient);
        self.ambient_credential = Mutex::new(None);
        self
    }

    /// Replace the STS endpoint used to assume roles.
    pub fn with_sts_endpoint(mut self, endpoint: &str) -> Self {
        self.sts_endpoint = Some(endpoint.to_string());
        self
    }

    /// The role this provider assumes, if any.
    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    /// How long assumed credentials stay cached.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn ambient_credential(&self, ctx: &Context) -> Result<Option<Credential>> {
        let cred = self.ambient_credential.lock().expect("lock poisoned").clone();
        if cred.is_valid() {
            return Ok(cred);
        }

        debug!("no role configured, loading ambient credential");
        let cred = self.ambient.provide_credential(ctx).await?;
        *self.ambient_credential.lock().expect("lock poisoned") = cred.clone();
        Ok(cred)
    }
}

#[async_trait]
impl ProvideCredential for MlflowCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(role_arn) = &self.role_arn else {
            return self.ambient_credential(ctx).await;
        };
        let role_arn = validate_role_arn(role_arn)?;

        if let Some(cred) = self.cache.get(role_arn) {
            debug!("using cached credential of role {role_arn}");
            return Ok(Some(cred));
        }
        debug!("no cached credential of role {role_arn}, assuming it");

        let mut provider =
            AssumeRoleCredentialProvider::new(role_arn, &self.region, self.ambient.clone());
        if let Some(endpoint) = &self.sts_endpoint {
            provider = provider.with_sts_endpoint(endpoint);
        }

        let cred = match provider.provide_credential(ctx).await {
            Ok(Some(cred)) => cred,
            Ok(None) => {
                return Err(Error::credential_exchange_failure(
                    "AssumeRole returned no credential",
                )
                .with_context(format!("role_arn: {role_arn}")))
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::CredentialExchangeFailure | ErrorKind::CredentialInvalid
                ) =>
            {
                return Err(err)
            }
            Err(err) => {
                return Err(Error::credential_exchange_failure(format!(
                    "failed to assume role {role_arn}"
                ))
                .with_source(err))
            }
        };

        self.cache.put(role_arn, cred.clone(), self.ttl);
        Ok(Some(cred))
    }
}
