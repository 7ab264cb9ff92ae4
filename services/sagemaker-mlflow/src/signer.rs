use crate::body::{payload_sha256, Body};
use crate::constants::X_AMZ_CONTENT_SHA_256;
use crate::provide_credential::MlflowCredentialProvider;
use crate::{Config, Credential, CredentialCache, MlflowArn, RequestSigner};
use http::header::{self, HeaderMap, HeaderValue};
use http::Method;
use log::debug;
use sagemaker_mlflow_core::{Context, Error, ProvideCredential, Result, Signer};
use std::sync::Arc;

/// MlflowSigner signs requests aimed at a SageMaker MLflow endpoint.
///
/// The signing service and region come from the ARN: tracking servers are
/// signed as `sagemaker-mlflow`, apps as `sagemaker`.
///
/// ```no_run
/// use sagemaker_mlflow_auth::{Body, CredentialCache, MlflowSigner};
/// use sagemaker_mlflow_core::{Context, OsEnv};
/// use std::sync::Arc;
///
/// # async fn example() -> sagemaker_mlflow_core::Result<()> {
/// let ctx = Context::new().with_env(OsEnv);
/// let signer = MlflowSigner::from_env(
///     ctx,
///     "arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw",
///     Arc::new(CredentialCache::new()),
/// )?;
///
/// let req = http::Request::get(format!("{}/api/2.0/mlflow/experiments/list", signer.endpoint()?))
///     .body(Body::Empty)?;
/// let req = signer.sign(req).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MlflowSigner {
    arn: MlflowArn,
    custom_endpoint: Option<String>,
    signer: Signer<Credential>,
}

impl MlflowSigner {
    /// Create a signer for `arn` loading credentials from `provider`.
    ///
    /// `provider` is asked for every request, wrap it in
    /// [`MlflowCredentialProvider`] to cache what it returns.
    ///
    /// Fails with `UnsupportedResourceType` unless `arn` names a tracking
    /// server or an app.
    pub fn new(
        ctx: Context,
        arn: MlflowArn,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Result<Self> {
        let builder = RequestSigner::new(arn.signing_service()?, arn.region());
        Ok(Self::with_request_signer(ctx, arn, provider, builder))
    }

    /// Create a signer with a preconfigured [`RequestSigner`].
    ///
    /// # Note
    ///
    /// Only use this function for testing, e.g. to pin the signing time.
    pub fn with_request_signer(
        ctx: Context,
        arn: MlflowArn,
        provider: impl ProvideCredential<Credential = Credential>,
        builder: RequestSigner,
    ) -> Self {
        Self {
            arn,
            custom_endpoint: None,
            signer: Signer::new(ctx, provider, builder).with_credential_reuse(false),
        }
    }

    /// Create a signer for the ARN string `arn` configured from env.
    ///
    /// The role embedded in `arn` wins over
    /// `SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN`. Assumed role credentials are kept
    /// in `cache`.
    pub fn from_env(ctx: Context, arn: &str, cache: Arc<CredentialCache>) -> Result<Self> {
        let arn = MlflowArn::parse(arn)?;
        let config = Config::default().from_env(&ctx)?;
        let provider = credential_provider(&arn, &config, cache)?;

        let mut signer = Self::new(ctx, arn, provider)?;
        signer.custom_endpoint = config.custom_endpoint;
        Ok(signer)
    }

    /// Replace the resolved endpoint, see [`crate::resolve_endpoint`].
    pub fn with_custom_endpoint(mut self, endpoint: &str) -> Self {
        self.custom_endpoint = Some(endpoint.to_string());
        self
    }

    /// The ARN this signer signs for.
    pub fn arn(&self) -> &MlflowArn {
        &self.arn
    }

    /// Base url of the MLflow endpoint.
    pub fn endpoint(&self) -> Result<String> {
        self.arn.endpoint(self.custom_endpoint.as_deref())
    }

    /// Routing headers to attach to every request.
    pub fn request_headers(&self) -> Result<HeaderMap> {
        self.arn.request_headers()
    }

    /// Sign `req`, returning the signed request.
    ///
    /// `Connection` headers are left out of the signature and restored
    /// afterwards. Literal `+` in the urls of GET and DELETE requests are
    /// rewritten to `%20` before signing.
    pub async fn sign(&self, req: http::Request<Body>) -> Result<http::Request<Body>> {
        let (mut parts, mut body) = req.into_parts();

        let checksum = payload_sha256(&mut body)?;
        parts
            .headers
            .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_str(&checksum)?);

        let connection = parts
            .headers
            .get_all(header::CONNECTION)
            .iter()
            .cloned()
            .collect::<Vec<_>>();
        parts.headers.remove(header::CONNECTION);

        if matches!(parts.method, Method::GET | Method::DELETE) {
            let uri = parts.uri.to_string();
            if uri.contains('+') {
                debug!("rewriting '+' in url of {} request", parts.method);
                parts.uri = uri.replace('+', "%20").parse()?;
            }
        }

        let Some(cred) = self.signer.credential().await? else {
            return Err(Error::credential_invalid(
                "no credential available to sign request",
            )
            .with_context(format!("arn: {}", self.arn.arn())));
        };
        self.signer
            .sign_with_credential(&mut parts, Some(&cred))
            .await?;

        for value in connection {
            parts.headers.append(header::CONNECTION, value);
        }

        Ok(http::Request::from_parts(parts, body))
    }
}

/// Credential provider for `arn`, assuming the embedded role or the one
/// configured in `config`.
pub(crate) fn credential_provider(
    arn: &MlflowArn,
    config: &Config,
    cache: Arc<CredentialCache>,
) -> Result<MlflowCredentialProvider> {
    let role_arn = match arn.assume_role_arn()? {
        Some(role_arn) => Some(role_arn),
        None => config.assume_role_arn()?,
    };

    let provider = MlflowCredentialProvider::new(arn.region())
        .with_cache(cache)
        .with_ttl(config.assume_role_credential_ttl);
    Ok(match role_arn {
        Some(role_arn) => provider.with_role_arn(role_arn),
        None => provider,
    })
}
