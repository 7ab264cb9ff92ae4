use crate::arn::unsupported_resource_type;
use crate::constants::{SAGEMAKER_SERVICE, X_AMZ_CONTENT_SHA_256, X_AMZ_TARGET};
use crate::signer::credential_provider;
use crate::{Config, Credential, CredentialCache, MlflowArn, RequestSigner, ResourceType};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use log::debug;
use sagemaker_mlflow_core::hash::hex_sha256;
use sagemaker_mlflow_core::{Context, Error, ProvideCredential, Result, Signer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const CREATE_PRESIGNED_URL_TARGET: &str = "SageMaker.CreatePresignedMlflowTrackingServerUrl";

/// Default first use expiration of a presigned url.
pub const DEFAULT_URL_EXPIRATION: Duration = Duration::from_secs(300);
/// Default session duration of a presigned url.
pub const DEFAULT_SESSION_EXPIRATION: Duration = Duration::from_secs(5000);

/// PresignedUrlProvider creates presigned urls that open the MLflow UI of a
/// tracking server.
#[derive(Debug, Clone)]
pub struct PresignedUrlProvider {
    arn: MlflowArn,
    endpoint: String,
    signer: Signer<Credential>,
}

impl PresignedUrlProvider {
    /// Create a provider for the tracking server `arn`.
    ///
    /// Fails with `UnsupportedResourceType` for anything but a tracking server.
    pub fn new(
        ctx: Context,
        arn: MlflowArn,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Result<Self> {
        match arn.resource_type() {
            ResourceType::TrackingServer => {}
            v => return Err(unsupported_resource_type(v.as_str())),
        }

        let builder = RequestSigner::new(SAGEMAKER_SERVICE, arn.region());
        Ok(Self {
            endpoint: format!("https://api.sagemaker.{}.amazonaws.com", arn.region()),
            signer: Signer::new(ctx, provider, builder).with_credential_reuse(false),
            arn,
        })
    }

    /// Create a provider for the ARN string `arn` configured from env.
    ///
    /// Credentials resolve the same way [`crate::MlflowSigner::from_env`]
    /// resolves them.
    pub fn from_env(ctx: Context, arn: &str, cache: Arc<CredentialCache>) -> Result<Self> {
        let arn = MlflowArn::parse(arn)?;
        let config = Config::default().from_env(&ctx)?;
        let provider = credential_provider(&arn, &config, cache)?;

        let mut presigner = Self::new(ctx, arn, provider)?;
        if let Some(endpoint) = &config.sagemaker_endpoint_url {
            presigner = presigner.with_endpoint(endpoint);
        }
        Ok(presigner)
    }

    /// Replace the SageMaker API endpoint.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// SageMaker API endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Create a presigned url of the tracking server.
    ///
    /// `expires_in` defaults to 300s and `session_expiration` to 5000s.
    pub async fn presigned_url(
        &self,
        expires_in: Option<Duration>,
        session_expiration: Option<Duration>,
    ) -> Result<String> {
        let body = serde_json::to_vec(&CreatePresignedUrlRequest {
            tracking_server_name: self.arn.resource_id(),
            expires_in_seconds: expires_in.unwrap_or(DEFAULT_URL_EXPIRATION).as_secs(),
            session_expiration_duration_in_seconds: session_expiration
                .unwrap_or(DEFAULT_SESSION_EXPIRATION)
                .as_secs(),
        })
        .map_err(|e| Error::unexpected("failed to serialize request").with_source(e))?;

        let req = http::Request::post(format!("{}/", self.endpoint))
            .header(CONTENT_TYPE, "application/x-amz-json-1.1")
            .header(X_AMZ_TARGET, CREATE_PRESIGNED_URL_TARGET)
            .header(X_AMZ_CONTENT_SHA_256, hex_sha256(&body))
            .body(Bytes::from(body))
            .map_err(|e| {
                Error::request_invalid("failed to build CreatePresignedMlflowTrackingServerUrl request")
                    .with_source(e)
                    .with_context(format!("endpoint: {}", self.endpoint))
            })?;

        let (mut parts, body) = req.into_parts();
        let Some(cred) = self.signer.credential().await? else {
            return Err(Error::credential_invalid(
                "no credential available to sign request",
            )
            .with_context(format!("arn: {}", self.arn.arn())));
        };
        self.signer
            .sign_with_credential(&mut parts, Some(&cred))
            .await?;
        let req = http::Request::from_parts(parts, body);

        debug!("creating presigned url of {}", self.arn.arn());
        let resp = self
            .signer
            .context()
            .http_send_as_string(req)
            .await
            .map_err(|e| {
                Error::unexpected("failed to send CreatePresignedMlflowTrackingServerUrl request")
                    .with_source(e)
                    .with_context(format!("endpoint: {}", self.endpoint))
            })?;

        let status = resp.status();
        let body = resp.into_body();
        if status != http::StatusCode::OK {
            let err: ServiceError = serde_json::from_str(&body).unwrap_or_default();
            return Err(Error::unexpected(format!(
                "CreatePresignedMlflowTrackingServerUrl failed with {status}: {}: {}",
                err.error_type.as_deref().unwrap_or("unknown"),
                err.message.as_deref().unwrap_or(&body),
            ))
            .with_context(format!("arn: {}", self.arn.arn())));
        }

        let resp: CreatePresignedUrlResponse = serde_json::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse CreatePresignedMlflowTrackingServerUrl response")
                .with_source(e)
                .with_context(format!("response_length: {}", body.len()))
        })?;
        Ok(resp.authorized_url)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreatePresignedUrlRequest<'a> {
    tracking_server_name: &'a str,
    expires_in_seconds: u64,
    session_expiration_duration_in_seconds: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatePresignedUrlResponse {
    authorized_url: String,
}

#[derive(Default, Deserialize)]
struct ServiceError {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}
