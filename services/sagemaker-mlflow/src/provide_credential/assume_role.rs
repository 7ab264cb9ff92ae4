use crate::constants::{ROLE_SESSION_NAME, X_AMZ_CONTENT_SHA_256};
use crate::credential::Credential;
use crate::provide_credential::utils::{parse_sts_error, sts_endpoint};
use crate::RequestSigner;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use quick_xml::de;
use sagemaker_mlflow_core::hash::EMPTY_STRING_SHA256;
use sagemaker_mlflow_core::time::parse_rfc3339;
use sagemaker_mlflow_core::{Context, Error, ProvideCredential, Result, SignRequest};
use serde::Deserialize;
use std::sync::Arc;

/// AssumeRoleCredentialProvider exchanges the credential of `source` for the
/// temporary credential of a role via STS `AssumeRole`.
#[derive(Debug)]
pub struct AssumeRoleCredentialProvider {
    role_arn: String,
    role_session_name: String,
    external_id: Option<String>,
    duration_seconds: Option<u32>,

    region: String,
    sts_endpoint: Option<String>,

    source: Arc<dyn ProvideCredential<Credential = Credential>>,
}

impl AssumeRoleCredentialProvider {
    /// Create a new assume role loader using the regional STS endpoint of
    /// `region`.
    pub fn new(
        role_arn: &str,
        region: &str,
        source: Arc<dyn ProvideCredential<Credential = Credential>>,
    ) -> Self {
        Self {
            role_arn: role_arn.to_string(),
            role_session_name: ROLE_SESSION_NAME.to_string(),
            external_id: None,
            duration_seconds: None,
            region: region.to_string(),
            sts_endpoint: None,
            source,
        }
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: &str) -> Self {
        self.role_session_name = name.to_string();
        self
    }

    /// Set the external ID.
    pub fn with_external_id(mut self, id: &str) -> Self {
        self.external_id = Some(id.to_string());
        self
    }

    /// Set the duration in seconds.
    pub fn with_duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Replace the STS endpoint, e.g. `https://sts.local`.
    pub fn with_sts_endpoint(mut self, endpoint: &str) -> Self {
        self.sts_endpoint = Some(endpoint.trim_end_matches('/').to_string());
        self
    }

    /// The role this provider assumes.
    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    fn endpoint(&self) -> Result<String> {
        match &self.sts_endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Ok(format!(
                "https://{}",
                sts_endpoint(Some(&self.region), true)?
            )),
        }
    }

    fn build_url(&self, endpoint: &str) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("Action", "AssumeRole")
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.role_session_name)
            .append_pair("Version", "2011-06-15");
        if let Some(external_id) = &self.external_id {
            query.append_pair("ExternalId", external_id);
        }
        if let Some(duration_seconds) = &self.duration_seconds {
            query.append_pair("DurationSeconds", &duration_seconds.to_string());
        }

        format!("{endpoint}/?{}", query.finish())
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let source_cred = self.source.provide_credential(ctx).await?.ok_or_else(|| {
            Error::credential_invalid("no credential available to assume role with")
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;

        let endpoint = self
            .endpoint()
            .map_err(|e| e.with_context(format!("role_arn: {}", self.role_arn)))?;
        let url = self.build_url(&endpoint);
        debug!("assuming role {} via {endpoint}", self.role_arn);

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(url)
            .header(
                http::header::CONTENT_TYPE.as_str(),
                "application/x-www-form-urlencoded",
            )
            // Set content sha to empty string.
            .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build STS AssumeRole request")
                    .with_source(e)
                    .with_context(format!("role_arn: {}", self.role_arn))
                    .with_context(format!("endpoint: {endpoint}"))
            })?;

        let (mut parts, body) = req.into_parts();
        RequestSigner::new("sts", &self.region)
            .sign_request(ctx, &mut parts, Some(&source_cred))
            .await?;
        let req = http::Request::from_parts(parts, body);

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::credential_exchange_failure("failed to send AssumeRole request to STS")
                .with_source(e)
                .with_context(format!("role_arn: {}", self.role_arn))
                .with_context(format!("endpoint: {endpoint}"))
        })?;

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status != http::StatusCode::OK {
            let content = resp.into_body();
            return Err(parse_sts_error(
                "AssumeRole",
                status,
                &content,
                request_id.as_deref(),
            )
            .with_context(format!("role_arn: {}", self.role_arn))
            .with_context(format!("session_name: {}", self.role_session_name)));
        }

        let body = resp.into_body();
        let resp: AssumeRoleResponse = de::from_str(&body).map_err(|e| {
            Error::credential_exchange_failure("failed to parse STS AssumeRole response")
                .with_source(e)
                .with_context(format!("response_length: {}", body.len()))
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;
        let resp_cred = resp.result.credentials;

        let cred = Credential {
            access_key_id: resp_cred.access_key_id.trim().to_string(),
            secret_access_key: resp_cred.secret_access_key.trim().to_string(),
            session_token: Some(resp_cred.session_token.trim().to_string()),
            expires_in: Some(parse_rfc3339(resp_cred.expiration.trim()).map_err(|e| {
                Error::credential_exchange_failure(
                    "failed to parse AssumeRole credential expiration",
                )
                .with_source(e)
                .with_context(format!("expiration_value: {}", resp_cred.expiration))
                .with_context(format!("role_arn: {}", self.role_arn))
            })?),
        };

        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: AssumeRoleCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}
