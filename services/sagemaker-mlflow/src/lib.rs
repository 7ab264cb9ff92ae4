//! SigV4 signing for SageMaker managed MLflow.
//!
//! Requests are signed for the tracking server or MLflow app an ARN points
//! to, optionally through a role appended to the ARN after a `#`.
//!
//! ```no_run
//! use sagemaker_mlflow_auth::{Body, CredentialCache, MlflowSigner};
//! use sagemaker_mlflow_core::{Context, OsEnv};
//! use sagemaker_mlflow_file_read_tokio::TokioFileRead;
//! use sagemaker_mlflow_http_send_reqwest::ReqwestHttpSend;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!     let cache = Arc::new(CredentialCache::new());
//!
//!     let signer = MlflowSigner::from_env(
//!         ctx,
//!         "arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw#arn:aws:iam::0123456789:role/role-name",
//!         cache,
//!     )?;
//!
//!     let mut req = http::Request::get(format!(
//!         "{}/api/2.0/mlflow/experiments/search?max_results=10",
//!         signer.endpoint()?
//!     ))
//!     .body(Body::Empty)?;
//!     req.headers_mut().extend(signer.request_headers()?);
//!
//!     let req = signer.sign(req).await?;
//!     println!("{:?}", req.headers());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod arn;
pub use arn::{validate_role_arn, MlflowArn, ResourceType};

mod body;
pub use body::{payload_sha256, Body, ReadSeek};

mod config;
pub use config::Config;

mod constants;

mod credential;
pub use credential::Credential;

mod credential_cache;
pub use credential_cache::CredentialCache;

mod endpoint;
pub use endpoint::resolve_endpoint;

mod presigned_url;
pub use presigned_url::{
    PresignedUrlProvider, DEFAULT_SESSION_EXPIRATION, DEFAULT_URL_EXPIRATION,
};

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;

mod signer;
pub use signer::MlflowSigner;

#[cfg(test)]
mod test_utils;
