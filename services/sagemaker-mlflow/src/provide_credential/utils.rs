use quick_xml::de;
use sagemaker_mlflow_core::{Error, Result};
use serde::Deserialize;

/// Get the sts endpoint.
///
/// The returning format may look like `sts.{region}.amazonaws.com`
///
/// # Notes
///
/// AWS could have different sts endpoint based on it's region.
/// We can check them by region name.
///
/// ref: https://github.com/awslabs/aws-sdk-rust/blob/31cfae2cf23be0c68a47357070dea1aee9227e3a/sdk/sts/src/aws_endpoint.rs
pub fn sts_endpoint(region: Option<&str>, use_regional: bool) -> Result<String> {
    if use_regional {
        let region =
            region.ok_or_else(|| Error::config_invalid("regional STS endpoint requires region"))?;
        if region.starts_with("cn-") {
            Ok(format!("sts.{region}.amazonaws.com.cn"))
        } else {
            Ok(format!("sts.{region}.amazonaws.com"))
        }
    } else {
        let region = region.unwrap_or_default();
        if region.starts_with("cn") {
            Ok("sts.amazonaws.com.cn".to_string())
        } else {
            Ok("sts.amazonaws.com".to_string())
        }
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsError,
    request_id: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsError {
    code: String,
    message: String,
}

/// Turn a non-200 STS response into a `CredentialExchangeFailure`.
///
/// Bodies that aren't STS error documents are kept verbatim.
pub fn parse_sts_error(
    action: &str,
    status: http::StatusCode,
    body: &str,
    request_id: Option<&str>,
) -> Error {
    let err = match de::from_str::<StsErrorResponse>(body) {
        Ok(resp) if !resp.error.code.is_empty() => {
            let err = Error::credential_exchange_failure(format!(
                "{action} failed with {status}: {}: {}",
                resp.error.code, resp.error.message
            ));
            match resp.request_id.as_deref().or(request_id) {
                Some(id) => err.with_context(format!("request_id: {id}")),
                None => err,
            }
        }
        _ => {
            let err = Error::credential_exchange_failure(format!(
                "{action} failed with {status}: {body}"
            ));
            match request_id {
                Some(id) => err.with_context(format!("request_id: {id}")),
                None => err,
            }
        }
    };

    err.with_context(format!("status: {status}"))
}
