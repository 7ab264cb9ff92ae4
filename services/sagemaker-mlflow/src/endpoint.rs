use crate::arn::{unsupported_resource_type, MlflowArn, ResourceType};
use crate::constants::SAGEMAKER_SERVICE;
use log::info;
use sagemaker_mlflow_core::{Error, Result};

/// Resolve the base url of the MLflow endpoint `arn` points to.
///
/// A non-empty `custom_endpoint` (`SAGEMAKER_MLFLOW_CUSTOM_ENDPOINT`) is
/// returned verbatim without looking at the arn.
///
/// - `mlflow-tracking-server`: `https://{region}.experiments.sagemaker.{suffix}`
/// - `mlflow-app`: `https://mlflow.sagemaker.{region}.app.{suffix}`
pub fn resolve_endpoint(arn: &MlflowArn, custom_endpoint: Option<&str>) -> Result<String> {
    if let Some(endpoint) = custom_endpoint.filter(|v| !v.is_empty()) {
        info!("using custom endpoint {endpoint}");
        return Ok(endpoint.to_string());
    }

    if arn.service() != SAGEMAKER_SERVICE {
        return Err(Error::invalid_identifier(format!("{arn} is not a valid arn")));
    }

    let suffix = dns_suffix(arn.partition())?;
    match arn.resource_type() {
        ResourceType::TrackingServer => Ok(format!(
            "https://{}.experiments.sagemaker.{suffix}",
            arn.region()
        )),
        ResourceType::App => Ok(format!(
            "https://mlflow.sagemaker.{}.app.{suffix}",
            arn.region()
        )),
        ResourceType::Other(v) => Err(unsupported_resource_type(v)),
    }
}

/// DNS suffix of MLflow endpoints in `partition`.
fn dns_suffix(partition: &str) -> Result<&'static str> {
    match partition {
        "aws" | "aws-us-gov" => Ok("aws"),
        v => Err(Error::unsupported_partition(format!(
            "partition {v} is not supported"
        ))),
    }
}

impl MlflowArn {
    /// Shorthand for [`resolve_endpoint`].
    pub fn endpoint(&self, custom_endpoint: Option<&str>) -> Result<String> {
        resolve_endpoint(self, custom_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sagemaker_mlflow_core::ErrorKind;
    use test_case::test_case;

    #[test_case("arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw", "https://us-west-2.experiments.sagemaker.aws" ; "tracking server")]
    #[test_case("arn:aws-us-gov:sagemaker:us-gov-west-1:000000000000:mlflow-tracking-server/xw", "https://us-gov-west-1.experiments.sagemaker.aws" ; "tracking server in govcloud")]
    #[test_case("arn:aws:sagemaker:us-east-1:000000000000:mlflow-app/app-1", "https://mlflow.sagemaker.us-east-1.app.aws" ; "app")]
    #[test_case("arn:aws-us-gov:sagemaker:us-east-1:000000000000:mlflow-app/app-1", "https://mlflow.sagemaker.us-east-1.app.aws" ; "app in govcloud")]
    fn test_resolve_endpoint(arn: &str, expected: &str) -> Result<()> {
        let arn = MlflowArn::parse(arn)?;

        assert_eq!(resolve_endpoint(&arn, None)?, expected);
        assert_eq!(arn.endpoint(Some(""))?, expected);
        Ok(())
    }

    #[test]
    fn test_custom_endpoint_wins() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let arn = MlflowArn::parse("arn:aws-ocean:sagemaker:us-west-2:000000000000:notebook/xw")?;
        assert_eq!(resolve_endpoint(&arn, Some("https://a.com"))?, "https://a.com");
        Ok(())
    }

    #[test]
    fn test_unsupported_partition() -> Result<()> {
        let arn = MlflowArn::parse("arn:aws-ocean:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw")?;

        let err = resolve_endpoint(&arn, None).expect_err("partition must be rejected");
        assert_eq!(err.kind(), ErrorKind::UnsupportedPartition);
        assert!(err.message().contains("aws-ocean"));
        Ok(())
    }

    #[test]
    fn test_unsupported_resource_type() -> Result<()> {
        let arn = MlflowArn::parse("arn:aws:sagemaker:us-west-2:000000000000:notebook/xw")?;

        let err = resolve_endpoint(&arn, None).expect_err("resource type must be rejected");
        assert_eq!(err.kind(), ErrorKind::UnsupportedResourceType);
        Ok(())
    }
}
