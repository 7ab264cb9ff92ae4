use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use ini::Ini;
use log::debug;
use sagemaker_mlflow_core::{Context, Error, ProvideCredential, Result};

/// ProfileCredentialProvider loads AWS credentials from the shared files.
///
/// The credentials file (`AWS_SHARED_CREDENTIALS_FILE`, default
/// `~/.aws/credentials`) is read first, then the config file
/// (`AWS_CONFIG_FILE`, default `~/.aws/config`).
///
/// `AWS_PROFILE` wins over the profile set with `with_profile()`, which
/// defaults to `default`.
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }
}

/// Read the credential stored in `section` of the ini file at `path`.
///
/// Unreadable files and missing sections yield `Ok(None)`, malformed files
/// are errors.
async fn load_section(ctx: &Context, path: &str, section: &str) -> Result<Option<Credential>> {
    let path = if path.starts_with("~/") {
        match ctx.expand_home_dir(path) {
            Some(expanded) => expanded,
            None => {
                debug!("failed to expand homedir for path: {path}");
                return Ok(None);
            }
        }
    } else {
        path.to_string()
    };

    let content = match ctx.file_read_as_string(&path).await {
        Ok(content) => content,
        Err(err) => {
            debug!("failed to read {path}: {err}");
            return Ok(None);
        }
    };

    let conf = Ini::load_from_str(&content).map_err(|e| {
        Error::config_invalid("failed to parse aws profile file")
            .with_source(e)
            .with_context(format!("path: {path}"))
    })?;

    let Some(props) = conf.section(Some(section)) else {
        debug!("section {section} not found in {path}");
        return Ok(None);
    };

    match (
        props.get("aws_access_key_id"),
        props.get("aws_secret_access_key"),
    ) {
        (Some(ak), Some(sk)) => Ok(Some(Credential {
            access_key_id: ak.to_string(),
            secret_access_key: sk.to_string(),
            session_token: props.get("aws_session_token").map(|s| s.to_string()),
            expires_in: None,
        })),
        _ => Ok(None),
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var_non_empty(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        let credentials_file = self
            .credentials_file
            .clone()
            .or_else(|| ctx.env_var_non_empty(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| "~/.aws/credentials".to_string());
        if let Some(cred) = load_section(ctx, &credentials_file, &profile).await? {
            return Ok(Some(cred));
        }

        let config_file = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var_non_empty(AWS_CONFIG_FILE))
            .unwrap_or_else(|| "~/.aws/config".to_string());
        let section = match profile.as_str() {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };
        load_section(ctx, &config_file, &section).await
    }
}
