use bytes::Bytes;
use sagemaker_mlflow_core::{HttpSend, Result, StaticEnv};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TRACKING_SERVER: &str =
    "arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw";
pub const ROLE: &str = "arn:aws:iam::0123456789:role/role-name";

/// Fake STS answering every AssumeRole with `ASSUMED-<n>`.
#[derive(Clone, Default)]
pub struct FakeSts {
    calls: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl Debug for FakeSts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeSts")
            .field("calls", &self.calls())
            .finish()
    }
}

impl FakeSts {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().expect("lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl HttpSend for FakeSts {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.uris
            .lock()
            .expect("lock poisoned")
            .push(req.uri().to_string());

        let body = format!(
            r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>ASSUMED-{n}</AccessKeyId>
      <SecretAccessKey>assumed_secret_access_key</SecretAccessKey>
      <SessionToken>assumed_session_token</SessionToken>
      <Expiration>2124-11-09T13:34:41Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#
        );
        Ok(http::Response::builder()
            .status(200)
            .body(Bytes::from(body))
            .expect("response must be valid"))
    }
}

/// Env carrying ambient AWS keys plus `extra`.
pub fn env(extra: &[(&str, &str)]) -> StaticEnv {
    let mut envs = HashMap::from([
        ("AWS_ACCESS_KEY_ID".to_string(), "ambient_access_key_id".to_string()),
        (
            "AWS_SECRET_ACCESS_KEY".to_string(),
            "ambient_secret_access_key".to_string(),
        ),
    ]);
    envs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    StaticEnv {
        home_dir: None,
        envs,
    }
}

/// Access key id the request was signed with.
pub fn access_key_of(req: &http::Request<sagemaker_mlflow_auth::Body>) -> String {
    let authorization = req.headers()[http::header::AUTHORIZATION]
        .to_str()
        .expect("authorization must be ascii");
    authorization
        .trim_start_matches("AWS4-HMAC-SHA256 Credential=")
        .split('/')
        .next()
        .expect("credential must exist")
        .to_string()
}
