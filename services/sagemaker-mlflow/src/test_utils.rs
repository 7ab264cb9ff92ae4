use bytes::Bytes;
use sagemaker_mlflow_core::{HttpSend, Result};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&http::Request<Bytes>) -> http::Response<Bytes> + Send + Sync;

/// HttpSend that records requests and answers them with a closure.
#[derive(Clone)]
pub struct MockHttpSend {
    requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
    responder: Arc<Responder>,
}

impl Debug for MockHttpSend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHttpSend").finish_non_exhaustive()
    }
}

impl MockHttpSend {
    pub fn new(
        responder: impl Fn(&http::Request<Bytes>) -> http::Response<Bytes> + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Arc::default(),
            responder: Arc::new(responder),
        }
    }

    /// Answer every request with `status` and `body`.
    pub fn always(status: u16, body: &str) -> Self {
        let body = Bytes::from(body.to_string());
        Self::new(move |_| {
            http::Response::builder()
                .status(status)
                .body(body.clone())
                .expect("response must be valid")
        })
    }

    pub fn requests(&self) -> Vec<http::Request<Bytes>> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|req| {
                let mut cloned = http::Request::builder()
                    .method(req.method().clone())
                    .uri(req.uri().clone())
                    .body(req.body().clone())
                    .expect("request must be valid");
                *cloned.headers_mut() = req.headers().clone();
                cloned
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }
}

#[async_trait::async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let resp = (self.responder)(&req);
        self.requests.lock().expect("lock poisoned").push(req);
        Ok(resp)
    }
}

/// STS AssumeRole response carrying `access_key_id`.
pub fn assume_role_response(access_key_id: &str) -> String {
    format!(
        r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <Credentials>
      <AccessKeyId>{access_key_id}</AccessKeyId>
      <SecretAccessKey>assumed_secret_access_key</SecretAccessKey>
      <SessionToken>assumed_session_token</SessionToken>
      <Expiration>2124-11-09T13:34:41Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
</AssumeRoleResponse>"#
    )
}
