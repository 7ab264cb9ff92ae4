use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use async_trait::async_trait;
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use sagemaker_mlflow_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use sagemaker_mlflow_core::time::{format_date, format_iso8601, now, DateTime};
use sagemaker_mlflow_core::{Context, Error, Result, SignRequest, SigningRequest};
use std::fmt::Write;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// Every header present on the request is signed. The path is encoded once
/// more on top of its wire form, the way non-S3 services expect it.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for `service` in `region`.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Signing name of the service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Ok(());
        };

        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(req)?;

        // canonicalize context
        canonicalize_header(&mut signed_req, cred, now)?;

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req)?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{}", &scope)?;
            write!(f, "{}", &encoded_req)?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))
        .map_err(|e| {
            Error::credential_invalid("failed to create authorization header").with_source(e)
        })?;
        authorization.set_sensitive(true);

        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)
    }
}

fn canonical_request_string(ctx: &SigningRequest) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert path, encoded once more on top of its wire form.
    writeln!(f, "{}", utf8_percent_encode(&ctx.path, &AWS_URI_ENCODE_SET))?;
    // Insert query
    writeln!(f, "{}", canonical_query_string(ctx)?)?;
    // Insert signed headers, values normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    let signed_headers = ctx.header_name_to_vec_sorted();
    for header in signed_headers.iter() {
        let values = ctx
            .headers
            .get_all(*header)
            .iter()
            .map(|v| v.to_str().map(SigningRequest::header_value_normalize))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        writeln!(f, "{}:{}", header, values.join(","))?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    write!(f, "{}", ctx.header_get_or_default(&X_AMZ_CONTENT_SHA_256.parse()?)?)?;

    Ok(f)
}

/// Decode every query pair and encode it again with the AWS unreserved set,
/// sorted by key then value.
///
/// The request keeps its own query untouched, this form only feeds the
/// signature.
fn canonical_query_string(ctx: &SigningRequest) -> Result<String> {
    let mut query = ctx
        .query
        .iter()
        .map(|(k, v)| Ok((canonical_query_component(k)?, canonical_query_component(v)?)))
        .collect::<Result<Vec<_>>>()?;
    query.sort();

    Ok(query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&"))
}

fn canonical_query_component(s: &str) -> Result<String> {
    let decoded = percent_decode_str(s).decode_utf8().map_err(|e| {
        Error::request_invalid(format!("query component {s} is not valid utf-8")).with_source(e)
    })?;
    Ok(utf8_percent_encode(&decoded, &AWS_QUERY_ENCODE_SET).to_string())
}

fn canonicalize_header(ctx: &mut SigningRequest, cred: &Credential, now: DateTime) -> Result<()> {
    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // Insert DATE header if not present.
    if ctx.headers.get(X_AMZ_DATE).is_none() {
        ctx.headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
    }

    // Insert X_AMZ_CONTENT_SHA_256 header if not present.
    if ctx.headers.get(X_AMZ_CONTENT_SHA_256).is_none() {
        ctx.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_static("UNSIGNED-PAYLOAD"),
        );
    }

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token).map_err(|e| {
            Error::credential_invalid("session token is not a valid header value").with_source(e)
        })?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use aws_credential_types::Credentials;
    use aws_sigv4::http_request::PayloadChecksumKind;
    use aws_sigv4::http_request::PercentEncodingMode;
    use aws_sigv4::http_request::SignableBody;
    use aws_sigv4::http_request::SignableRequest;
    use aws_sigv4::http_request::SigningSettings;
    use aws_sigv4::sign::v4;
    use http::Request;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn test_get_request() -> Request<&'static str> {
        let mut req = Request::new("");
        *req.method_mut() = http::Method::GET;
        *req.uri_mut() = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/get-by-name?experiment_name=test"
            .parse()
            .expect("url must be valid");

        req
    }

    fn test_get_request_with_encoded_query() -> Request<&'static str> {
        let mut req = Request::new("");
        *req.method_mut() = http::Method::GET;
        *req.uri_mut() = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/runs/search?filter=metrics.rmse%20%3C%201&max_results=10&order_by=start_time%20DESC"
            .parse()
            .expect("url must be valid");

        req
    }

    fn test_get_request_with_encoded_path() -> Request<&'static str> {
        let mut req = Request::new("");
        *req.method_mut() = http::Method::GET;
        *req.uri_mut() = "https://mlflow.sagemaker.us-east-1.app.aws/api/2.0/mlflow-artifacts/artifacts/0/run%201/model.pkl"
            .parse()
            .expect("url must be valid");

        req
    }

    fn test_get_request_with_custom_headers() -> Request<&'static str> {
        let mut req = Request::new("");
        *req.method_mut() = http::Method::GET;
        *req.uri_mut() = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list"
            .parse()
            .expect("url must be valid");
        req.headers_mut().insert(
            "x-mlflow-sm-tracking-server-arn",
            "arn:aws:sagemaker:us-west-2:000000000000:mlflow-tracking-server/xw"
                .parse()
                .expect("must be valid"),
        );
        req.headers_mut()
            .insert(header::ACCEPT, "application/json".parse().expect("must be valid"));

        req
    }

    fn test_get_request_with_spaced_headers() -> Request<&'static str> {
        let mut req = test_get_request();
        req.headers_mut()
            .insert("x-custom", HeaderValue::from_static("a   b"));
        req.headers_mut()
            .insert(header::USER_AGENT, HeaderValue::from_static("  mlflow/2.16    python/3.11  "));

        req
    }

    fn test_post_request_with_body_digest() -> Request<&'static str> {
        let content = r#"{"name":"experiment"}"#;
        let mut req = Request::new(content);
        *req.method_mut() = http::Method::POST;
        *req.uri_mut() = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/create"
            .parse()
            .expect("url must be valid");

        req.headers_mut().insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&content.len().to_string()).expect("must be valid"),
        );
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        req.headers_mut().insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&hex_sha256(content.as_bytes())).expect("must be valid"),
        );

        req
    }

    #[track_caller]
    fn compare_request(name: &str, l: &Request<&str>, r: &Request<&str>) {
        fn format_headers(req: &Request<&str>) -> Vec<String> {
            let mut hs = req
                .headers()
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v.to_str().expect("must be valid")))
                .collect::<Vec<_>>();

            // Insert host if original request doesn't have it.
            let authority = req.uri().authority().expect("must have authority");
            if !hs.contains(&format!("host:{authority}")) {
                hs.push(format!("host:{authority}"))
            }

            hs.sort();
            hs
        }

        assert_eq!(
            format_headers(l),
            format_headers(r),
            "{name} header mismatch"
        );
        assert_eq!(l.uri(), r.uri(), "{name} uri mismatch");
    }

    fn aws_sigv4_sign(
        mut req: Request<&'static str>,
        cred: &Credential,
        service: &str,
        now: DateTime,
    ) -> anyhow::Result<Request<&'static str>> {
        let mut ss = SigningSettings::default();
        ss.percent_encoding_mode = PercentEncodingMode::Double;
        ss.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        let id = Credentials::new(
            &cred.access_key_id,
            &cred.secret_access_key,
            cred.session_token.clone(),
            None,
            "hardcoded-credentials",
        )
        .into();
        let sp = v4::SigningParams::builder()
            .identity(&id)
            .region("us-west-2")
            .name(service)
            .time(SystemTime::from(now))
            .settings(ss)
            .build()
            .expect("signing params must be valid");

        let mut body = SignableBody::UnsignedPayload;
        if req.headers().get(X_AMZ_CONTENT_SHA_256).is_some() {
            body = SignableBody::Bytes(req.body().as_bytes());
        }

        let output = aws_sigv4::http_request::sign(
            SignableRequest::new(
                req.method().as_str(),
                req.uri().to_string(),
                req.headers()
                    .iter()
                    .map(|(k, v)| (k.as_str(), std::str::from_utf8(v.as_bytes()).unwrap())),
                body,
            )
            .unwrap(),
            &sp.into(),
        )?;
        let (aws_sig, _) = output.into_parts();
        aws_sig.apply_to_request_http1x(&mut req);
        Ok(req)
    }

    #[test_case("get_request", test_get_request, None)]
    #[test_case("get_request_with_encoded_query", test_get_request_with_encoded_query, None)]
    #[test_case("get_request_with_encoded_path", test_get_request_with_encoded_path, None)]
    #[test_case("get_request_with_custom_headers", test_get_request_with_custom_headers, None)]
    #[test_case("get_request_with_spaced_headers", test_get_request_with_spaced_headers, None)]
    #[test_case("post_request_with_body_digest", test_post_request_with_body_digest, None)]
    #[test_case("get_request_with_token", test_get_request, Some("session_token"))]
    #[test_case("post_request_with_token", test_post_request_with_body_digest, Some("session_token"))]
    #[tokio::test]
    async fn test_matches_aws_sigv4(
        name: &str,
        req_fn: fn() -> Request<&'static str>,
        token: Option<&str>,
    ) -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();

        let cred = Credential {
            access_key_id: "access_key_id".to_string(),
            secret_access_key: "secret_access_key".to_string(),
            session_token: token.map(|v| v.to_string()),
            expires_in: None,
        };
        let now = now();

        let expected_req = aws_sigv4_sign(req_fn(), &cred, "sagemaker-mlflow", now)?;

        let (mut parts, body) = req_fn().into_parts();
        RequestSigner::new("sagemaker-mlflow", "us-west-2")
            .with_time(now)
            .sign_request(&Context::new(), &mut parts, Some(&cred))
            .await?;
        let actual_req = Request::from_parts(parts, body);

        compare_request(name, &expected_req, &actual_req);
        Ok(())
    }

    #[tokio::test]
    async fn test_without_credential_leaves_request_untouched() -> anyhow::Result<()> {
        let (mut parts, _) = test_get_request_with_custom_headers().into_parts();
        let uri = parts.uri.clone();
        let headers = parts.headers.clone();

        RequestSigner::new("sagemaker-mlflow", "us-west-2")
            .sign_request(&Context::new(), &mut parts, None)
            .await?;

        assert_eq!(parts.uri, uri);
        assert_eq!(parts.headers, headers);
        Ok(())
    }

    #[test]
    fn test_canonical_query_string() -> Result<()> {
        let mut parts = Request::builder()
            .uri("https://example.com/?b=2&a=x%20y&a=w&c&d=%7E")
            .body(())?
            .into_parts()
            .0;
        let req = SigningRequest::build(&mut parts)?;

        assert_eq!(
            canonical_query_string(&req)?,
            "a=w&a=x%20y&b=2&c=&d=~"
        );
        Ok(())
    }
}
