use std::mem;
use std::str::FromStr;

use crate::{Error, Result};
use http::header::HeaderName;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;
use http::Uri;

/// Signing context for request.
///
/// Path and query are kept exactly as they appear on the wire. Signers build
/// their canonical forms from them without writing the canonical form back,
/// so applying the context never rewrites the url.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, still percent encoded.
    pub path: String,
    /// HTTP query pairs, still percent encoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,

    raw: PathAndQuery,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq.query().map(Self::query_split).unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),

            raw: paq,
        })
    }

    /// Split a raw query string into pairs without decoding them.
    ///
    /// `a=1&b&c=` yields `[("a", "1"), ("b", ""), ("c", "")]`.
    pub fn query_split(query: &str) -> Vec<(String, String)> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect()
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();
        let untouched = self.is_url_untouched();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = if untouched {
                Some(self.raw)
            } else {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Whether path and query still match the url the context was built from.
    fn is_url_untouched(&self) -> bool {
        self.path == self.raw.path()
            && self.query == self.raw.query().map(Self::query_split).unwrap_or_default()
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Normalize header value for signing: trim leading and trailing spaces
    /// and tabs, and collapse every inner run of them into a single space.
    pub fn header_value_normalize(v: &str) -> String {
        let mut normalized = String::with_capacity(v.len());
        for word in v.split(|c| c == ' ' || c == '\t').filter(|w| !w.is_empty()) {
            if !normalized.is_empty() {
                normalized.push(' ');
            }
            normalized.push_str(word);
        }
        normalized
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parts(uri: &str) -> http::request::Parts {
        http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("x-custom", "  padded  ")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[test]
    fn test_query_split_keeps_encoding() {
        assert_eq!(
            SigningRequest::query_split("filter=a+b&name=x%20y&flag&empty="),
            vec![
                ("filter".to_string(), "a+b".to_string()),
                ("name".to_string(), "x%20y".to_string()),
                ("flag".to_string(), String::new()),
                ("empty".to_string(), String::new()),
            ]
        );
        assert!(SigningRequest::query_split("").is_empty());
    }

    #[test]
    fn test_build_and_apply_round_trip_url() -> Result<()> {
        let uri = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/runs/search?q=a+b&max_results=10";
        let mut parts = parts(uri);

        let req = SigningRequest::build(&mut parts)?;
        assert_eq!(req.authority.as_str(), "us-west-2.experiments.sagemaker.aws");
        assert_eq!(req.path, "/api/2.0/mlflow/runs/search");
        assert_eq!(req.query.len(), 2);
        assert!(parts.headers.is_empty());

        req.apply(&mut parts)?;
        assert_eq!(parts.uri.to_string(), uri);
        assert_eq!(parts.headers["x-custom"], "  padded  ");
        Ok(())
    }

    #[test]
    fn test_apply_keeps_raw_query() -> Result<()> {
        let uri = "https://example.com/path?flag&empty=&a=1";
        let mut parts = parts(uri);

        SigningRequest::build(&mut parts)?.apply(&mut parts)?;
        assert_eq!(parts.uri.to_string(), uri);
        Ok(())
    }

    #[test]
    fn test_apply_writes_modified_query() -> Result<()> {
        let mut parts = parts("https://example.com/path?a=1");

        let mut req = SigningRequest::build(&mut parts)?;
        req.query.push(("b".to_string(), "2".to_string()));
        req.apply(&mut parts)?;
        assert_eq!(parts.uri.to_string(), "https://example.com/path?a=1&b=2");
        Ok(())
    }

    #[test]
    fn test_build_without_authority_fails() {
        let mut parts = parts("/relative/path");

        let err = SigningRequest::build(&mut parts).expect_err("must fail");
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_header_value_normalize() {
        for (input, expected) in [
            ("  padded value  ", "padded value"),
            ("a   b", "a b"),
            ("a \t b\tc", "a b c"),
            ("single", "single"),
            ("   ", ""),
        ] {
            assert_eq!(SigningRequest::header_value_normalize(input), expected);
        }
    }
}
