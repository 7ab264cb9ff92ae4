use crate::common::{access_key_of, env, FakeSts, ROLE, TRACKING_SERVER};
use anyhow::Result;
use chrono::{TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;
use sagemaker_mlflow_auth::{Body, CredentialCache, MlflowSigner};
use sagemaker_mlflow_core::{Context, ErrorKind};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn get(url: &str) -> http::Request<Body> {
    http::Request::get(url)
        .body(Body::Empty)
        .expect("request must be valid")
}

#[tokio::test]
async fn test_sign_with_ambient_credential() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[]));

    let signer = MlflowSigner::from_env(ctx, TRACKING_SERVER, Arc::new(CredentialCache::new()))?;
    let endpoint = signer.endpoint()?;
    assert_eq!(endpoint, "https://us-west-2.experiments.sagemaker.aws");

    let req = signer
        .sign(get(&format!("{endpoint}/api/2.0/mlflow/experiments/list")))
        .await?;
    assert_eq!(access_key_of(&req), "ambient_access_key_id");
    assert_eq!(sts.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_sign_with_role_from_arn() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[]));

    let signer = MlflowSigner::from_env(
        ctx,
        &format!("{TRACKING_SERVER}#{ROLE}"),
        Arc::new(CredentialCache::new()),
    )?;

    let req = signer
        .sign(get("https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list"))
        .await?;
    assert_eq!(access_key_of(&req), "ASSUMED-0");
    assert_eq!(req.headers()["x-amz-security-token"], "assumed_session_token");
    assert_eq!(sts.calls(), 1);
    assert!(sts.uris()[0].starts_with("https://sts.us-west-2.amazonaws.com/?Action=AssumeRole"));

    // Routing headers never carry the role.
    let headers = signer.request_headers()?;
    assert_eq!(headers.len(), 1);
    assert_eq!(headers["x-mlflow-sm-tracking-server-arn"], TRACKING_SERVER);
    Ok(())
}

#[tokio::test]
async fn test_sign_with_role_from_env() -> Result<()> {
    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[("SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN", ROLE)]));

    let signer = MlflowSigner::from_env(ctx, TRACKING_SERVER, Arc::new(CredentialCache::new()))?;

    let req = signer
        .sign(get("https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list"))
        .await?;
    assert_eq!(access_key_of(&req), "ASSUMED-0");
    Ok(())
}

#[tokio::test]
async fn test_shared_cache_assumes_role_once_per_ttl() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let clock = Arc::new(AtomicI64::new(0));
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let offset = clock.clone();
    let cache = Arc::new(CredentialCache::new().with_clock(move || {
        start + TimeDelta::try_seconds(offset.load(Ordering::SeqCst)).unwrap()
    }));

    let sts = FakeSts::default();
    let ctx = Context::new().with_http_send(sts.clone()).with_env(env(&[(
        "SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL",
        "600",
    )]));
    let arn = format!("{TRACKING_SERVER}#{ROLE}");
    let url = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list";

    for _ in 0..3 {
        let signer = MlflowSigner::from_env(ctx.clone(), &arn, cache.clone())?;
        let req = signer.sign(get(url)).await?;
        assert_eq!(access_key_of(&req), "ASSUMED-0");
    }
    assert_eq!(sts.calls(), 1);

    clock.store(599, Ordering::SeqCst);
    let signer = MlflowSigner::from_env(ctx.clone(), &arn, cache.clone())?;
    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-0");

    clock.store(600, Ordering::SeqCst);
    let signer = MlflowSigner::from_env(ctx.clone(), &arn, cache.clone())?;
    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-1");
    assert_eq!(sts.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_one_signer_follows_cache_across_ttl() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let clock = Arc::new(AtomicI64::new(0));
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let offset = clock.clone();
    let cache = Arc::new(CredentialCache::new().with_clock(move || {
        start + TimeDelta::try_seconds(offset.load(Ordering::SeqCst)).unwrap()
    }));

    let sts = FakeSts::default();
    let ctx = Context::new().with_http_send(sts.clone()).with_env(env(&[(
        "SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL",
        "300",
    )]));
    let url = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list";
    let signer = MlflowSigner::from_env(ctx, &format!("{TRACKING_SERVER}#{ROLE}"), cache.clone())?;

    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-0");
    clock.store(299, Ordering::SeqCst);
    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-0");
    assert_eq!(sts.calls(), 1);

    // Expired entries are never served again, even to a signer that used them.
    clock.store(10_000, Ordering::SeqCst);
    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-1");

    cache.clear();
    assert_eq!(access_key_of(&signer.sign(get(url)).await?), "ASSUMED-2");
    assert_eq!(sts.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_roles_are_cached_separately() -> Result<()> {
    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[]));
    let cache = Arc::new(CredentialCache::new());
    let url = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list";

    let a = MlflowSigner::from_env(ctx.clone(), &format!("{TRACKING_SERVER}#{ROLE}"), cache.clone())?;
    let b = MlflowSigner::from_env(
        ctx.clone(),
        &format!("{TRACKING_SERVER}#arn:aws:iam::0123456789:role/other"),
        cache.clone(),
    )?;

    assert_eq!(access_key_of(&a.sign(get(url)).await?), "ASSUMED-0");
    assert_eq!(access_key_of(&b.sign(get(url)).await?), "ASSUMED-1");
    assert_eq!(cache.len(), 2);
    Ok(())
}

#[test]
fn test_invalid_role_fails_signing() -> Result<()> {
    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[]));

    let err = MlflowSigner::from_env(
        ctx,
        &format!("{TRACKING_SERVER}#arn:aws:s3:::bucket/key"),
        Arc::new(CredentialCache::new()),
    )
    .expect_err("role must be rejected");
    assert_eq!(err.kind(), ErrorKind::DelegatedRoleInvalid);
    assert_eq!(sts.calls(), 0);
    Ok(())
}

#[test]
fn test_invalid_ttl_fails() -> Result<()> {
    let ctx = Context::new().with_env(env(&[(
        "SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL",
        "forever",
    )]));

    let err = MlflowSigner::from_env(ctx, TRACKING_SERVER, Arc::new(CredentialCache::new()))
        .expect_err("ttl must be rejected");
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_signers_share_cache() -> Result<()> {
    let sts = FakeSts::default();
    let ctx = Context::new()
        .with_http_send(sts.clone())
        .with_env(env(&[]));
    let cache = Arc::new(CredentialCache::new());

    // Warm the cache so every task hits it.
    let arn = format!("{TRACKING_SERVER}#{ROLE}");
    let url = "https://us-west-2.experiments.sagemaker.aws/api/2.0/mlflow/experiments/list";
    MlflowSigner::from_env(ctx.clone(), &arn, cache.clone())?
        .sign(get(url))
        .await?;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let ctx = ctx.clone();
        let cache = cache.clone();
        let arn = arn.clone();
        tasks.push(tokio::spawn(async move {
            let signer = MlflowSigner::from_env(ctx, &arn, cache)?;
            let req = signer.sign(get(url)).await?;
            anyhow::Ok(access_key_of(&req))
        }));
    }
    for task in tasks {
        assert_eq!(task.await??, "ASSUMED-0");
    }
    assert_eq!(sts.calls(), 1);
    Ok(())
}
