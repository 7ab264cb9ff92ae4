use crate::{Context, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::{Arc, Mutex};

/// Signer is the main struct used to sign the request.
///
/// By default it memoizes the credential returned by its provider and
/// reloads it once [`SigningCredential::is_valid`] reports it stale.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
    reuse_credential: bool,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,
            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
            reuse_credential: true,
        }
    }

    /// Set whether the loaded credential is memoized between requests.
    ///
    /// Turn it off for providers that keep their own cache, so every request
    /// observes that cache's evictions.
    pub fn with_credential_reuse(mut self, reuse: bool) -> Self {
        self.reuse_credential = reuse;
        self
    }

    /// Get the context this signer loads credentials with.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Load the credential, reusing the memoized one while it's still valid.
    pub async fn credential(&self) -> Result<Option<K>> {
        if !self.reuse_credential {
            return self.loader.provide_credential(&self.ctx).await;
        }

        let cred = self.credential.lock().expect("lock poisoned").clone();
        if cred.is_valid() {
            return Ok(cred);
        }

        let cred = self.loader.provide_credential(&self.ctx).await?;
        *self.credential.lock().expect("lock poisoned") = cred.clone();
        Ok(cred)
    }

    /// Signing request.
    pub async fn sign(&self, req: &mut http::request::Parts) -> Result<()> {
        let cred = self.credential().await?;
        self.sign_with_credential(req, cred.as_ref()).await
    }

    /// Sign request with a credential loaded by [`Signer::credential`].
    pub async fn sign_with_credential(
        &self,
        req: &mut http::request::Parts,
        cred: Option<&K>,
    ) -> Result<()> {
        self.builder.sign_request(&self.ctx, req, cred).await
    }
}
