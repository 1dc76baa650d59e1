//! Provider abstraction and ordered fallback chain

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::credentials::ClaudeCredentials;
use crate::error::Result;

/// Future returned by [`CredentialProvider::load`].
pub type LoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<ClaudeCredentials>>> + Send + 'a>>;

/// A source of model API credentials.
///
/// `load` returns `Ok(None)` when this source has nothing for the user and
/// `Err` when the source exists but is unusable (unreadable or malformed).
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Box<dyn CredentialProvider>`).
pub trait CredentialProvider: Send + Sync {
    /// Identifier for logging (e.g. "file", "env", "chain")
    fn name(&self) -> &str;

    /// Look up credentials for `user_id`. An empty id means the process owner.
    fn load<'a>(&'a self, user_id: &'a str) -> LoadFuture<'a>;
}

/// Ordered list of providers; the first one with credentials wins.
///
/// A provider error stops the chain and is returned to the caller rather
/// than falling through to the next source, so a corrupt credentials file
/// is never masked by a stale environment variable.
#[derive(Default)]
pub struct ChainCredentialProvider {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainCredentialProvider {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    /// Append a provider to the end of the chain.
    pub fn push(&mut self, provider: Box<dyn CredentialProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl CredentialProvider for ChainCredentialProvider {
    fn name(&self) -> &str {
        "chain"
    }

    fn load<'a>(&'a self, user_id: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            for provider in &self.providers {
                match provider.load(user_id).await {
                    Ok(Some(credentials)) => {
                        debug!(provider = provider.name(), user_id, "credentials resolved");
                        return Ok(Some(credentials));
                    }
                    Ok(None) => {
                        debug!(provider = provider.name(), user_id, "no credentials from provider");
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), user_id, error = %e, "credential provider failed");
                        return Err(e);
                    }
                }
            }
            Ok(None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Found(&'static str),
        Missing,
        Broken,
    }

    /// Test provider with a fixed outcome and a call counter.
    struct FixedProvider {
        name: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    impl FixedProvider {
        fn boxed(name: &'static str, outcome: Outcome) -> (Box<dyn CredentialProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = FixedProvider {
                name,
                outcome,
                calls: calls.clone(),
            };
            (Box::new(provider), calls)
        }
    }

    impl CredentialProvider for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn load<'a>(&'a self, _user_id: &'a str) -> LoadFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = match self.outcome {
                Outcome::Found(token) => Ok(Some(ClaudeCredentials::new(
                    token.to_string(),
                    String::new(),
                    String::new(),
                ))),
                Outcome::Missing => Ok(None),
                Outcome::Broken => Err(Error::CredentialParse(format!("{} is corrupt", self.name))),
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn empty_chain_returns_none() {
        let chain = ChainCredentialProvider::default();
        assert!(chain.is_empty());
        assert!(chain.load("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let (first, first_calls) = FixedProvider::boxed("first", Outcome::Found("at_first"));
        let (second, second_calls) = FixedProvider::boxed("second", Outcome::Found("at_second"));
        let chain = ChainCredentialProvider::new(vec![first, second]);

        let creds = chain.load("alice").await.unwrap().unwrap();
        assert_eq!(creds.access_token(), "at_first");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            second_calls.load(Ordering::SeqCst),
            0,
            "later providers must not be consulted after a hit"
        );
    }

    #[tokio::test]
    async fn falls_through_missing_providers() {
        let (missing, _) = FixedProvider::boxed("file", Outcome::Missing);
        let (found, _) = FixedProvider::boxed("env", Outcome::Found("at_env"));
        let chain = ChainCredentialProvider::new(vec![missing, found]);

        let creds = chain.load("").await.unwrap().unwrap();
        assert_eq!(creds.access_token(), "at_env");
    }

    #[tokio::test]
    async fn all_missing_returns_none() {
        let (a, a_calls) = FixedProvider::boxed("a", Outcome::Missing);
        let (b, b_calls) = FixedProvider::boxed("b", Outcome::Missing);
        let chain = ChainCredentialProvider::new(vec![a, b]);

        assert!(chain.load("alice").await.unwrap().is_none());
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_error_stops_the_chain() {
        let (broken, _) = FixedProvider::boxed("file", Outcome::Broken);
        let (env, env_calls) = FixedProvider::boxed("env", Outcome::Found("at_env"));
        let mut chain = ChainCredentialProvider::default();
        chain.push(broken);
        chain.push(env);
        assert_eq!(chain.len(), 2);

        let err = chain.load("alice").await.unwrap_err();
        assert!(matches!(err, Error::CredentialParse(_)), "got: {err:?}");
        assert_eq!(
            env_calls.load(Ordering::SeqCst),
            0,
            "a failing provider must not fall through to the next one"
        );
    }
}
