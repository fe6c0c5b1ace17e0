//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable against in-memory adapters.

use crate::domain::Services;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub services: Services,
}

impl HttpState {
    /// Wrap the use-case services shared by every handler.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use tracker_backend::domain::{
    ///     PasswordHasher, ServiceConfig, ServiceDeps, Services, TokenSigner,
    /// };
    /// use tracker_backend::inbound::http::state::HttpState;
    /// use tracker_backend::outbound::mail::TracingMailer;
    /// use tracker_backend::outbound::memory::MemoryStore;
    ///
    /// let store = MemoryStore::new();
    /// let services = Services::new(
    ///     ServiceDeps {
    ///         repos: MemoryStore::repositories(&store),
    ///         mailer: Arc::new(TracingMailer::new()),
    ///         clock: Arc::new(DefaultClock),
    ///         hasher: PasswordHasher::default(),
    ///         signer: TokenSigner::new(b"secret".to_vec()),
    ///     },
    ///     ServiceConfig::default(),
    /// );
    /// let state = HttpState::new(services);
    /// let _auth = state.services.auth.clone();
    /// ```
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}
