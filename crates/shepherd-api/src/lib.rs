//! JSON REST API for Shepherd.
//!
//! Exposes an axum [`Router`] backed by any
//! [`shepherd_core::store::VisitorStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", shepherd_api::api_router(store.clone(), policy))
//! ```

pub mod error;
pub mod visitors;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use shepherd_core::{lifecycle::TransitionPolicy, store::VisitorStore};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  /// Status changes permitted on update.
  pub policy: Arc<TransitionPolicy>,
}

// Manual impl: cloning only bumps the `Arc`s, so `S` need not be `Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: Arc::clone(&self.policy) }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, policy: TransitionPolicy) -> Router<()>
where
  S: VisitorStore + Send + Sync + 'static,
{
  let state = ApiState { store, policy: Arc::new(policy) };

  Router::new()
    .route("/visitors", get(visitors::list::<S>))
    .route("/visitors/intake", post(visitors::intake::<S>))
    .route("/visitors/stats", get(visitors::stats::<S>))
    .route("/visitors/lookup", get(visitors::lookup::<S>))
    .route(
      "/visitors/{id}",
      get(visitors::get_one::<S>)
        .put(visitors::update::<S>)
        .delete(visitors::delete::<S>),
    )
    .route("/visitors/{id}/assign", post(visitors::assign::<S>))
    .route("/visitors/{id}/convert", post(visitors::convert::<S>))
    .route("/visitors/{id}/attendance", get(visitors::attendance::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
