//! Domain model for Shepherd: visitors, attendance, the follow-up journal
//! and lifecycle, and the read-side projections used by listings.
//!
//! No HTTP or database code lives here. Storage backends implement
//! [`store::VisitorStore`]; the API layer is generic over it.

// Trait methods return `impl Future + Send`; implementors may use `async fn`.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod error;
pub mod intake;
pub mod journal;
pub mod lifecycle;
pub mod projection;
pub mod store;
pub mod visitor;

pub use error::{Error, Result};
