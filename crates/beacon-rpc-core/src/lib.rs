//! Core contracts for beacon-rpc.
//!
//! This crate holds what every other beacon-rpc crate agrees on:
//! - Event system for observability
//! - Error taxonomy (transport failures vs. remote rejections)
//! - The [`StubProvider`] seam between the retry loop and the connection owner

pub mod checkout;
pub mod error;
pub mod events;

pub use checkout::{Checkout, ConnectionHealth, StubProvider};
pub use error::{BoxError, ClientError, TransportError};
pub use events::{ClientEvent, EventListener, EventListeners, FnListener};
