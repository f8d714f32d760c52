//! The license backend call interface.
//!
//! Everything the engine knows about license servers, persisted license
//! state and certificate verification sits behind [`Backend::invoke`].

mod memory;

pub use memory::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Failure;
use crate::models::Command;

/// A single request/response call into the license backend.
///
/// Implementations forward a [`Command`] over whatever boundary the host
/// provides and hand back the raw JSON reply. Replies are decoded by the
/// engine, never trusted for shape here.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, command: Command) -> Result<Value, Failure>;
}
