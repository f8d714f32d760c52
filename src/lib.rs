//! Client-side license validation, machine activation and offline checkout.
//!
//! [`LicenseClient`] drives a license [`Backend`](backend::Backend): it
//! validates keys, activates the machine when the key isn't bound to it yet,
//! acquires time-bounded checkout leases and exposes the current session.
//! All failures surface as a [`LicenseError`] with a switchable `code`.

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod util;

pub use backend::{Backend, Fixture, MemoryBackend};
pub use config::{CheckoutTtlPolicy, Config};
pub use engine::LicenseClient;
pub use error::{Failure, LicenseError, Result};
pub use models::{CheckoutOptions, Command, License, LicenseCode, ValidateOptions};
