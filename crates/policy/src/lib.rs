//! Capability-based policy for host operations.
//!
//! Core principle: **every side effect a model requests needs an explicit
//! capability.** The host consults a [`Policy`] before reading or writing
//! files and before spawning processes.

mod capability;
mod error;
mod policy;

pub use capability::{CapabilityKind, CapabilityRequest};
pub use error::{Error, Result};
pub use policy::{AllowRules, Decision, DenyRules, Policy};
