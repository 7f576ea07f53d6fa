//! # pulse-auth
//!
//! Identity verification for Pulsehub. The relay never stores or
//! validates credentials itself: an opaque credential is handed to an
//! external verification service which either returns a verified
//! identity or fails.

pub mod identity;
pub mod verifier;

pub use identity::Identity;
pub use verifier::{HttpVerifier, IdentityVerifier};
