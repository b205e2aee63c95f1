//! # Trust Envelope
//!
//! The cryptographic boundary of the service: inbound requests carry
//! RS256 bearer tokens verified against a configured public key, and
//! outbound envelopes are optionally wrapped in a signed token. Keys are
//! provisioned externally as PEM files.

mod bearer;
pub mod errors;
mod signer;

pub use bearer::{token_from_header, BearerClaims, BearerVerifier};
pub use errors::{TrustError, TrustResult};
pub use signer::{ResponseSigner, SignedEnvelopeClaims};
