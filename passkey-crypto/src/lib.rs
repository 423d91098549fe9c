//! Cryptographic envelopes for passkey credentials.
//!
//! This crate provides the four independent, reusable envelope formats the
//! registration flow is layered on:
//!
//! * [`key`] - wraps a private key under a password, and exports/imports
//!   public keys, as self-describing tagged byte buffers.
//! * [`token`] - signs, verifies and inspects a three part ES256 bearer
//!   token.
//! * [`session`] - symmetrically encrypts a small expiring record.
//! * [`pass`] - salts, hashes and compares passwords.
//!
//! All primitive operations live in [`provider`], which exists to allow ease
//! of auditing, safe operation wrappers, and cryptographic provider
//! abstraction. No other module touches a primitive crate directly.
//!
//! Cryptographic failures (wrong password, bad signature, tampered
//! ciphertext) are recovered locally and reported as typed errors or `None`,
//! never as panics, so callers can branch without unwinding.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]

pub mod key;
pub mod pass;
pub mod provider;
pub mod session;
pub mod token;

pub use key::KeyPurpose;
pub use provider::{KeyMaterial, SymmetricKey};
pub use session::{Session, SessionError};
pub use token::{TokenError, TokenInspection};
