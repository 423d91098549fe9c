//! Passkey credential registration.
//!
//! The flow: a relying party mints an anti-replay challenge from the
//! [`challenge::ChallengeRegistry`], the client answers with a wire encoded
//! [`proto::Registration`], and [`registration::process_registration`]
//! decodes the record and consumes the matching challenge. The binary
//! authenticator data blob inside the record is parsed by
//! [`authenticator::parse_authenticator_data`]. Accepted credentials become
//! [`proto::Passkey`] records held by a [`store::PasskeyStore`] backend.
//!
//! [`local`] provides a software registrar for hosts without a platform
//! authenticator.

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]

pub mod authenticator;
pub mod challenge;
pub mod constants;
pub mod error;
pub mod local;
pub mod proto;
pub mod registration;
pub mod store;

pub use authenticator::parse_authenticator_data;
pub use challenge::ChallengeRegistry;
pub use error::{ChallengeError, ParseError, RegistrationError, StoreError};
pub use local::{create_registration, LocalRegistration};
pub use proto::{
    Authenticator, AuthenticatorFlags, AuthenticatorKind, Challenge, ChallengePurpose, ClientData,
    CoseAlgorithm, Credential, Passkey, Registration,
};
pub use registration::process_registration;
pub use store::{Keychain, MemoryStore, PasskeyStore};
