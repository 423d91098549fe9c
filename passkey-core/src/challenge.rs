//! Issues and validates one time, purpose scoped, expiring challenges.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use passkey_crypto::provider;

use crate::constants::{CHALLENGE_LENGTH, DEFAULT_CHALLENGE_TTL, DEFAULT_CLEANUP_INTERVAL};
use crate::error::ChallengeError;
use crate::proto::{Challenge, ChallengePurpose};

struct RegistryState {
    challenges: HashMap<String, Challenge>,
    last_cleanup: u64,
}

/// The live challenge map.
///
/// All access goes through one mutex, so concurrent `initiate`, `validate`
/// and cleanup calls observe a consistent map. A successfully validated
/// challenge is removed, so it cannot be replayed within its lifetime.
pub struct ChallengeRegistry {
    state: Mutex<RegistryState>,
    ttl: Duration,
    cleanup_interval: Duration,
}

impl Default for ChallengeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_TTL, DEFAULT_CLEANUP_INTERVAL)
    }
}

impl ChallengeRegistry {
    /// A registry issuing challenges valid for `ttl`, sweeping expired
    /// entries at most once per `cleanup_interval`.
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        ChallengeRegistry {
            state: Mutex::new(RegistryState {
                challenges: HashMap::new(),
                last_cleanup: 0,
            }),
            ttl,
            cleanup_interval,
        }
    }

    /// Mint and store a challenge with the registry's default ttl.
    pub fn initiate(&self, purpose: ChallengePurpose) -> Challenge {
        self.initiate_with_ttl(purpose, self.ttl)
    }

    /// Mint and store a challenge valid for `ttl`. Also triggers the
    /// throttled sweep of expired entries.
    pub fn initiate_with_ttl(&self, purpose: ChallengePurpose, ttl: Duration) -> Challenge {
        let now = provider::now_millis();
        let challenge = Challenge {
            id: provider::random_chars(CHALLENGE_LENGTH),
            purpose,
            expires: now + ttl.as_millis() as u64,
        };

        let mut state = self.lock();
        self.cleanup(&mut state, now);
        state
            .challenges
            .insert(challenge.id.clone(), challenge.clone());
        debug!(id = %challenge.id, ?purpose, "challenge issued");
        challenge
    }

    /// Validate and consume a challenge.
    ///
    /// An id is checked for liveness, then purpose, then expiry; the first
    /// failure wins. On success the challenge is removed from the map and
    /// returned.
    pub fn validate(
        &self,
        challenge_id: &str,
        expected_purpose: ChallengePurpose,
    ) -> Result<Challenge, ChallengeError> {
        let mut state = self.lock();

        let challenge = state
            .challenges
            .get(challenge_id)
            .ok_or(ChallengeError::NotFound)
            .map_err(|e| {
                warn!(id = challenge_id, "challenge not found");
                e
            })?;

        if challenge.purpose != expected_purpose {
            warn!(
                id = challenge_id,
                stored = ?challenge.purpose,
                expected = ?expected_purpose,
                "challenge purpose mismatch"
            );
            return Err(ChallengeError::WrongPurpose);
        }
        if challenge.expires < provider::now_millis() {
            warn!(id = challenge_id, "challenge expired");
            return Err(ChallengeError::Expired);
        }

        // Consume: a validated challenge must never validate again.
        state
            .challenges
            .remove(challenge_id)
            .ok_or(ChallengeError::NotFound)
    }

    /// Number of challenges currently stored, live or awaiting sweep.
    pub fn len(&self) -> usize {
        self.lock().challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup(&self, state: &mut RegistryState, now: u64) {
        if now.saturating_sub(state.last_cleanup) < self.cleanup_interval.as_millis() as u64 {
            return;
        }
        let before = state.challenges.len();
        state.challenges.retain(|_, c| c.expires >= now);
        state.last_cleanup = now;
        if before > state.challenges.len() {
            debug!(swept = before - state.challenges.len(), "expired challenges swept");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn initiate_then_validate_succeeds_once() {
        let registry = ChallengeRegistry::default();
        let challenge = registry.initiate(ChallengePurpose::Register);
        assert_eq!(challenge.id.len(), CHALLENGE_LENGTH);

        let validated = registry
            .validate(&challenge.id, ChallengePurpose::Register)
            .unwrap();
        assert_eq!(validated, challenge);

        // Consumed: the same id must not validate again.
        assert_eq!(
            registry.validate(&challenge.id, ChallengePurpose::Register),
            Err(ChallengeError::NotFound)
        );
    }

    #[test]
    fn validate_rejects_wrong_purpose_without_consuming() {
        let registry = ChallengeRegistry::default();
        let challenge = registry.initiate(ChallengePurpose::Register);

        assert_eq!(
            registry.validate(&challenge.id, ChallengePurpose::Login),
            Err(ChallengeError::WrongPurpose)
        );
        // Still live for the right purpose.
        assert!(registry
            .validate(&challenge.id, ChallengePurpose::Register)
            .is_ok());
    }

    #[test]
    fn validate_rejects_unknown_id() {
        let registry = ChallengeRegistry::default();
        assert_eq!(
            registry.validate("never-issued", ChallengePurpose::Register),
            Err(ChallengeError::NotFound)
        );
    }

    #[test]
    fn validate_rejects_expired_challenge() {
        let registry = ChallengeRegistry::default();
        let challenge =
            registry.initiate_with_ttl(ChallengePurpose::Register, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            registry.validate(&challenge.id, ChallengePurpose::Register),
            Err(ChallengeError::Expired)
        );
    }

    #[test]
    fn cleanup_sweeps_expired_entries_when_due() {
        // Zero interval: every initiate sweeps.
        let registry = ChallengeRegistry::new(DEFAULT_CHALLENGE_TTL, Duration::from_millis(0));
        registry.initiate_with_ttl(ChallengePurpose::Register, Duration::from_millis(0));
        registry.initiate_with_ttl(ChallengePurpose::Login, Duration::from_millis(0));
        assert_eq!(registry.len(), 2);

        std::thread::sleep(Duration::from_millis(5));
        let live = registry.initiate(ChallengePurpose::Register);
        assert_eq!(registry.len(), 1);
        assert!(registry
            .validate(&live.id, ChallengePurpose::Register)
            .is_ok());
    }

    #[test]
    fn cleanup_is_throttled_by_interval() {
        let registry = ChallengeRegistry::new(DEFAULT_CHALLENGE_TTL, Duration::from_secs(3600));
        // First initiate runs the sweep and stamps last_cleanup.
        registry.initiate(ChallengePurpose::Register);
        registry.initiate_with_ttl(ChallengePurpose::Register, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));

        // Within the interval the expired entry is not swept.
        registry.initiate(ChallengePurpose::Register);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn challenge_ids_are_unique() {
        let registry = ChallengeRegistry::default();
        let a = registry.initiate(ChallengePurpose::Register);
        let b = registry.initiate(ChallengePurpose::Register);
        assert_ne!(a.id, b.id);
    }
}
