use std::time::Duration;

/// Number of random characters in a challenge id.
pub const CHALLENGE_LENGTH: usize = 32;

/// How long a freshly minted challenge stays valid.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(60);

/// Minimum wall-clock gap between two sweeps of expired challenges.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest valid authenticator data blob: rp id hash, flags and counter.
pub const AUTHENTICATOR_DATA_MIN_LEN: usize = 37;

/// Authenticator data length once the 16 byte AAGUID is present.
pub const AUTHENTICATOR_DATA_AAGUID_LEN: usize = 53;

/// Authenticator name reported by the software registrar.
pub const LOCAL_AUTHENTICATOR_NAME: &str = "Web Cryptography API";
