//! Full registration round trip: challenge, local registration, server side
//! acceptance, key wrapping, and storage in both backends.

use std::time::Duration;

use passkey_core::{
    create_registration, process_registration, ChallengeError, ChallengePurpose,
    ChallengeRegistry, Keychain, MemoryStore, PasskeyStore, Registration, RegistrationError,
};
use passkey_crypto::provider;

const ORIGIN: &str = "https://example.test";

#[test]
fn register_wrap_store_and_recover() {
    let registry = ChallengeRegistry::default();
    let challenge = registry.initiate(ChallengePurpose::Register);

    // Client side: build the wire record and a storable passkey.
    let local = create_registration("ada", &challenge.id, ORIGIN).expect("local registration");
    let passkey = local
        .to_passkey("ada's passkey", "hunter2")
        .expect("wrap passkey");

    // Server side: accept the record, consuming the challenge.
    let accepted = process_registration(&local.registration, &registry).expect("acceptance");
    let Registration::Decoded { client_data, authenticator, .. } = &accepted else {
        panic!("acceptance must yield the decoded state");
    };
    assert_eq!(client_data.challenge, challenge.id);
    assert_eq!(
        authenticator.rp_id_hash.to_string(),
        provider::sha256_b64(ORIGIN.as_bytes())
    );

    // A replayed record finds its challenge consumed.
    assert!(matches!(
        process_registration(&local.registration, &registry),
        Err(RegistrationError::Challenge(ChallengeError::NotFound))
    ));

    // Persist and recover through both storage backends.
    let dir = tempfile::tempdir().expect("tempdir");
    let keychain = Keychain::new(dir.path().join("keychain.json"));
    let memory = MemoryStore::new();
    for store in [&keychain as &dyn PasskeyStore, &memory] {
        store.insert(passkey.clone()).expect("insert");
        let stored = store
            .get_by_name("ada's passkey")
            .expect("lookup")
            .expect("stored passkey");
        assert_eq!(stored.id, local.credential_id);

        // The recovered private key still signs for the stored public key.
        let signing = stored
            .unwrap_private_key("hunter2")
            .expect("unwrap with the right password");
        let verifying = stored.public_key().expect("public key import");
        let signature = provider::ecdsa_sign(
            signing.as_ecdsa_signing().expect("signing handle"),
            b"probe",
        );
        assert!(provider::ecdsa_verify(
            verifying.as_ecdsa_verifying().expect("verifying handle"),
            b"probe",
            &signature
        ));
        assert!(stored.unwrap_private_key("wrong password").is_none());
    }
}

#[test]
fn expired_challenge_rejects_registration() {
    let registry = ChallengeRegistry::default();
    let challenge =
        registry.initiate_with_ttl(ChallengePurpose::Register, Duration::from_millis(0));
    let local = create_registration("ada", &challenge.id, ORIGIN).expect("local registration");

    std::thread::sleep(Duration::from_millis(5));
    assert!(matches!(
        process_registration(&local.registration, &registry),
        Err(RegistrationError::Challenge(ChallengeError::Expired))
    ));
}
