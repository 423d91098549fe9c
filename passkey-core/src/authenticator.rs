//! Parser for the binary authenticator data blob.
//!
//! The layout is fixed by the WebAuthn authenticator data format:
//!
//!    +--------+--------+-----------------------------------+
//!    | offset | length | field                             |
//!    +--------+--------+-----------------------------------+
//!    | 0      | 32     | rp id hash (SHA-256)              |
//!    | 32     | 1      | flags                             |
//!    | 33     | 4      | counter, big-endian u32           |
//!    | 37     | 16     | aaguid (only if attested)         |
//!    +--------+--------+-----------------------------------+

use tracing::debug;
use uuid::Uuid;

use crate::constants::{AUTHENTICATOR_DATA_AAGUID_LEN, AUTHENTICATOR_DATA_MIN_LEN};
use crate::error::ParseError;
use crate::proto::{Authenticator, AuthenticatorFlags};

/// Well known AAGUID to model name assignments, hyphenated lowercase.
static AAGUID_NAMES: &[(&str, &str)] = &[
    ("adce0002-35bc-c60a-648b-0b25f1f05503", "Chrome on Mac"),
    ("08987058-cadc-4b81-b6e1-30de50dcbe96", "Windows Hello"),
    ("9ddd1817-af5a-4672-a2b9-3e3dd95000a9", "Windows Hello"),
    ("6028b017-b1d4-4c02-b4b3-afcdafc96bb2", "Windows Hello"),
    ("fbfc3007-154e-4ecc-8c0b-6e020557d7bd", "iCloud Keychain"),
    ("dd4ec289-e01d-41c9-bb89-70fa845d4bf2", "iCloud Keychain (Managed)"),
    ("ea9b8d66-4d01-1d21-3ce4-b6b48cb575d4", "Google Password Manager"),
    ("b84e4048-15dc-4dd0-8640-f4f60813c8af", "NordPass"),
    ("bada5566-a7aa-401f-bd96-45619a55120d", "1Password"),
    ("d548826e-79b4-db40-a3d8-11116f7e8349", "Bitwarden"),
    ("531126d6-e717-415c-9320-3d9aa6981239", "Dashlane"),
    ("53414d53-554e-4700-0000-000000000000", "Samsung Pass"),
    ("ee882879-721c-4913-9775-3dfcce97072a", "YubiKey 5 Series"),
    ("fa2b99dc-9e39-4257-8f92-4a30d23c4118", "YubiKey 5 Series with NFC"),
    ("cb69481e-8ff7-4039-93ec-0a2729a154a8", "YubiKey 5 Series (FW 5.1)"),
    ("2fc0579f-8113-47ea-b116-bb5a8db9202a", "YubiKey 5 Series with NFC (FW 5.2)"),
    ("8876631b-d4a0-427f-5773-0ec71c9e0279", "SoloKeys Solo 2"),
];

/// Resolve an AAGUID to a human readable authenticator model name.
pub fn aaguid_name(aaguid: &Uuid) -> &'static str {
    let hyphenated = aaguid.to_string();
    AAGUID_NAMES
        .iter()
        .find(|(id, _)| *id == hyphenated)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Decode a binary authenticator data blob into its structured fields.
///
/// A 37 byte blob carries no attested credential data; its aaguid comes
/// back as the all-zero UUID.
pub fn parse_authenticator_data(data: &[u8]) -> Result<Authenticator, ParseError> {
    if data.len() < AUTHENTICATOR_DATA_MIN_LEN {
        debug!(len = data.len(), "authenticator data below minimum length");
        return Err(ParseError::TruncatedData(data.len()));
    }

    let rp_id_hash = &data[0..32];
    let flags = AuthenticatorFlags(data[32]);
    // Infallible: the length check above guarantees 4 bytes.
    let counter = u32::from_be_bytes(
        data[33..37]
            .try_into()
            .map_err(|_| ParseError::TruncatedData(data.len()))?,
    );

    let aaguid = if data.len() > AUTHENTICATOR_DATA_MIN_LEN {
        if data.len() < AUTHENTICATOR_DATA_AAGUID_LEN {
            debug!(len = data.len(), "authenticator data truncates its aaguid");
            return Err(ParseError::TruncatedData(data.len()));
        }
        Uuid::from_slice(&data[37..53]).map_err(|_| ParseError::TruncatedData(data.len()))?
    } else {
        Uuid::nil()
    };

    Ok(Authenticator {
        rp_id_hash: rp_id_hash.into(),
        flags,
        counter,
        aaguid,
        name: aaguid_name(&aaguid).to_string(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn blob(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        for (i, byte) in data.iter_mut().enumerate().take(32) {
            *byte = i as u8;
        }
        if len >= 37 {
            data[32] = 0b0000_0101;
            data[33..37].copy_from_slice(&0x0000_012cu32.to_be_bytes());
        }
        data
    }

    #[test]
    fn parses_minimal_blob_with_nil_aaguid() {
        let parsed = parse_authenticator_data(&blob(37)).unwrap();
        assert_eq!(parsed.rp_id_hash.as_ref(), &blob(37)[..32]);
        assert!(parsed.flags.user_present());
        assert!(parsed.flags.user_verified());
        assert_eq!(parsed.counter, 300);
        assert_eq!(parsed.aaguid, Uuid::nil());
        assert_eq!(parsed.name, "Unknown");
    }

    #[test]
    fn parses_attested_blob_with_aaguid() {
        let mut data = blob(53);
        data[37..53].copy_from_slice(&[
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ]);
        let parsed = parse_authenticator_data(&data).unwrap();
        assert_eq!(
            parsed.aaguid.to_string(),
            "01020304-0506-0708-090a-0b0c0d0e0f10"
        );
        assert_eq!(parsed.name, "Unknown");
    }

    #[test]
    fn resolves_known_aaguid_names() {
        let mut data = blob(53);
        let yubikey = Uuid::parse_str("ee882879-721c-4913-9775-3dfcce97072a").unwrap();
        data[37..53].copy_from_slice(yubikey.as_bytes());
        let parsed = parse_authenticator_data(&data).unwrap();
        assert_eq!(parsed.name, "YubiKey 5 Series");
    }

    #[test]
    fn rejects_short_blobs() {
        assert_eq!(
            parse_authenticator_data(&blob(36)),
            Err(ParseError::TruncatedData(36))
        );
        assert_eq!(parse_authenticator_data(&[]), Err(ParseError::TruncatedData(0)));
        // Long enough to claim an aaguid, too short to carry one.
        assert_eq!(
            parse_authenticator_data(&blob(45)),
            Err(ParseError::TruncatedData(45))
        );
    }

    #[test]
    fn counter_is_big_endian() {
        let mut data = blob(37);
        data[33..37].copy_from_slice(&[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(parse_authenticator_data(&data).unwrap().counter, 65536);
    }
}
