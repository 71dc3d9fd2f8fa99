//! Escrow properties of the vault: round trips, tamper detection, versioning.

use stakemate_vault::{
    FORMAT_VERSION, MasterKey, SecretEnvelope, SecretVault, VaultError,
};

fn vault_with(byte: u8) -> SecretVault {
    SecretVault::new(MasterKey::from_bytes([byte; 32]))
}

/// Rebuilds `envelope` with one of its parts replaced.
fn rebuild(
    envelope: &SecretEnvelope,
    edit: impl FnOnce(&mut Vec<u8>, &mut [u8; 12], &mut [u8; 16], &mut u8),
) -> SecretEnvelope {
    let mut ciphertext = envelope.ciphertext().to_vec();
    let mut nonce = *envelope.nonce();
    let mut tag = *envelope.tag();
    let mut version = envelope.format_version();
    edit(&mut ciphertext, &mut nonce, &mut tag, &mut version);
    SecretEnvelope::from_parts(ciphertext, nonce, tag, version)
}

#[test]
fn test_round_trip_for_varied_secrets() {
    let vault = vault_with(1);
    for secret in [
        "alpha",
        "beta",
        "x",
        "a secret with spaces and punctuation!?",
        "ünïcødé ♞ secrets",
        &"long".repeat(256),
    ] {
        let envelope = vault.encrypt(secret).unwrap();
        assert_eq!(vault.decrypt(&envelope).unwrap().as_str(), secret);
    }
}

#[test]
fn test_flipped_ciphertext_bit_is_detected() {
    let vault = vault_with(1);
    let envelope = vault.encrypt("beta").unwrap();
    let tampered = rebuild(&envelope, |c, _, _, _| c[0] ^= 0x01);
    assert!(matches!(
        vault.decrypt(&tampered),
        Err(VaultError::TamperedOrWrongKey)
    ));
}

#[test]
fn test_flipped_tag_bit_is_detected() {
    let vault = vault_with(1);
    let envelope = vault.encrypt("beta").unwrap();
    let tampered = rebuild(&envelope, |_, _, t, _| t[15] ^= 0x80);
    assert!(matches!(
        vault.decrypt(&tampered),
        Err(VaultError::TamperedOrWrongKey)
    ));
}

#[test]
fn test_altered_nonce_is_detected() {
    let vault = vault_with(1);
    let envelope = vault.encrypt("beta").unwrap();
    let tampered = rebuild(&envelope, |_, n, _, _| n[0] ^= 0xff);
    assert!(matches!(
        vault.decrypt(&tampered),
        Err(VaultError::TamperedOrWrongKey)
    ));
}

#[test]
fn test_truncated_ciphertext_is_detected() {
    let vault = vault_with(1);
    let envelope = vault.encrypt("beta").unwrap();
    let tampered = rebuild(&envelope, |c, _, _, _| {
        c.pop();
    });
    assert!(matches!(
        vault.decrypt(&tampered),
        Err(VaultError::TamperedOrWrongKey)
    ));
}

#[test]
fn test_wrong_key_is_indistinguishable_from_tampering() {
    let envelope = vault_with(1).encrypt("beta").unwrap();
    assert!(matches!(
        vault_with(2).decrypt(&envelope),
        Err(VaultError::TamperedOrWrongKey)
    ));
}

#[test]
fn test_unknown_format_version_is_rejected_before_decryption() {
    let vault = vault_with(1);
    let envelope = vault.encrypt("beta").unwrap();
    let future = rebuild(&envelope, |_, _, _, v| *v = FORMAT_VERSION + 1);
    assert!(matches!(
        vault.decrypt(&future),
        Err(VaultError::UnsupportedFormatVersion(v)) if v == FORMAT_VERSION + 1
    ));
}

#[test]
fn test_ephemeral_vaults_cannot_open_each_others_envelopes() {
    let first = SecretVault::ephemeral();
    let second = SecretVault::ephemeral();
    let envelope = first.encrypt("alpha").unwrap();
    assert_eq!(first.decrypt(&envelope).unwrap().as_str(), "alpha");
    assert!(second.decrypt(&envelope).is_err());
}
