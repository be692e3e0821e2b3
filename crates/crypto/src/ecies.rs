//! Elliptic-curve integrated encryption on BLS12-381 G1.
//!
//! # Encryption
//!
//! To encrypt a 32-byte message `m` to auction key `PK` with salt `s`:
//! 1. Sample random scalar r
//! 2. Compute R = r·G (ephemeral public key, published with the bid)
//! 3. Compute the shared point S = r·PK
//! 4. Derive k = HKDF-SHA256(salt = s, ikm = compress(S))
//! 5. Output c = m ⊕ k
//!
//! # Decryption
//!
//! Given the auction private key sk, S = sk·R and m = c ⊕ k.

use bls12_381::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::Curve;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use auction_types::{Ciphertext, G1Point, Scalar as TypesScalar, BID_MESSAGE_LEN};

use crate::error::CryptoError;

const BID_KEY_INFO: &[u8] = b"EMPA-BID-KEY-V1";

/// Check that a point decodes to a non-identity element of G1.
pub fn is_valid_point(point: &G1Point) -> bool {
    decompress_g1(point)
        .map(|p| !bool::from(p.is_identity()))
        .unwrap_or(false)
}

/// Validate an auction public key.
///
/// Rejects the identity and the generator: their private keys are trivially known.
pub fn validate_auction_public_key(point: &G1Point) -> Result<G1Affine, CryptoError> {
    let affine = decompress_g1(point)?;
    if bool::from(affine.is_identity()) {
        return Err(CryptoError::IdentityPoint);
    }
    if affine == G1Affine::generator() {
        return Err(CryptoError::GeneratorPoint);
    }
    Ok(affine)
}

/// Compute the public key `sk·G` for a private key.
pub fn public_key_from_private(private_key: &TypesScalar) -> Result<G1Point, CryptoError> {
    let sk = parse_scalar(private_key)?;
    Ok(compress_g1(&(G1Projective::generator() * sk).to_affine()))
}

/// Generate an auction key pair.
pub fn generate_keypair<R: RngCore + CryptoRng>(rng: &mut R) -> (TypesScalar, G1Point) {
    let sk = random_scalar(rng);
    let pk = (G1Projective::generator() * sk).to_affine();
    (TypesScalar(sk.to_bytes()), compress_g1(&pk))
}

/// Derive the shared point `scalar·point`, compressed.
pub fn derive_shared_secret(
    point: &G1Point,
    scalar: &TypesScalar,
) -> Result<[u8; 48], CryptoError> {
    let p = decompress_g1(point)?;
    if bool::from(p.is_identity()) {
        return Err(CryptoError::IdentityPoint);
    }
    let s = parse_scalar(scalar)?;
    Ok((G1Projective::from(p) * s).to_affine().to_compressed())
}

/// Encrypt a bid message to an auction public key with a fresh ephemeral key.
///
/// # Returns
/// The ciphertext and the ephemeral public key to publish alongside it.
pub fn encrypt<R: RngCore + CryptoRng>(
    message: &[u8; BID_MESSAGE_LEN],
    public_key: &G1Point,
    salt: &[u8; 32],
    rng: &mut R,
) -> Result<(Ciphertext, G1Point), CryptoError> {
    let r = random_scalar(rng);
    encrypt_with_ephemeral(message, public_key, &TypesScalar(r.to_bytes()), salt)
}

/// Encrypt a bid message using a caller-chosen ephemeral private key.
pub fn encrypt_with_ephemeral(
    message: &[u8; BID_MESSAGE_LEN],
    public_key: &G1Point,
    ephemeral_private_key: &TypesScalar,
    salt: &[u8; 32],
) -> Result<(Ciphertext, G1Point), CryptoError> {
    let ephemeral_public_key = public_key_from_private(ephemeral_private_key)?;
    let shared = derive_shared_secret(public_key, ephemeral_private_key)?;
    let key = derive_symmetric_key(&shared, salt)?;
    Ok((xor_with_key(message, &key), ephemeral_public_key))
}

/// Decrypt a bid ciphertext with the auction private key.
pub fn decrypt(
    ciphertext: &Ciphertext,
    ephemeral_public_key: &G1Point,
    private_key: &TypesScalar,
    salt: &[u8; 32],
) -> Result<[u8; BID_MESSAGE_LEN], CryptoError> {
    let shared = derive_shared_secret(ephemeral_public_key, private_key)?;
    let key = derive_symmetric_key(&shared, salt)?;
    Ok(xor_with_key(ciphertext, &key))
}

/// Derive the symmetric key from the shared point and the bid salt.
fn derive_symmetric_key(shared: &[u8; 48], salt: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), shared);
    let mut key = [0u8; 32];
    hk.expand(BID_KEY_INFO, &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(key)
}

fn xor_with_key(data: &[u8; BID_MESSAGE_LEN], key: &[u8; 32]) -> [u8; BID_MESSAGE_LEN] {
    let mut out = [0u8; BID_MESSAGE_LEN];
    for (i, byte) in data.iter().enumerate() {
        out[i] = byte ^ key[i % key.len()];
    }
    out
}

/// Parse a non-zero scalar.
fn parse_scalar(scalar: &TypesScalar) -> Result<Scalar, CryptoError> {
    let s: Option<Scalar> = Scalar::from_bytes(&scalar.0).into();
    match s {
        Some(s) if !bool::from(s.is_zero()) => Ok(s),
        _ => Err(CryptoError::InvalidScalar),
    }
}

/// Generate a random non-zero scalar.
fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        let s = Scalar::from_bytes_wide(&bytes);
        if !bool::from(s.is_zero()) {
            return s;
        }
    }
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(point: &G1Point) -> Result<G1Affine, CryptoError> {
    Option::from(G1Affine::from_compressed(&point.0)).ok_or(CryptoError::InvalidG1Point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{blind_amount, recover_amount};
    use rand::rngs::OsRng;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = OsRng;
        let (sk, pk) = generate_keypair(&mut rng);
        let salt = [9u8; 32];

        let message = blind_amount(1_000, 77);
        let (ciphertext, ephemeral) = encrypt(&message, &pk, &salt, &mut rng).unwrap();
        assert_ne!(ciphertext, message);

        let decrypted = decrypt(&ciphertext, &ephemeral, &sk, &salt).unwrap();
        assert_eq!(decrypted, message);
        assert_eq!(recover_amount(&decrypted), 1_000);
    }

    #[test]
    fn test_wrong_salt_garbles_message() {
        let mut rng = OsRng;
        let (sk, pk) = generate_keypair(&mut rng);

        let message = blind_amount(1_000, 77);
        let (ciphertext, ephemeral) = encrypt(&message, &pk, &[1u8; 32], &mut rng).unwrap();

        let decrypted = decrypt(&ciphertext, &ephemeral, &sk, &[2u8; 32]).unwrap();
        assert_ne!(decrypted, message);
    }

    #[test]
    fn test_wrong_private_key_garbles_message() {
        let mut rng = OsRng;
        let (_, pk) = generate_keypair(&mut rng);
        let (other_sk, _) = generate_keypair(&mut rng);
        let salt = [3u8; 32];

        let message = blind_amount(5, 5);
        let (ciphertext, ephemeral) = encrypt(&message, &pk, &salt, &mut rng).unwrap();

        let decrypted = decrypt(&ciphertext, &ephemeral, &other_sk, &salt).unwrap();
        assert_ne!(decrypted, message);
    }

    #[test]
    fn test_shared_secret_is_symmetric() {
        let mut rng = OsRng;
        let (a_sk, a_pk) = generate_keypair(&mut rng);
        let (b_sk, b_pk) = generate_keypair(&mut rng);

        assert_eq!(
            derive_shared_secret(&b_pk, &a_sk).unwrap(),
            derive_shared_secret(&a_pk, &b_sk).unwrap()
        );
    }

    #[test]
    fn test_public_key_from_private_matches_keypair() {
        let mut rng = OsRng;
        let (sk, pk) = generate_keypair(&mut rng);
        assert_eq!(public_key_from_private(&sk).unwrap(), pk);
    }

    #[test]
    fn test_validate_rejects_trivial_keys() {
        let identity = compress_g1(&G1Affine::identity());
        let generator = compress_g1(&G1Affine::generator());

        assert_eq!(
            validate_auction_public_key(&identity),
            Err(CryptoError::IdentityPoint)
        );
        assert_eq!(
            validate_auction_public_key(&generator),
            Err(CryptoError::GeneratorPoint)
        );
        assert!(!is_valid_point(&identity));
        assert!(is_valid_point(&generator));
    }

    #[test]
    fn test_invalid_encodings() {
        assert!(!is_valid_point(&G1Point([0xffu8; 48])));
        assert_eq!(
            public_key_from_private(&TypesScalar([0u8; 32])),
            Err(CryptoError::InvalidScalar)
        );
        assert_eq!(
            public_key_from_private(&TypesScalar([0xffu8; 32])),
            Err(CryptoError::InvalidScalar)
        );
    }
}
