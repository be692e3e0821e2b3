//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Invalid G1 point encoding")]
    InvalidG1Point,

    #[error("Point is the identity element")]
    IdentityPoint,

    #[error("Point is the group generator")]
    GeneratorPoint,

    #[error("Invalid scalar encoding")]
    InvalidScalar,

    #[error("Key derivation failed")]
    KeyDerivationFailed,
}
