//! Blinded bid messages.
//!
//! A bid message is `seed || seed - amount` with both halves as big-endian `u128`
//! and the subtraction wrapping. Without the seed the low half reveals nothing
//! about the amount. Recovery never fails: a message that was not built this way
//! simply yields an arbitrary `u128`, which the engine range-checks.

use auction_types::BID_MESSAGE_LEN;

/// Build the plaintext message for `amount` blinded by `seed`.
pub fn blind_amount(amount: u128, seed: u128) -> [u8; BID_MESSAGE_LEN] {
    let blinded = seed.wrapping_sub(amount);
    let mut message = [0u8; BID_MESSAGE_LEN];
    message[..16].copy_from_slice(&seed.to_be_bytes());
    message[16..].copy_from_slice(&blinded.to_be_bytes());
    message
}

/// Recover the amount from a decrypted message.
pub fn recover_amount(message: &[u8; BID_MESSAGE_LEN]) -> u128 {
    let mut seed = [0u8; 16];
    let mut blinded = [0u8; 16];
    seed.copy_from_slice(&message[..16]);
    blinded.copy_from_slice(&message[16..]);
    u128::from_be_bytes(seed).wrapping_sub(u128::from_be_bytes(blinded))
}
