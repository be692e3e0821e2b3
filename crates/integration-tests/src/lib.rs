//! End-to-end integration tests for the sealed-bid batch auction.
//!
//! These tests exercise the full lot lifecycle through the auction house:
//! 1. Lot creation with an auction key
//! 2. Sealed bid construction and submission
//! 3. Key reveal and batched decryption
//! 4. Settlement at the marginal price
//! 5. Claims, fees and asset conservation
