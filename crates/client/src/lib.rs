//! Client SDK for bidding in sealed-bid batch auctions.
//!
//! This crate provides:
//! - Sealed bid construction: a blinded amount encrypted to the lot key
//! - Auction key generation for sellers
//! - Local opening of a prepared bid with the revealed key

pub mod bid;
pub mod keys;

pub use bid::{create_bid, BidBuilder, BidError, PreparedBid};
pub use keys::{generate_auction_keypair, open_bid};
