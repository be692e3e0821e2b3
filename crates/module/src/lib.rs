//! Sealed-bid batch auction engine.
//!
//! This module implements the lifecycle of encrypted marginal price auctions:
//!
//! - Lot creation with capacity, floor price, fill and bid-size thresholds
//! - Sealed bid submission and pre-conclusion refunds
//! - Private key reveal and batched decryption into a price-ranked queue
//! - Uniform-price settlement with a single partial fill
//! - Per-bid claims with fee allocation, curation, cancellation and abort
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls on one lot
//! - `house`: Lot registry with per-lot locking and call dispatch
//! - `queries`: Read-only state access
//! - `state`: Per-lot state
//! - `clearing`: Marginal price computation
//! - `queue`: Ranked queue of decrypted bids
//! - `fees`, `math`: Fee and fixed-point arithmetic
//! - `custody`: Asset custody seam and an in-memory ledger
//! - `config`: House configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{AuctionHouse, AuctionHouseConfig, CallContext, EscrowLedger};
//!
//! let house = AuctionHouse::new(AuctionHouseConfig::default(), Arc::new(EscrowLedger::new()))?;
//! let ctx = CallContext { sender: seller, timestamp: now };
//!
//! // Create a lot
//! let lot_id = house.create_lot(&ctx, &params)?;
//!
//! // Submit a sealed bid
//! let bid_id = house.submit_bid(&bidder_ctx, lot_id, None, amount, ciphertext, ephemeral)?;
//! ```

pub mod call;
pub mod clearing;
pub mod config;
pub mod custody;
pub mod error;
pub mod fees;
pub mod handlers;
pub mod house;
pub mod math;
pub mod queries;
pub mod queue;
pub mod state;

pub use call::{AuctionCall, CallOutcome};
pub use config::{AuctionHouseConfig, ConfigError, FeeConfig};
pub use custody::{Custody, CustodyError, EscrowLedger};
pub use error::AuctionError;
pub use handlers::{CallContext, DecryptReport, HandlerResult};
pub use house::AuctionHouse;
pub use queries::{AuctionQuery, AuctionQueryResponse, KeySummary};
pub use state::LotBook;
