//! # rivet-sdk
//!
//! Client library for Ethereum-style JSON-RPC nodes.
//!
//! ## Features
//!
//! - **ABI**: Solidity ABI encoding, decoding and tightly packed hashing
//! - **ContractInstance**: JSON ABI binding with overload resolution,
//!   read calls and transaction submission
//! - **TransactionTracker**: receipt polling with backoff, timeouts and
//!   exactly-once lifecycle callbacks
//! - **RpcClient**: JSON-RPC calls over a pluggable [`Transport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rivet_sdk::contract::{ContractInstance, SendOptions};
//! use rivet_sdk::abi::Token;
//! use rivet_sdk::{RpcClient, TrackOptions, TrackerConfig, TransactionTracker, TxOutcome};
//! use rivet_primitives::{Address, U256};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::connect("http://localhost:8545").await?;
//!     let token = rivet_sdk::contract::erc20(
//!         Address::from_hex("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")?,
//!         client.clone(),
//!     )?;
//!
//!     let to = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//!     let from = Address::from_hex("0x1234567890123456789012345678901234567890")?;
//!     let pending = token
//!         .function("transfer")?
//!         .send(&[Token::Address(to), Token::Uint(U256::from(1000))], SendOptions::default().from(from))
//!         .await?;
//!
//!     let tracker = TransactionTracker::new(client, TrackerConfig::default());
//!     tracker.on_failed(pending.hash, |receipt| eprintln!("reverted in block {}", receipt.block_number));
//!     match pending.track(&tracker, TrackOptions::default()).wait().await {
//!         TxOutcome::MinedSuccess(receipt) => println!("mined in block {}", receipt.block_number),
//!         other => println!("not mined: {:?}", other),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
pub mod config;
pub mod contract;
mod error;
pub mod events;
mod signer;
pub mod tracker;
mod transport;
pub mod types;

// Re-export main types
pub use client::RpcClient;
pub use config::{ClientConfig, Config, TrackOptions, TrackerConfig};
pub use contract::{CallOptions, ContractInstance, SendOptions};
pub use error::SdkError;
pub use events::{EventBus, TxEvent};
pub use signer::Signer;
pub use tracker::{TransactionHandle, TransactionTracker, TxOutcome, TxState};
pub use transport::{MockReply, MockTransport};

/// Re-export Transport trait for custom implementations
pub use transport::Transport;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export primitives for convenience
pub use rivet_primitives::{Address, H256, U256};
pub use types::{Log, Receipt, TxStatus};
