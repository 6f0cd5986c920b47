//! Fund Pool Rust SDK
//!
//! Client library for the on-chain fund program: a weighted basket of tokens
//! whose shares are created by depositing every basket asset at once.
//! The SDK encodes the program's instructions, decodes its accounts and plans
//! an "invest" that turns a single base-asset amount into the whole basket
//! through constant-product swap pools.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fund_pool_sdk::{ClientConfig, FundClient, InvestParams, KeypairWallet};
//! use solana_client::nonblocking::rpc_client::RpcClient;
//! use solana_sdk::{pubkey::Pubkey, signature::Keypair};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rpc_url    = "https://api.devnet.solana.com";
//!     let program_id = Pubkey::new_unique(); // the deployed fund program
//!     let client = FundClient::new(RpcClient::new(rpc_url.to_string()), ClientConfig::new(program_id));
//!     let wallet = KeypairWallet::new(rpc_url, Keypair::new());
//!
//!     let fund = Pubkey::new_unique();
//!     let state = client.fetch_fund(&fund).await?;
//!     println!("{}: {} assets", state.pool.name, state.assets().len());
//!
//!     let result = client.invest(&wallet, InvestParams {
//!         fund,
//!         pools:              vec![Pubkey::new_unique(), Pubkey::new_unique()],
//!         base_token_account: Pubkey::new_unique(),
//!         base_amount:        1_000_000,
//!         slippage:           None,
//!     }).await?;
//!     println!("Invested! tx: {}", result.signature);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`codec`] | Borsh schema of requests and accounts, tag checks |
//! | [`instructions`] | Initialize, execute, admin and SPL instruction builders |
//! | [`state`] | Fund account decoder, SPL token-swap / token / mint parsers |
//! | [`math`] | Constant-product quotes, slippage, invest planning |
//! | [`client`] | [`FundClient`] over pluggable fetch / submit collaborators |

pub mod client;
pub mod codec;
pub mod error;
pub mod instructions;
pub mod math;
pub mod state;
pub mod types;

pub use client::{AccountFetcher, FundClient, KeypairWallet, TransactionSubmitter, WalletProvider};
pub use error::{Error, Result, SchemaError};
pub use math::{compute_investment_plan, InvestmentPlan, Slippage};
pub use state::{decode_fund_state, FundState};
pub use types::*;
