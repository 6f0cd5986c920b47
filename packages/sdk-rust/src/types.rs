//! Configuration plus the parameter and result types of the high-level client.

use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::Instruction,
    pubkey,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};

use crate::error::{Error, Result};
use crate::math::{FundSnapshot, InvestmentPlan, LiquidityPool, Slippage};

/// SPL token-swap program on mainnet-beta and devnet.
pub const SPL_TOKEN_SWAP_PROGRAM_ID: Pubkey = pubkey!("SwapsVeCiPHMUAtzQWZw7RjsKjgCjhwU55QGu4U1Szw");

// ─── Config ───────────────────────────────────────────────────────────────────

/// Program ids and defaults used by [`crate::FundClient`].
///
/// Loadable from JSON; keys are base-58 strings:
///
/// ```json
/// { "program_id": "…", "swap_program_id": "…", "referrer_fee_vault": null, "slippage_bps": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The fund program.
    #[serde(with = "pubkey_str")]
    pub program_id: Pubkey,

    #[serde(with = "pubkey_str", default = "default_swap_program")]
    pub swap_program_id: Pubkey,

    /// Referrer fee vault passed to execute. `None` routes the referrer share
    /// to the fund's own `lqd_fee_vault`.
    #[serde(with = "opt_pubkey_str", default)]
    pub referrer_fee_vault: Option<Pubkey>,

    #[serde(rename = "slippage_bps", default)]
    pub slippage: Slippage,
}

fn default_swap_program() -> Pubkey {
    SPL_TOKEN_SWAP_PROGRAM_ID
}

impl ClientConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            swap_program_id:    SPL_TOKEN_SWAP_PROGRAM_ID,
            referrer_fee_vault: None,
            slippage:           Slippage::DEFAULT,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidArgument(format!("client config: {e}")))
    }

    pub fn with_swap_program_id(mut self, swap_program_id: Pubkey) -> Self {
        self.swap_program_id = swap_program_id;
        self
    }

    pub fn with_referrer_fee_vault(mut self, vault: Pubkey) -> Self {
        self.referrer_fee_vault = Some(vault);
        self
    }

    pub fn with_slippage(mut self, slippage: Slippage) -> Self {
        self.slippage = slippage;
        self
    }
}

mod pubkey_str {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(d)?;
        Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {s:?}: {e}")))
    }
}

mod opt_pubkey_str {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Option<Pubkey>, s: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(k) => s.serialize_some(&k.to_string()),
            None    => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Pubkey>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| {
                Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {s:?}: {e}")))
            })
            .transpose()
    }
}

// ─── invest ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::FundClient::invest`].
#[derive(Debug, Clone)]
pub struct InvestParams {
    pub fund:               Pubkey,
    /// Candidate swap pools; the first one trading each asset is used.
    pub pools:              Vec<Pubkey>,
    /// The user's token account holding the fund's basic asset.
    pub base_token_account: Pubkey,
    /// Contribution in the basic asset's smallest unit.
    pub base_amount:        u64,
    /// Overrides the configured slippage.
    pub slippage:           Option<Slippage>,
}

/// Fetched inputs and the plan computed from them.
#[derive(Debug, Clone)]
pub struct PreparedInvestment {
    pub fund:               FundSnapshot,
    pub pools:              Vec<LiquidityPool>,
    pub plan:               InvestmentPlan,
    /// Lamports funding each new token account.
    pub token_account_rent: u64,
}

/// Instructions of one invest transaction plus the fresh keypairs that sign it.
#[derive(Debug)]
pub struct InvestTransaction {
    /// Account creation, approvals, swaps, then execute.
    pub instructions:            Vec<Instruction>,
    /// New token accounts and the transfer authority; all must sign.
    pub signers:                 Vec<Keypair>,
    pub user_pool_token:         Pubkey,
    pub user_asset_accounts:     Vec<Pubkey>,
    pub user_transfer_authority: Pubkey,
}

/// Result of [`crate::FundClient::invest`].
#[derive(Debug, Clone)]
pub struct InvestResult {
    pub signature:           Signature,
    pub plan:                InvestmentPlan,
    pub user_pool_token:     Pubkey,
    pub user_asset_accounts: Vec<Pubkey>,
}
