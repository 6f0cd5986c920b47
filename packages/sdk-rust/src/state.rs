//! On-chain account deserialization.
//!
//! Fund accounts are borsh-encoded (see [`crate::codec`]) and decoded in two
//! passes: the outer [`PoolState`], then its `custom_state` blob as a
//! [`FundSubState`]. SPL token-swap, token and mint accounts have packed
//! fixed layouts and are read at known byte offsets.

use solana_sdk::pubkey::Pubkey;

use crate::codec::{
    self, AssetInfo, FundSubState, OptionalPubkey, PoolState, PoolStateTag,
};
use crate::error::{Error, Result};

// ─── Fund ─────────────────────────────────────────────────────────────────────

/// A decoded fund account: the pool-framework record plus the fund sub-state
/// nested in its `custom_state` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundState {
    pub pool:      PoolState,
    pub sub_state: FundSubState,
}

impl FundState {
    pub fn assets(&self) -> &[AssetInfo] {
        &self.pool.assets
    }

    pub fn asset_weights(&self) -> &[u32] {
        &self.sub_state.asset_weights
    }

    /// Fund vault of every asset, in asset order.
    pub fn vault_accounts(&self) -> Vec<Pubkey> {
        self.pool.assets.iter().map(|a| a.vault_address).collect()
    }

    /// `(asset, weight)` pairs, failing when the two sequences disagree in length.
    pub fn basket(&self) -> Result<Vec<(AssetInfo, u32)>> {
        let assets = self.assets();
        let weights = self.asset_weights();
        if assets.len() != weights.len() {
            return Err(Error::CallerContractViolation(format!(
                "fund has {} assets but {} weights",
                assets.len(),
                weights.len()
            )));
        }
        Ok(assets.iter().copied().zip(weights.iter().copied()).collect())
    }
}

/// Decode a fund account.
///
/// The outer record may be followed by unused account space; the nested
/// sub-state blob must be consumed exactly.
pub fn decode_fund_state(data: &[u8]) -> Result<FundState> {
    let mut rest = data;
    let pool: PoolState = codec::decode_prefix(&mut rest)?;
    let sub_state: FundSubState = codec::decode(&pool.custom_state)?;
    Ok(FundState { pool, sub_state })
}

/// Encode a fund account, re-serializing the sub-state into `custom_state`.
pub fn encode_fund_state(state: &FundState) -> Result<Vec<u8>> {
    let mut pool = state.pool.clone();
    pool.custom_state = codec::encode(&state.sub_state)?;
    Ok(codec::encode(&pool)?)
}

/// Account size, in bytes, of a fund with this name and asset count.
pub fn fund_account_len(name: &str, assets_count: usize) -> Result<usize> {
    let sub_state = FundSubState {
        paused:           false,
        slippage_divider: 0,
        asset_weights:    vec![0; assets_count],
        basic_asset:      AssetInfo::default(),
    };
    let pool = PoolState {
        tag:                   PoolStateTag,
        pool_token_mint:       Pubkey::default(),
        assets:                vec![AssetInfo::default(); assets_count],
        vault_signer:          Pubkey::default(),
        vault_signer_nonce:    0,
        account_params:        vec![],
        name:                  name.to_string(),
        lqd_fee_vault:         Pubkey::default(),
        initializer_fee_vault: Pubkey::default(),
        fee_rate:              0,
        admin_key:             OptionalPubkey(Some(Pubkey::default())),
        custom_state:          vec![],
    };
    Ok(encode_fund_state(&FundState { pool, sub_state })?.len())
}

// ─── SPL token-swap ───────────────────────────────────────────────────────────

/// Deserialized SPL token-swap (v1) pool.
///
/// Layout:
/// ```text
/// version(1)  is_initialized(1)  bump_seed(1)  token_program_id(32)
/// token_a(32)  token_b(32)  pool_mint(32)  token_a_mint(32)  token_b_mint(32)
/// pool_fee_account(32)  trade_fee_num(8)  trade_fee_den(8)
/// owner_trade_fee_num(8)  owner_trade_fee_den(8)  owner_withdraw_fee_num(8)
/// owner_withdraw_fee_den(8)  host_fee_num(8)  host_fee_den(8)
/// curve_type(1)  curve_parameters(32)  = 324 bytes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSwapState {
    pub bump_seed:                      u8,
    pub token_program_id:               Pubkey,
    pub token_account_a:                Pubkey,
    pub token_account_b:                Pubkey,
    pub pool_mint:                      Pubkey,
    pub mint_a:                         Pubkey,
    pub mint_b:                         Pubkey,
    pub fee_account:                    Pubkey,
    pub trade_fee_numerator:            u64,
    pub trade_fee_denominator:          u64,
    pub owner_trade_fee_numerator:      u64,
    pub owner_trade_fee_denominator:    u64,
    pub owner_withdraw_fee_numerator:   u64,
    pub owner_withdraw_fee_denominator: u64,
    pub host_fee_numerator:             u64,
    pub host_fee_denominator:           u64,
    pub curve_type:                     u8,
}

pub const TOKEN_SWAP_LEN: usize = 324;

/// Deserialize an SPL token-swap account from raw bytes.
pub fn parse_token_swap(data: &[u8]) -> Result<TokenSwapState> {
    if data.len() < TOKEN_SWAP_LEN {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("Token-swap account is {} bytes; expected {}", data.len(), TOKEN_SWAP_LEN),
        });
    }
    if data[1] != 1 {
        return Err(Error::ParseError {
            offset: 1,
            reason: "token-swap account is not initialized".into(),
        });
    }
    Ok(TokenSwapState {
        bump_seed:                      data[2],
        token_program_id:               read_pubkey(data, 3)?,
        token_account_a:                read_pubkey(data, 35)?,
        token_account_b:                read_pubkey(data, 67)?,
        pool_mint:                      read_pubkey(data, 99)?,
        mint_a:                         read_pubkey(data, 131)?,
        mint_b:                         read_pubkey(data, 163)?,
        fee_account:                    read_pubkey(data, 195)?,
        trade_fee_numerator:            read_u64(data, 227)?,
        trade_fee_denominator:          read_u64(data, 235)?,
        owner_trade_fee_numerator:      read_u64(data, 243)?,
        owner_trade_fee_denominator:    read_u64(data, 251)?,
        owner_withdraw_fee_numerator:   read_u64(data, 259)?,
        owner_withdraw_fee_denominator: read_u64(data, 267)?,
        host_fee_numerator:             read_u64(data, 275)?,
        host_fee_denominator:           read_u64(data, 283)?,
        curve_type:                     data[291],
    })
}

// ─── SPL token account / mint ─────────────────────────────────────────────────

/// Read the `amount` field from a packed SPL token account.
///
/// Token account layout: `mint(32) owner(32) amount(8) …`
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    if data.len() < 72 {
        return Err(Error::ParseError {
            offset: 64,
            reason: format!("Token account is {} bytes; need at least 72", data.len()),
        });
    }
    read_u64(data, 64)
}

/// Supply and decimals of an SPL mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub supply:   u64,
    pub decimals: u8,
}

/// Read supply and decimals from a packed SPL mint.
///
/// Mint layout: `mint_authority(4+32) supply(8) decimals(1) …`
pub fn parse_mint(data: &[u8]) -> Result<MintInfo> {
    if data.len() < 45 {
        return Err(Error::ParseError {
            offset: 36,
            reason: format!("Mint account is {} bytes; need at least 45", data.len()),
        });
    }
    Ok(MintInfo {
        supply:   read_u64(data, 36)?,
        decimals: data[44],
    })
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    let b: [u8; 32] = data
        .get(offset..offset + 32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError {
            offset,
            reason: "slice too short for Pubkey (32 bytes)".into(),
        })?;
    Ok(Pubkey::from(b))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let b: [u8; 8] = data
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError { offset, reason: "slice too short for u64".into() })?;
    Ok(u64::from_le_bytes(b))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
