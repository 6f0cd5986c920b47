//! Low-level instruction builders.
//!
//! Each function constructs a [`solana_sdk::instruction::Instruction`] ready
//! for signing and submission. Account order is what the fund program reads
//! positionally; it is never reordered or deduplicated here.
//!
//! Pool-framework requests are wrapped in a [`PoolRequest`] envelope
//! (`PoolRequestTag`, index, payload). Fund admin requests use the separate
//! [`FundRequest`] envelope.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    sysvar,
};

use crate::codec::{
    self, FundInstruction, FundRequest, InitializeFundData, InitializePoolRequest, PoolAction,
    PoolRequest, PoolRequestInner,
};
use crate::error::{Error, Result};

// ─── Well-known program IDs ───────────────────────────────────────────────────

pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// Size of a packed SPL token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

// ─── PDA derivation helpers ───────────────────────────────────────────────────

/// Derive the vault signer that owns a fund's vaults.
pub fn derive_vault_signer(fund: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[fund.as_ref()], program_id)
}

/// Derive the authority of an SPL token-swap pool.
pub fn derive_swap_authority(swap: &Pubkey, swap_program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[swap.as_ref()], swap_program_id)
}

fn check_vault_count(vaults: &[Pubkey]) -> Result<u8> {
    u8::try_from(vaults.len()).map_err(|_| {
        Error::CallerContractViolation(format!("{} vaults; at most 255 are supported", vaults.len()))
    })
}

fn pool_request(inner: PoolRequestInner) -> Result<Vec<u8>> {
    Ok(codec::encode(&PoolRequest::new(inner))?)
}

fn fund_request(inner: FundInstruction) -> Result<Vec<u8>> {
    Ok(codec::encode(&FundRequest::new(inner))?)
}

// ─── initialize ───────────────────────────────────────────────────────────────

/// Accounts read by the initialize instruction, in wire order.
#[derive(Debug, Clone)]
pub struct InitializeFundAccounts {
    pub fund:                     Pubkey,
    pub fund_token_mint:          Pubkey,
    /// One vault per asset, in asset order.
    pub vaults:                   Vec<Pubkey>,
    pub vault_authority:          Pubkey,
    pub lqd_fee_vault:            Pubkey,
    pub initializer_fee_vault:    Pubkey,
    pub rent_sysvar:              Pubkey,
    pub admin:                    Pubkey,
    /// Receives the initial fund-token supply.
    pub initial_supply_account:   Pubkey,
    pub basic_asset_vault:        Pubkey,
    pub token_program:            Pubkey,
}

/// Fund parameters of the initialize instruction.
#[derive(Debug, Clone)]
pub struct InitializeFundArgs {
    pub vault_signer_nonce: u8,
    pub pool_name:          String,
    pub fee_rate:           u32,
    /// Target weights in tenths of a percent, aligned with `vaults`.
    pub asset_weights:      Vec<u32>,
    pub initial_supply:     u64,
    pub slippage_divider:   u64,
}

/// Build the initialize instruction.
///
/// The fund parameters are encoded first and embedded as the opaque
/// `custom_data` of an [`InitializePoolRequest`], which is then wrapped in the
/// envelope at index 0.
pub fn initialize_fund_ix(
    program_id: &Pubkey,
    accounts:   &InitializeFundAccounts,
    args:       &InitializeFundArgs,
) -> Result<Instruction> {
    let assets_length = check_vault_count(&accounts.vaults)?;
    if args.asset_weights.len() != accounts.vaults.len() {
        return Err(Error::CallerContractViolation(format!(
            "{} asset weights for {} vaults",
            args.asset_weights.len(),
            accounts.vaults.len()
        )));
    }

    let custom_data = codec::encode(&InitializeFundData {
        slippage_divider:          args.slippage_divider,
        asset_weights:             args.asset_weights.clone(),
        fund_token_initial_supply: args.initial_supply,
    })?;
    let data = pool_request(PoolRequestInner::Initialize(InitializePoolRequest {
        vault_signer_nonce: args.vault_signer_nonce,
        assets_length,
        pool_name: args.pool_name.clone(),
        fee_rate: args.fee_rate,
        custom_data,
    }))?;

    let mut metas = Vec::with_capacity(accounts.vaults.len() + 10);
    metas.push(AccountMeta::new(accounts.fund,            false));
    metas.push(AccountMeta::new(accounts.fund_token_mint, false));
    metas.extend(accounts.vaults.iter().map(|v| AccountMeta::new(*v, false)));
    metas.extend([
        AccountMeta::new_readonly(accounts.vault_authority,       false),
        AccountMeta::new_readonly(accounts.lqd_fee_vault,         false),
        AccountMeta::new_readonly(accounts.initializer_fee_vault, false),
        AccountMeta::new_readonly(accounts.rent_sysvar,           false),
        AccountMeta::new(accounts.admin,                          false),
        AccountMeta::new(accounts.initial_supply_account,         false),
        AccountMeta::new_readonly(accounts.basic_asset_vault,     false),
        AccountMeta::new_readonly(accounts.token_program,         false),
    ]);

    Ok(Instruction { program_id: *program_id, accounts: metas, data })
}

// ─── execute / redeem ─────────────────────────────────────────────────────────

/// Accounts read by execute (create or redeem), in wire order.
#[derive(Debug, Clone)]
pub struct ExecuteAccounts {
    pub fund:                   Pubkey,
    pub fund_token_mint:        Pubkey,
    /// Fund vaults, in asset order.
    pub vaults:                 Vec<Pubkey>,
    pub vault_authority:        Pubkey,
    pub user_pool_token:        Pubkey,
    /// User token accounts, one per asset, in asset order.
    pub user_assets:            Vec<Pubkey>,
    /// Owner or delegate of `user_assets`; signs the transaction.
    pub user_authority:         Pubkey,
    pub lqd_fee_vault:          Pubkey,
    pub initializer_fee_vault:  Pubkey,
    pub referrer_fee_vault:     Pubkey,
    pub token_program:          Pubkey,
}

/// Build an execute instruction that creates `amount` fund tokens.
pub fn execute_ix(program_id: &Pubkey, accounts: &ExecuteAccounts, amount: u64) -> Result<Instruction> {
    execute_action_ix(program_id, accounts, PoolAction::Create(amount))
}

/// Build an execute instruction that redeems `amount` fund tokens.
pub fn redeem_ix(program_id: &Pubkey, accounts: &ExecuteAccounts, amount: u64) -> Result<Instruction> {
    execute_action_ix(program_id, accounts, PoolAction::Redeem(amount))
}

fn execute_action_ix(
    program_id: &Pubkey,
    accounts:   &ExecuteAccounts,
    action:     PoolAction,
) -> Result<Instruction> {
    check_vault_count(&accounts.vaults)?;
    if accounts.user_assets.len() != accounts.vaults.len() {
        return Err(Error::CallerContractViolation(format!(
            "{} user asset accounts for {} vaults",
            accounts.user_assets.len(),
            accounts.vaults.len()
        )));
    }

    let data = pool_request(PoolRequestInner::Execute(action))?;

    let mut metas = Vec::with_capacity(accounts.vaults.len() * 2 + 9);
    metas.push(AccountMeta::new(accounts.fund,            false));
    metas.push(AccountMeta::new(accounts.fund_token_mint, false));
    metas.extend(accounts.vaults.iter().map(|v| AccountMeta::new(*v, false)));
    metas.push(AccountMeta::new_readonly(accounts.vault_authority, false));
    metas.push(AccountMeta::new(accounts.user_pool_token,          false));
    metas.extend(accounts.user_assets.iter().map(|a| AccountMeta::new(*a, false)));
    metas.extend([
        AccountMeta::new_readonly(accounts.user_authority, true),   // signer
        AccountMeta::new(accounts.lqd_fee_vault,           false),
        AccountMeta::new(accounts.initializer_fee_vault,   false),
        AccountMeta::new(accounts.referrer_fee_vault,      false),
        AccountMeta::new_readonly(accounts.token_program,  false),
    ]);

    Ok(Instruction { program_id: *program_id, accounts: metas, data })
}

// ─── Fund admin ───────────────────────────────────────────────────────────────

/// Stop creations and redemptions.
pub fn pause_ix(program_id: &Pubkey, fund: &Pubkey, admin: &Pubkey) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*fund,           false),
            AccountMeta::new_readonly(*admin, true),
        ],
        data: fund_request(FundInstruction::Pause)?,
    })
}

/// Resume creations and redemptions. No vault may have an outstanding delegate.
pub fn unpause_ix(
    program_id: &Pubkey,
    fund:       &Pubkey,
    admin:      &Pubkey,
    vaults:     &[Pubkey],
) -> Result<Instruction> {
    check_vault_count(vaults)?;
    let mut accounts = vec![
        AccountMeta::new(*fund,           false),
        AccountMeta::new_readonly(*admin, true),
    ];
    accounts.extend(vaults.iter().map(|v| AccountMeta::new_readonly(*v, false)));
    Ok(Instruction { program_id: *program_id, accounts, data: fund_request(FundInstruction::Unpause)? })
}

pub fn update_fee_ix(
    program_id: &Pubkey,
    fund:       &Pubkey,
    admin:      &Pubkey,
    fee_rate:   u32,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*fund,           false),
            AccountMeta::new_readonly(*admin, true),
        ],
        data: fund_request(FundInstruction::UpdateFee { fee_rate })?,
    })
}

/// Hand admin rights to `new_admin`. Both admins sign.
pub fn update_admin_ix(
    program_id: &Pubkey,
    fund:       &Pubkey,
    admin:      &Pubkey,
    new_admin:  &Pubkey,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*fund,               false),
            AccountMeta::new_readonly(*admin,     true),
            AccountMeta::new_readonly(*new_admin, true),
        ],
        data: fund_request(FundInstruction::UpdateAdmin)?,
    })
}

/// Let `delegate` spend up to `amount` from one fund vault.
pub fn approve_delegate_ix(
    program_id:   &Pubkey,
    fund:         &Pubkey,
    admin:        &Pubkey,
    vault:        &Pubkey,
    delegate:     &Pubkey,
    vault_signer: &Pubkey,
    amount:       u64,
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*fund,                         false),
            AccountMeta::new_readonly(*admin,               true),
            AccountMeta::new(*vault,                        false),
            AccountMeta::new_readonly(*delegate,            false),
            AccountMeta::new_readonly(*vault_signer,        false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
        ],
        data: fund_request(FundInstruction::ApproveDelegate { amount })?,
    })
}

/// Swap accounts for one asset during a rebalance.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceSwapAccounts {
    pub swap:              Pubkey,
    pub swap_authority:    Pubkey,
    /// Pool reserve holding the fund asset.
    pub swap_asset:        Pubkey,
    /// Pool reserve holding the basic asset.
    pub swap_basic_asset:  Pubkey,
    pub swap_pool_mint:    Pubkey,
    pub swap_fee_account:  Pubkey,
}

/// Accounts read by rebalance, in wire order.
#[derive(Debug, Clone)]
pub struct RebalanceAccounts {
    pub fund:              Pubkey,
    pub admin:             Pubkey,
    pub vaults:            Vec<Pubkey>,
    pub vault_authority:   Pubkey,
    pub basic_asset_vault: Pubkey,
    /// One entry per vault, in asset order.
    pub swaps:             Vec<RebalanceSwapAccounts>,
    pub swap_program:      Pubkey,
}

/// Swap the fund's holdings back to its target weights.
pub fn rebalance_ix(program_id: &Pubkey, accounts: &RebalanceAccounts) -> Result<Instruction> {
    check_vault_count(&accounts.vaults)?;
    if accounts.swaps.len() != accounts.vaults.len() {
        return Err(Error::CallerContractViolation(format!(
            "{} swap account sets for {} vaults",
            accounts.swaps.len(),
            accounts.vaults.len()
        )));
    }

    let mut metas = Vec::with_capacity(accounts.vaults.len() * 7 + 6);
    metas.push(AccountMeta::new(accounts.fund,           false));
    metas.push(AccountMeta::new_readonly(accounts.admin, true));
    metas.extend(accounts.vaults.iter().map(|v| AccountMeta::new(*v, false)));
    metas.push(AccountMeta::new_readonly(accounts.vault_authority, false));
    metas.push(AccountMeta::new(accounts.basic_asset_vault,        false));
    for s in &accounts.swaps {
        metas.extend([
            AccountMeta::new_readonly(s.swap,           false),
            AccountMeta::new_readonly(s.swap_authority, false),
            AccountMeta::new(s.swap_asset,              false),
            AccountMeta::new(s.swap_basic_asset,        false),
            AccountMeta::new(s.swap_pool_mint,          false),
            AccountMeta::new(s.swap_fee_account,        false),
        ]);
    }
    metas.push(AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID,  false));
    metas.push(AccountMeta::new_readonly(accounts.swap_program, false));

    Ok(Instruction {
        program_id: *program_id,
        accounts: metas,
        data: fund_request(FundInstruction::Rebalance)?,
    })
}

// ─── SPL token ────────────────────────────────────────────────────────────────

/// SPL token `InitializeAccount` (tag 1).
pub fn initialize_account_ix(account: &Pubkey, mint: &Pubkey, owner: &Pubkey) -> Instruction {
    Instruction {
        program_id: SPL_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*account,                false),
            AccountMeta::new_readonly(*mint,          false),
            AccountMeta::new_readonly(*owner,         false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
        ],
        data: vec![1],
    }
}

/// SPL token `Approve` (tag 4): `owner` lets `delegate` move `amount` from `source`.
pub fn approve_ix(source: &Pubkey, delegate: &Pubkey, owner: &Pubkey, amount: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(4);
    data.extend_from_slice(&amount.to_le_bytes());
    Instruction {
        program_id: SPL_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*source,             false),
            AccountMeta::new_readonly(*delegate,  false),
            AccountMeta::new_readonly(*owner,     true),
        ],
        data,
    }
}

// ─── SPL token-swap ───────────────────────────────────────────────────────────

/// Accounts of one SPL token-swap `Swap`, in wire order.
#[derive(Debug, Clone, Copy)]
pub struct SwapAccounts {
    pub swap:                    Pubkey,
    pub swap_authority:          Pubkey,
    /// Signs for the transfer out of `source`; usually an approved delegate.
    pub user_transfer_authority: Pubkey,
    pub source:                  Pubkey,
    /// Pool reserve receiving the input token.
    pub swap_source:             Pubkey,
    /// Pool reserve paying out the output token.
    pub swap_destination:        Pubkey,
    pub destination:             Pubkey,
    pub pool_mint:               Pubkey,
    pub pool_fee_account:        Pubkey,
    pub token_program:           Pubkey,
}

/// SPL token-swap `Swap` (tag 1) with no host fee account.
pub fn swap_ix(
    swap_program_id:    &Pubkey,
    accounts:           &SwapAccounts,
    amount_in:          u64,
    minimum_amount_out: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(17);
    data.push(1);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&minimum_amount_out.to_le_bytes());
    Instruction {
        program_id: *swap_program_id,
        accounts: vec![
            AccountMeta::new_readonly(accounts.swap,                    false),
            AccountMeta::new_readonly(accounts.swap_authority,          false),
            AccountMeta::new_readonly(accounts.user_transfer_authority, true),
            AccountMeta::new(accounts.source,                           false),
            AccountMeta::new(accounts.swap_source,                      false),
            AccountMeta::new(accounts.swap_destination,                 false),
            AccountMeta::new(accounts.destination,                      false),
            AccountMeta::new(accounts.pool_mint,                        false),
            AccountMeta::new(accounts.pool_fee_account,                 false),
            AccountMeta::new_readonly(accounts.token_program,           false),
        ],
        data,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
