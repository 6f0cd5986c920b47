//! [`FundClient`]: fetch fund state, plan an investment and submit it.
//!
//! The client owns no connection of its own. Account reads go through an
//! [`AccountFetcher`]; signing and submission go through a
//! [`TransactionSubmitter`] handed to [`FundClient::invest`].

#![allow(async_fn_in_trait)]

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    rent::Rent,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::Transaction,
};

use crate::{
    error::{Error, Result},
    instructions::{
        approve_ix, derive_swap_authority, derive_vault_signer, execute_ix,
        initialize_account_ix, swap_ix, ExecuteAccounts, SwapAccounts, SPL_TOKEN_PROGRAM_ID,
        TOKEN_ACCOUNT_LEN,
    },
    math::{compute_investment_plan, FundSnapshot, LiquidityPool, Slippage},
    state::{decode_fund_state, parse_mint, parse_token_amount, parse_token_swap, FundState},
    types::{ClientConfig, InvestParams, InvestResult, InvestTransaction, PreparedInvestment},
};

/// `getMultipleAccounts` accepts at most this many keys per call.
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

// ─── Collaborators ────────────────────────────────────────────────────────────

/// Source of raw account bytes.
pub trait AccountFetcher {
    /// Data of one account, `None` when it does not exist.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Data of several accounts, positionally aligned with `addresses`.
    async fn fetch_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Lamports that make an account of `data_len` bytes rent-exempt.
    ///
    /// Defaults to the standard rent schedule; RPC-backed fetchers ask the cluster.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(Rent::default().minimum_balance(data_len))
    }
}

/// Signs and submits a transaction.
pub trait TransactionSubmitter {
    /// `signers` are the signers besides the fee payer.
    async fn sign_and_submit(&self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<Signature>;
}

/// The wallet that pays for and authorizes user-side actions.
pub trait WalletProvider {
    fn wallet_pubkey(&self) -> Pubkey;
}

impl AccountFetcher for RpcClient {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let mut accounts = self.get_multiple_accounts(std::slice::from_ref(address)).await?;
        Ok(accounts.pop().flatten().map(|a| a.data))
    }

    async fn fetch_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self.get_multiple_accounts(chunk).await?;
            out.extend(accounts.into_iter().map(|a| a.map(|a| a.data)));
        }
        Ok(out)
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self.get_minimum_balance_for_rent_exemption(data_len).await?)
    }
}

/// A local keypair paired with an RPC endpoint.
pub struct KeypairWallet {
    rpc:   RpcClient,
    payer: Keypair,
}

impl KeypairWallet {
    pub fn new(rpc_url: impl Into<String>, payer: Keypair) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed()),
            payer,
        }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

impl WalletProvider for KeypairWallet {
    fn wallet_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }
}

impl TransactionSubmitter for KeypairWallet {
    async fn sign_and_submit(&self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<Signature> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        let mut all: Vec<&dyn Signer> = vec![&self.payer];
        all.extend(signers.iter().map(|k| *k as &dyn Signer));
        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &all,
            blockhash,
        );
        Ok(self.rpc.send_and_confirm_transaction(&tx).await?)
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Fund pool client over any [`AccountFetcher`].
///
/// ```rust,no_run
/// # use fund_pool_sdk::{ClientConfig, FundClient, Slippage};
/// # use solana_client::nonblocking::rpc_client::RpcClient;
/// # use solana_sdk::pubkey::Pubkey;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let (program_id, fund, pool_a, pool_b) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
/// let rpc    = RpcClient::new("https://api.devnet.solana.com".to_string());
/// let client = FundClient::new(rpc, ClientConfig::new(program_id));
/// let prepared = client
///     .plan_investment(&fund, &[pool_a, pool_b], 1_000_000, Some(Slippage::from_percent(1)))
///     .await?;
/// println!("requesting {} fund tokens", prepared.plan.total_pool_tokens_requested);
/// # Ok(())
/// # }
/// ```
pub struct FundClient<F> {
    fetcher: F,
    config:  ClientConfig,
}

impl<F: AccountFetcher> FundClient<F> {
    pub fn new(fetcher: F, config: ClientConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Read operations ───────────────────────────────────────────────────────

    /// Fetch and decode a fund account.
    pub async fn fetch_fund(&self, fund: &Pubkey) -> Result<FundState> {
        let data = self
            .fetcher
            .fetch_account(fund)
            .await?
            .ok_or(Error::AccountNotFound(*fund))?;
        decode_fund_state(&data)
    }

    /// Fund state plus fund-token supply and vault balances, in one batch.
    ///
    /// Accounts that do not exist are left as `None`; the planner reports them.
    pub async fn fetch_fund_snapshot(&self, fund: &Pubkey) -> Result<FundSnapshot> {
        let state = self.fetch_fund(fund).await?;
        let vaults = state.vault_accounts();

        let mut keys = Vec::with_capacity(vaults.len() + 1);
        keys.push(state.pool.pool_token_mint);
        keys.extend_from_slice(&vaults);
        let mut accounts = self.fetcher.fetch_multiple_accounts(&keys).await?.into_iter();

        let pool_token_supply = accounts
            .next()
            .flatten()
            .map(|data| parse_mint(&data).map(|m| m.supply))
            .transpose()?;
        let vault_balances = vaults
            .iter()
            .map(|_| accounts.next().flatten().map(|data| parse_token_amount(&data)).transpose())
            .collect::<Result<Vec<_>>>()?;

        Ok(FundSnapshot { address: *fund, state, pool_token_supply, vault_balances })
    }

    /// Fetch token-swap pools and both reserves of each.
    pub async fn fetch_pools(&self, addresses: &[Pubkey]) -> Result<Vec<LiquidityPool>> {
        let swap_accounts = self.fetcher.fetch_multiple_accounts(addresses).await?;
        let swaps = addresses
            .iter()
            .enumerate()
            .map(|(i, address)| {
                let data = swap_accounts
                    .get(i)
                    .cloned()
                    .flatten()
                    .ok_or(Error::AccountNotFound(*address))?;
                parse_token_swap(&data)
            })
            .collect::<Result<Vec<_>>>()?;

        let reserve_keys: Vec<Pubkey> = swaps
            .iter()
            .flat_map(|s| [s.token_account_a, s.token_account_b])
            .collect();
        let reserves = self.fetcher.fetch_multiple_accounts(&reserve_keys).await?;
        let amount_at = |i: usize| -> Result<Option<u64>> {
            reserves
                .get(i)
                .cloned()
                .flatten()
                .map(|data| parse_token_amount(&data))
                .transpose()
        };

        addresses
            .iter()
            .zip(swaps)
            .enumerate()
            .map(|(i, (address, swap))| -> Result<LiquidityPool> {
                Ok(LiquidityPool {
                    address:   *address,
                    authority: derive_swap_authority(address, &self.config.swap_program_id).0,
                    swap,
                    reserve_a: amount_at(2 * i)?,
                    reserve_b: amount_at(2 * i + 1)?,
                })
            })
            .collect()
    }

    /// Fetch everything the planner needs and compute the plan.
    ///
    /// `slippage` overrides the configured default.
    pub async fn plan_investment(
        &self,
        fund:        &Pubkey,
        pools:       &[Pubkey],
        base_amount: u64,
        slippage:    Option<Slippage>,
    ) -> Result<PreparedInvestment> {
        let snapshot = self.fetch_fund_snapshot(fund).await?;
        let pools = self.fetch_pools(pools).await?;
        let token_account_rent = self
            .fetcher
            .minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN)
            .await?;
        let plan = compute_investment_plan(
            base_amount,
            &snapshot,
            &pools,
            slippage.unwrap_or(self.config.slippage),
        )?;
        Ok(PreparedInvestment { fund: snapshot, pools, plan, token_account_rent })
    }

    // ── Transaction assembly ──────────────────────────────────────────────────

    /// Assemble the invest transaction for a prepared plan.
    ///
    /// Creates the user's fund-token account and one account per asset,
    /// approves a fresh transfer authority for each swap's input, swaps the
    /// base asset into every basket asset, then executes the creation.
    pub fn build_invest_instructions(
        &self,
        prepared:           &PreparedInvestment,
        user:               &Pubkey,
        base_token_account: &Pubkey,
    ) -> Result<InvestTransaction> {
        let fund = &prepared.fund;
        let pool = &fund.state.pool;
        let rent = prepared.token_account_rent;

        let mut instructions = Vec::new();
        let mut signers = Vec::new();

        let user_pool_token = Keypair::new();
        push_token_account(&mut instructions, user, &user_pool_token, &pool.pool_token_mint, rent);

        let transfer_authority = Keypair::new();
        let mut user_asset_accounts = Vec::with_capacity(prepared.plan.swaps.len());

        for planned in &prepared.plan.swaps {
            let liquidity = prepared
                .pools
                .iter()
                .find(|p| p.address == planned.pool)
                .ok_or(Error::MissingPoolForAsset(planned.asset.mint))?;

            let asset_account = Keypair::new();
            push_token_account(&mut instructions, user, &asset_account, &planned.asset.mint, rent);

            // Base asset enters on its own side of the pool; the asset leaves on the other.
            let (swap_source, swap_destination) = if planned.reversed {
                (liquidity.swap.token_account_b, liquidity.swap.token_account_a)
            } else {
                (liquidity.swap.token_account_a, liquidity.swap.token_account_b)
            };

            instructions.push(approve_ix(
                base_token_account,
                &transfer_authority.pubkey(),
                user,
                planned.quote.amount_in,
            ));
            instructions.push(swap_ix(
                &self.config.swap_program_id,
                &SwapAccounts {
                    swap:                    liquidity.address,
                    swap_authority:          liquidity.authority,
                    user_transfer_authority: transfer_authority.pubkey(),
                    source:                  *base_token_account,
                    swap_source,
                    swap_destination,
                    destination:             asset_account.pubkey(),
                    pool_mint:               liquidity.swap.pool_mint,
                    pool_fee_account:        liquidity.swap.fee_account,
                    token_program:           liquidity.swap.token_program_id,
                },
                planned.quote.amount_in,
                planned.min_amount_out,
            ));

            user_asset_accounts.push(asset_account.pubkey());
            signers.push(asset_account);
        }

        let (vault_authority, _) = derive_vault_signer(&fund.address, &self.config.program_id);
        instructions.push(execute_ix(
            &self.config.program_id,
            &ExecuteAccounts {
                fund:                  fund.address,
                fund_token_mint:       pool.pool_token_mint,
                vaults:                fund.state.vault_accounts(),
                vault_authority,
                user_pool_token:       user_pool_token.pubkey(),
                user_assets:           user_asset_accounts.clone(),
                user_authority:        *user,
                lqd_fee_vault:         pool.lqd_fee_vault,
                initializer_fee_vault: pool.initializer_fee_vault,
                referrer_fee_vault:    self.config.referrer_fee_vault.unwrap_or(pool.lqd_fee_vault),
                token_program:         SPL_TOKEN_PROGRAM_ID,
            },
            prepared.plan.total_pool_tokens_requested,
        )?);

        let user_pool_token_key = user_pool_token.pubkey();
        let user_transfer_authority = transfer_authority.pubkey();
        signers.insert(0, user_pool_token);
        signers.push(transfer_authority);

        Ok(InvestTransaction {
            instructions,
            signers,
            user_pool_token: user_pool_token_key,
            user_asset_accounts,
            user_transfer_authority,
        })
    }

    // ── Write operations ──────────────────────────────────────────────────────

    /// Plan, assemble and submit an investment in one call.
    pub async fn invest<W>(&self, wallet: &W, params: InvestParams) -> Result<InvestResult>
    where
        W: TransactionSubmitter + WalletProvider,
    {
        let prepared = self
            .plan_investment(&params.fund, &params.pools, params.base_amount, params.slippage)
            .await?;
        self.submit_investment(wallet, prepared, &params.base_token_account).await
    }

    /// Assemble and submit a plan from [`FundClient::plan_investment`]
    /// without fetching anything again.
    pub async fn submit_investment<W>(
        &self,
        wallet:             &W,
        prepared:           PreparedInvestment,
        base_token_account: &Pubkey,
    ) -> Result<InvestResult>
    where
        W: TransactionSubmitter + WalletProvider,
    {
        let tx = self.build_invest_instructions(&prepared, &wallet.wallet_pubkey(), base_token_account)?;

        let signers: Vec<&Keypair> = tx.signers.iter().collect();
        let signature = wallet.sign_and_submit(&tx.instructions, &signers).await?;

        Ok(InvestResult {
            signature,
            plan:                prepared.plan,
            user_pool_token:     tx.user_pool_token,
            user_asset_accounts: tx.user_asset_accounts,
        })
    }
}

/// Create and initialize a token account for `mint` owned by `owner`.
fn push_token_account(
    instructions: &mut Vec<Instruction>,
    owner:        &Pubkey,
    account:      &Keypair,
    mint:         &Pubkey,
    lamports:     u64,
) {
    instructions.push(system_instruction::create_account(
        owner,
        &account.pubkey(),
        lamports,
        TOKEN_ACCOUNT_LEN as u64,
        &SPL_TOKEN_PROGRAM_ID,
    ));
    instructions.push(initialize_account_ix(&account.pubkey(), mint, owner));
}
