use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use fund_pool_sdk::{
    math::AssetSwap,
    state::fund_account_len,
    ClientConfig, FundClient, FundState, InvestmentPlan, KeypairWallet, Slippage,
    WalletProvider,
};
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
};
use std::str::FromStr;

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Expand `~/` to `$HOME/` in keypair paths.
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", std::env::var("HOME").unwrap_or_default(), rest)
    } else {
        path.to_string()
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded)
        .map_err(|e| anyhow!(
            "Cannot load keypair from '{}': {}\n  \
             Set FUND_KEYPAIR or pass --keypair to specify a different path.",
            expanded, e
        ))
}

fn parse_pubkey(value: &str, what: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| anyhow!("{what}: '{value}' is not a base-58 address"))
}

/// Shortened address for table output.
fn short(key: &Pubkey) -> String {
    let addr = key.to_string();
    format!("{}…{}", &addr[..4], &addr[addr.len() - 4..])
}

fn rpc(url: &str) -> RpcClient {
    RpcClient::new_with_commitment(url.to_string(), CommitmentConfig::confirmed())
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// Fund pool: invest a single token into a weighted on-chain basket.
///
/// Every command supports --json for machine-readable output.
#[derive(Parser)]
#[command(
    name    = "fund-pool",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Inspect fund pools, plan investments and submit them on Solana.",
    after_help = "\
ENVIRONMENT:
  FUND_RPC_URL          Solana JSON-RPC endpoint  [default: https://api.mainnet-beta.solana.com]
  FUND_KEYPAIR          Path to Ed25519 keypair JSON  [default: ~/.config/solana/id.json]
  FUND_PROGRAM_ID       Fund program address
  FUND_SWAP_PROGRAM_ID  SPL token-swap program address
  FUND_REFERRER_VAULT   Referrer fee vault passed to execute

QUICK START:
  fund-pool fund-info --fund <FUND>
  fund-pool plan      --fund <FUND> --pool <SWAP1>,<SWAP2> --amount 1000000
  fund-pool invest    --fund <FUND> --pool <SWAP1>,<SWAP2> --amount 1000000 --base-account <TOKEN_ACCOUNT>
  fund-pool account-size --name \"Top 3\" --assets 3"
)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(
        long,
        global        = true,
        value_name    = "URL",
        default_value = "https://api.mainnet-beta.solana.com",
        env           = "FUND_RPC_URL"
    )]
    rpc_url: String,

    /// Path to the wallet's Ed25519 keypair JSON file
    #[arg(
        long,
        global        = true,
        value_name    = "PATH",
        default_value = "~/.config/solana/id.json",
        env           = "FUND_KEYPAIR"
    )]
    keypair: String,

    /// JSON client config; flags and environment variables override it
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<String>,

    /// Fund program address
    #[arg(long, global = true, value_name = "ADDRESS", env = "FUND_PROGRAM_ID")]
    program_id: Option<String>,

    /// SPL token-swap program address
    #[arg(long, global = true, value_name = "ADDRESS", env = "FUND_SWAP_PROGRAM_ID")]
    swap_program_id: Option<String>,

    /// Referrer fee vault passed to execute
    #[arg(long, global = true, value_name = "ADDRESS", env = "FUND_REFERRER_VAULT")]
    referrer_vault: Option<String>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a fund's assets, weights, fees and vault balances
    FundInfo {
        /// Fund account address
        #[arg(long, value_name = "ADDRESS")]
        fund: String,
    },

    /// Compute the swaps and fund-token request for an investment, without sending
    #[command(
        after_help = "\
NOTES:
  Each asset receives base_amount × 10 / weight of the base asset, where the
  weight is stored in tenths of a percent. Slippage is in basis points:
  10 = 0.1% (default), 100 = 1%."
    )]
    Plan {
        #[arg(long, value_name = "ADDRESS")]
        fund: String,

        /// Token-swap pools to route through (repeat or comma-separate)
        #[arg(long = "pool", value_name = "ADDRESS", value_delimiter = ',', required = true)]
        pools: Vec<String>,

        /// Contribution in the base asset's smallest unit
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        /// Slippage tolerance in basis points (overrides config)
        #[arg(long, value_name = "BPS")]
        slippage_bps: Option<u64>,
    },

    /// Swap the base asset into the basket and create fund tokens
    Invest {
        #[arg(long, value_name = "ADDRESS")]
        fund: String,

        #[arg(long = "pool", value_name = "ADDRESS", value_delimiter = ',', required = true)]
        pools: Vec<String>,

        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        /// Token account holding the base asset, owned by the wallet
        #[arg(long, value_name = "ADDRESS")]
        base_account: String,

        #[arg(long, value_name = "BPS")]
        slippage_bps: Option<u64>,
    },

    /// Bytes to allocate for a fund account
    AccountSize {
        #[arg(long)]
        name: String,

        /// Number of basket assets
        #[arg(long, value_name = "N")]
        assets: usize,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::FundInfo { fund } => {
            cmd_fund_info(&cli, fund).await?;
        }
        Commands::Plan { fund, pools, amount, slippage_bps } => {
            cmd_plan(&cli, fund, pools, *amount, *slippage_bps).await?;
        }
        Commands::Invest { fund, pools, amount, base_account, slippage_bps } => {
            cmd_invest(&cli, fund, pools, *amount, base_account, *slippage_bps).await?;
        }
        Commands::AccountSize { name, assets } => {
            cmd_account_size(name, *assets, cli.json)?;
        }
    }

    Ok(())
}

/// Build the client config: JSON file first, then flags / environment.
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = expand_home(path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read config file '{path}'"))?;
            ClientConfig::from_json(&raw).with_context(|| format!("Invalid config file '{path}'"))?
        }
        None => {
            let program_id = cli.program_id.as_deref().ok_or_else(|| anyhow!(
                "No fund program id. Pass --program-id, set FUND_PROGRAM_ID or use --config."
            ))?;
            ClientConfig::new(parse_pubkey(program_id, "--program-id")?)
        }
    };
    if let Some(id) = &cli.program_id {
        config.program_id = parse_pubkey(id, "--program-id")?;
    }
    if let Some(id) = &cli.swap_program_id {
        config.swap_program_id = parse_pubkey(id, "--swap-program-id")?;
    }
    if let Some(vault) = &cli.referrer_vault {
        config.referrer_fee_vault = Some(parse_pubkey(vault, "--referrer-vault")?);
    }
    Ok(config)
}

fn parse_pools(pools: &[String]) -> Result<Vec<Pubkey>> {
    pools.iter().map(|p| parse_pubkey(p, "--pool")).collect()
}

fn warn_if_paused(state: &FundState, fund: &Pubkey, tag: &str) {
    if state.sub_state.paused {
        eprintln!("[{tag}] fund {fund} is paused; the program will reject creations until it is unpaused");
    }
}

// ─── fund-info ────────────────────────────────────────────────────────────────

async fn cmd_fund_info(cli: &Cli, fund: &str) -> Result<()> {
    let fund = parse_pubkey(fund, "--fund")?;
    let client = FundClient::new(rpc(&cli.rpc_url), client_config(cli)?);

    let snapshot = client
        .fetch_fund_snapshot(&fund)
        .await
        .with_context(|| format!("Failed to load fund {fund}"))?;
    let state = &snapshot.state;
    let basket = state.basket().context("Fund state is inconsistent")?;

    if cli.json {
        let assets: Vec<Value> = basket
            .iter()
            .zip(&snapshot.vault_balances)
            .map(|((asset, weight), balance)| json!({
                "mint":          asset.mint.to_string(),
                "vault":         asset.vault_address.to_string(),
                "weight":        weight,
                "vault_balance": balance,
            }))
            .collect();
        println!("{}", json!({
            "status":                "ok",
            "command":               "fund-info",
            "fund":                  fund.to_string(),
            "name":                  state.pool.name,
            "fund_token_mint":       state.pool.pool_token_mint.to_string(),
            "fund_token_supply":     snapshot.pool_token_supply,
            "vault_signer":          state.pool.vault_signer.to_string(),
            "fee_rate":              state.pool.fee_rate,
            "lqd_fee_vault":         state.pool.lqd_fee_vault.to_string(),
            "initializer_fee_vault": state.pool.initializer_fee_vault.to_string(),
            "admin":                 state.pool.admin_key.0.map(|k| k.to_string()),
            "paused":                state.sub_state.paused,
            "slippage_divider":      state.sub_state.slippage_divider,
            "basic_asset":           state.sub_state.basic_asset.mint.to_string(),
            "assets":                assets,
        }));
    } else {
        println!("─── Fund ─────────────────────────────────────────────────────────");
        println!("  Name             {}", state.pool.name);
        println!("  Address          {fund}");
        println!("  Fund token       {}", state.pool.pool_token_mint);
        match snapshot.pool_token_supply {
            Some(supply) => println!("  Supply           {supply:>20}"),
            None         => println!("  Supply           (mint not found)"),
        }
        println!("  Basic asset      {}", state.sub_state.basic_asset.mint);
        println!("  Fee rate         {}", state.pool.fee_rate);
        println!("  Status           {}", if state.sub_state.paused { "paused" } else { "active" });
        if let Some(admin) = state.pool.admin_key.0 {
            println!("  Admin            {admin}");
        }
        println!();
        println!("  {:<12} {:>8}  {:>20}", "Asset", "Weight", "Vault balance");
        for ((asset, weight), balance) in basket.iter().zip(&snapshot.vault_balances) {
            let balance = balance.map(|b| b.to_string()).unwrap_or_else(|| "-".into());
            println!(
                "  {:<12} {:>7.1}%  {:>20}",
                short(&asset.mint),
                *weight as f64 / 10.0,
                balance
            );
        }
    }
    Ok(())
}

// ─── plan ─────────────────────────────────────────────────────────────────────

fn swap_json(s: &AssetSwap) -> Value {
    json!({
        "asset":                 s.asset.mint.to_string(),
        "pool":                  s.pool.to_string(),
        "weight":                s.weight,
        "reversed":              s.reversed,
        "from_amount":           s.quote.amount_in,
        "reserve_in":            s.quote.reserve_in,
        "reserve_out":           s.quote.reserve_out,
        "gross_out":             s.quote.gross_out,
        "fee":                   s.quote.fee,
        "net_out":               s.quote.net_out,
        "min_amount_out":        s.min_amount_out,
        "vault_balance":         s.vault_balance,
        "pool_tokens_requested": format!(
            "{}/{}", s.pool_tokens_requested.numerator, s.pool_tokens_requested.denominator
        ),
    })
}

fn plan_json(plan: &InvestmentPlan) -> Value {
    json!({
        "base_amount":                 plan.base_amount,
        "slippage_bps":                plan.slippage.bps(),
        "fund_token_supply":           plan.pool_token_supply,
        "swaps":                       plan.swaps.iter().map(swap_json).collect::<Vec<_>>(),
        "total_pool_tokens_requested": plan.total_pool_tokens_requested,
    })
}

fn print_plan(plan: &InvestmentPlan) {
    println!("  Base amount      {:>20}", plan.base_amount);
    println!("  Slippage         {:>20}", format!("{} bp", plan.slippage.bps()));
    println!();
    println!(
        "  {:<12} {:>12} {:>12} {:>8} {:>12}  {}",
        "Asset", "In", "Out (net)", "Fee", "Min out", "Pool"
    );
    for s in &plan.swaps {
        println!(
            "  {:<12} {:>12} {:>12} {:>8} {:>12}  {}{}",
            short(&s.asset.mint),
            s.quote.amount_in,
            s.quote.net_out,
            s.quote.fee,
            s.min_amount_out,
            short(&s.pool),
            if s.reversed { " (B→A)" } else { "" }
        );
    }
    println!();
    println!("  Fund tokens      {:>20}", plan.total_pool_tokens_requested);
}

async fn cmd_plan(
    cli:          &Cli,
    fund:         &str,
    pools:        &[String],
    amount:       u64,
    slippage_bps: Option<u64>,
) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0 (smallest unit of the base asset)"));
    }
    let fund = parse_pubkey(fund, "--fund")?;
    let pools = parse_pools(pools)?;
    let client = FundClient::new(rpc(&cli.rpc_url), client_config(cli)?);

    let prepared = client
        .plan_investment(&fund, &pools, amount, slippage_bps.map(Slippage::from_bps))
        .await
        .context("Could not plan the investment")?;
    warn_if_paused(&prepared.fund.state, &fund, "plan");

    if cli.json {
        println!("{}", json!({
            "status":  "ok",
            "command": "plan",
            "fund":    fund.to_string(),
            "plan":    plan_json(&prepared.plan),
        }));
    } else {
        println!("─── Investment Plan ──────────────────────────────────────────────");
        println!("  Fund             {fund}");
        print_plan(&prepared.plan);
        println!();
        println!("  Run `fund-pool invest` with the same arguments to submit it.");
    }
    Ok(())
}

// ─── invest ───────────────────────────────────────────────────────────────────

async fn cmd_invest(
    cli:          &Cli,
    fund:         &str,
    pools:        &[String],
    amount:       u64,
    base_account: &str,
    slippage_bps: Option<u64>,
) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0 (smallest unit of the base asset)"));
    }
    let fund = parse_pubkey(fund, "--fund")?;
    let pools = parse_pools(pools)?;
    let base_token_account = parse_pubkey(base_account, "--base-account")?;

    let payer  = load_keypair(&cli.keypair)?;
    let wallet = KeypairWallet::new(cli.rpc_url.clone(), payer);
    let client = FundClient::new(rpc(&cli.rpc_url), client_config(cli)?);

    let prepared = client
        .plan_investment(&fund, &pools, amount, slippage_bps.map(Slippage::from_bps))
        .await
        .context("Could not plan the investment")?;
    warn_if_paused(&prepared.fund.state, &fund, "invest");
    eprintln!(
        "[invest] wallet {}  fund {}  {} assets  requesting {} fund tokens",
        wallet.wallet_pubkey(),
        fund,
        prepared.plan.swaps.len(),
        prepared.plan.total_pool_tokens_requested,
    );

    let result = client
        .submit_investment(&wallet, prepared, &base_token_account)
        .await
        .context("Invest transaction failed")?;

    if cli.json {
        println!("{}", json!({
            "status":              "ok",
            "command":             "invest",
            "fund":                fund.to_string(),
            "plan":                plan_json(&result.plan),
            "user_pool_token":     result.user_pool_token.to_string(),
            "user_asset_accounts": result.user_asset_accounts.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            "tx":                  result.signature.to_string(),
        }));
    } else {
        println!("─── Invested ─────────────────────────────────────────────────────");
        println!("  Fund             {fund}");
        print_plan(&result.plan);
        println!("  Fund token acct  {}", result.user_pool_token);
        println!("  Transaction      {}", result.signature);
    }
    Ok(())
}

// ─── account-size ─────────────────────────────────────────────────────────────

fn cmd_account_size(name: &str, assets: usize, json_output: bool) -> Result<()> {
    let len = fund_account_len(name, assets).context("Could not size the fund account")?;
    if json_output {
        println!("{}", json!({
            "status":  "ok",
            "command": "account-size",
            "name":    name,
            "assets":  assets,
            "bytes":   len,
        }));
    } else {
        println!("  Fund account for {assets} assets named {name:?}: {len} bytes");
    }
    Ok(())
}
