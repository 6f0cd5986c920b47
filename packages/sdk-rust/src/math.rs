//! Swap, slippage and share math for the invest flow.
//!
//! Integer-only, so off-chain amounts agree with what the swap and fund
//! programs compute. Per-asset quotes fit in `u128`; each asset's share
//! request is an exact 256-bit fraction, and the aggregate is summed as an
//! arbitrary-precision rational and floored once.

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::codec::AssetInfo;
use crate::error::{Error, Result};
use crate::state::{FundState, TokenSwapState};

mod wide {
    use uint::construct_uint;

    construct_uint! {
        /// Numerator of one asset's share fraction.
        pub struct U256(4);
    }
}

pub use wide::U256;

// ─── Constants ────────────────────────────────────────────────────────────────

/// Slippage denominator: 100% = 10_000 bp.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Stored asset weights are tenths of a percent: 1000 = 100.0%.
pub const WEIGHT_SCALE: u64 = 10;

// ─── Slippage ─────────────────────────────────────────────────────────────────

/// Slippage tolerance, held in basis points of a percent (1 bp = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slippage {
    bps: u64,
}

impl Slippage {
    /// 0.1%.
    pub const DEFAULT: Slippage = Slippage { bps: 10 };
    pub const ZERO: Slippage = Slippage { bps: 0 };

    pub const fn from_bps(bps: u64) -> Self {
        Self { bps }
    }

    /// Whole percent: `from_percent(1)` is 1%.
    pub const fn from_percent(percent: u64) -> Self {
        Self { bps: percent.saturating_mul(100) }
    }

    pub const fn bps(&self) -> u64 {
        self.bps
    }
}

impl Default for Slippage {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippageDirection {
    /// Raise an amount, e.g. a maximum to pay.
    Up,
    /// Lower an amount, e.g. a minimum to receive.
    Down,
}

/// `amount × (1 ± slippage)`, floored.
///
/// Moving down by more than 100% is rejected.
pub fn adjust_for_slippage(
    amount:    u64,
    direction: SlippageDirection,
    slippage:  Slippage,
) -> Result<u64> {
    let adjusted = (amount as u128)
        .checked_mul(slippage_factor(direction, slippage)? as u128)
        .ok_or(Error::MathOverflow)?
        / BPS_DENOMINATOR as u128;
    u64::try_from(adjusted).map_err(|_| Error::MathOverflow)
}

/// `10_000 ± bps`: the adjusted amount scaled by [`BPS_DENOMINATOR`].
fn slippage_factor(direction: SlippageDirection, slippage: Slippage) -> Result<u64> {
    match direction {
        SlippageDirection::Up => BPS_DENOMINATOR
            .checked_add(slippage.bps)
            .ok_or(Error::MathOverflow),
        SlippageDirection::Down => BPS_DENOMINATOR.checked_sub(slippage.bps).ok_or_else(|| {
            Error::InvalidArgument(format!("slippage of {} bp exceeds 100%", slippage.bps))
        }),
    }
}

// ─── Constant-product quote ───────────────────────────────────────────────────

/// Every intermediate of one constant-product swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_in:       u64,
    /// Input-side reserve before the swap.
    pub reserve_in:      u64,
    /// Output-side reserve before the swap.
    pub reserve_out:     u64,
    pub invariant:       u128,
    pub new_reserve_in:  u128,
    pub new_reserve_out: u128,
    pub gross_out:       u64,
    pub fee:             u64,
    /// `gross_out - fee`, before any slippage allowance.
    pub net_out:         u64,
}

/// Quote a constant-product swap with the fee taken from the output.
///
/// ```text
/// invariant       = reserve_in × reserve_out
/// new_reserve_out = ⌊invariant / (reserve_in + amount_in)⌋
/// gross_out       = reserve_out − new_reserve_out
/// fee             = ⌊gross_out × fee_numerator / fee_denominator⌋
/// ```
pub fn quote_swap(
    amount_in:       u64,
    reserve_in:      u64,
    reserve_out:     u64,
    fee_numerator:   u64,
    fee_denominator: u64,
) -> Result<SwapQuote> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::NoLiquidity);
    }

    // u64 × u64 always fits in u128.
    let invariant = reserve_in as u128 * reserve_out as u128;
    let new_reserve_in = reserve_in as u128 + amount_in as u128;
    let new_reserve_out = invariant / new_reserve_in;
    let gross_out = reserve_out as u128 - new_reserve_out;

    let fee = trade_fee(gross_out, fee_numerator, fee_denominator)?;
    let net_out = gross_out.checked_sub(fee).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "trade fee {fee_numerator}/{fee_denominator} exceeds the whole output"
        ))
    })?;

    Ok(SwapQuote {
        amount_in,
        reserve_in,
        reserve_out,
        invariant,
        new_reserve_in,
        new_reserve_out,
        gross_out: gross_out as u64,
        fee:       fee as u64,
        net_out:   net_out as u64,
    })
}

fn trade_fee(amount: u128, numerator: u64, denominator: u64) -> Result<u128> {
    if numerator == 0 || amount == 0 {
        return Ok(0);
    }
    if denominator == 0 {
        return Err(Error::InvalidArgument("trade fee denominator is zero".into()));
    }
    amount
        .checked_mul(numerator as u128)
        .map(|scaled| scaled / denominator as u128)
        .ok_or(Error::MathOverflow)
}

// ─── Basket routing ───────────────────────────────────────────────────────────

/// Base-asset amount routed into one asset's pool.
///
/// `weight` is the stored weight in tenths of a percent (`200` = 20.0%). The
/// contribution is divided by the weight *as a percentage*: a 20% weight
/// routes `base_amount / 20`, not `base_amount × 0.2`. This matches the
/// deployed invest flow and is kept as is; the result is floored to whole
/// base units since that is what the swap instruction carries.
pub fn from_amount_for_weight(base_amount: u64, weight: u32) -> Result<u64> {
    if weight == 0 {
        return Err(Error::CallerContractViolation("asset weight is zero".into()));
    }
    let routed = base_amount as u128 * WEIGHT_SCALE as u128 / weight as u128;
    u64::try_from(routed).map_err(|_| Error::MathOverflow)
}

// ─── Share request ────────────────────────────────────────────────────────────

/// Exact, unfloored share count `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareFraction {
    pub numerator:   U256,
    pub denominator: u128,
}

impl ShareFraction {
    /// `None` for a zero denominator.
    pub fn floor(&self) -> Option<U256> {
        self.numerator.checked_div(U256::from(self.denominator))
    }

    fn to_ratio(self) -> BigRational {
        let mut bytes = [0u8; 32];
        self.numerator.to_little_endian(&mut bytes);
        BigRational::new(BigInt::from_bytes_le(Sign::Plus, &bytes), BigInt::from(self.denominator))
    }
}

/// Fund tokens one asset's swap output pays for.
///
/// With `adjusted = net_out × (1 − slippage)` left unrounded, the request is
/// `(total_supply × (adjusted − 1) + 1) / vault_balance`. Scaled by 10_000 bp
/// that is
///
/// ```text
/// numerator   = total_supply × (net_out × (10_000 − bps) − 10_000) + 10_000
/// denominator = vault_balance × 10_000
/// ```
///
/// kept as an exact fraction; flooring happens once, on the sum.
pub fn pool_tokens_requested(
    total_supply:  u64,
    net_out:       u64,
    slippage:      Slippage,
    vault_balance: u64,
) -> Result<ShareFraction> {
    if vault_balance == 0 {
        return Err(Error::NoLiquidity);
    }
    let scale = U256::from(BPS_DENOMINATOR);
    let adjusted = U256::from(net_out)
        .checked_mul(U256::from(slippage_factor(SlippageDirection::Down, slippage)?))
        .ok_or(Error::MathOverflow)?;
    let less_one = adjusted
        .checked_sub(scale)
        .ok_or_else(|| Error::InvalidArgument("share request for less than one unit".into()))?;
    let numerator = U256::from(total_supply)
        .checked_mul(less_one)
        .and_then(|n| n.checked_add(scale))
        .ok_or(Error::MathOverflow)?;
    Ok(ShareFraction {
        numerator,
        denominator: vault_balance as u128 * BPS_DENOMINATOR as u128,
    })
}

/// `⌊Σ fractions⌋`, computed exactly for any number of assets.
pub fn sum_shares_floor<'a, I>(fractions: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a ShareFraction>,
{
    let mut total = BigRational::zero();
    for f in fractions {
        if f.denominator == 0 {
            return Err(Error::InvalidArgument("share fraction with a zero denominator".into()));
        }
        total += f.to_ratio();
    }
    total.floor().to_integer().to_u64().ok_or(Error::MathOverflow)
}

// ─── Invest plan ──────────────────────────────────────────────────────────────

/// A constant-product pool plus its reserve balances.
///
/// Reserves are `None` until the account fetcher has filled them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPool {
    pub address:   Pubkey,
    /// PDA of the swap program that signs for the pool's reserves.
    pub authority: Pubkey,
    pub swap:      TokenSwapState,
    pub reserve_a: Option<u64>,
    pub reserve_b: Option<u64>,
}

impl LiquidityPool {
    pub fn trades(&self, mint: &Pubkey) -> bool {
        self.swap.mint_a == *mint || self.swap.mint_b == *mint
    }

    /// A pool is reversed for an asset when the asset is its A side: the
    /// base asset then enters through B and the asset leaves through A.
    pub fn is_reversed_for(&self, asset_mint: &Pubkey) -> bool {
        self.swap.mint_a == *asset_mint
    }
}

/// Fund state plus the balances the planner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundSnapshot {
    pub address:           Pubkey,
    pub state:             FundState,
    /// Supply of the fund's own share token.
    pub pool_token_supply: Option<u64>,
    /// Balance of each fund vault, in asset order.
    pub vault_balances:    Vec<Option<u64>>,
}

/// The swap and share request planned for one fund asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSwap {
    pub asset:                 AssetInfo,
    pub weight:                u32,
    pub pool:                  Pubkey,
    pub reversed:              bool,
    pub quote:                 SwapQuote,
    /// `quote.net_out` after the slippage allowance, floored; the swap's minimum out.
    pub min_amount_out:        u64,
    pub vault_balance:         u64,
    pub pool_tokens_requested: ShareFraction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentPlan {
    pub base_amount:                 u64,
    pub slippage:                    Slippage,
    pub pool_token_supply:           u64,
    pub swaps:                       Vec<AssetSwap>,
    /// Floored sum of every asset's share request; the execute amount.
    pub total_pool_tokens_requested: u64,
}

/// Plan an investment of `base_amount` into the fund's basket.
///
/// Each asset is planned independently from immutable inputs; the only
/// cross-asset step is the final exact sum.
pub fn compute_investment_plan(
    base_amount: u64,
    fund:        &FundSnapshot,
    pools:       &[LiquidityPool],
    slippage:    Slippage,
) -> Result<InvestmentPlan> {
    let basket = fund.state.basket()?;
    if fund.vault_balances.len() != basket.len() {
        return Err(Error::CallerContractViolation(format!(
            "{} vault balances supplied for {} assets",
            fund.vault_balances.len(),
            basket.len()
        )));
    }
    let supply = fund.pool_token_supply.ok_or_else(|| {
        Error::MissingVaultData(format!("supply of fund token {}", fund.state.pool.pool_token_mint))
    })?;

    let swaps = basket
        .iter()
        .zip(&fund.vault_balances)
        .map(|((asset, weight), balance)| {
            plan_asset(base_amount, asset, *weight, *balance, supply, pools, slippage)
        })
        .collect::<Result<Vec<_>>>()?;

    let total = sum_shares_floor(swaps.iter().map(|s| &s.pool_tokens_requested))?;

    Ok(InvestmentPlan {
        base_amount,
        slippage,
        pool_token_supply: supply,
        swaps,
        total_pool_tokens_requested: total,
    })
}

fn plan_asset(
    base_amount:   u64,
    asset:         &AssetInfo,
    weight:        u32,
    vault_balance: Option<u64>,
    supply:        u64,
    pools:         &[LiquidityPool],
    slippage:      Slippage,
) -> Result<AssetSwap> {
    let vault_balance = vault_balance
        .ok_or_else(|| Error::MissingVaultData(format!("balance of fund vault {}", asset.vault_address)))?;

    let pool = pools
        .iter()
        .find(|p| p.trades(&asset.mint))
        .ok_or(Error::MissingPoolForAsset(asset.mint))?;
    let (reserve_a, reserve_b) = match (pool.reserve_a, pool.reserve_b) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(Error::MissingVaultData(format!("reserves of pool {}", pool.address))),
    };

    let reversed = pool.is_reversed_for(&asset.mint);
    let (reserve_in, reserve_out) = if reversed { (reserve_b, reserve_a) } else { (reserve_a, reserve_b) };

    let from_amount = from_amount_for_weight(base_amount, weight)?;
    let quote = quote_swap(
        from_amount,
        reserve_in,
        reserve_out,
        pool.swap.trade_fee_numerator,
        pool.swap.trade_fee_denominator,
    )?;
    let min_amount_out = adjust_for_slippage(quote.net_out, SlippageDirection::Down, slippage)?;
    if min_amount_out == 0 {
        return Err(Error::ZeroAmount(asset.mint));
    }

    Ok(AssetSwap {
        asset: *asset,
        weight,
        pool: pool.address,
        reversed,
        quote,
        min_amount_out,
        vault_balance,
        pool_tokens_requested: pool_tokens_requested(supply, quote.net_out, slippage, vault_balance)?,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FundSubState, OptionalPubkey, PoolState, PoolStateTag};

    #[test]
    fn constant_product_quote_matches_hand_computation() {
        let q = quote_swap(10_000, 1_000_000, 500_000, 3, 1_000).unwrap();
        assert_eq!(q.invariant, 500_000_000_000);
        assert_eq!(q.new_reserve_in, 1_010_000);
        assert_eq!(q.new_reserve_out, 495_049);
        assert_eq!(q.gross_out, 4_951);
        assert_eq!(q.fee, 14);
        assert_eq!(q.net_out, 4_937);
    }

    #[test]
    fn quote_does_not_truncate_large_reserves() {
        let q = quote_swap(1, u64::MAX, u64::MAX, 0, 0).unwrap();
        assert_eq!(q.invariant, u64::MAX as u128 * u64::MAX as u128);
        assert_eq!(q.fee, 0);
    }

    #[test]
    fn quote_rejects_empty_pool() {
        assert!(matches!(quote_swap(10, 0, 5, 0, 1), Err(Error::NoLiquidity)));
    }

    #[test]
    fn zero_slippage_keeps_amount() {
        assert_eq!(adjust_for_slippage(4_937, SlippageDirection::Down, Slippage::ZERO).unwrap(), 4_937);
        assert_eq!(adjust_for_slippage(4_937, SlippageDirection::Up, Slippage::ZERO).unwrap(), 4_937);
    }

    #[test]
    fn full_slippage_down_is_zero() {
        let all = Slippage::from_percent(100);
        assert_eq!(adjust_for_slippage(4_937, SlippageDirection::Down, all).unwrap(), 0);
    }

    #[test]
    fn slippage_moves_both_ways() {
        let one_pct = Slippage::from_percent(1);
        assert_eq!(adjust_for_slippage(10_000, SlippageDirection::Down, one_pct).unwrap(), 9_900);
        assert_eq!(adjust_for_slippage(10_000, SlippageDirection::Up, one_pct).unwrap(), 10_100);
        // default 0.1%, floored
        assert_eq!(adjust_for_slippage(9_775, SlippageDirection::Down, Slippage::DEFAULT).unwrap(), 9_765);
        assert!(matches!(
            adjust_for_slippage(1, SlippageDirection::Down, Slippage::from_percent(101)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn weight_divides_contribution_as_percentage() {
        // 20.0% weight routes a twentieth of the contribution, not a fifth.
        assert_eq!(from_amount_for_weight(1_000, 200).unwrap(), 50);
        assert_eq!(from_amount_for_weight(1_000_000, 500).unwrap(), 20_000);
        assert_eq!(from_amount_for_weight(7, 300).unwrap(), 0);
        assert!(matches!(from_amount_for_weight(1, 0), Err(Error::CallerContractViolation(_))));
    }

    #[test]
    fn share_sum_floors_once_after_adding() {
        // 2003/4 = 500.75 and 2003/6 = 333.833…; sum 834.583…
        let a = pool_tokens_requested(1_001, 3, Slippage::ZERO, 4).unwrap();
        let b = pool_tokens_requested(1_001, 3, Slippage::ZERO, 6).unwrap();
        assert_eq!(a, ShareFraction { numerator: U256::from(20_030_000u64), denominator: 40_000 });
        assert_eq!(a.floor().unwrap() + b.floor().unwrap(), U256::from(833u64));
        assert_eq!(sum_shares_floor([&a, &b]).unwrap(), 834);
    }

    #[test]
    fn share_request_uses_unrounded_slippage_amount() {
        // 9_775 × 0.999 = 9_765.225; (1e6 × 9_764.225 + 1) / 50_000 = 195_284.50002
        let share = pool_tokens_requested(1_000_000, 9_775, Slippage::DEFAULT, 50_000).unwrap();
        assert_eq!(share.numerator, U256::from(97_642_250_010_000u64));
        assert_eq!(share.denominator, 500_000_000);
        assert_eq!(share.floor().unwrap(), U256::from(195_284u64));
    }

    #[test]
    fn share_request_below_one_unit_is_rejected() {
        // 1 × 0.999 < 1
        assert!(matches!(
            pool_tokens_requested(1, 1, Slippage::DEFAULT, 5),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn share_sum_is_exact_for_ten_large_vaults() {
        let parts: Vec<ShareFraction> = (0..10u64)
            .map(|i| {
                let vault = 1_000_000_000_000_037 + i * 7_919_003;
                pool_tokens_requested(1_000_000_000_000_000, 1_000_000_000_000, Slippage::ZERO, vault).unwrap()
            })
            .collect();
        let floors = parts.iter().fold(U256::zero(), |acc, p| acc + p.floor().unwrap());
        assert_eq!(floors, U256::from(9_999_999_643_625u64));
        assert_eq!(sum_shares_floor(&parts).unwrap(), 9_999_999_643_634);
    }

    #[test]
    fn share_sum_is_exact_for_a_full_basket() {
        let parts: Vec<ShareFraction> = (0..255u64)
            .map(|i| {
                pool_tokens_requested(u64::MAX / 4, u64::MAX / 1_000, Slippage::from_bps(25), u64::MAX - 2 * i)
                    .unwrap()
            })
            .collect();
        assert_eq!(sum_shares_floor(&parts).unwrap(), 1_173_039_984_862_236_368);
    }

    #[test]
    fn share_sum_overflowing_u64_is_reported() {
        let huge = pool_tokens_requested(u64::MAX, u64::MAX, Slippage::ZERO, 1).unwrap();
        assert!(matches!(sum_shares_floor([&huge]), Err(Error::MathOverflow)));
    }

    #[test]
    fn share_sum_rejects_zero_denominator() {
        let broken = ShareFraction { numerator: U256::one(), denominator: 0 };
        assert_eq!(broken.floor(), None);
        assert!(matches!(sum_shares_floor([&broken]), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn share_request_needs_vault_balance() {
        assert!(matches!(pool_tokens_requested(1, 2, Slippage::ZERO, 0), Err(Error::NoLiquidity)));
    }

    // ── Plan ──────────────────────────────────────────────────────────────────

    struct Fixture {
        base:  Pubkey,
        fund:  FundSnapshot,
        pools: Vec<LiquidityPool>,
    }

    fn swap_state(mint_a: Pubkey, mint_b: Pubkey) -> TokenSwapState {
        TokenSwapState {
            bump_seed:                      255,
            token_program_id:               Pubkey::new_unique(),
            token_account_a:                Pubkey::new_unique(),
            token_account_b:                Pubkey::new_unique(),
            pool_mint:                      Pubkey::new_unique(),
            mint_a,
            mint_b,
            fee_account:                    Pubkey::new_unique(),
            trade_fee_numerator:            3,
            trade_fee_denominator:          1_000,
            owner_trade_fee_numerator:      0,
            owner_trade_fee_denominator:    0,
            owner_withdraw_fee_numerator:   0,
            owner_withdraw_fee_denominator: 0,
            host_fee_numerator:             0,
            host_fee_denominator:           0,
            curve_type:                     0,
        }
    }

    fn fixture() -> Fixture {
        let base = Pubkey::new_unique();
        let x = AssetInfo { mint: Pubkey::new_unique(), vault_address: Pubkey::new_unique() };
        let y = AssetInfo { mint: Pubkey::new_unique(), vault_address: Pubkey::new_unique() };
        let state = FundState {
            pool: PoolState {
                tag:                   PoolStateTag,
                pool_token_mint:       Pubkey::new_unique(),
                assets:                vec![x, y],
                vault_signer:          Pubkey::new_unique(),
                vault_signer_nonce:    255,
                account_params:        vec![],
                name:                  "Pair".into(),
                lqd_fee_vault:         Pubkey::new_unique(),
                initializer_fee_vault: Pubkey::new_unique(),
                fee_rate:              0,
                admin_key:             OptionalPubkey(None),
                custom_state:          vec![],
            },
            sub_state: FundSubState {
                paused:           false,
                slippage_divider: 100,
                asset_weights:    vec![500, 500],
                basic_asset:      AssetInfo { mint: base, vault_address: Pubkey::new_unique() },
            },
        };
        // X trades base→X with base on side A; Y is listed the other way round.
        let pool_x = LiquidityPool {
            address:   Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            swap:      swap_state(base, x.mint),
            reserve_a: Some(1_000_000),
            reserve_b: Some(500_000),
        };
        let pool_y = LiquidityPool {
            address:   Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            swap:      swap_state(y.mint, base),
            reserve_a: Some(2_000_000),
            reserve_b: Some(4_000_000),
        };
        Fixture {
            base,
            fund: FundSnapshot {
                address:           Pubkey::new_unique(),
                state,
                pool_token_supply: Some(1_000_000),
                vault_balances:    vec![Some(50_000), Some(100_000)],
            },
            pools: vec![pool_x, pool_y],
        }
    }

    #[test]
    fn plan_routes_each_asset_through_its_pool() {
        let f = fixture();
        let plan = compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT).unwrap();
        assert_ne!(f.base, plan.swaps[0].asset.mint);

        let x = &plan.swaps[0];
        assert!(!x.reversed);
        assert_eq!(x.quote.amount_in, 20_000);
        assert_eq!((x.quote.reserve_in, x.quote.reserve_out), (1_000_000, 500_000));
        assert_eq!(x.quote.gross_out, 9_804);
        assert_eq!(x.quote.fee, 29);
        assert_eq!(x.quote.net_out, 9_775);
        assert_eq!(x.min_amount_out, 9_765);
        assert_eq!(x.pool_tokens_requested.numerator, U256::from(97_642_250_010_000u64));

        let y = &plan.swaps[1];
        assert!(y.reversed);
        assert_eq!((y.quote.reserve_in, y.quote.reserve_out), (4_000_000, 2_000_000));
        assert_eq!(y.quote.gross_out, 9_951);
        assert_eq!(y.quote.fee, 29);
        assert_eq!(y.quote.net_out, 9_922);
        assert_eq!(y.min_amount_out, 9_912);

        assert_eq!(y.pool_tokens_requested.numerator, U256::from(99_110_780_010_000u64));

        // 195_284.50002 + 99_110.78001; flooring the minimum outs first would give 294_390
        assert_eq!(plan.total_pool_tokens_requested, 294_395);
    }

    #[test]
    fn plan_is_pure() {
        let f = fixture();
        let first = compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT).unwrap();
        let second = compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn plan_without_pool_for_asset_fails() {
        let f = fixture();
        let missing = f.fund.state.pool.assets[1].mint;
        let err = compute_investment_plan(1_000_000, &f.fund, &f.pools[..1], Slippage::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, Error::MissingPoolForAsset(m) if m == missing));
    }

    #[test]
    fn plan_without_fetched_balances_fails() {
        let mut f = fixture();
        f.pools[0].reserve_b = None;
        assert!(matches!(
            compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT),
            Err(Error::MissingVaultData(_))
        ));

        let mut f = fixture();
        f.fund.vault_balances[1] = None;
        assert!(matches!(
            compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT),
            Err(Error::MissingVaultData(_))
        ));

        let mut f = fixture();
        f.fund.pool_token_supply = None;
        assert!(matches!(
            compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT),
            Err(Error::MissingVaultData(_))
        ));
    }

    #[test]
    fn plan_rejects_mismatched_basket() {
        let mut f = fixture();
        f.fund.state.sub_state.asset_weights.push(100);
        assert!(matches!(
            compute_investment_plan(1_000_000, &f.fund, &f.pools, Slippage::DEFAULT),
            Err(Error::CallerContractViolation(_))
        ));
    }

    #[test]
    fn plan_with_dust_contribution_fails() {
        let f = fixture();
        assert!(matches!(
            compute_investment_plan(10, &f.fund, &f.pools, Slippage::DEFAULT),
            Err(Error::ZeroAmount(_))
        ));
    }
}
