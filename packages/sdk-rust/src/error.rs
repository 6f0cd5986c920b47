//! SDK error type.

use solana_sdk::pubkey::Pubkey;

/// Wire-format failures raised while decoding fund program bytes.
///
/// Every variant is a schema mismatch: the bytes do not describe a value of
/// the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Fewer bytes remain than the schema requires.
    #[error("buffer truncated before the schema was satisfied")]
    TruncatedBuffer,

    /// A presence flag, bool or variant byte holds a value outside its domain.
    #[error("invalid discriminant: {0}")]
    InvalidDiscriminant(String),

    /// A length-prefixed string is not valid UTF-8.
    #[error("string is not valid UTF-8: {0}")]
    Utf8(String),

    /// A fixed 8-byte tag did not match the expected constant.
    #[error("tag mismatch: expected {expected:#018x}, found {found:#018x}")]
    TagMismatch { expected: u64, found: u64 },

    /// A strictly-sized blob had bytes left over after decoding.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    /// Any other malformation reported by the codec.
    #[error("malformed data: {0}")]
    Malformed(String),
}

/// All errors returned by the fund pool SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── RPC / network ────────────────────────────────────────────────────────
    /// A Solana JSON-RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    /// The account fetcher found no account at this address.
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),

    // ── Codec ────────────────────────────────────────────────────────────────
    #[error("Schema mismatch: {0}")]
    Schema(#[from] SchemaError),

    // ── Invest planning ──────────────────────────────────────────────────────
    /// No liquidity pool trades the given asset mint.
    #[error("No pool found for asset {0}")]
    MissingPoolForAsset(Pubkey),

    /// Reserve, vault or supply figures were not fetched before planning.
    #[error("Missing vault data: {0}")]
    MissingVaultData(String),

    /// Array lengths or values the caller supplied do not line up.
    #[error("Caller contract violation: {0}")]
    CallerContractViolation(String),

    /// A pool reserve or fund vault holds nothing, so no price exists.
    #[error("Pool has no liquidity")]
    NoLiquidity,

    /// The slippage-adjusted swap output for this asset rounds to zero.
    #[error("Swap output for asset {0} rounds to zero; increase the invested amount")]
    ZeroAmount(Pubkey),

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Integer overflow in swap / share math")]
    MathOverflow,

    // ── Account parsing ──────────────────────────────────────────────────────
    /// Raw fixed-layout account bytes could not be deserialized.
    #[error("Account parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
