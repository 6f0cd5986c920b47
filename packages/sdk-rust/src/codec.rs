//! Fund program wire schema.
//!
//! Every type here is borsh-encoded: fields in declaration order, integers
//! little-endian, strings and vectors prefixed with a `u32` length. Nested
//! blobs (`custom_data`, `custom_state`) stay raw bytes at this level; the
//! instruction builder and the state decoder run a second pass over them
//! with their own schema.

use std::str::Utf8Error;
use std::string::FromUtf8Error;

use borsh::io::{self, ErrorKind, Read, Write};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::SchemaError;

// ─── Tags ─────────────────────────────────────────────────────────────────────

/// Declare a zero-sized tag type that encodes as a fixed `u64` and refuses
/// to decode from any other value.
macro_rules! declare_tag {
    ($(#[$meta:meta])* $name:ident, $value:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl $name {
            pub const VALUE: u64 = $value;
        }

        impl BorshSerialize for $name {
            fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
                Self::VALUE.serialize(writer)
            }
        }

        impl BorshDeserialize for $name {
            fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
                let found = u64::deserialize_reader(reader)?;
                if found != Self::VALUE {
                    return Err(schema_io_error(SchemaError::TagMismatch {
                        expected: Self::VALUE,
                        found,
                    }));
                }
                Ok(Self)
            }
        }
    };
}

declare_tag!(
    /// Leading tag of every pool-framework request (`cf c4 1c cd bd 6c 0a 22`).
    PoolRequestTag,
    0x220a_6cbd_cd1c_c4cf
);

declare_tag!(
    /// Leading tag of a persisted fund account.
    PoolStateTag,
    0x16a7_874c_7fb2_301b
);

declare_tag!(
    /// Leading tag of fund admin requests handled outside the pool framework.
    FundRequestTag,
    0x112e_a414_52f0_6767
);

// ─── Optional identity ────────────────────────────────────────────────────────

/// Optional public key in a fixed 33-byte slot.
///
/// Byte 0 is the presence flag (0 or 1); bytes 1..33 carry the key when
/// present and are zero-filled otherwise. The slot is always 33 bytes wide
/// on the wire, whether or not a key is present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionalPubkey(pub Option<Pubkey>);

impl OptionalPubkey {
    pub const LEN: usize = 33;
}

impl From<Option<Pubkey>> for OptionalPubkey {
    fn from(value: Option<Pubkey>) -> Self {
        Self(value)
    }
}

impl BorshSerialize for OptionalPubkey {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut slot = [0u8; Self::LEN];
        if let Some(key) = &self.0 {
            slot[0] = 1;
            slot[1..].copy_from_slice(key.as_ref());
        }
        writer.write_all(&slot)
    }
}

impl BorshDeserialize for OptionalPubkey {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut slot = [0u8; Self::LEN];
        reader.read_exact(&mut slot)?;
        match slot[0] {
            0 => Ok(Self(None)),
            1 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(&slot[1..]);
                Ok(Self(Some(Pubkey::new_from_array(key))))
            }
            flag => Err(schema_io_error(SchemaError::InvalidDiscriminant(format!(
                "optional pubkey presence flag {flag}"
            )))),
        }
    }
}

// ─── Fund account ─────────────────────────────────────────────────────────────

/// One fund asset: its mint and the fund vault holding it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AssetInfo {
    pub mint:          Pubkey,
    pub vault_address: Pubkey,
}

/// Auxiliary account the program expects, with its writable flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ParamDesc {
    pub address:  Pubkey,
    pub writable: bool,
}

/// Persisted fund account, as written by the pool framework.
///
/// `custom_state` is an opaque blob holding a borsh-encoded [`FundSubState`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PoolState {
    pub tag:                   PoolStateTag,
    pub pool_token_mint:       Pubkey,
    pub assets:                Vec<AssetInfo>,
    pub vault_signer:          Pubkey,
    pub vault_signer_nonce:    u8,
    pub account_params:        Vec<ParamDesc>,
    pub name:                  String,
    pub lqd_fee_vault:         Pubkey,
    pub initializer_fee_vault: Pubkey,
    pub fee_rate:              u32,
    pub admin_key:             OptionalPubkey,
    pub custom_state:          Vec<u8>,
}

/// Fund-specific state nested in [`PoolState::custom_state`].
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FundSubState {
    pub paused:           bool,
    pub slippage_divider: u64,
    /// Target weights in tenths of a percent, aligned with `PoolState::assets`.
    pub asset_weights:    Vec<u32>,
    pub basic_asset:      AssetInfo,
}

// ─── Pool requests ────────────────────────────────────────────────────────────

/// Envelope of every pool-framework instruction.
///
/// On the wire: `tag(8) index(1) payload`, where `index` is the borsh variant
/// index of [`PoolRequestInner`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PoolRequest {
    pub tag:   PoolRequestTag,
    pub inner: PoolRequestInner,
}

impl PoolRequest {
    pub fn new(inner: PoolRequestInner) -> Self {
        Self { tag: PoolRequestTag, inner }
    }

    /// The envelope discriminant written after the tag.
    pub fn index(&self) -> u8 {
        match self.inner {
            PoolRequestInner::Initialize(_) => 0,
            PoolRequestInner::GetBasket(_)  => 1,
            PoolRequestInner::Execute(_)    => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PoolRequestInner {
    /// Index 0.
    Initialize(InitializePoolRequest),
    /// Index 1. Simulates an action and reports the basket.
    GetBasket(PoolAction),
    /// Index 2.
    Execute(PoolAction),
}

/// Creation or redemption of fund tokens. The variant index is the action's
/// own sub-discriminant, independent of the envelope index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PoolAction {
    /// Index 0. Deposit the basket, receive this many fund tokens.
    Create(u64),
    /// Index 1. Burn this many fund tokens, receive the basket.
    Redeem(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializePoolRequest {
    pub vault_signer_nonce: u8,
    pub assets_length:      u8,
    pub pool_name:          String,
    pub fee_rate:           u32,
    /// Borsh-encoded [`InitializeFundData`].
    pub custom_data:        Vec<u8>,
}

/// Fund parameters carried in [`InitializePoolRequest::custom_data`].
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeFundData {
    pub slippage_divider:          u64,
    pub asset_weights:             Vec<u32>,
    pub fund_token_initial_supply: u64,
}

// ─── Fund admin requests ──────────────────────────────────────────────────────

/// Envelope of fund admin instructions. The pool framework forwards anything
/// not tagged [`PoolRequestTag`] to the fund program itself.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FundRequest {
    pub tag:   FundRequestTag,
    pub inner: FundInstruction,
}

impl FundRequest {
    pub fn new(inner: FundInstruction) -> Self {
        Self { tag: FundRequestTag, inner }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum FundInstruction {
    Pause,
    Unpause,
    Rebalance,
    ApproveDelegate { amount: u64 },
    UpdateFee { fee_rate: u32 },
    UpdateAdmin,
}

// ─── Encode / decode ──────────────────────────────────────────────────────────

/// Serialize `value` with its borsh schema.
pub fn encode<T: BorshSerialize>(value: &T) -> Result<Vec<u8>, SchemaError> {
    borsh::to_vec(value).map_err(SchemaError::from)
}

/// Decode a value that must span `bytes` exactly.
pub fn decode<T: BorshDeserialize>(bytes: &[u8]) -> Result<T, SchemaError> {
    let mut rest = bytes;
    let value = decode_prefix(&mut rest)?;
    if !rest.is_empty() {
        return Err(SchemaError::TrailingBytes(rest.len()));
    }
    Ok(value)
}

/// Decode a value from the front of `bytes`, advancing the slice past it.
pub fn decode_prefix<T: BorshDeserialize>(bytes: &mut &[u8]) -> Result<T, SchemaError> {
    T::deserialize(bytes).map_err(SchemaError::from)
}

/// Decode a pool-framework instruction payload.
pub fn decode_pool_request(bytes: &[u8]) -> Result<PoolRequest, SchemaError> {
    decode(bytes)
}

/// Decode a fund admin instruction payload.
pub fn decode_fund_request(bytes: &[u8]) -> Result<FundRequest, SchemaError> {
    decode(bytes)
}

// ─── io::Error mapping ────────────────────────────────────────────────────────

fn schema_io_error(err: SchemaError) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, err)
}

/// How a borsh message-only error maps onto [`SchemaError`].
#[derive(Clone, Copy)]
enum BorshMessage {
    Truncated,
    Discriminant,
    Utf8,
}

/// Prefixes of the errors borsh raises as bare strings.
const BORSH_MESSAGES: &[(&str, BorshMessage)] = &[
    ("Unexpected length of input", BorshMessage::Truncated),
    ("Unexpected variant tag", BorshMessage::Discriminant),
    ("Invalid bool representation", BorshMessage::Discriminant),
    ("Invalid Option representation", BorshMessage::Discriminant),
    ("Invalid Result representation", BorshMessage::Discriminant),
    ("invalid utf-8", BorshMessage::Utf8),
];

impl From<io::Error> for SchemaError {
    fn from(err: io::Error) -> Self {
        if err.kind() == ErrorKind::UnexpectedEof {
            return SchemaError::TruncatedBuffer;
        }
        let message = err.to_string();

        // Typed errors first: our own schema checks and UTF-8 failures.
        if let Some(inner) = err.into_inner() {
            let inner = match inner.downcast::<SchemaError>() {
                Ok(schema) => return *schema,
                Err(other) => other,
            };
            if let Some(utf8) = inner.downcast_ref::<FromUtf8Error>() {
                return SchemaError::Utf8(utf8.to_string());
            }
            if let Some(utf8) = inner.downcast_ref::<Utf8Error>() {
                return SchemaError::Utf8(utf8.to_string());
            }
        }

        match BORSH_MESSAGES.iter().find(|(prefix, _)| message.starts_with(prefix)) {
            Some((_, BorshMessage::Truncated)) => SchemaError::TruncatedBuffer,
            Some((_, BorshMessage::Discriminant)) => SchemaError::InvalidDiscriminant(message),
            Some((_, BorshMessage::Utf8)) => SchemaError::Utf8(message),
            None => SchemaError::Malformed(message),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE_TAG: [u8; 8] = [0xcf, 0xc4, 0x1c, 0xcd, 0xbd, 0x6c, 0x0a, 0x22];

    #[test]
    fn request_tag_is_little_endian_magic() {
        let bytes = encode(&PoolRequestTag).unwrap();
        assert_eq!(bytes, ENVELOPE_TAG);
    }

    #[test]
    fn optional_pubkey_none_is_zero_flag_and_padding() {
        let bytes = encode(&OptionalPubkey(None)).unwrap();
        assert_eq!(bytes.len(), 33);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn optional_pubkey_some_is_flag_then_key() {
        let key = Pubkey::new_unique();
        let bytes = encode(&OptionalPubkey(Some(key))).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], key.as_ref());
        assert_eq!(decode::<OptionalPubkey>(&bytes).unwrap(), OptionalPubkey(Some(key)));
    }

    #[test]
    fn optional_pubkey_ignores_padding_when_absent() {
        let mut bytes = [7u8; 33];
        bytes[0] = 0;
        assert_eq!(decode::<OptionalPubkey>(&bytes).unwrap(), OptionalPubkey(None));
    }

    #[test]
    fn optional_pubkey_rejects_unknown_flag() {
        let mut bytes = [0u8; 33];
        bytes[0] = 2;
        assert!(matches!(
            decode::<OptionalPubkey>(&bytes),
            Err(SchemaError::InvalidDiscriminant(_))
        ));
    }

    #[test]
    fn optional_pubkey_short_slot_is_truncated() {
        let bytes = [1u8; 20];
        assert_eq!(decode::<OptionalPubkey>(&bytes), Err(SchemaError::TruncatedBuffer));
    }

    #[test]
    fn execute_request_layout() {
        let request = PoolRequest::new(PoolRequestInner::Execute(PoolAction::Create(1_000)));
        let bytes = encode(&request).unwrap();

        let mut expected = ENVELOPE_TAG.to_vec();
        expected.push(2);
        expected.push(0);
        expected.extend_from_slice(&1_000u64.to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(request.index(), 2);
        assert_eq!(decode_pool_request(&bytes).unwrap(), request);
    }

    #[test]
    fn request_with_foreign_tag_is_rejected() {
        let mut bytes = encode(&PoolRequest::new(PoolRequestInner::Execute(PoolAction::Redeem(5))))
            .unwrap();
        bytes[0] ^= 0xff;
        assert!(matches!(
            decode_pool_request(&bytes),
            Err(SchemaError::TagMismatch { expected: PoolRequestTag::VALUE, .. })
        ));
    }

    #[test]
    fn unknown_envelope_index_is_invalid_discriminant() {
        let mut bytes = ENVELOPE_TAG.to_vec();
        bytes.push(9);
        bytes.extend_from_slice(&[0u8; 9]);
        assert!(matches!(
            decode_pool_request(&bytes),
            Err(SchemaError::InvalidDiscriminant(_))
        ));
    }

    #[test]
    fn truncated_amount_is_reported() {
        let bytes = encode(&PoolRequest::new(PoolRequestInner::Execute(PoolAction::Create(42))))
            .unwrap();
        assert_eq!(
            decode_pool_request(&bytes[..bytes.len() - 3]),
            Err(SchemaError::TruncatedBuffer)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected_by_strict_decode() {
        let mut bytes = encode(&InitializeFundData::default()).unwrap();
        bytes.push(0);
        assert_eq!(decode::<InitializeFundData>(&bytes), Err(SchemaError::TrailingBytes(1)));

        let mut prefix = bytes.as_slice();
        let data: InitializeFundData = decode_prefix(&mut prefix).unwrap();
        assert_eq!(data, InitializeFundData::default());
        assert_eq!(prefix, &[0u8]);
    }

    #[test]
    fn invalid_utf8_name_is_reported() {
        let request = InitializePoolRequest {
            vault_signer_nonce: 1,
            assets_length:      0,
            pool_name:          "ab".into(),
            fee_rate:           0,
            custom_data:        vec![],
        };
        let mut bytes = encode(&request).unwrap();
        // nonce(1) assets_length(1) len(4) then the two name bytes
        bytes[6] = 0xff;
        bytes[7] = 0xfe;
        assert!(matches!(
            decode::<InitializePoolRequest>(&bytes),
            Err(SchemaError::Utf8(_))
        ));
    }

    #[test]
    fn fund_request_uses_its_own_tag() {
        let request = FundRequest::new(FundInstruction::UpdateFee { fee_rate: 250 });
        let bytes = encode(&request).unwrap();
        assert_eq!(&bytes[..8], &FundRequestTag::VALUE.to_le_bytes());
        assert_eq!(bytes[8], 4);
        assert_eq!(&bytes[9..], &250u32.to_le_bytes());
        assert_eq!(decode_fund_request(&bytes).unwrap(), request);
        assert!(decode_pool_request(&bytes).is_err());
    }

    #[test]
    fn invalid_bool_is_invalid_discriminant() {
        let mut bytes = encode(&FundSubState::default()).unwrap();
        bytes[0] = 2;
        assert!(matches!(decode::<FundSubState>(&bytes), Err(SchemaError::InvalidDiscriminant(_))));
    }

    #[test]
    fn invalid_option_flag_is_invalid_discriminant() {
        assert!(matches!(decode::<Option<u8>>(&[2, 0]), Err(SchemaError::InvalidDiscriminant(_))));
    }

    #[test]
    fn io_errors_map_by_kind_before_message() {
        let eof = io::Error::new(ErrorKind::UnexpectedEof, "anything");
        assert_eq!(SchemaError::from(eof), SchemaError::TruncatedBuffer);

        let typed = schema_io_error(SchemaError::TrailingBytes(3));
        assert_eq!(SchemaError::from(typed), SchemaError::TrailingBytes(3));

        let utf8 = String::from_utf8(vec![0xff]).unwrap_err();
        let wrapped = io::Error::new(ErrorKind::InvalidData, utf8);
        assert!(matches!(SchemaError::from(wrapped), SchemaError::Utf8(_)));
    }

    #[test]
    fn borsh_messages_map_to_schema_errors() {
        let cases = [
            ("Unexpected length of input", SchemaError::TruncatedBuffer),
            ("Unexpected variant tag: 9", SchemaError::InvalidDiscriminant("Unexpected variant tag: 9".into())),
            ("Invalid bool representation: 2", SchemaError::InvalidDiscriminant("Invalid bool representation: 2".into())),
            ("invalid utf-8 sequence of 1 bytes from index 0", SchemaError::Utf8("invalid utf-8 sequence of 1 bytes from index 0".into())),
            ("Overflow on machine with 32 bit usize", SchemaError::Malformed("Overflow on machine with 32 bit usize".into())),
        ];
        for (message, expected) in cases {
            let err = io::Error::new(ErrorKind::InvalidData, message);
            assert_eq!(SchemaError::from(err), expected, "{message}");
        }
    }
}
