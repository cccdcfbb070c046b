//! Pool and token identifier codec.
//!
//! The contract understands a single 256-bit token id. The connector packs
//! pool identity into it as follows (most significant bit first):
//!
//! - bit 255: fungibility flag (0 = fungible, 1 = non-fungible)
//! - bits 254-128: pool sequence number (127 bits)
//! - bits 127-0: token index within a non-fungible pool (128 bits)
//!
//! The wire form everywhere is the decimal string, since the gateway carries
//! uint256 values as unbounded decimal numerals.

use primitive_types::U256;

use crate::error::{ConnectorError, Result};

/// Pool id tag for fungible pools.
pub const FUNGIBLE_TAG: char = 'F';
/// Pool id tag for non-fungible pools.
pub const NONFUNGIBLE_TAG: char = 'N';

/// Separator between the pool id, contract address, and block number inside
/// a pool locator. Not a valid character in any of those fields.
pub const POOL_LOCATOR_DELIMITER: char = '&';

const SEQUENCE_BITS: usize = 127;
const INDEX_BITS: usize = 128;

/// A parsed pool id such as `F1` or `N42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolId {
    pub is_fungible: bool,
    pub sequence: U256,
}

impl PoolId {
    /// Parse a tagged pool id (`F`/`N` followed by a decimal numeral).
    pub fn parse(pool_id: &str) -> Result<Self> {
        let mut chars = pool_id.chars();
        let is_fungible = match chars.next() {
            Some(FUNGIBLE_TAG) => true,
            Some(NONFUNGIBLE_TAG) => false,
            _ => {
                return Err(ConnectorError::InvalidIdentifier(format!(
                    "pool id '{pool_id}' must start with '{FUNGIBLE_TAG}' or '{NONFUNGIBLE_TAG}'"
                )))
            }
        };
        let sequence = parse_numeral(chars.as_str(), "pool sequence")?;
        if sequence.bits() > SEQUENCE_BITS {
            return Err(ConnectorError::InvalidIdentifier(format!(
                "pool sequence in '{pool_id}' exceeds {SEQUENCE_BITS} bits"
            )));
        }
        Ok(Self {
            is_fungible,
            sequence,
        })
    }

    fn tag(&self) -> char {
        if self.is_fungible {
            FUNGIBLE_TAG
        } else {
            NONFUNGIBLE_TAG
        }
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.tag(), self.sequence)
    }
}

/// Token id recovered from a packed 256-bit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedTokenId {
    pub is_fungible: bool,
    /// Tagged pool id, e.g. `F1`.
    pub pool_id: String,
    /// Token index; zero for fungible pools.
    pub token_index: U256,
}

/// Pack a tagged pool id and token index into the contract's token id.
///
/// `token_index` is a non-negative decimal numeral; pass `"0"` for fungible
/// pools. Returns the decimal string form of the 256-bit value.
pub fn pack_token_id(pool_id: &str, token_index: &str) -> Result<String> {
    let pool = PoolId::parse(pool_id)?;
    let index = parse_numeral(token_index, "token index")?;
    if index.bits() > INDEX_BITS {
        return Err(ConnectorError::InvalidIdentifier(format!(
            "token index '{token_index}' exceeds {INDEX_BITS} bits"
        )));
    }
    let mut id = (pool.sequence << INDEX_BITS) | index;
    if !pool.is_fungible {
        id = id | (U256::one() << 255);
    }
    Ok(id.to_string())
}

/// Unpack a 256-bit token id into its fungibility flag, tagged pool id, and
/// token index.
///
/// Total over every syntactically valid 256-bit decimal numeral: no check is
/// made that the value was produced by [`pack_token_id`], the bits are simply
/// taken apart.
pub fn unpack_token_id(token_id: &str) -> Result<UnpackedTokenId> {
    let id = parse_numeral(token_id, "token id")?;
    let is_fungible = (id >> 255).is_zero();
    let sequence = (id >> INDEX_BITS) & ((U256::one() << SEQUENCE_BITS) - 1);
    let token_index = id & ((U256::one() << INDEX_BITS) - 1);
    let pool = PoolId {
        is_fungible,
        sequence,
    };
    Ok(UnpackedTokenId {
        is_fungible,
        pool_id: pool.to_string(),
        token_index,
    })
}

/// Decoded form of a pool locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLocator {
    /// Tagged pool id, e.g. `N7`.
    pub pool_id: String,
    /// Contract address, present only for pools created against a
    /// caller-supplied external contract.
    pub address: Option<String>,
    /// Starting block number accompanying an external contract address.
    pub block_number: Option<String>,
}

/// Pack a pool id and optional external contract coordinates into the
/// platform-facing pool locator string.
pub fn pack_pool_locator(
    pool_id: &str,
    address: Option<&str>,
    block_number: Option<&str>,
) -> String {
    match (address, block_number) {
        (Some(address), Some(block_number)) => format!(
            "{pool_id}{POOL_LOCATOR_DELIMITER}{address}{POOL_LOCATOR_DELIMITER}{block_number}"
        ),
        _ => pool_id.to_string(),
    }
}

/// Unpack a pool locator. Fields absent in the input come back as `None`,
/// never as an empty string.
pub fn unpack_pool_locator(locator: &str) -> PoolLocator {
    let mut parts = locator.split(POOL_LOCATOR_DELIMITER);
    let pool_id = parts.next().unwrap_or_default().to_string();
    let address = parts.next().filter(|s| !s.is_empty()).map(Into::into);
    let block_number = parts.next().filter(|s| !s.is_empty()).map(Into::into);
    PoolLocator {
        pool_id,
        address,
        block_number,
    }
}

fn parse_numeral(value: &str, what: &str) -> Result<U256> {
    U256::from_dec_str(value).map_err(|_| {
        ConnectorError::InvalidIdentifier(format!(
            "{what} '{value}' is not a non-negative 256-bit decimal numeral"
        ))
    })
}
