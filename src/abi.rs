//! Minimal contract ABI codec for the FlightSuretyApp calls and events.
//!
//! Only the types the app contract's oracle interface uses are supported:
//! unsigned integers up to 128 bits, addresses, strings and fixed arrays of
//! `uint8`. Selectors and topics are the keccak-256 prefixes of the
//! canonical signatures.

use thiserror::Error;

use crate::models::oracle::{FlightKey, StatusRequest};
use crate::models::Address;

pub const WORD: usize = 32;

/// `REGISTRATION_FEE()`
pub const REGISTRATION_FEE_SELECTOR: [u8; 4] = [0x64, 0xb4, 0xf7, 0x51];
/// `registerOracle()`
pub const REGISTER_ORACLE_SELECTOR: [u8; 4] = [0x33, 0x9d, 0x25, 0x90];
/// `getMyIndexes()`
pub const GET_MY_INDEXES_SELECTOR: [u8; 4] = [0x5f, 0x1c, 0xc0, 0xe6];
/// `submitOracleResponse(uint8,address,string,uint256,uint8)`
pub const SUBMIT_ORACLE_RESPONSE_SELECTOR: [u8; 4] = [0xc1, 0x0f, 0x27, 0x00];
/// `OracleRequest(uint8,address,string,uint256)`
pub const ORACLE_REQUEST_TOPIC: &str =
    "0x3ed01f2c3fc24c6b329d931e35b03e390d23497d22b3f90e15b600343e93df11";

/// Number of indices the contract assigns to each oracle
pub const ORACLE_INDEX_COUNT: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes, have {actual}")]
    ShortData { needed: usize, actual: usize },
    #[error("value does not fit in {0}")]
    Overflow(&'static str),
    #[error("invalid offset {0}")]
    InvalidOffset(u128),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    String(String),
}

/// Encodes a call as selector followed by the ABI encoded arguments.
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend(encode(tokens));
    data
}

pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Address(address) => head.extend_from_slice(&address_word(address)),
            Token::String(value) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(value.len() as u128));
                tail.extend_from_slice(value.as_bytes());
                tail.resize(tail.len() + padding(value.len()), 0);
            }
        }
    }

    head.extend(tail);
    head
}

/// Calldata for `submitOracleResponse`.
pub fn encode_oracle_response(index: u8, flight: &FlightKey, status_code: u8) -> Vec<u8> {
    encode_call(
        SUBMIT_ORACLE_RESPONSE_SELECTOR,
        &[
            Token::Uint(index.into()),
            Token::Address(flight.airline),
            Token::String(flight.flight.clone()),
            Token::Uint(flight.timestamp.into()),
            Token::Uint(status_code.into()),
        ],
    )
}

/// Decodes the return data of `getMyIndexes()`, a `uint8[3]`.
pub fn decode_indices(data: &[u8]) -> Result<Vec<u8>, AbiError> {
    let decoder = Decoder::new(data);
    (0..ORACLE_INDEX_COUNT).map(|i| decoder.u8(i)).collect()
}

/// Decodes the data section of an `OracleRequest` log. None of the event's
/// parameters are indexed.
pub fn decode_oracle_request(data: &[u8], block_number: Option<u64>) -> Result<StatusRequest, AbiError> {
    let decoder = Decoder::new(data);
    Ok(StatusRequest {
        index: decoder.u8(0)?,
        flight: FlightKey {
            airline: decoder.address(1)?,
            flight: decoder.string(2)?,
            timestamp: decoder.u64(3)?,
        },
        block_number,
    })
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(value: &str) -> Result<Vec<u8>, AbiError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(digits)?)
}

/// Reads head words and dynamic tails out of ABI encoded data.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(WORD).ok_or(AbiError::InvalidOffset(offset as u128))?;
        self.data.get(offset..end).ok_or(AbiError::ShortData {
            needed: end,
            actual: self.data.len(),
        })
    }

    fn uint_at(&self, offset: usize) -> Result<u128, AbiError> {
        let word = self.word_at(offset)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow("u128"));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    pub fn uint(&self, index: usize) -> Result<u128, AbiError> {
        self.uint_at(index * WORD)
    }

    pub fn u64(&self, index: usize) -> Result<u64, AbiError> {
        u64::try_from(self.uint(index)?).map_err(|_| AbiError::Overflow("u64"))
    }

    pub fn u8(&self, index: usize) -> Result<u8, AbiError> {
        u8::try_from(self.uint(index)?).map_err(|_| AbiError::Overflow("u8"))
    }

    pub fn address(&self, index: usize) -> Result<Address, AbiError> {
        let word = self.word_at(index * WORD)?;
        if word[..WORD - Address::LEN].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow("address"));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[WORD - Address::LEN..]);
        Ok(Address::from_bytes(bytes))
    }

    pub fn string(&self, index: usize) -> Result<String, AbiError> {
        let offset = self.uint(index)?;
        let start = usize::try_from(offset).map_err(|_| AbiError::InvalidOffset(offset))?;
        let len = self.uint_at(start)?;
        let len = usize::try_from(len).map_err(|_| AbiError::InvalidOffset(len))?;

        let begin = start + WORD;
        let end = begin
            .checked_add(len)
            .ok_or(AbiError::InvalidOffset(offset))?;
        let bytes = self.data.get(begin..end).ok_or(AbiError::ShortData {
            needed: end,
            actual: self.data.len(),
        })?;

        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - Address::LEN..].copy_from_slice(address.as_bytes());
    word
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}
