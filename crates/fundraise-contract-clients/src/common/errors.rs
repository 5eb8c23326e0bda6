//! Revert data decoding shared by the contract clients.

use alloy::{
    hex,
    primitives::{Bytes, U256},
    sol,
    sol_types::{Panic, Revert, SolError, SolInterface},
};
use std::fmt;

sol! {
    /// Custom errors raised by the OpenZeppelin base contracts a deployment
    /// may inherit from.
    #[derive(Debug)]
    interface StandardErrors {
        error ReentrancyGuardReentrantCall();
        error EnforcedPause();
        error ExpectedPause();
        error OwnableUnauthorizedAccount(address account);
        error FailedCall();
        error InsufficientBalance(uint256 balance, uint256 needed);
    }
}

/// Outcome of trying to make sense of a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRevert {
    /// `Error(string)` / `require(cond, "reason")`.
    Reason(String),
    /// `Panic(uint256)` from assert, overflow, division by zero, ...
    Panic(U256),
    /// One of [`StandardErrors`].
    Standard(String),
    /// Revert data present but not recognised.
    Unknown(Bytes),
    /// The error carried no revert data; holds the original message.
    NoRevertData(String),
}

impl fmt::Display for DecodedRevert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedRevert::Reason(reason) => write!(f, "{reason}"),
            DecodedRevert::Panic(code) => write!(f, "panic (code {code:#x})"),
            DecodedRevert::Standard(error) => write!(f, "{error}"),
            DecodedRevert::Unknown(data) => write!(f, "unrecognised revert data {data}"),
            DecodedRevert::NoRevertData(message) => write!(f, "{message}"),
        }
    }
}

impl DecodedRevert {
    pub fn has_revert_data(&self) -> bool {
        !matches!(self, DecodedRevert::NoRevertData(_))
    }
}

/// Decode raw revert bytes returned by `eth_call` / `eth_estimateGas`.
pub fn decode_revert_data(data: &[u8]) -> DecodedRevert {
    if data.is_empty() {
        return DecodedRevert::NoRevertData("execution reverted without a reason".to_string());
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return DecodedRevert::Reason(revert.reason);
    }
    if let Ok(panic) = Panic::abi_decode(data) {
        return DecodedRevert::Panic(panic.code);
    }
    if let Ok(error) = StandardErrors::StandardErrorsErrors::abi_decode(data) {
        return DecodedRevert::Standard(format!("{error:?}"));
    }
    DecodedRevert::Unknown(Bytes::copy_from_slice(data))
}

/// Best-effort decoding for any error type.
///
/// Providers embed revert data in different places (error `data` field,
/// nested JSON, plain message), so the debug rendering is scanned for hex
/// blobs that decode as a known revert. Falls back to an
/// `execution reverted: <reason>` message, then to the error text.
pub fn decode_any_error<E: fmt::Display + fmt::Debug>(e: &E) -> DecodedRevert {
    let debug = format!("{e:?}");
    for candidate in hex_candidates(&debug) {
        let Ok(bytes) = hex::decode(candidate) else {
            continue;
        };
        match decode_revert_data(&bytes) {
            DecodedRevert::Unknown(_) | DecodedRevert::NoRevertData(_) => continue,
            decoded => return decoded,
        }
    }

    let message = e.to_string();
    if let Some((_, reason)) = message.split_once("execution reverted: ") {
        let reason = reason.trim().trim_matches('"');
        if !reason.is_empty() {
            return DecodedRevert::Reason(reason.to_string());
        }
    }
    DecodedRevert::NoRevertData(message)
}

/// `0x`-prefixed hex runs long enough to hold a selector.
fn hex_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices("0x").filter_map(move |(start, _)| {
        let digits = &text[start + 2..];
        let len = digits
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(digits.len());
        (len >= 8 && len % 2 == 0).then(|| &digits[..len])
    })
}
