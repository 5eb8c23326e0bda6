use alloy::{
    primitives::Address,
    transports::{RpcError, TransportError},
};
use anyhow::anyhow;

use crate::common::errors::decode_any_error;
use crate::validation::ValidationError;

/// JSON-RPC error code wallets use for "user rejected the request" (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Every failure an operation can surface to the user.
///
/// Errors are reported at the call site and never retried.
#[derive(Debug, thiserror::Error)]
pub enum FundraiseError {
    /// No provider answered at the configured endpoint.
    #[error("wallet provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The account holder declined a permission or signing request.
    #[error("request rejected: {0}")]
    UserRejected(String),

    /// The configured address does not answer as a ChainFundraise contract.
    #[error(
        "unable to reach contract at {address}, check the contract address and network: {reason}"
    )]
    ContractUnreachable { address: Address, reason: String },

    /// Input rejected before anything was sent to the chain.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The chain (or the node's simulation of it) rejected the call.
    #[error("{method} reverted: {reason}")]
    TransactionReverted { method: String, reason: String },

    /// Anything else.
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl FundraiseError {
    pub fn provider_unavailable(reason: impl ToString) -> Self {
        Self::ProviderUnavailable {
            reason: reason.to_string(),
        }
    }

    pub fn reverted(method: &str, reason: impl ToString) -> Self {
        Self::TransactionReverted {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::UserRejected(_) => "user_rejected",
            Self::ContractUnreachable { .. } => "contract_unreachable",
            Self::Validation(_) => "validation",
            Self::TransactionReverted { .. } => "transaction_reverted",
            Self::Unhandled(_) => "unhandled",
        }
    }
}

pub(crate) fn is_user_rejection(code: i64, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    code == USER_REJECTED_CODE
        || message.contains("user rejected")
        || message.contains("user denied")
}

/// Classify a transport-level failure of `method`.
pub fn classify_transport_error(method: &str, error: &TransportError) -> FundraiseError {
    match error {
        RpcError::Transport(kind) => {
            FundraiseError::provider_unavailable(format!("{method}: {kind}"))
        }
        RpcError::ErrorResp(payload) if is_user_rejection(payload.code, &payload.message) => {
            FundraiseError::UserRejected(payload.message.to_string())
        }
        other => classify_message(method, other),
    }
}

/// Classify a failed contract call, simulation or submission.
pub fn classify_contract_error(
    method: &str,
    error: alloy::contract::Error,
) -> FundraiseError {
    if let alloy::contract::Error::TransportError(transport) = &error {
        return classify_transport_error(method, transport);
    }
    classify_message(method, &error)
}

/// Fallback classification from revert data or message text.
pub(crate) fn classify_message<E: std::fmt::Display + std::fmt::Debug>(
    method: &str,
    error: &E,
) -> FundraiseError {
    let decoded = decode_any_error(error);
    let message = error.to_string();
    if decoded.has_revert_data() || message.contains("revert") {
        return FundraiseError::reverted(method, decoded);
    }
    if is_user_rejection(0, &message) {
        return FundraiseError::UserRejected(message);
    }
    FundraiseError::Unhandled(anyhow!("{method} failed: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::TransportErrorKind;

    #[test]
    fn test_classify_transport_user_rejected_code() {
        let payload = ErrorPayload {
            code: USER_REJECTED_CODE,
            message: "Request rejected".into(),
            data: None,
        };
        let err: TransportError = RpcError::ErrorResp(payload);
        match classify_transport_error("eth_sendTransaction", &err) {
            FundraiseError::UserRejected(message) => assert_eq!(message, "Request rejected"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_transport_failure_is_provider_unavailable() {
        let err = TransportErrorKind::backend_gone();
        let classified = classify_transport_error("eth_chainId", &err);
        assert_eq!(classified.kind(), "provider_unavailable");
        assert!(classified.to_string().contains("eth_chainId"));
    }

    #[test]
    fn test_user_rejection_detection() {
        assert!(is_user_rejection(4001, "whatever"));
        assert!(is_user_rejection(-32000, "User denied transaction signature"));
        assert!(is_user_rejection(0, "MetaMask Tx Signature: User rejected the request."));
        assert!(!is_user_rejection(-32000, "insufficient funds for gas"));
    }

    #[test]
    fn test_classify_revert_message() {
        let err = std::io::Error::other("execution reverted: Campaign is not active");
        match classify_message("contribute", &err) {
            FundraiseError::TransactionReverted { method, reason } => {
                assert_eq!(method, "contribute");
                assert_eq!(reason, "Campaign is not active");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_user_rejection_message() {
        let err = std::io::Error::other("user rejected transaction");
        assert!(matches!(
            classify_message("withdrawFunds", &err),
            FundraiseError::UserRejected(_)
        ));
    }

    #[test]
    fn test_classify_unhandled() {
        let err = std::io::Error::other("nonce too low");
        let classified = classify_message("claimRefund", &err);
        assert_eq!(classified.kind(), "unhandled");
        assert_eq!(classified.to_string(), "claimRefund failed: nonce too low");
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err = FundraiseError::from(ValidationError::TitleTooShort);
        assert_eq!(err.to_string(), ValidationError::TitleTooShort.to_string());
        assert_eq!(err.kind(), "validation");
    }
}
