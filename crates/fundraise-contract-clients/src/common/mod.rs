pub mod errors;
pub mod event_helper;
pub(crate) mod tx_submitter;

/// Percentage added on top of the node's gas estimate.
pub const GAS_BUFFER_PERCENT: u64 = 10;

/// Confirmations awaited before a transaction counts as final.
pub const REQUIRED_CONFIRMATIONS: u64 = 1;

/// Gas limit to submit with: the estimate plus [`GAS_BUFFER_PERCENT`].
pub fn gas_with_buffer(estimated_gas: u64) -> u64 {
    let buffered = u128::from(estimated_gas) * u128::from(100 + GAS_BUFFER_PERCENT) / 100;
    u64::try_from(buffered).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_buffer_adds_ten_percent() {
        assert_eq!(gas_with_buffer(100_000), 110_000);
        assert_eq!(gas_with_buffer(21_000), 23_100);
    }

    #[test]
    fn test_gas_buffer_rounds_down() {
        assert_eq!(gas_with_buffer(15), 16);
        assert_eq!(gas_with_buffer(0), 0);
    }

    #[test]
    fn test_gas_buffer_saturates() {
        assert_eq!(gas_with_buffer(u64::MAX), u64::MAX);
    }
}
