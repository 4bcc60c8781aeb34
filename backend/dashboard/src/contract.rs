//! Interface of the deployed crowdfunding contract.
//!
//! Only the ABI is known to the dashboard; calldata is produced and results
//! are decoded through the `sol!` bindings below.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolValue};

use crate::errors::{DashboardError, Result};

sol! {
    function goal() external view returns (uint256);
    function collected() external view returns (uint256);
    function completed() external view returns (bool);
    function deadline() external view returns (uint256);
    function contributions(address donor) external view returns (uint256);

    function donate() external payable;
    function withdraw() external;
    function refund() external;

    event ContributionMade(address donor, uint256 amount);
    event GoalReached(bool success, uint256 totalRaised);
    event RefundIssued(address recipient, uint256 amount);
}

/// Encode a call into transaction input.
pub fn calldata<C: SolCall>(call: &C) -> Bytes {
    Bytes::from(call.abi_encode())
}

/// Decode the return data of a view call.
pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(data).map_err(|e| {
        DashboardError::Decode(format!("{} returned malformed data: {e}", C::SIGNATURE))
    })
}

/// Constructor parameters of a campaign deployment.
///
/// The contract takes the goal in wei and a duration in minutes; the
/// deadline is derived on-chain from the deployment block timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignParams {
    pub goal_wei: U256,
    pub duration_minutes: u64,
}

impl CampaignParams {
    /// ABI-encoded `(uint256 _goal, uint256 _deadlineInMinutes)`, ready to be
    /// appended to the contract bytecode.
    pub fn constructor_args(&self) -> Vec<u8> {
        (self.goal_wei, U256::from(self.duration_minutes)).abi_encode_params()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::utils::parse_ether;
    use alloy_sol_types::SolEvent;

    use super::*;

    #[test]
    fn view_selectors_match_abi() {
        assert_eq!(goalCall::SELECTOR, [0x40, 0x19, 0x38, 0x83]);
        assert_eq!(deadlineCall::SELECTOR, [0x29, 0xdc, 0xb0, 0xcf]);
        assert_eq!(withdrawCall::SELECTOR, [0x3c, 0xcf, 0xd6, 0x0b]);
        assert_eq!(donateCall::SELECTOR, [0xed, 0x88, 0xc6, 0x8e]);
    }

    #[test]
    fn calldata_is_bare_selector_for_no_arg_calls() {
        let data = calldata(&refundCall {});
        assert_eq!(data.as_ref(), refundCall::SELECTOR.as_slice());
    }

    #[test]
    fn decode_uint_return() {
        let raw = U256::from(42u64).abi_encode();
        let value = decode_return::<goalCall>(&raw).unwrap();
        assert_eq!(value, U256::from(42u64));
    }

    #[test]
    fn decode_rejects_short_return() {
        let err = decode_return::<collectedCall>(&[0u8; 3]).unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
    }

    #[test]
    fn event_signatures_are_distinct() {
        assert_ne!(ContributionMade::SIGNATURE_HASH, RefundIssued::SIGNATURE_HASH);
        assert_eq!(GoalReached::SIGNATURE, "GoalReached(bool,uint256)");
    }

    #[test]
    fn constructor_args_encode_goal_and_duration() {
        let params = CampaignParams {
            goal_wei: parse_ether("10").unwrap(),
            duration_minutes: 2,
        };
        let encoded = params.constructor_args();
        assert_eq!(encoded.len(), 64);
        assert_eq!(U256::from_be_slice(&encoded[..32]), parse_ether("10").unwrap());
        assert_eq!(U256::from_be_slice(&encoded[32..]), U256::from(2u64));
    }
}
