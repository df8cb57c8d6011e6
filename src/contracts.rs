//! ABI definitions for interop messages and the L1 finalization handler
//!
//! Uses alloy's sol! macro to generate type-safe bindings.

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolError};

/// L2 system contract that relays user messages to L1. Logs it emits carry
/// the real sender in their key field.
pub const L1_MESSENGER_ADDRESS: Address = address!("0000000000000000000000000000000000008008");

/// Default L2 base-token system contract
pub const BASE_TOKEN_ADDRESS: Address = address!("000000000000000000000000000000000000800a");

sol! {
    /// One call carried by an interop message
    struct InteropCall {
        address target;
        uint256 value;
        bytes data;
    }

    /// Interop message body: `abi.encode(caller, calls)`
    struct InteropMessage {
        address caller;
        InteropCall[] calls;
    }

    /// Vault entrypoint classified as a deposit
    function deposit(address receiver) external payable;

    /// Vault entrypoint classified as a withdrawal
    function withdraw(uint256 amount, address receiver) external;
}

sol! {
    /// Parameters for finalizing an L2 -> L1 message on the handler
    struct FinalizeL1DepositParams {
        uint256 chainId;
        uint256 l2BatchNumber;
        uint256 l2MessageIndex;
        address l2Sender;
        uint16 l2TxNumberInBatch;
        bytes message;
        bytes32[] merkleProof;
    }

    /// L1 finalization handler (nullifier) interface
    contract L1Nullifier {
        /// Prove and execute an L2 -> L1 message
        function finalizeDeposit(FinalizeL1DepositParams params) external;

        /// Whether the message at (batch, index) was already finalized
        function isWithdrawalFinalized(
            uint256 chainId,
            uint256 l2BatchNumber,
            uint256 l2MessageIndex
        ) external view returns (bool);

        error WithdrawalAlreadyFinalized();
    }
}

/// Revert selector the handler returns for a message finalized twice, as the
/// lowercase hex string RPC errors embed
pub fn already_finalized_selector() -> String {
    hex::encode(L1Nullifier::WithdrawalAlreadyFinalized::SELECTOR)
}

/// Inclusion proof data needed by `finalizeDeposit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeMessage {
    pub chain_id: u64,
    pub batch_number: u64,
    pub message_index: u64,
    pub sender: Address,
    pub tx_number_in_batch: u16,
    pub message: Bytes,
    pub proof: Vec<B256>,
}

impl FinalizeMessage {
    /// ABI-encoded `finalizeDeposit` calldata
    pub fn calldata(&self) -> Bytes {
        let call = L1Nullifier::finalizeDepositCall {
            params: FinalizeL1DepositParams {
                chainId: U256::from(self.chain_id),
                l2BatchNumber: U256::from(self.batch_number),
                l2MessageIndex: U256::from(self.message_index),
                l2Sender: self.sender,
                l2TxNumberInBatch: self.tx_number_in_batch,
                message: self.message.clone(),
                merkleProof: self.proof.clone(),
            },
        };
        Bytes::from(call.abi_encode())
    }
}

/// ABI-encoded `isWithdrawalFinalized` calldata
pub fn is_withdrawal_finalized_calldata(chain_id: u64, batch_number: u64, index: u64) -> Bytes {
    let call = L1Nullifier::isWithdrawalFinalizedCall {
        chainId: U256::from(chain_id),
        l2BatchNumber: U256::from(batch_number),
        l2MessageIndex: U256::from(index),
    };
    Bytes::from(call.abi_encode())
}
