//! Interop message extraction
//!
//! Locates L2 -> L1 logs of interest in a receipt, recovers the message
//! payload from the raw event logs, and classifies the message for the
//! status view. Classification is best-effort: every decode failure degrades
//! to `(Unknown, "0")`.

use alloy::primitives::{keccak256, Address, Bytes, U256};
use alloy::primitives::utils::format_ether;
use alloy::sol_types::{SolCall, SolType};

use crate::contracts::{depositCall, withdrawCall, InteropMessage, L1_MESSENGER_ADDRESS};
use crate::gateway::{CrossChainLog, RawLog, SourceReceipt};
use crate::types::Action;

/// Raw logs at or below this data length cannot hold an ABI `bytes` payload
/// (offset word + length word)
pub const MIN_PAYLOAD_LOG_LEN: usize = 64;

/// Lowercase hex of `address` without the `0x` prefix, the form embedded in
/// padded key fields
pub fn address_needle(address: &Address) -> String {
    hex::encode(address.as_slice())
}

/// Whether the log's key field embeds `needle`
pub fn key_references(log: &CrossChainLog, needle: &str) -> bool {
    hex::encode(log.key.as_slice()).contains(needle)
}

/// Whether the log's sender or key field embeds `needle`
pub fn log_references(log: &CrossChainLog, needle: &str) -> bool {
    hex::encode(log.sender.as_slice()).contains(needle) || key_references(log, needle)
}

/// First L2 -> L1 log (with its position) whose key embeds `address`
pub fn find_log_by_key<'a>(
    receipt: &'a SourceReceipt,
    address: &Address,
) -> Option<(u64, &'a CrossChainLog)> {
    let needle = address_needle(address);
    receipt
        .l2_to_l1_logs
        .iter()
        .enumerate()
        .find(|(_, log)| key_references(log, &needle))
        .map(|(index, log)| (index as u64, log))
}

/// Whether any L2 -> L1 log references `address` in sender or key
pub fn any_log_references(receipt: &SourceReceipt, address: &Address) -> bool {
    let needle = address_needle(address);
    receipt
        .l2_to_l1_logs
        .iter()
        .any(|log| log_references(log, &needle))
}

/// L2 sender to report on L1: logs relayed by the messenger carry the real
/// sender in the low 20 bytes of their key
pub fn resolve_sender(log: &CrossChainLog) -> Address {
    if log.sender == L1_MESSENGER_ADDRESS {
        Address::from_slice(&log.key[12..])
    } else {
        log.sender
    }
}

/// Position of the transaction within its L1 batch, as the handler expects it
pub fn tx_number_in_batch(log: &CrossChainLog) -> u16 {
    log.tx_index_in_l1_batch
        .and_then(|index| u16::try_from(index.to::<u64>()).ok())
        .unwrap_or_default()
}

/// Decode the ABI `bytes` value carried in an event's data
pub fn decode_log_bytes(data: &[u8]) -> Option<Bytes> {
    let word = |at: usize| -> Option<usize> {
        let slice = data.get(at..at.checked_add(32)?)?;
        usize::try_from(U256::from_be_slice(slice)).ok()
    };
    let offset = word(0)?;
    let len = word(offset)?;
    let start = offset.checked_add(32)?;
    data.get(start..start.checked_add(len)?)
        .map(Bytes::copy_from_slice)
}

/// Find the message payload for `log` among the receipt's raw logs.
///
/// Prefers the candidate whose payload hashes to the log's value; otherwise
/// falls back to the first candidate emitted by `preferred_emitter`, then to
/// the first candidate at all.
pub fn locate_payload(
    receipt: &SourceReceipt,
    log: &CrossChainLog,
    preferred_emitter: &Address,
) -> Option<Bytes> {
    let candidates: Vec<&RawLog> = receipt
        .logs
        .iter()
        .filter(|raw| raw.data.len() > MIN_PAYLOAD_LOG_LEN)
        .collect();

    let by_hash = candidates.iter().find_map(|raw| {
        decode_log_bytes(&raw.data).filter(|payload| keccak256(payload) == log.value)
    });
    if by_hash.is_some() {
        return by_hash;
    }

    let fallback = candidates
        .iter()
        .find(|raw| raw.address == *preferred_emitter)
        .or_else(|| candidates.first())?;
    decode_log_bytes(&fallback.data)
}

/// Human-readable decimal amount in whole units (18 decimals), trailing
/// zeros trimmed
pub fn human_amount(value: U256) -> String {
    let formatted = format_ether(value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Classify the receipt's interop message as `(action, amount)`
pub fn extract_metadata(receipt: &SourceReceipt, interop_center: &Address) -> (Action, String) {
    let unknown = || (Action::Unknown, "0".to_string());

    if receipt.l2_to_l1_logs.is_empty() {
        return unknown();
    }
    let Some((_, log)) = find_log_by_key(receipt, interop_center) else {
        return unknown();
    };
    let Some(payload) = locate_payload(receipt, log, interop_center) else {
        return unknown();
    };
    classify_payload(&payload).unwrap_or_else(unknown)
}

/// Decode `(caller, calls[])` and classify the first call
pub fn classify_payload(payload: &[u8]) -> Option<(Action, String)> {
    let message = <InteropMessage as SolType>::abi_decode_params(payload, true).ok()?;
    let first = message.calls.first()?;

    decode_deposit(&first.data, first.value).or_else(|| decode_withdrawal(&first.data))
}

fn decode_deposit(data: &[u8], value: U256) -> Option<(Action, String)> {
    depositCall::abi_decode(data, true).ok()?;
    Some((Action::Deposit, human_amount(value)))
}

fn decode_withdrawal(data: &[u8]) -> Option<(Action, String)> {
    let call = withdrawCall::abi_decode(data, true).ok()?;
    Some((Action::Withdrawal, human_amount(call.amount)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::contracts::InteropCall;
    use alloy::primitives::{B256, U64};
    use alloy::sol_types::SolValue;

    pub fn interop_center() -> Address {
        Address::repeat_byte(0xaa)
    }

    /// ABI encoding of `bytes` as an event data field
    pub fn event_data(payload: &[u8]) -> Bytes {
        Bytes::from(Bytes::copy_from_slice(payload).abi_encode())
    }

    pub fn padded_key(address: &Address) -> B256 {
        let mut key = [0u8; 32];
        key[12..].copy_from_slice(address.as_slice());
        B256::from(key)
    }

    pub fn message_payload(call_data: Vec<u8>, value: U256) -> Bytes {
        let message = InteropMessage {
            caller: Address::repeat_byte(0x01),
            calls: vec![InteropCall {
                target: Address::repeat_byte(0x02),
                value,
                data: Bytes::from(call_data),
            }],
        };
        Bytes::from(<InteropMessage as SolType>::abi_encode_params(&message))
    }

    pub fn receipt_with_message(payload: &Bytes) -> SourceReceipt {
        SourceReceipt {
            transaction_hash: B256::repeat_byte(0x10),
            status: Some(U64::from(1)),
            l1_batch_number: Some(U64::from(9)),
            logs: vec![RawLog {
                address: L1_MESSENGER_ADDRESS,
                topics: vec![],
                data: event_data(payload),
                log_index: Some(U64::from(0)),
            }],
            l2_to_l1_logs: vec![CrossChainLog {
                sender: L1_MESSENGER_ADDRESS,
                key: padded_key(&interop_center()),
                value: keccak256(payload),
                tx_index_in_l1_batch: Some(U64::from(3)),
            }],
        }
    }

    #[test]
    fn test_deposit_classified() {
        let call = depositCall {
            receiver: Address::repeat_byte(0x05),
        };
        let payload = message_payload(call.abi_encode(), U256::from(1_500_000_000_000_000_000u128));
        let receipt = receipt_with_message(&payload);

        let (action, amount) = extract_metadata(&receipt, &interop_center());
        assert_eq!(action, Action::Deposit);
        assert_eq!(amount, "1.5");
    }

    #[test]
    fn test_withdrawal_classified() {
        let call = withdrawCall {
            amount: U256::from(2_000_000_000_000_000_000u128),
            receiver: Address::repeat_byte(0x05),
        };
        let payload = message_payload(call.abi_encode(), U256::ZERO);
        let receipt = receipt_with_message(&payload);

        let (action, amount) = extract_metadata(&receipt, &interop_center());
        assert_eq!(action, Action::Withdrawal);
        assert_eq!(amount, "2");
    }

    #[test]
    fn test_unknown_call_data() {
        let payload = message_payload(vec![0xde, 0xad, 0xbe, 0xef], U256::from(5));
        let receipt = receipt_with_message(&payload);
        assert_eq!(
            extract_metadata(&receipt, &interop_center()),
            (Action::Unknown, "0".to_string())
        );
    }

    #[test]
    fn test_no_logs_is_unknown() {
        let mut receipt = receipt_with_message(&Bytes::from(vec![1u8; 80]));
        receipt.l2_to_l1_logs.clear();
        assert_eq!(
            extract_metadata(&receipt, &interop_center()),
            (Action::Unknown, "0".to_string())
        );
    }

    #[test]
    fn test_undecodable_payload_is_unknown() {
        let receipt = receipt_with_message(&Bytes::from(vec![7u8; 100]));
        assert_eq!(
            extract_metadata(&receipt, &interop_center()),
            (Action::Unknown, "0".to_string())
        );
    }

    #[test]
    fn test_resolve_sender_through_messenger() {
        let receipt = receipt_with_message(&Bytes::from(vec![1u8; 80]));
        assert_eq!(resolve_sender(&receipt.l2_to_l1_logs[0]), interop_center());

        let direct = CrossChainLog {
            sender: Address::repeat_byte(0x33),
            key: B256::ZERO,
            value: B256::ZERO,
            tx_index_in_l1_batch: None,
        };
        assert_eq!(resolve_sender(&direct), Address::repeat_byte(0x33));
    }

    #[test]
    fn test_locate_payload_prefers_hash_match() {
        let wanted = Bytes::from(vec![9u8; 96]);
        let mut receipt = receipt_with_message(&wanted);
        receipt.logs.insert(
            0,
            RawLog {
                address: interop_center(),
                topics: vec![],
                data: event_data(&[4u8; 96]),
                log_index: None,
            },
        );

        let log = receipt.l2_to_l1_logs[0].clone();
        assert_eq!(
            locate_payload(&receipt, &log, &interop_center()),
            Some(wanted)
        );
    }

    #[test]
    fn test_locate_payload_falls_back_to_emitter() {
        let mut receipt = receipt_with_message(&Bytes::from(vec![1u8; 96]));
        receipt.l2_to_l1_logs[0].value = B256::repeat_byte(0xff);
        receipt.logs.push(RawLog {
            address: interop_center(),
            topics: vec![],
            data: event_data(&[6u8; 96]),
            log_index: None,
        });

        let log = receipt.l2_to_l1_logs[0].clone();
        assert_eq!(
            locate_payload(&receipt, &log, &interop_center()),
            Some(Bytes::from(vec![6u8; 96]))
        );
        // no emitter match: first candidate wins
        assert_eq!(
            locate_payload(&receipt, &log, &Address::repeat_byte(0x77)),
            Some(Bytes::from(vec![1u8; 96]))
        );
    }

    #[test]
    fn test_locate_payload_ignores_short_logs() {
        let mut receipt = receipt_with_message(&Bytes::new());
        receipt.logs[0].data = Bytes::from(vec![0u8; 64]);
        let log = receipt.l2_to_l1_logs[0].clone();
        assert_eq!(locate_payload(&receipt, &log, &interop_center()), None);
    }

    #[test]
    fn test_log_references_sender_or_key() {
        let needle = address_needle(&interop_center());
        let by_key = CrossChainLog {
            sender: L1_MESSENGER_ADDRESS,
            key: padded_key(&interop_center()),
            value: B256::ZERO,
            tx_index_in_l1_batch: None,
        };
        let by_sender = CrossChainLog {
            sender: interop_center(),
            key: B256::ZERO,
            value: B256::ZERO,
            tx_index_in_l1_batch: None,
        };
        assert!(log_references(&by_key, &needle));
        assert!(log_references(&by_sender, &needle));
        assert!(!key_references(&by_sender, &needle));
    }

    #[test]
    fn test_human_amount() {
        assert_eq!(human_amount(U256::ZERO), "0");
        assert_eq!(human_amount(U256::from(10u128.pow(18))), "1");
        assert_eq!(human_amount(U256::from(1u64)), "0.000000000000000001");
    }
}
