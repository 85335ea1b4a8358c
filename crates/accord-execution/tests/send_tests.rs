//! Value transfer tests
//!
//! Conservation, payment errors, sequence handling and discarding of
//! rejected transactions.

mod common;

use accord_execution::{Event, ExecutionError, ExecutionParams};
use accord_primitives::Address;
use accord_storage::StateReader;
use accord_types::{Payload, PermFlag, SendTx, TxInput, TxOutput};
use common::*;

fn send(inputs: Vec<TxInput>, outputs: Vec<(Address, u64)>) -> Payload {
    SendTx {
        inputs,
        outputs: outputs
            .into_iter()
            .map(|(address, amount)| TxOutput { address, amount })
            .collect(),
    }
    .into()
}

// ==================== Conservation Tests ====================

#[test]
fn test_send_moves_value_and_emits_events() {
    let ledger = TestLedger::with_accounts([funded(1, 100), funded(2, 50)]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let tx = send(
        vec![input(addr(1), 30, 1), input(addr(2), 20, 1)],
        vec![(addr(3), 40), (addr(4), 10)],
    );
    let txe = transactor.execute(&tx).unwrap();
    assert_eq!(
        txe.events,
        vec![
            Event::Input { address: addr(1) },
            Event::Input { address: addr(2) },
            Event::Output { address: addr(3) },
            Event::Output { address: addr(4) },
        ]
    );
    assert!(!txe.is_exceptional());

    transactor.commit(ledger.writers()).unwrap();
    assert_eq!(ledger.balance(&addr(1)), 70);
    assert_eq!(ledger.balance(&addr(2)), 30);
    assert_eq!(ledger.balance(&addr(3)), 40);
    assert_eq!(ledger.balance(&addr(4)), 10);
    let total: u64 = (1..=4).map(|seed| ledger.balance(&addr(seed))).sum();
    assert_eq!(total, 150);
}

#[test]
fn test_send_to_existing_account_keeps_its_fields() {
    let ledger = TestLedger::with_accounts([funded(1, 100), funded(2, 5)]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    transactor
        .execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)]))
        .unwrap();
    transactor.commit(ledger.writers()).unwrap();

    let recipient = ledger.account(&addr(2)).unwrap();
    assert_eq!(recipient.balance, 15);
    assert_eq!(recipient.public_key, Some(key(2)));
    assert_eq!(recipient.sequence, 0);
}

// ==================== Payment Error Tests ====================

#[test]
fn test_send_overpayment() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let result = transactor.execute(&send(vec![input(addr(1), 30, 1)], vec![(addr(2), 20)]));
    assert_eq!(
        result,
        Err(ExecutionError::Overpayment {
            inputs: 30,
            outputs: 20
        })
    );
}

#[test]
fn test_send_underpayment() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let result = transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 20)]));
    assert_eq!(
        result,
        Err(ExecutionError::Underpayment {
            inputs: 10,
            outputs: 20
        })
    );
}

#[test]
fn test_send_zero_payment() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let result = transactor.execute(&send(vec![input(addr(1), 0, 1)], vec![(addr(2), 0)]));
    assert_eq!(result, Err(ExecutionError::ZeroPayment));
}

#[test]
fn test_send_insufficient_funds() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let result = transactor.execute(&send(vec![input(addr(1), 200, 1)], vec![(addr(2), 200)]));
    assert_eq!(
        result,
        Err(ExecutionError::InsufficientFunds {
            address: addr(1),
            balance: 100,
            required: 200
        })
    );
}

#[test]
fn test_send_duplicate_addresses() {
    let ledger = TestLedger::with_accounts([funded(1, 100), funded(2, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    let repeated_input = send(
        vec![input(addr(1), 10, 1), input(addr(1), 10, 1)],
        vec![(addr(3), 20)],
    );
    assert_eq!(
        transactor.execute(&repeated_input),
        Err(ExecutionError::DuplicateAddress(addr(1)))
    );

    let output_is_input = send(vec![input(addr(1), 10, 1)], vec![(addr(1), 10)]);
    assert_eq!(
        transactor.execute(&output_is_input),
        Err(ExecutionError::DuplicateAddress(addr(1)))
    );

    let repeated_output = send(vec![input(addr(1), 10, 1)], vec![(addr(2), 5), (addr(2), 5)]);
    assert_eq!(
        transactor.execute(&repeated_output),
        Err(ExecutionError::DuplicateAddress(addr(2)))
    );
}

#[test]
fn test_send_from_unknown_account() {
    let ledger = TestLedger::default();
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)])),
        Err(ExecutionError::InvalidAddress(addr(1)))
    );
}

// ==================== Permission Tests ====================

#[test]
fn test_send_requires_send_permission() {
    let ledger = TestLedger::with_accounts([granted(1, 100, PermFlag::INPUT)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)])),
        Err(ExecutionError::PermissionDenied {
            address: addr(1),
            permission: PermFlag::SEND
        })
    );
}

#[test]
fn test_send_requires_input_permission() {
    let ledger = TestLedger::with_accounts([granted(1, 100, PermFlag::SEND)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)])),
        Err(ExecutionError::PermissionDenied {
            address: addr(1),
            permission: PermFlag::INPUT
        })
    );
}

#[test]
fn test_send_output_creation_needs_create_account() {
    let ledger = TestLedger::with_accounts([
        granted(1, 100, PermFlag::SEND | PermFlag::INPUT),
        funded(2, 0),
    ]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(3), 10)])),
        Err(ExecutionError::PermissionDenied {
            address: addr(1),
            permission: PermFlag::CREATE_ACCOUNT
        })
    );

    // Existing outputs need no extra permission
    transactor
        .execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)]))
        .unwrap();
    transactor.commit(ledger.writers()).unwrap();
    assert_eq!(ledger.balance(&addr(2)), 10);
    assert!(ledger.account(&addr(3)).is_none());
}

#[test]
fn test_global_policy_stored_on_chain_wins_over_default() {
    let global = accord_types::Account::new(accord_types::GLOBAL_PERMISSIONS_ADDRESS).with_permissions(
        accord_types::AccountPermissions::granting(PermFlag::INPUT),
    );
    let ledger = TestLedger::with_accounts([global, funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)])),
        Err(ExecutionError::PermissionDenied {
            address: addr(1),
            permission: PermFlag::SEND
        })
    );
}

// ==================== Sequence Tests ====================

#[test]
fn test_sequence_advances_once_per_transaction() {
    let mut start = funded(1, 100);
    start.sequence = 7;
    let ledger = TestLedger::with_accounts([start]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    for n in 1..=3u64 {
        transactor
            .execute(&send(vec![input(addr(1), 1, 7 + n)], vec![(addr(2), 1)]))
            .unwrap();
    }
    assert_eq!(
        transactor.ledger().state.get_account(&addr(1)).unwrap().unwrap().sequence,
        10
    );

    assert_eq!(
        transactor.execute(&send(vec![input(addr(1), 1, 10)], vec![(addr(2), 1)])),
        Err(ExecutionError::InvalidSequence {
            address: addr(1),
            expected: 11,
            got: 10
        })
    );

    transactor.commit(ledger.writers()).unwrap();
    assert_eq!(ledger.sequence(&addr(1)), 10);
    assert_eq!(ledger.balance(&addr(2)), 3);
}

// ==================== Discard Tests ====================

#[test]
fn test_rejected_transaction_leaves_no_trace() {
    let ledger = TestLedger::with_accounts([funded(1, 100), granted(2, 100, PermFlag::INPUT)]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    // The first input passes its checks before the second one fails
    let tx = send(
        vec![input(addr(1), 10, 1), input(addr(2), 10, 1)],
        vec![(addr(3), 20)],
    );
    assert!(transactor.execute(&tx).is_err());

    let cached = transactor.ledger().state.get_account(&addr(1)).unwrap().unwrap();
    assert_eq!(cached.balance, 100);
    assert_eq!(cached.sequence, 0);

    transactor.commit(ledger.writers()).unwrap();
    assert_eq!(ledger.balance(&addr(1)), 100);
    assert_eq!(ledger.sequence(&addr(1)), 0);
    assert!(ledger.account(&addr(3)).is_none());
}

#[test]
fn test_discard_drops_uncommitted_block() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let mut transactor = ledger.transactor(&vm, ExecutionParams::default(), 1);

    transactor
        .execute(&send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)]))
        .unwrap();
    transactor.discard();
    transactor.commit(ledger.writers()).unwrap();

    assert_eq!(ledger.balance(&addr(1)), 100);
    assert!(ledger.account(&addr(2)).is_none());
}

#[test]
fn test_transaction_hash_recorded() {
    let ledger = TestLedger::with_accounts([funded(1, 100)]);
    let vm = MockVm::returning(&[]);
    let transactor = ledger.transactor(&vm, ExecutionParams::default(), 9);

    let tx = send(vec![input(addr(1), 10, 1)], vec![(addr(2), 10)]);
    let txe = transactor.execute(&tx).unwrap();
    assert_eq!(txe.tx_hash, tx.hash());
    assert_eq!(txe.height, 9);
    assert_eq!(txe.payload_type, accord_types::PayloadType::Send);
}
