//! 构建场景测试：固定手续费、余额不足、未知链

mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use common::*;
use txcore::{
    domain::{registry::ParameterRegistry, BuildRequestSpec, BuiltTransaction, PaymentOutput},
    error::{BuildError, RegistryError},
    service::{two_slot, FeePolicy, SelectionPolicy, TransactionCallback, TransactionResult},
};

#[derive(Default)]
struct SlotRecorder {
    calls: AtomicUsize,
    transaction: Mutex<Option<BuiltTransaction>>,
    error: Mutex<Option<BuildError>>,
}

impl TransactionCallback for SlotRecorder {
    fn on_callback(&self, transaction: Option<&BuiltTransaction>, error: Option<&BuildError>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.transaction.lock().unwrap() = transaction.cloned();
        *self.error.lock().unwrap() = error.cloned();
    }
}

#[tokio::test]
async fn test_fixed_fee_build_delivers_transaction_only() {
    let runner = runner(2);
    let recorder = Arc::new(SlotRecorder::default());
    let request = fixed_fee_request(&[100_000], 50_000, 1000);

    let handle = runner.submit(request, two_slot(recorder.clone()));
    let result = handle.wait().await;

    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    assert!(recorder.error.lock().unwrap().is_none());
    let tx = recorder.transaction.lock().unwrap().clone().unwrap();
    assert_eq!(result, Ok(tx.clone()));

    assert_eq!(tx.fee, 1000);
    assert_eq!(tx.total_input(), tx.total_output() + tx.fee);
    assert_eq!(tx.outputs[0].address, btc_address(0xaa));
    assert_eq!(tx.outputs[0].amount, 50_000);
    assert_eq!(tx.change_output().unwrap().amount, 49_000);
}

#[tokio::test]
async fn test_insufficient_funds_leaves_account_untouched() {
    let runner = runner(2);
    let recorder = Arc::new(SlotRecorder::default());
    let request = fixed_fee_request(&[20_000, 10_000], 50_000, 1000);
    let account = Arc::clone(&request.account);
    let snapshot = (*account).clone();

    let result = runner
        .submit(request, two_slot(recorder.clone()))
        .wait()
        .await;

    assert_eq!(
        result,
        Err(BuildError::InsufficientFunds {
            needed: 51_000,
            available: 30_000
        })
    );
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    assert!(recorder.transaction.lock().unwrap().is_none());
    assert!(matches!(
        *recorder.error.lock().unwrap(),
        Some(BuildError::InsufficientFunds { .. })
    ));
    assert_eq!(*account, snapshot);
}

#[test]
fn test_unknown_chain_on_empty_registry() {
    let registry = ParameterRegistry::new();
    assert_eq!(
        registry.resolve("btc-main").unwrap_err(),
        RegistryError::UnknownChain("btc-main".to_string())
    );
}

#[test]
fn test_fee_is_deterministic_for_same_request() {
    let request = fixed_fee_request(&[40_000, 30_000, 20_000], 60_000, 0)
        .with_selection(SelectionPolicy::LargestFirst);
    let mut per_byte = request.clone();
    per_byte.fee_policy = FeePolicy::PerByte { rate: 7 };

    let a = builder().build(&per_byte).unwrap();
    let b = builder().build(&per_byte).unwrap();
    assert_eq!(a.fee, b.fee);
    assert_eq!(a.raw, b.raw);
    assert_eq!(a.total_input(), a.total_output() + a.fee);
}

#[test]
fn test_outputs_keep_request_order_and_change_is_last() {
    let mut request = fixed_fee_request(&[500_000], 10_000, 1000);
    request.outputs = vec![
        PaymentOutput::new(btc_address(0x03), 30_000),
        PaymentOutput::new(btc_address(0x01), 10_000),
        PaymentOutput::new(btc_address(0x02), 20_000),
    ];

    let tx = builder().build(&request).unwrap();
    let amounts: Vec<u64> = tx.outputs.iter().map(|o| o.amount).collect();
    assert_eq!(amounts, vec![30_000, 10_000, 20_000, 439_000]);
    assert!(tx.outputs.last().unwrap().change);
}

#[test]
fn test_json_request_resolves_against_registry() {
    let json = serde_json::json!({
        "chain": "BTC-MAIN",
        "account": {
            "utxos": [{
                "outpoint": {
                    "txid": "0101010101010101010101010101010101010101010101010101010101010101",
                    "vout": 0
                },
                "amount": 100000,
                "height": 10
            }],
            "change_address": btc_address(0xcc)
        },
        "outputs": [{ "address": btc_address(0xaa), "amount": 50000 }],
        "fee_policy": { "type": "fixed", "amount": 1000 }
    });

    let spec: BuildRequestSpec = serde_json::from_value(json).unwrap();
    let request = spec
        .into_request(&ParameterRegistry::with_builtin_chains())
        .unwrap();
    assert_eq!(request.chain.identifier(), "btc-main");

    let result: TransactionResult = builder().build(&request);
    assert_eq!(result.unwrap().fee, 1000);
}
