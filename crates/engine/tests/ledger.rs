use chrono::NaiveDate;
use sea_orm::Database;
use uuid::Uuid;

use engine::{
    AdjustmentCmd, ChargeFeesCmd, CollectPaymentCmd, DiscountCmd, Engine, EngineError, EntryDraft,
    EntryType, LedgerEvent, OpeningBalanceCmd, ReferenceType,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Every non-reversed entry must carry the running sum of its predecessors:
/// `balance[k] = balance[k-1] + debit[k] - credit[k]`, baseline 0.
async fn assert_running_balance(engine: &Engine, student_id: i64) {
    let entries = engine.all_chronological(student_id).await.unwrap();
    let mut prior = 0i64;
    for entry in &entries {
        assert_eq!(
            entry.balance_minor,
            prior + entry.debit_minor - entry.credit_minor,
            "entry {} breaks the running balance",
            entry.id
        );
        prior = entry.balance_minor;
    }
}

/// Engine plus one enrolled student and one session ("2026-27").
async fn setup() -> (Engine, i64, i64) {
    let engine = engine_with_db().await;
    let student_id = engine.new_student("Asha Verma").await.unwrap();
    let session_id = engine
        .new_session("2026-27", date(2026, 4, 1), date(2027, 3, 31))
        .await
        .unwrap();
    (engine, student_id, session_id)
}

#[tokio::test]
async fn zero_entry_baseline() {
    let (engine, student_id, _) = setup().await;

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 0);
    assert_eq!(engine.total_debits(student_id).await.unwrap(), 0);
    assert_eq!(engine.total_credits(student_id).await.unwrap(), 0);
    assert!(engine.last_entry(student_id).await.unwrap().is_none());
    assert_eq!(engine.total_pending_dues().await.unwrap(), 0);
}

#[tokio::test]
async fn charge_then_payment() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 12_000);

    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.balance_minor, 7_000);

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 7_000);
    assert_eq!(engine.total_debits(student_id).await.unwrap(), 12_000);
    assert_eq!(engine.total_credits(student_id).await.unwrap(), 5_000);

    let entries = engine
        .entries_for_student(student_id, None)
        .await
        .unwrap();
    let balances: Vec<i64> = entries.iter().map(|e| e.balance_minor).collect();
    assert_eq!(balances, vec![12_000, 7_000]);
    assert_eq!(entries.iter().map(|e| e.signed_minor()).sum::<i64>(), 7_000);
}

#[tokio::test]
async fn full_payment_with_discount_settles_account() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            11_000,
            date(2026, 4, 20),
        ))
        .await
        .unwrap();
    engine
        .apply_discount(
            DiscountCmd::new(student_id, session_id, 1_000, date(2026, 4, 20))
                .particulars("Sibling discount"),
        )
        .await
        .unwrap();

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 0);
}

#[tokio::test]
async fn advance_payment_goes_negative() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            15_000,
            date(2026, 4, 10),
        ))
        .await
        .unwrap();

    assert_eq!(engine.current_balance(student_id).await.unwrap(), -3_000);
}

#[tokio::test]
async fn cancelling_receipt_restores_dues_and_keeps_history() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 7_000);

    let flagged = engine.cancel_receipt(outcome.receipt_id).await.unwrap();
    assert_eq!(flagged, 1);

    // Aggregates behave as if the payment never existed.
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 12_000);
    assert_eq!(engine.total_credits(student_id).await.unwrap(), 0);
    assert_eq!(engine.total_pending_dues().await.unwrap(), 12_000);

    // The rows survive for audit, flagged as reversed.
    let kept = engine
        .entries_by_reference(ReferenceType::Receipt, outcome.receipt_id)
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert!(kept.iter().all(|e| e.is_reversed));

    let receipt = engine.receipt(outcome.receipt_id).await.unwrap();
    assert!(receipt.is_cancelled());

    assert_running_balance(&engine, student_id).await;
}

#[tokio::test]
async fn cancel_receipt_is_idempotent() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();

    assert_eq!(engine.cancel_receipt(outcome.receipt_id).await.unwrap(), 1);
    assert_eq!(engine.cancel_receipt(outcome.receipt_id).await.unwrap(), 0);
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 12_000);

    // Reversing a reference with no active entries is a no-op, not an error.
    assert_eq!(engine.reverse_receipt(9_999).await.unwrap(), 0);

    // Cancelling a receipt that never existed is a lookup failure instead.
    let missing = engine.cancel_receipt(9_999).await;
    assert_eq!(
        missing,
        Err(EngineError::KeyNotFound("receipt not exists".to_string()))
    );
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5))
                .line("Tuition", 10_000)
                .line("Transport", 2_000),
        )
        .await
        .unwrap();
    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            4_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    engine.cancel_receipt(outcome.receipt_id).await.unwrap();

    // The cancellation already recomputed; nothing further changes.
    assert_eq!(
        engine.recompute_chronological(student_id).await.unwrap(),
        0
    );
    assert_eq!(
        engine.recompute_chronological(student_id).await.unwrap(),
        0
    );
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 12_000);
}

#[tokio::test]
async fn same_day_entries_tie_break_by_id() {
    let (engine, student_id, session_id) = setup().await;
    let day = date(2026, 4, 5);

    engine
        .append(
            EntryDraft::debit(
                student_id,
                session_id,
                day,
                ReferenceType::FeeCharge,
                100,
                "Tuition",
            )
            .unwrap(),
        )
        .await
        .unwrap();
    engine
        .append(
            EntryDraft::debit(
                student_id,
                session_id,
                day,
                ReferenceType::FeeCharge,
                50,
                "Library",
            )
            .unwrap(),
        )
        .await
        .unwrap();
    engine
        .append(
            EntryDraft::credit(
                student_id,
                session_id,
                day,
                ReferenceType::Adjustment,
                30,
                "Correction",
            )
            .unwrap(),
        )
        .await
        .unwrap();

    let entries = engine.all_chronological(student_id).await.unwrap();
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "same-day entries must order by ascending id");

    let keys: Vec<_> = entries.iter().map(|e| e.key()).collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));

    let balances: Vec<i64> = entries.iter().map(|e| e.balance_minor).collect();
    assert_eq!(balances, vec![100, 150, 120]);

    // Insertion order is the deterministic secondary key: replaying the
    // fold changes nothing.
    assert_eq!(
        engine.recompute_chronological(student_id).await.unwrap(),
        0
    );
    assert_running_balance(&engine, student_id).await;
}

#[tokio::test]
async fn backdated_opening_balance_triggers_recompute() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 6, 1)).line("Tuition", 12_000),
        )
        .await
        .unwrap();

    // Imported later, dated at session start: earlier than the charge.
    engine
        .import_opening_balance(OpeningBalanceCmd::new(
            student_id,
            session_id,
            2_500,
            date(2026, 4, 1),
        ))
        .await
        .unwrap();

    let entries = engine.all_chronological(student_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].reference_type, ReferenceType::OpeningBalance);
    assert_eq!(entries[0].balance_minor, 2_500);
    assert_eq!(entries[1].reference_type, ReferenceType::FeeCharge);
    assert_eq!(entries[1].balance_minor, 14_500);

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 14_500);
    assert_running_balance(&engine, student_id).await;
}

#[tokio::test]
async fn dues_aggregation_uses_net_sums() {
    let (engine, student_a, session_id) = setup().await;
    let student_b = engine.new_student("Bilal Khan").await.unwrap();
    let student_c = engine.new_student("Chitra Rao").await.unwrap();

    // A owes 1000.
    engine
        .charge_fees(ChargeFeesCmd::new(student_a, session_id, date(2026, 4, 5)).line("Fees", 1_000))
        .await
        .unwrap();

    // B is settled.
    engine
        .charge_fees(ChargeFeesCmd::new(student_b, session_id, date(2026, 4, 5)).line("Fees", 500))
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_b,
            session_id,
            500,
            date(2026, 4, 6),
        ))
        .await
        .unwrap();

    assert_eq!(
        engine.student_ids_with_dues().await.unwrap(),
        vec![student_a]
    );
    assert_eq!(engine.total_pending_dues().await.unwrap(), 1_000);

    // C holds an advance; the cross-student figure is a raw net sum, so the
    // advance offsets A's dues.
    engine
        .charge_fees(ChargeFeesCmd::new(student_c, session_id, date(2026, 4, 5)).line("Fees", 1_000))
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_c,
            session_id,
            3_000,
            date(2026, 4, 7),
        ))
        .await
        .unwrap();

    assert_eq!(
        engine.student_ids_with_dues().await.unwrap(),
        vec![student_a]
    );
    assert_eq!(engine.total_pending_dues().await.unwrap(), -1_000);
}

#[tokio::test]
async fn batch_is_atomic() {
    let (engine, student_id, session_id) = setup().await;

    let drafts = vec![
        EntryDraft::debit(
            student_id,
            session_id,
            date(2026, 4, 5),
            ReferenceType::FeeCharge,
            1_000,
            "Tuition",
        )
        .unwrap(),
        // Unknown session: the whole batch must fail.
        EntryDraft::debit(
            student_id,
            999,
            date(2026, 4, 5),
            ReferenceType::FeeCharge,
            2_000,
            "Transport",
        )
        .unwrap(),
    ];

    let result = engine.append_batch(drafts).await;
    assert_eq!(
        result,
        Err(EngineError::KeyNotFound("session not exists".to_string()))
    );

    // No partial writes are observable.
    assert!(
        engine
            .entries_for_student(student_id, None)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 0);
}

#[tokio::test]
async fn charging_a_session_twice_is_rejected() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    assert!(
        engine
            .has_fee_charge_entries(student_id, session_id)
            .await
            .unwrap()
    );

    let again = engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 6)).line("Tuition", 12_000),
        )
        .await;
    assert!(matches!(again, Err(EngineError::ExistingKey(_))));
}

#[tokio::test]
async fn session_scoped_credit_totals() {
    let (engine, student_id, first_session) = setup().await;
    let second_session = engine
        .new_session("2027-28", date(2027, 4, 1), date(2028, 3, 31))
        .await
        .unwrap();

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, first_session, date(2026, 4, 5)).line("Tuition", 6_000),
        )
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            first_session,
            6_000,
            date(2026, 7, 1),
        ))
        .await
        .unwrap();

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, second_session, date(2027, 4, 5)).line("Tuition", 7_000),
        )
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            second_session,
            2_000,
            date(2027, 5, 1),
        ))
        .await
        .unwrap();

    assert_eq!(
        engine
            .total_credits_for_session(student_id, first_session)
            .await
            .unwrap(),
        6_000
    );
    assert_eq!(
        engine
            .total_credits_for_session(student_id, second_session)
            .await
            .unwrap(),
        2_000
    );
    assert_eq!(engine.total_credits(student_id).await.unwrap(), 8_000);

    // Balance carries across sessions: 13000 charged, 8000 paid.
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 5_000);

    let scoped = engine
        .entries_for_student(student_id, Some(second_session))
        .await
        .unwrap();
    assert_eq!(scoped.len(), 2);
}

#[tokio::test]
async fn store_level_reversal_flag_and_manual_recompute() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .append(
            EntryDraft::debit(
                student_id,
                session_id,
                date(2026, 4, 5),
                ReferenceType::FeeCharge,
                12_000,
                "Tuition",
            )
            .unwrap(),
        )
        .await
        .unwrap();
    engine
        .append(
            EntryDraft::credit(
                student_id,
                session_id,
                date(2026, 5, 2),
                ReferenceType::Receipt,
                5_000,
                "Receipt #42",
            )
            .unwrap()
            .reference_id(42),
        )
        .await
        .unwrap();
    engine
        .append(
            EntryDraft::debit(
                student_id,
                session_id,
                date(2026, 6, 1),
                ReferenceType::Adjustment,
                3_000,
                "Late fee",
            )
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 10_000);

    // Flagging a non-terminal entry leaves the later cached balances stale
    // until the mandatory recompute runs.
    let flagged = engine
        .set_reversed(ReferenceType::Receipt, 42)
        .await
        .unwrap();
    assert_eq!(flagged, 1);
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 10_000);

    assert_eq!(
        engine.recompute_chronological(student_id).await.unwrap(),
        1
    );
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 15_000);
    assert_running_balance(&engine, student_id).await;

    // Flagging again matches nothing.
    assert_eq!(
        engine.set_reversed(ReferenceType::Receipt, 42).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn last_entry_sees_reversed_rows() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    engine.cancel_receipt(outcome.receipt_id).await.unwrap();

    // Diagnostics view: the reversed payment is still the newest row.
    let last = engine.last_entry(student_id).await.unwrap().unwrap();
    assert_eq!(last.id, outcome.entry_id);
    assert!(last.is_reversed);

    // Balance view ignores it.
    assert_eq!(engine.current_balance(student_id).await.unwrap(), 12_000);
}

#[tokio::test]
async fn adjustments_move_the_balance_both_ways() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .apply_adjustment(AdjustmentCmd::new(
            student_id,
            session_id,
            EntryType::Debit,
            800,
            date(2026, 4, 10),
        ))
        .await
        .unwrap();
    engine
        .apply_adjustment(
            AdjustmentCmd::new(
                student_id,
                session_id,
                EntryType::Credit,
                300,
                date(2026, 4, 11),
            )
            .particulars("Posting correction"),
        )
        .await
        .unwrap();

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 500);
    assert_eq!(engine.total_debits(student_id).await.unwrap(), 800);
    assert_eq!(engine.total_credits(student_id).await.unwrap(), 300);
}

#[tokio::test]
async fn deleting_a_student_purges_the_account() {
    let (engine, student_id, session_id) = setup().await;

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    assert_eq!(engine.total_pending_dues().await.unwrap(), 7_000);

    engine.delete_student(student_id).await.unwrap();

    assert_eq!(
        engine.student(student_id).await,
        Err(EngineError::KeyNotFound("student not exists".to_string()))
    );
    assert_eq!(engine.total_pending_dues().await.unwrap(), 0);
    assert!(
        engine
            .receipts_for_student(student_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(engine.last_entry(student_id).await.unwrap().is_none());
}

#[tokio::test]
async fn committed_writes_publish_events() {
    let (engine, student_id, session_id) = setup().await;
    let mut rx = engine.subscribe();

    engine
        .charge_fees(
            ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5)).line("Tuition", 12_000),
        )
        .await
        .unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        LedgerEvent::BalanceChanged { student_id }
    );

    let outcome = engine
        .collect_payment(CollectPaymentCmd::new(
            student_id,
            session_id,
            5_000,
            date(2026, 5, 2),
        ))
        .await
        .unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        LedgerEvent::BalanceChanged { student_id }
    );

    engine.cancel_receipt(outcome.receipt_id).await.unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        LedgerEvent::BalanceChanged { student_id }
    );

    engine.delete_student(student_id).await.unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        LedgerEvent::StudentPurged { student_id }
    );
}

#[tokio::test]
async fn balances_survive_reopen() {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("ledger_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let (student_id, session_id) = {
        let db = Database::connect(&url).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();

        let student_id = engine.new_student("Asha Verma").await.unwrap();
        let session_id = engine
            .new_session("2026-27", date(2026, 4, 1), date(2027, 3, 31))
            .await
            .unwrap();
        engine
            .charge_fees(
                ChargeFeesCmd::new(student_id, session_id, date(2026, 4, 5))
                    .line("Tuition", 12_000),
            )
            .await
            .unwrap();
        engine
            .collect_payment(CollectPaymentCmd::new(
                student_id,
                session_id,
                5_000,
                date(2026, 5, 2),
            ))
            .await
            .unwrap();
        (student_id, session_id)
    };

    let db = Database::connect(&url).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    assert_eq!(engine.current_balance(student_id).await.unwrap(), 7_000);
    assert!(
        engine
            .has_fee_charge_entries(student_id, session_id)
            .await
            .unwrap()
    );

    std::fs::remove_file(&path).ok();
}
