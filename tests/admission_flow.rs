/// Integration tests for the admission saga
///
/// These run the full pipeline against a real sled store in a temp dir:
/// validate -> charge -> dispatch, the compensation paths, the refund
/// sweeper, and the worker status callbacks.
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use driftgate::admission::{
    AdmissionController, PurchaseHandler, RefundSweeper, SweeperConfig,
};
use driftgate::common_utils::get_current_timestamp_ms;
use driftgate::db::{LedgerDb, MissionDb};
use driftgate::dispatch::{JobMessage, JobPublisher, MockJobPublisher};
use driftgate::metrics::AdmissionMetrics;
use driftgate::models::{
    default_packages, AdmissionError, MissionId, MissionParams, MissionRecord, MissionStatus,
    PaymentConfirmation, TransactionKind, TransactionMeta,
};
use driftgate::utils::generate_record_id;

fn create_test_gateway(
    default_grant: u64,
) -> (
    AdmissionController,
    Arc<LedgerDb>,
    Arc<MissionDb>,
    Arc<MockJobPublisher>,
    Arc<AdmissionMetrics>,
    TempDir,
) {
    let tmp_dir = TempDir::new().unwrap();
    let db = sled::open(tmp_dir.path()).unwrap();
    let ledger = Arc::new(LedgerDb::open(&db, default_grant, 5000).unwrap());
    ledger.seed_packages(&default_packages()).unwrap();
    let missions = Arc::new(MissionDb::open(&db).unwrap());
    let publisher = Arc::new(MockJobPublisher::new());
    let metrics = AdmissionMetrics::new();
    let controller = AdmissionController::new(
        ledger.clone(),
        missions.clone(),
        publisher.clone(),
        metrics.clone(),
    );
    (controller, ledger, missions, publisher, metrics, tmp_dir)
}

fn valid_params(forecast_hours: u32, ensemble_size: u32) -> MissionParams {
    MissionParams {
        name: "Overdue kayaker".to_string(),
        description: "Last seen off the point at dusk".to_string(),
        last_known_lat: 48.423,
        last_known_lon: -123.37,
        last_known_time: "2025-06-01T12:00:00Z".to_string(),
        object_type: "1".to_string(),
        uncertainty_radius_m: Some(500.0),
        forecast_hours,
        ensemble_size,
        backtracking: false,
    }
}

/// Mission row in the state the dispatch-failure path leaves behind when
/// the refund itself also failed: charged, failed, flagged for the sweeper.
fn crafted_refund_pending(owner_id: u64, cost: u64) -> MissionRecord {
    let now = get_current_timestamp_ms();
    MissionRecord {
        id: MissionId::new(generate_record_id()),
        owner_id,
        name: "Stranded refund".to_string(),
        description: String::new(),
        last_known_lat: 48.423,
        last_known_lon: -123.37,
        last_known_time: 1_748_779_200_000,
        object_type: "1".to_string(),
        uncertainty_radius_m: None,
        forecast_hours: 24,
        ensemble_size: 1000,
        backtracking: false,
        cost_charged: cost,
        status: MissionStatus::Failed,
        refund_pending: true,
        job_ref: None,
        error_message: Some("dispatch failed: broker down".to_string()),
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
    }
}

/// Stands in for a worker pool so fast it consumes the job and reports
/// failure before the gateway finishes marking the row queued.
struct CallbackRacingPublisher {
    missions: Arc<MissionDb>,
}

#[async_trait]
impl JobPublisher for CallbackRacingPublisher {
    async fn publish(&self, job: &JobMessage) -> Result<(), String> {
        self.missions
            .update_status_with_error(
                job.mission_id,
                MissionStatus::Created,
                MissionStatus::Failed,
                "launch aborted on deck",
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn name(&self) -> &str {
        "racing"
    }
}

#[tokio::test]
async fn test_admission_end_to_end() {
    println!("\n=== Integration Test: Mission Admission E2E ===\n");

    // 1. Setup
    println!("1. Setting up gateway with 15-credit welcome grant...");
    let (controller, ledger, _missions, publisher, metrics, _tmp) = create_test_gateway(15);
    let owner_id = 1001;
    println!("  ✓ Gateway ready");

    // 2. Submit a 24h / 1000-particle mission (base 10 + 1 day = 11 credits)
    println!("\n2. Submitting mission...");
    let mission = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .expect("Submission should be admitted");

    assert_eq!(mission.cost_charged, 11, "24h/1000 particles should cost 11");
    assert_eq!(mission.status, MissionStatus::Queued);
    assert_eq!(mission.owner_id, owner_id);
    println!("  ✓ Mission {} admitted for {} credits", mission.id, mission.cost_charged);

    // 3. Verify the ledger
    println!("\n3. Verifying ledger...");
    assert_eq!(ledger.balance(owner_id).unwrap(), 4, "15 - 11 should remain");

    let (txns, total) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert_eq!(total, 2, "Welcome grant plus one deduction");
    // Newest first
    assert_eq!(txns[0].kind, TransactionKind::Deduction);
    assert_eq!(txns[0].amount, -11);
    assert_eq!(txns[0].balance_after, 4);
    assert_eq!(txns[0].mission_id, Some(mission.id));
    assert_eq!(txns[1].kind, TransactionKind::Grant);
    assert_eq!(txns[1].amount, 15);
    println!("  ✓ Balance 4, deduction logged against the mission");

    // 4. Verify dispatch
    println!("\n4. Verifying dispatched job...");
    let published = publisher.published();
    assert_eq!(published.len(), 1, "Exactly one job on the channel");
    let job = &published[0];
    assert_eq!(job.mission_id, mission.id);
    assert_eq!(job.params.latitude, 48.423);
    assert_eq!(job.params.duration_hours, 24);
    assert_eq!(job.params.num_particles, 1000);
    assert_eq!(job.params.object_type, 1);
    println!("  ✓ Job carries the simulation inputs");

    // 5. Worker lifecycle callbacks
    println!("\n5. Driving worker callbacks...");
    let processing = controller
        .update_mission_status(
            mission.id,
            MissionStatus::Processing,
            Some("drift-job-7f3a"),
            None,
        )
        .unwrap();
    assert_eq!(processing.status, MissionStatus::Processing);
    assert_eq!(processing.job_ref.as_deref(), Some("drift-job-7f3a"));

    let completed = controller
        .update_mission_status(mission.id, MissionStatus::Completed, None, None)
        .unwrap();
    assert_eq!(completed.status, MissionStatus::Completed);
    assert!(completed.completed_at.is_some(), "Terminal status stamps completion");
    println!("  ✓ queued -> processing -> completed");

    // 6. Completion never touches the ledger
    println!("\n6. Verifying final state...");
    assert_eq!(ledger.balance(owner_id).unwrap(), 4);

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.submissions, 1);
    assert_eq!(snapshot.admitted, 1);
    assert_eq!(snapshot.refunds, 0);
    println!("  ✓ Balance untouched by completion, metrics consistent");

    println!("\n=== ✅ Integration Test PASSED ===\n");
}

#[tokio::test]
async fn test_insufficient_credits_rejected() {
    let (controller, ledger, missions, publisher, metrics, _tmp) = create_test_gateway(5);
    let owner_id = 2001;

    let err = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap_err();

    match err {
        AdmissionError::InsufficientCredits { balance, required } => {
            assert_eq!(balance, 5);
            assert_eq!(required, 11);
        }
        other => panic!("Expected InsufficientCredits, got {:?}", other),
    }

    // Nothing was created, charged, or dispatched
    let (items, total) = missions.list_for_owner(owner_id, 1, 10).unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);
    assert_eq!(publisher.publish_count(), 0);
    assert_eq!(ledger.balance(owner_id).unwrap(), 5);

    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert_eq!(txns.len(), 1, "Only the welcome grant");
    assert_eq!(txns[0].kind, TransactionKind::Grant);

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.insufficient_credits, 1);
    assert_eq!(snapshot.admitted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_submissions_single_winner() {
    // 15 credits covers one 11-credit mission, not two. Whatever the
    // interleaving, exactly one submission may win.
    let (controller, ledger, missions, publisher, _metrics, _tmp) = create_test_gateway(15);
    let owner_id = 3001;

    let c1 = controller.clone();
    let c2 = controller.clone();
    let t1 = tokio::spawn(async move { c1.submit_mission(owner_id, valid_params(24, 1000)).await });
    let t2 = tokio::spawn(async move { c2.submit_mission(owner_id, valid_params(24, 1000)).await });

    let r1 = t1.await.unwrap();
    let r2 = t2.await.unwrap();

    let wins = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "Exactly one submission may be admitted");

    let loser = if r1.is_err() { r1.unwrap_err() } else { r2.unwrap_err() };
    assert!(
        matches!(loser, AdmissionError::InsufficientCredits { .. }),
        "Loser must see the post-charge balance, got {:?}",
        loser
    );

    assert_eq!(ledger.balance(owner_id).unwrap(), 4);
    assert_eq!(publisher.publish_count(), 1);
    let (_, total) = missions.list_for_owner(owner_id, 1, 10).unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_dispatch_failure_refunds_charge() {
    println!("\n=== Integration Test: Dispatch Failure Refund ===\n");

    let (controller, ledger, missions, publisher, metrics, _tmp) = create_test_gateway(15);
    let owner_id = 4001;
    publisher.set_default_result(Err("broker down".to_string()));

    // 1. Submission reaches the charge, then dispatch fails
    println!("1. Submitting with dispatch channel down...");
    let err = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap_err();
    match err {
        AdmissionError::QueueUnavailable(reason) => assert_eq!(reason, "broker down"),
        other => panic!("Expected QueueUnavailable, got {:?}", other),
    }
    println!("  ✓ Submission rejected with QueueUnavailable");

    // 2. The mission row survives as a failed record
    println!("\n2. Verifying failed mission record...");
    let (items, total) = missions.list_for_owner(owner_id, 1, 10).unwrap();
    assert_eq!(total, 1);
    let mission = &items[0];
    assert_eq!(mission.status, MissionStatus::Failed);
    assert!(!mission.refund_pending, "Refund committed inline");
    let detail = mission.error_message.as_deref().unwrap();
    assert!(detail.contains("broker down"), "Recorded: {}", detail);
    println!("  ✓ Mission failed with reason recorded");

    // 3. The charge came back
    println!("\n3. Verifying refund...");
    assert_eq!(ledger.balance(owner_id).unwrap(), 15);

    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert_eq!(txns.len(), 3);
    assert_eq!(txns[0].kind, TransactionKind::Refund);
    assert_eq!(txns[0].amount, 11);
    assert_eq!(txns[0].balance_after, 15);
    assert_eq!(txns[0].mission_id, Some(mission.id));
    assert_eq!(txns[1].kind, TransactionKind::Deduction);

    let refunds = txns
        .iter()
        .filter(|t| t.kind == TransactionKind::Refund)
        .count();
    assert_eq!(refunds, 1, "Refund must be at-most-once");

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.queue_errors, 1);
    assert_eq!(snapshot.refunds, 1);
    assert_eq!(snapshot.refunds_pending, 0, "Inline refund owes the sweeper nothing");
    println!("  ✓ Balance restored, exactly one refund entry");

    println!("\n=== ✅ Integration Test PASSED ===\n");
}

#[tokio::test]
async fn test_purchase_then_admission() {
    let (controller, ledger, _missions, _publisher, metrics, _tmp) = create_test_gateway(4);
    let owner_id = 5001;
    let purchases = PurchaseHandler::new(ledger.clone(), metrics.clone());

    // 4 credits is not enough for an 11-credit mission
    let err = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InsufficientCredits { .. }));

    // Buy the 500-credit pack
    let payment = PaymentConfirmation {
        confirmed: true,
        payment_ref: "pay-000123".to_string(),
    };
    let receipt = purchases.purchase(owner_id, "search", &payment).unwrap();
    assert_eq!(receipt.credits_added, 500);
    assert_eq!(receipt.new_balance, 504);

    // Now the same submission goes through
    let mission = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap();
    assert_eq!(mission.status, MissionStatus::Queued);
    assert_eq!(ledger.balance(owner_id).unwrap(), 493);

    // The purchase entry carries the catalog and processor references
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    let purchase = txns
        .iter()
        .find(|t| t.kind == TransactionKind::Purchase)
        .expect("Purchase entry should be logged");
    assert_eq!(purchase.amount, 500);
    assert_eq!(purchase.package_id.as_deref(), Some("search"));
    assert_eq!(purchase.payment_ref.as_deref(), Some("pay-000123"));

    assert_eq!(metrics.get_snapshot().purchases, 1);
}

#[tokio::test]
async fn test_unconfirmed_payment_rejected() {
    let (_controller, ledger, _missions, _publisher, metrics, _tmp) = create_test_gateway(4);
    let owner_id = 5002;
    let purchases = PurchaseHandler::new(ledger.clone(), metrics.clone());

    let payment = PaymentConfirmation {
        confirmed: false,
        payment_ref: "pay-000124".to_string(),
    };
    let err = purchases.purchase(owner_id, "search", &payment).unwrap_err();
    assert!(matches!(err, AdmissionError::PaymentNotConfirmed));

    let err = purchases
        .purchase(owner_id, "no-such-pack", &PaymentConfirmation {
            confirmed: true,
            payment_ref: "pay-000125".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, AdmissionError::PackageNotFound(_)));

    // Neither attempt moved money
    assert_eq!(ledger.balance(owner_id).unwrap(), 4);
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert_eq!(txns.len(), 1, "Only the welcome grant");
}

#[tokio::test]
async fn test_admin_grant() {
    let (_controller, ledger, _missions, _publisher, metrics, _tmp) = create_test_gateway(0);
    let owner_id = 5003;
    let purchases = PurchaseHandler::new(ledger.clone(), metrics.clone());

    let receipt = purchases
        .grant(owner_id, 250, "Exercise support credits")
        .unwrap();
    assert_eq!(receipt.credits_added, 250);
    assert_eq!(receipt.new_balance, 250);

    let err = purchases.grant(owner_id, 0, "nothing").unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidGrantAmount(0)));
    let err = purchases.grant(owner_id, -50, "negative").unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidGrantAmount(-50)));

    let (txns, total) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert_eq!(total, 1, "Zero default grant writes no welcome entry");
    assert_eq!(txns[0].kind, TransactionKind::Grant);
    assert_eq!(txns[0].amount, 250);
    assert_eq!(metrics.get_snapshot().grants, 1);
}

#[tokio::test]
async fn test_refund_sweeper_redrives_stranded_refund() {
    println!("\n=== Integration Test: Refund Sweeper ===\n");

    let (controller, ledger, missions, _publisher, metrics, _tmp) = create_test_gateway(15);
    let owner_id = 6001;

    // 1. Recreate the crash window: the owner was charged, the mission is
    //    failed and flagged, but the refund never committed
    println!("1. Crafting a stranded refund_pending mission...");
    assert_eq!(ledger.balance(owner_id).unwrap(), 15);
    let mission = crafted_refund_pending(owner_id, 11);
    ledger
        .adjust(
            owner_id,
            -11,
            TransactionMeta::deduction("Mission: Stranded refund".to_string(), mission.id),
        )
        .unwrap();
    missions.insert(&mission).unwrap();
    assert_eq!(ledger.balance(owner_id).unwrap(), 4);
    println!("  ✓ Owner charged 11, mission flagged");

    // 2. One sweep commits the refund and clears the flag
    println!("\n2. Running the sweeper...");
    let sweeper = Arc::new(RefundSweeper::new(
        missions.clone(),
        controller.compensator(),
        metrics.clone(),
        SweeperConfig::default(),
    ));
    assert_eq!(sweeper.sweep_once(), 1, "One refund should commit");

    assert_eq!(ledger.balance(owner_id).unwrap(), 15);
    let swept = missions.get(mission.id).unwrap().unwrap();
    assert!(!swept.refund_pending);
    assert_eq!(swept.status, MissionStatus::Failed);
    println!("  ✓ Balance restored, flag cleared");

    // 3. Re-running finds nothing and refunds nothing
    println!("\n3. Running the sweeper again...");
    assert_eq!(sweeper.sweep_once(), 0);
    assert_eq!(ledger.balance(owner_id).unwrap(), 15);

    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    let refunds = txns
        .iter()
        .filter(|t| t.kind == TransactionKind::Refund)
        .count();
    assert_eq!(refunds, 1, "Sweeper must stay at-most-once");
    assert_eq!(metrics.get_snapshot().refunds_redriven, 1);
    println!("  ✓ Idempotent, exactly one refund entry");

    println!("\n=== ✅ Integration Test PASSED ===\n");
}

#[tokio::test]
async fn test_sweeper_skips_already_refunded_mission() {
    // Crash after the refund committed but before the flag cleared: the
    // sweeper must only clear the flag, never refund twice.
    let (controller, ledger, missions, _publisher, metrics, _tmp) = create_test_gateway(15);
    let owner_id = 6002;

    assert_eq!(ledger.balance(owner_id).unwrap(), 15);
    let mission = crafted_refund_pending(owner_id, 11);
    ledger
        .adjust(
            owner_id,
            -11,
            TransactionMeta::deduction("Mission: Stranded refund".to_string(), mission.id),
        )
        .unwrap();
    ledger
        .adjust(
            owner_id,
            11,
            TransactionMeta::refund(format!("Refund for mission {}", mission.id), mission.id),
        )
        .unwrap();
    missions.insert(&mission).unwrap();

    let sweeper = RefundSweeper::new(
        missions.clone(),
        controller.compensator(),
        metrics.clone(),
        SweeperConfig::default(),
    );
    assert_eq!(sweeper.sweep_once(), 0, "Nothing new should commit");

    assert_eq!(ledger.balance(owner_id).unwrap(), 15);
    assert!(!missions.get(mission.id).unwrap().unwrap().refund_pending);
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    let refunds = txns
        .iter()
        .filter(|t| t.kind == TransactionKind::Refund)
        .count();
    assert_eq!(refunds, 1);
}

#[tokio::test]
async fn test_worker_callback_edges() {
    let (controller, _ledger, _missions, _publisher, _metrics, _tmp) = create_test_gateway(100);
    let owner_id = 7001;

    let mission = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap();
    assert_eq!(mission.status, MissionStatus::Queued);

    // Skipping processing is not a legal edge
    let err = controller
        .update_mission_status(mission.id, MissionStatus::Completed, None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        AdmissionError::InvalidStatusTransition {
            from: MissionStatus::Queued,
            to: MissionStatus::Completed,
        }
    ));

    // Workers cannot fail a job they never started
    let err = controller
        .update_mission_status(mission.id, MissionStatus::Failed, None, None)
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidStatusTransition { .. }));

    controller
        .update_mission_status(mission.id, MissionStatus::Processing, Some("job-1"), None)
        .unwrap();

    // Redelivered callback with the current status is a no-op success
    let again = controller
        .update_mission_status(mission.id, MissionStatus::Processing, Some("job-1"), None)
        .unwrap();
    assert_eq!(again.status, MissionStatus::Processing);

    let done = controller
        .update_mission_status(mission.id, MissionStatus::Completed, None, None)
        .unwrap();
    assert!(done.completed_at.is_some());

    // Terminal rows accept nothing further
    let err = controller
        .update_mission_status(mission.id, MissionStatus::Processing, None, None)
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidStatusTransition { .. }));

    // Unknown mission
    let err = controller
        .update_mission_status(MissionId::new(999), MissionStatus::Processing, None, None)
        .unwrap_err();
    assert!(matches!(err, AdmissionError::MissionNotFound(_)));
}

#[tokio::test]
async fn test_worker_failure_keeps_charge() {
    // A worker-reported failure happens after dispatch; the simulation
    // capacity was consumed, so the charge stands.
    let (controller, ledger, _missions, _publisher, _metrics, _tmp) = create_test_gateway(100);
    let owner_id = 7002;

    let mission = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .unwrap();
    controller
        .update_mission_status(mission.id, MissionStatus::Processing, Some("job-9"), None)
        .unwrap();
    let failed = controller
        .update_mission_status(
            mission.id,
            MissionStatus::Failed,
            None,
            Some("particle solver diverged"),
        )
        .unwrap();

    assert_eq!(failed.status, MissionStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("particle solver diverged"));
    assert!(!failed.refund_pending);
    assert!(failed.completed_at.is_some());

    assert_eq!(ledger.balance(owner_id).unwrap(), 89);
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert!(txns.iter().all(|t| t.kind != TransactionKind::Refund));
}

#[tokio::test]
async fn test_admission_survives_raced_queued_write() {
    // The worker fails the mission before the gateway can mark it queued.
    // The charge is committed and the job went out, so the submission
    // must still come back admitted, carrying the worker's row.
    let tmp_dir = TempDir::new().unwrap();
    let db = sled::open(tmp_dir.path()).unwrap();
    let ledger = Arc::new(LedgerDb::open(&db, 100, 5000).unwrap());
    let missions = Arc::new(MissionDb::open(&db).unwrap());
    let publisher = Arc::new(CallbackRacingPublisher {
        missions: missions.clone(),
    });
    let metrics = AdmissionMetrics::new();
    let controller =
        AdmissionController::new(ledger.clone(), missions.clone(), publisher, metrics.clone());
    let owner_id = 7003;

    let mission = controller
        .submit_mission(owner_id, valid_params(24, 1000))
        .await
        .expect("Dispatched submission must be admitted");

    assert_eq!(mission.status, MissionStatus::Failed);
    assert_eq!(
        mission.error_message.as_deref(),
        Some("launch aborted on deck")
    );

    // Dispatched work counts as delivered; the charge stands
    assert_eq!(ledger.balance(owner_id).unwrap(), 89);
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert!(txns.iter().all(|t| t.kind != TransactionKind::Refund));

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.admitted, 1);
    assert_eq!(snapshot.store_errors, 0);
}

#[tokio::test]
async fn test_owners_are_isolated() {
    let (controller, ledger, _missions, _publisher, _metrics, _tmp) = create_test_gateway(100);

    let mission = controller
        .submit_mission(8001, valid_params(24, 1000))
        .await
        .unwrap();

    // The other owner's wallet is untouched
    assert_eq!(ledger.balance(8001).unwrap(), 89);
    assert_eq!(ledger.balance(8002).unwrap(), 100);

    // Reads are owner-scoped: a foreign mission id looks like no mission
    let err = controller.get_mission(8002, mission.id).unwrap_err();
    assert!(matches!(err, AdmissionError::MissionNotFound(_)));
    assert!(controller.get_mission(8001, mission.id).is_ok());

    let (items, total) = controller.list_missions(8002, 1, 10).unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_mission_listing_newest_first() {
    let (controller, _ledger, _missions, _publisher, _metrics, _tmp) = create_test_gateway(1000);
    let owner_id = 9001;

    let mut submitted = Vec::new();
    for i in 0..5 {
        let mut params = valid_params(24, 1000);
        params.name = format!("Sweep leg {}", i);
        submitted.push(controller.submit_mission(owner_id, params).await.unwrap());
    }

    let (page1, total) = controller.list_missions(owner_id, 1, 2).unwrap();
    assert_eq!(total, 5);
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].id, submitted[4].id, "Latest submission first");
    assert_eq!(page1[1].id, submitted[3].id);

    let (page3, _) = controller.list_missions(owner_id, 3, 2).unwrap();
    assert_eq!(page3.len(), 1);
    assert_eq!(page3[0].id, submitted[0].id);

    // Past the end is empty, not an error
    let (page4, total) = controller.list_missions(owner_id, 4, 2).unwrap();
    assert!(page4.is_empty());
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_validation_rejects_before_any_state() {
    let (controller, ledger, missions, publisher, metrics, _tmp) = create_test_gateway(100);
    let owner_id = 9100;

    let mut params = valid_params(24, 1000);
    params.name = "  ".to_string();
    let err = controller.submit_mission(owner_id, params).await.unwrap_err();
    assert!(matches!(err, AdmissionError::MissingName));

    let mut params = valid_params(24, 1000);
    params.last_known_lat = 91.0;
    let err = controller.submit_mission(owner_id, params).await.unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidCoordinates { .. }));

    let err = controller
        .submit_mission(owner_id, valid_params(0, 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidForecastHours(0)));

    // None of the rejects touched the wallet, the store, or the channel
    let (_, total) = missions.list_for_owner(owner_id, 1, 10).unwrap();
    assert_eq!(total, 0);
    assert_eq!(publisher.publish_count(), 0);
    let (txns, _) = ledger.list_transactions(owner_id, 1, 10).unwrap();
    assert!(txns.is_empty(), "Validation happens before the balance read");

    let snapshot = metrics.get_snapshot();
    assert_eq!(snapshot.validation_errors, 3);
    assert_eq!(snapshot.submissions, 3);
}
