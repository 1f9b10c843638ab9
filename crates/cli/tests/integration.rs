//! Integration tests for the FuelEU compliance ledger
//!
//! These tests run the full stack: engine services wired to a real
//! SQLite store through the application context.

use fueleu_cli::AppContext;
use fueleu_core::{ShipId, Year};
use fueleu_engine::{EngineError, MemberSnapshot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn ship(id: i64) -> ShipId {
    ShipId::new(id).unwrap()
}

fn year(y: i32) -> Year {
    Year::new(y).unwrap()
}

/// Test: compute → bank → FIFO application → settled balance
#[tokio::test]
async fn test_banking_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(temp_dir.path()).await.unwrap();

    // Two surplus years, banked
    ctx.banking.bank_surplus(ship(1), year(2023), dec!(500)).await.unwrap();
    ctx.banking.bank_surplus(ship(1), year(2024), dec!(300)).await.unwrap();

    // A deficit year to credit
    let record = ctx
        .compliance
        .compute_cb(ship(1), year(2025), dec!(100), dec!(95))
        .await
        .unwrap();
    assert!(record.cb_gco2eq < Decimal::ZERO);

    let result = ctx
        .banking
        .apply_banked_surplus(ship(1), year(2025), dec!(600))
        .await
        .unwrap();
    assert_eq!(result.applied, dec!(600));
    assert_eq!(result.remaining, Decimal::ZERO);

    // FIFO: 2023 drained first, spillover into 2024
    let entries = ctx.banking.entries_for_ship(ship(1)).await.unwrap();
    assert_eq!(entries[0].year, year(2023));
    assert_eq!(entries[0].amount_gco2eq, Decimal::ZERO);
    assert_eq!(entries[1].year, year(2024));
    assert_eq!(entries[1].amount_gco2eq, dec!(200));

    // Target year credited by exactly the applied amount
    let updated = ctx
        .compliance
        .record_for(ship(1), year(2025))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.cb_gco2eq, record.cb_gco2eq + dec!(600));
}

/// Test: pool creation settles member records and conserves total CB
#[tokio::test]
async fn test_pooling_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(temp_dir.path()).await.unwrap();

    // Seed records so the pool snapshot has settled state to replace
    for (id, cb) in [(101, dec!(500)), (102, dec!(-200)), (103, dec!(-100))] {
        let record = ctx
            .compliance
            .compute_cb(ship(id), year(2025), dec!(100), dec!(89))
            .await
            .unwrap();
        // Adjust to the scenario value
        ctx.compliance
            .adjust_cb(ship(id), year(2025), cb - record.cb_gco2eq)
            .await
            .unwrap();
    }

    let members = vec![
        MemberSnapshot { ship_id: ship(101), cb_before: dec!(500) },
        MemberSnapshot { ship_id: ship(102), cb_before: dec!(-200) },
        MemberSnapshot { ship_id: ship(103), cb_before: dec!(-100) },
    ];
    let created = ctx.pooling.create_pool(year(2025), &members).await.unwrap();

    let total_after: Decimal = created.members.iter().map(|m| m.cb_after).sum();
    assert_eq!(total_after, dec!(200));

    // Deficit ships reach zero, donor keeps the rest
    for (id, expected) in [(101, dec!(200)), (102, dec!(0)), (103, dec!(0))] {
        let record = ctx
            .compliance
            .record_for(ship(id), year(2025))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.cb_gco2eq, expected, "ship {}", id);
    }

    // The member report matches the settlement
    let report = ctx.pooling.members(created.pool.id).await.unwrap();
    assert_eq!(report, created.members);

    // One pool per year
    let again = ctx.pooling.create_pool(year(2025), &members).await;
    assert!(matches!(again, Err(EngineError::InvalidPool(_))));
}

/// Test: state survives a context reopen (SQLite persistence)
#[tokio::test]
async fn test_reopen_preserves_state() {
    let temp_dir = TempDir::new().unwrap();

    {
        let ctx = AppContext::new(temp_dir.path()).await.unwrap();
        ctx.compliance
            .compute_cb(ship(7), year(2025), dec!(1000), dec!(85))
            .await
            .unwrap();
        ctx.banking.bank_surplus(ship(7), year(2024), dec!(250)).await.unwrap();
    }

    let ctx = AppContext::new(temp_dir.path()).await.unwrap();
    let record = ctx
        .compliance
        .record_for(ship(7), year(2025))
        .await
        .unwrap()
        .unwrap();
    // (89.3368 - 85) * 1000 * 41000
    assert_eq!(record.cb_gco2eq, dec!(4.3368) * dec!(41000000));
    assert_eq!(ctx.banking.total_surplus(ship(7)).await.unwrap(), dec!(250));
}

/// Test: the reject shortfall policy is honored when configured
#[tokio::test]
async fn test_reject_policy_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("config.json"),
        r#"{ "shortfall_policy": "reject" }"#,
    )
    .unwrap();

    let ctx = AppContext::new(temp_dir.path()).await.unwrap();
    ctx.compliance
        .compute_cb(ship(1), year(2025), dec!(100), dec!(95))
        .await
        .unwrap();
    ctx.banking.bank_surplus(ship(1), year(2023), dec!(100)).await.unwrap();

    let result = ctx
        .banking
        .apply_banked_surplus(ship(1), year(2025), dec!(500))
        .await;
    assert!(matches!(result, Err(EngineError::InsufficientBalance { .. })));

    // Nothing was consumed
    let entries = ctx.banking.entries_for_ship(ship(1)).await.unwrap();
    assert_eq!(entries[0].amount_gco2eq, dec!(100));
}

/// Test: route baseline comparison over the SQLite store
#[tokio::test]
async fn test_route_comparison_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(temp_dir.path()).await.unwrap();

    ctx.routes.add_route("R-1", year(2025), dec!(80)).await.unwrap();
    ctx.routes.add_route("R-2", year(2025), dec!(96)).await.unwrap();
    ctx.routes.set_baseline("R-1").await.unwrap();

    let report = ctx.routes.compare().await.unwrap();
    let r2 = report.iter().find(|c| c.route_id == "R-2").unwrap();
    assert_eq!(r2.percent_diff, dec!(20));
    assert!(!r2.compliant);

    let r1 = report.iter().find(|c| c.route_id == "R-1").unwrap();
    assert_eq!(r1.percent_diff, Decimal::ZERO);
    assert!(r1.compliant);
}

/// Test: purge removes a ship's compliance and banking rows
#[tokio::test]
async fn test_purge_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::new(temp_dir.path()).await.unwrap();

    ctx.compliance
        .compute_cb(ship(9), year(2024), dec!(100), dec!(89))
        .await
        .unwrap();
    ctx.compliance
        .compute_cb(ship(9), year(2025), dec!(100), dec!(89))
        .await
        .unwrap();
    ctx.banking.bank_surplus(ship(9), year(2024), dec!(50)).await.unwrap();

    let removed = ctx.compliance.purge_ship(ship(9)).await.unwrap();
    assert_eq!(removed, 3);

    assert!(ctx.compliance.history(ship(9)).await.unwrap().is_empty());
    assert!(ctx.banking.entries_for_ship(ship(9)).await.unwrap().is_empty());
    assert_eq!(ctx.banking.total_surplus(ship(9)).await.unwrap(), Decimal::ZERO);
}
