//! CLI commands

use fueleu_core::{PoolId, ShipId, Year};
use fueleu_engine::MemberSnapshot;
use rust_decimal::Decimal;

use crate::context::AppContext;

/// Compute and store the CB for a ship and year
pub async fn compute_cb(
    ctx: &AppContext,
    ship: i64,
    year: i32,
    fuel_tons: Decimal,
    intensity: Decimal,
) -> Result<(), anyhow::Error> {
    let record = ctx
        .compliance
        .compute_cb(ShipId::new(ship)?, Year::new(year)?, fuel_tons, intensity)
        .await?;

    println!(
        "✅ Ship {} year {}: CB = {} gCO2eq",
        record.ship_id, record.year, record.cb_gco2eq
    );
    Ok(())
}

/// Apply an additive adjustment to a stored CB
pub async fn adjust_cb(
    ctx: &AppContext,
    ship: i64,
    year: i32,
    delta: Decimal,
) -> Result<(), anyhow::Error> {
    let record = ctx
        .compliance
        .adjust_cb(ShipId::new(ship)?, Year::new(year)?, delta)
        .await?;

    println!(
        "✅ Adjusted ship {} year {} by {}: CB = {} gCO2eq",
        record.ship_id, record.year, delta, record.cb_gco2eq
    );
    Ok(())
}

/// Show a ship's compliance history
pub async fn history(ctx: &AppContext, ship: i64) -> Result<(), anyhow::Error> {
    let records = ctx.compliance.history(ShipId::new(ship)?).await?;
    if records.is_empty() {
        println!("No compliance records for ship {}", ship);
        return Ok(());
    }

    println!("Compliance history for ship {}:", ship);
    for record in records {
        println!("  {}: {} gCO2eq", record.year, record.cb_gco2eq);
    }
    Ok(())
}

/// Purge all compliance and banking data for a ship
pub async fn purge(ctx: &AppContext, ship: i64) -> Result<(), anyhow::Error> {
    let removed = ctx.compliance.purge_ship(ShipId::new(ship)?).await?;
    println!("✅ Purged ship {} ({} rows removed)", ship, removed);
    Ok(())
}

/// Bank a surplus for a ship and year
pub async fn bank(
    ctx: &AppContext,
    ship: i64,
    year: i32,
    amount: Decimal,
) -> Result<(), anyhow::Error> {
    let entry = ctx
        .banking
        .bank_surplus(ShipId::new(ship)?, Year::new(year)?, amount)
        .await?;

    println!(
        "✅ Banked {} gCO2eq for ship {} year {} (entry total: {})",
        amount, entry.ship_id, entry.year, entry.amount_gco2eq
    );
    Ok(())
}

/// Apply banked surplus against a target year
pub async fn apply(
    ctx: &AppContext,
    ship: i64,
    target_year: i32,
    amount: Decimal,
) -> Result<(), anyhow::Error> {
    let result = ctx
        .banking
        .apply_banked_surplus(ShipId::new(ship)?, Year::new(target_year)?, amount)
        .await?;

    if result.remaining > Decimal::ZERO {
        println!(
            "⚠️  Applied {} gCO2eq to ship {} year {} (shortfall: {})",
            result.applied, ship, target_year, result.remaining
        );
    } else {
        println!(
            "✅ Applied {} gCO2eq to ship {} year {}",
            result.applied, ship, target_year
        );
    }
    Ok(())
}

/// Show a ship's banked entries and net position
pub async fn surplus(ctx: &AppContext, ship: i64) -> Result<(), anyhow::Error> {
    let ship_id = ShipId::new(ship)?;
    let entries = ctx.banking.entries_for_ship(ship_id).await?;
    let total = ctx.banking.total_surplus(ship_id).await?;

    println!("Bank entries for ship {}:", ship);
    for entry in entries {
        println!("  {}: {} gCO2eq", entry.year, entry.amount_gco2eq);
    }
    println!("Net position: {} gCO2eq", total);
    Ok(())
}

/// Create a pool for a year from "ship:cb" member specs
pub async fn pool_create(
    ctx: &AppContext,
    year: i32,
    member_specs: &[String],
) -> Result<(), anyhow::Error> {
    let members = member_specs
        .iter()
        .map(|spec| parse_member(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let created = ctx.pooling.create_pool(Year::new(year)?, &members).await?;

    println!(
        "✅ Created pool {} for year {} ({} members)",
        created.pool.id,
        created.pool.year,
        created.members.len()
    );
    for member in created.members {
        println!(
            "  ship {}: {} -> {} gCO2eq",
            member.ship_id, member.cb_before, member.cb_after
        );
    }
    Ok(())
}

/// List pools, optionally filtered by year
pub async fn pools(ctx: &AppContext, year: Option<i32>) -> Result<(), anyhow::Error> {
    let filter = year.map(Year::new).transpose()?;
    let pools = ctx.pooling.list_pools(filter).await?;

    if pools.is_empty() {
        println!("No pools found");
        return Ok(());
    }
    for pool in pools {
        println!("Pool {} (year {}, created {})", pool.id, pool.year, pool.created_at);
    }
    Ok(())
}

/// Show the members of a pool
pub async fn pool_members(ctx: &AppContext, pool_id: i64) -> Result<(), anyhow::Error> {
    let members = ctx.pooling.members(PoolId(pool_id)).await?;
    if members.is_empty() {
        println!("No members for pool {}", pool_id);
        return Ok(());
    }

    println!("Members of pool {}:", pool_id);
    for member in members {
        println!(
            "  ship {}: {} -> {} gCO2eq",
            member.ship_id, member.cb_before, member.cb_after
        );
    }
    Ok(())
}

/// Register a route
pub async fn route_add(
    ctx: &AppContext,
    route_id: &str,
    year: i32,
    intensity: Decimal,
) -> Result<(), anyhow::Error> {
    let route = ctx
        .routes
        .add_route(route_id, Year::new(year)?, intensity)
        .await?;
    println!(
        "✅ Added route {} (year {}, {} gCO2e/MJ)",
        route.route_id, route.year, route.ghg_intensity
    );
    Ok(())
}

/// Designate the baseline route
pub async fn route_baseline(ctx: &AppContext, route_id: &str) -> Result<(), anyhow::Error> {
    let route = ctx.routes.set_baseline(route_id).await?;
    println!("✅ Baseline route is now {}", route.route_id);
    Ok(())
}

/// Compare all routes against the baseline
pub async fn route_compare(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let report = ctx.routes.compare().await?;

    println!("Route comparison (target {} gCO2e/MJ):", ctx.config.target_intensity_gco2e_per_mj);
    for row in report {
        println!(
            "  {}: {} gCO2e/MJ, {:.2}% vs baseline, {}",
            row.route_id,
            row.ghg_intensity,
            row.percent_diff,
            if row.compliant { "compliant" } else { "NOT compliant" }
        );
    }
    Ok(())
}

/// Seed demo data: three ships with 2025 records and three routes
pub async fn seed(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let year = 2025;
    compute_cb(ctx, 101, year, Decimal::new(5000, 0), Decimal::new(880000, 4)).await?;
    compute_cb(ctx, 102, year, Decimal::new(3200, 0), Decimal::new(912000, 4)).await?;
    compute_cb(ctx, 103, year, Decimal::new(1500, 0), Decimal::new(895000, 4)).await?;

    route_add(ctx, "R-ROTTERDAM-SINGAPORE", year, Decimal::new(881500, 4)).await?;
    route_add(ctx, "R-HAMBURG-NEWYORK", year, Decimal::new(903200, 4)).await?;
    route_add(ctx, "R-PIRAEUS-SHANGHAI", year, Decimal::new(874100, 4)).await?;
    route_baseline(ctx, "R-ROTTERDAM-SINGAPORE").await?;

    println!("✅ Seeded demo data");
    Ok(())
}

/// Parse a "ship:cb" member spec
fn parse_member(spec: &str) -> Result<MemberSnapshot, anyhow::Error> {
    let (ship, cb) = spec
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Member spec must be 'ship:cb', got '{}'", spec))?;
    Ok(MemberSnapshot {
        ship_id: ShipId::new(ship.trim().parse()?)?,
        cb_before: cb.trim().parse()?,
    })
}
