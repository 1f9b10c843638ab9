//! Route baseline comparison reporting
//!
//! Pure-arithmetic reporting over voyage profiles: each route's GHG
//! intensity is compared against a designated baseline route and against
//! the configured regulatory target. No state machine here.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use fueleu_core::{Route, Year};
use fueleu_store::{Store, StoreTx};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// One row of the comparison report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteComparison {
    pub route_id: String,
    pub ghg_intensity: Decimal,
    /// Percentage difference against the baseline route's intensity.
    pub percent_diff: Decimal,
    /// Whether the route meets the configured intensity target.
    pub compliant: bool,
}

/// Manages routes and produces baseline comparison reports.
pub struct RouteComparator<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> RouteComparator<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Register a route. Route ids are unique.
    pub async fn add_route(
        &self,
        route_id: &str,
        year: Year,
        ghg_intensity: Decimal,
    ) -> EngineResult<Route> {
        if ghg_intensity <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "GHG intensity must be greater than zero".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        if tx.find_route(route_id).await?.is_some() {
            return Err(EngineError::Validation(format!(
                "Route {} already exists",
                route_id
            )));
        }
        let route = tx
            .create_route(&Route::new(route_id, year, ghg_intensity))
            .await?;
        tx.commit().await?;

        info!(route = %route_id, year = %year, intensity = %ghg_intensity, "added route");
        Ok(route)
    }

    /// Designate the baseline route, clearing any previous baseline.
    pub async fn set_baseline(&self, route_id: &str) -> EngineResult<Route> {
        let mut tx = self.store.begin().await?;
        if tx.find_route(route_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("route {}", route_id)));
        }
        let route = tx.set_baseline(route_id).await?;
        tx.commit().await?;

        info!(route = %route_id, "set baseline route");
        Ok(route)
    }

    /// Compare every route against the baseline.
    ///
    /// percent_diff = (intensity / baseline − 1) × 100.
    pub async fn compare(&self) -> EngineResult<Vec<RouteComparison>> {
        let mut tx = self.store.begin().await?;
        let routes = tx.list_routes().await?;
        tx.commit().await?;

        let baseline = routes
            .iter()
            .find(|r| r.is_baseline)
            .ok_or_else(|| EngineError::NotFound("no baseline route set".to_string()))?;
        let baseline_value = baseline.ghg_intensity;

        Ok(routes
            .iter()
            .map(|route| RouteComparison {
                route_id: route.route_id.clone(),
                ghg_intensity: route.ghg_intensity,
                percent_diff: (route.ghg_intensity / baseline_value - Decimal::ONE)
                    * Decimal::ONE_HUNDRED,
                compliant: route.ghg_intensity <= self.config.target_intensity_gco2e_per_mj,
            })
            .collect())
    }

    /// All registered routes.
    pub async fn all_routes(&self) -> EngineResult<Vec<Route>> {
        let mut tx = self.store.begin().await?;
        let routes = tx.list_routes().await?;
        tx.commit().await?;
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fueleu_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn comparator() -> RouteComparator<MemoryStore> {
        RouteComparator::new(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    fn year(y: i32) -> Year {
        Year::new(y).unwrap()
    }

    #[tokio::test]
    async fn test_add_route_rejects_duplicates_and_bad_intensity() {
        let routes = comparator();

        routes.add_route("R-1", year(2025), dec!(88)).await.unwrap();

        let dup = routes.add_route("R-1", year(2025), dec!(90)).await;
        assert!(matches!(dup, Err(EngineError::Validation(_))));

        let bad = routes.add_route("R-2", year(2025), dec!(0)).await;
        assert!(matches!(bad, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn test_compare_requires_baseline() {
        let routes = comparator();
        routes.add_route("R-1", year(2025), dec!(88)).await.unwrap();

        let result = routes.compare().await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_compare_math_and_compliance() {
        let routes = comparator();
        routes.add_route("R-1", year(2025), dec!(80)).await.unwrap();
        routes.add_route("R-2", year(2025), dec!(100)).await.unwrap();
        routes.set_baseline("R-1").await.unwrap();

        let report = routes.compare().await.unwrap();
        let by_id = |id: &str| report.iter().find(|c| c.route_id == id).unwrap();

        // Baseline compares at 0%
        assert_eq!(by_id("R-1").percent_diff, Decimal::ZERO);
        // (100 / 80 − 1) × 100 = 25%
        assert_eq!(by_id("R-2").percent_diff, dec!(25));

        // Compliance is against the target, not the baseline
        assert!(by_id("R-1").compliant); // 80 <= 89.3368
        assert!(!by_id("R-2").compliant); // 100 > 89.3368
    }

    #[tokio::test]
    async fn test_baseline_moves() {
        let routes = comparator();
        routes.add_route("R-1", year(2025), dec!(80)).await.unwrap();
        routes.add_route("R-2", year(2025), dec!(90)).await.unwrap();

        routes.set_baseline("R-1").await.unwrap();
        routes.set_baseline("R-2").await.unwrap();

        let all = routes.all_routes().await.unwrap();
        let baselines: Vec<_> = all.iter().filter(|r| r.is_baseline).collect();
        assert_eq!(baselines.len(), 1);
        assert_eq!(baselines[0].route_id, "R-2");
    }

    #[tokio::test]
    async fn test_set_baseline_missing_route() {
        let routes = comparator();
        let result = routes.set_baseline("NOPE").await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
