//! Per-asset board of the latest indicator states.
//!
//! A firing for one timeframe only refreshes the indicators on that timeframe; the
//! asset's trend is always aggregated over every configured spec, reading the
//! most recent state recorded for each. Specs that have never been evaluated
//! count as `Indeterminate`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::indicators::IndicatorSpec;
use crate::models::signal::{DirectionalState, Trend};
use crate::models::watchlist::Asset;
use crate::signals::aggregation::aggregate;

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReading {
    pub indicator: String,
    pub spec: IndicatorSpec,
    pub state: DirectionalState,
}

/// Read model of one asset's row, for the control API.
#[derive(Debug, Clone, Serialize)]
pub struct AssetTrend {
    pub asset: Asset,
    pub readings: Vec<IndicatorReading>,
    pub trend: Trend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct AssetRow {
    states: HashMap<IndicatorSpec, DirectionalState>,
    trend: Option<(Trend, DateTime<Utc>)>,
}

#[derive(Debug, Default)]
pub struct TrendBoard {
    rows: HashMap<Asset, AssetRow>,
}

impl TrendBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, asset: &Asset, spec: IndicatorSpec, state: DirectionalState) {
        self.rows
            .entry(asset.clone())
            .or_default()
            .states
            .insert(spec, state);
    }

    pub fn state(&self, asset: &Asset, spec: &IndicatorSpec) -> DirectionalState {
        self.rows
            .get(asset)
            .and_then(|row| row.states.get(spec))
            .copied()
            .unwrap_or(DirectionalState::Indeterminate)
    }

    /// States in configured order.
    pub fn states(&self, asset: &Asset, specs: &[IndicatorSpec]) -> Vec<DirectionalState> {
        specs.iter().map(|spec| self.state(asset, spec)).collect()
    }

    /// Aggregates the asset's states and remembers the verdict.
    pub fn settle(
        &mut self,
        asset: &Asset,
        specs: &[IndicatorSpec],
        at: DateTime<Utc>,
    ) -> Trend {
        let trend = aggregate(&self.states(asset, specs));
        let row = self.rows.entry(asset.clone()).or_default();
        row.trend = Some((trend, at));
        // Drop states of specs that are no longer configured.
        row.states.retain(|spec, _| specs.contains(spec));
        trend
    }

    pub fn forget(&mut self, asset: &Asset) {
        self.rows.remove(asset);
    }

    pub fn snapshot(&self, assets: &[Asset], specs: &[IndicatorSpec]) -> Vec<AssetTrend> {
        assets
            .iter()
            .map(|asset| {
                let readings = specs
                    .iter()
                    .map(|spec| IndicatorReading {
                        indicator: spec.label(),
                        spec: *spec,
                        state: self.state(asset, spec),
                    })
                    .collect();
                let settled = self.rows.get(asset).and_then(|row| row.trend);
                AssetTrend {
                    asset: asset.clone(),
                    readings,
                    trend: settled.map(|(trend, _)| trend).unwrap_or(Trend::Neutral),
                    updated_at: settled.map(|(_, at)| at),
                }
            })
            .collect()
    }
}
