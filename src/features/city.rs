//! Per-city aggregates frozen at training time and the conversion-rate tiering built on them.

use crate::data::{HitAggregate, Session};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const MAX_TIER_RATE: f64 = 10.0;

/// Ordinal bucket of a city's historical conversion rate (percent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityTier {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl CityTier {
    /// Right-closed bins: (.., 0.8] low, (0.8, 1.2] medium, (1.2, 1.6] high, (1.6, 10] very_high.
    /// Rates above 10% fall outside the bins and count as low.
    pub fn from_rate(rate_pct: f64) -> Self {
        if rate_pct.is_nan() || rate_pct <= 0.8 || rate_pct > MAX_TIER_RATE {
            CityTier::Low
        } else if rate_pct <= 1.2 {
            CityTier::Medium
        } else if rate_pct <= 1.6 {
            CityTier::High
        } else {
            CityTier::VeryHigh
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityStats {
    pub sessions: u64,
    pub conversions: u64,
    /// Percent, rounded to 2 decimals
    pub conversion_rate: f64,
    pub avg_duration: f64,
    /// Mean over the city's sessions that had at least one hit
    pub avg_hits: f64,
    pub tier: CityTier,
}

#[derive(Default)]
struct Acc {
    sessions: u64,
    conversions: u64,
    duration_sum: f64,
    hits_sum: f64,
    hits_n: u64,
}

/// City name → stats. Unseen and missing cities resolve to `CityStats::default()` (tier low).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityStatistics {
    cities: BTreeMap<String, CityStats>,
}

/// One training row as seen by the city aggregation.
pub struct CityRow<'a> {
    pub city: Option<&'a str>,
    pub converted: bool,
    pub duration: f64,
    /// `None` for sessions without hits
    pub total_hits: Option<u32>,
}

impl CityStatistics {
    /// Aggregate the training corpus. Sessions without a city do not contribute.
    pub fn from_sessions(sessions: &[Session], aggregates: &HashMap<String, HitAggregate>) -> Self {
        Self::from_rows(sessions.iter().map(|s| {
            let agg = aggregates.get(&s.session_id);
            CityRow {
                city: s.geo_city.as_deref(),
                converted: agg.is_some_and(|a| a.is_target),
                duration: agg.map_or(0.0, |a| a.session_duration),
                total_hits: agg.map(|a| a.total_hits),
            }
        }))
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = CityRow<'a>>) -> Self {
        let mut accs: BTreeMap<&str, Acc> = BTreeMap::new();
        for r in rows {
            let Some(city) = r.city else { continue };
            let a = accs.entry(city).or_default();
            a.sessions += 1;
            a.conversions += u64::from(r.converted);
            a.duration_sum += r.duration;
            if let Some(h) = r.total_hits {
                a.hits_sum += f64::from(h);
                a.hits_n += 1;
            }
        }

        let cities = accs
            .into_iter()
            .map(|(city, a)| {
                let rate = a.conversions as f64 / a.sessions as f64 * 100.0;
                let conversion_rate = (rate * 100.0).round() / 100.0;
                let avg_hits = if a.hits_n == 0 {
                    0.0
                } else {
                    a.hits_sum / a.hits_n as f64
                };
                let stats = CityStats {
                    sessions: a.sessions,
                    conversions: a.conversions,
                    conversion_rate,
                    avg_duration: a.duration_sum / a.sessions as f64,
                    avg_hits,
                    tier: CityTier::from_rate(conversion_rate),
                };
                (city.to_string(), stats)
            })
            .collect();
        Self { cities }
    }

    pub fn lookup(&self, city: Option<&str>) -> CityStats {
        city.and_then(|c| self.cities.get(c))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
