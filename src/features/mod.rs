//! Session feature derivation: raw session + hit aggregate → fixed, named feature vector.

mod city;
mod pipeline;

pub use city::{CityRow, CityStatistics, CityStats, CityTier};
pub use pipeline::{Dataset, FeatureDeriver};

use serde::{Deserialize, Serialize};

macro_rules! feature_schema {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// One column of the model input, in training order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Feature {
            $($variant),+
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(Feature::$variant => $name),+
                }
            }
        }

        /// Column names in model order.
        pub const FEATURE_NAMES: &[&str] = &[$($name),+];
    };
}

feature_schema! {
    VisitNumber => "visit_number",
    TotalHits => "total_hits",
    UniquePages => "unique_pages",
    SessionDuration => "session_duration",
    UniqueEvents => "unique_events",
    VisitHour => "visit_hour",
    VisitWeekday => "visit_weekday",
    IsWeekend => "is_weekend",
    IsWorkday => "is_workday",
    IsMorning => "is_morning",
    IsAfternoon => "is_afternoon",
    IsEvening => "is_evening",
    IsNight => "is_night",
    IsMobile => "is_mobile",
    IsAndroid => "is_android",
    IsIos => "is_ios",
    IsDesktop => "is_desktop",
    IsTablet => "is_tablet",
    IsWindows => "is_windows",
    IsMacos => "is_macos",
    IsPaid => "is_paid",
    IsOrganic => "is_organic",
    IsReferral => "is_referral",
    IsDirect => "is_direct",
    AvgTimePerPage => "avg_time_per_page",
    BounceRate => "bounce_rate",
    DeepEngagement => "deep_engagement",
    LongSession => "long_session",
    VeryLongSession => "very_long_session",
    HighActivity => "high_activity",
    VeryHighActivity => "very_high_activity",
    EventsPerPage => "events_per_page",
    EngagementScore => "engagement_score",
    IsReturning => "is_returning",
    IsFrequent => "is_frequent",
    IsMoscow => "is_moscow",
    IsSpb => "is_spb",
    IsMillionPlus => "is_million_plus",
    IsRegionalCenter => "is_regional_center",
    CityConversionRate => "city_conversion_rate",
    CityAvgDuration => "city_avg_duration",
    CityAvgHits => "city_avg_hits",
    CityTierLow => "city_tier_low",
    CityTierMedium => "city_tier_medium",
    CityTierHigh => "city_tier_high",
    CityTierVeryHigh => "city_tier_very_high",
}

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Fixed-length feature vector indexed by [`Feature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: vec![0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureVector {
    pub fn get(&self, f: Feature) -> f64 {
        self.values[f as usize]
    }

    pub fn set(&mut self, f: Feature, v: f64) {
        self.values[f as usize] = v;
    }

    pub fn set_flag(&mut self, f: Feature, on: bool) {
        self.set(f, if on { 1.0 } else { 0.0 });
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Replace NaN and ±inf with 0.
    pub fn sanitize(&mut self) {
        for v in &mut self.values {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
    }

    /// Name → value map, the shape the scorer accepts.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        Feature::ALL
            .iter()
            .map(|&f| (f.name().to_string(), serde_json::Value::from(self.get(f))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_fixed() {
        assert_eq!(FEATURE_COUNT, 46);
        assert_eq!(Feature::ALL.len(), FEATURE_COUNT);
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(*f as usize, i);
            assert_eq!(f.name(), FEATURE_NAMES[i]);
        }
        assert_eq!(FEATURE_NAMES[0], "visit_number");
        assert_eq!(FEATURE_NAMES[FEATURE_COUNT - 1], "city_tier_very_high");
    }

    #[test]
    fn sanitize_zeroes_non_finite() {
        let mut v = FeatureVector::default();
        v.set(Feature::AvgTimePerPage, f64::NAN);
        v.set(Feature::EventsPerPage, f64::INFINITY);
        v.set(Feature::TotalHits, 3.0);
        v.sanitize();
        assert_eq!(v.get(Feature::AvgTimePerPage), 0.0);
        assert_eq!(v.get(Feature::EventsPerPage), 0.0);
        assert_eq!(v.get(Feature::TotalHits), 3.0);
    }
}
