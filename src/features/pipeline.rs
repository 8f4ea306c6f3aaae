//! Feature pipeline: session row + hit aggregate + frozen city table → feature vector,
//! and the batch form that builds the training matrix.

use super::{CityStatistics, CityTier, Feature, FeatureVector, FEATURE_COUNT};
use crate::data::{HitAggregate, Session};
use crate::error::FeatureError;
use chrono::{Datelike, NaiveDateTime, Timelike};
use ndarray::Array2;
use std::collections::HashMap;
use tracing::{debug, warn};

const MOSCOW: &str = "Moscow";
const SAINT_PETERSBURG: &str = "Saint Petersburg";
const UNPAID_MEDIUMS: [&str; 3] = ["organic", "referral", "(none)"];

/// Training matrix and labels, one row per derivable session.
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<u8>,
    /// Sessions dropped because a feature could not be derived
    pub skipped: usize,
}

pub struct FeatureDeriver<'a> {
    cities: &'a CityStatistics,
}

impl<'a> FeatureDeriver<'a> {
    pub fn new(cities: &'a CityStatistics) -> Self {
        Self { cities }
    }

    /// Derive the full vector for one session. `hits` is `None` when the session logged no hits.
    pub fn derive(
        &self,
        session: &Session,
        hits: Option<&HitAggregate>,
    ) -> Result<FeatureVector, FeatureError> {
        let agg = hits.cloned().unwrap_or_default();
        let mut v = FeatureVector::default();

        v.set(Feature::VisitNumber, f64::from(session.visit_number));
        v.set(Feature::TotalHits, f64::from(agg.total_hits));
        v.set(Feature::UniquePages, f64::from(agg.unique_pages));
        v.set(Feature::SessionDuration, agg.session_duration);
        v.set(Feature::UniqueEvents, f64::from(agg.unique_events));

        self.temporal(&mut v, session)?;
        Self::device(&mut v, session);
        self.geography(&mut v, session);
        Self::traffic(&mut v, session);
        Self::behavioral(&mut v, &agg);

        v.set_flag(Feature::IsReturning, session.visit_number > 1);
        v.set_flag(Feature::IsFrequent, session.visit_number >= 3);

        v.sanitize();
        Ok(v)
    }

    fn temporal(&self, v: &mut FeatureVector, s: &Session) -> Result<(), FeatureError> {
        let raw = format!("{} {}", s.visit_date.trim(), s.visit_time.trim());
        let ts = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S").map_err(|_| {
            FeatureError::InvalidTimestamp {
                session_id: s.session_id.clone(),
                value: raw.clone(),
            }
        })?;
        let hour = ts.hour();
        let weekday = ts.weekday().num_days_from_monday();
        let weekend = weekday >= 5;

        v.set(Feature::VisitHour, f64::from(hour));
        v.set(Feature::VisitWeekday, f64::from(weekday));
        v.set_flag(Feature::IsWeekend, weekend);
        v.set_flag(Feature::IsWorkday, !weekend);
        v.set_flag(Feature::IsMorning, (6..=11).contains(&hour));
        v.set_flag(Feature::IsAfternoon, (12..=17).contains(&hour));
        v.set_flag(Feature::IsEvening, (18..=23).contains(&hour));
        v.set_flag(Feature::IsNight, hour <= 5);
        Ok(())
    }

    /// Category and OS flags are independent; contradictory combinations pass through.
    fn device(v: &mut FeatureVector, s: &Session) {
        let category = s.device_category.as_deref();
        let os = s.device_os.as_deref();
        v.set_flag(Feature::IsMobile, category == Some("mobile"));
        v.set_flag(Feature::IsDesktop, category == Some("desktop"));
        v.set_flag(Feature::IsTablet, category == Some("tablet"));
        v.set_flag(Feature::IsAndroid, os == Some("Android"));
        v.set_flag(Feature::IsIos, os == Some("iOS"));
        v.set_flag(Feature::IsWindows, os == Some("Windows"));
        v.set_flag(Feature::IsMacos, os == Some("macOS"));
    }

    fn geography(&self, v: &mut FeatureVector, s: &Session) {
        let city = s.geo_city.as_deref();
        let stats = self.cities.lookup(city);

        v.set_flag(Feature::IsMoscow, city == Some(MOSCOW));
        v.set_flag(Feature::IsSpb, city == Some(SAINT_PETERSBURG));
        v.set_flag(Feature::IsMillionPlus, stats.sessions >= 1000);
        v.set_flag(Feature::IsRegionalCenter, stats.sessions >= 500);
        v.set(Feature::CityConversionRate, stats.conversion_rate);
        v.set(Feature::CityAvgDuration, stats.avg_duration);
        v.set(Feature::CityAvgHits, stats.avg_hits);
        v.set_flag(Feature::CityTierLow, stats.tier == CityTier::Low);
        v.set_flag(Feature::CityTierMedium, stats.tier == CityTier::Medium);
        v.set_flag(Feature::CityTierHigh, stats.tier == CityTier::High);
        v.set_flag(Feature::CityTierVeryHigh, stats.tier == CityTier::VeryHigh);
    }

    /// A missing medium counts as paid; the four flags are not forced to be exclusive.
    fn traffic(v: &mut FeatureVector, s: &Session) {
        let medium = s.utm_medium.as_deref();
        let unpaid = medium.is_some_and(|m| UNPAID_MEDIUMS.contains(&m));
        v.set_flag(Feature::IsPaid, !unpaid);
        v.set_flag(Feature::IsOrganic, medium == Some("organic"));
        v.set_flag(Feature::IsReferral, medium == Some("referral"));
        v.set_flag(Feature::IsDirect, medium == Some("(none)"));
    }

    fn behavioral(v: &mut FeatureVector, agg: &HitAggregate) {
        let hits = f64::from(agg.total_hits);
        let pages = f64::from(agg.unique_pages);
        let duration = agg.session_duration;

        v.set(Feature::AvgTimePerPage, finite_or_zero(duration / hits));
        v.set_flag(Feature::BounceRate, agg.total_hits == 1);
        v.set_flag(Feature::DeepEngagement, agg.unique_pages >= 5);
        v.set_flag(Feature::LongSession, duration > 300.0);
        v.set_flag(Feature::VeryLongSession, duration > 600.0);
        v.set_flag(Feature::HighActivity, agg.total_hits >= 10);
        v.set_flag(Feature::VeryHighActivity, agg.total_hits >= 15);
        v.set(
            Feature::EventsPerPage,
            finite_or_zero(f64::from(agg.unique_events) / pages),
        );
        v.set(Feature::EngagementScore, hits * pages * duration / 1000.0);
    }

    /// Build the training matrix. Sessions whose features cannot be derived are skipped.
    pub fn build_dataset(
        &self,
        sessions: &[Session],
        aggregates: &HashMap<String, HitAggregate>,
    ) -> Dataset {
        let mut values = Vec::with_capacity(sessions.len() * FEATURE_COUNT);
        let mut y = Vec::with_capacity(sessions.len());
        let mut skipped = 0usize;

        for s in sessions {
            let agg = aggregates.get(&s.session_id);
            match self.derive(s, agg) {
                Ok(fv) => {
                    values.extend_from_slice(fv.as_slice());
                    y.push(u8::from(agg.is_some_and(|a| a.is_target)));
                }
                Err(e) => {
                    skipped += 1;
                    debug!(error = %e, "session skipped");
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, "sessions without derivable features were dropped");
        }

        let rows = y.len();
        let x = Array2::from_shape_vec((rows, FEATURE_COUNT), values)
            .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COUNT)));
        Dataset { x, y, skipped }
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
