//! Shared fixtures: synthetic clickstream and a small forest trained on engagement features.
#![allow(dead_code)]

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use session_conversion::features::{CityStatistics, Feature, FEATURE_COUNT, FEATURE_NAMES};
use session_conversion::model::ForestParams;
use session_conversion::{Hit, RandomForest, Session, TargetActionSet, TrainedModel};
use serde_json::{json, Value};

pub fn session(id: &str, date: &str, time: &str) -> Session {
    Session {
        session_id: id.to_string(),
        visit_date: date.to_string(),
        visit_time: time.to_string(),
        device_category: Some("mobile".to_string()),
        device_os: Some("iOS".to_string()),
        geo_city: Some("Moscow".to_string()),
        utm_medium: Some("cpc".to_string()),
        visit_number: 1,
    }
}

pub fn hit(session_id: &str, n: u32, path: &str, t: f64, action: &str) -> Hit {
    Hit {
        session_id: session_id.to_string(),
        hit_number: n,
        hit_page_path: Some(path.to_string()),
        hit_time: Some(t),
        event_action: Some(action.to_string()),
    }
}

/// Sessions with 6+ hits end in a submit action; shorter ones only browse.
pub fn clickstream(n: usize, seed: u64) -> (Vec<Session>, Vec<Hit>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let cities = [Some("Moscow"), Some("Saint Petersburg"), Some("Kazan"), None];
    let mediums = [Some("cpc"), Some("organic"), Some("referral"), Some("(none)"), None];
    let mut sessions = Vec::with_capacity(n);
    let mut hits = Vec::new();
    for i in 0..n {
        let id = format!("s{}", i);
        let mut s = session(
            &id,
            &format!("2021-11-{:02}", 1 + rng.gen_range(0..28)),
            &format!("{:02}:{:02}:00", rng.gen_range(0..24), rng.gen_range(0..60)),
        );
        s.geo_city = cities[rng.gen_range(0..cities.len())].map(String::from);
        s.utm_medium = mediums[rng.gen_range(0..mediums.len())].map(String::from);
        s.visit_number = rng.gen_range(1..5);
        sessions.push(s);

        let converting = i % 3 == 0;
        let k: u32 = if converting {
            rng.gen_range(6..12)
        } else {
            rng.gen_range(1..6)
        };
        let mut t = 0.0;
        for h in 1..=k {
            let action = if converting && h == k {
                "sub_submit_success"
            } else {
                "view_card"
            };
            hits.push(hit(&id, h, &format!("/page/{}", h % 4), t, action));
            t += rng.gen_range(5.0..90.0);
        }
    }
    (sessions, hits)
}

fn set(row: &mut [f64], f: Feature, v: f64) {
    row[f as usize] = v;
}

/// Forest where conversion follows total_hits >= 8; other columns present are noise.
pub fn engagement_model() -> TrainedModel {
    let n = 400;
    let mut rng = StdRng::seed_from_u64(7);
    let mut x = Array2::zeros((n, FEATURE_COUNT));
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = vec![0.0; FEATURE_COUNT];
        let hits: u32 = rng.gen_range(1..=20);
        let pages = hits.min(rng.gen_range(1..=10));
        let duration = f64::from(hits) * rng.gen_range(10.0..40.0);
        set(&mut row, Feature::VisitNumber, f64::from(rng.gen_range(1..5u32)));
        set(&mut row, Feature::TotalHits, f64::from(hits));
        set(&mut row, Feature::UniquePages, f64::from(pages));
        set(&mut row, Feature::SessionDuration, duration);
        set(&mut row, Feature::VisitHour, f64::from(rng.gen_range(0..24u32)));
        set(&mut row, Feature::IsMobile, f64::from(rng.gen_range(0..2u32)));
        set(&mut row, Feature::IsIos, f64::from(rng.gen_range(0..2u32)));
        set(&mut row, Feature::IsDesktop, f64::from(rng.gen_range(0..2u32)));
        set(&mut row, Feature::IsMoscow, f64::from(rng.gen_range(0..2u32)));
        set(&mut row, Feature::IsPaid, f64::from(rng.gen_range(0..2u32)));
        set(&mut row, Feature::BounceRate, f64::from(u8::from(hits == 1)));
        set(&mut row, Feature::DeepEngagement, f64::from(u8::from(pages >= 5)));
        set(&mut row, Feature::LongSession, f64::from(u8::from(duration > 300.0)));
        for (j, v) in row.into_iter().enumerate() {
            x[[i, j]] = v;
        }
        y.push(u8::from(hits >= 8));
    }
    let params = ForestParams {
        n_estimators: 25,
        max_depth: 8,
        min_samples_split: 2,
        min_samples_leaf: 1,
    };
    let forest = RandomForest::fit(x.view(), &y, params, 42);
    TrainedModel::new(
        forest,
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        TargetActionSet::default(),
        CityStatistics::default(),
    )
}

pub fn high_engagement() -> Value {
    json!({
        "total_hits": 15,
        "unique_pages": 8,
        "session_duration": 600,
        "visit_hour": 19,
        "is_mobile": 1,
        "is_ios": 1,
        "is_moscow": 1,
        "is_paid": 1,
        "bounce_rate": 0,
        "deep_engagement": 1,
        "long_session": 1
    })
}

pub fn low_engagement() -> Value {
    json!({
        "visit_number": 1,
        "total_hits": 2,
        "unique_pages": 1,
        "session_duration": 30,
        "visit_hour": 3,
        "is_desktop": 1,
        "bounce_rate": 1
    })
}
