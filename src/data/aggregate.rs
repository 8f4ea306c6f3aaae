//! Per-session statistics over hits: label, counts, distinct pages/events, duration.

use super::Hit;
use crate::labels::is_target_action;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitAggregate {
    /// Any hit matched a target keyword
    pub is_target: bool,
    pub total_hits: u32,
    /// Distinct non-null page paths
    pub unique_pages: u32,
    /// max(hit_time) - min(hit_time); 0 for sessions with a single hit
    pub session_duration: f64,
    /// Distinct non-null event actions
    pub unique_events: u32,
}

#[derive(Default)]
struct Acc<'a> {
    is_target: bool,
    count: u32,
    pages: HashSet<&'a str>,
    events: HashSet<&'a str>,
    min_time: Option<f64>,
    max_time: Option<f64>,
}

/// Group hits by session and fold each group into a [`HitAggregate`].
pub fn aggregate_hits(hits: &[Hit]) -> HashMap<String, HitAggregate> {
    let mut groups: HashMap<&str, Acc<'_>> = HashMap::new();
    for h in hits {
        let acc = groups.entry(h.session_id.as_str()).or_default();
        acc.count += 1;
        if let Some(ref p) = h.hit_page_path {
            acc.pages.insert(p.as_str());
        }
        if let Some(ref a) = h.event_action {
            acc.events.insert(a.as_str());
            acc.is_target |= is_target_action(a);
        }
        if let Some(t) = h.hit_time.filter(|t| t.is_finite()) {
            acc.min_time = Some(acc.min_time.map_or(t, |m| m.min(t)));
            acc.max_time = Some(acc.max_time.map_or(t, |m| m.max(t)));
        }
    }

    groups
        .into_iter()
        .map(|(id, acc)| {
            let session_duration = match (acc.count > 1, acc.min_time, acc.max_time) {
                (true, Some(lo), Some(hi)) => hi - lo,
                _ => 0.0,
            };
            (
                id.to_string(),
                HitAggregate {
                    is_target: acc.is_target,
                    total_hits: acc.count,
                    unique_pages: acc.pages.len() as u32,
                    session_duration,
                    unique_events: acc.events.len() as u32,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(session: &str, n: u32, path: &str, t: f64, action: &str) -> Hit {
        Hit {
            session_id: session.to_string(),
            hit_number: n,
            hit_page_path: Some(path.to_string()),
            hit_time: Some(t),
            event_action: Some(action.to_string()),
        }
    }

    #[test]
    fn aggregates_per_session() {
        let hits = vec![
            hit("s1", 1, "/", 0.0, "view_card"),
            hit("s1", 2, "/cars", 120.0, "view_card"),
            hit("s1", 3, "/cars", 450.0, "sub_submit_success"),
            hit("s2", 1, "/", 9000.0, "view_card"),
        ];
        let agg = aggregate_hits(&hits);

        let s1 = &agg["s1"];
        assert!(s1.is_target);
        assert_eq!(s1.total_hits, 3);
        assert_eq!(s1.unique_pages, 2);
        assert_eq!(s1.unique_events, 2);
        assert_eq!(s1.session_duration, 450.0);

        let s2 = &agg["s2"];
        assert!(!s2.is_target);
        assert_eq!(s2.total_hits, 1);
        assert_eq!(s2.session_duration, 0.0);
    }
}
