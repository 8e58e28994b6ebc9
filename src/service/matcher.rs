//! Time-windowed DETRAF ↔ CDR matching.
//!
//! Key = exact equality of canonical (A, B) numbers. Among key-sharing calls
//! within ±5 minutes of the batch timestamp, the smallest absolute time
//! difference wins; exact ties go to the lowest CDR id so a rerun over the
//! same data always picks the same call. Each DETRAF record maps to at most
//! one call; one call may serve several DETRAF records.

use std::collections::HashMap;

use crate::models::{CdrRecord, DetrafRecord};
use crate::normalize::CanonicalNumber;

/// Matching tolerance: ±5 minutes.
pub const MATCH_TOLERANCE_SECS: i64 = 300;

/// DETRAF record with both numbers canonicalized.
#[derive(Debug, Clone)]
pub struct PreparedDetraf {
    pub rec: DetrafRecord,
    pub a: CanonicalNumber,
    pub b: CanonicalNumber,
}

/// CDR row with both numbers canonicalized.
#[derive(Debug, Clone)]
pub struct PreparedCdr {
    pub rec: CdrRecord,
    pub a: CanonicalNumber,
    pub b: CanonicalNumber,
}

/// A winning candidate: the call plus its signed offset from the batch
/// timestamp (positive = call later than the billing claim).
#[derive(Debug, Clone, Copy)]
pub struct MatchedCall<'a> {
    pub cdr: &'a PreparedCdr,
    pub diff_secs: i64,
}

/// Nearest-in-window match for every DETRAF record, keyed by DETRAF id.
/// Unmatched records are simply absent from the map.
pub fn match_window<'a>(
    batch: &[PreparedDetraf],
    calls: &'a [PreparedCdr],
) -> HashMap<i64, MatchedCall<'a>> {
    let mut by_key: HashMap<(&str, &str), Vec<&'a PreparedCdr>> = HashMap::new();
    for call in calls {
        by_key
            .entry((call.a.as_str(), call.b.as_str()))
            .or_default()
            .push(call);
    }

    let mut matches = HashMap::with_capacity(batch.len());
    for record in batch {
        let Some(candidates) = by_key.get(&(record.a.as_str(), record.b.as_str())) else {
            continue;
        };
        let best = candidates
            .iter()
            .filter_map(|call| {
                let diff = (call.rec.calldate - record.rec.data_hora).num_seconds();
                (diff.abs() <= MATCH_TOLERANCE_SECS).then_some((diff, *call))
            })
            .min_by_key(|(diff, call)| (diff.abs(), call.rec.id));
        if let Some((diff_secs, cdr)) = best {
            matches.insert(record.rec.id, MatchedCall { cdr, diff_secs });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, NumberRole};
    use chrono::{NaiveDate, NaiveDateTime};

    fn dt(secs_past_noon: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(secs_past_noon)
    }

    fn detraf(id: i64, a: &str, b: &str, at: NaiveDateTime) -> PreparedDetraf {
        PreparedDetraf {
            rec: DetrafRecord {
                id,
                sequencial: Some(id),
                assinante_a_numero: a.into(),
                eot_de_a: Some("010".into()),
                assinante_b_numero: b.into(),
                eot_de_b: Some("020".into()),
                data_hora: at,
            },
            a: normalize(a, NumberRole::A, None).unwrap(),
            b: normalize(b, NumberRole::B, None).unwrap(),
        }
    }

    fn cdr(id: i64, a: &str, b: &str, at: NaiveDateTime) -> PreparedCdr {
        PreparedCdr {
            rec: CdrRecord {
                id,
                calldate: at,
                src: a.into(),
                dst: b.into(),
                eot_a: Some("010".into()),
                eot_b: Some("020".into()),
                duration: Some(30),
                billsec: Some(25),
                disposition: Some("ANSWERED".into()),
            },
            a: normalize(a, NumberRole::A, None).unwrap(),
            b: normalize(b, NumberRole::B, None).unwrap(),
        }
    }

    const A: &str = "11987654321";
    const B: &str = "1133334444";

    #[test]
    fn single_candidate_within_window_matches() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![cdr(10, A, B, dt(120))];
        let m = match_window(&batch, &calls);
        assert_eq!(m[&1].cdr.rec.id, 10);
        assert_eq!(m[&1].diff_secs, 120);
    }

    #[test]
    fn nearest_in_time_wins() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![
            cdr(10, A, B, dt(-240)),
            cdr(11, A, B, dt(30)),
            cdr(12, A, B, dt(200)),
        ];
        let m = match_window(&batch, &calls);
        assert_eq!(m[&1].cdr.rec.id, 11);
        assert_eq!(m[&1].diff_secs, 30);
    }

    #[test]
    fn outside_tolerance_is_unmatched() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![cdr(10, A, B, dt(301)), cdr(11, A, B, dt(-301))];
        assert!(match_window(&batch, &calls).is_empty());
    }

    #[test]
    fn boundary_is_inclusive() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![cdr(10, A, B, dt(300))];
        let m = match_window(&batch, &calls);
        assert_eq!(m[&1].diff_secs, 300);
    }

    #[test]
    fn key_must_match_on_both_sides() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![
            cdr(10, A, "1144445555", dt(10)),
            cdr(11, "11999998888", B, dt(10)),
        ];
        assert!(match_window(&batch, &calls).is_empty());
    }

    #[test]
    fn exact_tie_breaks_on_lowest_cdr_id() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let calls = vec![cdr(42, A, B, dt(60)), cdr(7, A, B, dt(-60))];
        let m = match_window(&batch, &calls);
        assert_eq!(m[&1].cdr.rec.id, 7);
    }

    #[test]
    fn deterministic_under_input_reordering() {
        let batch = vec![detraf(1, A, B, dt(0))];
        let mut calls = vec![
            cdr(42, A, B, dt(60)),
            cdr(7, A, B, dt(-60)),
            cdr(30, A, B, dt(90)),
        ];
        let first_id = match_window(&batch, &calls)[&1].cdr.rec.id;
        calls.reverse();
        let second = match_window(&batch, &calls);
        assert_eq!(first_id, second[&1].cdr.rec.id);
    }

    #[test]
    fn one_call_may_serve_multiple_batch_records() {
        let batch = vec![detraf(1, A, B, dt(0)), detraf(2, A, B, dt(20))];
        let calls = vec![cdr(10, A, B, dt(10))];
        let m = match_window(&batch, &calls);
        assert_eq!(m[&1].cdr.rec.id, 10);
        assert_eq!(m[&2].cdr.rec.id, 10);
    }
}
