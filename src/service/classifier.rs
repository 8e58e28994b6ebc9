//! Per-pair classification.
//!
//! Compares the carrier's claimed EOTs against the matched CDR and against
//! the reference sources, and renders the outcome as a status plus ordered
//! human-readable notes. Also collects the stale-CDR observations feeding the
//! outdated-registry report.

use chrono::NaiveDateTime;

use crate::models::{
    BillingContext, ErrorCode, OutdatedEntry, ReconStatus, ReconciliationResult,
};
use crate::normalize::CanonicalNumber;
use crate::resolver::EotResolver;
use crate::service::matcher::{MatchedCall, PreparedDetraf};

/// Classified record plus any stale-CDR observations made along the way.
#[derive(Debug)]
pub struct ClassifyOutput {
    pub result: ReconciliationResult,
    pub outdated: Vec<OutdatedEntry>,
}

const ACCOUNT_RECOVERY_TAG: &str = "ACCOUNT_RECOVERY";

fn show(code: Option<&String>) -> &str {
    code.map(String::as_str).unwrap_or("NULL")
}

/// Outcome of comparing one side (A or B) of a matched, answered pair.
struct SideOutcome {
    diverged: bool,
    note: Option<String>,
}

/// Claimed-vs-stored comparison for one side, with the reference cross-check.
///
/// Divergent side, reference disagreeing with the CDR in effect at call time:
/// the CDR is considered stale rather than the carrier wrong. Agreeing side
/// with an in-effect reference disagreement: advisory note only.
fn check_side(
    label: &str,
    number: &CanonicalNumber,
    claimed: Option<&String>,
    stored: Option<&String>,
    calldate: NaiveDateTime,
    resolver: &EotResolver,
) -> SideOutcome {
    let resolution = resolver.resolve(number);
    let cdr_stale = resolution
        .as_ref()
        .filter(|r| Some(&r.eot) != stored && r.in_effect_at(calldate));

    if claimed == stored {
        let note = cdr_stale.map(|r| {
            let since = r
                .effective_since
                .map(|d| format!(" since {}", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            format!(
                "{label}: carrier and CDR agree (= {}), but {} reports {}{since}",
                show(stored),
                r.source,
                r.eot
            )
        });
        return SideOutcome {
            diverged: false,
            note,
        };
    }

    let note = match cdr_stale {
        Some(r) => {
            let ported = r
                .effective_since
                .map(|d| format!(" (ported on {})", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            format!(
                "CDR outdated at call time: CDR {label}={}; {}={}{ported}",
                show(stored),
                r.source,
                r.eot
            )
        }
        None => format!(
            "{label} divergence: carrier claims {}, CDR has {}",
            show(claimed),
            show(stored)
        ),
    };
    SideOutcome {
        diverged: true,
        note: Some(note),
    }
}

/// Stale-CDR observation for the outdated-registry report. Collected for
/// every matched pair, answered or not, whenever the reference disagrees
/// with the CDR and was in effect at call time.
fn collect_outdated(
    number: &CanonicalNumber,
    stored: Option<&String>,
    calldate: NaiveDateTime,
    resolver: &EotResolver,
) -> Option<OutdatedEntry> {
    let r = resolver.resolve(number)?;
    if Some(&r.eot) == stored || !r.in_effect_at(calldate) {
        return None;
    }
    Some(OutdatedEntry {
        number: number.as_str().to_string(),
        cdr_eot: stored.cloned(),
        authoritative_eot: r.eot,
        effective_since: r.effective_since,
    })
}

/// Classify one DETRAF record against its (possibly absent) matched call.
pub fn classify(
    batch: &PreparedDetraf,
    matched: Option<&MatchedCall<'_>>,
    resolver: &EotResolver,
    billing: &BillingContext,
) -> ClassifyOutput {
    let rec = &batch.rec;
    let mut notes = Vec::new();
    let mut outdated = Vec::new();

    let (status, error_code, cdr_id, diff_secs, cdr_eot_a, cdr_eot_b) = match matched {
        None => {
            notes.push("no CDR correspondence within +/-5 min".to_string());
            // Best effort: suggest an EOT from the static ranges only. The
            // portability registry is intentionally skipped here.
            if let Some(r) = resolver.resolve_range(&batch.a) {
                notes.push(format!("CADUP suggests EOT_A={}", r.eot));
            }
            if let Some(r) = resolver.resolve_range(&batch.b) {
                notes.push(format!("CADUP suggests EOT_B={}", r.eot));
            }
            (ReconStatus::Lost, None, None, None, None, None)
        }
        Some(m) => {
            let call = &m.cdr.rec;

            outdated.extend(collect_outdated(
                &m.cdr.a,
                call.eot_a.as_ref(),
                call.calldate,
                resolver,
            ));
            outdated.extend(collect_outdated(
                &m.cdr.b,
                call.eot_b.as_ref(),
                call.calldate,
                resolver,
            ));

            let (status, error_code) = if !call.answered() {
                let disposition = call.disposition.as_deref().unwrap_or("NULL");
                notes.push(format!(
                    "CDR not answered (disposition={})",
                    disposition.to_ascii_uppercase()
                ));
                (ReconStatus::Error, Some(ErrorCode::NotAnswered))
            } else {
                let side_a = check_side(
                    "EOT_A",
                    &m.cdr.a,
                    rec.eot_de_a.as_ref(),
                    call.eot_a.as_ref(),
                    call.calldate,
                    resolver,
                );
                let side_b = check_side(
                    "EOT_B",
                    &m.cdr.b,
                    rec.eot_de_b.as_ref(),
                    call.eot_b.as_ref(),
                    call.calldate,
                    resolver,
                );
                let (a_diverged, b_diverged) = (side_a.diverged, side_b.diverged);
                notes.extend(side_a.note);
                notes.extend(side_b.note);
                match (a_diverged, b_diverged) {
                    (false, false) => (ReconStatus::Reconciled, None),
                    (true, false) => (ReconStatus::Error, Some(ErrorCode::DivergentA)),
                    (false, true) => (ReconStatus::Error, Some(ErrorCode::DivergentB)),
                    (true, true) => (ReconStatus::Error, Some(ErrorCode::DivergentBoth)),
                }
            };

            (
                status,
                error_code,
                Some(call.id),
                Some(m.diff_secs),
                call.eot_a.clone(),
                call.eot_b.clone(),
            )
        }
    };

    // Orthogonal reporting dimension: claims outside the billing window are
    // account recovery, whatever their status.
    if !billing.contains(rec.data_hora) {
        notes.push(ACCOUNT_RECOVERY_TAG.to_string());
    }

    ClassifyOutput {
        result: ReconciliationResult {
            detraf_id: rec.id,
            cdr_id,
            status,
            error_code,
            diff_secs,
            batch_time: rec.data_hora,
            a_number: batch.a.as_str().to_string(),
            b_number: batch.b.as_str().to_string(),
            claimed_eot_a: rec.eot_de_a.clone(),
            claimed_eot_b: rec.eot_de_b.clone(),
            cdr_eot_a,
            cdr_eot_b,
            notes,
        },
        outdated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CdrRecord, DetrafRecord, PortabilityEntry, RangeAssignment};
    use crate::normalize::{normalize, NumberRole};
    use crate::service::matcher::PreparedCdr;
    use chrono::{NaiveDate, NaiveDateTime};

    const A: &str = "11987654321";
    const B: &str = "1133334444";

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn call_time() -> NaiveDateTime {
        dt("2025-05-10 12:00:00")
    }

    fn billing() -> BillingContext {
        BillingContext::from_period("202505").unwrap()
    }

    fn detraf(eot_a: &str, eot_b: &str, at: NaiveDateTime) -> PreparedDetraf {
        PreparedDetraf {
            rec: DetrafRecord {
                id: 1,
                sequencial: Some(1),
                assinante_a_numero: A.into(),
                eot_de_a: Some(eot_a.into()),
                assinante_b_numero: B.into(),
                eot_de_b: Some(eot_b.into()),
                data_hora: at,
            },
            a: normalize(A, NumberRole::A, None).unwrap(),
            b: normalize(B, NumberRole::B, None).unwrap(),
        }
    }

    fn cdr(eot_a: &str, eot_b: &str, disposition: &str) -> PreparedCdr {
        PreparedCdr {
            rec: CdrRecord {
                id: 77,
                calldate: call_time(),
                src: A.into(),
                dst: B.into(),
                eot_a: Some(eot_a.into()),
                eot_b: Some(eot_b.into()),
                duration: Some(60),
                billsec: Some(55),
                disposition: Some(disposition.into()),
            },
            a: normalize(A, NumberRole::A, None).unwrap(),
            b: normalize(B, NumberRole::B, None).unwrap(),
        }
    }

    fn empty_resolver() -> EotResolver {
        EotResolver::new(vec![], vec![])
    }

    fn ported(number: &str, eot: &str, since: &str) -> PortabilityEntry {
        PortabilityEntry {
            number: number.into(),
            eot: eot.into(),
            effective_since: dt(since),
        }
    }

    fn classify_pair(
        batch: &PreparedDetraf,
        cdr: &PreparedCdr,
        resolver: &EotResolver,
    ) -> ClassifyOutput {
        let matched = MatchedCall { cdr, diff_secs: 30 };
        classify(batch, Some(&matched), resolver, &billing())
    }

    #[test]
    fn clean_match_reconciles_without_notes() {
        let out = classify_pair(
            &detraf("010", "020", call_time()),
            &cdr("010", "020", "ANSWERED"),
            &empty_resolver(),
        );
        assert_eq!(out.result.status, ReconStatus::Reconciled);
        assert_eq!(out.result.error_code, None);
        assert!(out.result.notes.is_empty());
        assert_eq!(out.result.cdr_id, Some(77));
        assert!(out.outdated.is_empty());
    }

    #[test]
    fn unanswered_call_is_error_regardless_of_codes() {
        let out = classify_pair(
            &detraf("010", "020", call_time()),
            &cdr("010", "020", "NO ANSWER"),
            &empty_resolver(),
        );
        assert_eq!(out.result.status, ReconStatus::Error);
        assert_eq!(out.result.error_code, Some(ErrorCode::NotAnswered));
        assert_eq!(
            out.result.notes,
            vec!["CDR not answered (disposition=NO ANSWER)".to_string()]
        );
    }

    #[test]
    fn plain_divergence_on_a_side() {
        let out = classify_pair(
            &detraf("011", "020", call_time()),
            &cdr("010", "020", "ANSWERED"),
            &empty_resolver(),
        );
        assert_eq!(out.result.status, ReconStatus::Error);
        assert_eq!(out.result.error_code, Some(ErrorCode::DivergentA));
        assert_eq!(
            out.result.notes,
            vec!["EOT_A divergence: carrier claims 011, CDR has 010".to_string()]
        );
    }

    #[test]
    fn both_sides_divergent() {
        let out = classify_pair(
            &detraf("011", "021", call_time()),
            &cdr("010", "020", "ANSWERED"),
            &empty_resolver(),
        );
        assert_eq!(out.result.error_code, Some(ErrorCode::DivergentBoth));
        assert_eq!(out.result.notes.len(), 2);
    }

    #[test]
    fn stale_cdr_note_when_reference_predates_call() {
        // Carrier claims 021 for B; CDR has 030; registry says 021 since
        // before the call: the CDR is the stale party.
        let resolver = EotResolver::new(vec![ported(B, "021", "2025-04-01 00:00:00")], vec![]);
        let out = classify_pair(
            &detraf("010", "021", call_time()),
            &cdr("010", "030", "ANSWERED"),
            &resolver,
        );
        assert_eq!(out.result.status, ReconStatus::Error);
        assert_eq!(out.result.error_code, Some(ErrorCode::DivergentB));
        assert_eq!(
            out.result.notes,
            vec![
                "CDR outdated at call time: CDR EOT_B=030; portability registry=021 (ported on 2025-04-01)"
                    .to_string()
            ]
        );
        assert_eq!(out.outdated.len(), 1);
        assert_eq!(out.outdated[0].number, B);
        assert_eq!(out.outdated[0].cdr_eot.as_deref(), Some("030"));
        assert_eq!(out.outdated[0].authoritative_eot, "021");
    }

    #[test]
    fn reference_after_call_gives_plain_divergence() {
        let resolver = EotResolver::new(vec![ported(B, "021", "2025-05-20 00:00:00")], vec![]);
        let out = classify_pair(
            &detraf("010", "021", call_time()),
            &cdr("010", "030", "ANSWERED"),
            &resolver,
        );
        assert_eq!(
            out.result.notes,
            vec!["EOT_B divergence: carrier claims 021, CDR has 030".to_string()]
        );
        // Not in effect at call time: no outdated observation either
        assert!(out.outdated.is_empty());
    }

    #[test]
    fn advisory_note_when_sides_agree_but_registry_differs() {
        let resolver = EotResolver::new(vec![ported(A, "055", "2025-04-01 00:00:00")], vec![]);
        let out = classify_pair(
            &detraf("010", "020", call_time()),
            &cdr("010", "020", "ANSWERED"),
            &resolver,
        );
        // Advisory never downgrades the status
        assert_eq!(out.result.status, ReconStatus::Reconciled);
        assert_eq!(
            out.result.notes,
            vec![
                "EOT_A: carrier and CDR agree (= 010), but portability registry reports 055 since 2025-04-01"
                    .to_string()
            ]
        );
        assert_eq!(out.outdated.len(), 1);
    }

    #[test]
    fn outdated_collected_even_for_unanswered_calls() {
        let resolver = EotResolver::new(vec![ported(A, "055", "2025-04-01 00:00:00")], vec![]);
        let out = classify_pair(
            &detraf("010", "020", call_time()),
            &cdr("010", "020", "BUSY"),
            &resolver,
        );
        assert_eq!(out.result.error_code, Some(ErrorCode::NotAnswered));
        assert_eq!(out.outdated.len(), 1);
        assert_eq!(out.outdated[0].authoritative_eot, "055");
    }

    #[test]
    fn lost_with_range_suggestions() {
        let resolver = EotResolver::new(
            // Portability must be ignored for lost records
            vec![ported(A, "099", "2025-01-01 00:00:00")],
            vec![RangeAssignment {
                area_code: "11".into(),
                prefix: "3333".into(),
                block_start: 0,
                block_end: 9999,
                eot: "014".into(),
            }],
        );
        let out = classify(
            &detraf("010", "020", call_time()),
            None,
            &resolver,
            &billing(),
        );
        assert_eq!(out.result.status, ReconStatus::Lost);
        assert_eq!(out.result.cdr_id, None);
        assert_eq!(
            out.result.notes,
            vec![
                "no CDR correspondence within +/-5 min".to_string(),
                "CADUP suggests EOT_B=014".to_string(),
            ]
        );
        assert!(out.outdated.is_empty());
    }

    #[test]
    fn lost_without_any_range_hit_keeps_single_note() {
        let out = classify(
            &detraf("010", "020", call_time()),
            None,
            &empty_resolver(),
            &billing(),
        );
        assert_eq!(out.result.status, ReconStatus::Lost);
        assert_eq!(
            out.result.notes,
            vec!["no CDR correspondence within +/-5 min".to_string()]
        );
    }

    #[test]
    fn account_recovery_tag_is_orthogonal() {
        let old = NaiveDate::from_ymd_opt(2025, 2, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let lost = classify(&detraf("010", "020", old), None, &empty_resolver(), &billing());
        assert_eq!(lost.result.status, ReconStatus::Lost);
        assert_eq!(lost.result.notes.last().map(String::as_str), Some("ACCOUNT_RECOVERY"));

        let matched = classify_pair(
            &detraf("010", "020", old),
            &cdr("010", "020", "ANSWERED"),
            &empty_resolver(),
        );
        assert_eq!(matched.result.status, ReconStatus::Reconciled);
        assert_eq!(
            matched.result.notes,
            vec!["ACCOUNT_RECOVERY".to_string()]
        );
    }
}
