//! Authoritative EOT resolution.
//!
//! Reference data is prefetched into owned maps at the start of a run, so
//! resolution is a pure in-memory lookup: latest portability entry for the
//! exact number first, CADUP numbering block second. The portability lookup
//! deliberately applies no time filter; callers compare `effective_since`
//! against the call timestamp to decide whether the entry applied.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{PortabilityEntry, RangeAssignment};
use crate::normalize::CanonicalNumber;

/// Which reference source produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EotSource {
    Portability,
    Range,
}

impl std::fmt::Display for EotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Portability => f.write_str("portability registry"),
            Self::Range => f.write_str("CADUP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub eot: String,
    pub source: EotSource,
    pub effective_since: Option<NaiveDateTime>,
}

impl Resolution {
    /// Range assignments carry no effective date and are treated as always
    /// in effect.
    pub fn in_effect_at(&self, t: NaiveDateTime) -> bool {
        self.effective_since.map_or(true, |since| since <= t)
    }
}

/// Per-run resolver over owned reference collections.
pub struct EotResolver {
    /// Latest portability entry per canonical number.
    portability: HashMap<String, PortabilityEntry>,
    /// Range assignments per (area code, prefix block).
    ranges: HashMap<(String, String), Vec<RangeAssignment>>,
}

impl EotResolver {
    pub fn new(entries: Vec<PortabilityEntry>, assignments: Vec<RangeAssignment>) -> Self {
        let mut portability: HashMap<String, PortabilityEntry> = HashMap::new();
        for entry in entries {
            match portability.get(&entry.number) {
                Some(current) if current.effective_since >= entry.effective_since => {}
                _ => {
                    portability.insert(entry.number.clone(), entry);
                }
            }
        }

        let mut ranges: HashMap<(String, String), Vec<RangeAssignment>> = HashMap::new();
        for assignment in assignments {
            ranges
                .entry((assignment.area_code.clone(), assignment.prefix.clone()))
                .or_default()
                .push(assignment);
        }

        Self { portability, ranges }
    }

    /// Authoritative EOT for `number`: portability first, range fallback.
    pub fn resolve(&self, number: &CanonicalNumber) -> Option<Resolution> {
        if let Some(entry) = self.portability.get(number.as_str()) {
            return Some(Resolution {
                eot: entry.eot.clone(),
                source: EotSource::Portability,
                effective_since: Some(entry.effective_since),
            });
        }
        self.resolve_range(number)
    }

    /// Range-only lookup. Used directly when enriching lost records, where
    /// the portability registry is intentionally skipped.
    pub fn resolve_range(&self, number: &CanonicalNumber) -> Option<Resolution> {
        let area = number.area_code()?;
        let (prefix, suffix) = number.range_key()?;
        let assignments = self.ranges.get(&(area.to_string(), prefix.to_string()))?;
        assignments
            .iter()
            .find(|a| a.covers(suffix))
            .map(|a| Resolution {
                eot: a.eot.clone(),
                source: EotSource::Range,
                effective_since: None,
            })
    }
}
