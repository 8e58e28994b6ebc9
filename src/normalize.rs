//! Number normalization for DETRAF and CDR sides.
//!
//! The CDR carries numbers in assorted formats (DDI/DDD prefixes, local
//! numbers without area code, 0800 with reverse charging). Both sources are
//! reduced to the same canonical national form before matching, and invalid
//! shapes are rejected rather than guessed at.

use crate::error::NormalizeError;

/// Which side of the call a raw number belongs to. The 0800 rules only apply
/// to the called party, and only the called party may borrow the caller's DDD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberRole {
    /// Calling party (origin).
    A,
    /// Called party (destination).
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberClass {
    /// 10 digits: DDD + 8-digit subscriber starting 2..5.
    Fixed,
    /// 11 digits: DDD + 9-digit subscriber starting 9.
    Mobile,
    /// 10 digits: "800" + 7 subscriber digits (reverse charging).
    TollFree,
}

/// A validated national-format number: digits only, no country code, length
/// and leading digits consistent with its class. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalNumber {
    digits: String,
    class: NumberClass,
}

impl CanonicalNumber {
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn class(&self) -> NumberClass {
        self.class
    }

    /// Two-digit DDD. Toll-free numbers have none.
    pub fn area_code(&self) -> Option<&str> {
        match self.class {
            NumberClass::TollFree => None,
            _ => Some(&self.digits[..2]),
        }
    }

    /// (prefix block, numeric sub-block) split used by CADUP range lookup:
    /// fixed = DDD + 4 + 4, mobile = DDD + 5 + 4.
    pub fn range_key(&self) -> Option<(&str, u32)> {
        let split = match self.class {
            NumberClass::Fixed => 6,
            NumberClass::Mobile => 7,
            NumberClass::TollFree => return None,
        };
        let suffix: u32 = self.digits[split..].parse().ok()?;
        Some((&self.digits[2..split], suffix))
    }

    fn classify(digits: &str) -> Option<NumberClass> {
        let bytes = digits.as_bytes();
        match bytes.len() {
            10 if digits.starts_with("800") => Some(NumberClass::TollFree),
            10 if matches!(bytes[2], b'2'..=b'5') => Some(NumberClass::Fixed),
            11 if bytes[2] == b'9' => Some(NumberClass::Mobile),
            _ => None,
        }
    }
}

impl std::fmt::Display for CanonicalNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.digits)
    }
}

fn strip_non_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Toll-free detection on the tail of the digit string. Canonical form is
/// always 10 digits ("800" + 7); an 0800 marker with fewer than 7 subscriber
/// digits is an unrecognized shape.
fn tollfree_tail(digits: &str) -> Option<String> {
    if digits.len() >= 11 && digits[digits.len() - 11..].starts_with("0800") {
        return Some(digits[digits.len() - 10..].to_string());
    }
    if digits.len() >= 10 && digits[digits.len() - 10..].starts_with("800") {
        return Some(digits[digits.len() - 10..].to_string());
    }
    None
}

/// Canonicalize `raw` according to the national numbering rules.
///
/// `ddd_hint` completes local numbers (no DDD) on the B side using the DDD of
/// the already-normalized A number of the same record.
pub fn normalize(
    raw: &str,
    role: NumberRole,
    ddd_hint: Option<&str>,
) -> Result<CanonicalNumber, NormalizeError> {
    let mut digits = strip_non_digits(raw);
    if digits.is_empty() {
        return Err(NormalizeError::Empty);
    }

    // Drop DDI 55 when present
    if digits.len() > 11 && digits.starts_with("55") {
        digits = digits[2..].to_string();
    }

    // Reverse-charging destinations take precedence over every length rule
    if role == NumberRole::B {
        if let Some(tf) = tollfree_tail(&digits) {
            return Ok(CanonicalNumber {
                digits: tf,
                class: NumberClass::TollFree,
            });
        }
    }

    let first = digits.as_bytes()[0];
    let third = digits.as_bytes().get(2).copied().unwrap_or(0);
    let completed = match (digits.len(), first) {
        // Local mobile without DDD
        (9, b'9') => match ddd_hint {
            Some(ddd) => format!("{ddd}{digits}"),
            None => return Err(NormalizeError::MissingAreaHint(digits)),
        },
        // Local fixed-line without DDD
        (8, b'2'..=b'5') => match ddd_hint {
            Some(ddd) => format!("{ddd}{digits}"),
            None => return Err(NormalizeError::MissingAreaHint(digits)),
        },
        (n, _) if n >= 11 && third == b'9' => digits[..11].to_string(),
        (n, _) if n >= 10 && matches!(third, b'2'..=b'5') => {
            digits[digits.len() - 10..].to_string()
        }
        _ => return Err(NormalizeError::UnrecognizedShape(digits)),
    };

    match CanonicalNumber::classify(&completed) {
        Some(class) => Ok(CanonicalNumber {
            digits: completed,
            class,
        }),
        None => Err(NormalizeError::UnrecognizedShape(completed)),
    }
}
