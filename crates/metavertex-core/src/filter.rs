// Detects and strips contact details from mediated free text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Replacement for every redacted span.
pub const REDACTED: &str = "[contact removed]";

/// Minimum digit count for a run to count as a phone number.
const MIN_PHONE_DIGITS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Url,
    Messenger,
    Handle,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMatch {
    pub kind: ContactKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").unwrap());

static MESSENGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:whatsapp|telegram)\b[\s:]*(?:@\w{3,}|\+?\d[\d\s-]{4,}\d)").unwrap()
});

static HANDLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\B@\w{3,}").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]*\d").unwrap());

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4})$").unwrap()
});

/// Digit runs that are dates or lists of years are not phone numbers.
fn is_phone(candidate: &str) -> bool {
    if candidate.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        return false;
    }
    if DATE.is_match(candidate) {
        return false;
    }
    let all_years = candidate
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .all(|group| group.len() == 4 && (group.starts_with("19") || group.starts_with("20")));
    !all_years
}

/// Find every contact detail in `text`, in order of appearance. Overlapping
/// candidates resolve in favour of the more specific kind (an email is never
/// also reported as a handle).
pub fn scan(text: &str) -> Vec<ContactMatch> {
    let patterns: [(ContactKind, &Lazy<Regex>); 5] = [
        (ContactKind::Email, &EMAIL),
        (ContactKind::Url, &URL),
        (ContactKind::Messenger, &MESSENGER),
        (ContactKind::Handle, &HANDLE),
        (ContactKind::Phone, &PHONE),
    ];

    let mut found: Vec<ContactMatch> = Vec::new();
    for (kind, re) in patterns {
        for m in re.find_iter(text) {
            if kind == ContactKind::Phone && !is_phone(m.as_str()) {
                continue;
            }
            let overlaps = found
                .iter()
                .any(|existing| m.start() < existing.end && existing.start < m.end());
            if !overlaps {
                found.push(ContactMatch {
                    kind,
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
    }
    found.sort_by_key(|m| m.start);
    found
}

pub fn contains_contact(text: &str) -> bool {
    !scan(text).is_empty()
}

/// Replace each detected contact detail with [`REDACTED`].
pub fn redact(text: &str) -> String {
    let matches = scan(text);
    if matches.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in matches {
        out.push_str(&text[cursor..m.start]);
        out.push_str(REDACTED);
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}
