use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Language used for month names and the `%x`/`%X` shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateLocale {
    #[default]
    Fr,
    En,
}

const FRENCH_MONTHS: [(&str, &str); 15] = [
    ("janvier", "January"),
    ("février", "February"),
    ("fevrier", "February"),
    ("mars", "March"),
    ("avril", "April"),
    ("mai", "May"),
    ("juin", "June"),
    ("juillet", "July"),
    ("août", "August"),
    ("aout", "August"),
    ("septembre", "September"),
    ("octobre", "October"),
    ("novembre", "November"),
    ("décembre", "December"),
    ("decembre", "December"),
];

impl DateLocale {
    fn expand(&self, format: &str) -> String {
        let date = match self {
            DateLocale::Fr => "%d/%m/%Y",
            DateLocale::En => "%m/%d/%Y",
        };
        format.replace("%X", "%H:%M:%S").replace("%x", date)
    }
}

fn french_month(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    FRENCH_MONTHS
        .iter()
        .find(|(fr, _)| *fr == lower)
        .map(|(_, en)| *en)
}

/// Rewrites each alphabetic word through `lookup`. A word the lookup rejects
/// rejects the whole text.
fn translate_words(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let flush = |word: &mut String, out: &mut String| -> Option<()> {
        if !word.is_empty() {
            out.push_str(&lookup(word.as_str())?);
            word.clear();
        }
        Some(())
    };
    for ch in text.chars() {
        if ch.is_alphabetic() {
            word.push(ch);
        } else {
            flush(&mut word, &mut out)?;
            out.push(ch);
        }
    }
    flush(&mut word, &mut out)?;
    Some(out)
}

/// Lowercased literal words of a strftime pattern, skipping `%` directives.
fn literal_words(pattern: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch.is_alphabetic() {
            word.push(ch);
            continue;
        }
        if !word.is_empty() {
            words.push(word.to_lowercase());
            word.clear();
        }
        if ch == '%' {
            // flags such as `%-d` come before the specifier letter
            for next in chars.by_ref() {
                if next.is_alphabetic() || next == '%' {
                    break;
                }
            }
        }
    }
    if !word.is_empty() {
        words.push(word.to_lowercase());
    }
    words
}

/// A strftime pattern bound to a locale, used for the export's timestamp columns.
/// Under `Fr` the only words accepted are French month names and words written
/// literally in the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    locale: DateLocale,
    literals: Vec<String>,
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self::new("%d %B %Y %X", DateLocale::Fr)
    }
}

impl TimestampFormat {
    pub fn new(format: &str, locale: DateLocale) -> Self {
        let pattern = locale.expand(format);
        Self {
            literals: literal_words(&pattern),
            pattern,
            locale,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        let localized = match self.locale {
            DateLocale::En => text.to_string(),
            DateLocale::Fr => translate_words(text, |word| {
                french_month(word).map(str::to_string).or_else(|| {
                    self.literals
                        .contains(&word.to_lowercase())
                        .then(|| word.to_string())
                })
            })?,
        };
        NaiveDateTime::parse_from_str(&localized, &self.pattern)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(&localized, &self.pattern)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

const DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d %B %Y"];

/// Shown when an interval endpoint is rejected.
pub const INTERVAL_FORMAT_HINT: &str =
    "expected YYYY-MM-DD HH:MM, or DD/MM/YYYY HH:MM with the day first (02/01/2024 is 2 January)";

/// Lenient parse for hand-typed interval endpoints. Date-only text means midnight;
/// slashed dates are day-first.
pub fn parse_interval_bound(text: &str) -> Option<NaiveDateTime> {
    let text = translate_words(text.trim(), |word| {
        Some(french_month(word).unwrap_or(word).to_string())
    })?;
    if text.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(&text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&text, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Never fails; unparseable or empty text is simply `false`.
pub fn is_valid_datetime(text: &str) -> bool {
    parse_interval_bound(text).is_some()
}
