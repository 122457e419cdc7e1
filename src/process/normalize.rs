// src/process/normalize.rs
//
// Commas are the CSV delimiter downstream, so both headers and cells swap
// them for semicolons. Headers keep word boundaries across line breaks;
// cells drop line breaks outright.

use once_cell::sync::Lazy;
use regex::Regex;

/// Textual stand-ins for "no value" that end up as empty cells.
const MISSING_PLACEHOLDERS: &[&str] = &["nan", "NaN", "None", "null"];

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n]+").expect("line-break pattern should compile"));

/// `"Reservation\nMaj./Cap./Enrl."` → `"Reservation Maj./Cap./Enrl."`
pub fn normalize_header(raw: &str) -> String {
    let semi = raw.replace(',', ";");
    LINE_BREAKS.replace_all(&semi, " ").trim().to_string()
}

/// `"A,B\n"` → `"A;B"`
pub fn normalize_cell(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c == ',' { ';' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if MISSING_PLACEHOLDERS.contains(&trimmed) {
        String::new()
    } else {
        trimmed.to_string()
    }
}
