//! State name expansion and country classification.

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

pub const UNITED_STATES: &str = "United States";
pub const NORTH_AMERICA: &str = "North America";
pub const UNKNOWN: &str = "Unknown";

const STATE_ABBREVIATIONS: [(&str, &str); 54] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
    // territories
    ("PR", "Puerto Rico"),
    ("GU", "Guam"),
    ("MP", "Northern Mariana Islands"),
    ("AS", "American Samoa"),
];

const US_TERRITORIES: [&str; 4] = [
    "Puerto Rico",
    "Guam",
    "Northern Mariana Islands",
    "American Samoa",
];

static ABBREVIATION_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| STATE_ABBREVIATIONS.iter().copied().collect());

static US_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    STATE_ABBREVIATIONS
        .iter()
        .map(|(_, name)| *name)
        .chain(US_TERRITORIES)
        .collect()
});

/// Expands a two-letter code to the full state name. Unknown tokens are
/// returned trimmed but otherwise unchanged; absence stays absent.
pub fn expand_state_name(state: Option<&str>) -> Option<String> {
    let state = state?.trim();
    let expanded = ABBREVIATION_MAP.get(state).copied().unwrap_or(state);

    Some(expanded.to_string())
}

/// `(country, continent)` for a full state name.
pub fn country_continent(state: Option<&str>) -> (&'static str, &'static str) {
    match state.map(str::trim) {
        Some(name) if US_NAMES.contains(name) => (UNITED_STATES, NORTH_AMERICA),
        _ => (UNKNOWN, UNKNOWN),
    }
}

// -- Tests -------------------------------------------------------------------
