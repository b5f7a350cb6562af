//! Decomposes USGS `place` strings such as `"3km ENE of Springfield, IL"`.
//!
//! Grammar, left to right, every part optional except the locality:
//!
//! ```text
//! [<digits> <ws>* "km" <ws>*] [<1-3 of NSEW> <ws>* "of" <ws>*] <locality> ["," <ws>* <letters and spaces>]
//! ```
//!
//! Keywords and compass letters match case-insensitively. The locality runs to
//! the first comma, so a string with more than one comma, or a trailing segment
//! that is not purely letters and spaces, does not match. Strings that do not
//! match fall back to the whole trimmed input as the locality.
//!
//! Matching tries the optional prefixes as ordered alternatives and falls
//! back to the next one when the rest fails, the way a regex engine
//! backtracks. So `"3km N of , CA"` keeps the distance, gives up the
//! direction (its locality would be empty) and reads `"N of"` as the
//! locality. Each prefix has only a few candidates, so the search stays
//! linear in the input.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    /// Offset distance with its unit, e.g. `"3km"` or `"10 km"`.
    pub distance: Option<String>,
    /// Compass code, e.g. `"ENE"`.
    pub direction: Option<String>,
    pub nearest: String,
    /// State or territory token exactly as written, e.g. `"CA"` or `"Montana"`.
    pub state: Option<String>,
}

impl ParsedLocation {
    fn fallback(text: &str) -> Self {
        ParsedLocation {
            distance: None,
            direction: None,
            nearest: text.to_string(),
            state: None,
        }
    }
}

/// Parses a place string. Never fails: unmatched input becomes the locality.
pub fn parse_place(text: &str) -> ParsedLocation {
    let text = text.trim();

    // Alternatives in the order a backtracking matcher would try them:
    // with the distance prefix first, then without it.
    let distance_options = match match_distance(text) {
        Some((distance, rest)) => vec![(Some(distance), rest), (None, text)],
        None => vec![(None, text)],
    };

    for (distance, rest) in distance_options {
        let mut direction_options: Vec<(Option<&str>, &str)> = match_direction(rest)
            .into_iter()
            .map(|(direction, tail)| (Some(direction), tail))
            .collect();
        direction_options.push((None, rest));

        for (direction, tail) in direction_options {
            if let Some((nearest, state)) = match_tail(tail) {
                return ParsedLocation {
                    distance: distance.map(str::to_string),
                    direction: direction.map(str::to_string),
                    nearest: nearest.to_string(),
                    state: state.map(str::to_string),
                };
            }
        }
    }

    ParsedLocation::fallback(text)
}

/// `<digits> <ws>* km <ws>*`, returning the captured `"<digits><ws>km"` and
/// the remaining text.
fn match_distance(text: &str) -> Option<(&str, &str)> {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let after_digits = &text[digits..];
    let unit_start = digits + leading_whitespace(after_digits);
    let unit = text.get(unit_start..unit_start + 2)?;
    if !unit.eq_ignore_ascii_case("km") {
        return None;
    }

    let capture_end = unit_start + 2;
    let rest = &text[capture_end..];
    Some((&text[..capture_end], &rest[leading_whitespace(rest)..]))
}

/// Every way `<NSEW>{1,3} <ws>* of <ws>*` can match at the start of `text`,
/// longest compass code first.
fn match_direction(text: &str) -> Vec<(&str, &str)> {
    let letters = text
        .bytes()
        .take(3)
        .take_while(|b| matches!(b.to_ascii_uppercase(), b'N' | b'S' | b'E' | b'W'))
        .count();

    (1..=letters)
        .rev()
        .filter_map(|len| {
            let after_code = &text[len..];
            let of_start = len + leading_whitespace(after_code);
            let keyword = text.get(of_start..of_start + 2)?;
            if !keyword.eq_ignore_ascii_case("of") {
                return None;
            }
            let rest = &text[of_start + 2..];
            Some((&text[..len], &rest[leading_whitespace(rest)..]))
        })
        .collect()
}

/// `<locality> ["," <ws>* <state>]` anchored at the end of `text`. The
/// locality is trimmed and must not be empty.
fn match_tail(text: &str) -> Option<(&str, Option<&str>)> {
    let (nearest, state) = match text.find(',') {
        None => (text, None),
        Some(comma) => {
            let after = &text[comma + 1..];
            let state = &after[leading_whitespace(after)..];
            let valid_state =
                !state.is_empty() && state.chars().all(|c| c.is_ascii_alphabetic() || c == ' ');
            if !valid_state {
                return None;
            }
            (&text[..comma], Some(state))
        }
    };

    let nearest = nearest.trim();
    if nearest.is_empty() {
        return None;
    }

    Some((nearest, state))
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Converts an offset capture such as `"3km"` or `"12 km"` to kilometres.
pub fn offset_km(distance: &str) -> Result<f64> {
    let trimmed = distance.trim();
    let number = match trimmed.len().checked_sub(2) {
        Some(split)
            if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case("km") =>
        {
            trimmed[..split].trim_end()
        }
        _ => trimmed,
    };

    match number.parse::<f64>() {
        Ok(km) if km.is_finite() => Ok(km),
        _ => bail!("Offset distance '{}' is not a number of kilometres", distance),
    }
}

// -- Tests -------------------------------------------------------------------
