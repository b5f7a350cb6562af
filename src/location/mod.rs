//! Turns free-text event locations into state, country and region labels.

pub mod place;
pub mod region;
pub mod states;

pub use place::{offset_km, parse_place, ParsedLocation};
pub use region::{region_for, NON_US};
pub use states::{country_continent, expand_state_name, UNITED_STATES};

/// A parsed place with its state expanded and classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub parsed: ParsedLocation,
    pub state: Option<String>,
    pub country: &'static str,
    pub continent: &'static str,
}

impl ResolvedLocation {
    pub fn from_place(text: &str) -> Self {
        let parsed = parse_place(text);
        let state = expand_state_name(parsed.state.as_deref());
        let (country, continent) = country_continent(state.as_deref());

        ResolvedLocation {
            parsed,
            state,
            country,
            continent,
        }
    }

    pub fn is_united_states(&self) -> bool {
        self.country == UNITED_STATES
    }
}

// -- Tests -------------------------------------------------------------------
