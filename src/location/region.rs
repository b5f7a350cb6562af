//! Census regions for US states.

use std::{collections::HashMap, sync::LazyLock};

pub const NON_US: &str = "Non-US";

pub const REGIONS: [(&str, &[&str]); 4] = [
    (
        "Northeast",
        &[
            "Connecticut",
            "Massachusetts",
            "Maine",
            "New Hampshire",
            "Rhode Island",
            "Vermont",
            "New Jersey",
            "New York",
            "Pennsylvania",
        ],
    ),
    (
        "Midwest",
        &[
            "Illinois",
            "Indiana",
            "Iowa",
            "Kansas",
            "Michigan",
            "Minnesota",
            "Missouri",
            "Nebraska",
            "North Dakota",
            "Ohio",
            "South Dakota",
            "Wisconsin",
        ],
    ),
    (
        "South",
        &[
            "Alabama",
            "Arkansas",
            "Delaware",
            "Florida",
            "Georgia",
            "Kentucky",
            "Louisiana",
            "Maryland",
            "Mississippi",
            "North Carolina",
            "Oklahoma",
            "South Carolina",
            "Tennessee",
            "Texas",
            "Virginia",
            "West Virginia",
        ],
    ),
    (
        "West",
        &[
            "Alaska",
            "Arizona",
            "California",
            "Colorado",
            "Hawaii",
            "Idaho",
            "Montana",
            "Nevada",
            "New Mexico",
            "Oregon",
            "Utah",
            "Washington",
            "Wyoming",
        ],
    ),
];

static STATE_TO_REGION: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    REGIONS
        .iter()
        .flat_map(|(region, states)| states.iter().map(move |state| (*state, *region)))
        .collect()
});

/// Region for a full state name; anything outside the four regions,
/// including a missing state, is `Non-US`.
pub fn region_for(state: Option<&str>) -> &'static str {
    state
        .and_then(|s| STATE_TO_REGION.get(s.trim()).copied())
        .unwrap_or(NON_US)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_map_every_listed_state_to_its_region() {
        for (region, states) in REGIONS {
            for state in states {
                assert_eq!(region_for(Some(*state)), region, "{state}");
            }
        }
    }

    #[test]
    fn should_list_each_state_once() {
        let listed: usize = REGIONS.iter().map(|(_, states)| states.len()).sum();

        assert_eq!(listed, 50);
        assert_eq!(STATE_TO_REGION.len(), 50);
    }

    #[test]
    fn should_fall_back_to_non_us() {
        assert_eq!(region_for(Some("Puerto Rico")), NON_US);
        assert_eq!(region_for(Some("Baja California")), NON_US);
        assert_eq!(region_for(Some("")), NON_US);
        assert_eq!(region_for(None), NON_US);
    }
}
