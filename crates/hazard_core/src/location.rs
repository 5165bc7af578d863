use crate::hazards::{HazardType, REGIONS, Region};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationVerdict {
    /// Region that matched, if any.
    pub region: Option<&'static str>,
    pub compatible: bool,
}

/// First region in table order whose name occurs in `location_name`.
pub fn find_region(location_name: &str) -> Option<&'static Region> {
    REGIONS
        .iter()
        .find(|region| location_name.contains(region.name))
}

/// Unknown locations are never penalized.
pub fn check_location(location_name: &str, hazard_type: HazardType) -> LocationVerdict {
    match find_region(location_name) {
        Some(region) => LocationVerdict {
            region: Some(region.name),
            compatible: region.allowed.contains(&hazard_type),
        },
        None => LocationVerdict {
            region: None,
            compatible: true,
        },
    }
}
