use std::collections::HashSet;

use crate::artifacts::normalize_label;

/// Amenity labels accepted from users and the training feature each one stands for.
pub const AMENITY_FEATURES: &[(&str, &str)] = &[
    ("nearby school", "nearby_school_1km"),
    ("nearby hospital", "nearby_hospital_1km"),
    ("near by shopping mall", "nearby_mall_1km"),
    ("gym", "nearby_gym_1km"),
    ("swimming pool", "swimmingpool"),
    ("rain water harvesting", "rainwaterharvesting"),
    ("sports facility", "sportsfacility"),
    ("power backup", "powerbackup"),
    ("parking", "car parking"),
    ("children play area", "childrens_playarea"),
    ("lift", "liftavailable"),
];

/// Feature flag for a label, or `None` if the label is not in the vocabulary.
pub fn amenity_feature(label: &str) -> Option<&'static str> {
    let key = normalize_label(label);
    AMENITY_FEATURES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, feature)| *feature)
}

/// Number of distinct recognized amenities. Unknown labels are skipped.
pub fn amenity_score<S: AsRef<str>>(labels: &[S]) -> usize {
    labels
        .iter()
        .filter_map(|label| amenity_feature(label.as_ref()))
        .collect::<HashSet<_>>()
        .len()
}
