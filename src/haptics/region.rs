//! Raw contact index to body region mapping
//!
//! The suit exposes [`HAPTICS_COUNT`] contact slots. Slots are grouped into
//! fixed, non-overlapping ranges:
//!
//! ```text
//!  1..=39  Torso (vest)
//! 40..=43  Upper left arm      44..=47  Lower left arm
//! 48..=51  Upper right arm     52..=55  Lower right arm
//! 56..=59  Upper left leg      60..=63  Lower left leg
//! 64..=67  Upper right leg     68..=71  Lower right leg
//! ```
//!
//! Slot 72 exists on the avatar side but no region covers it, so it is
//! reported as out of range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of contact slots published by the avatar
pub const HAPTICS_COUNT: usize = 72;

/// Semantic body zone of the haptic suit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HapticRegion {
    Torso,
    UpperArmLeft,
    UpperArmRight,
    LowerArmLeft,
    LowerArmRight,
    UpperLegLeft,
    UpperLegRight,
    LowerLegLeft,
    LowerLegRight,
}

impl HapticRegion {
    /// All regions in display order
    pub const ALL: [HapticRegion; 9] = [
        HapticRegion::Torso,
        HapticRegion::UpperArmLeft,
        HapticRegion::UpperArmRight,
        HapticRegion::LowerArmLeft,
        HapticRegion::LowerArmRight,
        HapticRegion::UpperLegLeft,
        HapticRegion::UpperLegRight,
        HapticRegion::LowerLegLeft,
        HapticRegion::LowerLegRight,
    ];
}

impl fmt::Display for HapticRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HapticRegion::Torso => write!(f, "Vest"),
            HapticRegion::UpperArmLeft => write!(f, "Upper Left Arm"),
            HapticRegion::UpperArmRight => write!(f, "Upper Right Arm"),
            HapticRegion::LowerArmLeft => write!(f, "Lower Left Arm"),
            HapticRegion::LowerArmRight => write!(f, "Lower Right Arm"),
            HapticRegion::UpperLegLeft => write!(f, "Upper Left Leg"),
            HapticRegion::UpperLegRight => write!(f, "Upper Right Leg"),
            HapticRegion::LowerLegLeft => write!(f, "Lower Left Leg"),
            HapticRegion::LowerLegRight => write!(f, "Lower Right Leg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("Could not get region for haptic index {0}")]
    OutOfRange(usize),
}

/// Resolves the region a raw contact index belongs to
///
/// Pure and lock-free; safe to call from any thread.
pub fn region_of(raw_index: usize) -> Result<HapticRegion, RegionError> {
    let region = match raw_index {
        1..=39 => HapticRegion::Torso,
        40..=43 => HapticRegion::UpperArmLeft,
        44..=47 => HapticRegion::LowerArmLeft,
        48..=51 => HapticRegion::UpperArmRight,
        52..=55 => HapticRegion::LowerArmRight,
        56..=59 => HapticRegion::UpperLegLeft,
        60..=63 => HapticRegion::LowerLegLeft,
        64..=67 => HapticRegion::UpperLegRight,
        68..=71 => HapticRegion::LowerLegRight,
        _ => return Err(RegionError::OutOfRange(raw_index)),
    };
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_range(range: std::ops::RangeInclusive<usize>, expected: HapticRegion) {
        for raw_index in range {
            assert_eq!(region_of(raw_index), Ok(expected), "index {}", raw_index);
        }
    }

    #[test]
    fn test_torso_range() {
        assert_range(1..=39, HapticRegion::Torso);
    }

    #[test]
    fn test_arm_ranges() {
        assert_range(40..=43, HapticRegion::UpperArmLeft);
        assert_range(44..=47, HapticRegion::LowerArmLeft);
        assert_range(48..=51, HapticRegion::UpperArmRight);
        assert_range(52..=55, HapticRegion::LowerArmRight);
    }

    #[test]
    fn test_leg_ranges() {
        assert_range(56..=59, HapticRegion::UpperLegLeft);
        assert_range(60..=63, HapticRegion::LowerLegLeft);
        assert_range(64..=67, HapticRegion::UpperLegRight);
        assert_range(68..=71, HapticRegion::LowerLegRight);
    }

    #[test]
    fn test_index_72_is_out_of_range() {
        assert_eq!(region_of(72), Err(RegionError::OutOfRange(72)));
    }

    #[test]
    fn test_zero_and_overflow_are_out_of_range() {
        assert_eq!(region_of(0), Err(RegionError::OutOfRange(0)));
        assert_eq!(region_of(500), Err(RegionError::OutOfRange(500)));
    }

    #[test]
    fn test_every_mapped_index_has_exactly_one_region() {
        let mapped = (1..=HAPTICS_COUNT)
            .filter(|i| region_of(*i).is_ok())
            .count();
        assert_eq!(mapped, HAPTICS_COUNT - 1);
    }
}
