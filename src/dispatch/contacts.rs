use crate::haptics::{RegionError, HAPTICS_COUNT};
use crate::persistence::MAX_INTENSITY;

/// Last applied intensity per raw contact index
///
/// Indexed by `raw_index - 1`. Owned by the dispatcher; nothing else reads or
/// writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactTable {
    intensities: [u8; HAPTICS_COUNT],
}

impl Default for ContactTable {
    fn default() -> Self {
        Self {
            intensities: [0; HAPTICS_COUNT],
        }
    }
}

impl ContactTable {
    pub fn set(&mut self, raw_index: usize, intensity: u8) -> Result<(), RegionError> {
        let slot = raw_index
            .checked_sub(1)
            .and_then(|i| self.intensities.get_mut(i))
            .ok_or(RegionError::OutOfRange(raw_index))?;
        *slot = intensity.min(MAX_INTENSITY);
        Ok(())
    }

    pub fn get(&self, raw_index: usize) -> Option<u8> {
        raw_index
            .checked_sub(1)
            .and_then(|i| self.intensities.get(i))
            .copied()
    }

    pub fn clear(&mut self) {
        self.intensities = [0; HAPTICS_COUNT];
    }

    /// `(raw_index, intensity)` for every contact with intensity > 0
    pub fn active(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.intensities
            .iter()
            .enumerate()
            .filter(|(_, intensity)| **intensity > 0)
            .map(|(i, intensity)| (i + 1, *intensity))
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_are_one_based() {
        let mut table = ContactTable::default();
        table.set(1, 80).unwrap();
        table.set(72, 20).unwrap();

        assert_eq!(table.get(1), Some(80));
        assert_eq!(table.get(72), Some(20));
        assert_eq!(table.get(0), None);
        assert_eq!(table.active().collect::<Vec<_>>(), vec![(1, 80), (72, 20)]);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut table = ContactTable::default();
        assert_eq!(table.set(0, 10), Err(RegionError::OutOfRange(0)));
        assert_eq!(table.set(73, 10), Err(RegionError::OutOfRange(73)));
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn test_clear_and_clamp() {
        let mut table = ContactTable::default();
        table.set(5, 200).unwrap();
        assert_eq!(table.get(5), Some(100));

        table.clear();
        assert_eq!(table.active_count(), 0);
    }
}
