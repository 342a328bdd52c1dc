use std::collections::VecDeque;

use bevy::prelude::*;

use crate::math;

/// The head's recent grid cells, most recent first.
///
/// `cells[0]` is the head's current cell; body segment `i` (0-based) reads
/// `cells[i + 1]`.
#[derive(Component, Clone, Debug, Default, Reflect)]
pub struct PathHistory {
    cells: VecDeque<Vec3>,
}

impl PathHistory {
    /// Seeds the history with the head cell followed by every body position.
    pub fn seeded(head: Vec3, body: impl IntoIterator<Item = Vec3>, pitch: f32) -> Self {
        let mut cells: VecDeque<Vec3> = std::iter::once(head).chain(body).collect();
        for c in &mut cells {
            *c = math::snap_to_grid(*c, pitch);
        }
        Self { cells }
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `index`, if stored.
    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.cells.get(index).copied()
    }

    /// The head's current cell.
    pub fn front(&self) -> Option<Vec3> {
        self.cells.front().copied()
    }

    /// Iterates cells, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.cells.iter().copied()
    }

    /// Inserts `cell` at the front unless it already is the front.
    pub fn push_front(&mut self, cell: Vec3) -> bool {
        if self.cells.front() == Some(&cell) {
            return false;
        }
        self.cells.push_front(cell);
        true
    }

    /// Drops cells from the back until at most `capacity` remain.
    pub fn trim_to_capacity(&mut self, capacity: usize) {
        self.cells.truncate(capacity);
    }

    /// Re-snaps every stored cell onto the grid.
    pub fn requantize(&mut self, pitch: f32) {
        for c in &mut self.cells {
            *c = math::snap_to_grid(*c, pitch);
        }
    }

    /// Records an accepted head move: push, trim to `body_count + 1`, re-snap.
    pub fn record(&mut self, cell: Vec3, body_count: usize, pitch: f32) {
        self.push_front(cell);
        self.trim_to_capacity(body_count + 1);
        self.requantize(pitch);
    }

    /// Where slot `index` lies, extrapolating behind the oldest stored cell
    /// when the history is still shorter than `index + 1`.
    ///
    /// Extrapolation continues the line from the two oldest cells; with a
    /// single cell it runs opposite to `heading`.
    pub fn slot(&self, index: usize, heading: Vec3, pitch: f32) -> Option<Vec3> {
        if let Some(cell) = self.get(index) {
            return Some(cell);
        }
        let last_index = self.cells.len().checked_sub(1)?;
        let last = self.cells[last_index];
        let toward_head = match last_index.checked_sub(1).map(|i| self.cells[i]) {
            Some(prev) => (prev - last).normalize_or(heading),
            None => heading,
        };
        let missing = (index - last_index) as f32;
        Some(last - toward_head * pitch * missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_idempotent_for_same_cell() {
        let mut h = PathHistory::seeded(Vec3::ZERO, [], 1.0);
        assert!(!h.push_front(Vec3::ZERO));
        assert!(h.push_front(Vec3::X));
        assert!(!h.push_front(Vec3::X));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn record_trims_from_the_back() {
        let mut h = PathHistory::seeded(Vec3::ZERO, [Vec3::NEG_X], 1.0);
        h.record(Vec3::X, 1, 1.0);
        assert_eq!(h.len(), 2);
        assert_eq!(h.get(0), Some(Vec3::X));
        assert_eq!(h.get(1), Some(Vec3::ZERO));
    }

    #[test]
    fn record_requantizes_drifted_cells() {
        let mut h = PathHistory::seeded(Vec3::ZERO, [], 1.0);
        h.record(Vec3::new(1.0000004, 0.0, -0.9999997), 3, 1.0);
        assert_eq!(h.front(), Some(Vec3::new(1.0, 0.0, -1.0)));
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut h = PathHistory::seeded(Vec3::ZERO, [Vec3::NEG_X, Vec3::new(-2.0, 0.0, 0.0)], 1.0);
        for i in 1..50 {
            h.record(Vec3::new(i as f32, 0.0, 0.0), 2, 1.0);
            assert!(h.len() <= 3);
        }
        assert_eq!(
            h.iter().collect::<Vec<_>>(),
            vec![
                Vec3::new(49.0, 0.0, 0.0),
                Vec3::new(48.0, 0.0, 0.0),
                Vec3::new(47.0, 0.0, 0.0)
            ]
        );
    }

    #[test]
    fn slot_extrapolates_along_tail() {
        let h = PathHistory::seeded(Vec3::new(0.0, 0.0, 2.0), [Vec3::new(0.0, 0.0, 1.0)], 1.0);
        assert_eq!(h.slot(1, Vec3::X, 1.0), Some(Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(h.slot(2, Vec3::X, 1.0), Some(Vec3::ZERO));
        assert_eq!(h.slot(3, Vec3::X, 1.0), Some(Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn slot_with_single_cell_runs_against_heading() {
        let h = PathHistory::seeded(Vec3::ZERO, [], 1.0);
        assert_eq!(h.slot(1, Vec3::Z, 1.0), Some(Vec3::NEG_Z));
    }

    #[test]
    fn slot_on_empty_history_is_none() {
        assert_eq!(PathHistory::default().slot(0, Vec3::X, 1.0), None);
    }
}
