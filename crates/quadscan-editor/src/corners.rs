//! The ordered set of user-placed corners.

use crate::error::StateInconsistency;
use crate::types::CanvasPoint;

/// Corners needed for a quadrilateral.
pub const MAX_CORNERS: usize = 4;

/// Where a selection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    /// No corners: the whole image will be processed.
    Empty,
    /// 1 to 3 corners: not submittable.
    Placing(usize),
    /// All four corners placed.
    Complete,
}

/// Up to four canvas-space points in placement order.
///
/// Dragging replaces a point in place, so an index keeps naming the same
/// corner for the lifetime of the set. Nothing removes individual points;
/// [`clear`](Self::clear) is the only way back to fewer corners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CornerSet {
    points: Vec<CanvasPoint>,
}

impl CornerSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Rebuild a set from stored points.
    ///
    /// Returns `None` when more than [`MAX_CORNERS`] points are given.
    #[must_use]
    pub fn from_points(points: &[CanvasPoint]) -> Option<Self> {
        (points.len() <= MAX_CORNERS).then(|| Self {
            points: points.to_vec(),
        })
    }

    /// Append a corner.
    ///
    /// Returns its index, or `None` if the set is already complete; a
    /// fifth point is silently dropped.
    pub fn try_push(&mut self, point: CanvasPoint) -> Option<usize> {
        if self.points.len() >= MAX_CORNERS {
            log::debug!("ignoring corner {point:?}: selection already complete");
            return None;
        }
        self.points.push(point);
        Some(self.points.len() - 1)
    }

    /// Move the corner at `index` to `point`.
    ///
    /// # Errors
    ///
    /// Returns [`StateInconsistency::StaleDragIndex`] if `index` is out
    /// of range.
    pub fn replace(&mut self, index: usize, point: CanvasPoint) -> Result<(), StateInconsistency> {
        let len = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or(StateInconsistency::StaleDragIndex { index, len })?;
        *slot = point;
        Ok(())
    }

    /// Index of the corner closest to `point` within `radius`.
    ///
    /// Ties go to the lowest index.
    #[must_use]
    pub fn hit_test(&self, point: CanvasPoint, radius: f64) -> Option<usize> {
        let limit = radius * radius;
        let mut best: Option<(usize, f64)> = None;
        for (i, corner) in self.points.iter().enumerate() {
            let d = corner.distance_squared(point);
            if d > limit {
                continue;
            }
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Remove every corner.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Corner at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<CanvasPoint> {
        self.points.get(index).copied()
    }

    /// Corners in placement order.
    #[must_use]
    pub fn points(&self) -> &[CanvasPoint] {
        &self.points
    }

    /// Number of corners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no corners are placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SelectionPhase {
        match self.points.len() {
            0 => SelectionPhase::Empty,
            n if n >= MAX_CORNERS => SelectionPhase::Complete,
            n => SelectionPhase::Placing(n),
        }
    }

    /// Whether the selection may be submitted (none or all four corners).
    #[must_use]
    pub fn submittable(&self) -> bool {
        matches!(self.phase(), SelectionPhase::Empty | SelectionPhase::Complete)
    }

    /// The four corners, if complete.
    #[must_use]
    pub fn as_quad(&self) -> Option<[CanvasPoint; MAX_CORNERS]> {
        self.points.as_slice().try_into().ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> CanvasPoint {
        CanvasPoint::new(x, y)
    }

    #[test]
    fn length_tracks_placements_capped_at_four() {
        let mut set = CornerSet::new();
        let placements = [p(0.0, 0.0), p(100.0, 0.0), p(100.0, 100.0), p(0.0, 100.0), p(50.0, 50.0)];
        for (n, &pt) in placements.iter().enumerate() {
            let index = set.try_push(pt);
            if n < MAX_CORNERS {
                assert_eq!(index, Some(n));
            } else {
                assert_eq!(index, None);
            }
            assert_eq!(set.len(), (n + 1).min(MAX_CORNERS));
        }
        assert_eq!(set.points()[3], p(0.0, 100.0));
    }

    #[test]
    fn phases() {
        let mut set = CornerSet::new();
        assert_eq!(set.phase(), SelectionPhase::Empty);
        assert!(set.submittable());
        set.try_push(p(1.0, 1.0));
        assert_eq!(set.phase(), SelectionPhase::Placing(1));
        assert!(!set.submittable());
        set.try_push(p(2.0, 2.0));
        set.try_push(p(3.0, 3.0));
        assert_eq!(set.phase(), SelectionPhase::Placing(3));
        assert!(set.as_quad().is_none());
        set.try_push(p(4.0, 4.0));
        assert_eq!(set.phase(), SelectionPhase::Complete);
        assert!(set.submittable());
        assert_eq!(set.as_quad().unwrap()[2], p(3.0, 3.0));
        set.clear();
        assert_eq!(set.phase(), SelectionPhase::Empty);
    }

    #[test]
    fn hit_test_is_reflexive() {
        let mut set = CornerSet::new();
        for &pt in &[p(10.0, 10.0), p(15.0, 10.0), p(300.0, 200.0)] {
            let i = set.try_push(pt).unwrap();
            assert_eq!(set.hit_test(pt, 20.0), Some(i));
        }
    }

    #[test]
    fn hit_test_picks_globally_closest() {
        let set = CornerSet::from_points(&[p(0.0, 0.0), p(30.0, 0.0)]).unwrap();
        // Both within 20px of (16, 0); the second is closer.
        assert_eq!(set.hit_test(p(16.0, 0.0), 20.0), Some(1));
        // Exact tie goes to the lower index.
        assert_eq!(set.hit_test(p(15.0, 0.0), 20.0), Some(0));
        // Out of range of everything.
        assert_eq!(set.hit_test(p(15.0, 50.0), 20.0), None);
        // Radius boundary is inclusive.
        assert_eq!(set.hit_test(p(0.0, 20.0), 20.0), Some(0));
    }

    #[test]
    fn replace_keeps_identity_by_index() {
        let mut set = CornerSet::from_points(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]).unwrap();
        set.replace(1, p(50.0, 60.0)).unwrap();
        assert_eq!(set.points(), &[p(0.0, 0.0), p(50.0, 60.0), p(2.0, 2.0)]);
    }

    #[test]
    fn replace_out_of_range_is_reported() {
        let mut set = CornerSet::from_points(&[p(0.0, 0.0)]).unwrap();
        assert_eq!(
            set.replace(2, p(1.0, 1.0)),
            Err(StateInconsistency::StaleDragIndex { index: 2, len: 1 })
        );
        assert_eq!(set.points(), &[p(0.0, 0.0)]);
    }

    #[test]
    fn from_points_rejects_more_than_four() {
        assert!(CornerSet::from_points(&[p(0.0, 0.0); 5]).is_none());
        assert_eq!(CornerSet::from_points(&[]).unwrap().len(), 0);
    }
}
