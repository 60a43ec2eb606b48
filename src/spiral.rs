//! Clockwise expanding-ring spiral iterator.
//!
//! Produces grid coordinates ring by ring around a center point, so work
//! ordered by this iterator completes near the world origin first. The
//! sequence is finite and deterministic: the center comes first, then each
//! ring of Chebyshev distance 1, 2, … up to the configured radius. Within
//! a ring traversal is clockwise starting from the ring's top-left corner
//! (minimum x, minimum z).

/// Lazy iterator over the `(2·radius+1)²` coordinates of a square spiral.
///
/// # Ordering
///
/// ```text
/// radius 1, center (0,0):
///   (0,0)  (-1,-1) (0,-1) (1,-1) (1,0) (1,1) (0,1) (-1,1) (-1,0)
/// ```
///
/// # Example
///
/// ```
/// use terratile::spiral::SpiralIterator;
///
/// let coords: Vec<_> = SpiralIterator::new((0, 0), 1).collect();
/// assert_eq!(coords.len(), 9);
/// assert_eq!(coords[0], (0, 0));
/// ```
#[derive(Debug, Clone)]
pub struct SpiralIterator {
    center: (i32, i32),
    radius: u32,
    ring: u32,
    leg: u8,
    step: u32,
    remaining: usize,
}

impl SpiralIterator {
    /// Creates a spiral around `center` covering every coordinate within
    /// Chebyshev distance `radius`.
    pub fn new(center: (i32, i32), radius: u32) -> Self {
        let side = 2 * radius as usize + 1;
        Self {
            center,
            radius,
            ring: 0,
            leg: 0,
            step: 0,
            remaining: side * side,
        }
    }

    /// Radius this spiral was constructed with.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Offset from center for the current ring cursor.
    ///
    /// Ring `r` is walked as four legs of `2r` cells each: east along the
    /// top edge, south along the right edge, west along the bottom edge,
    /// north along the left edge.
    fn ring_offset(&self) -> (i32, i32) {
        let r = self.ring as i32;
        let s = self.step as i32;
        match self.leg {
            0 => (-r + s, -r),
            1 => (r, -r + s),
            2 => (r - s, r),
            _ => (-r, r - s),
        }
    }

    fn advance_cursor(&mut self) {
        self.step += 1;
        if self.step >= 2 * self.ring {
            self.step = 0;
            self.leg += 1;
            if self.leg >= 4 {
                self.leg = 0;
                self.ring += 1;
            }
        }
    }
}

impl Iterator for SpiralIterator {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if self.ring == 0 {
            self.ring = 1;
            self.leg = 0;
            self.step = 0;
            return Some(self.center);
        }

        let (dx, dz) = self.ring_offset();
        self.advance_cursor();
        Some((self.center.0 + dx, self.center.1 + dz))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SpiralIterator {
    fn len(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn radius_zero_is_single_center() {
        let coords: Vec<_> = SpiralIterator::new((7, -3), 0).collect();
        assert_eq!(coords, vec![(7, -3)]);
    }

    #[test]
    fn radius_one_clockwise_from_top_left() {
        let coords: Vec<_> = SpiralIterator::new((0, 0), 1).collect();
        assert_eq!(
            coords,
            vec![
                (0, 0),
                (-1, -1),
                (0, -1),
                (1, -1),
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
            ]
        );
    }

    #[test]
    fn exact_count_and_uniqueness() {
        for radius in 0..6u32 {
            let coords: Vec<_> = SpiralIterator::new((2, 2), radius).collect();
            let expected = (2 * radius as usize + 1).pow(2);
            assert_eq!(coords.len(), expected, "radius {radius}");

            let unique: HashSet<_> = coords.iter().copied().collect();
            assert_eq!(unique.len(), expected, "duplicates at radius {radius}");
        }
    }

    #[test]
    fn covers_every_coordinate_within_chebyshev_radius() {
        let radius = 4;
        let center = (-10, 3);
        let coords: HashSet<_> = SpiralIterator::new(center, radius).collect();

        for dx in -(radius as i32)..=radius as i32 {
            for dz in -(radius as i32)..=radius as i32 {
                assert!(coords.contains(&(center.0 + dx, center.1 + dz)));
            }
        }
    }

    #[test]
    fn rings_complete_before_next_begins() {
        let center = (0, 0);
        let mut last_ring = 0;
        for (x, z) in SpiralIterator::new(center, 5) {
            let ring = x.unsigned_abs().max(z.unsigned_abs());
            assert!(
                ring == last_ring || ring == last_ring + 1,
                "jumped from ring {last_ring} to {ring}"
            );
            last_ring = ring;
        }
        assert_eq!(last_ring, 5);
    }

    #[test]
    fn size_hint_tracks_remaining() {
        let mut it = SpiralIterator::new((0, 0), 2);
        assert_eq!(it.size_hint(), (25, Some(25)));
        it.next();
        assert_eq!(it.len(), 24);
        assert_eq!(it.by_ref().count(), 24);
    }

    #[test]
    fn first_element_is_center() {
        let mut it = SpiralIterator::new((100, -200), 3);
        assert_eq!(it.next(), Some((100, -200)));
    }
}
