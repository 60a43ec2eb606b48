//! Render ordering for a batch of regions.
//!
//! Regions near the world origin render first: that is where players
//! spend their time, so the visible map refreshes before the frontier.
//! Ordering walks an outward spiral from the origin region and pulls
//! matching regions out of the batch as it passes over them.

use std::collections::HashSet;

use tracing::debug;

use crate::coord::RegionCoord;
use crate::spiral::SpiralIterator;

/// Consecutive spiral cells visited without a hit before the walk gives
/// up, per region in the batch.
const MISS_BUDGET_PER_REGION: usize = 4096;

/// Order `regions` by spiral distance from `origin`.
///
/// The walk is bounded two ways: by the Chebyshev radius of the
/// farthest region, and by a consecutive-miss budget proportional to
/// the batch size. The radius bound alone is quadratic in the farthest
/// region's distance, so a single far-off outlier would otherwise cost
/// millions of empty cells. When the budget runs out, the regions the
/// walk never reached are appended sorted by distance; no work is
/// dropped either way.
pub fn spiral_order(origin: RegionCoord, regions: Vec<RegionCoord>) -> Vec<RegionCoord> {
    if regions.len() <= 1 {
        return regions;
    }

    let radius = regions
        .iter()
        .map(|r| origin.chebyshev_distance(*r))
        .max()
        .unwrap_or(0);

    let mut remaining: HashSet<RegionCoord> = regions.into_iter().collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    let miss_budget = remaining.len().saturating_mul(MISS_BUDGET_PER_REGION);
    let mut misses = 0usize;

    for (x, z) in SpiralIterator::new((origin.x, origin.z), radius) {
        if remaining.is_empty() {
            break;
        }
        if remaining.remove(&RegionCoord::new(x, z)) {
            ordered.push(RegionCoord::new(x, z));
            misses = 0;
        } else {
            misses += 1;
            if misses > miss_budget {
                break;
            }
        }
    }

    if !remaining.is_empty() {
        debug!(
            leftover = remaining.len(),
            radius, "spiral walk budget exhausted, appending remainder by distance"
        );
        let mut leftover: Vec<RegionCoord> = remaining.into_iter().collect();
        leftover.sort_by_key(|r| (origin.chebyshev_distance(*r), r.x, r.z));
        ordered.extend(leftover);
    }

    ordered
}
