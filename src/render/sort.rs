//! Depth sequencer.
//!
//! Orders projected splats back to front (largest depth first). The
//! compositor sums contributions, so the order only affects floating-point
//! summation order, not the image; it is kept so an over-operator could be
//! dropped in without changing the pipeline shape.

use crate::core::ProjectedSplat;

/// Sort farthest-first. Stable: equal depths keep projection order.
pub fn sort_back_to_front(splats: &mut [ProjectedSplat]) {
    splats.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2, Vector3};

    fn at_depth(depth: f32, splat_idx: usize) -> ProjectedSplat {
        ProjectedSplat {
            screen_x: 0.0,
            screen_y: 0.0,
            cov2d: Matrix2::identity(),
            color: Vector3::zeros(),
            opacity: 1.0,
            depth,
            splat_idx,
        }
    }

    #[test]
    fn test_farthest_first() {
        let mut splats = vec![at_depth(1.0, 0), at_depth(9.0, 1), at_depth(4.0, 2)];
        sort_back_to_front(&mut splats);
        let order: Vec<usize> = splats.iter().map(|s| s.splat_idx).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_equal_depths_are_stable() {
        let mut splats = vec![at_depth(2.0, 0), at_depth(2.0, 1), at_depth(3.0, 2)];
        sort_back_to_front(&mut splats);
        let order: Vec<usize> = splats.iter().map(|s| s.splat_idx).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn test_sort_is_a_permutation() {
        let mut splats = vec![at_depth(5.0, 0), at_depth(1.5, 1), at_depth(7.25, 2)];
        let before = splats.clone();
        sort_back_to_front(&mut splats);
        for s in &before {
            assert!(splats.contains(s));
        }
    }
}
