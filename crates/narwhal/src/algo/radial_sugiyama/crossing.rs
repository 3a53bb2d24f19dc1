//! Angular ordering helpers for ring sweeps.

use crate::geom::wrap_angle;

/// Circular mean of `angles`, or `None` when empty or when the angles cancel out.
pub(crate) fn circular_mean(angles: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
    for a in angles {
        sx += a.cos();
        sy += a.sin();
        count += 1;
    }
    if count == 0 || sx.hypot(sy) < 1e-9 {
        return None;
    }
    Some(sy.atan2(sx))
}

/// Crossings among the outgoing edges of two angularly adjacent ring nodes, where `first`
/// occupies the earlier slot. Edge targets are given as absolute angles; `mid` is the angle
/// between the two slots. Targets with equal relative angle do not cross.
pub(crate) fn local_crossings(mid: f64, first: &[f64], second: &[f64]) -> usize {
    let mut count = 0;
    for &a in first {
        let ra = wrap_angle(a - mid);
        for &b in second {
            if ra > wrap_angle(b - mid) {
                count += 1;
            }
        }
    }
    count
}

/// Whether exchanging the two adjacent nodes strictly reduces their local crossing count.
pub(crate) fn swap_reduces_crossings(mid: f64, first: &[f64], second: &[f64]) -> bool {
    local_crossings(mid, second, first) < local_crossings(mid, first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn circular_mean_handles_wraparound() {
        let m = circular_mean([PI - 0.1, -PI + 0.1]).expect("mean");
        assert!((m.abs() - PI).abs() < 1e-9);
        assert_eq!(circular_mean(std::iter::empty()), None);
        assert_eq!(circular_mean([0.0, PI]), None);
    }

    #[test]
    fn parallel_edges_do_not_cross() {
        // first -> earlier target, second -> later target
        assert_eq!(local_crossings(0.0, &[-0.2], &[0.2]), 0);
        assert!(!swap_reduces_crossings(0.0, &[-0.2], &[0.2]));
    }

    #[test]
    fn twisted_edges_are_untangled_by_a_swap() {
        assert_eq!(local_crossings(0.0, &[0.3], &[-0.3]), 1);
        assert!(swap_reduces_crossings(0.0, &[0.3], &[-0.3]));
    }

    #[test]
    fn ties_never_trigger_a_swap() {
        assert!(!swap_reduces_crossings(FRAC_PI_2, &[1.0], &[1.0]));
        assert!(!swap_reduces_crossings(0.0, &[], &[0.5]));
    }
}
