//! Closed-form seed functions used by the layout rules.
//!
//! Every value is a pure function of grid coordinates so that any cell can be
//! evaluated in isolation and in any order.

/// Seed of a building lot anchored at the grid corner `(gx, gz)`.
pub(crate) fn lot_seed(gx: f64, gz: f64) -> f64 {
    gx * 12.1 + gz * 7.3
}

/// Seed of a scattered prop candidate anchored at `(gx, gz)`.
pub(crate) fn prop_seed(gx: f64, gz: f64, base: f64) -> f64 {
    gx * 1.1 + gz * 2.3 + base
}

/// Maps `seed + offset` onto `[0, 1]`.
pub(crate) fn unit(seed: f64, offset: f64) -> f64 {
    (seed + offset).sin() * 0.5 + 0.5
}

/// Maps `seed + offset` onto `[-0.5, 0.5]`.
pub(crate) fn signed_half(seed: f64, offset: f64) -> f64 {
    (seed + offset).sin() * 0.5
}

/// Evenly spaced coordinates from `start` toward `end`.
///
/// Values are computed by multiplication rather than accumulation so the
/// sequence never drifts.
pub(crate) fn stepped(start: f64, end: f64, step: f64, inclusive: bool) -> impl Iterator<Item = f64> {
    let span = if step > 0.0 { (end - start) / step } else { -1.0 };
    let count = if span < 0.0 {
        0
    } else if inclusive {
        span.floor() as i64 + 1
    } else {
        span.ceil() as i64
    };
    (0..count).map(move |index| start + index as f64 * step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_matches_half_open_and_closed_ranges() {
        let open: Vec<f64> = stepped(-40.0, 40.0, 8.0, false).collect();
        let closed: Vec<f64> = stepped(-40.0, 40.0, 8.0, true).collect();

        assert_eq!(open.len(), 10);
        assert_eq!(open.last().copied(), Some(32.0));
        assert_eq!(closed.len(), 11);
        assert_eq!(closed.last().copied(), Some(40.0));
        assert_eq!(stepped(-40.0, 40.0, 3.0, true).count(), 27);
    }

    #[test]
    fn unit_stays_within_bounds() {
        for index in 0..500 {
            let value = unit(lot_seed(index as f64, -(index as f64)), 11.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
