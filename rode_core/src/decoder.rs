//! Single-channel quadrature decoding.

use rode_traits::PhaseSample;

/// Direction of chain movement for one encoder pulse.
///
/// Wiring calibration, not encoder law: at an A-edge, phase B equal to the
/// *new* A level means the gypsy is paying out; different means it is hauling
/// in. If a build counts backwards, swap the phase wires — never this logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deploying,
    Retrieving,
}

impl Direction {
    /// Signed contribution of one pulse to the running count.
    #[inline]
    pub fn delta(self) -> i32 {
        match self {
            Direction::Deploying => 1,
            Direction::Retrieving => -1,
        }
    }
}

/// Edge detector over the A line. No debouncing here: levels are trusted at
/// face value once per call, and an unchanged A level is never a pulse.
#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    last_a: Option<bool>,
}

impl QuadratureDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample of both phase lines. Returns the pulse direction when
    /// phase A changed level; the first observation only sets the baseline.
    pub fn update(&mut self, sample: PhaseSample) -> Option<Direction> {
        let prev = self.last_a.replace(sample.a);
        match prev {
            None => None,
            Some(last) if last == sample.a => None,
            Some(_) => Some(if sample.b == sample.a {
                Direction::Deploying
            } else {
                Direction::Retrieving
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(a: bool, b: bool) -> PhaseSample {
        PhaseSample { a, b }
    }

    #[test]
    fn first_sample_sets_baseline_without_pulse() {
        let mut dec = QuadratureDecoder::new();
        assert_eq!(dec.update(s(true, true)), None);
        assert_eq!(dec.update(s(true, false)), None);
    }

    #[test]
    fn a_edge_with_matching_b_deploys() {
        let mut dec = QuadratureDecoder::new();
        dec.update(s(false, false));
        assert_eq!(dec.update(s(true, true)), Some(Direction::Deploying));
        assert_eq!(dec.update(s(false, false)), Some(Direction::Deploying));
    }

    #[test]
    fn a_edge_with_opposite_b_retrieves() {
        let mut dec = QuadratureDecoder::new();
        dec.update(s(false, false));
        assert_eq!(dec.update(s(true, false)), Some(Direction::Retrieving));
        assert_eq!(dec.update(s(false, true)), Some(Direction::Retrieving));
    }

    #[test]
    fn unchanged_a_is_never_a_pulse() {
        let mut dec = QuadratureDecoder::new();
        dec.update(s(true, false));
        // B can flap freely; only A edges count.
        assert_eq!(dec.update(s(true, true)), None);
        assert_eq!(dec.update(s(true, false)), None);
    }
}
