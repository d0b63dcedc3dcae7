//! Reduction axis selector.

use std::fmt;

use smallvec::SmallVec;

/// Axes a reduction collapses.
///
/// `X` is the columns axis (the length of a vector), `Y` the rows axis and
/// `Z` the batch axis. The `dimension` channel is never reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    XY,
    YZ,
    XYZ,
}

impl Axis {
    pub const ALL: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::XY, Axis::YZ, Axis::XYZ];

    /// Smallest container rank (vector 1, matrix 2, tensor 3) carrying every
    /// axis of the selector.
    pub const fn min_rank(self) -> usize {
        match self {
            Axis::X => 1,
            Axis::Y | Axis::XY => 2,
            Axis::Z | Axis::YZ | Axis::XYZ => 3,
        }
    }

    pub const fn is_valid_for(self, rank: usize) -> bool {
        rank >= self.min_rank()
    }

    /// Positions of the reduced axes in a shape of `rank` spatial axes
    /// followed by the dimension channel, outermost first.
    ///
    /// Returns `None` when the selector is not valid for `rank`.
    pub fn positions(self, rank: usize) -> Option<SmallVec<[usize; 3]>> {
        if !self.is_valid_for(rank) {
            return None;
        }
        let (x, y, z) = (rank - 1, rank.wrapping_sub(2), rank.wrapping_sub(3));
        let positions = match self {
            Axis::X => SmallVec::from_slice(&[x]),
            Axis::Y => SmallVec::from_slice(&[y]),
            Axis::Z => SmallVec::from_slice(&[z]),
            Axis::XY => SmallVec::from_slice(&[y, x]),
            Axis::YZ => SmallVec::from_slice(&[z, y]),
            Axis::XYZ => SmallVec::from_slice(&[z, y, x]),
        };
        Some(positions)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::XY => "xy",
            Axis::YZ => "yz",
            Axis::XYZ => "xyz",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sets_per_rank() {
        let valid = |rank: usize| -> Vec<Axis> {
            Axis::ALL.into_iter().filter(|a| a.is_valid_for(rank)).collect()
        };
        assert!(valid(0).is_empty());
        assert_eq!(valid(1), vec![Axis::X]);
        assert_eq!(valid(2), vec![Axis::X, Axis::Y, Axis::XY]);
        assert_eq!(valid(3), Axis::ALL.to_vec());
    }

    #[test]
    fn test_positions() {
        assert_eq!(Axis::X.positions(1).unwrap().as_slice(), &[0]);
        assert_eq!(Axis::Y.positions(2).unwrap().as_slice(), &[0]);
        assert_eq!(Axis::X.positions(3).unwrap().as_slice(), &[2]);
        assert_eq!(Axis::YZ.positions(3).unwrap().as_slice(), &[0, 1]);
        assert_eq!(Axis::XYZ.positions(3).unwrap().as_slice(), &[0, 1, 2]);
        assert!(Axis::Z.positions(2).is_none());
    }
}
