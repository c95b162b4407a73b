use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::coord::Coord;


// Set of board squares, one bit per square in `Coord::to_index` order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SquareSet(u64);

impl SquareSet {
    pub const EMPTY: SquareSet = SquareSet(0);

    pub const fn is_empty(self) -> bool { self.0 == 0 }
    pub const fn len(self) -> usize { self.0.count_ones() as usize }
    pub const fn contains(self, coord: Coord) -> bool {
        self.0 & (1 << coord.to_index()) != 0
    }
    pub fn insert(&mut self, coord: Coord) { self.0 |= 1 << coord.to_index(); }
    pub fn remove(&mut self, coord: Coord) { self.0 &= !(1 << coord.to_index()); }
    pub fn iter(self) -> SquareSetIter { SquareSetIter(self.0) }
}

impl FromIterator<Coord> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        let mut set = SquareSet::EMPTY;
        for coord in iter {
            set.insert(coord);
        }
        set
    }
}

impl IntoIterator for SquareSet {
    type Item = Coord;
    type IntoIter = SquareSetIter;
    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl BitOr for SquareSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output { SquareSet(self.0 | rhs.0) }
}

impl BitOrAssign for SquareSet {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl fmt::Debug for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Yields squares from a1 towards h8.
pub struct SquareSetIter(u64);

impl Iterator for SquareSetIter {
    type Item = Coord;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(Coord::from_index(idx))
    }
}
