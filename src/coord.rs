use std::fmt;
use std::ops;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};
use crate::force::Force;


pub const NUM_ROWS: u8 = 8;
pub const NUM_COLS: u8 = 8;


// Row from a force's point of view: row 1 is the force's home row.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SubjectiveRow {
    idx: u8,  // 0-based
}

impl SubjectiveRow {
    pub const fn from_one_based(idx: u8) -> Self {
        assert!(idx >= 1 && idx <= NUM_ROWS);
        Self { idx: idx - 1 }
    }
    pub const fn to_row(self, force: Force) -> Row {
        match force {
            Force::White => Row::from_zero_based(self.idx),
            Force::Black => Row::from_zero_based(NUM_ROWS - self.idx - 1),
        }
    }
    pub const fn from_row(row: Row, force: Force) -> Self {
        match force {
            Force::White => Self { idx: row.idx },
            Force::Black => Self { idx: NUM_ROWS - row.idx - 1 },
        }
    }
}


#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Row {
    idx: u8,  // 0-based
}

impl Row {
    pub const fn from_zero_based(idx: u8) -> Self {
        assert!(idx < NUM_ROWS);
        Self { idx }
    }
    pub const fn from_algebraic(ch: char) -> Option<Self> {
        match ch {
            '1'..='8' => Some(Self { idx: ch as u8 - b'1' }),
            _ => None,
        }
    }
    pub const fn to_zero_based(self) -> u8 { self.idx }
    pub const fn to_one_based(self) -> u8 { self.idx + 1 }
    pub const fn to_algebraic(self) -> char { (self.idx + b'1') as char }
    pub fn checked_add(self, delta: i8) -> Option<Self> {
        let idx = self.idx as i8 + delta;
        (0..NUM_ROWS as i8).contains(&idx).then(|| Self { idx: idx as u8 })
    }
    pub fn all() -> impl DoubleEndedIterator<Item = Self> + Clone {
        (0..NUM_ROWS).map(Self::from_zero_based)
    }
}

impl ops::Sub for Row {
    type Output = i8;
    fn sub(self, other: Self) -> Self::Output {
        (self.to_zero_based() as i8) - (other.to_zero_based() as i8)
    }
}


// Serialized as its algebraic letter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Col {
    idx: u8,  // 0-based
}

impl Col {
    pub const fn from_zero_based(idx: u8) -> Self {
        assert!(idx < NUM_COLS);
        Self { idx }
    }
    pub const fn from_algebraic(ch: char) -> Option<Self> {
        match ch {
            'a'..='h' => Some(Self { idx: ch as u8 - b'a' }),
            _ => None,
        }
    }
    pub const fn to_zero_based(self) -> u8 { self.idx }
    pub const fn to_one_based(self) -> u8 { self.idx + 1 }
    pub const fn to_algebraic(self) -> char { (self.idx + b'a') as char }
    pub fn checked_add(self, delta: i8) -> Option<Self> {
        let idx = self.idx as i8 + delta;
        (0..NUM_COLS as i8).contains(&idx).then(|| Self { idx: idx as u8 })
    }
    pub fn all() -> impl DoubleEndedIterator<Item = Self> + Clone {
        (0..NUM_COLS).map(Self::from_zero_based)
    }
}

impl From<Col> for char {
    fn from(col: Col) -> char { col.to_algebraic() }
}

impl TryFrom<char> for Col {
    type Error = String;
    fn try_from(ch: char) -> Result<Self, Self::Error> {
        Col::from_algebraic(ch).ok_or_else(|| format!("invalid file: {ch}"))
    }
}

impl ops::Sub for Col {
    type Output = i8;
    fn sub(self, other: Self) -> Self::Output {
        (self.to_zero_based() as i8) - (other.to_zero_based() as i8)
    }
}


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SquareColor {
    Light,
    Dark,
}

// Serialized in algebraic form, e.g. "e4".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coord {
    pub row: Row,
    pub col: Col,
}

impl Coord {
    pub const fn new(row: Row, col: Col) -> Self {
        Self { row, col }
    }

    // Files and ranks are 1-based, as on a physical board: (1, 1) is a1.
    pub fn from_one_based(file: u8, rank: u8) -> ChessResult<Self> {
        if !(1..=NUM_COLS).contains(&file) || !(1..=NUM_ROWS).contains(&rank) {
            return Err(ChessError::OutOfBounds { file, rank });
        }
        Ok(Self::new(Row::from_zero_based(rank - 1), Col::from_zero_based(file - 1)))
    }

    pub fn from_algebraic(s: &str) -> Option<Self> {
        let (col, row) = s.chars().collect_tuple()?;
        Some(Coord::new(Row::from_algebraic(row)?, Col::from_algebraic(col)?))
    }
    pub fn to_algebraic(self) -> String {
        format!("{}{}", self.col.to_algebraic(), self.row.to_algebraic())
    }

    pub const fn to_index(self) -> u8 { self.row.idx * NUM_COLS + self.col.idx }
    pub const fn from_index(idx: u8) -> Self {
        Self::new(Row::from_zero_based(idx / NUM_COLS), Col::from_zero_based(idx % NUM_COLS))
    }

    pub fn color(self) -> SquareColor {
        if (self.row.idx + self.col.idx) % 2 == 0 { SquareColor::Dark } else { SquareColor::Light }
    }

    // Returns `None` when stepping off the board.
    pub fn offset(self, (d_row, d_col): (i8, i8)) -> Option<Self> {
        Some(Self::new(self.row.checked_add(d_row)?, self.col.checked_add(d_col)?))
    }

    pub fn all() -> impl Iterator<Item = Coord> {
        Row::all().cartesian_product(Col::all()).map(|(row, col)| Coord { row, col })
    }
}

impl From<Coord> for String {
    fn from(coord: Coord) -> String { coord.to_algebraic() }
}

impl TryFrom<String> for Coord {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Coord::from_algebraic(&s).ok_or_else(|| format!("invalid square: {s}"))
    }
}

impl ops::Sub for Coord {
    type Output = (i8, i8);
    fn sub(self, other: Self) -> Self::Output {
        (self.row - other.row, self.col - other.col)
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coord({}{})", self.col.to_algebraic(), self.row.to_algebraic())
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col.to_algebraic(), self.row.to_algebraic())
    }
}


impl Row {
    pub const _1: Row = Row::from_zero_based(0);
    pub const _2: Row = Row::from_zero_based(1);
    pub const _3: Row = Row::from_zero_based(2);
    pub const _4: Row = Row::from_zero_based(3);
    pub const _5: Row = Row::from_zero_based(4);
    pub const _6: Row = Row::from_zero_based(5);
    pub const _7: Row = Row::from_zero_based(6);
    pub const _8: Row = Row::from_zero_based(7);
}

impl Col {
    pub const A: Col = Col::from_zero_based(0);
    pub const B: Col = Col::from_zero_based(1);
    pub const C: Col = Col::from_zero_based(2);
    pub const D: Col = Col::from_zero_based(3);
    pub const E: Col = Col::from_zero_based(4);
    pub const F: Col = Col::from_zero_based(5);
    pub const G: Col = Col::from_zero_based(6);
    pub const H: Col = Col::from_zero_based(7);
}

macro_rules! coord_constants {
    ($($col:ident: $($name:ident $row:ident),+;)+) => {
        impl Coord {
            $($(pub const $name: Coord = Coord::new(Row::$row, Col::$col);)+)+
        }
    };
}

coord_constants! {
    A: A1 _1, A2 _2, A3 _3, A4 _4, A5 _5, A6 _6, A7 _7, A8 _8;
    B: B1 _1, B2 _2, B3 _3, B4 _4, B5 _5, B6 _6, B7 _7, B8 _8;
    C: C1 _1, C2 _2, C3 _3, C4 _4, C5 _5, C6 _6, C7 _7, C8 _8;
    D: D1 _1, D2 _2, D3 _3, D4 _4, D5 _5, D6 _6, D7 _7, D8 _8;
    E: E1 _1, E2 _2, E3 _3, E4 _4, E5 _5, E6 _6, E7 _7, E8 _8;
    F: F1 _1, F2 _2, F3 _3, F4 _4, F5 _5, F6 _6, F7 _7, F8 _8;
    G: G1 _1, G2 _2, G3 _3, G4 _4, G5 _5, G6 _6, G7 _7, G8 _8;
    H: H1 _1, H2 _2, H3 _3, H4 _4, H5 _5, H6 _6, H7 _7, H8 _8;
}
