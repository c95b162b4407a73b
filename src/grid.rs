use std::{fmt, ops};

use ndarray::{Array, Array2};

use crate::coord::{Coord, NUM_COLS, NUM_ROWS};
use crate::force::Force;
use crate::piece::{PieceKind, PieceOnBoard};


// Square occupancy. Cheap to clone, which is how legality checks try out moves without
// touching the real board.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    data: Array2<Option<PieceOnBoard>>,
}

impl Grid {
    pub fn new() -> Self {
        Grid {
            data: Array::from_elem((NUM_ROWS as usize, NUM_COLS as usize), None),
        }
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Coord, PieceOnBoard)> + '_ {
        Coord::all().filter_map(|coord| self[coord].map(|piece| (coord, piece)))
    }

    pub fn find_king(&self, force: Force) -> Option<Coord> {
        self.pieces()
            .find(|(_, piece)| piece.kind == PieceKind::King && piece.force == force)
            .map(|(coord, _)| coord)
    }

    // Temporarily puts `piece` on `pos`; the original occupant returns when the guard drops.
    pub fn scoped_set(&mut self, pos: Coord, piece: Option<PieceOnBoard>) -> ScopedSquare<'_> {
        let original = std::mem::replace(&mut self[pos], piece);
        ScopedSquare { grid: self, pos, original }
    }
}

pub struct ScopedSquare<'g> {
    grid: &'g mut Grid,
    pos: Coord,
    original: Option<PieceOnBoard>,
}

impl ops::Deref for ScopedSquare<'_> {
    type Target = Grid;
    fn deref(&self) -> &Grid { self.grid }
}

impl ops::DerefMut for ScopedSquare<'_> {
    fn deref_mut(&mut self) -> &mut Grid { self.grid }
}

impl Drop for ScopedSquare<'_> {
    fn drop(&mut self) { self.grid[self.pos] = self.original; }
}

impl ops::Index<Coord> for Grid {
    type Output = Option<PieceOnBoard>;
    fn index(&self, pos: Coord) -> &Self::Output {
        &self.data[coord_to_index(pos)]
    }
}

impl ops::IndexMut<Coord> for Grid {
    fn index_mut(&mut self, pos: Coord) -> &mut Self::Output {
        &mut self.data[coord_to_index(pos)]
    }
}

fn coord_to_index(pos: Coord) -> [usize; 2] {
    [
        pos.row.to_zero_based() as usize,
        pos.col.to_zero_based() as usize,
    ]
}

fn debug_format_piece(piece: &PieceOnBoard) -> String {
    format!("[{}]-{:?}-{:?}", piece.id.to_index(), piece.force, piece.kind)
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Grid ")?;
        f.debug_map()
            .entries(self.pieces().map(|(coord, piece)| (coord.to_algebraic(), debug_format_piece(&piece))))
            .finish()
    }
}
