use std::cell::RefCell;

use derive_new::new;
use enum_map::Enum;
use log::trace;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::board::{Board, Generation};
use crate::coord::{Col, Coord, SubjectiveRow};
use crate::force::Force;
use crate::grid::Grid;
use crate::square_set::SquareSet;


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PieceOrigin {
    Innate,
    Promoted,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    pub fn new() -> Self { PieceId(0) }
    pub fn to_index(self) -> usize { self.0 as usize }
    // Returns the current ID and advances to the next one.
    pub fn inc(&mut self) -> Self {
        let id = *self;
        self.0 += 1;
        id
    }
}

// What a grid square holds. The mutable per-piece state lives in `Piece`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, new)]
pub struct PieceOnBoard {
    pub id: PieceId,
    pub kind: PieceKind,
    pub origin: PieceOrigin,
    pub force: Force,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Enum, EnumIter, Serialize, Deserialize)]
pub enum CastleDirection {
    ASide,  // queenside
    HSide,  // kingside
}

impl CastleDirection {
    pub fn rook_origin_col(self) -> Col {
        match self {
            CastleDirection::ASide => Col::A,
            CastleDirection::HSide => Col::H,
        }
    }
    pub fn king_destination_col(self) -> Col {
        match self {
            CastleDirection::ASide => Col::C,
            CastleDirection::HSide => Col::G,
        }
    }
    pub fn rook_destination_col(self) -> Col {
        match self {
            CastleDirection::ASide => Col::D,
            CastleDirection::HSide => Col::F,
        }
    }
}


const ORTHOGONAL_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ALL_DIRECTIONS: [(i8, i8); 8] =
    [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_STEPS: [(i8, i8); 8] =
    [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];

impl PieceKind {
    // Should not be used to construct moves in algebraic notation, because it returns a
    // non-empty name for a pawn.
    pub fn to_full_algebraic(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub fn from_algebraic_char(notation: char) -> Option<Self> {
        PieceKind::iter().find(|kind| kind.to_full_algebraic() == notation)
    }

    pub fn can_promote_to(self) -> bool {
        use PieceKind::*;
        match self {
            Pawn | King => false,
            Knight | Bishop | Rook | Queen => true,
        }
    }

    // Directions along which the piece slides; empty for pieces that step.
    pub fn ray_directions(self) -> &'static [(i8, i8)] {
        match self {
            PieceKind::Bishop => &DIAGONAL_DIRECTIONS,
            PieceKind::Rook => &ORTHOGONAL_DIRECTIONS,
            PieceKind::Queen => &ALL_DIRECTIONS,
            PieceKind::Pawn | PieceKind::Knight | PieceKind::King => &[],
        }
    }

    // Whether an attack by this piece can be interposed.
    pub fn is_blockable(self) -> bool { !self.ray_directions().is_empty() }
}

// Uppercase for White, lowercase for Black.
pub fn piece_to_ascii(kind: PieceKind, force: Force) -> char {
    let ch = kind.to_full_algebraic();
    match force {
        Force::White => ch,
        Force::Black => ch.to_ascii_lowercase(),
    }
}

pub fn piece_from_ascii(ch: char) -> Option<(PieceKind, Force)> {
    let kind = PieceKind::from_algebraic_char(ch.to_ascii_uppercase())?;
    let force = if ch.is_ascii_uppercase() { Force::White } else { Force::Black };
    Some((kind, force))
}


#[derive(Clone, Copy, Debug)]
struct Memo {
    generation: Generation,
    squares: SquareSet,
}

fn memoized(
    cell: &RefCell<Option<Memo>>, generation: Generation, compute: impl FnOnce() -> SquareSet,
) -> SquareSet {
    if let Some(memo) = *cell.borrow() {
        if memo.generation == generation {
            return memo.squares;
        }
    }
    let squares = compute();
    *cell.borrow_mut() = Some(Memo { generation, squares });
    squares
}

// A piece as tracked by the board over its whole life, including after capture.
// Kind changes in place on promotion so the ID stays stable across undo.
#[derive(Clone, Debug)]
pub struct Piece {
    on_board: PieceOnBoard,
    square: Option<Coord>,
    move_count: u32,
    legal_dests: RefCell<Option<Memo>>,
    guarded: RefCell<Option<Memo>>,
}

impl Piece {
    pub(crate) fn new(on_board: PieceOnBoard, square: Coord) -> Self {
        Piece {
            on_board,
            square: Some(square),
            move_count: 0,
            legal_dests: RefCell::new(None),
            guarded: RefCell::new(None),
        }
    }

    pub fn id(&self) -> PieceId { self.on_board.id }
    pub fn kind(&self) -> PieceKind { self.on_board.kind }
    pub fn force(&self) -> Force { self.on_board.force }
    pub fn origin(&self) -> PieceOrigin { self.on_board.origin }
    pub fn on_board(&self) -> PieceOnBoard { self.on_board }
    pub fn square(&self) -> Option<Coord> { self.square }
    pub fn is_captured(&self) -> bool { self.square.is_none() }
    pub fn move_count(&self) -> u32 { self.move_count }
    pub fn is_blockable(&self) -> bool { self.kind().is_blockable() }

    pub(crate) fn set_square(&mut self, square: Option<Coord>) { self.square = square; }
    pub(crate) fn set_kind(&mut self, kind: PieceKind, origin: PieceOrigin) {
        self.on_board.kind = kind;
        self.on_board.origin = origin;
    }
    pub(crate) fn add_moves(&mut self, delta: i32) {
        self.move_count = self.move_count.saturating_add_signed(delta);
    }

    // Destinations that neither break movement rules nor leave the own king in check.
    // Empty for captured pieces and for pieces of the side not to move.
    pub fn gen_legal_dests(&self, board: &Board) -> SquareSet {
        memoized(&self.legal_dests, board.generation(), || {
            trace!("Recomputing legal destinations for {:?}", self.on_board);
            board.filter_legal_dests(self, pseudo_legal_dests(self, board))
        })
    }

    // Squares the piece could capture on right now, regardless of whose turn it is.
    pub fn guarded_squares(&self, board: &Board) -> SquareSet {
        memoized(&self.guarded, board.generation(), || match self.square {
            Some(from) => guarded_squares(self.on_board, from, board.grid()),
            None => SquareSet::EMPTY,
        })
    }

    pub fn is_legal_dest(&self, board: &Board, to: Coord) -> bool {
        self.gen_legal_dests(board).contains(to)
    }

    pub fn is_legal_attack(&self, board: &Board, to: Coord) -> bool {
        self.guarded_squares(board).contains(to)
    }
}


fn ray_squares(from: Coord, direction: (i8, i8), grid: &Grid) -> impl Iterator<Item = Coord> + '_ {
    let mut pos = Some(from);
    let mut blocked = false;
    std::iter::from_fn(move || {
        if blocked {
            return None;
        }
        let next = pos?.offset(direction)?;
        blocked = grid[next].is_some();
        pos = Some(next);
        Some(next)
    })
}

// Squares attacked by `piece` standing on `from`. Sliding attacks include the first
// occupied square in each direction, whoever stands there.
pub fn guarded_squares(piece: PieceOnBoard, from: Coord, grid: &Grid) -> SquareSet {
    let steps = |offsets: &[(i8, i8)]| -> SquareSet {
        offsets.iter().filter_map(|&offset| from.offset(offset)).collect()
    };
    match piece.kind {
        PieceKind::Pawn => {
            let forward = piece.force.direction_forward();
            steps(&[(forward, -1), (forward, 1)])
        },
        PieceKind::Knight => steps(&KNIGHT_STEPS),
        PieceKind::King => steps(&ALL_DIRECTIONS),
        PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => piece
            .kind
            .ray_directions()
            .iter()
            .flat_map(|&direction| ray_squares(from, direction, grid))
            .collect(),
    }
}

// Whether any piece of force `by` guards `target` on the given grid.
pub fn is_attacked(grid: &Grid, target: Coord, by: Force) -> bool {
    grid.pieces()
        .filter(|(_, piece)| piece.force == by)
        .any(|(from, piece)| guarded_squares(piece, from, grid).contains(target))
}

// Destinations allowed by movement rules, before the king safety filter.
pub fn pseudo_legal_dests(piece: &Piece, board: &Board) -> SquareSet {
    let Some(from) = piece.square() else {
        return SquareSet::EMPTY;
    };
    let grid = board.grid();
    let force = piece.force();
    let not_own = |to: &Coord| grid[*to].is_none_or(|other| other.force != force);
    match piece.kind() {
        PieceKind::Pawn => pawn_dests(piece, from, board),
        PieceKind::King => {
            let mut dests: SquareSet =
                guarded_squares(piece.on_board(), from, grid).iter().filter(not_own).collect();
            dests |= castling_dests(piece, from, board);
            dests
        },
        PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
            guarded_squares(piece.on_board(), from, grid).iter().filter(not_own).collect()
        },
    }
}

fn pawn_dests(piece: &Piece, from: Coord, board: &Board) -> SquareSet {
    let grid = board.grid();
    let force = piece.force();
    let forward = force.direction_forward();
    let mut dests = SquareSet::EMPTY;
    if let Some(one_step) = from.offset((forward, 0)) {
        if grid[one_step].is_none() {
            dests.insert(one_step);
            let unmoved = piece.move_count() == 0
                && SubjectiveRow::from_row(from.row, force) == SubjectiveRow::from_one_based(2);
            if unmoved {
                if let Some(two_steps) = one_step.offset((forward, 0)) {
                    if grid[two_steps].is_none() {
                        dests.insert(two_steps);
                    }
                }
            }
        }
    }
    for to in guarded_squares(piece.on_board(), from, grid) {
        match grid[to] {
            Some(target) => {
                if target.force != force {
                    dests.insert(to);
                }
            },
            None => {
                if board.en_passant_victim(force, from, to).is_some() {
                    dests.insert(to);
                }
            },
        }
    }
    dests
}

// Columns strictly between `a` and `b`.
fn cols_between(a: Col, b: Col) -> impl Iterator<Item = Col> {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    Col::all().filter(move |&col| lo < col && col < hi)
}

fn castling_dests(king: &Piece, from: Coord, board: &Board) -> SquareSet {
    let force = king.force();
    let mut dests = SquareSet::EMPTY;
    if force != board.active_force() {
        return dests;
    }
    let grid = board.grid();
    let row = SubjectiveRow::from_one_based(1).to_row(force);
    if from != Coord::new(row, Col::E) {
        return dests;
    }
    for dir in CastleDirection::iter() {
        if !board.castling_rights()[force][dir] {
            continue;
        }
        let rook_from = Coord::new(row, dir.rook_origin_col());
        let has_rook = grid[rook_from]
            .is_some_and(|rook| rook.kind == PieceKind::Rook && rook.force == force);
        if !has_rook {
            continue;
        }
        if cols_between(from.col, rook_from.col).any(|col| grid[Coord::new(row, col)].is_some()) {
            continue;
        }
        if board.is_in_check(force) {
            return dests;
        }
        // Walk the king over each square it crosses and test for attacks there.
        let king_to = Coord::new(row, dir.king_destination_col());
        let mut scratch = grid.clone();
        scratch[from] = None;
        let path_is_safe = cols_between(from.col, king_to.col)
            .chain([king_to.col])
            .map(|col| Coord::new(row, col))
            .all(|pos| {
                let scratch = scratch.scoped_set(pos, Some(king.on_board()));
                !is_attacked(&scratch, pos, force.opponent())
            });
        if path_is_safe {
            dests.insert(king_to);
        }
    }
    dests
}
