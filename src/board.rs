use std::sync::atomic::{AtomicU64, Ordering};

use enum_map::{EnumMap, enum_map};
use itertools::Itertools;
use log::debug;
use strum::IntoEnumIterator;

use crate::coord::{Col, Coord, Row, SquareColor, SubjectiveRow};
use crate::error::{ChessError, ChessResult, IllegalMoveReason};
use crate::force::Force;
use crate::grid::Grid;
use crate::invalid_operation;
use crate::moves::{Move, MoveDelta, MoveDetails, MoveKind, MoveState};
use crate::piece::{
    CastleDirection, Piece, PieceId, PieceKind, PieceOnBoard, PieceOrigin, is_attacked,
    pseudo_legal_dests,
};
use crate::rules::ChessRules;
use crate::square_set::SquareSet;
use crate::starter::{BoardSetup, starting_setup};


pub type CastlingRights = EnumMap<Force, EnumMap<CastleDirection, bool>>;

// Bumped on every board mutation. Piece caches compare against it to detect staleness.
// Values are drawn from a process-wide counter, so two boards share a generation only
// when one is an unmodified clone of the other.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Generation(u64);

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

impl Generation {
    fn next() -> Self { Generation(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)) }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Square {
    pub coord: Coord,
    pub occupant: Option<PieceOnBoard>,
}

impl Square {
    pub fn color(&self) -> SquareColor { self.coord.color() }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoardStatus {
    Active,
    Checkmate { winner: Force },
    Stalemate,
    FiftyMoveRule,
}

// Partial description of a move, as produced by notation parsers. Resolved against the
// legal moves of the side to move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveQuery {
    pub piece_kind: PieceKind,
    pub to: Coord,
    pub from_col: Option<Col>,
    pub from_row: Option<Row>,
    pub promote_to: Option<PieceKind>,
}

impl MoveQuery {
    pub fn new(piece_kind: PieceKind, to: Coord) -> Self {
        MoveQuery { piece_kind, to, from_col: None, from_row: None, promote_to: None }
    }
}

// Full position state, comparable. Piece IDs are part of it, so two boards reached by
// different move orders compare equal only if the same pieces stand on the same squares.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BoardSnapshot {
    pub grid: Grid,
    pub move_counts: Vec<u32>,
    pub active_force: Force,
    pub castling_rights: CastlingRights,
    pub en_passant_file: Option<Col>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub ply: u32,
}

fn home_row(force: Force) -> Row { SubjectiveRow::from_one_based(1).to_row(force) }

fn is_last_row(force: Force, row: Row) -> bool {
    SubjectiveRow::from_row(row, force) == SubjectiveRow::from_one_based(8)
}

// Whether a pawn of `force` stands right next to `pos` on the same rank.
fn has_adjacent_pawn(grid: &Grid, pos: Coord, force: Force) -> bool {
    [-1, 1]
        .into_iter()
        .filter_map(|d_col| pos.offset((0, d_col)))
        .any(|coord| grid[coord].is_some_and(|p| p.kind == PieceKind::Pawn && p.force == force))
}

fn single_king(grid: &Grid, force: Force) -> ChessResult<Coord> {
    let num_kings = grid
        .pieces()
        .filter(|(_, p)| p.kind == PieceKind::King && p.force == force)
        .count();
    match (num_kings, grid.find_king(force)) {
        (1, Some(king)) => Ok(king),
        _ => Err(invalid_operation!("{:?} must have exactly one king, found {}", force, num_kings)),
    }
}


#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    pieces: Vec<Piece>,  // indexed by `PieceId`, captured pieces included
    active_force: Force,
    castling_rights: CastlingRights,
    en_passant_file: Option<Col>,  // file of a double step that can be captured en passant
    ply: u32,
    halfmove_clock: u32,
    fullmove_number: u32,
    kings: EnumMap<Force, Coord>,
    generation: Generation,
}

impl Board {
    pub fn new(rules: &ChessRules) -> ChessResult<Self> {
        Self::from_setup(&starting_setup(rules))
    }

    pub fn from_setup(setup: &BoardSetup) -> ChessResult<Self> {
        let mut grid = Grid::new();
        let mut pieces = Vec::new();
        let mut next_piece_id = PieceId::new();
        for placed in &setup.pieces {
            if grid[placed.coord].is_some() {
                return Err(invalid_operation!("two pieces on {}", placed.coord));
            }
            let on_edge = placed.coord.row == Row::_1 || placed.coord.row == Row::_8;
            if placed.kind == PieceKind::Pawn && on_edge {
                return Err(invalid_operation!("pawn on {}", placed.coord));
            }
            let piece =
                PieceOnBoard::new(next_piece_id.inc(), placed.kind, PieceOrigin::Innate, placed.force);
            grid[placed.coord] = Some(piece);
            pieces.push(Piece::new(piece, placed.coord));
        }
        let white_king = single_king(&grid, Force::White)?;
        let black_king = single_king(&grid, Force::Black)?;
        let kings = enum_map! {
            Force::White => white_king,
            Force::Black => black_king,
        };

        for force in Force::iter() {
            for dir in CastleDirection::iter() {
                if !setup.castling_rights[force][dir] {
                    continue;
                }
                let row = home_row(force);
                let rook_ok = grid[Coord::new(row, dir.rook_origin_col())]
                    .is_some_and(|p| p.kind == PieceKind::Rook && p.force == force);
                if kings[force] != Coord::new(row, Col::E) || !rook_ok {
                    return Err(invalid_operation!("{:?} cannot castle {:?}", force, dir));
                }
            }
        }

        if let Some(col) = setup.en_passant_file {
            let mover = setup.active_force.opponent();
            let pawn_at = Coord::new(SubjectiveRow::from_one_based(4).to_row(mover), col);
            let passed = Coord::new(SubjectiveRow::from_one_based(3).to_row(mover), col);
            let pawn_ok =
                grid[pawn_at].is_some_and(|p| p.kind == PieceKind::Pawn && p.force == mover);
            let has_capturer = has_adjacent_pawn(&grid, pawn_at, setup.active_force);
            if !pawn_ok || !has_capturer || grid[passed].is_some() {
                return Err(invalid_operation!("no en passant target on file {}", col.to_algebraic()));
            }
        }

        let waiting = setup.active_force.opponent();
        if is_attacked(&grid, kings[waiting], setup.active_force) {
            return Err(invalid_operation!("{:?} is in check but it is not their turn", waiting));
        }

        Ok(Board {
            grid,
            pieces,
            active_force: setup.active_force,
            castling_rights: setup.castling_rights,
            en_passant_file: setup.en_passant_file,
            ply: 0,
            halfmove_clock: setup.halfmove_clock,
            fullmove_number: setup.fullmove_number,
            kings,
            generation: Generation::next(),
        })
    }

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn active_force(&self) -> Force { self.active_force }
    pub fn castling_rights(&self) -> &CastlingRights { &self.castling_rights }
    pub fn en_passant_file(&self) -> Option<Col> { self.en_passant_file }
    pub fn ply(&self) -> u32 { self.ply }
    pub fn halfmove_clock(&self) -> u32 { self.halfmove_clock }
    pub fn fullmove_number(&self) -> u32 { self.fullmove_number }
    pub fn generation(&self) -> Generation { self.generation }
    pub fn king_square(&self, force: Force) -> Coord { self.kings[force] }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> { self.pieces.get(id.to_index()) }
    pub fn piece_at(&self, coord: Coord) -> Option<&Piece> {
        self.grid[coord].and_then(|p| self.piece(p.id))
    }
    // Pieces currently on the board.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(|p| !p.is_captured())
    }

    pub fn get_square(&self, file: u8, rank: u8) -> ChessResult<Square> {
        let coord = Coord::from_one_based(file, rank)?;
        Ok(Square { coord, occupant: self.grid[coord] })
    }

    pub fn is_in_check(&self, force: Force) -> bool {
        let king = self.kings[force];
        self.pieces()
            .filter(|p| p.force() != force)
            .any(|p| p.is_legal_attack(self, king))
    }

    // Square of the pawn that a pawn of `force` would capture en passant by moving
    // `from` -> `to`, if such a capture is available right now.
    pub fn en_passant_victim(&self, force: Force, from: Coord, to: Coord) -> Option<Coord> {
        if force != self.active_force || self.en_passant_file != Some(to.col) {
            return None;
        }
        let (d_row, d_col) = to - from;
        if d_row != force.direction_forward() || d_col.abs() != 1 || self.grid[to].is_some() {
            return None;
        }
        if SubjectiveRow::from_row(from.row, force) != SubjectiveRow::from_one_based(5) {
            return None;
        }
        let victim = Coord::new(from.row, to.col);
        self.grid[victim]
            .filter(|p| p.kind == PieceKind::Pawn && p.force != force)
            .map(|_| victim)
    }

    // Pin-safety filter: keeps the candidates after which the mover's king is not attacked.
    // Each candidate is tried on a scratch copy of the grid; the board itself is untouched.
    pub(crate) fn filter_legal_dests(&self, piece: &Piece, candidates: SquareSet) -> SquareSet {
        let Some(from) = piece.square() else {
            return SquareSet::EMPTY;
        };
        let force = piece.force();
        if force != self.active_force {
            return SquareSet::EMPTY;
        }
        candidates
            .iter()
            .filter(|&to| {
                let mut scratch = self.grid.clone();
                if piece.kind() == PieceKind::Pawn {
                    if let Some(victim) = self.en_passant_victim(force, from, to) {
                        scratch[victim] = None;
                    }
                }
                scratch[from] = None;
                scratch[to] = Some(piece.on_board());
                let king = if piece.kind() == PieceKind::King { to } else { self.kings[force] };
                !is_attacked(&scratch, king, force.opponent())
            })
            .collect()
    }

    pub fn legal_dests(&self, from: Coord) -> SquareSet {
        self.piece_at(from).map_or(SquareSet::EMPTY, |p| p.gen_legal_dests(self))
    }

    // Legal destinations of every piece of the side to move that has any.
    pub fn gen_legal_dests(&self) -> Vec<(Coord, SquareSet)> {
        self.pieces()
            .filter(|p| p.force() == self.active_force)
            .filter_map(|p| Some((p.square()?, p.gen_legal_dests(self))))
            .filter(|(_, dests)| !dests.is_empty())
            .collect()
    }

    // All legal moves, with one move per promotion choice.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for (from, dests) in self.gen_legal_dests() {
            let is_pawn = self.grid[from].is_some_and(|p| p.kind == PieceKind::Pawn);
            for to in dests {
                if is_pawn && is_last_row(self.active_force, to.row) {
                    for kind in [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight] {
                        moves.push(Move::with_promotion(from, to, kind));
                    }
                } else {
                    moves.push(Move::new(from, to));
                }
            }
        }
        moves
    }

    pub fn status(&self) -> BoardStatus {
        if self.gen_legal_dests().is_empty() {
            if self.is_in_check(self.active_force) {
                BoardStatus::Checkmate { winner: self.active_force.opponent() }
            } else {
                BoardStatus::Stalemate
            }
        } else if self.halfmove_clock >= 100 {
            BoardStatus::FiftyMoveRule
        } else {
            BoardStatus::Active
        }
    }

    pub fn find_move(&self, query: MoveQuery) -> ChessResult<Move> {
        let candidates = self
            .pieces()
            .filter(|p| p.force() == self.active_force && p.kind() == query.piece_kind)
            .filter_map(|p| p.square())
            .filter(|from| query.from_col.is_none_or(|col| col == from.col))
            .filter(|from| query.from_row.is_none_or(|row| row == from.row))
            .filter(|&from| self.legal_dests(from).contains(query.to))
            .collect_vec();
        match candidates.as_slice() {
            [] => Err(ChessError::IllegalMove { to: query.to, reason: IllegalMoveReason::NoCandidate }),
            [from] => Ok(match query.promote_to {
                Some(kind) => Move::with_promotion(*from, query.to, kind),
                None => Move::new(*from, query.to),
            }),
            _ => Err(ChessError::AmbiguousMove { num_candidates: candidates.len() }),
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            grid: self.grid.clone(),
            move_counts: self.pieces.iter().map(|p| p.move_count()).collect(),
            active_force: self.active_force,
            castling_rights: self.castling_rights,
            en_passant_file: self.en_passant_file,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            ply: self.ply,
        }
    }

    fn illegal_reason(&self, piece: &Piece, from: Coord, to: Coord) -> IllegalMoveReason {
        let (d_row, d_col) = to - from;
        if piece.kind() == PieceKind::King && d_row == 0 && d_col.abs() == 2 {
            let dir = if d_col > 0 { CastleDirection::HSide } else { CastleDirection::ASide };
            let rook_col = dir.rook_origin_col();
            let (lo, hi) = if from.col < rook_col { (from.col, rook_col) } else { (rook_col, from.col) };
            if !self.castling_rights[piece.force()][dir] {
                IllegalMoveReason::CastlingPieceHasMoved
            } else if Col::all().any(|col| lo < col && col < hi && self.grid[Coord::new(from.row, col)].is_some()) {
                IllegalMoveReason::PathBlocked
            } else {
                IllegalMoveReason::UnprotectedKing
            }
        } else if pseudo_legal_dests(piece, self).contains(to) {
            IllegalMoveReason::UnprotectedKing
        } else {
            IllegalMoveReason::ImpossibleTrajectory
        }
    }

    // Checks the move against the current position without changing anything.
    pub(crate) fn verify(
        &self, from: Coord, to: Coord, promote_to: Option<PieceKind>,
    ) -> ChessResult<MoveDetails> {
        use IllegalMoveReason::*;
        let on_board = self.grid[from].ok_or(ChessError::IllegalMove { to, reason: PieceMissing })?;
        let force = on_board.force;
        if force != self.active_force {
            return Err(ChessError::OutOfTurn { from });
        }
        let piece = self
            .piece(on_board.id)
            .ok_or(ChessError::IllegalMove { to, reason: PieceMissing })?;
        if !piece.is_legal_dest(self, to) {
            return Err(ChessError::IllegalMove { to, reason: self.illegal_reason(piece, from, to) });
        }

        let d_col = to.col - from.col;
        let kind = match on_board.kind {
            PieceKind::King if d_col.abs() == 2 => MoveKind::Castle(if d_col > 0 {
                CastleDirection::HSide
            } else {
                CastleDirection::ASide
            }),
            PieceKind::Pawn if d_col != 0 && self.grid[to].is_none() => MoveKind::EnPassant,
            PieceKind::Pawn if is_last_row(force, to.row) => match promote_to {
                Some(promote_to) if promote_to.can_promote_to() => MoveKind::Promotion(promote_to),
                _ => return Err(ChessError::IllegalMove { to, reason: BadPromotion }),
            },
            _ => MoveKind::Normal,
        };
        if promote_to.is_some() && !matches!(kind, MoveKind::Promotion(_)) {
            return Err(ChessError::IllegalMove { to, reason: BadPromotion });
        }

        let captured_at = match kind {
            MoveKind::EnPassant => Some(Coord::new(from.row, to.col)),
            MoveKind::Castle(_) => None,
            MoveKind::Normal | MoveKind::Promotion(_) => Some(to),
        };
        let captured = captured_at.and_then(|at| self.grid[at].map(|p| (p.id, at)));
        Ok(MoveDetails { piece: on_board.id, force, kind, captured })
    }

    // Verifies and executes the move. The board is left untouched if verification fails.
    pub fn play(&mut self, mv: &mut Move) -> ChessResult<()> {
        if mv.is_executed() {
            return Err(invalid_operation!("move {} is already executed", mv));
        }
        let details = match self.verify(mv.from(), mv.to(), mv.promote_to()) {
            Ok(details) => details,
            Err(err) => {
                debug!("Rejected move {} at ply {}: {}", mv, self.ply, err);
                return Err(err);
            },
        };
        let delta = self.apply(mv.from(), mv.to(), details);
        mv.set_state(MoveState::Executed(details, delta));
        debug!("Played {} ({:?}), ply {}", mv, details.kind, self.ply);
        Ok(())
    }

    // Reverts the most recently played move.
    pub fn unplay(&mut self, mv: &mut Move) -> ChessResult<()> {
        let MoveState::Executed(details, delta) = mv.state() else {
            return Err(invalid_operation!("move {} is not executed", mv));
        };
        let (from, to) = (mv.from(), mv.to());
        let last_played =
            self.ply == delta.ply_before + 1 && self.grid[to].map(|p| p.id) == Some(details.piece);
        if !last_played {
            return Err(invalid_operation!("move {} is not the last move played", mv));
        }

        match details.kind {
            MoveKind::Promotion(_) => self.set_piece_kind(to, PieceKind::Pawn, PieceOrigin::Innate),
            MoveKind::Castle(dir) => {
                let row = from.row;
                self.relocate(
                    Coord::new(row, dir.rook_destination_col()),
                    Coord::new(row, dir.rook_origin_col()),
                    -1,
                );
            },
            MoveKind::Normal | MoveKind::EnPassant => {},
        }
        self.relocate(to, from, -1);
        if let Some((captured, at)) = details.captured {
            if let Some(piece) = self.pieces.get_mut(captured.to_index()) {
                self.grid[at] = Some(piece.on_board());
                piece.set_square(Some(at));
            }
        }
        if self.grid[from].is_some_and(|p| p.kind == PieceKind::King) {
            self.kings[details.force] = from;
        }

        self.castling_rights = delta.castling_rights;
        self.en_passant_file = delta.en_passant_file;
        self.halfmove_clock = delta.halfmove_clock;
        self.fullmove_number = delta.fullmove_number;
        self.ply = delta.ply_before;
        self.active_force = details.force;
        self.bump_generation();
        mv.set_state(MoveState::Verified(details));
        debug!("Unplayed {}, ply {}", mv, self.ply);
        Ok(())
    }

    fn apply(&mut self, from: Coord, to: Coord, details: MoveDetails) -> MoveDelta {
        let delta = MoveDelta {
            castling_rights: self.castling_rights,
            en_passant_file: self.en_passant_file,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            ply_before: self.ply,
        };
        let force = details.force;
        let moved_kind = self.grid[from].map(|p| p.kind);

        if let Some((captured, at)) = details.captured {
            self.grid[at] = None;
            if let Some(piece) = self.pieces.get_mut(captured.to_index()) {
                piece.set_square(None);
            }
        }
        self.relocate(from, to, 1);
        match details.kind {
            MoveKind::Castle(dir) => {
                let row = from.row;
                self.relocate(
                    Coord::new(row, dir.rook_origin_col()),
                    Coord::new(row, dir.rook_destination_col()),
                    1,
                );
            },
            MoveKind::Promotion(kind) => self.set_piece_kind(to, kind, PieceOrigin::Promoted),
            MoveKind::Normal | MoveKind::EnPassant => {},
        }

        if moved_kind == Some(PieceKind::King) {
            self.kings[force] = to;
            self.castling_rights[force] = enum_map! { _ => false };
        }
        // Anything leaving or landing on a rook's home corner ends castling on that side.
        for f in Force::iter() {
            for dir in CastleDirection::iter() {
                let corner = Coord::new(home_row(f), dir.rook_origin_col());
                if from == corner || to == corner {
                    self.castling_rights[f][dir] = false;
                }
            }
        }

        let is_pawn_move = moved_kind == Some(PieceKind::Pawn);
        let (d_row, _) = to - from;
        // Set only when an enemy pawn is in place to capture on the next ply.
        let double_step = is_pawn_move && d_row.abs() == 2;
        self.en_passant_file = (double_step && has_adjacent_pawn(&self.grid, to, force.opponent()))
            .then_some(from.col);
        self.halfmove_clock =
            if is_pawn_move || details.captured.is_some() { 0 } else { self.halfmove_clock + 1 };
        if force == Force::Black {
            self.fullmove_number += 1;
        }
        self.active_force = force.opponent();
        self.ply += 1;
        self.bump_generation();
        delta
    }

    fn relocate(&mut self, from: Coord, to: Coord, move_count_delta: i32) {
        if let Some(piece) = self.grid[from].take() {
            self.grid[to] = Some(piece);
            if let Some(state) = self.pieces.get_mut(piece.id.to_index()) {
                state.set_square(Some(to));
                state.add_moves(move_count_delta);
            }
        }
    }

    fn set_piece_kind(&mut self, at: Coord, kind: PieceKind, origin: PieceOrigin) {
        if let Some(piece) = &mut self.grid[at] {
            piece.kind = kind;
            piece.origin = origin;
            if let Some(state) = self.pieces.get_mut(piece.id.to_index()) {
                state.set_kind(kind, origin);
            }
        }
    }

    fn bump_generation(&mut self) { self.generation = Generation::next(); }
}
