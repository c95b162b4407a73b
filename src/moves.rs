use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, CastlingRights};
use crate::coord::{Col, Coord};
use crate::error::ChessResult;
use crate::force::Force;
use crate::invalid_operation;
use crate::piece::{CastleDirection, PieceId, PieceKind};


#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MoveKind {
    Normal,
    Castle(CastleDirection),
    EnPassant,
    Promotion(PieceKind),
}

// Facts established when a move passes verification against a position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveDetails {
    pub piece: PieceId,
    pub force: Force,
    pub kind: MoveKind,
    pub captured: Option<(PieceId, Coord)>,
}

// Board state overwritten by the move and restored by undo.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveDelta {
    pub castling_rights: CastlingRights,
    pub en_passant_file: Option<Col>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub ply_before: u32,
}

// Unverified -> Verified -> Executed -> Verified -> ...
// Verification happens as part of the first successful execution.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveState {
    Unverified,
    Verified(MoveDetails),
    Executed(MoveDetails, MoveDelta),
}

// Stored on terminal moves; the engine never interprets it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

// One ply. The only way to change a `Board` besides constructing it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Move {
    from: Coord,
    to: Coord,
    promote_to: Option<PieceKind>,
    state: MoveState,
    annotation: Option<String>,
    result: Option<GameResult>,
}

impl Move {
    pub fn new(from: Coord, to: Coord) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            state: MoveState::Unverified,
            annotation: None,
            result: None,
        }
    }

    pub fn with_promotion(from: Coord, to: Coord, promote_to: PieceKind) -> Self {
        Move { promote_to: Some(promote_to), ..Move::new(from, to) }
    }

    pub fn from(&self) -> Coord { self.from }
    pub fn to(&self) -> Coord { self.to }
    pub fn promote_to(&self) -> Option<PieceKind> { self.promote_to }
    pub fn state(&self) -> MoveState { self.state }
    pub fn is_executed(&self) -> bool { matches!(self.state, MoveState::Executed(..)) }
    pub fn is_verified(&self) -> bool { !matches!(self.state, MoveState::Unverified) }

    pub fn details(&self) -> Option<MoveDetails> {
        match self.state {
            MoveState::Unverified => None,
            MoveState::Verified(details) | MoveState::Executed(details, _) => Some(details),
        }
    }
    pub fn kind(&self) -> Option<MoveKind> { self.details().map(|d| d.kind) }
    pub fn piece(&self) -> Option<PieceId> { self.details().map(|d| d.piece) }
    pub fn captured(&self) -> Option<PieceId> {
        self.details().and_then(|d| d.captured).map(|(id, _)| id)
    }

    pub(crate) fn set_state(&mut self, state: MoveState) { self.state = state; }

    // Whether the move could be played in the board's current position.
    pub fn is_legal(&self, board: &Board) -> bool {
        !self.is_executed() && board.verify(self.from, self.to, self.promote_to).is_ok()
    }

    pub fn execute(&mut self, board: &mut Board) -> ChessResult<()> { board.play(self) }

    pub fn unexecute(&mut self, board: &mut Board) -> ChessResult<()> { board.unplay(self) }

    // Drops a move that is not attached to any history. Moves inside a history are
    // disposed through `History::dispose`.
    pub fn dispose(self) -> ChessResult<()> {
        if self.is_executed() {
            return Err(invalid_operation!("cannot dispose executed move {}", self));
        }
        Ok(())
    }

    pub fn annotation(&self) -> Option<&str> { self.annotation.as_deref() }
    pub fn set_annotation(&mut self, annotation: Option<String>) { self.annotation = annotation; }

    pub fn result(&self) -> Option<GameResult> { self.result }
    pub(crate) fn set_result(&mut self, result: Option<GameResult>) { self.result = result; }
}

// Coordinate form, e.g. "e2e4" or "e7e8Q". Not meant as a notation format.
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promote_to {
            write!(f, "{}", kind.to_full_algebraic())?;
        }
        Ok(())
    }
}
