use thiserror::Error;

use crate::coord::Coord;


// Why a candidate move is not in the legal set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IllegalMoveReason {
    PieceMissing,
    NoCandidate,
    ImpossibleTrajectory,
    UnprotectedKing,
    CastlingPieceHasMoved,
    PathBlocked,
    BadPromotion,
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ChessError {
    #[error("illegal move to {to}: {reason:?}")]
    IllegalMove { to: Coord, reason: IllegalMoveReason },

    #[error("piece on {from} does not belong to the side to move")]
    OutOfTurn { from: Coord },

    // Produced only when resolving partial move descriptions.
    #[error("{num_candidates} legal moves match the description")]
    AmbiguousMove { num_candidates: usize },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("square ({file}, {rank}) is outside the board")]
    OutOfBounds { file: u8, rank: u8 },
}

pub type ChessResult<T> = Result<T, ChessError>;

#[macro_export]
macro_rules! invalid_operation {
    ($($arg:tt)+) => {
        $crate::error::ChessError::InvalidOperation(format!($($arg)+))
    };
}
