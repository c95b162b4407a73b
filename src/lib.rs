#![forbid(unsafe_code)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod board;
pub mod coord;
pub mod error;
pub mod force;
pub mod grid;
pub mod history;
pub mod moves;
pub mod piece;
pub mod rules;
pub mod square_set;
pub mod starter;

pub use board::{Board, BoardSnapshot, BoardStatus, CastlingRights, Generation, MoveQuery, Square};
pub use coord::{Col, Coord, Row, SquareColor, SubjectiveRow};
pub use error::{ChessError, ChessResult, IllegalMoveReason};
pub use force::Force;
pub use history::{ContinuationList, History, MoveId};
pub use moves::{GameResult, Move, MoveKind, MoveState};
pub use piece::{CastleDirection, Piece, PieceId, PieceKind, PieceOrigin};
pub use rules::{ChessRules, StartingPosition};
pub use square_set::SquareSet;
pub use starter::{BoardSetup, PlacedPiece};
