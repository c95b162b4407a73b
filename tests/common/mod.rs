// Shared by several integration test crates, each of which uses only part of it.
#![allow(dead_code)]

use chess_tree::coord::{Col, Coord, Row};
use chess_tree::force::Force;
use chess_tree::history::{History, MoveId};
use chess_tree::moves::Move;
use chess_tree::piece::{PieceKind, piece_from_ascii};
use chess_tree::starter::BoardSetup;
use chess_tree::{ChessResult, ChessRules};
use itertools::Itertools;
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use regex_lite::Regex;


pub fn init_logger() { let _ = env_logger::builder().is_test(true).try_init(); }

// In theory random tests verify properties that should always hold, but let's fix the
// seed to avoid sporadic failures.
pub fn deterministic_rng() -> StdRng { StdRng::from_seed([0; 32]) }

pub fn classic_history() -> History {
    init_logger();
    History::new(&ChessRules::classic()).unwrap()
}

pub fn history_from_setup(setup: BoardSetup) -> History {
    init_logger();
    History::new(&ChessRules::from_setup(setup)).unwrap()
}

// Parses a diagram with rank 8 on top. Uppercase letters are White, lowercase are Black,
// '.' is an empty square. Castling rights are off; adjust the result if needed.
pub fn parse_board(board_str: &str, active_force: Force) -> Result<BoardSetup, String> {
    let rows = board_str
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.split_ascii_whitespace().collect_vec())
        .collect_vec();
    if rows.len() != 8 || rows.iter().any(|row| row.len() != 8) {
        return Err(format!("Expected 8x8 board, got {:?}", rows));
    }
    let mut setup = BoardSetup::empty(active_force);
    for (row_idx, row) in rows.iter().rev().enumerate() {
        for (col_idx, piece_str) in row.iter().enumerate() {
            let coord =
                Coord::new(Row::from_zero_based(row_idx as u8), Col::from_zero_based(col_idx as u8));
            let piece_char = piece_str
                .chars()
                .exactly_one()
                .map_err(|_| format!("Invalid piece: {}", piece_str))?;
            if piece_char == '.' {
                continue;
            }
            let (kind, force) = piece_from_ascii(piece_char)
                .ok_or_else(|| format!("Invalid piece: {}", piece_char))?;
            setup.place(coord, kind, force);
        }
    }
    Ok(setup)
}

// Parses coordinate notation like "e2e4" or "e7e8Q", optionally prefixed by a move number.
pub fn parse_move(notation: &str) -> Move {
    lazy_static! {
        static ref MOVE_RE: Regex =
            Regex::new(r"^(?:[0-9]+\.)?([a-h][1-8])([a-h][1-8])([NBRQ])?$").unwrap();
    }
    let caps = MOVE_RE.captures(notation).unwrap_or_else(|| panic!("Bad move: {notation}"));
    let from = Coord::from_algebraic(&caps[1]).unwrap();
    let to = Coord::from_algebraic(&caps[2]).unwrap();
    match caps.get(3) {
        Some(kind) => {
            let kind = PieceKind::from_algebraic_char(kind.as_str().chars().next().unwrap()).unwrap();
            Move::with_promotion(from, to, kind)
        }
        None => Move::new(from, to),
    }
}

pub fn replay_log(history: &mut History, log: &str) -> ChessResult<Vec<MoveId>> {
    log.split_whitespace().map(|notation| history.add(parse_move(notation))).collect()
}

// Plays up to `max_plies` random legal moves. Stops early if the game is over.
pub fn random_playout(history: &mut History, rng: &mut impl Rng, max_plies: usize) -> Vec<MoveId> {
    let mut ids = Vec::new();
    for _ in 0..max_plies {
        let moves = history.board().legal_moves();
        let Some(mv) = moves.choose(rng) else {
            break;
        };
        ids.push(history.add(mv.clone()).unwrap());
    }
    ids
}
