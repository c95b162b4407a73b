use enum_map::enum_map;
use serde::{Deserialize, Serialize};

use crate::board::CastlingRights;
use crate::coord::{Col, Coord, NUM_ROWS, Row};
use crate::force::Force;
use crate::piece::PieceKind;
use crate::rules::{ChessRules, StartingPosition};


#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub coord: Coord,
    pub kind: PieceKind,
    pub force: Force,
}

// Everything needed to start a board in an arbitrary position.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BoardSetup {
    pub pieces: Vec<PlacedPiece>,
    pub active_force: Force,
    pub castling_rights: CastlingRights,
    pub en_passant_file: Option<Col>,
    #[serde(default)]
    pub halfmove_clock: u32,
    #[serde(default = "first_move_number")]
    pub fullmove_number: u32,
}

fn first_move_number() -> u32 { 1 }

impl BoardSetup {
    pub fn empty(active_force: Force) -> Self {
        BoardSetup {
            pieces: Vec::new(),
            active_force,
            castling_rights: enum_map! { _ => enum_map! { _ => false } },
            en_passant_file: None,
            halfmove_clock: 0,
            fullmove_number: first_move_number(),
        }
    }

    pub fn place(&mut self, coord: Coord, kind: PieceKind, force: Force) -> &mut Self {
        self.pieces.push(PlacedPiece { coord, kind, force });
        self
    }
}

fn setup_white_pieces(setup: &mut BoardSetup) {
    use PieceKind::*;
    let back_row = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
    for (col, kind) in Col::all().zip(back_row) {
        setup.place(Coord::new(Row::_1, col), kind, Force::White);
    }
    for col in Col::all() {
        setup.place(Coord::new(Row::_2, col), Pawn, Force::White);
    }
}

fn setup_black_pieces_mirrorlike(setup: &mut BoardSetup) {
    let mirrored: Vec<_> = setup
        .pieces
        .iter()
        .filter(|piece| piece.force == Force::White)
        .map(|piece| {
            let mirror_row = Row::from_zero_based(NUM_ROWS - piece.coord.row.to_zero_based() - 1);
            PlacedPiece {
                coord: Coord::new(mirror_row, piece.coord.col),
                force: Force::Black,
                ..*piece
            }
        })
        .collect();
    setup.pieces.extend(mirrored);
}

pub fn classic_setup() -> BoardSetup {
    let mut setup = BoardSetup::empty(Force::White);
    setup_white_pieces(&mut setup);
    setup_black_pieces_mirrorlike(&mut setup);
    setup.castling_rights = enum_map! { _ => enum_map! { _ => true } };
    setup
}

pub fn starting_setup(rules: &ChessRules) -> BoardSetup {
    match &rules.starting_position {
        StartingPosition::Classic => classic_setup(),
        StartingPosition::Setup(setup) => setup.clone(),
    }
}
