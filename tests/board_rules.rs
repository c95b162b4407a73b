mod common;

use chess_tree::board::{Board, BoardStatus, MoveQuery};
use chess_tree::coord::{Col, Coord, SquareColor};
use chess_tree::error::{ChessError, IllegalMoveReason};
use chess_tree::force::Force;
use chess_tree::moves::{Move, MoveKind};
use chess_tree::piece::{CastleDirection, PieceKind, PieceOrigin};
use chess_tree::rules::ChessRules;
use chess_tree::square_set::SquareSet;
use common::*;
use indoc::indoc;
use pretty_assertions::assert_eq;


fn classic_board() -> Board {
    init_logger();
    Board::new(&ChessRules::classic()).unwrap()
}

fn board_from_diagram(diagram: &str, active_force: Force) -> Board {
    init_logger();
    Board::from_setup(&parse_board(diagram, active_force).unwrap()).unwrap()
}

fn play(board: &mut Board, notation: &str) -> Result<Move, ChessError> {
    let mut mv = parse_move(notation);
    board.play(&mut mv)?;
    Ok(mv)
}

fn dests(coords: &[Coord]) -> SquareSet { coords.iter().copied().collect() }


#[test]
fn pawn_advance() {
    let mut board = classic_board();
    let mv = play(&mut board, "e2e4").unwrap();
    assert!(mv.is_executed());
    assert_eq!(mv.kind(), Some(MoveKind::Normal));
    let e4 = board.get_square(5, 4).unwrap();
    assert_eq!(e4.occupant.map(|p| (p.kind, p.force)), Some((PieceKind::Pawn, Force::White)));
    assert_eq!(board.get_square(5, 2).unwrap().occupant, None);
    assert_eq!(board.active_force(), Force::Black);
    // No black pawn stands next to e4, so there is nothing to capture en passant.
    assert_eq!(board.en_passant_file(), None);
    assert_eq!(board.ply(), 1);
}

#[test]
fn double_step_next_to_enemy_pawn() {
    let mut board = classic_board();
    for notation in ["e2e4", "a7a6", "e4e5"] {
        play(&mut board, notation).unwrap();
    }
    play(&mut board, "f7f6").unwrap();
    assert_eq!(board.en_passant_file(), None);
    play(&mut board, "h2h3").unwrap();
    play(&mut board, "d7d5").unwrap();
    assert_eq!(board.en_passant_file(), Some(Col::D));
    play(&mut board, "h3h4").unwrap();
    assert_eq!(board.en_passant_file(), None);
}

#[test]
fn square_lookup() {
    let board = classic_board();
    let e1 = board.get_square(5, 1).unwrap();
    assert_eq!(e1.coord, Coord::E1);
    assert_eq!(e1.color(), SquareColor::Dark);
    assert_eq!(e1.occupant.map(|p| p.kind), Some(PieceKind::King));
    assert_eq!(board.get_square(9, 1), Err(ChessError::OutOfBounds { file: 9, rank: 1 }));
    assert_eq!(board.get_square(1, 0), Err(ChessError::OutOfBounds { file: 1, rank: 0 }));
}

#[test]
fn opening_moves() {
    let board = classic_board();
    assert_eq!(board.legal_dests(Coord::E2), dests(&[Coord::E3, Coord::E4]));
    assert_eq!(board.legal_dests(Coord::G1), dests(&[Coord::F3, Coord::H3]));
    assert_eq!(board.legal_dests(Coord::E1), SquareSet::EMPTY);
    // Not Black's turn.
    assert_eq!(board.legal_dests(Coord::E7), SquareSet::EMPTY);
    assert_eq!(board.legal_moves().len(), 20);
    assert_eq!(board.status(), BoardStatus::Active);
}

#[test]
fn move_errors() {
    let mut board = classic_board();
    assert_eq!(
        play(&mut board, "e7e5").unwrap_err(),
        ChessError::OutOfTurn { from: Coord::E7 }
    );
    assert_eq!(
        play(&mut board, "e3e4").unwrap_err(),
        ChessError::IllegalMove { to: Coord::E4, reason: IllegalMoveReason::PieceMissing }
    );
    assert_eq!(
        play(&mut board, "e2e5").unwrap_err(),
        ChessError::IllegalMove { to: Coord::E5, reason: IllegalMoveReason::ImpossibleTrajectory }
    );
    assert_eq!(
        play(&mut board, "e2e4Q").unwrap_err(),
        ChessError::IllegalMove { to: Coord::E4, reason: IllegalMoveReason::BadPromotion }
    );
    assert_eq!(board.ply(), 0);
    assert_eq!(board.snapshot(), classic_board().snapshot());
}

#[test]
fn executed_move_cannot_be_replayed() {
    let mut board = classic_board();
    let mut mv = play(&mut board, "e2e4").unwrap();
    assert!(matches!(board.play(&mut mv), Err(ChessError::InvalidOperation(_))));
    assert!(!mv.is_legal(&board));
    assert!(mv.clone().dispose().is_err());
}

#[test]
fn unplay_restores_position() {
    let mut board = classic_board();
    let initial = board.snapshot();
    let mut e4 = play(&mut board, "e2e4").unwrap();
    let mut e5 = play(&mut board, "e7e5").unwrap();
    // Only the most recent move can be taken back.
    assert!(e4.unexecute(&mut board).is_err());
    e5.unexecute(&mut board).unwrap();
    e4.unexecute(&mut board).unwrap();
    assert!(!e4.is_executed());
    assert!(e4.is_verified());
    assert_eq!(board.snapshot(), initial);
    assert!(e4.is_legal(&board));
    e4.dispose().unwrap();
}

#[test]
fn en_passant_lasts_one_ply() {
    let mut board = classic_board();
    for notation in ["e2e4", "a7a6", "e4e5", "d7d5"] {
        play(&mut board, notation).unwrap();
    }
    assert!(board.legal_dests(Coord::E5).contains(Coord::D6));

    let mut capture = board.clone();
    let mv = play(&mut capture, "e5d6").unwrap();
    assert_eq!(mv.kind(), Some(MoveKind::EnPassant));
    assert_eq!(capture.grid()[Coord::D5], None);
    assert!(mv.captured().is_some());

    play(&mut board, "h2h3").unwrap();
    play(&mut board, "h7h6").unwrap();
    assert!(!board.legal_dests(Coord::E5).contains(Coord::D6));
    assert_eq!(
        play(&mut board, "e5d6").unwrap_err(),
        ChessError::IllegalMove { to: Coord::D6, reason: IllegalMoveReason::ImpossibleTrajectory }
    );
}

#[test]
fn kingside_castling() {
    let mut board = classic_board();
    for notation in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"] {
        play(&mut board, notation).unwrap();
    }
    assert!(board.legal_dests(Coord::E1).contains(Coord::G1));
    let mv = play(&mut board, "e1g1").unwrap();
    assert_eq!(mv.kind(), Some(MoveKind::Castle(CastleDirection::HSide)));
    assert_eq!(board.grid()[Coord::F1].map(|p| p.kind), Some(PieceKind::Rook));
    assert_eq!(board.grid()[Coord::H1], None);
    assert_eq!(board.king_square(Force::White), Coord::G1);
    assert!(!board.castling_rights()[Force::White][CastleDirection::ASide]);
    assert!(board.castling_rights()[Force::Black][CastleDirection::HSide]);
}

#[test]
fn castling_through_attacked_square() {
    let mut setup = parse_board(
        indoc! {"
            . . . . k . . .
            . . . . . . . .
            b . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            R . . . K . . R
        "},
        Force::White,
    )
    .unwrap();
    setup.castling_rights[Force::White][CastleDirection::HSide] = true;
    setup.castling_rights[Force::White][CastleDirection::ASide] = true;
    let mut board = Board::from_setup(&setup).unwrap();
    // The bishop on a6 covers f1.
    let king_dests = board.legal_dests(Coord::E1);
    assert!(!king_dests.contains(Coord::G1));
    assert!(king_dests.contains(Coord::C1));
    assert_eq!(
        play(&mut board, "e1g1").unwrap_err(),
        ChessError::IllegalMove { to: Coord::G1, reason: IllegalMoveReason::UnprotectedKing }
    );
    play(&mut board, "e1c1").unwrap();
    assert_eq!(board.grid()[Coord::D1].map(|p| p.kind), Some(PieceKind::Rook));
}

#[test]
fn castling_rights_and_path() {
    let mut setup = parse_board(
        indoc! {"
            r . . . k . . r
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            R N . . K . . R
        "},
        Force::White,
    )
    .unwrap();
    setup.castling_rights[Force::White][CastleDirection::ASide] = true;
    let mut board = Board::from_setup(&setup).unwrap();
    assert_eq!(
        play(&mut board, "e1c1").unwrap_err(),
        ChessError::IllegalMove { to: Coord::C1, reason: IllegalMoveReason::PathBlocked }
    );
    assert_eq!(
        play(&mut board, "e1g1").unwrap_err(),
        ChessError::IllegalMove { to: Coord::G1, reason: IllegalMoveReason::CastlingPieceHasMoved }
    );
}

// Plays `notation`, takes it back and checks that nothing changed.
fn assert_unplay_restores(board: &mut Board, notation: &str, kind: MoveKind) {
    let before = board.snapshot();
    let mut mv = play(board, notation).unwrap();
    assert_eq!(mv.kind(), Some(kind));
    let captured = mv.captured();
    mv.unexecute(board).unwrap();
    assert_eq!(board.snapshot(), before);
    if let Some(id) = captured {
        assert!(!board.piece(id).unwrap().is_captured());
    }
    assert!(mv.is_legal(board));
}

#[test]
fn unplay_en_passant() {
    let mut board = classic_board();
    for notation in ["e2e4", "a7a6", "e4e5", "d7d5"] {
        play(&mut board, notation).unwrap();
    }
    let victim = board.grid()[Coord::D5].unwrap().id;
    assert_unplay_restores(&mut board, "e5d6", MoveKind::EnPassant);
    assert_eq!(board.grid()[Coord::D5].map(|p| p.id), Some(victim));
    assert_eq!(board.en_passant_file(), Some(Col::D));
}

#[test]
fn unplay_castling() {
    let mut board = classic_board();
    for notation in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"] {
        play(&mut board, notation).unwrap();
    }
    assert_unplay_restores(&mut board, "e1g1", MoveKind::Castle(CastleDirection::HSide));
    assert!(board.castling_rights()[Force::White][CastleDirection::HSide]);
    assert_eq!(board.grid()[Coord::H1].map(|p| p.kind), Some(PieceKind::Rook));

    let mut board = classic_board();
    for notation in ["d2d4", "d7d5", "b1c3", "b8c6", "c1f4", "c8f5", "d1d2", "d8d7"] {
        play(&mut board, notation).unwrap();
    }
    assert_unplay_restores(&mut board, "e1c1", MoveKind::Castle(CastleDirection::ASide));
    assert!(board.castling_rights()[Force::White][CastleDirection::ASide]);
    assert_eq!(board.grid()[Coord::A1].map(|p| p.kind), Some(PieceKind::Rook));
    assert_eq!(board.king_square(Force::White), Coord::E1);
}

#[test]
fn unplay_capturing_promotion() {
    let mut setup = parse_board(
        indoc! {"
            r . . . k . . .
            . P . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . K . . .
        "},
        Force::White,
    )
    .unwrap();
    setup.castling_rights[Force::Black][CastleDirection::ASide] = true;
    setup.halfmove_clock = 7;
    let mut board = Board::from_setup(&setup).unwrap();
    let rook = board.grid()[Coord::A8].unwrap().id;
    assert_unplay_restores(&mut board, "b7a8Q", MoveKind::Promotion(PieceKind::Queen));
    assert_eq!(board.grid()[Coord::A8].map(|p| p.id), Some(rook));
    assert_eq!(board.grid()[Coord::B7].map(|p| p.kind), Some(PieceKind::Pawn));
    assert!(board.castling_rights()[Force::Black][CastleDirection::ASide]);
    assert_eq!(board.halfmove_clock(), 7);
}

#[test]
fn piece_queries_follow_the_board_given() {
    let base = classic_board();
    let mut a = base.clone();
    let mut b = base.clone();
    play(&mut a, "e2e4").unwrap();
    play(&mut b, "d2d4").unwrap();
    assert_eq!(a.ply(), b.ply());
    assert_ne!(a.generation(), b.generation());

    let queen = a.piece_at(Coord::D1).unwrap();
    assert!(queen.guarded_squares(&a).contains(Coord::H5));
    let on_b = queen.guarded_squares(&b);
    assert_eq!(on_b, b.piece_at(Coord::D1).unwrap().guarded_squares(&b));
    assert!(on_b.contains(Coord::D3));
    assert!(!on_b.contains(Coord::H5));
}

#[test]
fn pinned_piece_stays_on_line() {
    let board = board_from_diagram(
        indoc! {"
            k . . . r . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . R . . .
            . . . . K . . .
        "},
        Force::White,
    );
    assert_eq!(
        board.legal_dests(Coord::E2),
        dests(&[Coord::E3, Coord::E4, Coord::E5, Coord::E6, Coord::E7, Coord::E8])
    );
    let mut board = board;
    assert_eq!(
        play(&mut board, "e2a2").unwrap_err(),
        ChessError::IllegalMove { to: Coord::A2, reason: IllegalMoveReason::UnprotectedKing }
    );
}

#[test]
fn king_cannot_step_into_check() {
    let board = board_from_diagram(
        indoc! {"
            . . . . . . . k
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . r . . . .
            . . . . K . . .
        "},
        Force::White,
    );
    assert!(!board.is_in_check(Force::White));
    // The rook covers the second rank and the d-file; the king may take it.
    assert_eq!(board.legal_dests(Coord::E1), dests(&[Coord::D2, Coord::F1]));
}

#[test]
fn promotion_requires_kind() {
    let mut board = board_from_diagram(
        indoc! {"
            . . . . . . . k
            . P . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . K . . .
        "},
        Force::White,
    );
    assert_eq!(
        play(&mut board, "b7b8").unwrap_err(),
        ChessError::IllegalMove { to: Coord::B8, reason: IllegalMoveReason::BadPromotion }
    );
    let mut to_king = Move::with_promotion(Coord::B7, Coord::B8, PieceKind::King);
    assert_eq!(
        board.play(&mut to_king).unwrap_err(),
        ChessError::IllegalMove { to: Coord::B8, reason: IllegalMoveReason::BadPromotion }
    );
    let pawn_id = board.grid()[Coord::B7].unwrap().id;
    let mut mv = play(&mut board, "b7b8Q").unwrap();
    let queen = board.grid()[Coord::B8].unwrap();
    assert_eq!((queen.id, queen.kind, queen.origin), (pawn_id, PieceKind::Queen, PieceOrigin::Promoted));
    assert!(board.is_in_check(Force::Black));

    mv.unexecute(&mut board).unwrap();
    let pawn = board.grid()[Coord::B7].unwrap();
    assert_eq!((pawn.id, pawn.kind, pawn.origin), (pawn_id, PieceKind::Pawn, PieceOrigin::Innate));
    assert_eq!(board.piece(pawn_id).unwrap().kind(), PieceKind::Pawn);
}

#[test]
fn legal_moves_expand_promotions() {
    let board = board_from_diagram(
        indoc! {"
            . . . . . . . k
            . P . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            K . . . . . . .
        "},
        Force::White,
    );
    let promotions = board.legal_moves().into_iter().filter(|mv| mv.from() == Coord::B7).count();
    assert_eq!(promotions, 4);
}

#[test]
fn find_move_resolves_partial_description() {
    let board = board_from_diagram(
        indoc! {"
            . . . . . . . k
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . N . . . N .
            . . . . . . . .
            K . . . . . . .
        "},
        Force::White,
    );
    assert_eq!(
        board.find_move(MoveQuery::new(PieceKind::Knight, Coord::E4)).unwrap_err(),
        ChessError::AmbiguousMove { num_candidates: 2 }
    );
    let query = MoveQuery { from_col: Some(Col::C), ..MoveQuery::new(PieceKind::Knight, Coord::E4) };
    let mv = board.find_move(query).unwrap();
    assert_eq!((mv.from(), mv.to()), (Coord::C3, Coord::E4));
    assert_eq!(
        board.find_move(MoveQuery::new(PieceKind::Bishop, Coord::E4)).unwrap_err(),
        ChessError::IllegalMove { to: Coord::E4, reason: IllegalMoveReason::NoCandidate }
    );
}

#[test]
fn fools_mate() {
    let mut board = classic_board();
    for notation in ["f2f3", "e7e5", "g2g4", "d8h4"] {
        play(&mut board, notation).unwrap();
    }
    assert!(board.is_in_check(Force::White));
    assert_eq!(board.status(), BoardStatus::Checkmate { winner: Force::Black });
    assert!(board.legal_moves().is_empty());
}

#[test]
fn stalemate() {
    let board = board_from_diagram(
        indoc! {"
            k . . . . . . .
            . . Q . . . . .
            . K . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
        "},
        Force::Black,
    );
    assert_eq!(board.status(), BoardStatus::Stalemate);
}

#[test]
fn fifty_move_rule() {
    let mut setup = parse_board(
        indoc! {"
            k . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . K . . R
        "},
        Force::White,
    )
    .unwrap();
    setup.halfmove_clock = 99;
    let mut board = Board::from_setup(&setup).unwrap();
    assert_eq!(board.status(), BoardStatus::Active);
    play(&mut board, "h1h2").unwrap();
    assert_eq!(board.halfmove_clock(), 100);
    assert_eq!(board.status(), BoardStatus::FiftyMoveRule);
}

#[test]
fn move_counters() {
    let mut board = classic_board();
    play(&mut board, "g1f3").unwrap();
    assert_eq!((board.halfmove_clock(), board.fullmove_number()), (1, 1));
    play(&mut board, "g8f6").unwrap();
    assert_eq!((board.halfmove_clock(), board.fullmove_number()), (2, 2));
    play(&mut board, "e2e4").unwrap();
    assert_eq!((board.halfmove_clock(), board.fullmove_number()), (0, 2));
}

#[test]
fn invalid_setups() {
    let two_kings = indoc! {"
        k . . . . . . k
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . K . . .
    "};
    let pawn_on_last_rank = indoc! {"
        k . . P . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . K . . .
    "};
    let waiting_side_in_check = indoc! {"
        k . . . R . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . K . . .
    "};
    for diagram in [two_kings, pawn_on_last_rank, waiting_side_in_check] {
        let setup = parse_board(diagram, Force::White).unwrap();
        assert!(matches!(Board::from_setup(&setup), Err(ChessError::InvalidOperation(_))));
    }

    let lone_double_step = indoc! {"
        k . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . . . . .
        . . . . P . . .
        . . . . . . . .
        . . . . . . . .
        . . . . K . . .
    "};
    let mut setup = parse_board(lone_double_step, Force::Black).unwrap();
    setup.en_passant_file = Some(Col::E);
    assert!(matches!(Board::from_setup(&setup), Err(ChessError::InvalidOperation(_))));
    setup.place(Coord::D4, PieceKind::Pawn, Force::Black);
    assert_eq!(Board::from_setup(&setup).unwrap().en_passant_file(), Some(Col::E));

    let mut no_rook = parse_board(waiting_side_in_check, Force::Black).unwrap();
    assert!(Board::from_setup(&no_rook).is_ok());
    no_rook.castling_rights[Force::White][CastleDirection::ASide] = true;
    assert!(matches!(Board::from_setup(&no_rook), Err(ChessError::InvalidOperation(_))));
}
