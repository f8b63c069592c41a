//! Replays recorded games through the board engine and checks every
//! intermediate position against cozy-chess.

use chess::pgn::parse_game;
use chess::{Board, GameOutcome, PieceColor, PieceKind, SpecialState};
use cozy_chess::{File, Move, Rank, Square};

const OPERA_TAGS: &str = r#"[Event "Paris"]
[Site "Paris FRA"]
[Date "1858.??.??"]
[White "Paul Morphy"]
[Black "Duke Karl / Count Isouard"]
[Opening "Philidor Defense"]
"#;

const OPERA_MOVES: &str = "1. e4 e5 2. Nf3 d6 3. d4 Bg4 4. dxe5 Bxf3 5. Qxf3 dxe5 6. Bc4 Nf6 \
7. Qb3 Qe7 8. Nc3 c6 9. Bg5 b5 10. Nxb5 cxb5 11. Bxb5+ Nbd7 12. O-O-O Rd8 \
13. Rxd7 Rxd7 14. Rd1 Qe6 15. Bxd7+ Nxd7 16. Qb8+ Nxb8 17. Rd8# 1-0";

const OPERA_UCI: &[&str] = &[
    "e2e4", "e7e5", "g1f3", "d7d6", "d2d4", "c8g4", "d4e5", "g4f3", "d1f3", "d6e5", "f1c4",
    "g8f6", "f3b3", "d8e7", "b1c3", "c7c6", "c1g5", "b7b5", "c3b5", "c6b5", "c4b5", "b8d7",
    "e1c1", "a8d8", "d1d7", "d8d7", "h1d1", "e7e6", "b5d7", "f6d7", "b3b8", "d7b8", "d1d8",
];

fn kind_of(piece: cozy_chess::Piece) -> PieceKind {
    match piece {
        cozy_chess::Piece::Pawn => PieceKind::Pawn,
        cozy_chess::Piece::Knight => PieceKind::Knight,
        cozy_chess::Piece::Bishop => PieceKind::Bishop,
        cozy_chess::Piece::Rook => PieceKind::Rook,
        cozy_chess::Piece::Queen => PieceKind::Queen,
        cozy_chess::Piece::King => PieceKind::King,
    }
}

fn color_of(color: cozy_chess::Color) -> PieceColor {
    match color {
        cozy_chess::Color::White => PieceColor::White,
        cozy_chess::Color::Black => PieceColor::Black,
    }
}

/// cozy-chess encodes castling as the king capturing its own rook.
fn to_cozy_move(board: &cozy_chess::Board, uci: &str) -> Move {
    let mut mv: Move = uci.parse().expect("valid UCI move");
    let is_king = board.piece_on(mv.from) == Some(cozy_chess::Piece::King);
    let distance = (mv.from.file() as i8 - mv.to.file() as i8).abs();
    if is_king && distance == 2 {
        let rook_file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
            File::H
        } else {
            File::A
        };
        mv.to = Square::new(rook_file, mv.from.rank());
    }
    mv
}

fn assert_same_position(ours: &Board, oracle: &cozy_chess::Board, ply: usize) {
    for row in 0..8u8 {
        for col in 0..8u8 {
            let square = Square::new(File::index(col as usize), Rank::index(7 - row as usize));
            let expected = oracle
                .piece_on(square)
                .zip(oracle.color_on(square))
                .map(|(piece, color)| (kind_of(piece), color_of(color)));
            let actual = ours.piece_at(row, col).map(|piece| (piece.kind, piece.color));
            assert_eq!(actual, expected, "mismatch on {} after ply {}", square, ply);
        }
    }
}

#[test]
fn test_opera_game_matches_reference_engine() {
    let game = parse_game(OPERA_TAGS, OPERA_MOVES);
    assert_eq!(game.white_player, "Paul Morphy");
    assert_eq!(game.moves.len(), OPERA_UCI.len());

    let mut ours = Board::new();
    let mut oracle = cozy_chess::Board::default();
    for (ply, (mv, uci)) in game.moves.iter().zip(OPERA_UCI).enumerate() {
        ours.perform_move(mv);
        let cozy_mv = to_cozy_move(&oracle, uci);
        oracle.try_play(cozy_mv).expect("legal reference move");
        assert_same_position(&ours, &oracle, ply + 1);
    }

    let last = game.moves.last().unwrap();
    assert_eq!(last.special, SpecialState::Outcome(GameOutcome::WhiteWins));
    assert!(!ours.white_turn());
}

#[test]
fn test_en_passant_and_promotion_game_matches_reference_engine() {
    let moves = "1. e4 d5 2. e5 f5 3. exf6 e6 4. fxg7 Ke7 5. gxh8=Q Kf7 6. Qxg8+ Kxg8 0-1";
    let uci = [
        "e2e4", "d7d5", "e4e5", "f7f5", "e5f6", "e7e6", "f6g7", "e8e7", "g7h8q", "e7f7", "h8g8",
        "f7g8",
    ];
    let game = parse_game("[White \"a\"]\n[Black \"b\"]", moves);
    assert_eq!(game.moves.len(), uci.len());

    let mut ours = Board::new();
    let mut oracle = cozy_chess::Board::default();
    for (ply, (mv, uci)) in game.moves.iter().zip(uci).enumerate() {
        ours.perform_move(mv);
        let cozy_mv = to_cozy_move(&oracle, uci);
        oracle.try_play(cozy_mv).expect("legal reference move");
        assert_same_position(&ours, &oracle, ply + 1);
    }
}

#[test]
fn test_game_and_tick_serialize_to_json() {
    use chess::{GameSession, GameSource};

    struct Once(Option<chess::ChessGame>);

    impl GameSource for Once {
        fn next_game(&mut self) -> chess::ChessGame {
            self.0.take().unwrap_or_else(chess::ChessGame::fallback)
        }
    }

    let game = parse_game(
        "[White \"a\"]\n[Black \"b\"]",
        "1. e4 d5 2. e5 f5 3. exf6 e6 4. fxg7 Ke7 5. gxh8=Q Kf7 6. Qxg8+ Kxg8 0-1",
    );
    let json = serde_json::to_value(&game).unwrap();
    assert_eq!(json["white_player"], "a");
    assert_eq!(json["moves"].as_array().unwrap().len(), 12);
    assert_eq!(json["moves"][0]["figure"], "Pawn");
    assert_eq!(json["moves"][0]["to_row"], 4);
    assert_eq!(json["moves"][0]["from_row"], serde_json::Value::Null);
    assert_eq!(json["moves"][8]["special"], serde_json::json!({ "Promotion": "Queen" }));
    assert_eq!(json["moves"][11]["special"], serde_json::json!({ "Outcome": "BlackWins" }));

    let mut session = GameSession::new(Once(Some(game)));
    let outcome = serde_json::to_value(session.tick()).unwrap();
    assert_eq!(
        outcome,
        serde_json::json!({
            "move_index": 0,
            "new_game": true,
            "white_result": "",
            "black_result": ""
        })
    );
    let placed = serde_json::to_value(session.board().piece_at(4, 4)).unwrap();
    assert_eq!(placed, serde_json::json!({ "kind": "Pawn", "color": "White" }));
}
