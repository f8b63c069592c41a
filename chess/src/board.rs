//! Mutable 8x8 board that replays parsed PGN moves.
//!
//! There is no legality checking: the board trusts the game record and only
//! uses its own contents to work out which piece a move token refers to.

use crate::pgn::{PgnMove, SpecialState};
use crate::types::{Cell, Piece, PieceColor, PieceKind};

pub const STANDARD_PLACEMENT: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-1, -2),
    (1, -2),
    (-1, 2),
    (1, 2),
    (-2, -1),
    (2, -1),
    (-2, 1),
    (2, 1),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];

const QUEEN_DIRECTIONS: [(i8, i8); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (1, 1),
    (-1, 1),
];

type Squares = [[Option<Piece>; 8]; 8];
type Coord = (i8, i8);

/// Board state: piece placement plus side to move.
///
/// Row 0 is black's back rank (rank 8), row 7 is white's; column 0 is file a.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    white_turn: bool,
    squares: Squares,
}

fn standard_squares() -> Squares {
    let mut squares: Squares = [[None; 8]; 8];
    for (col, kind) in BACK_RANK.iter().enumerate() {
        squares[0][col] = Some(Piece::new(*kind, PieceColor::Black));
        squares[1][col] = Some(Piece::new(PieceKind::Pawn, PieceColor::Black));
        squares[6][col] = Some(Piece::new(PieceKind::Pawn, PieceColor::White));
        squares[7][col] = Some(Piece::new(*kind, PieceColor::White));
    }
    squares
}

fn in_range((row, col): Coord) -> bool {
    (0..8).contains(&row) && (0..8).contains(&col)
}

impl Board {
    /// Standard starting position, white to move.
    pub fn new() -> Self {
        Self {
            white_turn: true,
            squares: standard_squares(),
        }
    }

    pub fn empty(white_turn: bool) -> Self {
        Self {
            white_turn,
            squares: [[None; 8]; 8],
        }
    }

    /// Build a board from the piece-placement field of a FEN string.
    pub fn from_placement(placement: &str, white_turn: bool) -> Result<Self, BoardError> {
        let placement = placement
            .split_whitespace()
            .next()
            .ok_or(BoardError::InvalidPlacement)?;

        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(BoardError::InvalidPlacement);
        }

        let mut squares: Squares = [[None; 8]; 8];
        for (row, row_str) in rows.iter().enumerate() {
            let mut col = 0usize;
            for c in row_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    col += skip as usize;
                } else {
                    if col > 7 {
                        return Err(BoardError::InvalidPlacement);
                    }
                    squares[row][col] = Some(Piece::from_fen_char(c).ok_or(BoardError::InvalidPiece(c))?);
                    col += 1;
                }
                if col > 8 {
                    return Err(BoardError::InvalidPlacement);
                }
            }
        }

        Ok(Self {
            white_turn,
            squares,
        })
    }

    /// Piece-placement field of the FEN for this position.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for (row, rank) in self.squares.iter().enumerate() {
            if row > 0 {
                out.push('/');
            }
            let mut empty_run = 0u8;
            for square in rank {
                match square {
                    Some(piece) => {
                        if empty_run > 0 {
                            out.push(char::from(b'0' + empty_run));
                            empty_run = 0;
                        }
                        out.push(piece.to_fen_char());
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push(char::from(b'0' + empty_run));
            }
        }
        out
    }

    /// Back to the starting position with white to move.
    pub fn reset(&mut self) {
        self.squares = standard_squares();
        self.white_turn = true;
    }

    pub fn white_turn(&self) -> bool {
        self.white_turn
    }

    pub fn side_to_move(&self) -> PieceColor {
        if self.white_turn {
            PieceColor::White
        } else {
            PieceColor::Black
        }
    }

    pub fn squares(&self) -> &[[Option<Piece>; 8]; 8] {
        &self.squares
    }

    pub fn piece_at(&self, row: u8, col: u8) -> Option<Piece> {
        if row > 7 || col > 7 {
            return None;
        }
        self.squares[row as usize][col as usize]
    }

    /// Probe a square that may lie outside the board.
    pub fn cell(&self, row: i8, col: i8) -> Cell {
        if !in_range((row, col)) {
            return Cell::OffBoard;
        }
        match self.squares[row as usize][col as usize] {
            Some(piece) => Cell::Occupied(piece),
            None => Cell::Empty,
        }
    }

    fn holds(&self, (row, col): Coord, piece: Piece) -> bool {
        self.cell(row, col) == Cell::Occupied(piece)
    }

    /// Move whatever is on `from` to `to`, leaving `from` empty.
    fn relocate(&mut self, from: Coord, to: Coord) {
        if !in_range(from) || !in_range(to) {
            return;
        }
        let moved = self.squares[from.0 as usize][from.1 as usize].take();
        self.squares[to.0 as usize][to.1 as usize] = moved;
    }

    /// Apply one move for the side to move, then hand the turn over.
    ///
    /// A move that matches no piece leaves the placement untouched; the turn
    /// still flips.
    pub fn perform_move(&mut self, mv: &PgnMove) {
        let color = self.side_to_move();
        self.place_moving_piece(mv, color);

        if let SpecialState::Promotion(kind) = mv.special {
            if mv.to_row < 8 && mv.to_col < 8 {
                self.squares[mv.to_row as usize][mv.to_col as usize] = Some(Piece::new(kind, color));
            }
        }

        self.white_turn = !self.white_turn;
    }

    fn place_moving_piece(&mut self, mv: &PgnMove, color: PieceColor) {
        let home = color.home_row();
        match mv.special {
            SpecialState::CastleKingside => {
                self.relocate((home, 4), (home, 6));
                self.relocate((home, 7), (home, 5));
                return;
            }
            SpecialState::CastleQueenside => {
                self.relocate((home, 4), (home, 2));
                self.relocate((home, 0), (home, 3));
                return;
            }
            _ => {}
        }

        if mv.to_row > 7 || mv.to_col > 7 {
            tracing::debug!("Ignoring move to off-board square ({}, {})", mv.to_row, mv.to_col);
            return;
        }

        let piece = Piece::new(mv.figure, color);
        let to = (mv.to_row as i8, mv.to_col as i8);

        if let (Some(from_row), Some(from_col)) = (mv.from_row, mv.from_col) {
            if mv.captures && mv.figure == PieceKind::Pawn {
                self.clear_en_passant_victim(to, color);
            }
            self.relocate((from_row as i8, from_col as i8), to);
            return;
        }

        match mv.figure {
            PieceKind::Pawn => self.move_pawn(mv, piece, to),
            PieceKind::King => {
                let origin = KING_OFFSETS
                    .iter()
                    .map(|(dr, dc)| (to.0 + dr, to.1 + dc))
                    .find(|from| self.holds(*from, piece));
                if let Some(from) = origin {
                    self.relocate(from, to);
                }
            }
            PieceKind::Knight => {
                let origin = KNIGHT_OFFSETS
                    .iter()
                    .map(|(dr, dc)| (to.0 + dr, to.1 + dc))
                    .filter(|from| matches_hint(*from, mv))
                    .find(|from| self.holds(*from, piece));
                if let Some(from) = origin {
                    self.relocate(from, to);
                }
            }
            PieceKind::Rook => self.move_slider(mv, piece, to, &ROOK_DIRECTIONS),
            PieceKind::Bishop => self.move_slider(mv, piece, to, &BISHOP_DIRECTIONS),
            PieceKind::Queen => self.move_slider(mv, piece, to, &QUEEN_DIRECTIONS),
        }
    }

    fn move_pawn(&mut self, mv: &PgnMove, piece: Piece, to: Coord) {
        let back = piece.color.pawn_back_step();
        let (row, col) = to;

        if !mv.captures {
            let origin = [1, 2]
                .into_iter()
                .map(|steps| (row + back * steps, col))
                .find(|from| self.holds(*from, piece));
            if let Some(from) = origin {
                self.relocate(from, to);
            }
            return;
        }

        self.clear_en_passant_victim(to, piece.color);

        let behind = row + back;
        if let Some(from_col) = mv.from_col {
            self.relocate((behind, from_col as i8), to);
            return;
        }
        let origin = [col - 1, col + 1]
            .into_iter()
            .map(|from_col| (behind, from_col))
            .find(|from| self.holds(*from, piece));
        if let Some(from) = origin {
            self.relocate(from, to);
        }
    }

    /// A pawn capturing onto an empty square takes the enemy pawn beside it.
    fn clear_en_passant_victim(&mut self, to: Coord, color: PieceColor) {
        let victim = (to.0 + color.pawn_back_step(), to.1);
        let enemy_pawn = Piece::new(PieceKind::Pawn, color.opponent());
        if self.cell(to.0, to.1) == Cell::Empty && self.holds(victim, enemy_pawn) {
            self.squares[victim.0 as usize][victim.1 as usize] = None;
        }
    }

    /// March outwards from the destination along each direction; the first
    /// occupied square reached is the candidate. First matching direction wins.
    fn move_slider(&mut self, mv: &PgnMove, piece: Piece, to: Coord, directions: &[(i8, i8)]) {
        for (dr, dc) in directions {
            let mut at = (to.0 + dr, to.1 + dc);
            while self.cell(at.0, at.1) == Cell::Empty {
                at = (at.0 + dr, at.1 + dc);
            }
            if matches_hint(at, mv) && self.holds(at, piece) {
                self.relocate(at, to);
                return;
            }
        }
    }
}

/// Whether a candidate origin agrees with the partial from-square in the token.
fn matches_hint((row, col): Coord, mv: &PgnMove) -> bool {
    mv.from_row.map_or(true, |r| r as i8 == row) && mv.from_col.map_or(true, |c| c as i8 == col)
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (row, rank) in self.squares.iter().enumerate() {
            write!(f, "{} ", 8 - row)?;
            for square in rank {
                let c = square.map_or('.', |piece| piece.to_fen_char());
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Invalid FEN piece placement")]
    InvalidPlacement,
    #[error("Invalid piece character: {0}")]
    InvalidPiece(char),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgn::parse_move;

    fn play(board: &mut Board, tokens: &[&str]) {
        for token in tokens {
            board.perform_move(&parse_move(token));
        }
    }

    fn piece(c: char) -> Option<Piece> {
        Piece::from_fen_char(c)
    }

    #[test]
    fn test_starting_position() {
        let board = Board::new();
        assert_eq!(board.placement(), STANDARD_PLACEMENT);
        assert_eq!(board.piece_at(7, 4), piece('K'));
        assert_eq!(board.piece_at(0, 3), piece('q'));
        assert_eq!(board.piece_at(4, 4), None);
        assert!(board.white_turn());
    }

    #[test]
    fn test_placement_round_trip() {
        let placement = "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R";
        let board = Board::from_placement(placement, true).unwrap();
        assert_eq!(board.placement(), placement);
        assert!(Board::from_placement("8/8/8", true).is_err());
        assert!(matches!(
            Board::from_placement("8/8/8/8/8/8/8/7X", true),
            Err(BoardError::InvalidPiece('X'))
        ));
    }

    #[test]
    fn test_cell_distinguishes_off_board() {
        let board = Board::new();
        assert_eq!(board.cell(4, 4), Cell::Empty);
        assert_eq!(board.cell(-1, 4), Cell::OffBoard);
        assert_eq!(board.cell(3, 8), Cell::OffBoard);
        assert!(matches!(board.cell(0, 0), Cell::Occupied(_)));
    }

    #[test]
    fn test_white_kingside_castle() {
        let mut board = Board::from_placement("8/8/8/8/8/8/8/4K2R", true).unwrap();
        board.perform_move(&parse_move("O-O"));
        assert_eq!(board.piece_at(7, 6), piece('K'));
        assert_eq!(board.piece_at(7, 5), piece('R'));
        assert_eq!(board.piece_at(7, 4), None);
        assert_eq!(board.piece_at(7, 7), None);
        assert!(!board.white_turn());
    }

    #[test]
    fn test_white_queenside_castle() {
        let mut board = Board::from_placement("8/8/8/8/8/8/8/R3K3", true).unwrap();
        board.perform_move(&parse_move("O-O-O"));
        assert_eq!(board.piece_at(7, 2), piece('K'));
        assert_eq!(board.piece_at(7, 3), piece('R'));
        assert_eq!(board.piece_at(7, 0), None);
    }

    #[test]
    fn test_black_castles_on_its_own_back_rank() {
        let mut board = Board::from_placement("r3k2r/8/8/8/8/8/8/4K3", false).unwrap();
        board.perform_move(&parse_move("O-O-O"));
        assert_eq!(board.piece_at(0, 2), piece('k'));
        assert_eq!(board.piece_at(0, 3), piece('r'));
        assert_eq!(board.piece_at(0, 7), piece('r'));
    }

    #[test]
    fn test_pawn_single_and_double_step() {
        let mut board = Board::new();
        play(&mut board, &["e4", "e6", "e5"]);
        assert_eq!(board.piece_at(3, 4), piece('P'));
        assert_eq!(board.piece_at(6, 4), None);
        assert_eq!(board.piece_at(2, 4), piece('p'));
        assert_eq!(board.piece_at(1, 4), None);
    }

    #[test]
    fn test_en_passant_with_file_hint() {
        let mut board = Board::from_placement("4k3/8/8/3pP3/8/8/8/4K3", true).unwrap();
        board.perform_move(&parse_move("exd6"));
        assert_eq!(board.piece_at(2, 3), piece('P'));
        assert_eq!(board.piece_at(3, 3), None);
        assert_eq!(board.piece_at(3, 4), None);
    }

    #[test]
    fn test_en_passant_with_explicit_origin() {
        let mut board = Board::from_placement("4k3/8/8/8/3Pp3/8/8/4K3", false).unwrap();
        board.perform_move(&parse_move("e4xd3"));
        assert_eq!(board.piece_at(5, 3), piece('p'));
        assert_eq!(board.piece_at(4, 3), None);
        assert_eq!(board.piece_at(4, 4), None);
    }

    #[test]
    fn test_pawn_capture_checks_both_diagonals() {
        // Capture written without the origin file.
        let mut board = Board::from_placement("4k3/8/8/3p4/4P3/8/8/4K3", true).unwrap();
        board.perform_move(&parse_move("xd5"));
        assert_eq!(board.piece_at(3, 3), piece('P'));
        assert_eq!(board.piece_at(4, 4), None);
    }

    #[test]
    fn test_promotion_replaces_pawn() {
        let mut board = Board::from_placement("k7/4P3/8/8/8/8/8/4K3", true).unwrap();
        board.perform_move(&parse_move("e8=Q"));
        assert_eq!(board.piece_at(0, 4), piece('Q'));
        assert_eq!(board.piece_at(1, 4), None);
    }

    #[test]
    fn test_black_under_promotion_on_capture() {
        let mut board = Board::from_placement("4k3/8/8/8/8/8/3p4/2R1K3", false).unwrap();
        board.perform_move(&parse_move("dxc1=N"));
        assert_eq!(board.piece_at(7, 2), piece('n'));
        assert_eq!(board.piece_at(6, 3), None);
    }

    #[test]
    fn test_knight_disambiguation_by_file() {
        let mut board = Board::from_placement("4k3/8/8/8/8/8/8/1N2KN2", true).unwrap();
        board.perform_move(&parse_move("Nfd2"));
        assert_eq!(board.piece_at(6, 3), piece('N'));
        assert_eq!(board.piece_at(7, 5), None);
        assert_eq!(board.piece_at(7, 1), piece('N'));
    }

    #[test]
    fn test_rook_disambiguation_by_rank() {
        let mut board = Board::from_placement("R3k3/8/8/8/8/8/8/R3K3", true).unwrap();
        board.perform_move(&parse_move("R1a3"));
        assert_eq!(board.piece_at(5, 0), piece('R'));
        assert_eq!(board.piece_at(7, 0), None);
        assert_eq!(board.piece_at(0, 0), piece('R'));
    }

    #[test]
    fn test_slider_blocked_by_other_piece() {
        // The rook on a1 is blocked by the pawn on a2, so the one on h3 moves.
        let mut board = Board::from_placement("4k3/8/8/8/8/7R/P7/R3K3", true).unwrap();
        board.perform_move(&parse_move("Ra3"));
        assert_eq!(board.piece_at(5, 0), piece('R'));
        assert_eq!(board.piece_at(5, 7), None);
        assert_eq!(board.piece_at(7, 0), piece('R'));
    }

    #[test]
    fn test_ambiguous_slider_takes_first_direction() {
        // Both rooks reach d4 and the token carries no hint; the upward ray is scanned first.
        let mut board = Board::from_placement("4k3/8/3R4/8/8/8/3R4/4K3", true).unwrap();
        board.perform_move(&parse_move("Rd4"));
        assert_eq!(board.piece_at(4, 3), piece('R'));
        assert_eq!(board.piece_at(2, 3), None);
        assert_eq!(board.piece_at(6, 3), piece('R'));
    }

    #[test]
    fn test_queen_and_king_moves() {
        let mut board = Board::new();
        play(&mut board, &["e4", "e5", "Qh5", "Ke7"]);
        assert_eq!(board.piece_at(3, 7), piece('Q'));
        assert_eq!(board.piece_at(7, 3), None);
        assert_eq!(board.piece_at(1, 4), piece('k'));
        assert_eq!(board.piece_at(0, 4), None);
    }

    #[test]
    fn test_unresolvable_move_only_flips_turn() {
        let mut board = Board::new();
        let before = board.placement();
        board.perform_move(&parse_move("Nd5"));
        assert_eq!(board.placement(), before);
        assert!(!board.white_turn());
    }

    #[test]
    fn test_off_board_target_is_ignored() {
        let kinds = [
            PieceKind::Pawn,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ];
        let mut board = Board::new();
        for (i, figure) in kinds.into_iter().enumerate() {
            for (to_row, to_col, captures) in [(200, 3, false), (3, 255, true), (127, 127, true)] {
                let mv = PgnMove {
                    figure,
                    captures,
                    to_row,
                    to_col,
                    from_row: None,
                    from_col: Some(4),
                    special: SpecialState::Promotion(PieceKind::Queen),
                };
                board.perform_move(&mv);
            }
            assert_eq!(board.placement(), STANDARD_PLACEMENT, "after {:?}", kinds[i]);
        }
        assert!(board.white_turn());
    }

    #[test]
    fn test_empty_board() {
        let mut board = Board::empty(false);
        assert_eq!(board.placement(), "8/8/8/8/8/8/8/8");
        assert_eq!(board.side_to_move(), PieceColor::Black);

        play(&mut board, &["Ke7", "e4"]);
        assert_eq!(board.placement(), "8/8/8/8/8/8/8/8");
        assert_eq!(board.side_to_move(), PieceColor::Black);
    }

    #[test]
    fn test_reset_restores_start() {
        let mut board = Board::new();
        play(&mut board, &["d4", "d5", "c4"]);
        board.reset();
        assert_eq!(board, Board::new());
    }
}
