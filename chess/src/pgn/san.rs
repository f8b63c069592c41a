//! Single algebraic-notation token → [`PgnMove`].
//!
//! The conversion is purely lexical: nothing here looks at a board. Which
//! piece actually moves is resolved later by [`crate::Board::perform_move`].

use serde::Serialize;

use crate::types::PieceKind;

/// How a game ended, as folded onto its last move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

/// Extra meaning attached to a move beyond "piece goes to square".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SpecialState {
    #[default]
    Normal,
    CastleKingside,
    CastleQueenside,
    /// Pawn promotes to the given kind (always Knight, Bishop, Rook or Queen).
    Promotion(PieceKind),
    Outcome(GameOutcome),
}

impl SpecialState {
    /// Legacy numeric encoding: 0 normal, 1/2 castling, 3..=6 promotion to
    /// N/B/R/Q, 7 white wins, 8 black wins, 9 draw.
    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::CastleKingside => 1,
            Self::CastleQueenside => 2,
            Self::Promotion(PieceKind::Knight) => 3,
            Self::Promotion(PieceKind::Bishop) => 4,
            Self::Promotion(PieceKind::Rook) => 5,
            Self::Promotion(_) => 6,
            Self::Outcome(GameOutcome::WhiteWins) => 7,
            Self::Outcome(GameOutcome::BlackWins) => 8,
            Self::Outcome(GameOutcome::Draw) => 9,
        }
    }

    pub fn outcome(self) -> Option<GameOutcome> {
        match self {
            Self::Outcome(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// One parsed move token.
///
/// Coordinates use board rows/columns: row 0 is rank 8, column 0 is file a.
/// `from_row`/`from_col` are only present when the token carried explicit
/// disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PgnMove {
    pub figure: PieceKind,
    pub captures: bool,
    pub to_row: u8,
    pub to_col: u8,
    pub from_row: Option<u8>,
    pub from_col: Option<u8>,
    pub special: SpecialState,
}

impl PgnMove {
    /// Placeholder move carrying only a game outcome.
    pub fn outcome_only(outcome: GameOutcome) -> Self {
        Self {
            figure: PieceKind::Pawn,
            captures: false,
            to_row: 0,
            to_col: 0,
            from_row: None,
            from_col: None,
            special: SpecialState::Outcome(outcome),
        }
    }
}

fn is_rank(c: char) -> bool {
    ('1'..='8').contains(&c)
}

fn is_file(c: char) -> bool {
    ('a'..='h').contains(&c)
}

fn rank_to_row(c: char) -> u8 {
    7 - (c as u8 - b'1')
}

fn file_to_col(c: char) -> u8 {
    c as u8 - b'a'
}

/// Parse one move token (already stripped of move numbers, with any result
/// folded in as a `W`/`L`/`D` suffix).
///
/// Never fails: tokens without a destination land on a1, unknown leading
/// letters are treated as pawn moves.
pub fn parse_move(token: &str) -> PgnMove {
    let figure = token
        .chars()
        .next()
        .and_then(PieceKind::from_san_letter)
        .unwrap_or(PieceKind::Pawn);

    let ranks: Vec<char> = token.chars().filter(|c| is_rank(*c)).collect();
    let files: Vec<char> = token.chars().filter(|c| is_file(*c)).collect();

    let to_row = rank_to_row(ranks.last().copied().unwrap_or('1'));
    let to_col = file_to_col(files.last().copied().unwrap_or('a'));
    let from_row = (ranks.len() > 1).then(|| rank_to_row(ranks[0]));
    let from_col = (files.len() > 1).then(|| file_to_col(files[0]));

    PgnMove {
        figure,
        captures: token.contains('x'),
        to_row,
        to_col,
        from_row,
        from_col,
        special: special_state(token),
    }
}

fn special_state(token: &str) -> SpecialState {
    match token {
        "O-O" => return SpecialState::CastleKingside,
        "O-O-O" => return SpecialState::CastleQueenside,
        _ => {}
    }
    if token.ends_with('W') {
        SpecialState::Outcome(GameOutcome::WhiteWins)
    } else if token.ends_with('L') {
        SpecialState::Outcome(GameOutcome::BlackWins)
    } else if token.ends_with('D') {
        SpecialState::Outcome(GameOutcome::Draw)
    } else if token.contains("=Q") {
        SpecialState::Promotion(PieceKind::Queen)
    } else if token.contains("=R") {
        SpecialState::Promotion(PieceKind::Rook)
    } else if token.contains("=B") {
        SpecialState::Promotion(PieceKind::Bishop)
    } else if token.contains("=N") {
        SpecialState::Promotion(PieceKind::Knight)
    } else {
        SpecialState::Normal
    }
}
