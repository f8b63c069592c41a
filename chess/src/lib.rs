//! Chess replay core for the always-on display.
//!
//! Parses relaxed PGN game collections, replays the moves on a plain 8x8
//! board and cycles through randomly sampled games one move per tick.

pub mod board;
pub mod game;
pub mod pgn;
pub mod types;

pub use board::{Board, BoardError, STANDARD_PLACEMENT};
pub use game::{GameSession, GameSource, TickOutcome, DRAW_LABEL, WINNER_LABEL};
pub use pgn::{
    parse_collection, parse_move, ChessGame, CollectionSource, GameOutcome, PgnError,
    PgnFileSource, PgnMove, SpecialState,
};
pub use types::{Cell, Piece, PieceColor, PieceKind};
