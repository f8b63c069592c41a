//! Relaxed PGN support: game collections, move tokens and random sampling.

mod parser;
pub mod sampler;
mod san;

use std::path::PathBuf;

pub use parser::{
    extract_move_tokens, is_tag_line, parse_collection, parse_game, tag_value, ChessGame,
    GameHeader,
};
pub use sampler::{rehost_asset, CollectionSource, PgnFileSource};
pub use san::{parse_move, GameOutcome, PgnMove, SpecialState};

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Asset path has no file name: {0}")]
    InvalidAssetPath(PathBuf),
}
