use serde::Serialize;

use crate::board::Board;
use crate::pgn::{ChessGame, GameOutcome};
use crate::types::Piece;

/// Label shown next to the winning player once the last move is played.
pub const WINNER_LABEL: &str = "WINNER";

/// Label shown next to both players when the game is drawn.
pub const DRAW_LABEL: &str = "DRAW";

/// Supplier of games to replay.
pub trait GameSource {
    /// Next game to show. Must always return a game with at least one move.
    fn next_game(&mut self) -> ChessGame;
}

/// What a single tick did, for logging and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickOutcome {
    /// Index of the move that was just played.
    pub move_index: usize,
    /// True when this tick started a new game.
    pub new_game: bool,
    pub white_result: String,
    pub black_result: String,
}

/// Replays games move by move, one move per tick, looping into a new game
/// when the current one runs out.
pub struct GameSession<S> {
    board: Board,
    game: Option<ChessGame>,
    source: S,
}

impl<S: GameSource> GameSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            board: Board::new(),
            game: None,
            source,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Piece placement for rendering.
    pub fn pieces(&self) -> &[[Option<Piece>; 8]; 8] {
        self.board.squares()
    }

    pub fn game(&self) -> Option<&ChessGame> {
        self.game.as_ref()
    }

    fn load_game(&mut self) -> ChessGame {
        let mut game = self.source.next_game();
        game.current_move = 0;
        tracing::info!(
            white = %game.white_player,
            black = %game.black_player,
            moves = game.moves.len(),
            "Starting new game"
        );
        game
    }

    /// Play the next move, loading or replacing the game first when needed.
    pub fn tick(&mut self) -> TickOutcome {
        let (mut game, new_game) = match self.game.take() {
            Some(game) if !game.is_finished() => (game, false),
            previous => {
                if previous.is_some() {
                    self.board.reset();
                }
                (self.load_game(), true)
            }
        };

        let outcome = self.play_next(&mut game, new_game);
        self.game = Some(game);
        outcome
    }

    fn play_next(&mut self, game: &mut ChessGame, new_game: bool) -> TickOutcome {
        let index = game.current_move;
        let Some(mv) = game.moves.get(index).copied() else {
            // The source handed over a game without moves.
            tracing::warn!("Game has no moves, skipping tick");
            return TickOutcome {
                move_index: index,
                new_game,
                white_result: String::new(),
                black_result: String::new(),
            };
        };

        let (white, black) = match mv.special.outcome() {
            Some(GameOutcome::WhiteWins) => (WINNER_LABEL, ""),
            Some(GameOutcome::BlackWins) => ("", WINNER_LABEL),
            Some(GameOutcome::Draw) => (DRAW_LABEL, DRAW_LABEL),
            None => ("", ""),
        };
        game.current_white_result = white.to_string();
        game.current_black_result = black.to_string();

        self.board.perform_move(&mv);
        game.current_move += 1;
        tracing::trace!("Played move {} of {}", game.current_move, game.moves.len());

        TickOutcome {
            move_index: index,
            new_game,
            white_result: game.current_white_result.clone(),
            black_result: game.current_black_result.clone(),
        }
    }
}
