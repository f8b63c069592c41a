use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::san::{parse_move, GameOutcome, PgnMove};

/// `[Tag "value"]`, whitespace between tag and value optional.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[([A-Za-z]+)\s*"(.*?)"\]"#).expect("valid tag regex"));

static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]\s*").expect("valid bracket regex"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("valid comment regex"));

static MOVE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.{1,3}").expect("valid move number regex"));

/// Metadata tags pulled from a game's tag block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameHeader {
    pub white: String,
    pub black: String,
    pub site: String,
    pub date: String,
    pub opening: String,
    pub event: String,
}

impl GameHeader {
    /// Extract the known tags from a tag block. Missing tags become empty strings.
    pub fn from_block(block: &str) -> Self {
        let get = |tag: &str| tag_value(block, tag).unwrap_or_default();
        Self {
            white: get("White"),
            black: get("Black"),
            site: get("Site"),
            date: get("Date"),
            opening: get("Opening"),
            event: get("Event"),
        }
    }
}

/// A game loaded for replay, with its replay cursor and result labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChessGame {
    pub white_player: String,
    pub black_player: String,
    pub site: String,
    pub date: String,
    pub opening: String,
    pub event: String,
    pub moves: Vec<PgnMove>,
    pub current_move: usize,
    pub current_white_result: String,
    pub current_black_result: String,
}

impl ChessGame {
    pub fn new(header: GameHeader, moves: Vec<PgnMove>) -> Self {
        Self {
            white_player: header.white,
            black_player: header.black,
            site: header.site,
            date: header.date,
            opening: header.opening,
            event: header.event,
            moves,
            current_move: 0,
            current_white_result: String::new(),
            current_black_result: String::new(),
        }
    }

    /// Game shown when no usable game can be read: a single draw marker.
    pub fn fallback() -> Self {
        Self::new(
            GameHeader {
                white: "White".to_string(),
                black: "Black".to_string(),
                ..Default::default()
            },
            vec![PgnMove::outcome_only(GameOutcome::Draw)],
        )
    }

    /// Whether the game is worth replaying: more than two moves and both players named.
    pub fn is_playable(&self) -> bool {
        self.moves.len() > 2 && !self.white_player.is_empty() && !self.black_player.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.current_move >= self.moves.len()
    }
}

/// Look up the value of `[tag "value"]` in a tag block. First occurrence wins.
pub fn tag_value(block: &str, tag: &str) -> Option<String> {
    TAG_RE
        .captures_iter(block)
        .find(|cap| &cap[1] == tag)
        .map(|cap| cap[2].to_string())
}

/// Whether a line carries at least one tag pair.
pub fn is_tag_line(line: &str) -> bool {
    TAG_RE.is_match(line)
}

/// Split a move section into move tokens.
///
/// Bracketed remnants, `{comments}` and move numbers are removed. Result
/// tokens are folded onto the preceding move as a `W`/`L`/`D` suffix; a
/// result with nothing before it is dropped, as is the unknown-result `*`.
pub fn extract_move_tokens(text: &str) -> Vec<String> {
    let text = BRACKET_RE.replace_all(text, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = MOVE_NUMBER_RE.replace_all(&text, "");

    let mut tokens: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        let suffix = match token {
            "1-0" => 'W',
            "0-1" => 'L',
            "1/2-1/2" => 'D',
            "*" => continue,
            _ => {
                tokens.push(token.to_string());
                continue;
            }
        };
        if let Some(last) = tokens.last_mut() {
            last.push(suffix);
        }
    }
    tokens
}

/// Build a game from its tag block and its move block.
pub fn parse_game(tags: &str, moves: &str) -> ChessGame {
    let moves = extract_move_tokens(moves)
        .iter()
        .map(|token| parse_move(token))
        .collect();
    ChessGame::new(GameHeader::from_block(tags), moves)
}

/// Parse every game of a multi-game collection, in file order.
///
/// Unplayable games are kept; callers filter with [`ChessGame::is_playable`].
pub fn parse_collection(text: &str) -> Vec<ChessGame> {
    let mut lines = text.lines().map(str::to_owned);
    let mut games = Vec::new();
    while let Some((tags, moves)) = next_game_blocks(&mut lines) {
        games.push(parse_game(&tags, &moves));
    }
    games
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Pull the next tag block and the move block following it out of a line stream.
///
/// Lines before the first tag line are skipped. The tag block runs until a
/// blank line; blank lines are then skipped and the move block runs until the
/// next blank line or the end of input. Returns `None` once no tag line is left.
pub(crate) fn next_game_blocks<I>(lines: &mut I) -> Option<(String, String)>
where
    I: Iterator<Item = String>,
{
    let first = lines.by_ref().find(|line| is_tag_line(line))?;

    let mut tags = first;
    tags.push('\n');
    for line in lines.by_ref() {
        if is_blank(&line) {
            break;
        }
        tags.push_str(&line);
        tags.push('\n');
    }

    let mut moves = String::new();
    if let Some(first_move) = lines.by_ref().find(|line| !is_blank(line)) {
        moves.push_str(&first_move);
        moves.push('\n');
        for line in lines.by_ref() {
            if is_blank(&line) {
                break;
            }
            moves.push_str(&line);
            moves.push('\n');
        }
    }

    Some((tags, moves))
}
