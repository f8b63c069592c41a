//! Random game selection from a game collection file.
//!
//! Sampling seeks to a uniformly random byte offset, rewinds to the start of
//! the enclosing block and takes the next complete game after it. The result
//! is only approximately uniform: a game is picked with a probability that
//! grows with the byte length of the blocks leading up to it. That is good
//! enough for ambient display content and avoids indexing the whole file.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::parser::{next_game_blocks, parse_collection, parse_game, ChessGame};
use super::PgnError;
use crate::game::GameSource;

const REWIND_CHUNK: usize = 512;

/// How many times a file source samples before settling for the fallback game.
const SAMPLING_ATTEMPTS: usize = 3;

/// Line iterator over a byte stream that tolerates invalid UTF-8 and
/// remembers the first I/O error instead of yielding it.
struct LossyLines<B> {
    inner: B,
    error: Option<io::Error>,
}

impl<B: BufRead> Iterator for LossyLines<B> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        match self.inner.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

/// Walk backwards from `offset` to the first byte of the block containing it.
///
/// A block starts on the line after a blank (whitespace-only) line, or at
/// byte 0 when there is no blank line before `offset`.
fn rewind_to_block_start<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<u64> {
    let mut buf = [0u8; REWIND_CHUNK];
    let mut pos = offset;
    // Start of the line following the most recent newline, while only
    // whitespace has been seen since that newline.
    let mut pending_line_start: Option<u64> = None;

    while pos > 0 {
        let len = REWIND_CHUNK.min(pos as usize);
        pos -= len as u64;
        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut buf[..len])?;

        for i in (0..len).rev() {
            match buf[i] {
                b'\n' => {
                    if let Some(line_start) = pending_line_start {
                        return Ok(line_start);
                    }
                    pending_line_start = Some(pos + i as u64 + 1);
                }
                b' ' | b'\t' | b'\r' => {}
                _ => pending_line_start = None,
            }
        }
    }
    Ok(0)
}

/// Scan forward from `start` for the first playable game.
fn scan_forward<R: Read + Seek>(reader: &mut R, start: u64) -> io::Result<Option<ChessGame>> {
    reader.seek(SeekFrom::Start(start))?;
    let mut lines = LossyLines {
        inner: BufReader::new(&mut *reader),
        error: None,
    };

    let mut found = None;
    while let Some((tags, moves)) = next_game_blocks(&mut lines) {
        let game = parse_game(&tags, &moves);
        if game.is_playable() {
            found = Some(game);
            break;
        }
        tracing::trace!(
            moves = game.moves.len(),
            "Skipping unplayable game at offset {}",
            start
        );
    }

    match lines.error.take() {
        Some(e) => Err(e),
        None => Ok(found),
    }
}

/// Take the next playable game at or after the block containing `offset`.
///
/// If nothing playable follows, the whole file is scanned once more from the
/// beginning.
pub fn sample_at<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<Option<ChessGame>> {
    let start = rewind_to_block_start(reader, offset)?;
    if let Some(game) = scan_forward(reader, start)? {
        return Ok(Some(game));
    }
    if start == 0 {
        return Ok(None);
    }
    scan_forward(reader, 0)
}

/// Sample a game at a uniformly random byte offset of `reader`.
pub fn random_game_from_reader<R, G>(reader: &mut R, rng: &mut G) -> io::Result<Option<ChessGame>>
where
    R: Read + Seek,
    G: Rng,
{
    let len = reader.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(None);
    }
    let offset = rng.random_range(0..len);
    sample_at(reader, offset)
}

/// Copy a bundled asset into `cache_dir` unless a copy is already there.
///
/// The copy is byte-for-byte; an existing cache file is reused as is.
pub fn rehost_asset(asset: &Path, cache_dir: &Path) -> Result<PathBuf, PgnError> {
    let file_name = asset
        .file_name()
        .ok_or_else(|| PgnError::InvalidAssetPath(asset.to_path_buf()))?;
    let cached = cache_dir.join(file_name);
    if cached.exists() {
        return Ok(cached);
    }

    fs::create_dir_all(cache_dir)?;
    let bytes = fs::copy(asset, &cached)?;
    tracing::info!("Cached game asset {} ({} bytes)", cached.display(), bytes);
    Ok(cached)
}

/// Game source backed by a collection file on disk.
pub struct PgnFileSource {
    path: PathBuf,
    rng: StdRng,
}

impl PgnFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_rng(path, StdRng::from_os_rng())
    }

    /// Source with a fixed seed, for reproducible replays.
    pub fn seeded(path: impl Into<PathBuf>, seed: u64) -> Self {
        Self::with_rng(path, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(path: impl Into<PathBuf>, rng: StdRng) -> Self {
        Self {
            path: path.into(),
            rng,
        }
    }

    /// Re-host `asset` into `cache_dir` and sample from the cached copy.
    pub fn from_asset(asset: &Path, cache_dir: &Path) -> Result<Self, PgnError> {
        Ok(Self::new(rehost_asset(asset, cache_dir)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sample_once(&mut self) -> io::Result<Option<ChessGame>> {
        let mut file = File::open(&self.path)?;
        random_game_from_reader(&mut file, &mut self.rng)
    }

    /// Sample a random playable game, or the fallback game after repeated failures.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn random_game(&mut self) -> ChessGame {
        for attempt in 1..=SAMPLING_ATTEMPTS {
            match self.sample_once() {
                Ok(Some(game)) => {
                    tracing::debug!(
                        "Sampled {} vs {} ({} moves)",
                        game.white_player,
                        game.black_player,
                        game.moves.len()
                    );
                    return game;
                }
                Ok(None) => tracing::debug!("Attempt {} found no playable game", attempt),
                Err(e) => tracing::warn!("Attempt {} failed to read game file: {}", attempt, e),
            }
        }
        tracing::warn!("No playable game in {}, using fallback", self.path.display());
        ChessGame::fallback()
    }
}

impl GameSource for PgnFileSource {
    fn next_game(&mut self) -> ChessGame {
        self.random_game()
    }
}

/// Game source cycling through a whole in-memory collection in random order.
///
/// Every playable game is shown once per round before any repeats; the order
/// is reshuffled for each round. Unplayable games are left out and an empty
/// collection yields the fallback game.
#[derive(Debug, Clone)]
pub struct CollectionSource {
    games: Vec<ChessGame>,
    round: Vec<usize>,
    rng: StdRng,
}

impl CollectionSource {
    pub fn new(games: Vec<ChessGame>) -> Self {
        Self::with_rng(games, StdRng::from_os_rng())
    }

    pub fn seeded(games: Vec<ChessGame>, seed: u64) -> Self {
        Self::with_rng(games, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(games: Vec<ChessGame>, rng: StdRng) -> Self {
        let games = games.into_iter().filter(ChessGame::is_playable).collect();
        Self {
            games,
            round: Vec::new(),
            rng,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(parse_collection(text))
    }

    pub fn games(&self) -> &[ChessGame] {
        &self.games
    }
}

impl GameSource for CollectionSource {
    fn next_game(&mut self) -> ChessGame {
        if self.round.is_empty() {
            self.round = (0..self.games.len()).collect();
            self.round.shuffle(&mut self.rng);
        }
        match self.round.pop() {
            Some(index) => self.games[index].clone(),
            None => ChessGame::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const COLLECTION: &str = "[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n\n[White \"C\"]\n[Black \"D\"]\n\n1. d4 d5 2. c4 e6 0-1\n";

    fn offset_of(needle: &str) -> u64 {
        COLLECTION.find(needle).unwrap() as u64
    }

    #[test]
    fn test_rewind_finds_block_start() {
        let mut cursor = Cursor::new(COLLECTION.as_bytes());
        let inside_second_tags = offset_of("[Black \"D\"]") + 3;
        let start = rewind_to_block_start(&mut cursor, inside_second_tags).unwrap();
        assert_eq!(start, offset_of("[White \"C\"]"));

        let inside_first_tags = offset_of("[Black \"B\"]");
        assert_eq!(rewind_to_block_start(&mut cursor, inside_first_tags).unwrap(), 0);
    }

    #[test]
    fn test_offset_in_tag_block_selects_that_game() {
        let mut cursor = Cursor::new(COLLECTION.as_bytes());
        let game = sample_at(&mut cursor, offset_of("[Black \"D\"]")).unwrap().unwrap();
        assert_eq!(game.white_player, "C");
    }

    #[test]
    fn test_offset_in_move_block_selects_next_game() {
        let mut cursor = Cursor::new(COLLECTION.as_bytes());
        let game = sample_at(&mut cursor, offset_of("Nf3")).unwrap().unwrap();
        assert_eq!(game.white_player, "C");
    }

    #[test]
    fn test_offset_in_last_move_block_wraps_to_start() {
        let mut cursor = Cursor::new(COLLECTION.as_bytes());
        let game = sample_at(&mut cursor, offset_of("c4")).unwrap().unwrap();
        assert_eq!(game.white_player, "A");
    }

    #[test]
    fn test_unplayable_games_are_skipped() {
        let text = "[White \"X\"]\n\n1. e4 e5 2. Nf3\n\n[White \"A\"]\n[Black \"B\"]\n\n1. e4 e5 2. Nf3 *\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let game = sample_at(&mut cursor, 0).unwrap().unwrap();
        assert_eq!(game.white_player, "A");
        assert_eq!(game.moves.len(), 3);
    }

    #[test]
    fn test_empty_reader_yields_none() {
        let mut cursor = Cursor::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(random_game_from_reader(&mut cursor, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_crlf_collection() {
        let text = COLLECTION.replace('\n', "\r\n");
        let mut cursor = Cursor::new(text.into_bytes());
        let game = sample_at(&mut cursor, 0).unwrap().unwrap();
        assert_eq!(game.black_player, "B");
        assert_eq!(game.moves.len(), 4);
    }

    #[test]
    fn test_collection_source_shows_every_game_per_round() {
        let games = parse_collection(&format!("{COLLECTION}\n{}", COLLECTION.replace('A', "E").replace('C', "G")));
        let mut source = CollectionSource::seeded(games, 11);
        assert_eq!(source.games().len(), 4);

        for _ in 0..3 {
            let mut round: Vec<String> = (0..4).map(|_| source.next_game().white_player).collect();
            round.sort();
            assert_eq!(round, vec!["A", "C", "E", "G"]);
        }
    }

    #[test]
    fn test_collection_source_order_varies() {
        let games = parse_collection(COLLECTION);
        let firsts: std::collections::HashSet<String> = (0..40)
            .map(|seed| CollectionSource::seeded(games.clone(), seed).next_game().white_player)
            .collect();
        assert_eq!(firsts.len(), 2);
    }

    #[test]
    fn test_empty_collection_source_falls_back() {
        let mut source = CollectionSource::from_text("no games here");
        assert_eq!(source.next_game(), ChessGame::fallback());
    }
}
