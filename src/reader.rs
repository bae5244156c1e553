use crate::error::{FeatureError, Result};
use crate::types::GameRecord;
use crate::visitor::GameVisitor;

use pgn_reader::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Boxed byte stream feeding the PGN reader. pgn-reader buffers
/// internally, so inputs are handed over unbuffered.
pub type PgnInput = Box<dyn Read + Send>;

/// Input compression of a PGN file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Plain,
    Zstd,
}

impl Compression {
    /// Parses a user-supplied compression value. Empty and "none" mean
    /// plain text.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "plain" => Ok(Self::Plain),
            "zstd" | "zst" => Ok(Self::Zstd),
            other => Err(FeatureError::Compression(other.to_string())),
        }
    }

    /// Guesses the compression from the file extension.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("zst") | Some("zstd") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Expands a path argument into concrete files. Arguments without glob
/// metacharacters pass through untouched, even when the file does not
/// exist yet (the open reports that better).
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let entries = glob::glob(pattern).map_err(|source| FeatureError::PathPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(err) => log::warn!("Skipping unreadable path in '{pattern}': {err}"),
        }
    }
    paths.sort();
    Ok(paths)
}

fn open_input_stream(path: &Path, compression: Compression) -> Result<PgnInput> {
    let file = File::open(path).map_err(|source| FeatureError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        Compression::Plain => Ok(Box::new(file)),
        Compression::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(file)?;
            Ok(Box::new(decoder))
        }
    }
}

struct CurrentReader {
    path: PathBuf,
    reader: Reader<PgnInput>,
    visitor: GameVisitor,
}

/// Iterator over the games of one or more PGN files.
///
/// Reader-level failures inside a game do not abort the stream: the
/// partially-parsed game is emitted with `parse_error` set and reading
/// continues with the next file.
pub struct GameStream {
    paths: Vec<PathBuf>,
    next_path: usize,
    compression: Option<Compression>,
    current: Option<CurrentReader>,
}

impl GameStream {
    /// Opens all files matching `pattern`. `compression` of None means
    /// per-file inference from the extension.
    pub fn from_pattern(pattern: &str, compression: Option<Compression>) -> Result<Self> {
        Ok(Self::from_paths(expand_pattern(pattern)?, compression))
    }

    pub fn from_paths(paths: Vec<PathBuf>, compression: Option<Compression>) -> Self {
        Self {
            paths,
            next_path: 0,
            compression,
            current: None,
        }
    }

    fn advance_file(&mut self) -> Option<Result<()>> {
        loop {
            let path = self.paths.get(self.next_path)?.clone();
            self.next_path += 1;

            let compression = self
                .compression
                .unwrap_or_else(|| Compression::infer(&path));
            match open_input_stream(&path, compression) {
                Ok(input) => {
                    log::debug!("Reading games from {}", path.display());
                    self.current = Some(CurrentReader {
                        path,
                        reader: Reader::new(input),
                        visitor: GameVisitor::new(),
                    });
                    return Some(Ok(()));
                }
                Err(err) => {
                    // A single explicit path that cannot be opened is
                    // fatal; a bad file inside a multi-file batch is not.
                    if self.paths.len() == 1 {
                        return Some(Err(err));
                    }
                    log::warn!("{err}");
                }
            }
        }
    }
}

impl Iterator for GameStream {
    type Item = Result<GameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                match self.advance_file()? {
                    Ok(()) => {}
                    Err(err) => return Some(Err(err)),
                }
            }

            let current = self.current.as_mut()?;
            match current.reader.read_game(&mut current.visitor) {
                Ok(Some(())) => {
                    if let Some(game) = current.visitor.current_game.take() {
                        return Some(Ok(game));
                    }
                }
                Ok(None) => {
                    self.current = None;
                }
                Err(err) => {
                    let msg = FeatureError::PgnRead {
                        path: current.path.clone(),
                        source: err,
                    }
                    .to_string();
                    log::warn!("{msg}");
                    current.visitor.finalize_game_with_error(msg);
                    let game = current.visitor.current_game.take();
                    // The byte stream is unreliable past a read error.
                    self.current = None;
                    if let Some(game) = game {
                        return Some(Ok(game));
                    }
                }
            }
        }
    }
}

/// Counts games in a PGN file by counting `[Event ` header lines.
/// Cheap single pass used to size progress reporting.
pub fn count_games(path: &Path, compression: Option<Compression>) -> Result<usize> {
    let compression = compression.unwrap_or_else(|| Compression::infer(path));
    let input = open_input_stream(path, compression)?;
    let reader = BufReader::new(input);

    let mut count = 0;
    for line in reader.lines() {
        let line = line.map_err(|source| FeatureError::PgnRead {
            path: path.to_path_buf(),
            source,
        })?;
        if line.starts_with("[Event ") {
            count += 1;
        }
    }
    Ok(count)
}
