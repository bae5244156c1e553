//! Feature extraction for chess PGN archives.
//!
//! Streams games out of plain or zstd-compressed PGN files, replays
//! the mainline, and derives per-game features: per-side move, check,
//! capture, promotion and castling counts, middlegame bounds, and the
//! point where the game leaves known opening theory according to the
//! Lichess opening explorer. Rows are written to CSV, one per game,
//! with support for resuming interrupted batches.

pub mod error;
pub mod explorer;
pub mod export;
pub mod features;
pub mod novelty;
pub mod phase;
pub mod reader;
pub mod types;
pub mod visitor;

pub use error::{FeatureError, Result};
pub use explorer::{ExplorerClient, ExplorerDb, OpeningLookup, OpeningLookupResult};
pub use export::{FeatureRow, FeatureWriter};
pub use features::mainline_moves;
pub use novelty::{NoveltyRecord, scan_opening};
pub use reader::{Compression, GameStream, count_games, expand_pattern};
pub use types::GameRecord;
