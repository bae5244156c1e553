use chrono::NaiveDate;
use pgn_reader::SanPlus;
use smallvec::SmallVec;

/// Mainline SAN moves of a single game, in order of play.
pub type MoveList = SmallVec<[SanPlus; 64]>;

/// Parsed game data from PGN - the header subset the feature
/// extractors consume, plus the mainline.
#[derive(Debug, Clone, Default)]
pub struct GameRecord {
    pub event: Option<String>,
    pub site: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub white_elo: Option<u32>,
    pub black_elo: Option<u32>,
    pub utc_date: Option<NaiveDate>,
    pub eco: Option<String>,
    pub opening: Option<String>,

    /// Mainline moves; variations, comments and NAGs are skipped.
    pub moves: MoveList,

    /// Contains None for cleanly parsed games or an accumulated
    /// message for games with recoverable problems.
    pub parse_error: Option<String>,
}
