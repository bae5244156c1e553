use crate::error::Result;
use crate::features::{
    count_captures, count_castling, count_checks, count_piece_moves, count_promotions,
    move_totals,
};
use crate::novelty::NoveltyRecord;
use crate::phase::middlegame_bounds;
use crate::types::GameRecord;

use serde::Serialize;
use shakmaty::{Color, Move};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// One CSV row per game: header metadata, the derived features
/// (`wp_`/`bp_` prefix the white- and black-player columns), and the
/// parse diagnostic for games recovered with problems.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureRow {
    pub event: Option<String>,
    pub site: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub date: Option<String>,
    pub eco: Option<String>,
    pub opening: Option<String>,

    pub wp_rating: Option<u32>,
    pub bp_rating: Option<u32>,
    pub result: Option<String>,

    pub total_moves: u32,
    pub wp_moves: u32,
    pub bp_moves: u32,

    #[serde(rename = "wp_P")]
    pub wp_pawn: u32,
    #[serde(rename = "bp_P")]
    pub bp_pawn: u32,
    #[serde(rename = "wp_N")]
    pub wp_knight: u32,
    #[serde(rename = "bp_N")]
    pub bp_knight: u32,
    #[serde(rename = "wp_B")]
    pub wp_bishop: u32,
    #[serde(rename = "bp_B")]
    pub bp_bishop: u32,
    #[serde(rename = "wp_R")]
    pub wp_rook: u32,
    #[serde(rename = "bp_R")]
    pub bp_rook: u32,
    #[serde(rename = "wp_Q")]
    pub wp_queen: u32,
    #[serde(rename = "bp_Q")]
    pub bp_queen: u32,
    #[serde(rename = "wp_K")]
    pub wp_king: u32,
    #[serde(rename = "bp_K")]
    pub bp_king: u32,

    pub wp_checks: u32,
    pub bp_checks: u32,
    pub wp_captures: u32,
    pub bp_captures: u32,
    pub wp_promotions: u32,
    pub bp_promotions: u32,
    pub wp_castling: u32,
    pub bp_castling: u32,

    pub middlegame_start: Option<u32>,
    pub middlegame_end: Option<u32>,

    pub opening_name: Option<String>,
    pub opening_last_move: Option<usize>,
    pub opening_last_known_move: Option<usize>,
    pub opening_moves_after_novelty: Option<usize>,
    pub opening_novelty_player: Option<String>,
    pub opening_novelty_piece: Option<char>,
    pub opening_novelty_square: Option<String>,
    pub opening_novelty_move: Option<String>,

    /// Accumulated parse diagnostics; empty rows with this set are
    /// recovered failures, not real zero-move games.
    pub parse_error: Option<String>,
}

fn player_tag(side: Color) -> &'static str {
    match side {
        Color::White => "wp",
        Color::Black => "bp",
    }
}

impl FeatureRow {
    /// Computes every board-derived feature; opening columns stay
    /// empty until `set_opening`.
    pub fn from_game(record: &GameRecord, moves: &[Move]) -> Self {
        let totals = move_totals(moves);
        let pieces = count_piece_moves(moves);
        let checks = count_checks(moves);
        let captures = count_captures(moves);
        let promotions = count_promotions(moves);
        let castling = count_castling(moves);
        let middlegame = middlegame_bounds(moves);

        Self {
            event: record.event.clone(),
            site: record.site.clone(),
            white: record.white.clone(),
            black: record.black.clone(),
            date: record.utc_date.map(|d| d.to_string()),
            eco: record.eco.clone(),
            opening: record.opening.clone(),
            wp_rating: record.white_elo,
            bp_rating: record.black_elo,
            result: record.result.clone(),
            total_moves: totals.total,
            wp_moves: totals.white,
            bp_moves: totals.black,
            wp_pawn: pieces.pawn.white,
            bp_pawn: pieces.pawn.black,
            wp_knight: pieces.knight.white,
            bp_knight: pieces.knight.black,
            wp_bishop: pieces.bishop.white,
            bp_bishop: pieces.bishop.black,
            wp_rook: pieces.rook.white,
            bp_rook: pieces.rook.black,
            wp_queen: pieces.queen.white,
            bp_queen: pieces.queen.black,
            wp_king: pieces.king.white,
            bp_king: pieces.king.black,
            wp_checks: checks.white,
            bp_checks: checks.black,
            wp_captures: captures.white,
            bp_captures: captures.black,
            wp_promotions: promotions.white,
            bp_promotions: promotions.black,
            wp_castling: castling.white,
            bp_castling: castling.black,
            middlegame_start: middlegame.start,
            middlegame_end: middlegame.end,
            parse_error: record.parse_error.clone(),
            ..Self::default()
        }
    }

    pub fn set_opening(&mut self, novelty: NoveltyRecord) {
        self.opening_name = novelty.opening_name;
        self.opening_last_move = novelty.last_named_move;
        self.opening_last_known_move = novelty.last_known_move;
        self.opening_moves_after_novelty = novelty.moves_after_novelty;
        self.opening_novelty_player = novelty.novelty_player.map(|s| player_tag(s).to_string());
        self.opening_novelty_piece = novelty.novelty_piece;
        self.opening_novelty_square = novelty.novelty_square;
        self.opening_novelty_move = novelty.novelty_san;
    }
}

/// Append-mode CSV writer that lets interrupted batches resume: the
/// header is written only into a new/empty file, and the number of
/// rows already on disk is reported back.
pub struct FeatureWriter {
    writer: csv::Writer<File>,
}

impl FeatureWriter {
    pub fn append(path: &Path) -> Result<(Self, usize)> {
        let existing = match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => Some(count_rows(path)?),
            _ => None,
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(existing.is_none())
            .from_writer(file);

        Ok((Self { writer }, existing.unwrap_or(0)))
    }

    pub fn write(&mut self, row: &FeatureRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    Ok(reader.records().filter(|r| r.is_ok()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::san::SanPlus;
    use std::fs;

    fn sample_row() -> FeatureRow {
        let sans: Vec<SanPlus> = ["e4", "e5", "Nf3"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let moves = crate::features::mainline_moves(&sans).unwrap();
        let record = GameRecord {
            white_elo: Some(2100),
            black_elo: Some(1950),
            result: Some("1-0".to_string()),
            ..GameRecord::default()
        };
        FeatureRow::from_game(&record, &moves)
    }

    #[test]
    fn test_row_serializes_renamed_piece_columns() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(sample_row()).unwrap();
        let csv = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let header = csv.lines().next().unwrap();
        assert!(header.contains("wp_P"));
        assert!(header.contains("bp_K"));
        assert!(header.contains("opening_novelty_move"));
        assert!(header.ends_with("parse_error"));

        let values = csv.lines().nth(1).unwrap();
        assert!(values.contains("2100,1950,1-0,3,2,1"));
    }

    #[test]
    fn test_row_carries_game_metadata_columns() {
        let record = GameRecord {
            event: Some("Wch".to_string()),
            white: Some("Anand, V.".to_string()),
            black: Some("Gelfand, B.".to_string()),
            utc_date: chrono::NaiveDate::from_ymd_opt(2012, 5, 11),
            eco: Some("D45".to_string()),
            opening: Some("Semi-Slav Defense".to_string()),
            ..GameRecord::default()
        };
        let row = FeatureRow::from_game(&record, &[]);

        assert_eq!(row.event.as_deref(), Some("Wch"));
        assert_eq!(row.white.as_deref(), Some("Anand, V."));
        assert_eq!(row.black.as_deref(), Some("Gelfand, B."));
        assert_eq!(row.date.as_deref(), Some("2012-05-11"));
        assert_eq!(row.eco.as_deref(), Some("D45"));
        assert_eq!(row.opening.as_deref(), Some("Semi-Slav Defense"));
    }

    #[test]
    fn test_recovered_game_is_distinguishable_from_empty_game() {
        let broken = GameRecord {
            parse_error: Some("PGN read error in 'games.pgn': boom".to_string()),
            ..GameRecord::default()
        };
        let broken_row = FeatureRow::from_game(&broken, &[]);
        let empty_row = FeatureRow::from_game(&GameRecord::default(), &[]);

        assert_eq!(broken_row.total_moves, 0);
        assert!(
            broken_row
                .parse_error
                .as_deref()
                .is_some_and(|msg| msg.contains("PGN read error"))
        );
        assert_eq!(empty_row.parse_error, None);
    }

    #[test]
    fn test_set_opening_maps_player_to_column_prefix() {
        let mut row = sample_row();
        row.set_opening(NoveltyRecord {
            opening_name: Some("Italian Game".to_string()),
            last_named_move: Some(3),
            last_known_move: Some(4),
            moves_after_novelty: Some(6),
            novelty_player: Some(Color::White),
            novelty_piece: Some('B'),
            novelty_square: Some("c4".to_string()),
            novelty_san: Some("Bc4".to_string()),
        });

        assert_eq!(row.opening_novelty_player.as_deref(), Some("wp"));
        assert_eq!(row.opening_last_known_move, Some(4));
        assert_eq!(row.opening_novelty_move.as_deref(), Some("Bc4"));
    }

    #[test]
    fn test_writer_appends_and_reports_existing_rows() {
        let path = std::env::temp_dir()
            .join(format!("elo-features-{}-resume.csv", std::process::id()));
        let _ = fs::remove_file(&path);

        {
            let (mut writer, existing) = FeatureWriter::append(&path).unwrap();
            assert_eq!(existing, 0);
            writer.write(&sample_row()).unwrap();
            writer.write(&sample_row()).unwrap();
            writer.flush().unwrap();
        }

        let (_, existing) = FeatureWriter::append(&path).unwrap();
        assert_eq!(existing, 2);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(
            contents.lines().filter(|l| l.contains("wp_P")).count(),
            1
        );

        fs::remove_file(path).unwrap();
    }
}
