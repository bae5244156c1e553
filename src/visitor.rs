use crate::error::ErrorAccumulator;
use crate::types::{GameRecord, MoveList};

use chrono::{Datelike, NaiveDate};
use pgn_reader::{Outcome, RawTag, SanPlus, Skip, Visitor};
use std::mem;
use std::ops::ControlFlow;

/// Streaming PGN visitor (pgn-reader).
///
/// Accumulates the mainline SAN sequence into a `MoveList`; variations
/// are skipped. The result is captured via `outcome()` (or the
/// `Result` tag as fallback).
pub struct GameVisitor {
    headers: HeaderFields,
    result_marker: Option<String>,
    parse_error: ErrorAccumulator,
    pub current_game: Option<GameRecord>,
}

#[derive(Default)]
struct HeaderFields {
    event: String,
    site: String,
    white: String,
    black: String,
    result: String,
    white_elo: String,
    black_elo: String,
    utc_date: String,
    date: String,
    eco: String,
    opening: String,
}

impl HeaderFields {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn opt_take(field: &mut String) -> Option<String> {
        if field.is_empty() {
            None
        } else {
            Some(mem::take(field))
        }
    }

    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot: &mut String = match key {
            b"Event" => &mut self.event,
            b"Site" => &mut self.site,
            b"White" => &mut self.white,
            b"Black" => &mut self.black,
            b"Result" => &mut self.result,
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            b"UTCDate" => &mut self.utc_date,
            b"Date" => &mut self.date,
            b"ECO" => &mut self.eco,
            b"Opening" => &mut self.opening,
            _ => return,
        };

        if !slot.is_empty() {
            return;
        }

        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return;
        }

        *slot = String::from_utf8_lossy(bytes).into_owned();
    }
}

impl GameVisitor {
    pub fn new() -> Self {
        Self {
            headers: HeaderFields::default(),
            result_marker: None,
            parse_error: ErrorAccumulator::default(),
            current_game: None,
        }
    }

    fn normalize_date_separators(s: &str) -> String {
        let s = s.trim();
        if s.contains('.') {
            s.replace('.', "-")
        } else {
            s.to_string()
        }
    }

    fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
        let first_day_next_month = if month == 12 {
            let next_year = year.checked_add(1)?;
            NaiveDate::from_ymd_opt(next_year, 1, 1)?
        } else {
            let next_month = month.checked_add(1)?;
            NaiveDate::from_ymd_opt(year, next_month, 1)?
        };

        first_day_next_month.pred_opt().map(|d| d.day())
    }

    fn parse_best_date_field(
        utc_date: Option<&str>,
        date: Option<&str>,
        parse_error: &mut ErrorAccumulator,
    ) -> Option<NaiveDate> {
        if let Some(raw) = utc_date
            && let Some(parsed) = Self::parse_date_field(raw, "UTCDate", parse_error)
        {
            return Some(parsed);
        }

        if let Some(raw) = date
            && let Some(parsed) = Self::parse_date_field(raw, "UTCDate (from Date)", parse_error)
        {
            return Some(parsed);
        }

        None
    }

    /// PGN dates use `.` separators and `?` for unknown components.
    /// Unknown year means unknown date (None, no error); unknown month
    /// or day falls back to `01`, clamped to the month's last day.
    fn parse_date_field(
        raw: &str,
        label: &str,
        parse_error: &mut ErrorAccumulator,
    ) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        let norm = Self::normalize_date_separators(s);
        let parts: Vec<&str> = norm.split('-').collect();
        if parts.len() != 3 {
            parse_error.push(&format!("Conversion error: {label}='{s}'"));
            return None;
        }

        if parts[0].contains('?') {
            return None;
        }

        let year_s = parts[0];
        let month_s = if parts[1].contains('?') {
            "01"
        } else {
            parts[1]
        };
        let day_s = if parts[2].contains('?') { "01" } else { parts[2] };

        let (Ok(year), Ok(month), Ok(day)) = (
            year_s.parse::<i32>(),
            month_s.parse::<u32>(),
            day_s.parse::<u32>(),
        ) else {
            parse_error.push(&format!("Conversion error: {label}='{s}'"));
            return None;
        };

        let Some(last_day) = Self::last_day_of_month(year, month) else {
            parse_error.push(&format!(
                "Conversion error: {label}='{s}' (input is out of range)"
            ));
            return None;
        };
        let day = day.min(last_day);

        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) if date.year() > 0 => Some(date),
            _ => {
                parse_error.push(&format!(
                    "Conversion error: {label}='{s}' (input is out of range)"
                ));
                None
            }
        }
    }

    fn parse_uinteger_field(
        raw: Option<&str>,
        label: &str,
        parse_error: &mut ErrorAccumulator,
    ) -> Option<u32> {
        let s = raw?.trim();
        if s.is_empty() {
            return None;
        }
        match s.parse::<u32>() {
            Ok(v) => Some(v),
            Err(_) => {
                parse_error.push(&format!("Conversion error: {label}='{s}'"));
                None
            }
        }
    }

    fn build_game_record(&mut self, moves: MoveList) {
        let white_elo = Self::parse_uinteger_field(
            (!self.headers.white_elo.is_empty()).then_some(self.headers.white_elo.as_str()),
            "WhiteElo",
            &mut self.parse_error,
        );
        let black_elo = Self::parse_uinteger_field(
            (!self.headers.black_elo.is_empty()).then_some(self.headers.black_elo.as_str()),
            "BlackElo",
            &mut self.parse_error,
        );

        let utc_date = Self::parse_best_date_field(
            (!self.headers.utc_date.is_empty()).then_some(self.headers.utc_date.as_str()),
            (!self.headers.date.is_empty()).then_some(self.headers.date.as_str()),
            &mut self.parse_error,
        );

        self.current_game = Some(GameRecord {
            event: HeaderFields::opt_take(&mut self.headers.event),
            site: HeaderFields::opt_take(&mut self.headers.site),
            white: HeaderFields::opt_take(&mut self.headers.white),
            black: HeaderFields::opt_take(&mut self.headers.black),
            result: HeaderFields::opt_take(&mut self.headers.result)
                .or_else(|| self.result_marker.take()),
            white_elo,
            black_elo,
            utc_date,
            eco: HeaderFields::opt_take(&mut self.headers.eco),
            opening: HeaderFields::opt_take(&mut self.headers.opening),
            moves,
            parse_error: self.parse_error.take(),
        });
    }

    /// Finalizes the current game after a reader-level failure so the
    /// batch still gets a row with the message in `parse_error`.
    pub fn finalize_game_with_error(&mut self, error_msg: String) {
        self.parse_error.push(&error_msg);
        self.build_game_record(MoveList::new());
    }
}

impl Default for GameVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = MoveList;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.headers.clear();
        self.result_marker = None;
        self.parse_error = ErrorAccumulator::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.headers.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(MoveList::new())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        movetext.push(san);
        ControlFlow::Continue(())
    }

    fn outcome(
        &mut self,
        _movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        self.result_marker = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        self.build_game_record(movetext);
    }
}
