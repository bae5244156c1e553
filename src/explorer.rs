use crate::error::Result;

use serde::Deserialize;
use shakmaty::fen::Fen;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// A source of opening knowledge: given a position, what does the book
/// call it and which moves has it seen played from there?
pub trait OpeningLookup {
    fn query(&self, position: &Fen) -> Result<OpeningLookupResult>;
}

/// Answer to a single position query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpeningLookupResult {
    /// Opening name attached to this position, when the book names it.
    pub opening: Option<String>,
    /// SAN of the continuations the database has seen from here. Empty
    /// means the position itself is unknown territory.
    pub continuations: Vec<String>,
}

/// Which Lichess opening explorer database to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerDb {
    Lichess,
    Master,
}

impl ExplorerDb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lichess => "lichess",
            Self::Master => "master",
        }
    }
}

impl fmt::Display for ExplorerDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplorerDb {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lichess" => Ok(Self::Lichess),
            "master" | "masters" => Ok(Self::Master),
            other => Err(format!(
                "unknown explorer database '{other}'; expected 'lichess' or 'master'"
            )),
        }
    }
}

const DEFAULT_BASE_URL: &str = "https://explorer.lichess.ovh";
const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Blocking HTTP client for the Lichess opening explorer.
pub struct ExplorerClient {
    client: reqwest::blocking::Client,
    base_url: String,
    database: ExplorerDb,
    until: Option<u16>,
    delay: Duration,
}

impl ExplorerClient {
    pub fn new(database: ExplorerDb) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, database)
    }

    pub fn with_base_url(base_url: &str, database: ExplorerDb) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("elo-features/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
            until: None,
            delay: DEFAULT_DELAY,
        })
    }

    /// Restricts the database to games played up to and including the
    /// given year.
    pub fn until(mut self, year: u16) -> Self {
        self.until = Some(year);
        self
    }

    /// Pause before every request. The public explorer enforces a
    /// request budget.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl OpeningLookup for ExplorerClient {
    fn query(&self, position: &Fen) -> Result<OpeningLookupResult> {
        thread::sleep(self.delay);

        let url = format!("{}/{}", self.base_url, self.database.as_str());
        let mut request = self
            .client
            .get(&url)
            .query(&[("fen", position.to_string())]);
        if let Some(until) = self.until {
            request = request.query(&[("until", until.to_string())]);
        }

        // Decoding from the body text (rather than response.json())
        // keeps malformed payloads distinguishable from transport
        // failures in the error taxonomy.
        let body = request.send()?.error_for_status()?.text()?;
        let response: ExplorerResponse = serde_json::from_str(&body)?;

        Ok(OpeningLookupResult {
            opening: response.opening.and_then(|o| o.name),
            continuations: response.moves.into_iter().map(|m| m.san).collect(),
        })
    }
}

#[derive(Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    opening: Option<ExplorerOpening>,
    #[serde(default)]
    moves: Vec<ExplorerMove>,
}

#[derive(Deserialize)]
struct ExplorerOpening {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ExplorerMove {
    san: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> OpeningLookupResult {
        let response: ExplorerResponse = serde_json::from_str(body).unwrap();
        OpeningLookupResult {
            opening: response.opening.and_then(|o| o.name),
            continuations: response.moves.into_iter().map(|m| m.san).collect(),
        }
    }

    #[test]
    fn test_decode_named_position() {
        let result = decode(
            r#"{"opening": {"eco": "C50", "name": "Italian Game"},
                "moves": [{"san": "Bc5"}, {"san": "Nf6"}]}"#,
        );
        assert_eq!(result.opening.as_deref(), Some("Italian Game"));
        assert_eq!(result.continuations, vec!["Bc5", "Nf6"]);
    }

    #[test]
    fn test_decode_null_opening() {
        let result = decode(r#"{"opening": null, "moves": [{"san": "e4"}]}"#);
        assert_eq!(result.opening, None);
        assert_eq!(result.continuations, vec!["e4"]);
    }

    #[test]
    fn test_decode_missing_fields() {
        let result = decode(r#"{}"#);
        assert_eq!(result.opening, None);
        assert!(result.continuations.is_empty());
    }

    #[test]
    fn test_decode_empty_moves_is_out_of_book() {
        let result = decode(r#"{"opening": {"name": "Rare Line"}, "moves": []}"#);
        assert_eq!(result.opening.as_deref(), Some("Rare Line"));
        assert!(result.continuations.is_empty());
    }

    #[test]
    fn test_explorer_db_from_str() {
        assert_eq!("lichess".parse::<ExplorerDb>().unwrap(), ExplorerDb::Lichess);
        assert_eq!("master".parse::<ExplorerDb>().unwrap(), ExplorerDb::Master);
        assert_eq!("Masters".parse::<ExplorerDb>().unwrap(), ExplorerDb::Master);
        assert!("chess960".parse::<ExplorerDb>().is_err());
    }
}
