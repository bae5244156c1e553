use clap::Parser;
use elo_features::{
    Compression, ExplorerClient, ExplorerDb, FeatureError, FeatureRow, FeatureWriter, GameRecord,
    GameStream, Result, count_games, expand_pattern, mainline_moves, scan_opening,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Extract per-game features from PGN archives into a CSV.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// PGN file or glob pattern (e.g. 'games/*.pgn.zst').
    pgn: String,

    /// Output CSV; appended to when it already has rows.
    #[arg(short, long, default_value = "features.csv")]
    output: PathBuf,

    /// Skip the opening-explorer scan (no network access).
    #[arg(long)]
    no_openings: bool,

    /// Opening explorer database: 'lichess' or 'master'.
    #[arg(long, default_value = "master")]
    database: ExplorerDb,

    /// Only consider explorer games up to this year.
    #[arg(long, default_value = "2012")]
    until: u16,

    /// Seconds to wait before each explorer request.
    #[arg(long, default_value = "2")]
    delay: u64,

    /// Flush the CSV every this many games.
    #[arg(long, default_value = "100")]
    save_interval: usize,

    /// Input compression ('zstd' or 'none'); inferred from the file
    /// extension when omitted.
    #[arg(long)]
    compression: Option<String>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(err) = run(cli) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let compression = cli
        .compression
        .as_deref()
        .map(Compression::parse)
        .transpose()?;

    let paths = expand_pattern(&cli.pgn)?;
    if paths.is_empty() {
        log::warn!("No files match '{}'", cli.pgn);
        return Ok(());
    }

    let lookup = if cli.no_openings {
        None
    } else {
        Some(
            ExplorerClient::new(cli.database)?
                .until(cli.until)
                .delay(Duration::from_secs(cli.delay)),
        )
    };

    let (mut writer, existing_rows) = FeatureWriter::append(&cli.output)?;
    if existing_rows > 0 {
        log::info!(
            "Resuming after {existing_rows} rows already in {}",
            cli.output.display()
        );
    }

    let total = paths
        .iter()
        .map(|path| count_games(path, compression))
        .sum::<Result<usize>>()?;

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} games {msg}")
            .map_err(|e| FeatureError::ProgressTemplate(e.to_string()))?,
    );
    bar.inc(existing_rows.min(total) as u64);

    let mut written = 0usize;
    for (game_index, game) in GameStream::from_paths(paths, compression).enumerate() {
        if game_index < existing_rows {
            continue;
        }

        match game {
            Ok(game) => match extract_row(&game, lookup.as_ref()) {
                Ok(row) => {
                    writer.write(&row)?;
                    written += 1;
                    if written.is_multiple_of(cli.save_interval) {
                        writer.flush()?;
                    }
                }
                Err(err) => log::warn!("Skipping game {game_index}: {err}"),
            },
            Err(err) => log::warn!("Skipping game {game_index}: {err}"),
        }
        bar.inc(1);
    }

    writer.flush()?;
    bar.finish();
    log::info!("Wrote {written} rows to {}", cli.output.display());
    Ok(())
}

fn extract_row(game: &GameRecord, lookup: Option<&ExplorerClient>) -> Result<FeatureRow> {
    let moves = mainline_moves(&game.moves)?;
    let mut row = FeatureRow::from_game(game, &moves);
    if let Some(lookup) = lookup {
        row.set_opening(scan_opening(&moves, lookup)?);
    }
    Ok(row)
}
