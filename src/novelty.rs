use crate::error::Result;
use crate::explorer::OpeningLookup;

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingSide, Chess, Color, EnPassantMode, Move, Position, Square};

/// Where a game leaves known opening territory.
///
/// All fields are absent for games whose very first position is
/// already outside the book, and stay absent on empty games.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoveltyRecord {
    /// Name of the deepest named position reached, last write wins.
    pub opening_name: Option<String>,
    /// Ply of the last position the book had a name for.
    pub last_named_move: Option<usize>,
    /// Ply of the last move still found in the book.
    pub last_known_move: Option<usize>,
    /// Plies played after the book ran out. Zero when the game ended
    /// while still in book.
    pub moves_after_novelty: Option<usize>,
    /// Side that played the last in-book move.
    pub novelty_player: Option<Color>,
    /// Piece letter of the last in-book move (pawns are 'P').
    pub novelty_piece: Option<char>,
    /// Destination square of the last in-book move. Castling is
    /// normalized to the king's target square.
    pub novelty_square: Option<String>,
    /// SAN of the last in-book move.
    pub novelty_san: Option<String>,
}

impl NoveltyRecord {
    fn clear_novelty_details(&mut self) {
        self.novelty_player = None;
        self.novelty_piece = None;
        self.novelty_square = None;
        self.novelty_san = None;
    }
}

/// Walks the mainline, querying `lookup` with each pre-move position
/// from ply 1 onward, and records where the book ran out.
///
/// The first move is never looked up: every game shares the starting
/// position, so a query there carries no information. Empty
/// continuations terminate the scan (any opening name returned by that
/// terminating query still lands in the record). A game that ends
/// while still in book gets `moves_after_novelty = 0` and no novelty
/// details, since no deviating move was ever played. Lookup failures
/// propagate to the caller.
pub fn scan_opening<L: OpeningLookup + ?Sized>(
    moves: &[Move],
    lookup: &L,
) -> Result<NoveltyRecord> {
    let total = moves.len();
    let mut pos = Chess::default();
    let mut record = NoveltyRecord::default();

    for (ply, m) in moves.iter().enumerate() {
        if ply > 0 {
            let fen = Fen::from_position(&pos, EnPassantMode::Legal);
            let answer = lookup.query(&fen)?;

            if let Some(name) = answer.opening {
                record.opening_name = Some(name);
                record.last_named_move = Some(ply);
            }

            // No continuations: the database never saw this position.
            if answer.continuations.is_empty() {
                break;
            }
        }

        // Running out of game counts as staying in book to the end.
        if ply + 1 == total {
            record.moves_after_novelty = Some(0);
            record.clear_novelty_details();
            break;
        }

        if ply > 0 {
            record.last_known_move = Some(ply);
            record.novelty_player = Some(pos.turn());
            record.novelty_piece = Some(m.role().upper_char());
            record.novelty_square = Some(destination_square(m).to_string());
            record.moves_after_novelty = Some(total - ply);
            record.novelty_san =
                Some(SanPlus::from_move_and_play_unchecked(&mut pos, m.clone()).to_string());
        } else {
            pos.play_unchecked(m.clone());
        }
    }

    Ok(record)
}

fn destination_square(m: &Move) -> Square {
    match m {
        // shakmaty encodes castling as king-takes-rook.
        &Move::Castle { king, rook } => {
            let side = if rook > king {
                CastlingSide::KingSide
            } else {
                CastlingSide::QueenSide
            };
            Square::from_coords(side.king_to_file(), king.rank())
        }
        _ => m.to(),
    }
}
