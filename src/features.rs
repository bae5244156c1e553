use crate::error::{FeatureError, Result};

use shakmaty::san::SanPlus;
use shakmaty::{Chess, Color, Move, Position, Role};

/// Replays the SAN mainline into legal moves. The first illegal or
/// ambiguous SAN fails the whole game.
pub fn mainline_moves(sans: &[SanPlus]) -> Result<Vec<Move>> {
    let mut pos = Chess::default();
    let mut moves = Vec::with_capacity(sans.len());
    for (ply, san) in sans.iter().enumerate() {
        let m = san
            .san
            .to_move(&pos)
            .map_err(|_| FeatureError::IllegalSan {
                san: san.to_string(),
                ply,
            })?;
        pos.play_unchecked(m.clone());
        moves.push(m);
    }
    Ok(moves)
}

/// A per-side tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BySide {
    pub white: u32,
    pub black: u32,
}

impl BySide {
    fn bump(&mut self, side: Color) {
        match side {
            Color::White => self.white += 1,
            Color::Black => self.black += 1,
        }
    }
}

fn side_to_move(ply: usize) -> Color {
    Color::from_white(ply.is_multiple_of(2))
}

/// Checks delivered per side, attributed to the mover.
pub fn count_checks(moves: &[Move]) -> BySide {
    let mut pos = Chess::default();
    let mut checks = BySide::default();
    for m in moves {
        let mover = pos.turn();
        pos.play_unchecked(m.clone());
        if pos.is_check() {
            checks.bump(mover);
        }
    }
    checks
}

pub fn count_captures(moves: &[Move]) -> BySide {
    let mut captures = BySide::default();
    for (ply, m) in moves.iter().enumerate() {
        if m.is_capture() {
            captures.bump(side_to_move(ply));
        }
    }
    captures
}

/// Moves per piece type per side. Castling counts as a king move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieceMoveCounts {
    pub pawn: BySide,
    pub knight: BySide,
    pub bishop: BySide,
    pub rook: BySide,
    pub queen: BySide,
    pub king: BySide,
}

pub fn count_piece_moves(moves: &[Move]) -> PieceMoveCounts {
    let mut counts = PieceMoveCounts::default();
    for (ply, m) in moves.iter().enumerate() {
        let side = side_to_move(ply);
        let tally = match m.role() {
            Role::Pawn => &mut counts.pawn,
            Role::Knight => &mut counts.knight,
            Role::Bishop => &mut counts.bishop,
            Role::Rook => &mut counts.rook,
            Role::Queen => &mut counts.queen,
            Role::King => &mut counts.king,
        };
        tally.bump(side);
    }
    counts
}

pub fn count_promotions(moves: &[Move]) -> BySide {
    let mut promotions = BySide::default();
    for (ply, m) in moves.iter().enumerate() {
        if m.promotion().is_some() {
            promotions.bump(side_to_move(ply));
        }
    }
    promotions
}

pub fn count_castling(moves: &[Move]) -> BySide {
    let mut castling = BySide::default();
    for (ply, m) in moves.iter().enumerate() {
        if matches!(m, Move::Castle { .. }) {
            castling.bump(side_to_move(ply));
        }
    }
    castling
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveTotals {
    /// Total plies played.
    pub total: u32,
    pub white: u32,
    pub black: u32,
}

pub fn move_totals(moves: &[Move]) -> MoveTotals {
    let total = moves.len() as u32;
    MoveTotals {
        total,
        white: total.div_ceil(2),
        black: total / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(line: &str) -> Vec<Move> {
        let sans: Vec<SanPlus> = line
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        mainline_moves(&sans).unwrap()
    }

    #[test]
    fn test_scholars_mate_counts() {
        let line = moves("e4 e5 Qh5 Nc6 Bc4 Nf6 Qxf7#");

        let checks = count_checks(&line);
        assert_eq!(checks, BySide { white: 1, black: 0 });

        let captures = count_captures(&line);
        assert_eq!(captures, BySide { white: 1, black: 0 });

        let pieces = count_piece_moves(&line);
        assert_eq!(pieces.queen, BySide { white: 2, black: 0 });
        assert_eq!(pieces.pawn, BySide { white: 1, black: 1 });
        assert_eq!(pieces.knight, BySide { white: 0, black: 2 });
        assert_eq!(pieces.bishop, BySide { white: 1, black: 0 });
    }

    #[test]
    fn test_promotion_line() {
        let line = moves("e4 d5 exd5 c6 dxc6 Nf6 cxb7 Nbd7 bxa8=Q");

        assert_eq!(count_promotions(&line), BySide { white: 1, black: 0 });
        assert_eq!(count_captures(&line), BySide { white: 4, black: 0 });
    }

    #[test]
    fn test_castling_counts_as_king_move() {
        let line = moves("e4 e5 Nf3 Nc6 Bc4 Bc5 O-O");

        assert_eq!(count_castling(&line), BySide { white: 1, black: 0 });
        assert_eq!(
            count_piece_moves(&line).king,
            BySide { white: 1, black: 0 }
        );
    }

    #[test]
    fn test_illegal_san_is_rejected() {
        let sans: Vec<SanPlus> = vec!["e5".parse().unwrap()];
        assert!(matches!(
            mainline_moves(&sans),
            Err(FeatureError::IllegalSan { ply: 0, .. })
        ));
    }

    #[test]
    fn test_move_totals_split_by_parity() {
        assert_eq!(
            move_totals(&moves("e4 e5 Nf3")),
            MoveTotals {
                total: 3,
                white: 2,
                black: 1
            }
        );
        assert_eq!(
            move_totals(&moves("e4 e5 Nf3 Nc6")),
            MoveTotals {
                total: 4,
                white: 2,
                black: 2
            }
        );
        assert_eq!(move_totals(&[]), MoveTotals::default());
    }
}
