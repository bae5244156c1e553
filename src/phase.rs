use shakmaty::{Bitboard, Chess, Color, Move, Position, Role, Square};

/// Middlegame start/end plies, when the game reached them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiddlegameBounds {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// Back-rank homes of the minor and major pieces. A non-pawn,
/// non-king move leaving one of these counts as development.
const DEVELOPMENT_SQUARES: [Square; 14] = [
    Square::A1,
    Square::B1,
    Square::C1,
    Square::D1,
    Square::F1,
    Square::G1,
    Square::H1,
    Square::A8,
    Square::B8,
    Square::C8,
    Square::D8,
    Square::F8,
    Square::G8,
    Square::H8,
];

/// The middlegame starts once both sides have castled and at least
/// four minor/major pieces have left their home squares. It ends when
/// both queens are off the board and fewer than ten pieces remain, or
/// at the last ply for games that start one but never wind it down.
pub fn middlegame_bounds(moves: &[Move]) -> MiddlegameBounds {
    let development = Bitboard::from_iter(DEVELOPMENT_SQUARES);

    let mut pos = Chess::default();
    let mut bounds = MiddlegameBounds::default();
    let mut castled = (false, false);
    let mut developed = 0u32;

    for (ply, m) in moves.iter().enumerate() {
        let mover = pos.turn();
        if matches!(m, Move::Castle { .. }) {
            match mover {
                Color::White => castled.0 = true,
                Color::Black => castled.1 = true,
            }
        }
        if !matches!(m.role(), Role::Pawn | Role::King)
            && m.from().is_some_and(|sq| development.contains(sq))
        {
            developed += 1;
        }

        pos.play_unchecked(m.clone());

        if bounds.start.is_none() && castled.0 && castled.1 && developed >= 4 {
            bounds.start = Some(ply as u32 + 1);
        }

        let board = pos.board();
        if bounds.start.is_some()
            && board.queens().is_empty()
            && board.occupied().count() < 10
        {
            bounds.end = Some(ply as u32 + 1);
            break;
        }
    }

    if bounds.start.is_some() && bounds.end.is_none() {
        bounds.end = Some(moves.len() as u32);
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::mainline_moves;
    use shakmaty::san::SanPlus;

    fn moves(line: &str) -> Vec<Move> {
        let sans: Vec<SanPlus> = line
            .split_whitespace()
            .map(|s| s.parse().unwrap())
            .collect();
        mainline_moves(&sans).unwrap()
    }

    #[test]
    fn test_middlegame_starts_after_both_castle_with_development() {
        let line = moves("e4 e5 Nf3 Nc6 Bc4 Nf6 O-O Bc5 c3 O-O");
        let bounds = middlegame_bounds(&line);

        assert_eq!(bounds.start, Some(10));
        // Started but never wound down: ends at the last ply.
        assert_eq!(bounds.end, Some(10));
    }

    #[test]
    fn test_no_castling_means_no_middlegame() {
        let line = moves("e4 e5 Nf3 Nc6 Bc4 Bc5 c3 Nf6 d3 d6");
        assert_eq!(middlegame_bounds(&line), MiddlegameBounds::default());
    }

    #[test]
    fn test_empty_game() {
        assert_eq!(middlegame_bounds(&[]), MiddlegameBounds::default());
    }
}
