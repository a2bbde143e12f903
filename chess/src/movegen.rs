//! Pseudo-legal move generation.
//!
//! Generators follow each piece's movement and capture pattern against the
//! current occupancy but ignore whether the move leaves the mover's king
//! attacked; the engine filters that out.

use crate::board::Board;
use crate::types::{Color, Move, Piece, PieceKind, Position};

const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROYAL: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Produces the pseudo-legal moves of a piece standing on `from`.
pub trait MoveGenerator {
    fn pseudo_legal_moves(&self, board: &Board, from: Position) -> Vec<Move>;
}

impl MoveGenerator for PieceKind {
    fn pseudo_legal_moves(&self, board: &Board, from: Position) -> Vec<Move> {
        let Some(piece) = board.get_piece(from) else {
            return Vec::new();
        };
        let color = piece.color;

        let mut moves = Vec::new();
        match self {
            PieceKind::Rook => slide(board, from, color, &ORTHOGONAL, &mut moves),
            PieceKind::Bishop => slide(board, from, color, &DIAGONAL, &mut moves),
            PieceKind::Queen => {
                slide(board, from, color, &ORTHOGONAL, &mut moves);
                slide(board, from, color, &DIAGONAL, &mut moves);
            }
            PieceKind::Knight => step(board, from, color, &KNIGHT_JUMPS, &mut moves),
            PieceKind::King => step(board, from, color, &ROYAL, &mut moves),
            PieceKind::Pawn => pawn(board, from, color, &mut moves),
        }
        moves
    }
}

impl MoveGenerator for Piece {
    fn pseudo_legal_moves(&self, board: &Board, from: Position) -> Vec<Move> {
        self.kind.pseudo_legal_moves(board, from)
    }
}

/// Pseudo-legal moves of whatever stands on `from`; empty for an empty square.
pub fn pseudo_legal_moves(board: &Board, from: Position) -> Vec<Move> {
    match board.get_piece(from) {
        Some(piece) => piece.pseudo_legal_moves(board, from),
        None => Vec::new(),
    }
}

/// Walk each direction until blocked. The first occupied square is included
/// only when it holds an opposing piece.
fn slide(board: &Board, from: Position, color: Color, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(d_row, d_col) in dirs {
        let mut to = from.offset(d_row, d_col);
        while board.is_valid_position(to) {
            match board.get_piece(to) {
                None => out.push(Move::new(from, to)),
                Some(occupant) => {
                    if occupant.color != color {
                        out.push(Move::new(from, to));
                    }
                    break;
                }
            }
            to = to.offset(d_row, d_col);
        }
    }
}

/// Fixed offsets onto empty or opponent-held squares.
fn step(board: &Board, from: Position, color: Color, offsets: &[(i8, i8)], out: &mut Vec<Move>) {
    for &(d_row, d_col) in offsets {
        let to = from.offset(d_row, d_col);
        if !board.is_valid_position(to) {
            continue;
        }
        match board.get_piece(to) {
            Some(occupant) if occupant.color == color => {}
            _ => out.push(Move::new(from, to)),
        }
    }
}

fn pawn(board: &Board, from: Position, color: Color, out: &mut Vec<Move>) {
    let forward = color.forward();

    let one = from.offset(forward, 0);
    if board.is_valid_position(one) && board.get_piece(one).is_none() {
        push_pawn_move(from, one, color, out);

        let two = one.offset(forward, 0);
        if from.row == color.pawn_row()
            && board.is_valid_position(two)
            && board.get_piece(two).is_none()
        {
            push_pawn_move(from, two, color, out);
        }
    }

    for d_col in [-1, 1] {
        let to = from.offset(forward, d_col);
        if let Some(occupant) = board.get_piece(to) {
            if occupant.color != color {
                push_pawn_move(from, to, color, out);
            }
        }
    }
}

/// A pawn move onto the far row expands into the four promotion choices.
fn push_pawn_move(from: Position, to: Position, color: Color, out: &mut Vec<Move>) {
    if to.row == color.promotion_row() {
        out.extend(
            PieceKind::PROMOTIONS
                .iter()
                .map(|&kind| Move::promoting(from, to, kind)),
        );
    } else {
        out.push(Move::new(from, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn targets(moves: &[Move]) -> HashSet<String> {
        moves.iter().map(|m| m.end.to_string()).collect()
    }

    fn set(squares: &[&str]) -> HashSet<String> {
        squares.iter().map(|s| s.to_string()).collect()
    }

    fn place(board: &mut Board, sq: &str, color: Color, kind: PieceKind) {
        board.add_piece(pos(sq), Some(Piece::new(color, kind))).unwrap();
    }

    #[test]
    fn test_rook_stops_at_blockers() {
        let mut board = Board::empty();
        place(&mut board, "d4", Color::White, PieceKind::Rook);
        place(&mut board, "d6", Color::Black, PieceKind::Pawn);
        place(&mut board, "f4", Color::White, PieceKind::Pawn);

        let moves = pseudo_legal_moves(&board, pos("d4"));
        assert_eq!(
            targets(&moves),
            set(&["d5", "d6", "d3", "d2", "d1", "e4", "c4", "b4", "a4"])
        );
    }

    #[test]
    fn test_bishop_corner() {
        let mut board = Board::empty();
        place(&mut board, "a1", Color::Black, PieceKind::Bishop);
        let moves = pseudo_legal_moves(&board, pos("a1"));
        assert_eq!(
            targets(&moves),
            set(&["b2", "c3", "d4", "e5", "f6", "g7", "h8"])
        );
    }

    #[test]
    fn test_queen_combines_rook_and_bishop() {
        let mut board = Board::empty();
        place(&mut board, "d4", Color::White, PieceKind::Queen);
        assert_eq!(pseudo_legal_moves(&board, pos("d4")).len(), 27);
    }

    #[test]
    fn test_knight_excludes_own_pieces() {
        let board = Board::standard();
        let moves = pseudo_legal_moves(&board, pos("g1"));
        assert_eq!(targets(&moves), set(&["f3", "h3"]));
    }

    #[test]
    fn test_king_captures_opponent_only() {
        let mut board = Board::empty();
        place(&mut board, "e1", Color::White, PieceKind::King);
        place(&mut board, "e2", Color::Black, PieceKind::Rook);
        place(&mut board, "d1", Color::White, PieceKind::Queen);
        let moves = pseudo_legal_moves(&board, pos("e1"));
        assert_eq!(targets(&moves), set(&["e2", "d2", "f2", "f1"]));
    }

    #[test]
    fn test_pawn_first_move() {
        let board = Board::standard();
        let moves = pseudo_legal_moves(&board, pos("e2"));
        assert_eq!(targets(&moves), set(&["e3", "e4"]));
        let moves = pseudo_legal_moves(&board, pos("c7"));
        assert_eq!(targets(&moves), set(&["c6", "c5"]));
    }

    #[test]
    fn test_pawn_double_step_blocked() {
        let mut board = Board::standard();
        place(&mut board, "e3", Color::Black, PieceKind::Knight);
        assert!(pseudo_legal_moves(&board, pos("e2")).is_empty());
        // d2 and f2 attack the knight
        assert_eq!(targets(&pseudo_legal_moves(&board, pos("d2"))), set(&["d3", "d4", "e3"]));

        let mut board = Board::standard();
        place(&mut board, "e4", Color::Black, PieceKind::Knight);
        assert_eq!(targets(&pseudo_legal_moves(&board, pos("e2"))), set(&["e3"]));
    }

    #[test]
    fn test_pawn_no_double_step_off_start_row() {
        let mut board = Board::empty();
        place(&mut board, "e3", Color::White, PieceKind::Pawn);
        assert_eq!(targets(&pseudo_legal_moves(&board, pos("e3"))), set(&["e4"]));
    }

    #[test]
    fn test_pawn_diagonal_needs_capture() {
        let mut board = Board::empty();
        place(&mut board, "d5", Color::Black, PieceKind::Pawn);
        place(&mut board, "c4", Color::White, PieceKind::Pawn);
        place(&mut board, "e4", Color::Black, PieceKind::Pawn);
        assert_eq!(targets(&pseudo_legal_moves(&board, pos("d5"))), set(&["d4", "c4"]));
    }

    #[test]
    fn test_pawn_promotion_expands() {
        let mut board = Board::empty();
        place(&mut board, "g7", Color::White, PieceKind::Pawn);
        place(&mut board, "h8", Color::Black, PieceKind::Rook);
        let moves = pseudo_legal_moves(&board, pos("g7"));
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|m| m.promotion.is_some()));
        let kinds: HashSet<_> = moves
            .iter()
            .filter(|m| m.end == pos("h8"))
            .filter_map(|m| m.promotion)
            .collect();
        assert_eq!(kinds, PieceKind::PROMOTIONS.into_iter().collect());
    }

    #[test]
    fn test_black_pawn_promotes_on_row_one() {
        let mut board = Board::empty();
        place(&mut board, "a2", Color::Black, PieceKind::Pawn);
        let moves = pseudo_legal_moves(&board, pos("a2"));
        assert_eq!(moves.len(), 4);
        assert!(moves.iter().all(|m| m.end == pos("a1")));
    }

    #[test]
    fn test_empty_square_has_no_moves() {
        assert!(pseudo_legal_moves(&Board::standard(), pos("e4")).is_empty());
    }
}
