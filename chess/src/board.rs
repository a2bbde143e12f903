//! 8x8 piece grid with a single-entry undo record.
//!
//! The board has no notion of turns or legality. It relocates pieces and can
//! revert exactly one move, which is what the engine needs to test whether a
//! candidate move exposes its own king.

use std::ops::Deref;

use crate::types::{Color, Move, Piece, PieceKind, Position};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("position {0} is off the board")]
    OffBoard(Position),
    #[error("no piece at {0}")]
    NoPiece(Position),
    #[error("no move to undo")]
    NothingToUndo,
}

#[derive(Debug, Clone, Copy)]
struct UndoRecord {
    mv: Move,
    moved: Piece,
    captured: Option<Piece>,
}

#[derive(Debug, Clone, Default)]
pub struct Board {
    // squares[row - 1][col - 1]
    squares: [[Option<Piece>; 8]; 8],
    last: Option<UndoRecord>,
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.squares == other.squares
    }
}

impl Eq for Board {}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard initial layout, white on rows 1 and 2.
    pub fn standard() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut board = Self::empty();
        for (i, kind) in BACK_RANK.into_iter().enumerate() {
            board.squares[0][i] = Some(Piece::new(Color::White, kind));
            board.squares[1][i] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board.squares[6][i] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board.squares[7][i] = Some(Piece::new(Color::Black, kind));
        }
        board
    }

    pub fn is_valid_position(&self, pos: Position) -> bool {
        pos.is_on_board()
    }

    /// Place `piece` at `pos`, or clear the square with `None`.
    pub fn add_piece(&mut self, pos: Position, piece: Option<Piece>) -> Result<(), BoardError> {
        let slot = self.slot_mut(pos).ok_or(BoardError::OffBoard(pos))?;
        *slot = piece;
        Ok(())
    }

    /// Piece at `pos`; off-board positions read as empty.
    pub fn get_piece(&self, pos: Position) -> Option<Piece> {
        if !pos.is_on_board() {
            return None;
        }
        self.squares[(pos.row - 1) as usize][(pos.col - 1) as usize]
    }

    /// Occupied squares, row 1 first.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(|pos| self.get_piece(pos).map(|piece| (pos, piece)))
    }

    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, p)| p.color == color && p.kind == PieceKind::King)
            .map(|(pos, _)| pos)
    }

    /// Rows of the grid, row 1 first.
    pub fn rows(&self) -> &[[Option<Piece>; 8]; 8] {
        &self.squares
    }

    /// Relocate the piece on `mv.start` to `mv.end`, capturing any occupant.
    ///
    /// A pawn with `mv.promotion` set is replaced by the promotion piece. The
    /// move and captured piece become the sole undo entry.
    pub fn apply_move(&mut self, mv: Move) -> Result<(), BoardError> {
        if !mv.end.is_on_board() {
            return Err(BoardError::OffBoard(mv.end));
        }
        let moved = self.get_piece(mv.start).ok_or(BoardError::NoPiece(mv.start))?;
        let captured = self.get_piece(mv.end);

        let placed = match mv.promotion {
            Some(kind) if moved.kind == PieceKind::Pawn => Piece::new(moved.color, kind),
            _ => moved,
        };

        self.add_piece(mv.start, None)?;
        self.add_piece(mv.end, Some(placed))?;
        self.last = Some(UndoRecord {
            mv,
            moved,
            captured,
        });
        Ok(())
    }

    /// Revert the last applied move, restoring any captured piece and
    /// un-promoting a promoted pawn. The undo entry is consumed.
    pub fn undo_last_move(&mut self) -> Result<(), BoardError> {
        let record = self.last.take().ok_or(BoardError::NothingToUndo)?;
        self.add_piece(record.mv.start, Some(record.moved))?;
        self.add_piece(record.mv.end, record.captured)?;
        Ok(())
    }

    /// Apply `mv` for the lifetime of the returned guard.
    ///
    /// The guard reverts the move when dropped, so a simulation cannot leak a
    /// half-applied move out of any exit path.
    pub fn simulate(&mut self, mv: Move) -> Result<SimulatedMove<'_>, BoardError> {
        self.apply_move(mv)?;
        Ok(SimulatedMove { board: self })
    }

    fn slot_mut(&mut self, pos: Position) -> Option<&mut Option<Piece>> {
        if !pos.is_on_board() {
            return None;
        }
        Some(&mut self.squares[(pos.row - 1) as usize][(pos.col - 1) as usize])
    }
}

/// A board with one move applied; reverted on drop.
pub struct SimulatedMove<'a> {
    board: &'a mut Board,
}

impl Deref for SimulatedMove<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl Drop for SimulatedMove<'_> {
    fn drop(&mut self) {
        // The guard only exists after a successful apply, so an entry is present.
        let _ = self.board.undo_last_move();
    }
}
