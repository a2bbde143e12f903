use crate::board::{Board, BoardError};
use crate::fen::{self, FenError};
use crate::movegen::pseudo_legal_moves;
use crate::types::{Color, Move, Piece, Position};

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Resigned,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkmate => "Checkmate",
            Self::Stalemate => "Stalemate",
            Self::Resigned => "Resigned",
        }
    }
}

/// Lifecycle of a game. `Ended` has no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Active,
    Ended {
        reason: EndReason,
        winner: Option<Color>,
    },
}

/// What a committed move did, seen from the side now to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub mv: Move,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
}

/// Rules engine: owns the board, the side to move and the terminal flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    phase: GamePhase,
}

impl Game {
    /// Standard initial position, white to move.
    pub fn new() -> Self {
        Self::from_board(Board::standard(), Color::White)
    }

    /// Start from an arbitrary layout. The phase is evaluated for `turn`, so a
    /// layout that is already mate or stalemate starts ended.
    pub fn from_board(board: Board, turn: Color) -> Self {
        let mut game = Self {
            board,
            turn,
            phase: GamePhase::Active,
        };
        game.phase = game.evaluate_phase();
        game
    }

    /// Rebuild a persisted game without re-deriving its phase.
    pub fn restore(board: Board, turn: Color, phase: GamePhase) -> Self {
        Self { board, turn, phase }
    }

    /// Parse `<placement> <w|b> ...`. Castling and en passant fields are ignored.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::InvalidFormat)?;
        let board = fen::parse_placement(placement)?;
        let turn = match fields.next() {
            Some(field) => fen::parse_turn(field)?,
            None => Color::White,
        };
        Ok(Self::from_board(board, turn))
    }

    pub fn to_fen(&self) -> String {
        format!(
            "{} {} - - 0 1",
            fen::format_placement(&self.board),
            fen::format_turn(self.turn)
        )
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Ended { .. })
    }

    /// Legal moves of the piece on `from`: its pseudo-legal moves minus those
    /// that leave its own king attacked. Empty once the game has ended.
    pub fn legal_moves(&self, from: Position) -> Vec<Move> {
        if self.is_over() {
            return Vec::new();
        }
        let Some(piece) = self.board.get_piece(from) else {
            return Vec::new();
        };
        let mut scratch = self.board.clone();
        pseudo_legal_moves(&self.board, from)
            .into_iter()
            .filter(|&mv| keeps_king_safe(&mut scratch, mv, piece.color))
            .collect()
    }

    /// Every legal move for the side to move.
    pub fn all_legal_moves(&self) -> Vec<Move> {
        self.board
            .pieces()
            .filter(|(_, piece)| piece.color == self.turn)
            .flat_map(|(pos, _)| self.legal_moves(pos))
            .collect()
    }

    /// True iff some opposing pseudo-legal move ends on `color`'s king.
    pub fn is_in_check(&self, color: Color) -> bool {
        is_attacked(&self.board, color)
    }

    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_escape(color)
    }

    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_escape(color)
    }

    /// Validate and commit `mv` for the side to move, then flip the turn.
    ///
    /// A rejected move leaves the game untouched.
    pub fn make_move(&mut self, mv: Move) -> Result<MoveOutcome, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        let piece = self
            .board
            .get_piece(mv.start)
            .ok_or(GameError::NoPiece(mv.start))?;
        if piece.color != self.turn {
            return Err(GameError::WrongTurn {
                expected: self.turn,
                found: piece.color,
            });
        }
        if !self.legal_moves(mv.start).contains(&mv) {
            return Err(GameError::IllegalMove(mv));
        }

        let captured = self.board.get_piece(mv.end);
        self.board.apply_move(mv)?;
        if is_attacked(&self.board, piece.color) {
            self.board.undo_last_move()?;
            return Err(GameError::LeavesKingInCheck(mv));
        }

        self.turn = self.turn.opposite();
        self.phase = self.evaluate_phase();

        let check = self.is_in_check(self.turn);
        let (checkmate, stalemate) = match self.phase {
            GamePhase::Ended {
                reason: EndReason::Checkmate,
                ..
            } => (true, false),
            GamePhase::Ended {
                reason: EndReason::Stalemate,
                ..
            } => (false, true),
            _ => (false, false),
        };

        Ok(MoveOutcome {
            mv,
            piece,
            captured,
            check,
            checkmate,
            stalemate,
        })
    }

    /// End the game with `color` conceding.
    pub fn resign(&mut self, color: Color) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        self.phase = GamePhase::Ended {
            reason: EndReason::Resigned,
            winner: Some(color.opposite()),
        };
        Ok(())
    }

    fn evaluate_phase(&self) -> GamePhase {
        if self.has_escape(self.turn) {
            GamePhase::Active
        } else if self.is_in_check(self.turn) {
            GamePhase::Ended {
                reason: EndReason::Checkmate,
                winner: Some(self.turn.opposite()),
            }
        } else {
            GamePhase::Ended {
                reason: EndReason::Stalemate,
                winner: None,
            }
        }
    }

    /// Whether any piece of `color` has a move that leaves its king safe.
    fn has_escape(&self, color: Color) -> bool {
        let mut scratch = self.board.clone();
        self.board
            .pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(pos, _)| {
                pseudo_legal_moves(&self.board, pos)
                    .into_iter()
                    .any(|mv| keeps_king_safe(&mut scratch, mv, color))
            })
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

fn is_attacked(board: &Board, color: Color) -> bool {
    let Some(king) = board.king_position(color) else {
        return false;
    };
    board
        .pieces()
        .filter(|(_, piece)| piece.color != color)
        .any(|(pos, _)| {
            pseudo_legal_moves(board, pos)
                .iter()
                .any(|mv| mv.end == king)
        })
}

fn keeps_king_safe(scratch: &mut Board, mv: Move, color: Color) -> bool {
    match scratch.simulate(mv) {
        Ok(after) => !is_attacked(&after, color),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game is already over")]
    GameOver,
    #[error("no piece at {0}")]
    NoPiece(Position),
    #[error("not {found}'s turn, {expected} to move")]
    WrongTurn { expected: Color, found: Color },
    #[error("illegal move {0}")]
    IllegalMove(Move),
    #[error("move {0} leaves the king in check")]
    LeavesKingInCheck(Move),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn play(game: &mut Game, moves: &[&str]) {
        for m in moves {
            game.make_move(mv(m)).unwrap();
        }
    }

    #[test]
    fn test_opening_pawn_move_flips_turn() {
        let mut game = Game::new();
        let outcome = game.make_move(Move::new(Position::new(2, 5), Position::new(4, 5))).unwrap();
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(outcome.piece, Piece::new(Color::White, PieceKind::Pawn));
        assert!(!outcome.check);
        assert_eq!(game.phase(), GamePhase::Active);
    }

    #[test]
    fn test_rook_back_rank_mate() {
        // Black king boxed in by its own pawns, white rook delivers on row 8.
        let game = Game::from_fen("R3k3/3ppp2/8/8/8/8/8/4K3 b").unwrap();
        assert!(game.is_in_check(Color::Black));
        assert!(game.is_in_checkmate(Color::Black));
        assert!(!game.is_in_stalemate(Color::Black));
        assert_eq!(
            game.phase(),
            GamePhase::Ended {
                reason: EndReason::Checkmate,
                winner: Some(Color::White)
            }
        );
    }

    #[test]
    fn test_check_with_capture_escape_is_not_mate() {
        // The knight on b6 can take the checking rook.
        let game = Game::from_fen("R3k3/3ppp2/1n6/8/8/8/8/4K3 b").unwrap();
        assert!(game.is_in_check(Color::Black));
        assert!(!game.is_in_checkmate(Color::Black));
        assert_eq!(game.phase(), GamePhase::Active);
    }

    #[test]
    fn test_stalemate() {
        // Lone black king in the corner, every flight square covered by the queen.
        let game = Game::from_fen("k7/8/1Q6/8/8/8/8/7K b").unwrap();
        assert!(!game.is_in_check(Color::Black));
        assert!(game.is_in_stalemate(Color::Black));
        assert!(!game.is_in_checkmate(Color::Black));
        assert_eq!(
            game.phase(),
            GamePhase::Ended {
                reason: EndReason::Stalemate,
                winner: None
            }
        );
    }

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new();
        play(&mut game, &["f2f3", "e7e5", "g2g4"]);
        let outcome = game.make_move(mv("d8h4")).unwrap();
        assert!(outcome.check);
        assert!(outcome.checkmate);
        assert!(game.is_over());
        assert!(game.all_legal_moves().is_empty());
        assert!(game.legal_moves(pos("e1")).is_empty());
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        // White bishop on e2 pinned by the black rook on e8.
        let game = Game::from_fen("4r2k/8/8/8/8/8/4B3/4K3 w").unwrap();
        assert!(game.legal_moves(pos("e2")).is_empty());
        assert!(!game.legal_moves(pos("e1")).is_empty());
    }

    #[test]
    fn test_king_cannot_step_into_attack() {
        let game = Game::from_fen("3r3k/8/8/8/8/8/8/4K3 w").unwrap();
        let targets: Vec<_> = game.legal_moves(pos("e1")).iter().map(|m| m.end).collect();
        assert!(!targets.contains(&pos("d1")));
        assert!(!targets.contains(&pos("d2")));
        assert!(targets.contains(&pos("e2")));
    }

    #[test]
    fn test_rejections_leave_board_untouched() {
        let mut game = Game::new();
        let before = game.clone();

        assert_eq!(game.make_move(mv("e4e5")), Err(GameError::NoPiece(pos("e4"))));
        assert_eq!(
            game.make_move(mv("e7e5")),
            Err(GameError::WrongTurn {
                expected: Color::White,
                found: Color::Black
            })
        );
        assert_eq!(game.make_move(mv("e2e5")), Err(GameError::IllegalMove(mv("e2e5"))));
        assert_eq!(game, before);
    }

    #[test]
    fn test_move_into_check_rejected() {
        let mut game = Game::from_fen("4r2k/8/8/8/8/8/4B3/4K3 w").unwrap();
        let before = game.clone();
        assert_eq!(
            game.make_move(mv("e2d3")),
            Err(GameError::IllegalMove(mv("e2d3")))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_promotion_requires_choice() {
        let mut game = Game::from_fen("7k/P7/8/8/8/8/8/K7 w").unwrap();
        assert!(matches!(
            game.make_move(mv("a7a8")),
            Err(GameError::IllegalMove(_))
        ));
        game.make_move(mv("a7a8q")).unwrap();
        assert_eq!(
            game.board().get_piece(pos("a8")),
            Some(Piece::new(Color::White, PieceKind::Queen))
        );
    }

    #[test]
    fn test_resign() {
        let mut game = Game::new();
        game.resign(Color::White).unwrap();
        assert_eq!(
            game.phase(),
            GamePhase::Ended {
                reason: EndReason::Resigned,
                winner: Some(Color::Black)
            }
        );
        assert_eq!(game.resign(Color::Black), Err(GameError::GameOver));
        assert_eq!(game.make_move(mv("e2e4")), Err(GameError::GameOver));
        assert!(game.legal_moves(pos("e2")).is_empty());
    }

    #[test]
    fn test_fen_roundtrip() {
        let mut game = Game::new();
        play(&mut game, &["e2e4"]);
        let fen = game.to_fen();
        assert_eq!(fen, "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b - - 0 1");
        let parsed = Game::from_fen(&fen).unwrap();
        assert_eq!(parsed.board(), game.board());
        assert_eq!(parsed.turn(), Color::Black);
    }

    #[test]
    fn test_deterministic_outcome() {
        let mut a = Game::from_fen("4k3/8/8/8/8/8/3q4/4K3 w").unwrap();
        let mut b = a.clone();
        assert_eq!(a.make_move(mv("e1d2")), b.make_move(mv("e1d2")));
        assert_eq!(a, b);
    }
}
