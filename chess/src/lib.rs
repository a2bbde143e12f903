pub mod board;
pub mod fen;
pub mod game;
pub mod movegen;
pub mod types;

pub use board::{Board, BoardError, SimulatedMove};
pub use fen::FenError;
pub use game::{EndReason, Game, GameError, GamePhase, MoveOutcome};
pub use movegen::{pseudo_legal_moves, MoveGenerator};
pub use types::{Color, Move, ParseError, Piece, PieceKind, Position};
