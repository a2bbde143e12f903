use crate::board::Board;
use crate::types::{Color, Piece, Position};

/// Format the piece-placement field of a FEN string (row 8 first).
pub fn format_placement(board: &Board) -> String {
    let mut out = String::with_capacity(64);
    for row in (1..=8).rev() {
        let mut empty = 0;
        for col in 1..=8 {
            match board.get_piece(Position::new(row, col)) {
                Some(piece) => {
                    if empty > 0 {
                        out.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    out.push(piece.to_fen_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            out.push(char::from(b'0' + empty));
        }
        if row > 1 {
            out.push('/');
        }
    }
    out
}

/// Parse the piece-placement field of a FEN string.
pub fn parse_placement(placement: &str) -> Result<Board, FenError> {
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != 8 {
        return Err(FenError::InvalidBoardLayout);
    }

    let mut board = Board::empty();
    for (idx, row_str) in rows.iter().enumerate() {
        let row = 8 - idx as i8;
        let mut col: i8 = 1;
        for c in row_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(FenError::InvalidBoardLayout);
                }
                col += skip as i8;
            } else {
                let piece = Piece::from_fen_char(c).ok_or(FenError::InvalidPiece(c))?;
                board
                    .add_piece(Position::new(row, col), Some(piece))
                    .map_err(|_| FenError::InvalidBoardLayout)?;
                col += 1;
            }
            if col > 9 {
                return Err(FenError::InvalidBoardLayout);
            }
        }
        if col != 9 {
            return Err(FenError::InvalidBoardLayout);
        }
    }
    Ok(board)
}

/// Parse the side-to-move field.
pub(crate) fn parse_turn(field: &str) -> Result<Color, FenError> {
    match field {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        _ => Err(FenError::InvalidFormat),
    }
}

pub(crate) fn format_turn(color: Color) -> &'static str {
    match color {
        Color::White => "w",
        Color::Black => "b",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
    #[error("Invalid piece character: {0}")]
    InvalidPiece(char),
}
