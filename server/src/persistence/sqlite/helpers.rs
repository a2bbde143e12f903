//! Encode/decode helpers between engine types and the `games` table columns.

use chess::{Color, EndReason, GamePhase};

/// Encode a phase into the `(status, winner)` columns.
pub fn encode_phase(phase: GamePhase) -> (&'static str, Option<&'static str>) {
    match phase {
        GamePhase::Active => ("Active", None),
        GamePhase::Ended { reason, winner } => (reason.as_str(), winner.map(Color::as_str)),
    }
}

/// Decode the `(status, winner)` columns. `None` for values outside the
/// schema's CHECK constraints.
pub fn decode_phase(status: &str, winner: Option<&str>) -> Option<GamePhase> {
    let winner = match winner {
        None => None,
        Some("white") => Some(Color::White),
        Some("black") => Some(Color::Black),
        Some(_) => return None,
    };
    let reason = match status {
        "Active" => return Some(GamePhase::Active),
        "Checkmate" => EndReason::Checkmate,
        "Stalemate" => EndReason::Stalemate,
        "Resigned" => EndReason::Resigned,
        _ => return None,
    };
    Some(GamePhase::Ended { reason, winner })
}
