//! Standard chess via `shakmaty`.
//!
//! [`ChessRules`] is the shipped [`RulesEngine`]. White is [`Side::First`].
//! Moves arrive as `{from, to, promotion?}` and are checked by converting
//! them to UCI. Positions travel as FEN; notation is SAN.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use stakemate_protocol::{Side, TerminationReason};

use crate::{AppliedMove, RulesEngine, Termination};

/// Occurrences of one position that end the game as a draw.
const REPETITION_LIMIT: u8 = 3;

/// Halfmoves without a capture or pawn move that end the game.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

// ---------------------------------------------------------------------------
// ChessMove
// ---------------------------------------------------------------------------

/// A move descriptor as clients send it.
///
/// ```json
/// { "from": "e7", "to": "e8", "promotion": "q" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessMove {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl ChessMove {
    /// Builds a move without promotion.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    /// Adds a promotion piece (`q`, `r`, `b` or `n`).
    pub fn promoting_to(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }

    /// The UCI spelling of this move, e.g. `e7e8q`.
    pub fn to_uci(&self) -> String {
        let mut uci = format!(
            "{}{}",
            self.from.trim().to_ascii_lowercase(),
            self.to.trim().to_ascii_lowercase()
        );
        if let Some(piece) = &self.promotion {
            uci.push_str(&piece.trim().to_ascii_lowercase());
        }
        uci
    }
}

// ---------------------------------------------------------------------------
// ChessGame
// ---------------------------------------------------------------------------

/// A chess position plus the history needed to detect repetition.
#[derive(Debug, Clone)]
pub struct ChessGame {
    position: Chess,
    /// Occurrences per repetition key (the first four FEN fields).
    repetitions: HashMap<String, u8>,
}

impl ChessGame {
    fn starting_at(position: Chess) -> Self {
        let mut game = Self {
            position,
            repetitions: HashMap::new(),
        };
        game.record();
        game
    }

    /// The current shakmaty position.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// The current position as FEN.
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Counts the current position and returns how often it has occurred.
    fn record(&mut self) -> u8 {
        let key = repetition_key(&self.fen());
        let count = self.repetitions.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }
}

/// Piece placement, side to move, castling rights, en passant square.
fn repetition_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::First,
        Color::Black => Side::Second,
    }
}

// ---------------------------------------------------------------------------
// ChessRules
// ---------------------------------------------------------------------------

/// Standard chess.
#[derive(Debug, Clone)]
pub struct ChessRules {
    start: Chess,
}

impl ChessRules {
    /// Chess from the standard starting position.
    pub fn new() -> Self {
        Self {
            start: Chess::default(),
        }
    }

    /// Chess from a custom starting position, e.g. for endgame drills.
    ///
    /// # Errors
    /// Returns the parse or validation failure if `fen` isn't a legal
    /// standard-chess position.
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let fen: Fen = fen.parse().map_err(|e| format!("invalid FEN: {e}"))?;
        let start: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| format!("invalid FEN: {e}"))?;
        Ok(Self { start })
    }

    /// Classifies the position after a move. Checks run in a fixed order:
    /// checkmate, stalemate, insufficient material, repetition, fifty moves.
    fn termination(game: &ChessGame, occurrences: u8) -> Option<TerminationReason> {
        let position = &game.position;
        if position.is_checkmate() {
            Some(TerminationReason::Checkmate)
        } else if position.is_stalemate() {
            Some(TerminationReason::Stalemate)
        } else if position.is_insufficient_material() {
            Some(TerminationReason::DrawByInsufficientMaterial)
        } else if occurrences >= REPETITION_LIMIT {
            Some(TerminationReason::DrawByRepetition)
        } else if position.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            Some(TerminationReason::OtherTerminal)
        } else {
            None
        }
    }
}

impl Default for ChessRules {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine for ChessRules {
    type Position = ChessGame;
    type Move = ChessMove;

    fn initial_position(&self) -> ChessGame {
        ChessGame::starting_at(self.start.clone())
    }

    fn side_to_move(&self, game: &ChessGame) -> Side {
        side_of(game.position.turn())
    }

    fn apply(
        &self,
        game: &ChessGame,
        mv: &ChessMove,
    ) -> Result<AppliedMove<ChessGame>, String> {
        let uci_text = mv.to_uci();
        let uci: UciMove = uci_text
            .parse()
            .map_err(|_| format!("malformed move {uci_text}"))?;
        let m = uci
            .to_move(&game.position)
            .map_err(|_| format!("{uci_text} is not legal here"))?;

        // SAN depends on the position before the move.
        let notation = San::from_move(&game.position, &m).to_string();

        let position = game
            .position
            .clone()
            .play(&m)
            .map_err(|_| format!("{uci_text} is not legal here"))?;

        let mut next = ChessGame {
            position,
            repetitions: game.repetitions.clone(),
        };
        let occurrences = next.record();
        let termination =
            Self::termination(&next, occurrences).map(|reason| Termination {
                reason,
                side_to_move: side_of(next.position.turn()),
            });

        Ok(AppliedMove {
            position: next,
            notation,
            termination,
        })
    }

    fn encode_position(&self, game: &ChessGame) -> String {
        game.fen()
    }
}
