//! Room lifecycle and match refereeing for Stakemate.
//!
//! A room is two seats, two escrowed secrets, and one match. This crate
//! owns the rooms; the server crate drives them in response to client
//! requests.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: allocates codes, seats and unseats players, tears
//!   down empty rooms
//! - [`RoomStore`]: the code → room map the registry sits on
//! - [`MatchStateMachine`]: starts matches, enforces turn order, decides
//!   winners via [`winner_from_termination`]
//! - [`RulesEngine`]: the trait a game implements; [`ChessRules`] is the
//!   one we ship
//! - [`CodeGenerator`]: where room codes come from
//! - [`RegistryConfig`]: code length and allocation retry policy

mod chess;
mod code;
mod config;
mod error;
mod machine;
mod registry;
mod room;
mod rules;
mod store;

pub use chess::{ChessGame, ChessMove, ChessRules};
pub use code::{CODE_ALPHABET, CodeGenerator, RandomCodeGenerator};
pub use config::RegistryConfig;
pub use error::RoomError;
pub use machine::{
    MatchEnd, MatchStart, MatchStateMachine, MoveOutcome,
    winner_from_termination,
};
pub use registry::RoomRegistry;
pub use room::{
    DEFAULT_DISPLAY_NAME, MAX_DISPLAY_NAME_CHARS, MAX_PLAYERS,
    MAX_SECRET_BYTES, Player, Room, RoomGuard, SharedRoom,
    normalize_display_name, validate_secret,
};
pub use rules::{AppliedMove, RulesEngine, Termination};
pub use store::RoomStore;
