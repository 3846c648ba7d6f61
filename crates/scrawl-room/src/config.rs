//! Game configuration and the turn phase state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings for every room a server creates.
///
/// Fixed when a room is created; changing the server config later only
/// affects new rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Full rotations of the drawer role per game.
    pub total_rounds: u32,

    /// Seconds a drawer has to get the word guessed.
    pub drawing_secs: u32,

    /// Seconds a drawer has to pick a word before one is picked for them.
    pub selection_secs: u64,

    /// Seconds between a turn ending and the next drawer being chosen.
    pub intermission_secs: u64,

    /// How many words the drawer chooses from.
    pub word_choices: usize,

    /// Points per second left on the clock for a correct guess.
    pub points_per_second: u32,

    /// Replaces the built-in word list when set.
    pub words: Option<Vec<String>>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_rounds: 3,
            drawing_secs: 60,
            selection_secs: 20,
            intermission_secs: 3,
            word_choices: 3,
            points_per_second: 10,
            words: None,
        }
    }
}

impl GameConfig {
    /// Fixes values that would stall or break a game, logging each fix.
    ///
    /// - `total_rounds`, `drawing_secs`, and `word_choices` are raised to 1.
    /// - An empty custom word list falls back to the built-in one.
    pub fn validated(mut self) -> Self {
        if self.total_rounds == 0 {
            warn!("total_rounds is 0, using 1");
            self.total_rounds = 1;
        }
        if self.drawing_secs == 0 {
            warn!("drawing_secs is 0, using 1");
            self.drawing_secs = 1;
        }
        if self.word_choices == 0 {
            warn!("word_choices is 0, using 1");
            self.word_choices = 1;
        }
        if self.words.as_ref().is_some_and(|w| w.is_empty()) {
            warn!("custom word list is empty, using the built-in list");
            self.words = None;
        }
        self
    }

    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_secs)
    }

    pub fn intermission(&self) -> Duration {
        Duration::from_secs(self.intermission_secs)
    }

    /// Resolution of the drawing countdown.
    pub fn round_tick(&self) -> Duration {
        Duration::from_secs(1)
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// Where a room is in its game.
///
/// ```text
/// Lobby → Selecting → Drawing → TurnEnded → Selecting → … → GameOver
///                                                             │
///            Selecting ←──────── (start-game) ────────────────┘
/// ```
///
/// - **Lobby**: Room exists, accepting joins, no game yet.
/// - **Selecting**: The drawer is choosing a word; the selection timer runs.
/// - **Drawing**: The word is set; the round countdown runs and guesses
///   score.
/// - **TurnEnded**: The word has been revealed; the intermission timer runs
///   before the next drawer is chosen.
/// - **GameOver**: Final standings were sent. Joins are allowed again and
///   the game can be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    Selecting,
    Drawing,
    TurnEnded,
    GameOver,
}

impl GamePhase {
    /// Returns `true` while a game is running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Selecting | Self::Drawing | Self::TurnEnded)
    }

    /// Returns `true` if new players may join.
    pub fn is_joinable(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Selecting => write!(f, "Selecting"),
            Self::Drawing => write!(f, "Drawing"),
            Self::TurnEnded => write!(f, "TurnEnded"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
