//! Bulls and cows scoring.

use serde::{Deserialize, Serialize};

use crate::CODE_LEN;

/// Feedback for one guess.
///
/// `bulls` counts positions where guess and secret agree; `cows` counts
/// the remaining guess symbols that appear somewhere in the remaining
/// secret symbols. `bulls + cows` never exceeds [`CODE_LEN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub bulls: u8,
    pub cows: u8,
}

impl Score {
    /// Returns `true` if this score ends the game.
    pub fn is_win(&self) -> bool {
        is_winning_guess(self.bulls)
    }
}

/// Scores `guess` against `secret`.
///
/// Both must be [`CODE_LEN`] characters long; anything else scores
/// `0/0`. Cows are counted by multiset intersection of the non-bull
/// positions, so a repeated guess symbol is only credited as many times
/// as it remains in the secret.
pub fn score(guess: &str, secret: &str) -> Score {
    let guess: Vec<char> = guess.chars().collect();
    let secret: Vec<char> = secret.chars().collect();
    if guess.len() != CODE_LEN || secret.len() != CODE_LEN {
        return Score::default();
    }

    let mut bulls = 0u8;
    let mut guess_remaining = Vec::with_capacity(CODE_LEN);
    let mut secret_remaining = Vec::with_capacity(CODE_LEN);
    for (g, s) in guess.iter().zip(&secret) {
        if g == s {
            bulls += 1;
        } else {
            guess_remaining.push(*g);
            secret_remaining.push(*s);
        }
    }

    let mut cows = 0u8;
    for g in guess_remaining {
        if let Some(pos) = secret_remaining.iter().position(|s| *s == g) {
            cows += 1;
            secret_remaining.swap_remove(pos);
        }
    }

    Score { bulls, cows }
}

/// A guess wins when every position is a bull.
pub fn is_winning_guess(bulls: u8) -> bool {
    usize::from(bulls) == CODE_LEN
}
