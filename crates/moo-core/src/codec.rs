//! Code/guess codec: symbols to fixed-width digit strings and back.
//!
//! A secret code (or a guess) is a row of [`CODE_LEN`] symbols drawn from
//! [`SYMBOLS`]. It is stored as one decimal digit per position, the digit
//! being the symbol's index in the alphabet: `["🐮", "🌸", "🐮", "🧺"]`
//! becomes `"0305"`.
//!
//! [`encode`] and [`decode`] are permissive: an unknown symbol or a bad
//! digit silently becomes the first symbol. [`try_encode`] and
//! [`try_decode`] report the offending position instead.

use crate::CoreError;

/// Number of positions in a code.
pub const CODE_LEN: usize = 4;

/// The game alphabet, in storage order.
pub const SYMBOLS: [&str; 6] = ["🐮", "🥛", "🐄", "🌸", "🌿", "🧺"];

/// Number of distinct symbols (the radix of a stored code).
pub const ALPHABET_SIZE: usize = SYMBOLS.len();

/// Returns the alphabet index of `symbol`, or `None` if it is not a game symbol.
pub fn symbol_index(symbol: &str) -> Option<usize> {
    SYMBOLS.iter().position(|s| *s == symbol)
}

/// Encodes a row of symbols as a digit string.
///
/// Unknown symbols map to index 0. The row length is not checked.
pub fn encode<S: AsRef<str>>(symbols: &[S]) -> String {
    symbols
        .iter()
        .map(|s| symbol_index(s.as_ref()).unwrap_or(0))
        .map(digit_char)
        .collect()
}

/// Decodes a digit string into symbols.
///
/// Non-digit or out-of-range characters map to the first symbol.
pub fn decode(code: &str) -> Vec<&'static str> {
    code.chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as usize)
                .filter(|d| *d < ALPHABET_SIZE)
                .unwrap_or(0)
        })
        .map(|i| SYMBOLS[i])
        .collect()
}

/// Strict form of [`encode`]: exactly [`CODE_LEN`] known symbols.
pub fn try_encode<S: AsRef<str>>(symbols: &[S]) -> Result<String, CoreError> {
    if symbols.len() != CODE_LEN {
        return Err(CoreError::InvalidLength {
            expected: CODE_LEN,
            actual: symbols.len(),
        });
    }
    symbols
        .iter()
        .map(|s| {
            symbol_index(s.as_ref())
                .map(digit_char)
                .ok_or_else(|| CoreError::UnknownSymbol(s.as_ref().to_string()))
        })
        .collect()
}

/// Strict form of [`decode`]: rejects anything [`is_valid_code`] rejects.
pub fn try_decode(code: &str) -> Result<Vec<&'static str>, CoreError> {
    let len = code.chars().count();
    if len != CODE_LEN {
        return Err(CoreError::InvalidLength {
            expected: CODE_LEN,
            actual: len,
        });
    }
    code.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if (d as usize) < ALPHABET_SIZE => Ok(SYMBOLS[d as usize]),
            _ => Err(CoreError::InvalidDigit(c)),
        })
        .collect()
}

/// Returns `true` if `code` is exactly [`CODE_LEN`] digits, each below
/// [`ALPHABET_SIZE`].
pub fn is_valid_code(code: &str) -> bool {
    code.chars().count() == CODE_LEN
        && code
            .chars()
            .all(|c| c.to_digit(10).is_some_and(|d| (d as usize) < ALPHABET_SIZE))
}

fn digit_char(index: usize) -> char {
    // Alphabet is smaller than 10, so every index is a single digit.
    char::from(b'0' + index as u8)
}
