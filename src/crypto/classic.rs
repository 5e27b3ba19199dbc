//! Caesar and Vigenère transforms for the classroom demo endpoints.
//! These are NOT cryptographically secure and must never protect real
//! patient data; they exist so students can compare historical ciphers with
//! the modern primitives in the sibling modules. Both operate on uppercased
//! ASCII letters and pass everything else through unchanged.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassicCipherError {
    #[error("vigenere key contains no letters")]
    KeyWithoutLetters,
}

/// Shifts letters circularly within A–Z after upper-casing. Decryption is
/// the same call with the negated shift; any shift value is normalized
/// modulo 26.
pub fn caesar(text: &str, shift: i32) -> String {
    let shift = shift.rem_euclid(26) as u8;
    text.chars()
        .map(|c| {
            let up = c.to_ascii_uppercase();
            if up.is_ascii_uppercase() {
                ((up as u8 - b'A' + shift) % 26 + b'A') as char
            } else {
                up
            }
        })
        .collect()
}

/// Repeating-key Vigenère over A–Z. Non-alphabetic characters pass through
/// without advancing the key index, so "ATTACK AT DAWN" and "ATTACKATDAWN"
/// encrypt their letters identically.
pub fn vigenere(text: &str, key: &str, decrypt: bool) -> Result<String, ClassicCipherError> {
    let key_shifts: Vec<i32> = key
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| i32::from(c.to_ascii_uppercase() as u8 - b'A'))
        .collect();
    if key_shifts.is_empty() {
        return Err(ClassicCipherError::KeyWithoutLetters);
    }

    let mut key_index = 0usize;
    let result = text
        .chars()
        .map(|c| {
            let up = c.to_ascii_uppercase();
            if up.is_ascii_uppercase() {
                let mut shift = key_shifts[key_index % key_shifts.len()];
                if decrypt {
                    shift = -shift;
                }
                key_index += 1;
                ((i32::from(up as u8 - b'A') + shift).rem_euclid(26) as u8 + b'A') as char
            } else {
                up
            }
        })
        .collect();
    Ok(result)
}
