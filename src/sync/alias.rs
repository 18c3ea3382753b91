//! Short sync codes: three uppercase letters followed by three digits.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

static ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{3}$").expect("alias regex should compile"));

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Length of every alias; link input of this length is treated as an alias.
pub const ALIAS_LEN: usize = 6;

pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut alias = String::with_capacity(ALIAS_LEN);
    for _ in 0..3 {
        alias.push(LETTERS[rng.random_range(0..LETTERS.len())] as char);
    }
    for _ in 0..3 {
        alias.push(DIGITS[rng.random_range(0..DIGITS.len())] as char);
    }
    alias
}

pub fn is_valid(alias: &str) -> bool {
    ALIAS_PATTERN.is_match(alias)
}

/// Uppercase user input so `abc123` finds `ABC123`.
pub fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}
