//! RADIUS credential generation.
//!
//! Usernames and passwords are drawn from an alphabet that excludes the
//! visually ambiguous glyphs `I`, `l`, `1`, `O`, `0`. No uniqueness
//! check here; a clash surfaces as a unique-constraint violation at
//! insert time.

use rand::Rng;

/// 57 characters: A-Z without I/O, a-z without l, 2-9.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Generate a random string of `length` characters from the alphabet.
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate a RADIUS username: `usr_` plus ten random characters.
pub fn generate_username() -> String {
    format!("usr_{}", generate_random_string(10))
}

/// Generate a RADIUS password: ten random characters.
pub fn generate_password() -> String {
    generate_random_string(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_57_characters_without_ambiguous_glyphs() {
        assert_eq!(ALPHABET.len(), 57);
        for c in ['I', 'l', '1', 'O', '0'] {
            assert!(!ALPHABET.contains(&(c as u8)), "alphabet contains {}", c);
        }
    }

    #[test]
    fn random_string_has_requested_length_and_valid_characters() {
        let s = generate_random_string(64);
        assert_eq!(s.len(), 64);
        assert!(s.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn username_is_prefixed_and_ten_characters_long() {
        let username = generate_username();
        assert!(username.starts_with("usr_"));
        assert_eq!(username.len(), "usr_".len() + 10);
    }

    #[test]
    fn password_is_ten_characters_long() {
        assert_eq!(generate_password().len(), 10);
    }
}
