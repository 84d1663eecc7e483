// tokens.rs
use std::sync::LazyLock;

use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;

pub const SLUG_SUFFIX_LEN: usize = 4;
pub const PASSWORD_LEN: usize = 8;

pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Six-digit PIN in `100000..=999999`.
pub fn random_pin() -> i64 {
    rand::thread_rng().gen_range(100_000..1_000_000)
}

pub fn random_password() -> String {
    random_string(PASSWORD_LEN)
}

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-A-Za-z0-9]+").expect("slug pattern is valid"));

/// Collapses every run of characters outside `[-A-Za-z0-9]` into one `-`
/// and lowercases the result.
pub fn slugify(value: &str) -> String {
    SLUG_RE.replace_all(value.trim(), "-").to_lowercase()
}

pub fn space_slug(title: &str) -> String {
    slugify(&format!("{}-{}", title.trim(), random_string(SLUG_SUFFIX_LEN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_slug(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    #[test]
    fn slugify_replaces_runs_and_lowercases() {
        assert_eq!(slugify("My Event"), "my-event");
        assert_eq!(slugify("  Team   Retro!! 2024 "), "team-retro-2024");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("a-b"), "a-b");
        assert_eq!(slugify("Hi! - there"), "hi---there");
        assert_eq!(slugify("!!!-6LAU"), "--6lau");
    }

    #[test]
    fn space_slug_has_random_suffix() {
        let slug = space_slug("My Event");

        assert!(is_slug(&slug), "{slug}");
        assert!(slug.starts_with("my-event-"));
        assert_eq!(slug.len(), "my-event-".len() + SLUG_SUFFIX_LEN);
    }

    #[test]
    fn pin_and_password_shapes() {
        for _ in 0..100 {
            let pin = random_pin();
            assert!((100_000..=999_999).contains(&pin));

            let password = random_password();
            assert_eq!(password.len(), PASSWORD_LEN);
            assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
