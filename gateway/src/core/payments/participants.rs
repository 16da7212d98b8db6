use once_cell::sync::Lazy;
use regex::Regex;

use super::types::Friend;
use crate::core::conversation::FriendEntry;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\w+").expect("valid email pattern"));
static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("valid slug pattern"));

const DEFAULT_FRIEND_NAME: &str = "Friend";

/// Turn a spoken recipient into an email address.
///
/// Anything that already looks like an email is lowercased and kept. A name is
/// reduced to its alphanumerics and mapped to `<slug>@gmail.com`. Returns `None`
/// when nothing usable is left.
pub fn normalize_recipient(input: &str) -> Option<String> {
    let lower = input.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if EMAIL_PATTERN.is_match(&lower) {
        return Some(lower);
    }
    let slug = NON_ALNUM.replace_all(&lower, "");
    if slug.is_empty() {
        return None;
    }
    Some(format!("{slug}@gmail.com"))
}

/// Resolve every split participant to a `{name, email}` pair.
pub fn normalize_friends(entries: &[FriendEntry]) -> Vec<Friend> {
    entries
        .iter()
        .map(|entry| match entry {
            FriendEntry::Name(raw) => {
                let name = raw.trim().to_string();
                let email = normalize_recipient(&name).unwrap_or_default();
                Friend { name, email }
            }
            FriendEntry::Detailed { name, email } => {
                let name = name
                    .as_deref()
                    .or(email.as_deref())
                    .unwrap_or(DEFAULT_FRIEND_NAME)
                    .trim()
                    .to_string();
                let email = email
                    .clone()
                    .or_else(|| normalize_recipient(&name))
                    .unwrap_or_default();
                Friend { name, email }
            }
        })
        .collect()
}
