use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rocket::request::FromParam;
use thiserror::Error;
use uuid::Uuid;

/// Length of the ids handed out when nothing else is configured
pub const DEFAULT_ID_LENGTH: usize = 6;
/// Length of the simple (hyphen-free) form of a UUID, the longest id we can generate
pub const MAX_GENERATED_LENGTH: usize = 32;

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,64}$").expect("paste id regex"));

#[derive(Error, Debug, PartialEq, Eq)]
#[error("`{0}` is not a valid paste id")]
pub struct IdError(pub String);

/// Identifier of a paste, also used as its file name inside the blob store.
///
/// A `PasteId` never contains path separators, dots or any other character
/// outside `[A-Za-z0-9]`, so joining it to the storage root can't escape it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PasteId(String);

impl PasteId {
    /// Generate a new id from a random (v4) UUID truncated to `length`
    /// characters. `length` is clamped to `1..=32`.
    pub fn generate(length: usize) -> PasteId {
        let length = length.clamp(1, MAX_GENERATED_LENGTH);
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(length);
        PasteId(id)
    }

    /// Validate an id using the regex `^[A-Za-z0-9]{1,64}$`
    pub fn parse(value: &str) -> Result<PasteId, IdError> {
        if is_paste_id_valid(value) {
            Ok(PasteId(value.to_string()))
        } else {
            Err(IdError(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn is_paste_id_valid(value: &str) -> bool {
    ID_REGEX.is_match(value)
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path segments that aren't ids make rocket forward the request, which lets
/// the static file server answer for things like `/index.html`.
impl<'a> FromParam<'a> for PasteId {
    type Error = IdError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        PasteId::parse(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_short_lowercase_hex() {
        let id = PasteId::generate(DEFAULT_ID_LENGTH);
        assert_eq!(id.as_str().len(), 6);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert!(is_paste_id_valid(id.as_str()));
    }

    #[test]
    fn generated_length_is_clamped() {
        assert_eq!(PasteId::generate(0).as_str().len(), 1);
        assert_eq!(PasteId::generate(100).as_str().len(), MAX_GENERATED_LENGTH);
    }

    #[test]
    fn consecutive_ids_differ() {
        let first = PasteId::generate(MAX_GENERATED_LENGTH);
        let second = PasteId::generate(MAX_GENERATED_LENGTH);
        assert_ne!(first, second);
    }

    #[test]
    fn path_like_segments_are_rejected() {
        for value in ["", "..", "../etc", "a/b", "styles.css", ".abc.partial", "a b"] {
            assert_eq!(PasteId::parse(value), Err(IdError(value.to_string())));
        }
    }

    #[test]
    fn alphanumeric_segments_are_accepted() {
        let id = PasteId::parse("doesnotexist").unwrap();
        assert_eq!(id.to_string(), "doesnotexist");
        assert!(PasteId::parse("AB12c").is_ok());
        assert!(PasteId::parse(&"a".repeat(65)).is_err());
    }
}
