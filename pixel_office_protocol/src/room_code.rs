// Room codes.
//
// Six characters from an alphabet without the visually confusable 0/O and
// 1/I, so a code read aloud or copied from a screenshot survives. Parsing
// trims whitespace and upper-cases first; everything else is rejected.
// Deserialization goes through `parse`, so a `RoomCode` inside a message is
// always valid.
//
// Uniqueness is only meaningful among live rooms, which the caller knows
// about; `generate_unique` takes that knowledge as a predicate.

use std::fmt;
use std::str::FromStr;

use pixel_office_prng::OfficeRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROOM_CODE_LEN: usize = 6;
pub const ROOM_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code must be {expected} characters, got {found}")]
    Length { expected: usize, found: usize },

    #[error("invalid character {ch:?} at position {index} in room code")]
    InvalidChar { ch: char, index: usize },
}

impl RoomCode {
    pub fn generate(rng: &mut OfficeRng) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.index(ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Draw codes until `is_taken` rejects none. With 32^6 codes and a
    /// handful of live rooms this almost always takes one draw.
    pub fn generate_unique(rng: &mut OfficeRng, is_taken: impl Fn(&RoomCode) -> bool) -> Self {
        loop {
            let code = Self::generate(rng);
            if !is_taken(&code) {
                return code;
            }
        }
    }

    pub fn parse(value: &str) -> Result<Self, RoomCodeError> {
        let normalized = value.trim().to_ascii_uppercase();
        let found = normalized.chars().count();
        if found != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length {
                expected: ROOM_CODE_LEN,
                found,
            });
        }
        for (index, ch) in normalized.chars().enumerate() {
            if !ch.is_ascii() || !ROOM_CODE_ALPHABET.contains(&(ch as u8)) {
                return Err(RoomCodeError::InvalidChar { ch, index });
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn generated_codes_use_the_alphabet() {
        let mut rng = OfficeRng::new(5);
        for _ in 0..200 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
            assert_eq!(RoomCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn alphabet_excludes_confusables() {
        for ch in [b'0', b'O', b'1', b'I'] {
            assert!(!ROOM_CODE_ALPHABET.contains(&ch));
        }
    }

    #[test]
    fn generate_unique_skips_taken_codes() {
        let mut reference = OfficeRng::new(11);
        let first = RoomCode::generate(&mut reference);

        let mut rng = OfficeRng::new(11);
        let code = RoomCode::generate_unique(&mut rng, |c| *c == first);
        assert_ne!(code, first);

        let mut rng = OfficeRng::new(3);
        let mut live = BTreeSet::new();
        for _ in 0..50 {
            let code = RoomCode::generate_unique(&mut rng, |c| live.contains(c));
            assert!(live.insert(code));
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(RoomCode::parse(" abc234 ").unwrap().as_str(), "ABC234");
    }

    #[test]
    fn parse_rejects_bad_codes() {
        assert_eq!(
            RoomCode::parse("ABC"),
            Err(RoomCodeError::Length {
                expected: 6,
                found: 3
            })
        );
        assert_eq!(
            RoomCode::parse("ABCD0F"),
            Err(RoomCodeError::InvalidChar { ch: '0', index: 4 })
        );
        assert!(RoomCode::parse("ABCDÉF").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: RoomCode = serde_json::from_str("\"hjkmnp\"").unwrap();
        assert_eq!(ok.as_str(), "HJKMNP");
        assert!(serde_json::from_str::<RoomCode>("\"OOOOOO\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"HJKMNP\"");
    }
}
