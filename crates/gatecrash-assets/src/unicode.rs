//! ASCII → Unicode-confusable map.
//!
//! One JSON asset maps each ASCII code to the Unicode characters that
//! normalize back to it under NFC/NFD/NFKC/NFKD. Each variant carries three
//! forms because generators need all of them: the raw character (sent as
//! UTF-8 on the wire), its UTF-8 byte-escape spelling, and the
//! percent-encoded form.

use std::{collections::HashMap, sync::OnceLock};

use serde::Deserialize;

use crate::errors::AssetError;

const UNICODE_MAP_JSON: &str = include_str!("../assets/unicode_char_map.json");

/// One Unicode character that normalizes to a given ASCII character.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnicodeVariant {
    /// The character itself, e.g. `．`.
    pub raw: String,
    /// UTF-8 byte escape form, e.g. `\xEF\xBC\x8E`.
    pub bytes: String,
    /// Percent-encoded form, e.g. `%EF%BC%8E`.
    pub percent: String,
}

static MAP: OnceLock<HashMap<u8, Vec<UnicodeVariant>>> = OnceLock::new();

fn load() -> Result<HashMap<u8, Vec<UnicodeVariant>>, AssetError> {
    let raw: HashMap<String, Vec<UnicodeVariant>> = serde_json::from_str(UNICODE_MAP_JSON)
        .map_err(|source| AssetError::Malformed { name: "unicode_char_map.json", source })?;

    let mut map = HashMap::with_capacity(raw.len());
    for (key, variants) in raw {
        // Keys are decimal ASCII codes; anything else means a broken asset.
        let code: u8 = key.parse().map_err(|_| AssetError::Malformed {
            name: "unicode_char_map.json",
            source: serde_json::Error::io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non-ASCII key {key:?}"),
            )),
        })?;
        map.insert(code, variants);
    }
    Ok(map)
}

/// Unicode variants for the ASCII character `c`, empty if none are known.
///
/// The map is deserialized once on first call and read-only afterwards. A
/// malformed embedded asset yields an empty map and a logged error; the
/// asset is compiled in, so this only fires if the build itself shipped
/// broken data.
#[must_use]
pub fn variants_for(c: u8) -> &'static [UnicodeVariant] {
    let map = MAP.get_or_init(|| match load() {
        Ok(map) => map,
        Err(err) => {
            tracing::error!(error = %err, "embedded unicode map failed to load");
            HashMap::new()
        },
    });
    map.get(&c).map_or(&[], Vec::as_slice)
}
