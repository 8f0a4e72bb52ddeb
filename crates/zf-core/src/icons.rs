//! # Icon Registry
//!
//! Product categories carry an icon. The set of icons is closed: every key
//! the dashboard can render is a variant here, and anything else (a stale
//! document, a model suggestion) fails to parse instead of rendering a
//! blank.
//!
//! ```text
//!   "sofa" ──FromStr──► IconKey::Sofa ──glyph()──► 🛋
//!   "spaceship" ──FromStr──► Err(UnknownIcon)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

/// A renderable category icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum IconKey {
    Sofa,
    Armchair,
    Table,
    Desk,
    Bed,
    Wardrobe,
    Shelf,
    Kitchen,
    Lamp,
    Mirror,
    Rug,
    Package,
}

/// Raised when a string names no registered icon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown icon '{0}'")]
pub struct UnknownIcon(pub String);

impl IconKey {
    pub const ALL: [IconKey; 12] = [
        IconKey::Sofa,
        IconKey::Armchair,
        IconKey::Table,
        IconKey::Desk,
        IconKey::Bed,
        IconKey::Wardrobe,
        IconKey::Shelf,
        IconKey::Kitchen,
        IconKey::Lamp,
        IconKey::Mirror,
        IconKey::Rug,
        IconKey::Package,
    ];

    /// Stored key, as written in settings documents.
    pub const fn as_str(&self) -> &'static str {
        match self {
            IconKey::Sofa => "sofa",
            IconKey::Armchair => "armchair",
            IconKey::Table => "table",
            IconKey::Desk => "desk",
            IconKey::Bed => "bed",
            IconKey::Wardrobe => "wardrobe",
            IconKey::Shelf => "shelf",
            IconKey::Kitchen => "kitchen",
            IconKey::Lamp => "lamp",
            IconKey::Mirror => "mirror",
            IconKey::Rug => "rug",
            IconKey::Package => "package",
        }
    }

    /// Human label for pickers.
    pub const fn label(&self) -> &'static str {
        match self {
            IconKey::Sofa => "Sofa",
            IconKey::Armchair => "Armchair",
            IconKey::Table => "Table",
            IconKey::Desk => "Desk",
            IconKey::Bed => "Bed",
            IconKey::Wardrobe => "Wardrobe",
            IconKey::Shelf => "Shelf",
            IconKey::Kitchen => "Kitchen",
            IconKey::Lamp => "Lamp",
            IconKey::Mirror => "Mirror",
            IconKey::Rug => "Rug",
            IconKey::Package => "Other",
        }
    }

    /// Text fallback used where the vector icon set is unavailable
    /// (notifications, plain-text receipts).
    pub const fn glyph(&self) -> &'static str {
        match self {
            IconKey::Sofa => "🛋",
            IconKey::Armchair => "💺",
            IconKey::Table | IconKey::Desk => "🪑",
            IconKey::Bed => "🛏",
            IconKey::Wardrobe | IconKey::Shelf => "🗄",
            IconKey::Kitchen => "🍳",
            IconKey::Lamp => "💡",
            IconKey::Mirror => "🪞",
            IconKey::Rug => "🧶",
            IconKey::Package => "📦",
        }
    }

    /// Keys joined for prompts that ask a model to pick one.
    pub fn catalog() -> String {
        IconKey::ALL
            .iter()
            .map(IconKey::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for IconKey {
    fn default() -> Self {
        IconKey::Package
    }
}

impl fmt::Display for IconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IconKey {
    type Err = UnknownIcon;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        IconKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| UnknownIcon(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_parses_back() {
        for key in IconKey::ALL {
            assert_eq!(key.as_str().parse::<IconKey>(), Ok(key));
        }
    }

    #[test]
    fn test_parse_is_trimmed_and_case_insensitive() {
        assert_eq!(" Sofa ".parse::<IconKey>(), Ok(IconKey::Sofa));
        assert_eq!(
            "spaceship".parse::<IconKey>(),
            Err(UnknownIcon("spaceship".to_string()))
        );
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&IconKey::Wardrobe).unwrap();
        assert_eq!(json, "\"wardrobe\"");
        assert!(serde_json::from_str::<IconKey>("\"unicorn\"").is_err());
    }

    #[test]
    fn test_catalog_lists_all_keys() {
        let catalog = IconKey::catalog();
        assert!(catalog.starts_with("sofa, armchair"));
        assert_eq!(catalog.split(", ").count(), IconKey::ALL.len());
    }
}
