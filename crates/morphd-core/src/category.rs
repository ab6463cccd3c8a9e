//! Conversion categories.
//!
//! A category is the format domain a converter capability serves. Dispatch
//! maps an input file to exactly one category; each category is backed by
//! one registered capability.

use serde::{Deserialize, Serialize};

/// The format domain of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Audio,
    Image,
    Document,
    Archive,
    Presentation,
    Font,
    Ebook,
}

impl Category {
    /// Lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Audio => "audio",
            Category::Image => "image",
            Category::Document => "document",
            Category::Archive => "archive",
            Category::Presentation => "presentation",
            Category::Font => "font",
            Category::Ebook => "ebook",
        }
    }

    /// All categories, in dispatch priority order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Document,
            Category::Image,
            Category::Audio,
            Category::Archive,
            Category::Presentation,
            Category::Font,
            Category::Ebook,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audio" => Ok(Category::Audio),
            "image" => Ok(Category::Image),
            "document" => Ok(Category::Document),
            "archive" => Ok(Category::Archive),
            "presentation" => Ok(Category::Presentation),
            "font" => Ok(Category::Font),
            "ebook" => Ok(Category::Ebook),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}
