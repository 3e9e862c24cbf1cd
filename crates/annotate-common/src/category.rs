/// Error categories a summary span can be labeled with, and the palette that maps
/// each category to its highlight color.
///
/// Colors are resolved at render time from a `Palette`; labels only ever store the
/// category.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    #[serde(rename = "Incorrect Definitions")]
    IncorrectDefinitions,
    #[serde(rename = "Incorrect Synonyms")]
    IncorrectSynonyms,
    #[serde(rename = "Incorrect Background")]
    IncorrectBackground,
    #[serde(rename = "Entity errors")]
    EntityErrors,
    #[serde(rename = "Contradiction")]
    Contradiction,
    #[serde(rename = "Omission")]
    Omission,
    #[serde(rename = "Jumping to Conclusions")]
    JumpingToConclusions,
    #[serde(rename = "Misinterpretation")]
    Misinterpretation,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::IncorrectDefinitions,
        Category::IncorrectSynonyms,
        Category::IncorrectBackground,
        Category::EntityErrors,
        Category::Contradiction,
        Category::Omission,
        Category::JumpingToConclusions,
        Category::Misinterpretation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::IncorrectDefinitions => "Incorrect Definitions",
            Category::IncorrectSynonyms => "Incorrect Synonyms",
            Category::IncorrectBackground => "Incorrect Background",
            Category::EntityErrors => "Entity errors",
            Category::Contradiction => "Contradiction",
            Category::Omission => "Omission",
            Category::JumpingToConclusions => "Jumping to Conclusions",
            Category::Misinterpretation => "Misinterpretation",
        }
    }

    fn default_color(self) -> &'static str {
        match self {
            Category::IncorrectDefinitions => "#FFB6B6",
            Category::IncorrectSynonyms => "#BAFFC9",
            Category::IncorrectBackground => "#BAE1FF",
            Category::EntityErrors => "#FFE4BA",
            Category::Contradiction => "#F8BAFF",
            Category::Omission => "#FFFBA1",
            Category::JumpingToConclusions => "#FFD1DC",
            Category::Misinterpretation => "#D4A5A5",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = AnnotateError;

    /// Matches display names case-insensitively, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnnotateError::UnknownCategory(wanted.to_string()))
    }
}

/// Category-to-color table handed to the renderer.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: HashMap<Category, String>,
}

impl Default for Palette {
    fn default() -> Self {
        let colors = Category::ALL
            .into_iter()
            .map(|c| (c, c.default_color().to_string()))
            .collect();
        Self { colors }
    }
}

impl Palette {
    /// Default palette with the given entries replaced. Keys are category display names.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self, AnnotateError> {
        let mut palette = Self::default();
        for (name, color) in overrides {
            let category: Category = name.parse()?;
            let color = color.trim();
            if !is_hex_color(color) {
                return Err(AnnotateError::Seed(format!(
                    "palette color for {category} must be #RRGGBB, got {color:?}"
                )));
            }
            palette.colors.insert(category, color.to_string());
        }
        Ok(palette)
    }

    pub fn color(&self, category: Category) -> &str {
        self.colors
            .get(&category)
            .map(String::as_str)
            .unwrap_or_else(|| category.default_color())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}
