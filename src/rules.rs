//! Static compatibility tables consulted by the outfit generator.
//!
//! The tables are plain data: [`RuleSet::default`] carries the built-in
//! rules, [`RuleSet::from_json_file`] replaces them at start-up, and the
//! generator only ever borrows them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::garment::{Category, Season};

/// Which colors look good next to each other. Listings need not be
/// symmetric; lookups check both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorCompatibility(HashMap<String, Vec<String>>);

impl ColorCompatibility {
    pub fn new(table: HashMap<String, Vec<String>>) -> Self {
        ColorCompatibility(table)
    }

    fn lists(&self, color: &str, other: &str) -> bool {
        self.0
            .get(color)
            .is_some_and(|compatible| compatible.iter().any(|c| c == other))
    }

    /// Identical colors always match; unknown colors match nothing else.
    pub fn are_colors_compatible(&self, c1: &str, c2: &str) -> bool {
        c1 == c2 || self.lists(c1, c2) || self.lists(c2, c1)
    }

    pub fn contains(&self, color: &str) -> bool {
        self.0.contains_key(color)
    }
}

impl Default for ColorCompatibility {
    fn default() -> Self {
        let table: [(&str, &[&str]); 12] = [
            ("Black", &["White", "Gray", "Red", "Blue", "Green", "Purple", "Pink", "Yellow", "Orange"]),
            ("White", &["Black", "Gray", "Blue", "Red", "Purple", "Pink", "Green", "Brown"]),
            ("Gray", &["Black", "White", "Blue", "Red", "Purple", "Pink"]),
            ("Blue", &["White", "Gray", "Black", "Beige", "Brown", "Green", "Purple"]),
            ("Red", &["Black", "White", "Gray", "Beige", "Brown"]),
            ("Green", &["Black", "White", "Beige", "Brown", "Blue", "Gray"]),
            ("Purple", &["White", "Gray", "Black", "Pink", "Blue"]),
            ("Pink", &["White", "Gray", "Black", "Purple", "Blue"]),
            ("Yellow", &["Black", "Blue", "Purple", "Gray"]),
            ("Orange", &["Black", "Blue", "White", "Gray"]),
            ("Brown", &["White", "Blue", "Green", "Beige", "Gray"]),
            ("Beige", &["Brown", "Blue", "Green", "Red", "Black"]),
        ];
        ColorCompatibility(
            table
                .into_iter()
                .map(|(color, list)| {
                    (color.to_string(), list.iter().map(|c| c.to_string()).collect())
                })
                .collect(),
        )
    }
}

/// Category policy for one season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonRule {
    /// When set, only these categories may appear.
    pub include: Option<Vec<Category>>,
    pub exclude: Vec<Category>,
    pub required: Vec<Category>,
    pub recommended: Vec<Category>,
    pub optional: Vec<Category>,
    /// Probability that a category which passed the lists is filled at all.
    pub chance: HashMap<Category, f64>,
}

impl SeasonRule {
    /// Whether the include/exclude lists let `category` into an outfit.
    pub fn permits(&self, category: Category) -> bool {
        if self.exclude.contains(&category) {
            return false;
        }
        self.include
            .as_ref()
            .is_none_or(|include| include.contains(&category))
    }

    pub fn chance(&self, category: Category) -> Option<f64> {
        self.chance.get(&category).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonRules(HashMap<Season, SeasonRule>);

impl SeasonRules {
    pub fn new(rules: HashMap<Season, SeasonRule>) -> Self {
        SeasonRules(rules)
    }

    pub fn get(&self, season: Season) -> Option<&SeasonRule> {
        self.0.get(&season)
    }
}

impl Default for SeasonRules {
    fn default() -> Self {
        use Category::*;

        let everything = vec![Tops, Bottoms, Outerwear, Footwear, Accessories];
        let no_outerwear = vec![Tops, Bottoms, Footwear, Accessories];

        let rules = [
            (
                Season::Summer,
                SeasonRule {
                    include: Some(no_outerwear.clone()),
                    exclude: vec![Outerwear],
                    chance: HashMap::from([(Outerwear, 0.1)]),
                    ..SeasonRule::default()
                },
            ),
            (
                Season::Winter,
                SeasonRule {
                    include: Some(everything.clone()),
                    required: vec![Outerwear],
                    ..SeasonRule::default()
                },
            ),
            (
                Season::Spring,
                SeasonRule {
                    include: Some(no_outerwear),
                    optional: vec![Outerwear],
                    chance: HashMap::from([(Outerwear, 0.4)]),
                    ..SeasonRule::default()
                },
            ),
            (
                Season::Fall,
                SeasonRule {
                    include: Some(everything),
                    recommended: vec![Outerwear],
                    ..SeasonRule::default()
                },
            ),
        ];
        SeasonRules(rules.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub colors: ColorCompatibility,
    pub seasons: SeasonRules,
}

static STANDARD: LazyLock<RuleSet> = LazyLock::new(RuleSet::default);

impl RuleSet {
    /// The built-in tables, built once per process.
    pub fn standard() -> &'static RuleSet {
        &STANDARD
    }

    /// Load tables from a JSON file; sections missing from the file keep the
    /// built-in values.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<RuleSet> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_are_compatible() {
        let colors = ColorCompatibility::default();
        assert!(colors.are_colors_compatible("Black", "White"));
        assert!(colors.are_colors_compatible("White", "Black"));
    }

    #[test]
    fn unknown_colors_only_match_themselves() {
        let colors = ColorCompatibility::default();
        assert!(!colors.are_colors_compatible("X", "Y"));
        assert!(!colors.are_colors_compatible("Black", "Navy Blue"));
        assert!(colors.are_colors_compatible("Navy Blue", "Navy Blue"));
    }

    #[test]
    fn compatibility_checks_both_directions() {
        // Yellow lists Purple, Purple does not list Yellow.
        let colors = ColorCompatibility::default();
        assert!(colors.are_colors_compatible("Purple", "Yellow"));
        assert!(colors.are_colors_compatible("Yellow", "Purple"));

        let one_way = ColorCompatibility::new(HashMap::from([(
            "Teal".to_string(),
            vec!["Coral".to_string()],
        )]));
        assert!(one_way.are_colors_compatible("Coral", "Teal"));
        assert!(!one_way.are_colors_compatible("Coral", "Black"));
    }

    #[test]
    fn default_season_rules_gate_outerwear() {
        let seasons = SeasonRules::default();
        assert!(!seasons.get(Season::Summer).unwrap().permits(Category::Outerwear));
        assert!(!seasons.get(Season::Spring).unwrap().permits(Category::Outerwear));
        assert!(seasons.get(Season::Winter).unwrap().permits(Category::Outerwear));
        assert!(seasons.get(Season::Fall).unwrap().permits(Category::Footwear));
        assert_eq!(seasons.get(Season::Summer).unwrap().chance(Category::Outerwear), Some(0.1));
        assert!(seasons.get(Season::All).is_none());
    }

    #[test]
    fn partial_rule_files_keep_builtin_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"colors": {"Navy": ["Tan"]}}"#).unwrap();

        let rules = RuleSet::from_json_file(&path).unwrap();
        assert!(rules.colors.are_colors_compatible("Tan", "Navy"));
        assert!(!rules.colors.contains("Black"));
        assert_eq!(rules.seasons, SeasonRules::default());
    }

    #[test]
    fn season_rules_read_from_json() {
        let json = r#"{"summer": {"include": ["tops", "bottoms", "outerwear"], "chance": {"outerwear": 0.5}}}"#;
        let seasons: SeasonRules = serde_json::from_str(json).unwrap();
        let summer = seasons.get(Season::Summer).unwrap();
        assert!(summer.permits(Category::Outerwear));
        assert!(!summer.permits(Category::Footwear));
        assert_eq!(summer.chance(Category::Outerwear), Some(0.5));
    }
}
