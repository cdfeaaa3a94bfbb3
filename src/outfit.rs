//! Rule-based outfit sampling.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::error::OutfitError;
use crate::garment::{Category, GarmentId, GarmentRecord, GarmentSummary, Season, Style};
use crate::rules::RuleSet;

/// Season requested for an outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonFilter {
    Known(Season),
    /// A season no garment can be tagged with. Only all-season garments
    /// match and no season rule applies.
    Unrecognized,
}

impl SeasonFilter {
    /// Whether a garment tagged `season` is kept by this filter.
    pub fn admits(self, season: Season) -> bool {
        match self {
            SeasonFilter::Known(requested) => season.matches(requested),
            SeasonFilter::Unrecognized => season == Season::All,
        }
    }

    pub fn season(self) -> Option<Season> {
        match self {
            SeasonFilter::Known(season) => Some(season),
            SeasonFilter::Unrecognized => None,
        }
    }
}

impl From<Season> for SeasonFilter {
    fn from(season: Season) -> Self {
        SeasonFilter::Known(season)
    }
}

/// Optional narrowing of the wardrobe before sampling. The style is carried
/// for callers and logging; sampling does not depend on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutfitFilters {
    pub season: Option<SeasonFilter>,
    pub style: Option<Style>,
}

/// One garment per category. Tops and bottoms are always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Outfit<'a> {
    items: BTreeMap<Category, &'a GarmentRecord>,
}

impl<'a> Outfit<'a> {
    pub fn get(&self, category: Category) -> Option<&'a GarmentRecord> {
        self.items.get(&category).copied()
    }

    pub fn top(&self) -> Option<&'a GarmentRecord> {
        self.get(Category::Tops)
    }

    pub fn bottom(&self) -> Option<&'a GarmentRecord> {
        self.get(Category::Bottoms)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.items.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &'a GarmentRecord)> + '_ {
        self.items.iter().map(|(c, g)| (*c, *g))
    }

    fn key(&self) -> (Option<GarmentId>, Option<GarmentId>) {
        (self.top().map(|g| g.id), self.bottom().map(|g| g.id))
    }

    pub fn summaries(&self) -> BTreeMap<Category, GarmentSummary> {
        self.iter().map(|(c, g)| (c, GarmentSummary::from(g))).collect()
    }
}

impl Serialize for Outfit<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.summaries().serialize(serializer)
    }
}

pub struct OutfitGenerator<'r> {
    rules: &'r RuleSet,
    filters: OutfitFilters,
}

impl<'r> OutfitGenerator<'r> {
    pub fn new(rules: &'r RuleSet, filters: OutfitFilters) -> Self {
        OutfitGenerator { rules, filters }
    }

    pub fn are_colors_compatible(&self, c1: &str, c2: &str) -> bool {
        self.rules.colors.are_colors_compatible(c1, c2)
    }

    /// Assemble one outfit from `garments`.
    pub fn generate_outfit<'a, R: Rng + ?Sized>(
        &self,
        garments: &'a [GarmentRecord],
        rng: &mut R,
    ) -> Result<Outfit<'a>, OutfitError> {
        let candidates: Vec<&GarmentRecord> = match self.filters.season {
            Some(filter) => garments.iter().filter(|g| filter.admits(g.season)).collect(),
            None => garments.iter().collect(),
        };
        if candidates.is_empty() {
            return Err(OutfitError::EmptyWardrobe);
        }

        let mut by_category: HashMap<Category, Vec<&GarmentRecord>> = HashMap::new();
        for garment in candidates {
            by_category.entry(garment.category).or_default().push(garment);
        }

        let top = *by_category
            .get(&Category::Tops)
            .and_then(|tops| tops.choose(rng))
            .ok_or(OutfitError::InsufficientItems(Category::Tops))?;
        let bottoms = by_category
            .get(&Category::Bottoms)
            .filter(|b| !b.is_empty())
            .ok_or(OutfitError::InsufficientItems(Category::Bottoms))?;
        let bottom = *self
            .pick_compatible(bottoms, &[top], rng)
            .ok_or(OutfitError::InsufficientItems(Category::Bottoms))?;

        let mut items = BTreeMap::from([(Category::Tops, top), (Category::Bottoms, bottom)]);

        let season_rule = self
            .filters
            .season
            .and_then(SeasonFilter::season)
            .and_then(|s| self.rules.seasons.get(s));
        for category in Category::OPTIONAL {
            if season_rule.is_some_and(|rule| !rule.permits(category)) {
                trace!(%category, "excluded by season");
                continue;
            }
            if let Some(chance) = season_rule.and_then(|rule| rule.chance(category)) {
                if !rng.random_bool(chance.clamp(0.0, 1.0)) {
                    trace!(%category, chance, "skipped by chance");
                    continue;
                }
            }

            if let Some(pool) = by_category.get(&category) {
                if let Some(&item) = self.pick_compatible(pool, &[top, bottom], rng) {
                    items.insert(category, item);
                }
            }
        }

        Ok(Outfit { items })
    }

    /// Pick from the items matching any anchor's color, or from the whole
    /// pool when nothing matches.
    fn pick_compatible<'p, 'a, R: Rng + ?Sized>(
        &self,
        pool: &'p [&'a GarmentRecord],
        anchors: &[&GarmentRecord],
        rng: &mut R,
    ) -> Option<&'p &'a GarmentRecord> {
        let compatible: Vec<&'p &'a GarmentRecord> = pool
            .iter()
            .filter(|item| {
                anchors
                    .iter()
                    .any(|anchor| self.are_colors_compatible(&anchor.color, &item.color))
            })
            .collect();

        if compatible.is_empty() {
            pool.choose(rng)
        } else {
            compatible.choose(rng).copied()
        }
    }

    /// Generate up to `count` outfits with distinct top/bottom pairs, making
    /// at most `3 * count` attempts.
    pub fn generate_multiple_outfits<'a, R: Rng + ?Sized>(
        &self,
        garments: &'a [GarmentRecord],
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Outfit<'a>>, OutfitError> {
        let max_attempts = count * 3;
        let mut outfits = Vec::with_capacity(count);
        let mut seen = HashSet::new();
        let mut attempts = 0;

        while outfits.len() < count && attempts < max_attempts {
            let outfit = self.generate_outfit(garments, rng)?;
            if seen.insert(outfit.key()) {
                outfits.push(outfit);
            }
            attempts += 1;
        }

        debug!(requested = count, found = outfits.len(), attempts, "generated outfits");
        Ok(outfits)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::garment::GarmentFeatures;
    use crate::rules::{SeasonRule, SeasonRules};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    pub(crate) fn garment(id: GarmentId, category: Category, color: &str, season: Season) -> GarmentRecord {
        GarmentRecord {
            id,
            name: format!("{color} {}", category.singular()),
            category,
            color: color.to_string(),
            season,
            image_path: format!("uploads/{id}.png"),
            features: GarmentFeatures::default(),
            date_added: Utc::now(),
        }
    }

    fn full_wardrobe() -> Vec<GarmentRecord> {
        vec![
            garment(1, Category::Tops, "White", Season::All),
            garment(2, Category::Tops, "Red", Season::Summer),
            garment(3, Category::Bottoms, "Blue", Season::All),
            garment(4, Category::Bottoms, "Black", Season::Winter),
            garment(5, Category::Outerwear, "Gray", Season::All),
            garment(6, Category::Footwear, "Brown", Season::All),
            garment(7, Category::Accessories, "Black", Season::All),
        ]
    }

    fn generator(filters: OutfitFilters) -> OutfitGenerator<'static> {
        OutfitGenerator::new(RuleSet::standard(), filters)
    }

    #[test]
    fn empty_wardrobe_is_reported() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = generator(OutfitFilters::default()).generate_outfit(&[], &mut rng);
        assert_eq!(err, Err(OutfitError::EmptyWardrobe));
    }

    #[test]
    fn season_filter_can_empty_the_wardrobe() {
        let wardrobe = vec![garment(1, Category::Tops, "White", Season::Summer)];
        let filters = OutfitFilters { season: Some(Season::Winter.into()), style: None };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            generator(filters).generate_outfit(&wardrobe, &mut rng),
            Err(OutfitError::EmptyWardrobe)
        );
    }

    #[test]
    fn accessories_alone_are_insufficient() {
        let wardrobe = vec![
            garment(1, Category::Accessories, "Black", Season::All),
            garment(2, Category::Accessories, "Gold", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            generator(OutfitFilters::default()).generate_outfit(&wardrobe, &mut rng),
            Err(OutfitError::InsufficientItems(Category::Tops))
        );
    }

    #[test]
    fn missing_bottoms_are_insufficient() {
        let wardrobe = vec![garment(1, Category::Tops, "Black", Season::All)];
        let mut rng = StdRng::seed_from_u64(2);
        let err = generator(OutfitFilters::default())
            .generate_outfit(&wardrobe, &mut rng)
            .unwrap_err();
        assert_eq!(err, OutfitError::InsufficientItems(Category::Bottoms));
        assert_eq!(
            err.to_string(),
            "You need at least one bottoms item that matches your filters for an outfit"
        );
    }

    #[test]
    fn outfit_respects_season_filter() {
        let wardrobe = full_wardrobe();
        let filters = OutfitFilters { season: Some(Season::Winter.into()), style: None };
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let outfit = generator(filters).generate_outfit(&wardrobe, &mut rng).unwrap();
            assert!(outfit.iter().all(|(_, g)| g.season.matches(Season::Winter)));
            assert_eq!(outfit.top().unwrap().id, 1);
        }
    }

    #[test]
    fn bottoms_prefer_the_top_color() {
        let wardrobe = vec![
            garment(1, Category::Tops, "Yellow", Season::All),
            garment(2, Category::Bottoms, "Blue", Season::All),
            garment(3, Category::Bottoms, "Pink", Season::All),
            garment(4, Category::Bottoms, "Brown", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let outfit = generator(OutfitFilters::default())
                .generate_outfit(&wardrobe, &mut rng)
                .unwrap();
            assert_eq!(outfit.bottom().unwrap().color, "Blue");
        }
    }

    #[test]
    fn incompatible_bottoms_still_produce_an_outfit() {
        let wardrobe = vec![
            garment(1, Category::Tops, "Teal", Season::All),
            garment(2, Category::Bottoms, "Coral", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let outfit = generator(OutfitFilters::default())
            .generate_outfit(&wardrobe, &mut rng)
            .unwrap();
        assert_eq!(outfit.bottom().unwrap().id, 2);
    }

    #[test]
    fn optional_items_match_top_or_bottom() {
        let wardrobe = vec![
            garment(1, Category::Tops, "Yellow", Season::All),
            garment(2, Category::Bottoms, "Brown", Season::All),
            garment(3, Category::Footwear, "Beige", Season::All),
            garment(4, Category::Footwear, "Pink", Season::All),
            garment(5, Category::Footwear, "Purple", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..50 {
            let outfit = generator(OutfitFilters::default())
                .generate_outfit(&wardrobe, &mut rng)
                .unwrap();
            let shoes = outfit.get(Category::Footwear).unwrap();
            // Beige goes with the brown bottom, Purple with the yellow top.
            assert_ne!(shoes.color, "Pink");
        }
    }

    #[test]
    fn summer_outfits_rarely_have_outerwear() {
        let wardrobe = full_wardrobe();
        let filters = OutfitFilters { season: Some(Season::Summer.into()), style: None };
        let mut rng = StdRng::seed_from_u64(7);

        let trials = 1000;
        let without = (0..trials)
            .filter(|_| {
                !generator(filters)
                    .generate_outfit(&wardrobe, &mut rng)
                    .unwrap()
                    .contains(Category::Outerwear)
            })
            .count();
        assert!(without as f64 >= trials as f64 * 0.85, "{without} of {trials}");
    }

    #[test]
    fn summer_chance_gate_applies_when_outerwear_is_permitted() {
        let rules = RuleSet {
            seasons: SeasonRules::new(HashMap::from([(
                Season::Summer,
                SeasonRule {
                    chance: HashMap::from([(Category::Outerwear, 0.1)]),
                    ..SeasonRule::default()
                },
            )])),
            ..RuleSet::default()
        };
        let generator = OutfitGenerator::new(
            &rules,
            OutfitFilters { season: Some(Season::Summer.into()), style: None },
        );
        let wardrobe = full_wardrobe();
        let mut rng = StdRng::seed_from_u64(8);

        let trials = 2000;
        let with = (0..trials)
            .filter(|_| {
                generator
                    .generate_outfit(&wardrobe, &mut rng)
                    .unwrap()
                    .contains(Category::Outerwear)
            })
            .count();
        let rate = with as f64 / trials as f64;
        assert!((0.05..0.15).contains(&rate), "outerwear rate {rate}");
    }

    #[test]
    fn winter_always_includes_available_outerwear() {
        let wardrobe = full_wardrobe();
        let filters = OutfitFilters { season: Some(Season::Winter.into()), style: None };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let outfit = generator(filters).generate_outfit(&wardrobe, &mut rng).unwrap();
            assert!(outfit.contains(Category::Outerwear));
            assert!(outfit.contains(Category::Footwear));
            assert!(outfit.contains(Category::Accessories));
        }
    }

    #[test]
    fn style_does_not_change_sampling() {
        let wardrobe = full_wardrobe();
        let plain = OutfitFilters { season: Some(Season::Winter.into()), style: None };
        let athletic = OutfitFilters { style: Some(Style::Athletic), ..plain };

        for seed in 0..20 {
            let a = generator(plain).generate_outfit(&wardrobe, &mut StdRng::seed_from_u64(seed)).unwrap();
            let b = generator(athletic)
                .generate_outfit(&wardrobe, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(a, b);
            assert!(b.contains(Category::Outerwear));
        }
    }

    #[test]
    fn unrecognized_season_keeps_all_season_items() {
        let wardrobe = full_wardrobe();
        let filters = OutfitFilters { season: Some(SeasonFilter::Unrecognized), style: None };
        let mut rng = StdRng::seed_from_u64(15);

        for _ in 0..50 {
            let outfit = generator(filters).generate_outfit(&wardrobe, &mut rng).unwrap();
            assert!(outfit.iter().all(|(_, g)| g.season == Season::All));
            assert_eq!(outfit.top().unwrap().id, 1);
            assert_eq!(outfit.bottom().unwrap().id, 3);
            assert!(outfit.contains(Category::Outerwear));
        }
    }

    #[test]
    fn unrecognized_season_without_all_season_items_is_empty() {
        let wardrobe = vec![garment(1, Category::Tops, "White", Season::Summer)];
        let filters = OutfitFilters { season: Some(SeasonFilter::Unrecognized), style: None };
        let mut rng = StdRng::seed_from_u64(16);
        assert_eq!(
            generator(filters).generate_outfit(&wardrobe, &mut rng),
            Err(OutfitError::EmptyWardrobe)
        );
    }

    #[test]
    fn single_pair_yields_a_single_outfit() {
        let wardrobe = vec![
            garment(1, Category::Tops, "White", Season::All),
            garment(2, Category::Bottoms, "Black", Season::All),
            garment(3, Category::Accessories, "Black", Season::All),
            garment(4, Category::Accessories, "White", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let outfits = generator(OutfitFilters::default())
            .generate_multiple_outfits(&wardrobe, 3, &mut rng)
            .unwrap();
        assert_eq!(outfits.len(), 1);
    }

    #[test]
    fn multiple_outfits_have_distinct_pairs() {
        let wardrobe = vec![
            garment(1, Category::Tops, "White", Season::All),
            garment(2, Category::Tops, "Black", Season::All),
            garment(3, Category::Bottoms, "Gray", Season::All),
            garment(4, Category::Bottoms, "Blue", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(12);
        let outfits = generator(OutfitFilters::default())
            .generate_multiple_outfits(&wardrobe, 3, &mut rng)
            .unwrap();

        assert!(!outfits.is_empty() && outfits.len() <= 3);
        let pairs: HashSet<_> = outfits.iter().map(|o| o.key()).collect();
        assert_eq!(pairs.len(), outfits.len());
    }

    #[test]
    fn first_failure_short_circuits_the_batch() {
        let wardrobe = vec![garment(1, Category::Tops, "White", Season::All)];
        let mut rng = StdRng::seed_from_u64(13);
        let result = generator(OutfitFilters::default()).generate_multiple_outfits(&wardrobe, 3, &mut rng);
        assert_eq!(result, Err(OutfitError::InsufficientItems(Category::Bottoms)));
    }

    #[test]
    fn outfits_serialize_as_category_map() {
        let wardrobe = vec![
            garment(1, Category::Tops, "White", Season::All),
            garment(2, Category::Bottoms, "Black", Season::All),
        ];
        let mut rng = StdRng::seed_from_u64(14);
        let outfit = generator(OutfitFilters::default())
            .generate_outfit(&wardrobe, &mut rng)
            .unwrap();
        let json = serde_json::to_value(&outfit).unwrap();
        assert_eq!(json["tops"]["id"], 1);
        assert_eq!(json["bottoms"]["image"], "/uploads/2.png");
        assert!(json.get("outerwear").is_none());
    }
}
