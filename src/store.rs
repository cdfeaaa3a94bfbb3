//! Persistence for garments and saved outfits.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::garment::{
    Category, GarmentId, GarmentRecord, NewGarment, NewSavedOutfit, OutfitId, SavedOutfit, Season,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Create/read/delete access to the two record types.
///
/// Deleting a garment also settles the saved outfits that reference it:
/// outfits built on it as top or bottom are deleted, optional references to
/// it are cleared.
pub trait WardrobeStore {
    fn insert_garment(&mut self, garment: NewGarment) -> StoreResult<GarmentId>;
    fn garment(&self, id: GarmentId) -> StoreResult<Option<GarmentRecord>>;
    /// All garments, newest first.
    fn list_garments(&self) -> StoreResult<Vec<GarmentRecord>>;
    fn update_image_path(&mut self, id: GarmentId, image_path: String) -> StoreResult<()>;
    fn delete_garment(&mut self, id: GarmentId) -> StoreResult<GarmentRecord>;

    fn insert_outfit(&mut self, outfit: NewSavedOutfit) -> StoreResult<OutfitId>;
    fn outfit(&self, id: OutfitId) -> StoreResult<Option<SavedOutfit>>;
    /// All saved outfits, newest first.
    fn list_outfits(&self) -> StoreResult<Vec<SavedOutfit>>;
    fn delete_outfit(&mut self, id: OutfitId) -> StoreResult<()>;

    fn list_garments_by_category(&self, category: Category) -> StoreResult<Vec<GarmentRecord>> {
        Ok(self
            .list_garments()?
            .into_iter()
            .filter(|g| g.category == category)
            .collect())
    }

    /// Garments wearable in `season`, including those tagged for all seasons.
    fn list_garments_by_season(&self, season: Season) -> StoreResult<Vec<GarmentRecord>> {
        Ok(self
            .list_garments()?
            .into_iter()
            .filter(|g| g.season.matches(season))
            .collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    next_garment_id: GarmentId,
    next_outfit_id: OutfitId,
    garments: Vec<GarmentRecord>,
    outfits: Vec<SavedOutfit>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn garment_index(&self, id: GarmentId) -> StoreResult<usize> {
        self.garments
            .iter()
            .position(|g| g.id == id)
            .ok_or(StoreError::GarmentNotFound(id))
    }

    fn require_garment(&self, id: GarmentId) -> StoreResult<()> {
        self.garment_index(id).map(|_| ())
    }
}

impl WardrobeStore for MemoryStore {
    fn insert_garment(&mut self, garment: NewGarment) -> StoreResult<GarmentId> {
        self.next_garment_id += 1;
        let id = self.next_garment_id;
        self.garments.push(GarmentRecord {
            id,
            name: garment.name,
            category: garment.category,
            color: garment.color,
            season: garment.season,
            image_path: garment.image_path,
            features: garment.features,
            date_added: Utc::now(),
        });
        Ok(id)
    }

    fn garment(&self, id: GarmentId) -> StoreResult<Option<GarmentRecord>> {
        Ok(self.garments.iter().find(|g| g.id == id).cloned())
    }

    fn list_garments(&self) -> StoreResult<Vec<GarmentRecord>> {
        let mut garments = self.garments.clone();
        garments.sort_by(|a, b| b.date_added.cmp(&a.date_added).then(b.id.cmp(&a.id)));
        Ok(garments)
    }

    fn update_image_path(&mut self, id: GarmentId, image_path: String) -> StoreResult<()> {
        let idx = self.garment_index(id)?;
        self.garments[idx].image_path = image_path;
        Ok(())
    }

    fn delete_garment(&mut self, id: GarmentId) -> StoreResult<GarmentRecord> {
        let idx = self.garment_index(id)?;
        let removed = self.garments.remove(idx);

        let before = self.outfits.len();
        self.outfits.retain(|o| o.top_id != id && o.bottom_id != id);
        let dropped = before - self.outfits.len();

        for outfit in &mut self.outfits {
            for slot in [&mut outfit.outerwear_id, &mut outfit.footwear_id, &mut outfit.accessory_id] {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
        if dropped > 0 {
            debug!(garment = id, dropped, "removed saved outfits built on deleted garment");
        }
        Ok(removed)
    }

    fn insert_outfit(&mut self, outfit: NewSavedOutfit) -> StoreResult<OutfitId> {
        for id in [Some(outfit.top_id), Some(outfit.bottom_id), outfit.outerwear_id, outfit.footwear_id, outfit.accessory_id]
            .into_iter()
            .flatten()
        {
            self.require_garment(id)?;
        }

        self.next_outfit_id += 1;
        let id = self.next_outfit_id;
        self.outfits.push(SavedOutfit {
            id,
            name: outfit.name,
            top_id: outfit.top_id,
            bottom_id: outfit.bottom_id,
            outerwear_id: outfit.outerwear_id,
            footwear_id: outfit.footwear_id,
            accessory_id: outfit.accessory_id,
            date_created: Utc::now(),
        });
        Ok(id)
    }

    fn outfit(&self, id: OutfitId) -> StoreResult<Option<SavedOutfit>> {
        Ok(self.outfits.iter().find(|o| o.id == id).cloned())
    }

    fn list_outfits(&self) -> StoreResult<Vec<SavedOutfit>> {
        let mut outfits = self.outfits.clone();
        outfits.sort_by(|a, b| b.date_created.cmp(&a.date_created).then(b.id.cmp(&a.id)));
        Ok(outfits)
    }

    fn delete_outfit(&mut self, id: OutfitId) -> StoreResult<()> {
        let idx = self
            .outfits
            .iter()
            .position(|o| o.id == id)
            .ok_or(StoreError::OutfitNotFound(id))?;
        self.outfits.remove(idx);
        Ok(())
    }
}

/// A [`MemoryStore`] mirrored to a JSON file after every change.
///
/// Each mutation is written to a sibling temp file and renamed over the
/// snapshot; when the write fails the in-memory state is rolled back.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: MemoryStore,
}

impl JsonFileStore {
    /// Open the snapshot at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            info!(path = %path.display(), "creating new wardrobe store");
            MemoryStore::default()
        };
        Ok(JsonFileStore { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn transaction<T>(
        &mut self,
        op: impl FnOnce(&mut MemoryStore) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let snapshot = self.state.clone();
        let result = op(&mut self.state).and_then(|value| self.persist().map(|()| value));
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }
}

impl WardrobeStore for JsonFileStore {
    fn insert_garment(&mut self, garment: NewGarment) -> StoreResult<GarmentId> {
        self.transaction(|s| s.insert_garment(garment))
    }

    fn garment(&self, id: GarmentId) -> StoreResult<Option<GarmentRecord>> {
        self.state.garment(id)
    }

    fn list_garments(&self) -> StoreResult<Vec<GarmentRecord>> {
        self.state.list_garments()
    }

    fn update_image_path(&mut self, id: GarmentId, image_path: String) -> StoreResult<()> {
        self.transaction(|s| s.update_image_path(id, image_path))
    }

    fn delete_garment(&mut self, id: GarmentId) -> StoreResult<GarmentRecord> {
        self.transaction(|s| s.delete_garment(id))
    }

    fn insert_outfit(&mut self, outfit: NewSavedOutfit) -> StoreResult<OutfitId> {
        self.transaction(|s| s.insert_outfit(outfit))
    }

    fn outfit(&self, id: OutfitId) -> StoreResult<Option<SavedOutfit>> {
        self.state.outfit(id)
    }

    fn list_outfits(&self) -> StoreResult<Vec<SavedOutfit>> {
        self.state.list_outfits()
    }

    fn delete_outfit(&mut self, id: OutfitId) -> StoreResult<()> {
        self.transaction(|s| s.delete_outfit(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garment::GarmentFeatures;

    fn new_garment(name: &str, category: Category, season: Season) -> NewGarment {
        NewGarment {
            name: name.to_string(),
            category,
            color: "Black".to_string(),
            season,
            image_path: format!("uploads/{name}.png"),
            features: GarmentFeatures::default(),
        }
    }

    fn outfit(name: &str, top: GarmentId, bottom: GarmentId) -> NewSavedOutfit {
        NewSavedOutfit {
            name: name.to_string(),
            top_id: top,
            bottom_id: bottom,
            outerwear_id: None,
            footwear_id: None,
            accessory_id: None,
        }
    }

    #[test]
    fn garments_list_newest_first() {
        let mut store = MemoryStore::new();
        let a = store.insert_garment(new_garment("a", Category::Tops, Season::All)).unwrap();
        let b = store.insert_garment(new_garment("b", Category::Bottoms, Season::Summer)).unwrap();

        let ids: Vec<_> = store.list_garments().unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn filters_by_category_and_season() {
        let mut store = MemoryStore::new();
        store.insert_garment(new_garment("a", Category::Tops, Season::All)).unwrap();
        store.insert_garment(new_garment("b", Category::Tops, Season::Summer)).unwrap();
        store.insert_garment(new_garment("c", Category::Bottoms, Season::Winter)).unwrap();

        assert_eq!(store.list_garments_by_category(Category::Tops).unwrap().len(), 2);
        let winter: Vec<_> = store
            .list_garments_by_season(Season::Winter)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(winter, vec!["c", "a"]);
    }

    #[test]
    fn outfits_must_reference_existing_garments() {
        let mut store = MemoryStore::new();
        let top = store.insert_garment(new_garment("a", Category::Tops, Season::All)).unwrap();
        let err = store.insert_outfit(outfit("x", top, 99)).unwrap_err();
        assert!(matches!(err, StoreError::GarmentNotFound(99)));
        assert!(store.list_outfits().unwrap().is_empty());
    }

    #[test]
    fn deleting_a_garment_settles_its_outfits() {
        let mut store = MemoryStore::new();
        let top = store.insert_garment(new_garment("top", Category::Tops, Season::All)).unwrap();
        let bottom = store.insert_garment(new_garment("bottom", Category::Bottoms, Season::All)).unwrap();
        let shoes = store.insert_garment(new_garment("shoes", Category::Footwear, Season::All)).unwrap();
        let other_top = store.insert_garment(new_garment("top2", Category::Tops, Season::All)).unwrap();

        let keep = store
            .insert_outfit(NewSavedOutfit { footwear_id: Some(shoes), ..outfit("keep", other_top, bottom) })
            .unwrap();
        let dropped = store.insert_outfit(outfit("drop", top, bottom)).unwrap();

        store.delete_garment(shoes).unwrap();
        assert_eq!(store.outfit(keep).unwrap().unwrap().footwear_id, None);

        let removed = store.delete_garment(top).unwrap();
        assert_eq!(removed.name, "top");
        assert!(store.outfit(dropped).unwrap().is_none());
        assert!(store.outfit(keep).unwrap().is_some());
    }

    #[test]
    fn missing_records_are_reported() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.delete_garment(3), Err(StoreError::GarmentNotFound(3))));
        assert!(matches!(store.delete_outfit(4), Err(StoreError::OutfitNotFound(4))));
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wardrobe.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        let top = store.insert_garment(new_garment("top", Category::Tops, Season::All)).unwrap();
        let bottom = store.insert_garment(new_garment("bottom", Category::Bottoms, Season::All)).unwrap();
        let saved = store.insert_outfit(outfit("date night", top, bottom)).unwrap();
        drop(store);

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.list_garments().unwrap().len(), 2);
        assert_eq!(store.outfit(saved).unwrap().unwrap().name, "date night");
    }

    #[test]
    fn failed_writes_roll_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the snapshot file should be makes the rename fail.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), b"x").unwrap();

        let mut store = JsonFileStore { path: path.clone(), state: MemoryStore::default() };
        assert!(store.insert_garment(new_garment("a", Category::Tops, Season::All)).is_err());
        assert!(store.list_garments().unwrap().is_empty());
    }
}
