//! The immutable catalogue of categories and animals.
//!
//! A catalogue is loaded once from a JSON document and only read afterwards,
//! so it can be shared behind an [`Arc`](std::sync::Arc) between any number
//! of readers without coordination.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ExplorerError, Result};

/// Category id some datasets use for a synthetic "everything" filter. It never
/// has members of its own, so it is dropped from the category list.
pub const ALL_CATEGORY_ID: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub name: String,
    /// Id of the owning [`Category`]. May dangle; see [`Catalogue::animals_in`].
    pub category: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, alias = "paragraphs")]
    pub description: Vec<String>,
}

/// Record of the legacy flat dataset: a bare array of animals whose
/// `category` is a display string and whose `id` may be missing.
#[derive(Debug, Deserialize)]
struct FlatAnimal {
    #[serde(default)]
    id: Option<String>,
    name: String,
    category: String,
    image: String,
    #[serde(default)]
    sound: Option<String>,
    #[serde(default, alias = "paragraphs")]
    description: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredDataset {
    categories: Vec<Category>,
    animals: Vec<Animal>,
}

/// In-memory dataset of categories and animals, in document order.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    categories: Vec<Category>,
    animals: Vec<Animal>,
    category_index: HashMap<String, usize>,
    animal_index: HashMap<String, usize>,
}

impl Catalogue {
    /// Parses and validates a JSON dataset.
    ///
    /// Accepts either `{ "categories": [...], "animals": [...] }` or the flat
    /// legacy array of animals. Duplicate ids are rejected; animals pointing
    /// at an unknown category are kept but never listed under any category.
    pub fn load(raw_json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(raw_json)?;
        let (categories, animals) = if raw.is_array() {
            from_flat(serde_json::from_value::<Vec<FlatAnimal>>(raw)?)
        } else {
            let dataset: StructuredDataset = serde_json::from_value(raw)?;
            (dataset.categories, dataset.animals)
        };
        Self::from_parts(categories, animals)
    }

    /// Reads a dataset file and hands it to [`Catalogue::load`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalogue = Self::load(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            categories = catalogue.categories.len(),
            animals = catalogue.animals.len(),
            "catalogue loaded"
        );
        Ok(catalogue)
    }

    /// Builds a catalogue from already deserialized records.
    ///
    /// Ids must be non-empty: an empty id has no text form a location could
    /// carry.
    pub fn from_parts(categories: Vec<Category>, animals: Vec<Animal>) -> Result<Self> {
        let categories: Vec<Category> = categories
            .into_iter()
            .filter(|category| category.id != ALL_CATEGORY_ID)
            .collect();

        let mut category_index = HashMap::with_capacity(categories.len());
        for (index, category) in categories.iter().enumerate() {
            if category.id.is_empty() {
                return Err(ExplorerError::dataset(format!(
                    "category `{}` has an empty id",
                    category.name
                )));
            }
            if category_index.insert(category.id.clone(), index).is_some() {
                return Err(ExplorerError::dataset(format!(
                    "duplicate category id `{}`",
                    category.id
                )));
            }
        }

        let mut animal_index = HashMap::with_capacity(animals.len());
        for (index, animal) in animals.iter().enumerate() {
            if animal.id.is_empty() {
                return Err(ExplorerError::dataset(format!(
                    "animal `{}` has an empty id",
                    animal.name
                )));
            }
            if animal_index.insert(animal.id.clone(), index).is_some() {
                return Err(ExplorerError::dataset(format!(
                    "duplicate animal id `{}`",
                    animal.id
                )));
            }
            if !category_index.contains_key(&animal.category) {
                tracing::warn!(
                    animal = %animal.id,
                    category = %animal.category,
                    "animal references an unknown category"
                );
            }
        }

        Ok(Self {
            categories,
            animals,
            category_index,
            animal_index,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Every animal, including those with a dangling category reference.
    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.category_index
            .get(id)
            .map(|&index| &self.categories[index])
    }

    /// Display name of a category, or the raw id when it does not resolve.
    pub fn category_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.category(id)
            .map(|category| category.name.as_str())
            .unwrap_or(id)
    }

    /// Animals of a category in catalogue order. Empty for unknown ids.
    pub fn animals_in(&self, category_id: &str) -> Vec<&Animal> {
        if self.category(category_id).is_none() {
            return Vec::new();
        }
        self.animals
            .iter()
            .filter(|animal| animal.category == category_id)
            .collect()
    }

    pub fn find(&self, animal_id: &str) -> Option<&Animal> {
        self.animal_index
            .get(animal_id)
            .map(|&index| &self.animals[index])
    }

    /// True when both ids resolve and the animal belongs to the category.
    pub fn is_member(&self, category_id: &str, animal_id: &str) -> bool {
        self.category(category_id).is_some()
            && self
                .find(animal_id)
                .map(|animal| animal.category == category_id)
                .unwrap_or(false)
    }
}

fn from_flat(records: Vec<FlatAnimal>) -> (Vec<Category>, Vec<Animal>) {
    let names: BTreeSet<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let categories: Vec<Category> = names
        .into_iter()
        .map(|name| Category {
            id: name.to_string(),
            name: name.to_string(),
            image: records
                .iter()
                .find(|r| r.category == name)
                .map(|r| r.image.clone())
                .unwrap_or_default(),
        })
        .collect();

    let animals: Vec<Animal> = records
        .into_iter()
        .map(|r| Animal {
            id: r.id.unwrap_or_else(|| r.name.clone()),
            name: r.name,
            category: r.category,
            image: r.image,
            sound: r.sound,
            description: r.description,
        })
        .collect();

    (categories, animals)
}
