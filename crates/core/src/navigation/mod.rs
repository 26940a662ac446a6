//! View state machine.
//!
//! Every transition is a pure function of the current location, the
//! requested target and the catalogue. Going back is derived from the
//! current location rather than replayed from a history stack, so it stays
//! consistent however the location was reached.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalogue::{Animal, Catalogue, Category};

/// Where the user is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NavigationLocation {
    #[default]
    Home,
    CategoryView(String),
    AnimalView(String, String),
}

impl NavigationLocation {
    pub fn category(id: impl Into<String>) -> Self {
        Self::CategoryView(id.into())
    }

    pub fn animal(category_id: impl Into<String>, animal_id: impl Into<String>) -> Self {
        Self::AnimalView(category_id.into(), animal_id.into())
    }

    pub fn category_id(&self) -> Option<&str> {
        match self {
            Self::Home => None,
            Self::CategoryView(category) | Self::AnimalView(category, _) => Some(category.as_str()),
        }
    }

    pub fn animal_id(&self) -> Option<&str> {
        match self {
            Self::AnimalView(_, animal) => Some(animal.as_str()),
            _ => None,
        }
    }

    /// Structural parent: animal → its category → home → home.
    pub fn parent(&self) -> Self {
        match self {
            Self::AnimalView(category, _) => Self::CategoryView(category.clone()),
            Self::CategoryView(_) | Self::Home => Self::Home,
        }
    }
}

/// Target of `openCategory`: the category if it resolves, else home.
pub fn open_category(catalogue: &Catalogue, category_id: &str) -> NavigationLocation {
    if catalogue.category(category_id).is_some() {
        NavigationLocation::category(category_id)
    } else {
        NavigationLocation::Home
    }
}

/// Target of `openAnimal`, falling back to the nearest valid ancestor.
pub fn open_animal(catalogue: &Catalogue, category_id: &str, animal_id: &str) -> NavigationLocation {
    if catalogue.is_member(category_id, animal_id) {
        NavigationLocation::animal(category_id, animal_id)
    } else {
        open_category(catalogue, category_id)
    }
}

/// Replaces an arbitrary location with the nearest valid one.
pub fn normalize(catalogue: &Catalogue, location: &NavigationLocation) -> NavigationLocation {
    match location {
        NavigationLocation::Home => NavigationLocation::Home,
        NavigationLocation::CategoryView(category) => open_category(catalogue, category),
        NavigationLocation::AnimalView(category, animal) => open_animal(catalogue, category, animal),
    }
}

/// Content to render for a location, resolved against the catalogue.
#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    Home {
        categories: &'a [Category],
    },
    Category {
        category: &'a Category,
        animals: Vec<&'a Animal>,
    },
    Animal {
        category: &'a Category,
        animals: Vec<&'a Animal>,
        animal: &'a Animal,
    },
}

/// Holds the current location and applies validating transitions.
#[derive(Debug, Clone)]
pub struct Navigator {
    catalogue: Arc<Catalogue>,
    location: NavigationLocation,
}

impl Navigator {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self {
            catalogue,
            location: NavigationLocation::Home,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn shared_catalogue(&self) -> Arc<Catalogue> {
        Arc::clone(&self.catalogue)
    }

    pub fn location(&self) -> &NavigationLocation {
        &self.location
    }

    pub fn go_home(&mut self) -> &NavigationLocation {
        self.set(NavigationLocation::Home)
    }

    pub fn open_category(&mut self, category_id: &str) -> &NavigationLocation {
        let target = open_category(&self.catalogue, category_id);
        self.set(target)
    }

    pub fn open_animal(&mut self, category_id: &str, animal_id: &str) -> &NavigationLocation {
        let target = open_animal(&self.catalogue, category_id, animal_id);
        self.set(target)
    }

    /// Moves to the structural parent of the current location.
    pub fn go_back(&mut self) -> &NavigationLocation {
        let target = self.location.parent();
        self.set(target)
    }

    /// Dispatches an arbitrary requested location through the matching
    /// validating transition.
    pub fn navigate_to(&mut self, requested: &NavigationLocation) -> &NavigationLocation {
        match requested {
            NavigationLocation::Home => self.go_home(),
            NavigationLocation::CategoryView(category) => self.open_category(category),
            NavigationLocation::AnimalView(category, animal) => self.open_animal(category, animal),
        }
    }

    /// Resolves the current location into renderable entities.
    pub fn view(&self) -> View<'_> {
        let catalogue = self.catalogue.as_ref();
        let category = self
            .location
            .category_id()
            .and_then(|id| catalogue.category(id));
        let animal = self.location.animal_id().and_then(|id| catalogue.find(id));

        match (category, animal) {
            (Some(category), Some(animal)) if animal.category == category.id => View::Animal {
                category,
                animals: catalogue.animals_in(&category.id),
                animal,
            },
            (Some(category), _) => View::Category {
                category,
                animals: catalogue.animals_in(&category.id),
            },
            _ => View::Home {
                categories: catalogue.categories(),
            },
        }
    }

    fn set(&mut self, target: NavigationLocation) -> &NavigationLocation {
        if target != self.location {
            tracing::debug!(from = ?self.location, to = ?target, "navigation");
        }
        self.location = target;
        &self.location
    }
}
