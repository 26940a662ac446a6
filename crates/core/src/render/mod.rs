use serde::Serialize;

use crate::audio::SoundSource;
use crate::catalogue::{Animal, Catalogue, Category};
use crate::media::MediaResolver;
use crate::navigation::{NavigationLocation, Navigator, View};
use crate::router;
use crate::Result;

/// One entry of the breadcrumb trail. `link` is `None` for the last crumb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub label: String,
    pub link: Option<String>,
}

/// A grid tile: a category on the home view, an animal inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub label: String,
    pub badge: String,
    pub link: String,
    /// Image candidates, to be attempted in order.
    pub images: Vec<String>,
}

/// The opened animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub title: String,
    pub category: String,
    pub paragraphs: Vec<String>,
    pub images: Vec<String>,
    #[serde(serialize_with = "serialize_sound")]
    pub sound: SoundSource,
}

/// Everything a rendering layer needs for the current location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    pub status: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub cards: Vec<Card>,
    pub detail: Option<Detail>,
}

/// Pluggable drawing backend (flat grid, globe, text, ...).
pub trait Surface {
    fn draw(&mut self, page: &Page) -> Result<()>;
}

/// Builds the [`Page`] for the navigator's current location.
pub fn compose(navigator: &Navigator, media: &MediaResolver) -> Page {
    let catalogue = navigator.catalogue();

    match navigator.view() {
        View::Home { categories } => Page {
            title: "Categories".to_string(),
            status: String::new(),
            breadcrumbs: vec![home_crumb(false)],
            cards: categories
                .iter()
                .map(|category| category_card(catalogue, category, media))
                .collect(),
            detail: None,
        },
        View::Category { category, animals } => Page {
            title: category.name.clone(),
            status: grid_status(animals.len()),
            breadcrumbs: vec![home_crumb(true), category_crumb(category, false)],
            cards: animal_cards(category, &animals, media),
            detail: None,
        },
        View::Animal {
            category,
            animals,
            animal,
        } => Page {
            title: category.name.clone(),
            status: grid_status(animals.len()),
            breadcrumbs: vec![
                home_crumb(true),
                category_crumb(category, true),
                Breadcrumb {
                    label: animal.name.clone(),
                    link: None,
                },
            ],
            cards: animal_cards(category, &animals, media),
            detail: Some(Detail {
                title: animal.name.clone(),
                category: category.name.clone(),
                paragraphs: animal.description.clone(),
                images: media.candidates_for(&animal.image, &animal.name, media.config().detail_size),
                sound: SoundSource::for_animal(animal, catalogue),
            }),
        },
    }
}

fn grid_status(count: usize) -> String {
    if count == 0 {
        "No animals found.".to_string()
    } else {
        format!("Showing {count} animals")
    }
}

fn home_crumb(linked: bool) -> Breadcrumb {
    Breadcrumb {
        label: "Home".to_string(),
        link: linked.then(|| router::format(&NavigationLocation::Home)),
    }
}

fn category_crumb(category: &Category, linked: bool) -> Breadcrumb {
    Breadcrumb {
        label: category.name.clone(),
        link: linked.then(|| router::format(&NavigationLocation::category(category.id.as_str()))),
    }
}

fn category_card(catalogue: &Catalogue, category: &Category, media: &MediaResolver) -> Card {
    let members = catalogue.animals_in(&category.id);
    let cover = match category.image.trim() {
        "" => members.first().map(|a| a.image.as_str()).unwrap_or_default(),
        image => image,
    };

    Card {
        label: category.name.clone(),
        badge: format!("{} animals", members.len()),
        link: router::format(&NavigationLocation::category(category.id.as_str())),
        images: media.candidates_for(cover, &category.name, media.config().card_size),
    }
}

fn animal_cards(category: &Category, animals: &[&Animal], media: &MediaResolver) -> Vec<Card> {
    animals
        .iter()
        .map(|animal| Card {
            label: animal.name.clone(),
            badge: category.name.clone(),
            link: router::format(&NavigationLocation::animal(
                category.id.as_str(),
                animal.id.as_str(),
            )),
            images: media.candidates_for(&animal.image, &animal.name, media.config().card_size),
        })
        .collect()
}

fn serialize_sound<S: serde::Serializer>(sound: &SoundSource, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match sound {
        SoundSource::Recording(url) => serializer.serialize_some(url),
        SoundSource::Tone => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalogue::tests::fixture;

    fn navigator() -> Navigator {
        Navigator::new(Arc::new(fixture()))
    }

    #[test]
    fn home_lists_categories_with_counts() {
        let page = compose(&navigator(), &MediaResolver::default());

        assert_eq!(page.title, "Categories");
        assert_eq!(page.breadcrumbs, [home_crumb(false)]);
        let labels: Vec<&str> = page.cards.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Birds", "Mammals", "Reptiles"]);
        assert_eq!(page.cards[0].badge, "2 animals");
        assert_eq!(page.cards[2].link, "/category/reptiles");
        assert!(page.cards[0].images[0].starts_with("https://commons.wikimedia.org/"));
    }

    #[test]
    fn empty_category_image_uses_first_animal() {
        let page = compose(&navigator(), &MediaResolver::default());
        let mammals = &page.cards[1];
        assert_eq!(mammals.images[0], "img/lion.jpg");
        assert_eq!(mammals.images.len(), 2);
    }

    #[test]
    fn category_view_lists_animals() {
        let mut nav = navigator();
        nav.open_category("birds");
        let page = compose(&nav, &MediaResolver::default());

        assert_eq!(page.status, "Showing 2 animals");
        assert_eq!(page.cards[1].link, "/animal/birds/eagle");
        assert_eq!(page.cards[1].badge, "Birds");
        assert_eq!(page.breadcrumbs[0].link.as_deref(), Some("/"));
        assert_eq!(page.breadcrumbs[1].link, None);
        assert!(page.detail.is_none());
    }

    #[test]
    fn animal_view_carries_detail() {
        let mut nav = navigator();
        nav.open_animal("birds", "eagle");
        let page = compose(&nav, &MediaResolver::default());

        let detail = page.detail.expect("detail should be present");
        assert_eq!(detail.title, "Bald Eagle");
        assert_eq!(detail.paragraphs, ["A large raptor."]);
        assert_eq!(detail.sound, SoundSource::Recording("sounds/owl.mp3".to_string()));
        assert_eq!(
            detail.images.last().map(String::as_str),
            Some("https://placehold.co/1200x800?text=Bald%20Eagle")
        );
        assert_eq!(page.breadcrumbs.len(), 3);
        assert_eq!(page.breadcrumbs[1].link.as_deref(), Some("/category/birds"));
    }

    #[test]
    fn tone_only_detail_serializes_null_sound() {
        let mut nav = navigator();
        nav.open_animal("reptiles", "gecko");
        let page = compose(&nav, &MediaResolver::default());

        let json = serde_json::to_value(&page).unwrap();
        assert!(json["detail"]["sound"].is_null());
        assert_eq!(json["cards"][0]["label"], "Gecko");
    }
}
