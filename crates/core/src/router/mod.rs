//! Mapping between [`NavigationLocation`] and its shareable text form.
//!
//! Locations are written as `/`, `/category/<id>` and
//! `/animal/<categoryId>/<animalId>`, optionally behind a leading `#`. Each
//! path segment is percent-encoded on its own so ids containing `/` or other
//! reserved characters survive the trip.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::navigation::{NavigationLocation, Navigator};

/// Characters left alone by `encodeURIComponent`; everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const CATEGORY_ROUTE: &str = "category";
const ANIMAL_ROUTE: &str = "animal";

/// Percent-encodes a single path segment or query value.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Decodes a percent-encoded segment. Invalid UTF-8 after decoding keeps the
/// raw text instead of failing.
pub fn decode_component(value: &str) -> Cow<'_, str> {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(value),
    }
}

/// Parses a location string. Anything unrecognized becomes
/// [`NavigationLocation::Home`].
pub fn parse(text: &str) -> NavigationLocation {
    let path = text.trim();
    let path = path.strip_prefix('#').unwrap_or(path);
    let Some(path) = path.strip_prefix('/') else {
        return NavigationLocation::Home;
    };
    let path = path.strip_suffix('/').unwrap_or(path);

    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        [CATEGORY_ROUTE, category] if !category.is_empty() => {
            NavigationLocation::category(decode_component(category))
        }
        [ANIMAL_ROUTE, category, animal] if !category.is_empty() && !animal.is_empty() => {
            NavigationLocation::animal(decode_component(category), decode_component(animal))
        }
        _ => NavigationLocation::Home,
    }
}

/// Formats a location. Total: every location has a text form.
pub fn format(location: &NavigationLocation) -> String {
    match location {
        NavigationLocation::Home => "/".to_string(),
        NavigationLocation::CategoryView(category) => {
            format!("/{CATEGORY_ROUTE}/{}", encode_component(category))
        }
        NavigationLocation::AnimalView(category, animal) => format!(
            "/{ANIMAL_ROUTE}/{}/{}",
            encode_component(category),
            encode_component(animal)
        ),
    }
}

/// Outcome of feeding a location string through the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChange {
    pub location: NavigationLocation,
    /// Canonical text for `location`.
    pub text: String,
    /// True when the request did not already name `location` canonically,
    /// so the external representation should be replaced with `text`.
    pub redirected: bool,
    /// True when the current location text differs from the previous one.
    pub changed: bool,
}

/// Keeps the external location text and the [`Navigator`] in step.
///
/// External changes (back/forward, typed links) go through
/// [`Router::on_location_change`], which always routes through the
/// navigator's validating transitions.
#[derive(Debug, Clone)]
pub struct Router {
    navigator: Navigator,
    current_text: String,
}

impl Router {
    pub fn new(navigator: Navigator) -> Self {
        let current_text = format(navigator.location());
        Self {
            navigator,
            current_text,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn location(&self) -> &NavigationLocation {
        self.navigator.location()
    }

    /// Canonical text of the current location.
    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    /// Handles an externally triggered location change.
    pub fn on_location_change(&mut self, text: &str) -> RouteChange {
        let requested = parse(text);
        self.navigator.navigate_to(&requested);
        self.sync(strip_hash(text.trim()))
    }

    /// Internal navigation request; returns the text to publish externally.
    pub fn navigate(&mut self, location: &NavigationLocation) -> RouteChange {
        self.navigator.navigate_to(location);
        self.sync(&format(location))
    }

    pub fn go_home(&mut self) -> RouteChange {
        self.navigator.go_home();
        self.sync("/")
    }

    pub fn go_back(&mut self) -> RouteChange {
        let requested = format(&self.navigator.location().parent());
        self.navigator.go_back();
        self.sync(&requested)
    }

    /// Publishes the navigator's location, comparing it against the text
    /// that was asked for and the text published before.
    fn sync(&mut self, requested: &str) -> RouteChange {
        let location = self.navigator.location().clone();
        let text = format(&location);
        let redirected = requested != text;
        if redirected {
            tracing::info!(requested, canonical = %text, "location normalized");
        }
        let changed = text != self.current_text;
        self.current_text = text.clone();
        RouteChange {
            location,
            text,
            redirected,
            changed,
        }
    }
}

fn strip_hash(text: &str) -> &str {
    text.strip_prefix('#').unwrap_or(text)
}
