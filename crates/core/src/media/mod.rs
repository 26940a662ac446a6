//! Image candidate chains.
//!
//! [`MediaResolver`] decides which URLs an image slot should try and in what
//! order; [`ImageResolution`] tracks one slot while the rendering layer feeds
//! it load and error callbacks.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::config::{ImageSize, MediaConfig};
use crate::router::encode_component;

/// Builds candidate sequences for image slots.
#[derive(Debug, Clone, Default)]
pub struct MediaResolver {
    config: MediaConfig,
}

impl MediaResolver {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Ordered URLs to try for an image: the mirror rewrite when the primary
    /// URL lives on the mirror host, then the primary URL itself, then a
    /// placeholder that can always be built. Duplicates are dropped so no
    /// URL is attempted twice.
    pub fn build_image_candidates(
        &self,
        primary_url: &str,
        display_name: &str,
        width: u32,
        height: u32,
    ) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(3);
        let mut push = |url: String| {
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        };

        let primary_url = primary_url.trim();
        if let Some(mirror) = self.mirror_url(primary_url, width) {
            push(mirror);
        }
        if !primary_url.is_empty() {
            push(primary_url.to_string());
        }
        push(self.placeholder_url(display_name, width, height));

        candidates
    }

    /// Same as [`build_image_candidates`](Self::build_image_candidates) for a
    /// configured slot size.
    pub fn candidates_for(&self, primary_url: &str, display_name: &str, size: ImageSize) -> Vec<String> {
        self.build_image_candidates(primary_url, display_name, size.width, size.height)
    }

    /// Starts tracking a new image slot.
    pub fn resolve_image(&self, primary_url: &str, display_name: &str, size: ImageSize) -> ImageResolution {
        ImageResolution::new(self.candidates_for(primary_url, display_name, size))
    }

    /// Rewrites a mirror-host URL to the mirror's file endpoint. Anything that
    /// does not parse, lives elsewhere or has no file name yields `None`.
    pub fn mirror_url(&self, primary_url: &str, width: u32) -> Option<String> {
        let parsed = Url::parse(primary_url).ok()?;
        if parsed.host_str()? != self.config.mirror_host {
            return None;
        }

        let raw_name = parsed.path_segments()?.next_back()?;
        if raw_name.is_empty() {
            return None;
        }
        let file_name = percent_decode_str(raw_name)
            .decode_utf8()
            .map(|name| name.into_owned())
            .unwrap_or_else(|_| raw_name.to_string());

        let mut mirror = Url::parse(&self.config.mirror_endpoint).ok()?;
        mirror
            .path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&file_name);
        mirror
            .query_pairs_mut()
            .append_pair("width", &width.max(self.config.mirror_min_width).to_string());

        Some(mirror.into())
    }

    /// Terminal candidate: a generated image that names the subject.
    pub fn placeholder_url(&self, display_name: &str, width: u32, height: u32) -> String {
        let text = match display_name.trim() {
            "" => self.config.placeholder_text.as_str(),
            name => name,
        };
        format!(
            "{}{}x{}?text={}",
            self.config.placeholder_base,
            width,
            height,
            encode_component(text)
        )
    }
}

/// What the rendering layer should do after reporting a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStep {
    /// Point the element at this URL next.
    Attempt(String),
    /// The element shows a working image; resolution is frozen.
    Resolved,
    /// Every candidate failed. The element stays on the last one.
    Exhausted,
    /// Spurious, stale or post-exhaustion callback; nothing changes.
    Ignored,
}

/// Resolution state of a single image element.
#[derive(Debug, Clone)]
pub struct ImageResolution {
    candidates: Vec<String>,
    tried_index: usize,
    resolved: Option<usize>,
    exhausted: bool,
}

impl ImageResolution {
    pub fn new(candidates: Vec<String>) -> Self {
        let exhausted = candidates.is_empty();
        Self {
            candidates,
            tried_index: 0,
            resolved: None,
            exhausted,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Index of the candidate currently assigned to the element.
    pub fn tried_index(&self) -> usize {
        self.tried_index
    }

    /// URL currently assigned to the element.
    pub fn current(&self) -> Option<&str> {
        self.candidates.get(self.tried_index).map(String::as_str)
    }

    pub fn resolved(&self) -> Option<&str> {
        self.resolved
            .and_then(|index| self.candidates.get(index))
            .map(String::as_str)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// True once the slot can no longer change.
    pub fn is_settled(&self) -> bool {
        self.resolved.is_some() || self.exhausted
    }

    /// Load callback for `url`.
    pub fn on_load(&mut self, url: &str) -> ImageStep {
        if self.is_settled() || self.current() != Some(url) {
            return ImageStep::Ignored;
        }
        self.resolved = Some(self.tried_index);
        tracing::debug!(url, index = self.tried_index, "image candidate resolved");
        ImageStep::Resolved
    }

    /// Error callback for `url`. Only an error for the current, unresolved
    /// candidate advances the chain.
    pub fn on_error(&mut self, url: &str) -> ImageStep {
        if self.is_settled() || self.current() != Some(url) {
            return ImageStep::Ignored;
        }

        let next = self.tried_index + 1;
        match self.candidates.get(next) {
            Some(candidate) => {
                tracing::debug!(failed = url, next = %candidate, "advancing image candidate");
                self.tried_index = next;
                ImageStep::Attempt(candidate.clone())
            }
            None => {
                tracing::warn!(url, "all image candidates failed");
                self.exhausted = true;
                ImageStep::Exhausted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWL: &str = "https://upload.wikimedia.org/wikipedia/commons/3/3b/Owl.jpg";

    fn resolver() -> MediaResolver {
        MediaResolver::default()
    }

    #[test]
    fn mirror_host_gets_three_candidates() {
        let candidates = resolver().build_image_candidates(OWL, "Snowy Owl", 800, 600);

        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0],
            "https://commons.wikimedia.org/wiki/Special:FilePath/Owl.jpg?width=800"
        );
        assert_eq!(candidates[1], OWL);
        assert_eq!(candidates[2], "https://placehold.co/800x600?text=Snowy%20Owl");
    }

    #[test]
    fn mirror_width_has_a_floor() {
        let mirror = resolver().mirror_url(OWL, 320).unwrap();
        assert!(mirror.ends_with("width=800"));
        let mirror = resolver().mirror_url(OWL, 1200).unwrap();
        assert!(mirror.ends_with("width=1200"));
    }

    #[test]
    fn mirror_file_name_is_not_double_encoded() {
        let url = "https://upload.wikimedia.org/wikipedia/commons/1/1a/Great%20Owl.jpg";
        let mirror = resolver().mirror_url(url, 800).unwrap();
        assert!(mirror.contains("/Special:FilePath/Great%20Owl.jpg"), "{mirror}");
    }

    #[test]
    fn other_hosts_and_bad_urls_get_no_mirror() {
        let resolver = resolver();
        assert_eq!(resolver.mirror_url("https://example.org/Owl.jpg", 800), None);
        assert_eq!(resolver.mirror_url("https://evil.upload.wikimedia.org/Owl.jpg", 800), None);
        assert_eq!(resolver.mirror_url("img/owl.jpg", 800), None);
        assert_eq!(resolver.mirror_url("https://upload.wikimedia.org/", 800), None);
        assert_eq!(resolver.mirror_url("::::", 800), None);

        let candidates = resolver.build_image_candidates("img/owl.jpg", "Owl", 800, 600);
        assert_eq!(candidates, ["img/owl.jpg", "https://placehold.co/800x600?text=Owl"]);
    }

    #[test]
    fn missing_primary_leaves_placeholder_only() {
        let candidates = resolver().build_image_candidates("", "", 400, 300);
        assert_eq!(candidates, ["https://placehold.co/400x300?text=Image"]);
    }

    #[test]
    fn placeholder_encodes_reserved_characters() {
        let url = resolver().placeholder_url("Cats & Dogs/Misc", 10, 10);
        assert_eq!(url, "https://placehold.co/10x10?text=Cats%20%26%20Dogs%2FMisc");
    }

    #[test]
    fn exhausting_candidates_stops_on_placeholder() {
        let mut slot = resolver().resolve_image(OWL, "Owl", ImageSize::new(800, 600));
        let candidates = slot.candidates().to_vec();

        assert_eq!(slot.on_error(&candidates[0]), ImageStep::Attempt(candidates[1].clone()));
        assert_eq!(slot.on_error(&candidates[1]), ImageStep::Attempt(candidates[2].clone()));
        assert_eq!(slot.on_error(&candidates[2]), ImageStep::Exhausted);

        assert!(slot.is_exhausted());
        assert_eq!(slot.current(), Some(candidates[2].as_str()));
        assert_eq!(slot.resolved(), None);

        assert_eq!(slot.on_error(&candidates[2]), ImageStep::Ignored);
        assert_eq!(slot.tried_index(), 2);
    }

    #[test]
    fn failure_after_success_is_dropped() {
        let mut slot = resolver().resolve_image(OWL, "Owl", ImageSize::new(800, 600));
        let first = slot.current().unwrap().to_string();

        assert_eq!(slot.on_load(&first), ImageStep::Resolved);
        assert_eq!(slot.on_error(&first), ImageStep::Ignored);
        assert_eq!(slot.resolved(), Some(first.as_str()));
        assert_eq!(slot.tried_index(), 0);
    }

    #[test]
    fn stale_callbacks_are_ignored() {
        let mut slot = resolver().resolve_image(OWL, "Owl", ImageSize::new(800, 600));
        let candidates = slot.candidates().to_vec();

        slot.on_error(&candidates[0]);
        assert_eq!(slot.on_error(&candidates[0]), ImageStep::Ignored);
        assert_eq!(slot.on_load(&candidates[0]), ImageStep::Ignored);
        assert_eq!(slot.current(), Some(candidates[1].as_str()));
        assert_eq!(slot.on_load(&candidates[1]), ImageStep::Resolved);
    }
}
