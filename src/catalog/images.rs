//! Image URLs

use smallvec::{SmallVec, smallvec};

/// Default CDN serving product artwork.
pub const DEFAULT_CDN_URL: &str = "https://cdn2.wolvesville.com";

/// Builds candidate image URLs for catalog entries.
///
/// Every builder returns the preferred (high resolution) URL first, followed
/// by fallbacks for clients to try in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCdn {
    base_url: String,
}

impl ImageCdn {
    /// Creates a builder rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Promo artwork for bundles and base items.
    #[must_use]
    pub fn promo(&self, image: &str) -> SmallVec<[String; 2]> {
        smallvec![
            format!("{}/promos/{image}@2x.jpg", self.base_url),
            format!("{}/promos/{image}.jpg", self.base_url),
        ]
    }

    /// Avatar item artwork for daily skins.
    #[must_use]
    pub fn avatar_item(&self, image_name: &str) -> SmallVec<[String; 2]> {
        smallvec![
            format!("{}/avatarItems/{image_name}@2x.png", self.base_url),
            format!("{}/avatarItems/{image_name}.png", self.base_url),
        ]
    }

    /// One avatar item image per outfit in a skin set.
    pub fn outfit_set<'a>(
        &self,
        image_names: impl IntoIterator<Item = &'a str>,
    ) -> SmallVec<[String; 2]> {
        image_names
            .into_iter()
            .map(|name| format!("{}/avatarItems/{name}.png", self.base_url))
            .collect()
    }

    /// Calendar artwork.
    #[must_use]
    pub fn calendar(&self, image_name: &str) -> SmallVec<[String; 2]> {
        smallvec![
            format!("{}/calendars/{image_name}@2x.png", self.base_url),
            format!("{}/calendars/{image_name}.png", self.base_url),
        ]
    }
}

impl Default for ImageCdn {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_URL)
    }
}
