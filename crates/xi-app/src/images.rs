// Player image lookup.
//
// Images are cosmetic: every failure degrades to the placeholder and is only
// logged, never surfaced as an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use xi_core::config::ImagesConfig;
use xi_core::protocol::ImageRef;

#[async_trait]
pub trait ImageLookup: Send + Sync {
    /// Find an image for a player by display name.
    async fn lookup(&self, player_name: &str) -> ImageRef;
}

/// Always answers with the placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

#[async_trait]
impl ImageLookup for NoImages {
    async fn lookup(&self, _player_name: &str) -> ImageRef {
        ImageRef::Placeholder
    }
}

// ---------------------------------------------------------------------------
// TheSportsDB
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// `null` when nothing matched.
    player: Option<Vec<SearchPlayer>>,
}

#[derive(Debug, Deserialize)]
struct SearchPlayer {
    #[serde(rename = "strThumb")]
    thumb: Option<String>,
}

/// Looks players up via TheSportsDB `searchplayers.php` and uses the first
/// hit's thumbnail.
pub struct SportsDbImages {
    http: reqwest::Client,
    base_url: String,
}

impl SportsDbImages {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_thumb(&self, player_name: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/searchplayers.php", self.base_url);
        let body: SearchResponse = self
            .http
            .get(&url)
            .query(&[("p", player_name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .player
            .and_then(|players| players.into_iter().next())
            .and_then(|p| p.thumb)
            .filter(|url| !url.trim().is_empty()))
    }
}

#[async_trait]
impl ImageLookup for SportsDbImages {
    async fn lookup(&self, player_name: &str) -> ImageRef {
        match self.fetch_thumb(player_name).await {
            Ok(Some(url)) => {
                debug!("Image for {}: {}", player_name, url);
                ImageRef::Remote(url)
            }
            Ok(None) => {
                debug!("No image found for {}", player_name);
                ImageRef::Placeholder
            }
            Err(e) => {
                warn!("Image lookup for {} failed: {}", player_name, e);
                ImageRef::Placeholder
            }
        }
    }
}

/// Pick the lookup implementation the config asks for. Falls back to
/// [`NoImages`] when lookups are disabled or the HTTP client cannot be built.
pub fn image_lookup_from_config(config: &ImagesConfig) -> Arc<dyn ImageLookup> {
    if !config.enabled {
        return Arc::new(NoImages);
    }
    match SportsDbImages::new(&config.base_url, Duration::from_secs(config.timeout_secs)) {
        Ok(images) => Arc::new(images),
        Err(e) => {
            warn!("Could not build image client, using placeholders: {}", e);
            Arc::new(NoImages)
        }
    }
}
