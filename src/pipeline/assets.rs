//! Optional static images shipped next to the deployment.
//!
//! `logo.png` replaces the brand text in the header; `no-image.png` replaces
//! the "Erreur Image" box when a photo cannot be resolved. Either may be
//! missing or unreadable: that is logged and the drawn fallback is used.

use crate::pipeline::image::{EmbedFormat, EmbeddedImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub const LOGO_FILE: &str = "logo.png";
pub const PLACEHOLDER_FILE: &str = "no-image.png";

/// Assets found for a run.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    pub logo: Option<Arc<EmbeddedImage>>,
    pub placeholder: Option<Arc<EmbeddedImage>>,
}

impl Assets {
    /// Load both assets from `dir`. No directory means no assets.
    pub async fn load(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            return Self::default();
        };
        let logo_path = dir.join(LOGO_FILE);
        let placeholder_path = dir.join(PLACEHOLDER_FILE);
        let (logo, placeholder) = tokio::join!(load_png(&logo_path), load_png(&placeholder_path));
        Self { logo, placeholder }
    }
}

async fn load_png(path: &Path) -> Option<Arc<EmbeddedImage>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Asset {} not present", path.display());
            return None;
        }
        Err(e) => {
            warn!("Asset {} unreadable: {}", path.display(), e);
            return None;
        }
    };

    let decoded = tokio::task::spawn_blocking(move || EmbeddedImage::from_bytes(bytes, EmbedFormat::Png)).await;
    match decoded {
        Ok(Ok(img)) => {
            debug!("Loaded asset {} ({}x{})", path.display(), img.width, img.height);
            Some(Arc::new(img))
        }
        Ok(Err(e)) => {
            warn!("Asset {} is not a valid PNG: {}", path.display(), e);
            None
        }
        Err(e) => {
            warn!("Asset {} decode task failed: {}", path.display(), e);
            None
        }
    }
}
