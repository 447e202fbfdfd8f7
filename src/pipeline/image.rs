//! Photo resolution: turn a record's `Photo` field into something drawable.
//!
//! Resolution always succeeds. Whatever goes wrong (no URL, unreachable
//! host, 404, GIF instead of JPEG, corrupt body) the record still gets an
//! image slot: the bundled placeholder asset if one was loaded, otherwise a
//! drawn box captioned "Erreur Image". The failure is reported as an
//! [`ImageWarning`] next to the image instead of being raised.
//!
//! ```text
//! Photo field ──▶ extract URL ──▶ fetch ──▶ check type ──▶ decode / webp→png
//!     │ empty          │ invalid     │ error     │ unsupported   │ corrupt
//!     ▼                ▼             ▼           ▼               ▼
//!  "Pas d'image"   ──────────── placeholder asset or "Erreur Image" ──────
//! ```

use crate::config::GenerationConfig;
use crate::error::ImageWarning;
use crate::labels::{IMAGE_ERROR_CAPTION, NO_IMAGE_CAPTION, SENTINEL};
use crate::pipeline::fetch::{FetchError, FetchedImage, ImageFetcher};
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Encoding of an [`EmbeddedImage`]'s bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbedFormat {
    Jpeg,
    Png,
}

impl EmbedFormat {
    fn image_format(self) -> ImageFormat {
        match self {
            EmbedFormat::Jpeg => ImageFormat::Jpeg,
            EmbedFormat::Png => ImageFormat::Png,
        }
    }
}

/// Validated image bytes in a format the PDF writer can embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub format: EmbedFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// Decode `data` once to prove it is a readable `format` image and
    /// capture its pixel size.
    pub fn from_bytes(data: Vec<u8>, format: EmbedFormat) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory_with_format(&data, format.image_format())?;
        Ok(Self {
            format,
            width: decoded.width(),
            height: decoded.height(),
            data,
        })
    }

    /// Transcode WebP bytes to PNG.
    pub fn from_webp(data: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory_with_format(data, ImageFormat::WebP)?;
        let mut png = Vec::new();
        decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            format: EmbedFormat::Png,
            width: decoded.width(),
            height: decoded.height(),
            data: png,
        })
    }
}

/// What ends up in a record's 70×70 image slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedImage {
    /// JPEG or PNG exactly as served.
    Direct(Arc<EmbeddedImage>),
    /// Served as WebP, transcoded to PNG.
    Transcoded(Arc<EmbeddedImage>),
    /// Resolution failed; the bundled `no-image.png` stands in.
    Placeholder(Arc<EmbeddedImage>),
    /// A stroked box with a centred caption.
    PlaceholderBox { caption: &'static str },
}

impl ResolvedImage {
    pub fn outcome(&self) -> ImageOutcome {
        match self {
            ResolvedImage::Direct(_) => ImageOutcome::Fetched,
            ResolvedImage::Transcoded(_) => ImageOutcome::Transcoded,
            ResolvedImage::Placeholder(_) => ImageOutcome::PlaceholderAsset,
            ResolvedImage::PlaceholderBox { .. } => ImageOutcome::PlaceholderBox,
        }
    }
}

/// Serialisable summary of a [`ResolvedImage`], used in stats and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageOutcome {
    Fetched,
    Transcoded,
    PlaceholderAsset,
    PlaceholderBox,
}

/// Result of resolving one record's photo.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub image: ResolvedImage,
    pub warning: Option<ImageWarning>,
}

static PARENTHESIZED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((https?://[^)]+?)\)").expect("valid regex"));

/// Pull the image URL out of a `Photo` field.
///
/// `[label](https://host/a.jpg)` and `(https://host/a.jpg)` yield the
/// parenthesised URL; anything else yields the trimmed field verbatim; an
/// empty field (or the "unspecified" sentinel) yields `None`.
pub fn extract_image_url(photo: &str) -> Option<&str> {
    let trimmed = photo.trim();
    if trimmed.is_empty() || trimmed == SENTINEL {
        return None;
    }
    match PARENTHESIZED_URL.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => Some(m.as_str()),
        None => Some(trimmed),
    }
}

fn is_http_url(candidate: &str) -> bool {
    reqwest::Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptedType {
    Jpeg,
    Png,
    WebP,
}

/// Prefix match on the declared media type, ignoring case and parameters.
fn classify(content_type: Option<&str>) -> Option<AcceptedType> {
    let ct = content_type?.trim().to_ascii_lowercase();
    if ct.starts_with("image/jpeg") {
        Some(AcceptedType::Jpeg)
    } else if ct.starts_with("image/png") {
        Some(AcceptedType::Png)
    } else if ct.starts_with("image/webp") {
        Some(AcceptedType::WebP)
    } else {
        None
    }
}

/// Resolves photo fields into drawable images.
///
/// One resolver serves a whole generation run; it is cheap to share behind
/// a reference across concurrent resolutions.
pub struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    placeholder: Option<Arc<EmbeddedImage>>,
    timeout_secs: u64,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl ImageResolver {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        placeholder: Option<Arc<EmbeddedImage>>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            fetcher,
            placeholder,
            timeout_secs: config.fetch_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Resolve the photo of record number `record` (1-indexed).
    ///
    /// Never fails: errors become a fallback image plus a warning.
    pub async fn resolve(&self, record: usize, photo: Option<&str>) -> Resolution {
        let Some(url) = photo.and_then(extract_image_url) else {
            debug!("Record {}: no photo", record);
            return Resolution {
                image: ResolvedImage::PlaceholderBox {
                    caption: NO_IMAGE_CAPTION,
                },
                warning: None,
            };
        };

        match self.try_resolve(record, url).await {
            Ok(image) => Resolution {
                image,
                warning: None,
            },
            Err(warning) => {
                warn!("{}", warning);
                Resolution {
                    image: self.fallback(),
                    warning: Some(warning),
                }
            }
        }
    }

    fn fallback(&self) -> ResolvedImage {
        match &self.placeholder {
            Some(asset) => ResolvedImage::Placeholder(Arc::clone(asset)),
            None => ResolvedImage::PlaceholderBox {
                caption: IMAGE_ERROR_CAPTION,
            },
        }
    }

    async fn try_resolve(&self, record: usize, url: &str) -> Result<ResolvedImage, ImageWarning> {
        if !is_http_url(url) {
            return Err(ImageWarning::MissingUrl {
                record,
                value: url.to_string(),
            });
        }

        let fetched = self.fetch_with_retry(record, url).await?;

        let Some(kind) = classify(fetched.content_type.as_deref()) else {
            return Err(ImageWarning::UnsupportedType {
                record,
                url: url.to_string(),
                content_type: fetched.content_type,
            });
        };

        // Decoding is CPU-bound; keep it off the async workers.
        let decoded = tokio::task::spawn_blocking(move || match kind {
            AcceptedType::Jpeg => {
                EmbeddedImage::from_bytes(fetched.bytes, EmbedFormat::Jpeg).map(|i| (i, false))
            }
            AcceptedType::Png => {
                EmbeddedImage::from_bytes(fetched.bytes, EmbedFormat::Png).map(|i| (i, false))
            }
            AcceptedType::WebP => EmbeddedImage::from_webp(&fetched.bytes).map(|i| (i, true)),
        })
        .await
        .map_err(|e| ImageWarning::DecodeFailed {
            record,
            url: url.to_string(),
            detail: format!("decode task panicked: {e}"),
        })?;

        match decoded {
            Ok((image, true)) => {
                debug!("Record {}: transcoded WebP → PNG ({}x{})", record, image.width, image.height);
                Ok(ResolvedImage::Transcoded(Arc::new(image)))
            }
            Ok((image, false)) => {
                debug!("Record {}: {:?} {}x{}", record, image.format, image.width, image.height);
                Ok(ResolvedImage::Direct(Arc::new(image)))
            }
            Err(e) => Err(ImageWarning::DecodeFailed {
                record,
                url: url.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// One attempt, plus up to `max_retries` more for transient failures,
    /// with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`).
    async fn fetch_with_retry(&self, record: usize, url: &str) -> Result<FetchedImage, ImageWarning> {
        let limit = Duration::from_secs(self.timeout_secs);
        let mut attempt = 0u32;

        loop {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Record {}: retry {}/{} after {}ms",
                    record, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let result = match timeout(limit, self.fetcher.fetch(url)).await {
                Ok(r) => r,
                Err(_) => Err(FetchError::Timeout),
            };

            match result {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    debug!("Record {}: attempt {} failed: {}", record, attempt + 1, e);
                    attempt += 1;
                }
                Err(e) => return Err(self.to_warning(record, url, e, attempt + 1)),
            }
        }
    }

    fn to_warning(&self, record: usize, url: &str, e: FetchError, attempts: u32) -> ImageWarning {
        let url = url.to_string();
        match e {
            FetchError::Timeout => ImageWarning::Timeout {
                record,
                url,
                secs: self.timeout_secs,
            },
            FetchError::Status(status) => ImageWarning::HttpStatus {
                record,
                url,
                status,
            },
            FetchError::Network(detail) => ImageWarning::FetchFailed {
                record,
                url,
                attempts,
                detail,
            },
        }
    }
}
