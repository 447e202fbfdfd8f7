//! Configuration types for inventory PDF generation.
//!
//! Every knob lives in [`GenerationConfig`], built via
//! [`GenerationConfigBuilder`]. The defaults reproduce the documents the
//! production service has always emitted: A4 portrait, 50 pt margins,
//! footer on the last page only, one fetch attempt per photo.

use crate::error::GenerateError;
use crate::labels::{DEFAULT_BRAND_NAME, DEFAULT_FOOTER_TEXT};
use crate::pipeline::canvas::PageGeometry;
use crate::pipeline::fetch::ImageFetcher;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one generation run.
///
/// # Example
/// ```rust
/// use inventory_pdf::{FooterPolicy, GenerationConfig};
///
/// let config = GenerationConfig::builder()
///     .fetch_timeout_secs(10)
///     .concurrency(4)
///     .footer_policy(FooterPolicy::EveryPage)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Page size and margins. Default: A4 portrait, 50 pt margins.
    pub geometry: PageGeometry,

    /// Which pages receive the legal footer. Default: last page only.
    pub footer_policy: FooterPolicy,

    /// Footer text; `\n` separates lines. An empty string disables the footer.
    pub footer_text: String,

    /// Drawn in the header when no `logo.png` is available.
    pub brand_name: String,

    /// Directory holding the optional `logo.png` and `no-image.png`.
    pub assets_dir: Option<PathBuf>,

    /// Date printed in the header. Default: today, local time.
    ///
    /// Pin it to make output byte-for-byte reproducible.
    pub edition_date: Option<NaiveDate>,

    /// Upper bound on a single photo fetch, in seconds. Default: 15.
    pub fetch_timeout_secs: u64,

    /// Extra attempts for a photo fetch that failed transiently. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Photos fetched in parallel. Default: 8.
    pub concurrency: usize,

    /// CSV field delimiter. Default: `,`.
    pub delimiter: u8,

    /// Public URL prefix of the output directory. Default: `/uploads`.
    pub url_prefix: String,

    /// Photo transport. Default: a reqwest client bounded by
    /// `fetch_timeout_secs`.
    pub fetcher: Option<Arc<dyn ImageFetcher>>,

    /// Optional per-record progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::a4(),
            footer_policy: FooterPolicy::default(),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            brand_name: DEFAULT_BRAND_NAME.to_string(),
            assets_dir: None,
            edition_date: None,
            fetch_timeout_secs: 15,
            max_retries: 0,
            retry_backoff_ms: 500,
            concurrency: 8,
            delimiter: b',',
            url_prefix: "/uploads".to_string(),
            fetcher: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("geometry", &self.geometry)
            .field("footer_policy", &self.footer_policy)
            .field("brand_name", &self.brand_name)
            .field("assets_dir", &self.assets_dir)
            .field("edition_date", &self.edition_date)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("concurrency", &self.concurrency)
            .field("delimiter", &(self.delimiter as char))
            .field("url_prefix", &self.url_prefix)
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn ImageFetcher>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The header date: the pinned one, or today.
    pub fn resolved_edition_date(&self) -> NaiveDate {
        self.edition_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Public URL of an artifact named `artifact_name`.
    pub fn file_url(&self, artifact_name: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), artifact_name)
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn footer_policy(mut self, policy: FooterPolicy) -> Self {
        self.config.footer_policy = policy;
        self
    }

    pub fn footer_text(mut self, text: impl Into<String>) -> Self {
        self.config.footer_text = text.into();
        self
    }

    pub fn brand_name(mut self, name: impl Into<String>) -> Self {
        self.config.brand_name = name.into();
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets_dir = Some(dir.into());
        self
    }

    pub fn edition_date(mut self, date: NaiveDate) -> Self {
        self.config.edition_date = Some(date);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(10);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.url_prefix = prefix.into();
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, GenerateError> {
        let c = &self.config;
        let g = &c.geometry;
        if !(g.width > 0.0 && g.height > 0.0) {
            return Err(GenerateError::InvalidConfig(format!(
                "page size must be positive, got {}×{}",
                g.width, g.height
            )));
        }
        if g.margin_left + g.margin_right >= g.width || g.margin_top + g.margin_bottom >= g.height {
            return Err(GenerateError::InvalidConfig(
                "margins leave no drawable area".into(),
            ));
        }
        if c.delimiter == b'"' || c.delimiter == b'\n' || c.delimiter == b'\r' {
            return Err(GenerateError::InvalidConfig(format!(
                "unusable CSV delimiter {:?}",
                c.delimiter as char
            )));
        }
        if c.concurrency == 0 {
            return Err(GenerateError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Where the legal footer is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FooterPolicy {
    /// Once, at the bottom of the final page. (default)
    #[default]
    LastPage,
    /// At the bottom of every page.
    EveryPage,
}
