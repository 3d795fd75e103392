//! Image sources: local files, remote URLs and the preset gallery.
//!
//! Every source ends in the same place: a decoded [`DynamicImage`] with
//! non-zero natural dimensions. Remote fetches are cache-busted per attempt
//! and never retried.

use crate::config::Config;
use crate::error::{AppError, Result};
use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use url::Url;

/// Query parameter appended to remote URLs to defeat stale caches.
pub const CACHE_BUST_PARAM: &str = "t";

/// Built-in gallery of cryo-ET tomogram key photos.
pub const DEFAULT_GALLERY: &[&str] = &[
    "https://files.cryoetdataportal.cziscience.com/10302/01082023_BrnoKrios_Arctis_WebUI_Position_35/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/01082023_BrnoKrios_Arctis_WebUI_Position_6/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/01082023_BrnoKrios_Arctis_WebUI_Position_8/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/01112022_BrnoKrios_Arctis_p3xe_grid1_Position_19/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/01122021_BrnoKrios_arctis_lam2_pos16/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/02052022_BrnoKrios_Arctis_grid_hGIS_Position_15/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/02052022_BrnoKrios_Arctis_grid_hGIS_Position_70/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/02052022_BrnoKrios_Arctis_grid_hGIS_Position_79/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/02122021_BrnoKrios_Arctis_lam1_pos6/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/06022023_BrnoKrios_Arctis_xe_Position_108/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/06022023_BrnoKrios_Arctis_xe_Position_92/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/08042022_BrnoKrios_Arctis_grid4_Position_3/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/08042022_BrnoKrios_Arctis_grid5_gistest_Position_17/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/08042022_BrnoKrios_Arctis_grid5_gistest_Position_27/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
    "https://files.cryoetdataportal.cziscience.com/10302/09022023_BrnoKrios_Arctis_xe_grid7_Position_12/Reconstructions/VoxelSpacing7.840/Images/100/key-photo-original.png",
];

/// Where the next image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A local image file.
    File(PathBuf),
    /// A remote image.
    Url(Url),
    /// An entry of the configured gallery, by index.
    Gallery(usize),
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Url(url) => write!(f, "url {}", url),
            Self::Gallery(index) => write!(f, "gallery item {}", index + 1),
        }
    }
}

/// Loads and decodes images from any [`ImageSource`].
#[derive(Clone)]
pub struct ImageLoader {
    http: reqwest::Client,
    gallery: Vec<Url>,
}

impl ImageLoader {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            gallery: config.gallery.clone(),
        })
    }

    /// The configured gallery, in display order.
    pub fn gallery(&self) -> &[Url] {
        &self.gallery
    }

    /// Resolves a gallery index to its URL.
    pub fn gallery_url(&self, index: usize) -> Result<&Url> {
        self.gallery.get(index).ok_or_else(|| {
            AppError::load(format!(
                "Gallery has {} items, no item {}",
                self.gallery.len(),
                index + 1
            ))
        })
    }

    /// Loads and decodes the image behind `source`.
    pub async fn load(&self, source: &ImageSource) -> Result<DynamicImage> {
        info!(%source, "loading image");
        let image = match source {
            ImageSource::File(path) => load_file(path).await?,
            ImageSource::Url(url) => self.load_url(url).await?,
            ImageSource::Gallery(index) => {
                let url = self.gallery_url(*index)?.clone();
                self.load_url(&url).await?
            }
        };
        info!(width = image.width(), height = image.height(), "image decoded");
        Ok(image)
    }

    async fn load_url(&self, url: &Url) -> Result<DynamicImage> {
        let target = cache_bust(url, unix_millis());
        let response = self
            .http
            .get(target)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(format!(
                "Failed to load image from URL ({})",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::network(format!("Failed to read {}: {}", url, e)))?;
        decode_image(&bytes)
    }
}

async fn load_file(path: &Path) -> Result<DynamicImage> {
    let bytes = tokio::fs::read(path).await?;
    decode_image(&bytes)
}

/// Decodes image bytes, rejecting zero-sized images.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AppError::load(format!("Unsupported or corrupt image: {}", e)))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(AppError::DegenerateImage {
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(image)
}

/// Appends `t=<stamp>` to `url`, keeping any existing query.
pub fn cache_bust(url: &Url, stamp: u128) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &stamp.to_string());
    busted
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
