use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Subdirectory of the media root where post images land.
const POST_IMAGE_DIR: &str = "posts";

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Image encodings accepted for post attachments.
const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// Upload bytes that sniffed as an allowed format and decoded cleanly.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub bytes: Bytes,
    pub format: ImageFormat,
}

impl ValidatedImage {
    fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            _ => "bmp",
        }
    }
}

/// Check that `bytes` is an image in one of the allowed encodings.
///
/// Decodes the whole image, so call it from a blocking context.
pub fn validate_image(bytes: Bytes) -> Result<ValidatedImage, &'static str> {
    let format = image::guess_format(&bytes).map_err(|_| INVALID_IMAGE)?;
    if !ALLOWED_FORMATS.contains(&format) {
        warn!("Rejected image upload in disallowed format {:?}", format);
        return Err(INVALID_IMAGE);
    }

    image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        warn!("Rejected undecodable {:?} upload: {}", format, e);
        INVALID_IMAGE
    })?;

    Ok(ValidatedImage { bytes, format })
}

/// Content-addressed store for uploaded images under a media root.
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub async fn new(root: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(root.join(POST_IMAGE_DIR))
            .await
            .with_context(|| format!("creating media directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the image and return its path relative to the media root.
    /// Identical uploads share one file.
    pub async fn store(&self, image: &ValidatedImage) -> Result<StoredImage> {
        let digest = hex::encode(Sha256::digest(&image.bytes));
        let relative = format!("{}/{}.{}", POST_IMAGE_DIR, digest, image.extension());
        let path = self.root.join(&relative);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(StoredImage {
                path: relative,
                created: false,
            });
        }

        tokio::fs::write(&path, &image.bytes)
            .await
            .with_context(|| format!("writing image {}", path.display()))?;
        info!("Stored image {} ({} bytes)", relative, image.bytes.len());

        Ok(StoredImage {
            path: relative,
            created: true,
        })
    }

    /// Remove an image whose post was never saved. A file that was already
    /// on disk before the upload may belong to another post and is kept.
    pub async fn discard(&self, image: &StoredImage) {
        if !image.created {
            return;
        }
        let path = self.root.join(&image.path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Removed unreferenced image {}", image.path),
            Err(e) => warn!("Failed to remove unreferenced image {}: {}", path.display(), e),
        }
    }
}

/// An image written by [`MediaStorage::store`].
#[derive(Debug)]
pub struct StoredImage {
    /// Path relative to the media root, as saved on the post.
    pub path: String,
    created: bool,
}

#[cfg(test)]
pub(crate) fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 30, 30]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
