//! Storage of uploaded [`Product`] images.
//!
//! [`Product`]: service::domain::Product

use std::{
    io,
    path::{Path, PathBuf},
};

use axum::{body::Bytes, extract::multipart::Field};
use common::DateTime;
use service::domain::product::ImagePath;
use tracerr::Traced;
use uuid::Uuid;

use crate::{config, define_error, AsError as _, Error};

/// Type of an uploaded image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageType {
    /// JPEG image.
    Jpeg,

    /// PNG image.
    Png,

    /// GIF image.
    Gif,
}

impl ImageType {
    /// Detects an [`ImageType`] by the provided MIME `content_type`.
    ///
    /// [`None`] is returned if the `content_type` is not an allowed image.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Returns the file extension of this [`ImageType`], including the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Gif => ".gif",
        }
    }
}

/// Uploaded image, not stored yet.
#[derive(Clone, Debug)]
pub struct Image {
    /// [`ImageType`] of this [`Image`].
    pub kind: ImageType,

    /// Contents of this [`Image`].
    pub bytes: Bytes,
}

/// Storage of uploaded files.
#[derive(Clone, Debug)]
pub struct Uploads {
    /// Root directory of the stored files.
    root: PathBuf,

    /// Maximum size of a single file, in bytes.
    max_size: usize,
}

impl Uploads {
    /// Creates new [`Uploads`] out of the provided [`config::Uploads`].
    #[must_use]
    pub fn new(config: &config::Uploads) -> Self {
        Self {
            root: config.directory.clone(),
            max_size: config.max_size,
        }
    }

    /// Returns the root directory of the stored files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the maximum size of a single file, in bytes.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Generates a new unique file name for an image of the provided
    /// [`ImageType`].
    #[must_use]
    pub fn file_name(kind: ImageType) -> String {
        format!(
            "{}-{}{}",
            DateTime::now().unix_timestamp_millis(),
            Uuid::new_v4().simple(),
            kind.extension(),
        )
    }

    /// Reads an [`Image`] out of the provided multipart [`Field`].
    ///
    /// # Errors
    ///
    /// If the [`Field`] is not an allowed image, exceeds the maximum size, or
    /// cannot be read.
    pub async fn read(&self, mut field: Field<'_>) -> Result<Image, Error> {
        let kind = field
            .content_type()
            .and_then(ImageType::from_content_type)
            .ok_or(UploadError::UnsupportedType)?;

        let mut bytes = Vec::new();
        while let Some(chunk) =
            field.chunk().await.map_err(|e| e.as_error())?
        {
            if bytes.len() + chunk.len() > self.max_size {
                return Err(UploadError::TooLarge.into());
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Image {
            kind,
            bytes: bytes.into(),
        })
    }

    /// Stores the provided [`Image`] and returns its [`ImagePath`].
    ///
    /// # Errors
    ///
    /// If the [`Image`] cannot be written.
    pub async fn store(&self, image: &Image) -> Result<ImagePath, Error> {
        let file_name = Self::file_name(image.kind);
        let path = ImagePath::of_file(&file_name)
            .ok_or_else(|| Error::internal(&"invalid image file name"))?;

        let full = self.root.join(AsRef::<str>::as_ref(&path));
        if let Some(dir) = full.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(tracerr::wrap!())
                .map_err(|e: Traced<io::Error>| e.into_error())?;
        }
        tokio::fs::write(&full, &image.bytes)
            .await
            .map_err(tracerr::wrap!())
            .map_err(|e: Traced<io::Error>| e.into_error())?;

        tracing::debug!(path = %path, "image stored");

        Ok(path)
    }

    /// Removes the file of the provided [`ImagePath`], if it exists.
    ///
    /// Failures are logged only.
    pub async fn remove(&self, path: &ImagePath) {
        let full = self.root.join(AsRef::<str>::as_ref(&path));
        match tokio::fs::remove_file(&full).await {
            Ok(()) => tracing::debug!(path = %path, "image removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path, "failed to remove image: {e}");
            }
        }
    }
}

define_error! {
    enum UploadError {
        #[code = "UNSUPPORTED_IMAGE_TYPE"]
        #[status = UNSUPPORTED_MEDIA_TYPE]
        #[message = "Only JPEG, PNG and GIF images are allowed"]
        UnsupportedType,

        #[code = "IMAGE_TOO_LARGE"]
        #[status = PAYLOAD_TOO_LARGE]
        #[message = "Image exceeds the maximum allowed size"]
        TooLarge,
    }
}

#[cfg(test)]
mod spec {
    use super::{ImageType, Uploads};

    #[test]
    fn allows_images_only() {
        assert_eq!(
            ImageType::from_content_type("image/jpeg"),
            Some(ImageType::Jpeg),
        );
        assert_eq!(
            ImageType::from_content_type("IMAGE/PNG"),
            Some(ImageType::Png),
        );
        assert_eq!(
            ImageType::from_content_type("image/gif; charset=binary"),
            Some(ImageType::Gif),
        );
        for denied in ["image/svg+xml", "text/html", "application/pdf", ""] {
            assert_eq!(ImageType::from_content_type(denied), None, "{denied}");
        }
    }

    #[test]
    fn generates_unique_file_names() {
        let a = Uploads::file_name(ImageType::Png);
        let b = Uploads::file_name(ImageType::Png);

        assert_ne!(a, b);
        assert!(a.ends_with(".png"));

        let (millis, rest) = a.split_once('-').unwrap();
        assert!(millis.parse::<u64>().is_ok());
        assert_eq!(rest.len(), 32 + ".png".len());
        assert!(!a.contains('/'));
    }
}
