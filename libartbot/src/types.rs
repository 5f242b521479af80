//! Core types for Artbot

use serde::{Deserialize, Serialize};

/// A single card in the catalog
///
/// Only `name` and `set_name` are required for a record to parse, since
/// together they form the record's identity. The remaining fields are
/// checked by the formatter, which reports a missing field as invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    pub set_name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    #[serde(default)]
    pub flavor_text: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUris {
    #[serde(default)]
    pub art_crop: Option<String>,
}

impl CatalogRecord {
    /// Identity of this record in the dedup ledger
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            name: &self.name,
            set: &self.set_name,
        }
    }

    /// URL of the cropped card art, if the catalog carries one
    pub fn art_url(&self) -> Option<&str> {
        self.image_uris
            .as_ref()
            .and_then(|uris| uris.art_crop.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}

impl std::fmt::Display for CatalogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.set_name)
    }
}

/// The `(name, set)` identity shared by a catalog record and its ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey<'a> {
    pub name: &'a str,
    pub set: &'a str,
}

impl std::fmt::Display for RecordKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.set)
    }
}

/// Caption and alt text derived from a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub text: String,
    pub alt_text: String,
}

impl PostContent {
    /// Length of the caption as the platform counts it
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Supported image MIME types for attachments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse MIME type from a MIME string (e.g., "image/jpeg; charset=binary")
    pub fn from_mime_str(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from the leading bytes of the image
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    /// Get the MIME type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw image bytes tagged with their format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub mime_type: ImageMimeType,
}

impl Image {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Outcome of one invocation, suitable for logs and CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationReport {
    pub name: String,
    pub set: String,
    /// AT URI of the created post; `None` for dry runs
    pub post_uri: Option<String>,
    pub resamples: usize,
    /// The accepted record was already in the ledger
    pub duplicate: bool,
    /// The ledger write for this record failed
    pub ledger_degraded: bool,
    pub text: String,
    pub completed_at: i64,
}
