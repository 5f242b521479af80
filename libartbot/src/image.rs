//! Card art retrieval

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::error::{ImageError, Result};
use crate::types::{Image, ImageMimeType};

const ARTBOT_USER_AGENT: &str = concat!("artbot/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download the image at `url`
    ///
    /// # Errors
    ///
    /// - `ImageError::Fetch` on transport failure or an empty body
    /// - `ImageError::Status` on a non-success HTTP status
    async fn fetch(&self, url: &str) -> Result<Image>;
}

/// Fetches images over HTTP(S)
#[derive(Clone, Default)]
pub struct HttpImageSource {
    http: reqwest::Client,
}

impl HttpImageSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Image> {
        let fetch_error = |reason: String| ImageError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, ARTBOT_USER_AGENT)
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("failed to read body: {}", e)))?;

        if bytes.is_empty() {
            return Err(fetch_error("empty response body".to_string()).into());
        }

        let image = tag_image(bytes.to_vec(), content_type.as_deref(), url);
        tracing::debug!(url, bytes = image.size(), mime_type = %image.mime_type, "downloaded image");
        Ok(image)
    }
}

/// Tag downloaded bytes with a format
///
/// Prefers the declared `Content-Type`, then the file signature, then the URL
/// extension, and finally assumes JPEG.
pub fn tag_image(bytes: Vec<u8>, content_type: Option<&str>, url: &str) -> Image {
    let mime_type = content_type
        .and_then(ImageMimeType::from_mime_str)
        .or_else(|| ImageMimeType::sniff(&bytes))
        .or_else(|| url_extension(url).and_then(ImageMimeType::from_extension))
        .unwrap_or(ImageMimeType::Jpeg);

    Image { bytes, mime_type }
}

fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let (_, ext) = path.rsplit_once('.')?;
    (!ext.contains('/')).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtbotError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Serve one canned HTTP response and return a URL pointing at it
    async fn serve_once(head: &str, body: &[u8]) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut response = format!(
            "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            head,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(&response).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/art_crop/front/bolt.jpg?1562", addr)
    }

    #[test]
    fn test_tag_image_prefers_content_type() {
        let image = tag_image(PNG_HEADER.to_vec(), Some("image/webp"), "https://x/a.jpg");
        assert_eq!(image.mime_type, ImageMimeType::WebP);
    }

    #[test]
    fn test_tag_image_sniffs_when_content_type_unusable() {
        let image = tag_image(
            PNG_HEADER.to_vec(),
            Some("application/octet-stream"),
            "https://x/a.jpg",
        );
        assert_eq!(image.mime_type, ImageMimeType::Png);
    }

    #[test]
    fn test_tag_image_falls_back_to_extension_then_jpeg() {
        let image = tag_image(vec![1, 2, 3], None, "https://x/art/a.gif?v=2");
        assert_eq!(image.mime_type, ImageMimeType::Gif);

        let image = tag_image(vec![1, 2, 3], None, "https://x.example/art/crop");
        assert_eq!(image.mime_type, ImageMimeType::Jpeg);
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://c.scryfall.io/a/b.jpg?1562"), Some("jpg"));
        assert_eq!(url_extension("https://c.scryfall.io/a/b.png#frag"), Some("png"));
        assert_eq!(url_extension("https://c.scryfall.io/a/b"), None);
    }

    #[tokio::test]
    async fn test_fetch_returns_tagged_image() {
        let mut body = PNG_HEADER.to_vec();
        body.extend_from_slice(&[0u8; 32]);
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Type: image/png", &body).await;

        let image = HttpImageSource::new().fetch(&url).await.unwrap();

        assert_eq!(image.mime_type, ImageMimeType::Png);
        assert_eq!(image.size(), 40);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let url = serve_once("HTTP/1.1 404 Not Found", b"gone").await;

        let result = HttpImageSource::new().fetch(&url).await;

        match result {
            Err(ArtbotError::Image(ImageError::Status { status, .. })) => assert_eq!(status, 404),
            other => panic!("Expected ImageError::Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Type: image/jpeg", b"").await;

        let result = HttpImageSource::new().fetch(&url).await;
        assert!(matches!(
            result,
            Err(ArtbotError::Image(ImageError::Fetch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpImageSource::new()
            .fetch(&format!("http://{}/a.jpg", addr))
            .await;

        match result {
            Err(ArtbotError::Image(ImageError::Fetch { url, .. })) => assert!(url.ends_with("/a.jpg")),
            other => panic!("Expected ImageError::Fetch, got {:?}", other),
        }
    }
}
