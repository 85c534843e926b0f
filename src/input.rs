use base64::Engine;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Character budget for a single text part
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported image format: {0} (only jpeg and png are accepted)")]
    UnsupportedFormat(String),

    #[error("Could not decode image: {0}")]
    Undecodable(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// A validated photo ready to inline into a generation request.
/// Keeps the original encoded bytes; the decode only proves the buffer
/// is a real image.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImagePart {
    /// Validate raw encoded bytes (jpeg or png) and wrap them
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&data)?;

        let mime_type = match format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            other => {
                return Err(DecodeError::UnsupportedFormat(
                    other.to_mime_type().to_string(),
                ));
            }
        };

        let decoded = image::load_from_memory_with_format(&data, format)?;
        debug!(
            "Decoded {} image ({}x{}, {} bytes)",
            mime_type,
            decoded.width(),
            decoded.height(),
            data.len()
        );

        Ok(Self {
            mime_type: mime_type.to_string(),
            width: decoded.width(),
            height: decoded.height(),
            data,
        })
    }

    /// Read and validate an image file
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref()).await?;
        Self::from_bytes(data)
    }

    /// Base64 encoding of the raw bytes for inline_data payloads
    pub fn base64_data(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// One unit of request content, either a photo or plain text
#[derive(Debug, Clone)]
pub enum InputPart {
    Image(ImagePart),
    Text(String),
}

impl InputPart {
    /// Wrap text, enforcing the character budget
    pub fn text(content: impl Into<String>) -> Self {
        let content: String = content.into();
        if content.chars().count() > MAX_TEXT_CHARS {
            InputPart::Text(content.chars().take(MAX_TEXT_CHARS).collect())
        } else {
            InputPart::Text(content)
        }
    }
}
