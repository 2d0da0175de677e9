//! Provider output

/// Raw image produced by a provider, not yet written anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// Prompt as rewritten by the provider, when it reports one
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            revised_prompt: None,
        }
    }

    pub fn with_revised_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.revised_prompt = Some(prompt.into());
        self
    }

    /// File extension matching the payload's magic bytes, `bin` when unknown
    pub fn extension(&self) -> &'static str {
        match image::guess_format(&self.bytes) {
            Ok(image::ImageFormat::Png) => "png",
            Ok(image::ImageFormat::Jpeg) => "jpg",
            Ok(image::ImageFormat::WebP) => "webp",
            _ => "bin",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
