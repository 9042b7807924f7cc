use crate::config::ThumbnailConfig;

/// Maps source object keys to derived keys and owning product ids
#[derive(Debug, Clone)]
pub struct ThumbnailKeys {
    source_segment: String,
    derived_segment: String,
}

impl ThumbnailKeys {
    pub fn new(source_segment: impl Into<String>, derived_segment: impl Into<String>) -> Self {
        Self {
            source_segment: source_segment.into(),
            derived_segment: derived_segment.into(),
        }
    }

    pub fn from_config(config: &ThumbnailConfig) -> Self {
        Self::new(config.source_segment.clone(), config.derived_segment.clone())
    }

    /// Whether a key lives under the source segment and names a file.
    ///
    /// Keys already under the derived segment never qualify, so derived writes
    /// cannot feed back into derivation.
    pub fn is_source(&self, key: &str) -> bool {
        let mut segments = key.split('/').collect::<Vec<_>>();
        let file = segments.pop().unwrap_or("");
        !file.is_empty()
            && segments.iter().any(|s| *s == self.source_segment)
            && !segments.iter().any(|s| *s == self.derived_segment)
    }

    /// Replace the first source segment with the derived segment, keeping the rest of the key
    pub fn derived_key(&self, source_key: &str) -> Option<String> {
        if !self.is_source(source_key) {
            return None;
        }
        let mut replaced = false;
        let segments: Vec<&str> = source_key
            .split('/')
            .map(|segment| {
                if !replaced && segment == self.source_segment {
                    replaced = true;
                    self.derived_segment.as_str()
                } else {
                    segment
                }
            })
            .collect();
        Some(segments.join("/"))
    }

    /// Object key for a product's source image
    pub fn source_key(&self, product_id: &str, extension: &str) -> String {
        format!("{}/products/{}.{}", self.source_segment, product_id, extension)
    }

    /// Product id encoded in the filename, without its extension
    pub fn product_id(key: &str) -> Option<&str> {
        let file = key.rsplit('/').next()?;
        let id = match file.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => file,
        };
        (!id.is_empty()).then_some(id)
    }
}
