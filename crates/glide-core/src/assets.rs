//! Maps bundled asset names (`@"images/01.jpg"` in markup) to the URLs
//! the HTTP service serves them under.

/// Resolves asset names against a URL prefix such as `/assets/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    url_prefix: String,
}

impl AssetResolver {
    pub fn new(url_prefix: impl AsRef<str>) -> Self {
        let trimmed = url_prefix.as_ref().trim_matches('/');
        let url_prefix = if trimmed.is_empty() { "/".to_string() } else { format!("/{trimmed}/") };
        Self { url_prefix }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// URL for `name`. Absolute URLs and `data:` URIs pass through unchanged.
    pub fn url(&self, name: &str) -> String {
        if is_external(name) {
            return name.to_string();
        }
        format!("{}{}", self.url_prefix, name.trim_start_matches('/'))
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::new("/assets/")
    }
}

fn is_external(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://") || name.starts_with("data:") || name.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalised() {
        assert_eq!(AssetResolver::new("assets").url_prefix(), "/assets/");
        assert_eq!(AssetResolver::new("/static/").url_prefix(), "/static/");
        assert_eq!(AssetResolver::new("").url_prefix(), "/");
    }

    #[test]
    fn resolves_relative_names() {
        let assets = AssetResolver::default();
        assert_eq!(assets.url("images/01.jpg"), "/assets/images/01.jpg");
        assert_eq!(assets.url("/images/01.jpg"), "/assets/images/01.jpg");
    }

    #[test]
    fn external_urls_untouched() {
        let assets = AssetResolver::default();
        assert_eq!(assets.url("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
        assert_eq!(assets.url("data:image/png;base64,AA=="), "data:image/png;base64,AA==");
    }
}
