//! Extracted page artifacts

/// File name suffix for raw wikitext artifacts
pub const ARTIFACT_SUFFIX: &str = ".wiki.txt";

/// Raw wikitext of one page, named after its external id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
    external_id: String,
    page_id: String,
    title: Option<String>,
    payload: String,
}

impl Artifact {
    /// Create an artifact named `<external_id>.wiki.txt`
    pub fn new(
        external_id: impl Into<String>,
        page_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            name: format!("{}{}", external_id, ARTIFACT_SUFFIX),
            external_id,
            page_id: page_id.into(),
            title: None,
            payload: payload.into(),
        }
    }

    /// Attach the page title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}
