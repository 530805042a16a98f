use livesent_core::QueryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    InvalidQuery(#[from] QueryError),

    /// The news source returned nothing for the query.
    #[error("no news found for location '{location}'")]
    NoData { location: String },

    #[error("news source error: {0}")]
    News(String),

    #[error("Gemini error: {0}")]
    Gemini(String),

    #[error("summarizer error: {0}")]
    Summarizer(String),

    #[error("TEI error: {0}")]
    Tei(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    /// Store connectivity or API failure. Fatal for the current request.
    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Errors caused by the news collaborator rather than by this pipeline.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PipelineError::News(_) | PipelineError::Http(_) | PipelineError::Xml(_)
        )
    }

    /// The event store could not be reached or refused the request.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, PipelineError::Qdrant(_))
    }
}
