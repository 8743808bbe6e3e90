use thiserror::Error;

/// Failures that prevent MX resolution from starting at all. Lookup
/// failures for a particular domain are not errors; they surface as
/// [`MxStatus::NoRecords`](super::MxStatus::NoRecords).
#[derive(Debug, Error)]
pub enum MxError {
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
}

impl MxError {
    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }
}
