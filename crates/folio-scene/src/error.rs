//! Scene decoding errors.

/// Failure to obtain a [`Scene`](crate::Scene) from a source blob.
///
/// The decode ladder either yields a complete scene or exactly one of these;
/// partial results are never returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Every strategy of the ladder was tried and none produced an element
    /// list.
    #[error("unparseable-scene: no decoding strategy produced an element list ({attempts} attempts)")]
    Unparseable {
        /// Number of strategy/payload combinations tried.
        attempts: usize,
    },
}

impl DecodeError {
    /// Stable category string for presentation layers.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unparseable { .. } => "unparseable-scene",
        }
    }
}
