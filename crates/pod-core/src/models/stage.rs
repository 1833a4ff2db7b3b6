//! The four independently-tracked processing stages of an episode

use std::fmt;

/// One of the four parallel status tracks on an [`crate::Episode`].
///
/// Shared between the repository (to parameterize generic transition
/// queries) and the pipeline (to report which stage a worker belongs to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    Transcript,
    Metadata,
    FileSearch,
}

impl Stage {
    #[must_use]
    pub const fn column_prefix(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Transcript => "transcript",
            Self::Metadata => "metadata",
            Self::FileSearch => "file_search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_prefix())
    }
}
