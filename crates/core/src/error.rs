use thiserror::Error;

/// Byte position inside the raw status content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Byte offset from the start of the content (0-indexed).
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "byte {}", self.offset)
    }
}

/// Errors surfaced by the fallible edges of the crate (table loading, rewriting).
///
/// The content transformer itself never returns these; it records a
/// [`ContentWarning`] and degrades instead.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Mention or emoji table JSON could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The HTML rewriter rejected the input.
    #[error("Rewrite error: {message}")]
    Rewrite {
        /// Error message reported by the rewriter
        message: String,
    },
}

impl ContentError {
    /// Create a rewrite error from any displayable rewriter failure
    pub fn rewrite(message: impl Into<String>) -> Self {
        Self::Rewrite {
            message: message.into(),
        }
    }
}

/// Recoverable conditions observed while transforming content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentWarning {
    /// Malformed markup was repaired or skipped.
    StructuralDegradation {
        /// Where the repair happened
        location: SourceLocation,
        /// What was repaired
        message: String,
    },
    /// A mention anchor pointed at an account missing from the mention table.
    UnresolvedMention {
        /// Anchor href
        href: String,
        /// Handle synthesized for the stub account
        handle: String,
    },
    /// A triple-backtick fence was opened but never closed.
    UnterminatedFence {
        /// Where the opening fence starts
        location: SourceLocation,
        /// Surrounding text for the message
        context: String,
    },
    /// A `:shortcode:` token matched no emoji definition.
    UnknownShortcode {
        /// The shortcode without colons
        shortcode: String,
    },
}

impl ContentWarning {
    /// Create a structural degradation warning
    pub fn structural(offset: usize, message: impl Into<String>) -> Self {
        Self::StructuralDegradation {
            location: SourceLocation::new(offset),
            message: message.into(),
        }
    }

    /// Get the location of this warning, when it has one
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ContentWarning::StructuralDegradation { location, .. }
            | ContentWarning::UnterminatedFence { location, .. } => Some(location),
            ContentWarning::UnresolvedMention { .. } | ContentWarning::UnknownShortcode { .. } => {
                None
            }
        }
    }
}

impl std::fmt::Display for ContentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentWarning::StructuralDegradation { location, message } => {
                write!(f, "{}: {}", location, message)
            }
            ContentWarning::UnresolvedMention { href, handle } => {
                write!(f, "Unresolved mention @{} ({})", handle, href)
            }
            ContentWarning::UnterminatedFence { location, context } => {
                write!(f, "Unterminated code fence at {}, near '{}'", location, context)
            }
            ContentWarning::UnknownShortcode { shortcode } => {
                write!(f, "Unknown emoji shortcode :{}:", shortcode)
            }
        }
    }
}

/// Collection of recoverable diagnostics gathered during one transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// List of non-fatal warnings, in the order they were observed
    pub warnings: Vec<ContentWarning>,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the diagnostics collection
    pub fn add_warning(&mut self, warning: ContentWarning) {
        self.warnings.push(warning);
    }

    /// Add a structural degradation warning at a byte offset
    pub fn add_structural(&mut self, offset: usize, message: impl Into<String>) {
        self.warnings
            .push(ContentWarning::structural(offset, message));
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get total count of all diagnostics
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Iterate over unterminated fence warnings
    pub fn unterminated_fences(&self) -> impl Iterator<Item = &ContentWarning> {
        self.warnings
            .iter()
            .filter(|w| matches!(w, ContentWarning::UnterminatedFence { .. }))
    }
}
