//! Inline comment preservation for Confluence page publishing.
//!
//! When a page body is regenerated wholesale from its markdown source, the
//! update is a full replace: every inline comment marker a reader attached to
//! the old body would be orphaned. This crate re-anchors those markers onto
//! the regenerated body without the converter knowing they exist.
//!
//! The pipeline:
//! - [`parser`]: storage-format fragments to trees, with Confluence
//!   namespace handling and HTML entity expansion
//! - [`matcher`]: greedy tree alignment with an 80% text-similarity
//!   threshold
//! - [`transfer`]: marker splicing into the aligned new tree, recording
//!   markers that could not be placed
//! - [`serializer`]: back to storage format, with CDATA restoration for
//!   plain-text bodies
//!
//! The whole pipeline is a pure function; concurrent calls share nothing but
//! constant configuration.
//!
//! # Example
//!
//! ```
//! use markpage_comments::preserve_comments;
//!
//! let old = r#"<p><ac:inline-comment-marker ac:ref="abc">marked</ac:inline-comment-marker> text</p>"#;
//! let new = "<p>marked text</p>";
//!
//! let result = preserve_comments(old, new);
//! assert!(result.html.contains("ac:inline-comment-marker"));
//! assert!(result.unplaced.is_empty());
//! ```

mod entities;
mod error;
mod matcher;
mod parser;
mod serializer;
mod transfer;
mod tree;

pub use error::PreserveError;
pub use transfer::UnplacedComment;

use matcher::TreeMatcher;
use transfer::MarkerTransfer;

/// Result of a completed preservation pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PreserveResult {
    /// Storage-format body with markers re-inserted where they matched.
    pub html: String,
    /// Markers whose anchor text is gone from the new document, in old
    /// document order.
    pub unplaced: Vec<UnplacedComment>,
}

/// Outcome of [`preserve`].
///
/// The degraded branch means a pipeline step failed and annotations were
/// never examined; callers should log it distinctly rather than treat it as
/// a zero-unplaced success.
#[derive(Debug)]
pub enum PreserveOutcome {
    /// Pipeline completed; every marker was either placed or reported.
    Success(PreserveResult),
    /// A pipeline step failed; the new document should be used as-is.
    Degraded {
        /// What broke the pipeline.
        reason: PreserveError,
    },
}

impl PreserveOutcome {
    /// Collapse the degraded branch into the unmodified new document.
    ///
    /// Annotation loss is preferred over blocking a publish, so the fallback
    /// is the new body verbatim with nothing reported unplaced.
    #[must_use]
    pub fn unwrap_or_fallback(self, new_html: &str) -> PreserveResult {
        match self {
            Self::Success(result) => result,
            Self::Degraded { reason } => {
                tracing::error!("Comment preservation failed: {reason}");
                tracing::warn!("Falling back to new HTML without comment preservation");
                PreserveResult {
                    html: new_html.to_owned(),
                    unplaced: Vec::new(),
                }
            }
        }
    }
}

/// Re-anchor inline comment markers from `old_html` onto `new_html`.
///
/// Parses both bodies, aligns their trees by tag and text similarity,
/// splices each marker into the aligned position, and serializes the
/// patched tree. Markers whose anchor text no longer exists are returned
/// in [`PreserveResult::unplaced`] for manual reconciliation.
///
/// Returns [`PreserveOutcome::Degraded`] if either body fails to parse.
#[must_use]
pub fn preserve(old_html: &str, new_html: &str) -> PreserveOutcome {
    match run_pipeline(old_html, new_html) {
        Ok(result) => PreserveOutcome::Success(result),
        Err(reason) => PreserveOutcome::Degraded { reason },
    }
}

/// [`preserve`] with the fallback already applied: always yields a usable
/// body, degrading to `new_html` unmodified when the pipeline fails.
#[must_use]
pub fn preserve_comments(old_html: &str, new_html: &str) -> PreserveResult {
    preserve(old_html, new_html).unwrap_or_fallback(new_html)
}

fn run_pipeline(old_html: &str, new_html: &str) -> Result<PreserveResult, PreserveError> {
    tracing::info!("Starting comment preservation");
    tracing::debug!(
        old_len = old_html.len(),
        new_len = new_html.len(),
        "Input sizes"
    );

    let old_tree = parser::parse(old_html)?;
    let mut new_tree = parser::parse(new_html)?;

    let matches = TreeMatcher::new(&old_tree, &new_tree).find_matches();

    let mut transfer = MarkerTransfer::new();
    transfer.transfer(&matches, &old_tree, &mut new_tree);

    let html = serializer::serialize(&new_tree);
    tracing::info!("Comment preservation completed");

    Ok(PreserveResult {
        html,
        unplaced: transfer.into_unplaced(),
    })
}
