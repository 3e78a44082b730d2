//! Error types for the preservation pipeline.

/// Error raised while parsing storage-format markup.
///
/// Any variant degrades the whole `preserve` call; there is no partial
/// recovery inside the pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PreserveError {
    /// Malformed XML in one of the inputs.
    #[error("XML parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// Malformed attribute in one of the inputs.
    #[error("XML attribute error")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Input bytes could not be decoded as text.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
