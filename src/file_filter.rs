use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("not an image: {0}")]
    NotAnImage(String),
    #[error("could not determine file type")]
    UnknownType,
}

/// Gate an upload payload: only images reach the compressor.
///
/// Extension-based detection via mime_guess first, magic-byte detection via
/// infer as the fallback when the name is inconclusive, so a misnamed
/// image still gets through.
pub fn ensure_image(filename: &str, bytes: &[u8]) -> Result<(), ImageInputError> {
    let guessed = mime_guess::from_path(filename).first_or_octet_stream();
    if guessed.type_() == mime::IMAGE {
        return Ok(());
    }

    match infer::get(bytes) {
        Some(kind) if kind.mime_type().starts_with("image/") => Ok(()),
        Some(kind) => Err(ImageInputError::NotAnImage(kind.mime_type().to_string())),
        None if guessed == mime::APPLICATION_OCTET_STREAM => Err(ImageInputError::UnknownType),
        None => Err(ImageInputError::NotAnImage(guessed.to_string())),
    }
}
