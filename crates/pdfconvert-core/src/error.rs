use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Invalid fit policy '{0}'. Must be 'contain', 'cover', or 'stretch'")]
    InvalidFitPolicy(String),

    #[error("Degenerate image: {0}")]
    DegenerateImage(String),

    #[error("Image processing failed: {0}")]
    ImageError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to process any images ({0} failed). Please check file formats and try again.")]
    NoImagesConverted(usize),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl From<image::ImageError> for ConvertError {
    fn from(err: image::ImageError) -> Self {
        ConvertError::ImageError(err.to_string())
    }
}

impl From<lopdf::Error> for ConvertError {
    fn from(err: lopdf::Error) -> Self {
        ConvertError::OperationError(err.to_string())
    }
}
