use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid annotation document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to process image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no image is loaded")]
    NoImage,
    #[error("nothing is selected")]
    NothingSelected,
    #[error("the selection is not a connection")]
    NotAConnection,
    #[error("text must not be empty")]
    EmptyText,
    #[error("drag of {width:.1}x{height:.1} px is below the minimum size")]
    DragTooSmall { width: f32, height: f32 },
    #[error("a connection needs two distinct nodes")]
    SelfLoop,
    #[error("index {0} is out of range")]
    OutOfRange(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
