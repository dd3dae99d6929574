use std::path::PathBuf;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    /// A pixel buffer was requested with a zero width or height.
    #[error("invalid buffer dimensions {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// An operation needed a base layer but the stack is empty.
    #[error("the layer stack is empty")]
    EmptyStack,

    #[error("could not open '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not save '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project file error: {0}")]
    Project(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<bincode::Error> for EditorError {
    fn from(e: bincode::Error) -> Self {
        EditorError::Project(e.to_string())
    }
}

impl EditorError {
    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
