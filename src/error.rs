use std::fmt::{Display, Formatter};
use std::sync::PoisonError;

use config::ConfigError;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

// All except Internal are considered user-facing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    Internal(String),
    ReplacerFrameOutOfBound,
    ReplacerFrameNotEvictable,
}

impl Error {
    pub fn internal<E: ToString>(msg: E) -> Error {
        Error::Internal(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) => {
                write!(f, "{}", s)
            }
            Error::ReplacerFrameOutOfBound => {
                write!(f, "frame id exceeds the replacer capacity")
            }
            Error::ReplacerFrameNotEvictable => {
                write!(f, "cannot remove a non-evictable frame")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::internal(err)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::internal(err)
    }
}
