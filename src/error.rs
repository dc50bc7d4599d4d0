use std::io;
use thiserror::Error;

use crate::header::FormatError;

/// `EINVAL`, the status for bad arguments and malformed images.
pub const EXIT_INVALID: u8 = 22;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Argument(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Bad header: {0}")]
    Format(#[from] FormatError),
}

impl Error {
    /// Process exit status: the OS error number for I/O failures, `EINVAL`
    /// otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Argument(_) | Error::Format(_) => EXIT_INVALID,
            Error::Io(e) => match e.raw_os_error() {
                Some(code) if code > 0 => code.min(u8::MAX as i32) as u8,
                _ => 1,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(Error::Argument("x".into()).exit_code(), 22);
        assert_eq!(Error::Format(FormatError::BadMagic(0)).exit_code(), 22);
        assert_eq!(Error::Io(io::Error::from_raw_os_error(2)).exit_code(), 2);
        assert_eq!(Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "short")).exit_code(), 1);
    }
}
