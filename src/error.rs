use log::warn;

/// Failure kinds shared by every stream and coder in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("bad arguments")]
    BadArguments,
    #[error("array index out of bounds")]
    ArrayIndexOutOfBounds,
    #[error("reached end of file")]
    ReachedEndOfFile,
    #[error("invalid file")]
    InvalidFile,
    #[error("failed to open")]
    FailedToOpen,
    #[error("failed to read")]
    FailedToRead,
    #[error("failed to write")]
    FailedToWrite,
    #[error("stream is closed")]
    StreamIsClosed,
    #[error("invalid data")]
    InvalidData,
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn error_if(value: bool, err: Error) -> Result<()> {
    if value {
        Err(err)
    } else {
        Ok(())
    }
}

pub fn error_if_not(value: bool, err: Error) -> Result<()> {
    error_if(!value, err)
}

/// First-wins error slot.
///
/// Once an error is recorded it is never replaced or cleared, and
/// `check()` keeps returning it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StickyError {
    error: Option<Error>,
    owner: &'static str,
}

impl StickyError {
    pub fn new(owner: &'static str) -> StickyError {
        StickyError { error: None, owner }
    }

    pub fn get(&self) -> Option<Error> {
        self.error
    }

    pub fn check(&self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Records `err` unless an earlier error is already held, and hands
    /// `err` back for returning.
    pub fn fail(&mut self, err: Error) -> Error {
        if self.error.is_none() {
            warn!("{}: {}", self.owner, err);
            self.error = Some(err);
        }
        err
    }

    /// Runs the outcome of a fallible step through the slot.
    pub fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.fail(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let mut sticky = StickyError::new("test");
        assert_eq!(sticky.check(), Ok(()));

        assert_eq!(sticky.fail(Error::InvalidData), Error::InvalidData);
        assert_eq!(sticky.fail(Error::StreamIsClosed), Error::StreamIsClosed);

        assert_eq!(sticky.get(), Some(Error::InvalidData));
        assert_eq!(sticky.check(), Err(Error::InvalidData));
    }

    #[test]
    fn test_track() {
        let mut sticky = StickyError::new("test");
        assert_eq!(sticky.track(Ok(5)), Ok(5));
        assert_eq!(sticky.get(), None);
        assert_eq!(sticky.track::<()>(Err(Error::FailedToRead)), Err(Error::FailedToRead));
        assert_eq!(sticky.get(), Some(Error::FailedToRead));
    }

    #[test]
    fn test_error_if() {
        assert_eq!(error_if(false, Error::BadArguments), Ok(()));
        assert_eq!(error_if(true, Error::BadArguments), Err(Error::BadArguments));
        assert_eq!(error_if_not(true, Error::BadArguments), Ok(()));
        assert_eq!(error_if_not(false, Error::BadArguments), Err(Error::BadArguments));
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::StreamIsClosed.to_string(), "stream is closed");
        assert_eq!(Error::ArrayIndexOutOfBounds.to_string(), "array index out of bounds");
    }
}
