use embedded_io_async::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // Request errors, returned before any I/O
    CommandTooLong,
    EmptyCommand,
    ExpectedTooLong,
    BadMode,

    // Retry budget exhausted, or no frame reached the mailbox in time
    Timeout,

    // Transport write failure
    Io(ErrorKind),

    IoPin,

    InvalidResetMode,
}

impl Error {
    /// Distinct negative code of the error, as reported to hosts that branch
    /// on integers rather than on the enum.
    pub const fn code(&self) -> i32 {
        match self {
            Self::CommandTooLong => -1,
            Self::EmptyCommand => -2,
            Self::ExpectedTooLong => -3,
            Self::BadMode => -4,
            Self::Timeout => -5,
            Self::Io(_) => -6,
            Self::IoPin => -7,
            Self::InvalidResetMode => -8,
        }
    }

    /// Malformed input to a transaction. These are never retried.
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::CommandTooLong | Self::EmptyCommand | Self::ExpectedTooLong | Self::BadMode
        )
    }
}

impl From<ErrorKind> for Error {
    fn from(e: ErrorKind) -> Self {
        Self::Io(e)
    }
}
