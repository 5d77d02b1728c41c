//! Interface to the serial driver.
//!
//! The byte stream itself is consumed through `embedded-io-async`. Line setup
//! and input flushing, which that crate has no notion of, go through
//! [`SerialControl`]. Driver notifications reach the frame reassembler as
//! [`SerialEvent`]s over an `embassy-sync` channel.

use embedded_io_async::ErrorType;

use crate::config::SerialConfig;

/// Number of identical characters that make up a detected pattern
pub const PATTERN_LEN: usize = 3;

/// Notification emitted by the serial driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialEvent {
    /// `len` bytes are ready to be read
    Data(usize),
    /// Hardware FIFO overflow
    Overflow,
    /// Driver ring buffer full
    BufferFull,
    Break,
    ParityError,
    FrameError,
    /// A pattern was detected in the input. The position is `None` when the
    /// driver's position queue was saturated and could not record it.
    PatternDetected(Option<usize>),
    /// Any other driver event, by raw type number
    Other(u8),
}

pub trait SerialControl: ErrorType {
    fn configure(&mut self, config: &SerialConfig) -> Result<(), Self::Error>;

    /// Discard everything buffered on the receive side.
    fn flush_input(&mut self) -> Result<(), Self::Error>;
}
