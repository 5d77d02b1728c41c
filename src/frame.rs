use core::ops::Deref;

use embassy_sync::{blocking_mutex::raw::RawMutex, signal::Signal};
use embassy_time::{with_timeout, Duration};
use heapless::Vec;

/// Capacity of a single response frame
pub const FRAME_CAPACITY: usize = 1024;

/// One logical unit of serial input, handed over as a complete response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, FRAME_CAPACITY>,
}

impl Frame {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Builds a frame from `data`, truncated to [`FRAME_CAPACITY`].
    pub fn from_slice(data: &[u8]) -> Self {
        let mut frame = Self::new();
        frame.extend(data);
        frame
    }

    /// Appends as much of `data` as fits, returning the number of bytes taken.
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(FRAME_CAPACITY - self.bytes.len());
        // Cannot fail, `n` is bounded by the remaining capacity
        let _ = self.bytes.extend_from_slice(&data[..n]);
        n
    }

    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The longest valid UTF-8 prefix of the frame.
    pub fn text(&self) -> &str {
        utf8_prefix(&self.bytes)
    }
}

pub(crate) fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // Cannot fail, the prefix up to `valid_up_to` is valid UTF-8
            core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
        }
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Frame {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=str}", self.text())
    }
}

/// Single slot handoff between the frame reassembler and the AT client.
///
/// Publishing always overwrites, so at most one unread frame exists and a
/// consumer only ever sees the most recent one. Intermediate frames published
/// before a consume are lost; this is a "latest response" slot, not a queue.
pub struct FrameMailbox<M: RawMutex> {
    slot: Signal<M, Frame>,
}

impl<M: RawMutex> Default for FrameMailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> FrameMailbox<M> {
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    pub fn publish(&self, frame: Frame) {
        self.slot.signal(frame);
    }

    /// Wait for a frame for at most `timeout`, emptying the slot.
    pub async fn consume(&self, timeout: Duration) -> Option<Frame> {
        with_timeout(timeout, self.slot.wait()).await.ok()
    }

    /// Take the pending frame, if any, without waiting.
    pub fn try_consume(&self) -> Option<Frame> {
        self.slot.try_take()
    }

    pub fn has_frame(&self) -> bool {
        self.slot.signaled()
    }
}
