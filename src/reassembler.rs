use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Receiver};
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::Read;

use crate::{
    config::SerialConfig,
    frame::{Frame, FrameMailbox},
    module_timing::Timing,
    transport::{SerialControl, SerialEvent, PATTERN_LEN},
};

/// Turns serial driver events into response frames.
///
/// You must call `.run()` in a background task for responses to reach the
/// [`FrameMailbox`].
pub struct FrameReassembler<'d, M: RawMutex, R, const EVENT_CAPACITY: usize> {
    serial: R,
    events: Receiver<'d, M, SerialEvent, EVENT_CAPACITY>,
    mailbox: &'d FrameMailbox<M>,
    buf: Frame,
    pending: Option<SerialEvent>,
    timing: Timing,
}

impl<'d, M, R, const EVENT_CAPACITY: usize> FrameReassembler<'d, M, R, EVENT_CAPACITY>
where
    M: RawMutex,
    R: Read + SerialControl,
{
    pub fn new(
        serial: R,
        events: Receiver<'d, M, SerialEvent, EVENT_CAPACITY>,
        mailbox: &'d FrameMailbox<M>,
        timing: Timing,
    ) -> Self {
        Self {
            serial,
            events,
            mailbox,
            buf: Frame::new(),
            pending: None,
            timing,
        }
    }

    /// Configure the serial line and drop anything received before.
    pub fn init(&mut self, config: &SerialConfig) -> Result<(), R::Error> {
        debug!("Configuring serial line at {} baud", config.baud_rate);
        self.serial.configure(config)?;
        self.serial.flush_input()
    }

    pub async fn run(&mut self) -> ! {
        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                // Idle until the driver has something for us
                None => self.events.receive().await,
            };
            if let Some(frame) = self.on_event(event).await {
                self.mailbox.publish(frame);
            }
        }
    }

    /// Handle one driver event, returning a completed frame if the event
    /// produced one.
    ///
    /// A non-data event received while looking for the second part of a data
    /// delivery is kept and handed out by [`Self::take_pending`].
    pub async fn on_event(&mut self, event: SerialEvent) -> Option<Frame> {
        self.buf.clear();

        match event {
            SerialEvent::Data(len) => {
                self.read_into_buf(len, self.timing.data_read).await;

                // A reply is often delivered in two parts. Merge a data event
                // that follows right away, handle anything else on its own.
                match with_timeout(self.timing.coalesce_window, self.events.receive()).await {
                    Ok(SerialEvent::Data(len)) => {
                        self.read_into_buf(len, self.timing.data_read).await;
                    }
                    Ok(other) => self.pending = Some(other),
                    Err(_) => {}
                }

                self.take_frame()
            }
            SerialEvent::Overflow => {
                warn!("hw fifo overflow");
                self.discard_input();
                None
            }
            SerialEvent::BufferFull => {
                warn!("ring buffer full");
                self.discard_input();
                None
            }
            SerialEvent::Break => {
                warn!("uart rx break");
                None
            }
            SerialEvent::ParityError => {
                warn!("uart parity error");
                None
            }
            SerialEvent::FrameError => {
                warn!("uart frame error");
                None
            }
            SerialEvent::PatternDetected(None) => {
                warn!("Pattern detected, but its position was not recorded");
                if self.serial.flush_input().is_err() {
                    warn!("Failed to flush serial input");
                }
                None
            }
            SerialEvent::PatternDetected(Some(pos)) => {
                self.read_into_buf(pos, self.timing.pattern_read).await;

                let mut pat = [0u8; PATTERN_LEN];
                let n = self.read_bytes(&mut pat, self.timing.pattern_read).await;
                debug!("Pattern detected at {}: {:?}", pos, &pat[..n]);

                self.take_frame()
            }
            SerialEvent::Other(kind) => {
                warn!("uart event type: {}", kind);
                None
            }
        }
    }

    pub fn take_pending(&mut self) -> Option<SerialEvent> {
        self.pending.take()
    }

    fn take_frame(&mut self) -> Option<Frame> {
        if self.buf.is_empty() {
            return None;
        }
        let frame = core::mem::take(&mut self.buf);
        trace!("Frame: {:?}", frame.text());
        Some(frame)
    }

    fn discard_input(&mut self) {
        if self.serial.flush_input().is_err() {
            warn!("Failed to flush serial input");
        }

        let mut dropped = 0usize;
        while self.events.try_receive().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Dropped {} pending serial events", dropped);
        }
        self.buf.clear();
    }

    async fn read_into_buf(&mut self, len: usize, timeout: Duration) {
        let mut chunk = [0u8; 64];
        let mut remaining = len;
        let deadline = Instant::now() + timeout;

        while remaining > 0 {
            let want = remaining.min(chunk.len());
            let n = self.read_bytes_until(&mut chunk[..want], deadline).await;
            if n == 0 {
                warn!("Short read, {} of {} bytes missing", remaining, len);
                break;
            }
            if self.buf.extend(&chunk[..n]) < n {
                warn!("Frame buffer full, dropping input");
            }
            remaining -= n;
        }
    }

    async fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> usize {
        self.read_bytes_until(buf, Instant::now() + timeout).await
    }

    async fn read_bytes_until(&mut self, buf: &mut [u8], deadline: Instant) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match with_timeout(deadline - now, self.serial.read(&mut buf[filled..])).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(_)) => {
                    warn!("Serial read failed");
                    break;
                }
            }
        }
        filled
    }
}
