//! Mock transport, power line and configuration shared by the unit tests.

use core::convert::Infallible;
use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin, PinState};
use embedded_io_async::{ErrorType, Read, Write};

use crate::{
    config::{ModemConfig, SerialConfig},
    frame::{Frame, FrameMailbox},
    module_timing::Timing,
    transport::SerialControl,
};

pub const TEST_TIMING: Timing = Timing {
    tx_drain: Duration::from_millis(5),
    settle: Duration::from_millis(1),
    frame_timeout: Duration::from_millis(20),
    byte_timeout: Duration::from_millis(5),
    retry_delay: Duration::from_millis(5),

    coalesce_window: Duration::from_millis(5),
    data_read: Duration::from_millis(20),
    pattern_read: Duration::from_millis(20),

    state_delay: Duration::from_millis(1),
    baud_retry_delay: Duration::from_millis(1),
    echo_retry_delay: Duration::from_millis(1),
    command_gap: Duration::from_millis(1),
    long_command_gap: Duration::from_millis(1),
    band_frame_gap: Duration::from_millis(1),
    mqtt_step_gap: Duration::from_millis(1),

    power_hold: Duration::from_millis(5),
    power_off_pause: Duration::from_millis(20),
    power_settle: Duration::from_millis(10),
    boot_wait: Duration::from_millis(1),
};

#[derive(Default)]
pub struct SerialState {
    pub rx: VecDeque<u8>,
    pub reads: usize,
    pub flushes: usize,
    pub config: Option<SerialConfig>,
}

/// Receive side of a serial line, fed by the test through [`MockSerial::inject`].
///
/// Reads wait while nothing is buffered, exactly like a real UART would.
#[derive(Clone, Default)]
pub struct MockSerial(pub Rc<RefCell<SerialState>>);

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }

    pub fn flushes(&self) -> usize {
        self.0.borrow().flushes
    }

    pub fn buffered(&self) -> usize {
        self.0.borrow().rx.len()
    }

    pub fn config(&self) -> Option<SerialConfig> {
        self.0.borrow().config
    }
}

impl ErrorType for MockSerial {
    type Error = Infallible;
}

impl Read for MockSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.borrow_mut().reads += 1;
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            {
                let mut state = self.0.borrow_mut();
                if !state.rx.is_empty() {
                    let n = buf.len().min(state.rx.len());
                    for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
            }
            Timer::after(Duration::from_millis(1)).await;
        }
    }
}

impl SerialControl for MockSerial {
    fn configure(&mut self, config: &SerialConfig) -> Result<(), Self::Error> {
        self.0.borrow_mut().config = Some(*config);
        Ok(())
    }

    fn flush_input(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.rx.clear();
        state.flushes += 1;
        Ok(())
    }
}

/// Transmit side of a serial line with a modem behind it.
///
/// Each complete command written (up to its carriage return) is logged and
/// answered from the script: replies for a command are handed out in order,
/// the last one repeats. Replies go to the mailbox, the serial receive side,
/// or both.
pub struct ScriptedModem<'a> {
    mailbox: Option<&'a FrameMailbox<NoopRawMutex>>,
    serial: Option<MockSerial>,
    script: Vec<(String, VecDeque<Vec<u8>>)>,
    partial: Vec<u8>,
    log: Rc<RefCell<Vec<String>>>,
}

impl<'a> ScriptedModem<'a> {
    pub fn new() -> Self {
        Self {
            mailbox: None,
            serial: None,
            script: Vec::new(),
            partial: Vec::new(),
            log: Rc::default(),
        }
    }

    pub fn with_mailbox(mut self, mailbox: &'a FrameMailbox<NoopRawMutex>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    pub fn with_serial(mut self, serial: MockSerial) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Answer `cmd` (without its terminator) with `replies`, in order.
    pub fn on(mut self, cmd: &str, replies: &[&str]) -> Self {
        let replies = replies.iter().map(|r| r.as_bytes().to_vec()).collect();
        self.script.push((cmd.to_string(), replies));
        self
    }

    /// Shared view of every command written so far.
    pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
        self.log.clone()
    }

    fn answer(&mut self, cmd: String) {
        let reply = self
            .script
            .iter_mut()
            .find(|(c, _)| *c == cmd)
            .and_then(|(_, replies)| {
                if replies.len() > 1 {
                    replies.pop_front()
                } else {
                    replies.front().cloned()
                }
            });
        self.log.borrow_mut().push(cmd);

        let Some(reply) = reply.filter(|r| !r.is_empty()) else {
            return;
        };
        if let Some(mailbox) = self.mailbox {
            mailbox.publish(Frame::from_slice(&reply));
        }
        if let Some(serial) = &self.serial {
            serial.inject(&reply);
        }
    }
}

impl ErrorType for ScriptedModem<'_> {
    type Error = Infallible;
}

impl Write for ScriptedModem<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            if byte == b'\r' {
                let cmd = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                self.answer(cmd);
            } else {
                self.partial.push(byte);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Power line recording every level it is driven to.
#[derive(Clone, Default)]
pub struct RecordingPin(pub Rc<RefCell<Vec<(PinState, Instant)>>>);

impl RecordingPin {
    pub fn levels(&self) -> Vec<PinState> {
        self.0.borrow().iter().map(|(level, _)| *level).collect()
    }

    pub fn history(&self) -> Vec<(PinState, Instant)> {
        self.0.borrow().clone()
    }
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push((PinState::Low, Instant::now()));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push((PinState::High, Instant::now()));
        Ok(())
    }
}

#[derive(Default)]
pub struct TestConfig {
    pub pin: RecordingPin,
}

impl<'a> ModemConfig<'a> for TestConfig {
    type PowerPin = RecordingPin;

    const BAUD_SYNC_ATTEMPTS: u16 = 3;
    const ECHO_OFF_ATTEMPTS: u16 = 2;
    const MAX_FIX_POLLS: u16 = 10;
    const PING_COUNT: u8 = 1;
    const TIMING: Timing = TEST_TIMING;

    fn power_pin(&mut self) -> Option<&mut Self::PowerPin> {
        Some(&mut self.pin)
    }
}
