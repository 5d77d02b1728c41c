//! Command transaction engine.
//!
//! A transaction writes one command line, then collects the reply through a
//! [`ResponsePolicy`]:
//!
//! - [`MailboxPolicy`] takes complete frames from the [`FrameMailbox`] the
//!   frame reassembler publishes into. This is what the provisioning runner
//!   uses.
//! - [`ScanPolicy`] reads the serial line itself, one byte at a time, and
//!   needs no reassembler.
//!
//! Only one transaction is ever in flight, the client is shared behind a
//! mutex (see [`crate::AtHandle`]).

use atat::AtatCmd;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_timeout, Timer};
use embedded_io_async::{Error as _, Read, Write};
use heapless::Vec;

use crate::{
    error::Error,
    frame::{utf8_prefix, Frame, FrameMailbox},
    module_timing::Timing,
};

pub const MAX_COMMAND_LEN: usize = 256;
pub const MAX_EXPECTED_LEN: usize = 256;

/// Longest reply line the byte scanning policy assembles
pub const LINE_CAPACITY: usize = 512;

const RENDER_CAPACITY: usize = 512;

/// How a reply line is matched against the expected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CompareMode {
    /// Any terminated line will do
    None = 0,
    Equal = 1,
    /// Accept the first terminated line as is
    Return = 2,
    Contains = 3,
}

impl TryFrom<u8> for CompareMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Equal,
            2 => Self::Return,
            3 => Self::Contains,
            _ => return Err(Error::BadMode),
        })
    }
}

impl CompareMode {
    /// Evaluate one terminated reply line. A match yields what the
    /// transaction returns: the line itself, or an empty frame for modes that
    /// report no content.
    pub fn accept(self, line: &[u8], expect: &str) -> Option<Frame> {
        let expect = expect.as_bytes();
        match self {
            Self::None => Some(Frame::new()),
            // Nothing to compare against
            Self::Equal | Self::Contains if expect.is_empty() => Some(Frame::new()),
            Self::Equal => (line == expect).then(|| Frame::from_slice(line)),
            Self::Contains => line
                .windows(expect.len())
                .any(|w| w == expect)
                .then(|| Frame::from_slice(line)),
            Self::Return => Some(Frame::from_slice(line)),
        }
    }
}

fn is_terminator(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | b'\0')
}

/// Terminated lines of a frame, skipping blank and single byte ones.
fn lines(frame: &[u8]) -> impl Iterator<Item = &[u8]> {
    frame
        .split(|b| is_terminator(*b))
        .filter(|line| line.len() > 1)
}

/// Strategy for collecting the reply to a command that was just written.
#[allow(async_fn_in_trait)]
pub trait ResponsePolicy {
    /// Called before the command is written.
    fn prepare(&mut self) {}

    async fn collect(
        &mut self,
        expect: &str,
        mode: CompareMode,
        retries: u8,
        timing: &Timing,
    ) -> Result<Frame, Error>;
}

/// Collects replies from the frame reassembler's mailbox.
pub struct MailboxPolicy<'d, M: RawMutex> {
    mailbox: &'d FrameMailbox<M>,
}

impl<'d, M: RawMutex> MailboxPolicy<'d, M> {
    pub fn new(mailbox: &'d FrameMailbox<M>) -> Self {
        Self { mailbox }
    }

    pub fn mailbox(&self) -> &'d FrameMailbox<M> {
        self.mailbox
    }
}

impl<M: RawMutex> ResponsePolicy for MailboxPolicy<'_, M> {
    fn prepare(&mut self) {
        // A frame nobody asked for must not be taken as the reply
        if let Some(stale) = self.mailbox.try_consume() {
            debug!("Discarding unread frame: {:?}", stale.text());
        }
    }

    async fn collect(
        &mut self,
        expect: &str,
        mode: CompareMode,
        retries: u8,
        timing: &Timing,
    ) -> Result<Frame, Error> {
        Timer::after(timing.settle).await;

        for _ in 0..retries {
            let Some(frame) = self.mailbox.consume(timing.frame_timeout).await else {
                return Err(Error::Timeout);
            };

            match mode {
                CompareMode::Return => return Ok(frame),
                CompareMode::None => return Ok(Frame::new()),
                _ => {
                    if let Some(hit) = lines(&frame).find_map(|line| mode.accept(line, expect)) {
                        return Ok(hit);
                    }
                }
            }
            trace!("Frame did not match: {:?}", frame.text());
        }

        Err(Error::Timeout)
    }
}

/// Reads the reply byte by byte straight off the serial line.
pub struct ScanPolicy<R> {
    serial: R,
    line: Vec<u8, LINE_CAPACITY>,
}

impl<R: Read> ScanPolicy<R> {
    pub fn new(serial: R) -> Self {
        Self {
            serial,
            line: Vec::new(),
        }
    }

    pub fn serial_mut(&mut self) -> &mut R {
        &mut self.serial
    }
}

impl<R: Read> ResponsePolicy for ScanPolicy<R> {
    async fn collect(
        &mut self,
        expect: &str,
        mode: CompareMode,
        retries: u8,
        timing: &Timing,
    ) -> Result<Frame, Error> {
        self.line.clear();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut byte = [0u8; 1];
            loop {
                match with_timeout(timing.byte_timeout, self.serial.read(&mut byte)).await {
                    Ok(Ok(n)) if n > 0 => {}
                    Ok(Err(e)) => {
                        warn!("Serial read failed: {:?}", e.kind());
                        break;
                    }
                    _ => break,
                }

                if is_terminator(byte[0]) {
                    if self.line.len() > 1 {
                        trace!("Line: {:?}", utf8_prefix(&self.line));
                        if let Some(frame) = mode.accept(&self.line, expect) {
                            return Ok(frame);
                        }
                    }
                    self.line.clear();
                } else if self.line.push(byte[0]).is_err() {
                    warn!("Reply line exceeds {} bytes, discarding", LINE_CAPACITY);
                    self.line.clear();
                }
            }

            Timer::after(timing.retry_delay).await;
            if attempt >= retries {
                return Err(Error::Timeout);
            }
            debug!("No match in attempt {} of {}", attempt, retries);
        }
    }
}

fn validate(cmd: &[u8], expect: &str) -> Result<(), Error> {
    if cmd.len() > MAX_COMMAND_LEN {
        return Err(Error::CommandTooLong);
    }
    if cmd.is_empty() {
        return Err(Error::EmptyCommand);
    }
    if expect.len() > MAX_EXPECTED_LEN {
        return Err(Error::ExpectedTooLong);
    }
    Ok(())
}

/// Writes commands to the module and collects their replies.
pub struct AtClient<W, P> {
    tx: W,
    policy: P,
    timing: Timing,
}

impl<W, P> AtClient<W, P>
where
    W: Write,
    P: ResponsePolicy,
{
    pub fn new(tx: W, policy: P, timing: Timing) -> Self {
        Self { tx, policy, timing }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Send `cmd` exactly as given, terminator included, and wait for a reply
    /// matching `expect` under `mode`, for at most `retries` attempts.
    ///
    /// The returned frame holds the matched line, or nothing for
    /// [`CompareMode::None`]. Its length is the transaction's byte count.
    pub async fn transact(
        &mut self,
        cmd: &str,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        validate(cmd.as_bytes(), expect)?;
        self.transact_bytes(cmd.as_bytes(), expect, mode, retries)
            .await
    }

    /// [`Self::transact`] taking the comparison mode as a raw number.
    pub async fn transact_raw(
        &mut self,
        cmd: &str,
        expect: &str,
        mode: u8,
        retries: u8,
    ) -> Result<Frame, Error> {
        validate(cmd.as_bytes(), expect)?;
        let mode = CompareMode::try_from(mode)?;
        self.transact_bytes(cmd.as_bytes(), expect, mode, retries)
            .await
    }

    /// Render a typed command and run it as a transaction.
    pub async fn send<Cmd: AtatCmd>(
        &mut self,
        cmd: &Cmd,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        if Cmd::MAX_LEN > RENDER_CAPACITY {
            return Err(Error::CommandTooLong);
        }
        let mut buf = [0u8; RENDER_CAPACITY];
        let len = cmd.write(&mut buf);

        validate(&buf[..len], expect)?;
        self.transact_bytes(&buf[..len], expect, mode, retries)
            .await
    }

    async fn transact_bytes(
        &mut self,
        cmd: &[u8],
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        let retries = retries.max(1);
        self.policy.prepare();

        debug!("Sending command: {:?}", utf8_prefix(cmd));
        self.tx
            .write_all(cmd)
            .await
            .map_err(|e| Error::Io(e.kind()))?;

        match with_timeout(self.timing.tx_drain, self.tx.flush()).await {
            Ok(res) => res.map_err(|e| Error::Io(e.kind()))?,
            Err(_) => warn!(
                "Transmit did not drain within {} ms",
                self.timing.tx_drain.as_millis()
            ),
        }

        let res = self
            .policy
            .collect(expect, mode, retries, &self.timing)
            .await;
        match &res {
            Ok(frame) => debug!("Reply ({} bytes): {:?}", frame.len(), frame.text()),
            Err(e) => debug!("No reply: {:?}", e),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::gnss::GetGnssPower;
    use crate::test_helpers::{MockSerial, ScriptedModem, TEST_TIMING};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_time::Instant;

    fn scan_client<'a>(
        modem: ScriptedModem<'a>,
        serial: &MockSerial,
    ) -> AtClient<ScriptedModem<'a>, ScanPolicy<MockSerial>> {
        AtClient::new(
            modem.with_serial(serial.clone()),
            ScanPolicy::new(serial.clone()),
            TEST_TIMING,
        )
    }

    #[test]
    fn request_errors_are_reported_before_any_write() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new();
        let log = modem.log();
        let mut client = scan_client(modem, &serial);

        let long = "A".repeat(MAX_COMMAND_LEN + 1);
        assert_eq!(
            block_on(client.transact(&long, "", CompareMode::None, 1)),
            Err(Error::CommandTooLong)
        );
        assert_eq!(
            block_on(client.transact("", "", CompareMode::None, 1)),
            Err(Error::EmptyCommand)
        );
        let long_expect = "O".repeat(MAX_EXPECTED_LEN + 1);
        assert_eq!(
            block_on(client.transact("AT\r", &long_expect, CompareMode::Equal, 1)),
            Err(Error::ExpectedTooLong)
        );
        assert_eq!(
            block_on(client.transact_raw("AT\r", "OK", 4, 1)),
            Err(Error::BadMode)
        );

        assert!(log.borrow().is_empty());
        assert_eq!(serial.reads(), 0);
    }

    #[test]
    fn length_is_checked_before_emptiness() {
        assert_eq!(validate(&[], ""), Err(Error::EmptyCommand));
        assert_eq!(validate(&[b'A'; 257], ""), Err(Error::CommandTooLong));
        assert_eq!(validate(&[b'A'; 256], ""), Ok(()));
    }

    #[test]
    fn raw_modes() {
        assert_eq!(CompareMode::try_from(0), Ok(CompareMode::None));
        assert_eq!(CompareMode::try_from(1), Ok(CompareMode::Equal));
        assert_eq!(CompareMode::try_from(2), Ok(CompareMode::Return));
        assert_eq!(CompareMode::try_from(3), Ok(CompareMode::Contains));
        assert_eq!(CompareMode::try_from(9), Err(Error::BadMode));
    }

    #[test]
    fn contains_returns_line_length() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("AT+CSQ", &["\r\n+CSQ: 18,99\r\n\r\nOK\r\n"]);
        let mut client = scan_client(modem, &serial);

        let frame = block_on(client.transact("AT+CSQ\r", "CSQ", CompareMode::Contains, 3)).unwrap();
        assert_eq!(frame.len(), 11);
        assert_eq!(frame.text(), "+CSQ: 18,99");
    }

    #[test]
    fn nul_terminates_a_line() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("AT+CSQ", &["+CSQ: 18,99\0"]);
        let mut client = scan_client(modem, &serial);

        let frame = block_on(client.transact("AT+CSQ\r", "CSQ", CompareMode::Contains, 1)).unwrap();
        assert_eq!(frame.text(), "+CSQ: 18,99");
    }

    #[test]
    fn single_byte_lines_are_skipped() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new()
            .on("AT+CSQ", &["O\r+CSQ: 18,99\r\n"])
            .on("AT", &["O\rOK\r"]);
        let mut client = scan_client(modem, &serial);

        let frame = block_on(client.transact("AT+CSQ\r", "", CompareMode::Return, 1)).unwrap();
        assert_eq!(frame.text(), "+CSQ: 18,99");

        serial.0.borrow_mut().rx.clear();
        let frame = block_on(client.transact("AT\r", "O", CompareMode::Contains, 1)).unwrap();
        assert_eq!(frame.text(), "OK");

        serial.0.borrow_mut().rx.clear();
        let res = block_on(client.transact("AT\r", "O", CompareMode::Equal, 1));
        assert_eq!(res, Err(Error::Timeout));
    }

    #[test]
    fn equal_skips_other_lines() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("AT", &["\r\nAT\r\r\nOK\r\n"]);
        let mut client = scan_client(modem, &serial);

        let frame = block_on(client.transact("AT\r", "OK", CompareMode::Equal, 2)).unwrap();
        assert_eq!(frame.text(), "OK");
    }

    #[test]
    fn equal_times_out_after_every_attempt() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("AT", &["\r\nERROR\r\n"]);
        let log = modem.log();
        let mut client = scan_client(modem, &serial);

        let start = Instant::now();
        let res = block_on(client.transact("AT\r", "OK", CompareMode::Equal, 3));
        let elapsed = start.elapsed();

        assert_eq!(res, Err(Error::Timeout));
        assert_eq!(log.borrow().len(), 1);
        let per_attempt = TEST_TIMING.byte_timeout + TEST_TIMING.retry_delay;
        assert!(elapsed >= per_attempt * 3);
        assert!(serial.reads() >= 3);
    }

    #[test]
    fn silent_line_reads_once_per_attempt() {
        let serial = MockSerial::new();
        let mut client = scan_client(ScriptedModem::new(), &serial);

        let res = block_on(client.transact("AT\r", "OK", CompareMode::Equal, 4));
        assert_eq!(res, Err(Error::Timeout));
        assert_eq!(serial.reads(), 4);
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        let serial = MockSerial::new();
        let mut client = scan_client(ScriptedModem::new(), &serial);

        let res = block_on(client.transact("AT\r", "OK", CompareMode::Equal, 0));
        assert_eq!(res, Err(Error::Timeout));
        assert_eq!(serial.reads(), 1);
    }

    #[test]
    fn none_mode_reports_no_content() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("ATE0", &["\r\nOK\r\n"]);
        let mut client = scan_client(modem, &serial);

        let frame = block_on(client.transact("ATE0\r", "", CompareMode::None, 1)).unwrap();
        assert_eq!(frame.len(), 0);
    }

    #[test]
    fn return_mode_is_repeatable() {
        let serial = MockSerial::new();
        let modem = ScriptedModem::new().on("AT+CPSI?", &["\r\n+CPSI: LTE CAT-M1,Online\r\n\r\nOK\r\n"]);
        let mut client = scan_client(modem, &serial);

        let first = block_on(client.transact("AT+CPSI?\r", "", CompareMode::Return, 2)).unwrap();
        // The trailing OK of the first reply is still buffered
        serial.0.borrow_mut().rx.clear();
        let second = block_on(client.transact("AT+CPSI?\r", "", CompareMode::Return, 2)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.text(), "+CPSI: LTE CAT-M1,Online");
    }

    #[test]
    fn mailbox_return_gives_whole_frame() {
        let mailbox = FrameMailbox::<NoopRawMutex>::new();
        let reply = "\r\n+CGNSPWR: 1\r\n\r\nOK\r\n";
        let modem = ScriptedModem::new()
            .with_mailbox(&mailbox)
            .on("AT+CGNSPWR?", &[reply]);
        let mut client = AtClient::new(modem, MailboxPolicy::new(&mailbox), TEST_TIMING);

        let first = block_on(client.transact("AT+CGNSPWR?\r", "", CompareMode::Return, 3)).unwrap();
        let second = block_on(client.transact("AT+CGNSPWR?\r", "", CompareMode::Return, 3)).unwrap();
        assert_eq!(first.text(), reply);
        assert_eq!(first, second);
        assert!(!mailbox.has_frame());
    }

    #[test]
    fn mailbox_discards_stale_frame() {
        let mailbox = FrameMailbox::<NoopRawMutex>::new();
        let modem = ScriptedModem::new()
            .with_mailbox(&mailbox)
            .on("AT+CGREG?", &["\r\n+CGREG: 0,1\r\n\r\nOK\r\n"]);
        let mut client = AtClient::new(modem, MailboxPolicy::new(&mailbox), TEST_TIMING);

        mailbox.publish(Frame::from_slice(b"\r\n+CPSI: NO SERVICE,Online\r\n"));
        let frame = block_on(client.transact("AT+CGREG?\r", "+CGREG", CompareMode::Contains, 1)).unwrap();
        assert_eq!(frame.text(), "+CGREG: 0,1");
    }

    #[test]
    fn mailbox_times_out_without_frame() {
        let mailbox = FrameMailbox::<NoopRawMutex>::new();
        let modem = ScriptedModem::new().with_mailbox(&mailbox);
        let mut client = AtClient::new(modem, MailboxPolicy::new(&mailbox), TEST_TIMING);

        let start = Instant::now();
        let res = block_on(client.transact("AT\r", "", CompareMode::Return, 3));
        assert_eq!(res, Err(Error::Timeout));
        assert!(start.elapsed() >= TEST_TIMING.settle + TEST_TIMING.frame_timeout);
    }

    #[test]
    fn mailbox_equal_mismatch_times_out() {
        let mailbox = FrameMailbox::<NoopRawMutex>::new();
        let modem = ScriptedModem::new()
            .with_mailbox(&mailbox)
            .on("AT", &["\r\nERROR\r\n"]);
        let mut client = AtClient::new(modem, MailboxPolicy::new(&mailbox), TEST_TIMING);

        let res = block_on(client.transact("AT\r", "OK", CompareMode::Equal, 2));
        assert_eq!(res, Err(Error::Timeout));
    }

    #[test]
    fn typed_command_goes_out_verbatim() {
        let mailbox = FrameMailbox::<NoopRawMutex>::new();
        let modem = ScriptedModem::new()
            .with_mailbox(&mailbox)
            .on("AT+CGNSPWR?", &["\r\n+CGNSPWR: 0\r\n\r\nOK\r\n"]);
        let log = modem.log();
        let mut client = AtClient::new(modem, MailboxPolicy::new(&mailbox), TEST_TIMING);

        let frame = block_on(client.send(&GetGnssPower, "+CGNSPWR: 0", CompareMode::Equal, 1)).unwrap();
        assert_eq!(frame.text(), "+CGNSPWR: 0");
        assert_eq!(log.borrow().as_slice(), ["AT+CGNSPWR?"]);
    }
}
