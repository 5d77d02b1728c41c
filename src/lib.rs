#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod client;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod frame;
pub mod gnss;
pub mod module_timing;
pub mod pwr;
pub mod reassembler;
pub mod resources;
pub mod response;
pub mod runner;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_helpers;

use atat::AtatCmd;
use client::{AtClient, CompareMode, MailboxPolicy};
use config::ModemConfig;
use control::Control;
use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    mutex::{Mutex, MutexGuard},
};
use embedded_io_async::{Read, Write};
use error::Error;
use frame::Frame;
use module_timing::Timing;
use reassembler::FrameReassembler;
use resources::Resources;
use runner::Runner;
use transport::SerialControl;

/// AT client collecting replies from the frame reassembler.
pub type MailboxClient<'d, M, W> = AtClient<W, MailboxPolicy<'d, M>>;

/// Shared access to the AT client. Every call holds the client for the whole
/// transaction, so at most one command is in flight.
pub struct AtHandle<'d, M: RawMutex, W>(&'d Mutex<M, MailboxClient<'d, M, W>>);

impl<M: RawMutex, W> Clone for AtHandle<'_, M, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, W> Copy for AtHandle<'_, M, W> {}

impl<'d, M: RawMutex, W: Write> AtHandle<'d, M, W> {
    pub async fn send<Cmd: AtatCmd>(
        &self,
        cmd: &Cmd,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.0.lock().await.send(cmd, expect, mode, retries).await
    }

    pub async fn transact(
        &self,
        cmd: &str,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.0.lock().await.transact(cmd, expect, mode, retries).await
    }

    pub async fn transact_raw(
        &self,
        cmd: &str,
        expect: &str,
        mode: u8,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.0
            .lock()
            .await
            .transact_raw(cmd, expect, mode, retries)
            .await
    }

    /// Exclusive access for exchanges spanning more than one frame.
    pub async fn lock(&self) -> MutexGuard<'d, M, MailboxClient<'d, M, W>> {
        self.0.lock().await
    }
}

pub struct State<'d, M: RawMutex, W> {
    at: Mutex<M, MailboxClient<'d, M, W>>,
}

impl<'d, M: RawMutex, W: Write> State<'d, M, W> {
    pub fn new<const EVENT_CAPACITY: usize>(
        resources: &'d Resources<M, EVENT_CAPACITY>,
        tx: W,
        timing: Timing,
    ) -> Self {
        Self {
            at: Mutex::new(AtClient::new(
                tx,
                MailboxPolicy::new(&resources.mailbox),
                timing,
            )),
        }
    }
}

/// Wire up the driver.
///
/// The [`FrameReassembler`] and the [`Runner`] must each be run in a
/// background task, the [`Control`] is for the host.
pub fn new<'d, M, R, W, C, const EVENT_CAPACITY: usize>(
    resources: &'d Resources<M, EVENT_CAPACITY>,
    state: &'d State<'d, M, W>,
    rx: R,
    config: C,
) -> (
    FrameReassembler<'d, M, R, EVENT_CAPACITY>,
    Runner<'d, M, W, C>,
    Control<'d, M, W>,
)
where
    M: RawMutex,
    R: Read + SerialControl,
    W: Write,
    C: ModemConfig<'d>,
{
    let reassembler = FrameReassembler::new(
        rx,
        resources.events.receiver(),
        &resources.mailbox,
        C::TIMING,
    );
    let runner = Runner::new(AtHandle(&state.at), &resources.status, config);
    let control = Control::new(AtHandle(&state.at), &resources.status);

    (reassembler, runner, control)
}
