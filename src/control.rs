use atat::AtatCmd;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_io_async::Write;

use crate::{
    client::CompareMode,
    error::Error,
    frame::Frame,
    gnss::Fix,
    state::{ProvisioningState, Status},
    AtHandle,
};

/// Host side handle to the module.
///
/// Commands issued here queue behind the one the runner may have in flight.
pub struct Control<'d, M: RawMutex, W> {
    at: AtHandle<'d, M, W>,
    status: &'d Status<M>,
}

impl<'d, M: RawMutex, W: Write> Control<'d, M, W> {
    pub(crate) fn new(at: AtHandle<'d, M, W>, status: &'d Status<M>) -> Self {
        Self { at, status }
    }

    pub fn provisioning_state(&self) -> ProvisioningState {
        self.status.state(None)
    }

    pub async fn wait_for_state(&self, state: ProvisioningState) {
        self.status.wait_for_state(state).await
    }

    /// Most recent valid GNSS fix.
    pub fn last_fix(&self) -> Option<Fix> {
        self.status.last_fix()
    }

    /// Wait until the runner has a valid GNSS fix.
    pub async fn wait_for_fix(&self) -> Fix {
        self.status.wait_for_fix().await
    }

    pub async fn transact(
        &mut self,
        cmd: &str,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.at.transact(cmd, expect, mode, retries).await
    }

    pub async fn transact_raw(
        &mut self,
        cmd: &str,
        expect: &str,
        mode: u8,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.at.transact_raw(cmd, expect, mode, retries).await
    }

    pub async fn send<Cmd: AtatCmd>(
        &mut self,
        cmd: &Cmd,
        expect: &str,
        mode: CompareMode,
        retries: u8,
    ) -> Result<Frame, Error> {
        self.at.send(cmd, expect, mode, retries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resources::Resources,
        test_helpers::{MockSerial, ScriptedModem, TestConfig, TEST_TIMING},
        State,
    };
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn host_transactions() {
        let resources = Resources::<NoopRawMutex, 8>::new();
        let modem = ScriptedModem::new()
            .with_mailbox(resources.mailbox())
            .on("AT+CSQ", &["\r\n+CSQ: 18,99\r\n\r\nOK\r\n"]);
        let state = State::new(&resources, modem, TEST_TIMING);
        let (_reassembler, _runner, mut control) =
            crate::new(&resources, &state, MockSerial::new(), TestConfig::default());

        let frame = block_on(control.transact("AT+CSQ\r", "CSQ", CompareMode::Contains, 1)).unwrap();
        assert_eq!(frame.len(), 11);

        assert_eq!(
            block_on(control.transact_raw("AT+CSQ\r", "CSQ", 7, 1)),
            Err(Error::BadMode)
        );
        assert_eq!(control.provisioning_state(), ProvisioningState::BaudSync);
        assert_eq!(control.last_fix(), None);
    }
}
