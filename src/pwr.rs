use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin as _;

use crate::{config::ModemConfig, error::Error, module_timing::Timing};

/// Power key sequence used to cycle the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetMode {
    /// Two pulses: switch the module off, then on again
    Full,
    /// One pulse, flipping the module's power state
    Toggle,
}

impl ResetMode {
    pub const fn from_raw(mode: u8) -> Option<Self> {
        match mode {
            2 => Some(Self::Full),
            1 => Some(Self::Toggle),
            _ => None,
        }
    }
}

pub struct PwrCtrl<'b, C> {
    config: &'b mut C,
    timing: Timing,
}

impl<'a, 'b, C> PwrCtrl<'b, C>
where
    C: ModemConfig<'a>,
{
    pub fn new(config: &'b mut C) -> Self {
        Self {
            config,
            timing: C::TIMING,
        }
    }

    /// Drive the power key through the sequence of `mode`.
    ///
    /// Every pulse holds the key high for `Timing::power_hold`. A full reset
    /// rests `Timing::power_off_pause` between its two pulses, both modes end
    /// with `Timing::power_settle` low.
    pub async fn power_cycle(&mut self, mode: ResetMode) -> Result<(), Error> {
        info!("Power cycling modem: {:?}", mode);
        match mode {
            ResetMode::Full => {
                self.pulse(self.timing.power_off_pause).await?;
                self.pulse(self.timing.power_settle).await
            }
            ResetMode::Toggle => self.pulse(self.timing.power_settle).await,
        }
    }

    /// [`Self::power_cycle`] from a raw mode number, 2 for a full reset and
    /// 1 for a toggle. Other values leave the line untouched.
    pub async fn power_cycle_raw(&mut self, mode: u8) -> Result<(), Error> {
        match ResetMode::from_raw(mode) {
            Some(mode) => self.power_cycle(mode).await,
            None => {
                warn!("Invalid reset mode {}", mode);
                Err(Error::InvalidResetMode)
            }
        }
    }

    async fn pulse(&mut self, rest: Duration) -> Result<(), Error> {
        let hold = self.timing.power_hold;
        let Some(pin) = self.config.power_pin() else {
            warn!("No power pin configured");
            return Ok(());
        };

        pin.set_high().map_err(|_| Error::IoPin)?;
        Timer::after(hold).await;
        pin.set_low().map_err(|_| Error::IoPin)?;
        Timer::after(rest).await;
        Ok(())
    }
}
