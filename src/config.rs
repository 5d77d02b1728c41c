use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::module_timing::Timing;

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub trait ModemConfig<'a> {
    type PowerPin: OutputPin;

    const BAUD_RATE: u32 = 9600;
    const FLOW_CONTROL: bool = false;

    /// Attempts per transaction issued by the provisioning sequence
    const COMMAND_RETRIES: u8 = 3;

    /// Unanswered baud rate commands before the module is power cycled
    const BAUD_SYNC_ATTEMPTS: u16 = 50;
    /// Unanswered echo commands before the module is power cycled
    const ECHO_OFF_ATTEMPTS: u16 = 15;

    /// Consecutive valid fixes needed before GNSS is switched off again
    const REQUIRED_FIXES: u8 = 3;
    /// Upper bound of GNSS info polls before giving up on a fix
    const MAX_FIX_POLLS: u16 = 120;

    /// Radio access technology the band configuration is expected to report
    const RADIO_TECHNOLOGY: &'a str = "CAT-M";
    /// Leave the network check loop for bearer setup once the configured
    /// technology is reported. Off by default, where the band check always
    /// returns to the network status check.
    const BAND_CHECK_ADVANCES: bool = false;
    /// Frames accumulated while waiting for the band configuration to end
    const MAX_BAND_FRAMES: u8 = 8;

    const APN: Apn<'a> = Apn::None;

    const PING_HOST: Option<&'a str> = Some("8.8.8.8");
    const PING_COUNT: u8 = 2;

    const MQTT: Option<MqttConfig<'a>> = None;

    const TIMING: Timing = Timing::SIM7070;

    fn power_pin(&mut self) -> Option<&mut Self::PowerPin>;

    fn serial_config() -> SerialConfig {
        SerialConfig {
            baud_rate: Self::BAUD_RATE,
            flow_control: if Self::FLOW_CONTROL {
                FlowControl::RtsCts
            } else {
                FlowControl::None
            },
            ..SerialConfig::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum Apn<'a> {
    None,
    Given {
        name: &'a str,
        username: Option<&'a str>,
        password: Option<&'a str>,
    },
}

impl Default for Apn<'_> {
    fn default() -> Self {
        Self::None
    }
}

/// Parameters pushed to the module's MQTT client with `AT+SMCONF`
#[derive(Debug, Clone)]
pub struct MqttConfig<'a> {
    pub url: &'a str,
    pub port: u16,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub client_id: &'a str,
    pub qos: u8,
    pub topic: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    None,
    RtsCts,
}

/// Line settings handed to the transport by the frame reassembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}
