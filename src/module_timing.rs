use embassy_time::Duration;

/// Delays and timeouts used when talking to the module.
///
/// `Timing::SIM7070` holds the values the SIM7070 family needs on a 9600 baud
/// link. Every blocking wait in the crate takes its bound from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Upper bound for the transmitter to drain after a command write
    pub tx_drain: Duration,
    /// Pause between a command write and reading the reply from the mailbox
    pub settle: Duration,
    /// How long to wait for a frame to show up in the mailbox
    pub frame_timeout: Duration,
    /// Per byte read timeout of the byte scanning policy
    pub byte_timeout: Duration,
    /// Pause between two attempts of the byte scanning policy
    pub retry_delay: Duration,

    /// Window in which a second data event is merged into the same frame
    pub coalesce_window: Duration,
    /// Upper bound to read the bytes announced by a data event
    pub data_read: Duration,
    /// Upper bound to read the body and payload of a pattern event
    pub pattern_read: Duration,

    /// Pause between two ticks of the provisioning sequence
    pub state_delay: Duration,
    pub baud_retry_delay: Duration,
    pub echo_retry_delay: Duration,
    /// Gap between consecutive commands of a batch
    pub command_gap: Duration,
    /// Gap before commands that trigger network activity
    pub long_command_gap: Duration,
    /// Gap between two frames of a multi-frame reply
    pub band_frame_gap: Duration,
    pub mqtt_step_gap: Duration,

    /// Time the power key is held high
    pub power_hold: Duration,
    /// Time the power key rests low between the two pulses of a full reset
    pub power_off_pause: Duration,
    /// Time the power key rests low after the last pulse
    pub power_settle: Duration,
    /// Time to wait for the module to boot after a power cycle
    pub boot_wait: Duration,
}

impl Timing {
    pub const SIM7070: Self = Self {
        tx_drain: Duration::from_millis(100),
        settle: Duration::from_millis(1777),
        frame_timeout: Duration::from_millis(300),
        byte_timeout: Duration::from_millis(50),
        retry_delay: Duration::from_millis(100),

        coalesce_window: Duration::from_millis(20),
        data_read: Duration::from_millis(100),
        pattern_read: Duration::from_millis(100),

        state_delay: Duration::from_millis(1500),
        baud_retry_delay: Duration::from_millis(2500),
        echo_retry_delay: Duration::from_millis(2000),
        command_gap: Duration::from_millis(703),
        long_command_gap: Duration::from_millis(1703),
        band_frame_gap: Duration::from_millis(83),
        mqtt_step_gap: Duration::from_millis(503),

        power_hold: Duration::from_millis(1500),
        power_off_pause: Duration::from_millis(5000),
        power_settle: Duration::from_millis(1000),
        boot_wait: Duration::from_millis(5000),
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::SIM7070
    }
}
