//! ### 2 - V.25TER and serial interface control

use atat::atat_derive::AtatCmd;

use super::NoResponse;

/// 2.2.x Set command echo mode E
///
/// Echo off. Replies no longer repeat the command line in front of the
/// result.
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, value_sep = false, termination = "\r")]
pub struct SetEchoOff;

/// 2.2.x Set TE-TA fixed local rate +IPR
///
/// Answered at whatever rate the module auto-bauds on, which makes it the
/// probe used while synchronizing the link.
#[derive(Clone, AtatCmd)]
#[at_cmd("+IPR", NoResponse, termination = "\r")]
pub struct SetDataRate {
    #[at_arg(position = 0)]
    pub rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::render;

    #[test]
    fn echo_off() {
        assert_eq!(render(&SetEchoOff), "ATE0\r");
    }

    #[test]
    fn data_rate() {
        assert_eq!(render(&SetDataRate { rate: 9600 }), "AT+IPR=9600\r");
    }
}
