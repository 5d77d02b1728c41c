//! ### 17 - MQTT(S) Commands
//!
//! Only the client configuration is covered. Connecting and publishing are
//! left to the host.

use atat::atat_derive::AtatCmd;

use super::NoResponse;

/// 17.2.1 Set MQTT parameter +SMCONF, broker address
#[derive(Clone, AtatCmd)]
#[at_cmd("+SMCONF", NoResponse, termination = "\r")]
pub struct SetMqttServer<'a> {
    #[at_arg(position = 0, len = 3)]
    pub param: &'a str,
    #[at_arg(position = 1, len = 128)]
    pub url: &'a str,
    #[at_arg(position = 2)]
    pub port: u16,
}

/// 17.2.1 Set MQTT parameter +SMCONF, text valued
#[derive(Clone, AtatCmd)]
#[at_cmd("+SMCONF", NoResponse, termination = "\r")]
pub struct SetMqttParam<'a> {
    #[at_arg(position = 0, len = 16)]
    pub param: &'a str,
    #[at_arg(position = 1, len = 128)]
    pub value: &'a str,
}

/// 17.2.1 Set MQTT parameter +SMCONF, numeric
#[derive(Clone, AtatCmd)]
#[at_cmd("+SMCONF", NoResponse, termination = "\r")]
pub struct SetMqttNumParam<'a> {
    #[at_arg(position = 0, len = 16)]
    pub param: &'a str,
    #[at_arg(position = 1)]
    pub value: u16,
}
