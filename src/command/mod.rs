//! AT commands of the SIMCom SIM7070 family\
//! Following the SIM7070_SIM7080_SIM7090 Series AT Command Manual.
//!
//! Every command is terminated by a lone carriage return, the module answers
//! with `\r\n` delimited lines.

pub mod control;
pub mod gnss;
pub mod mobile_control;
pub mod mqtt;
pub mod network_service;
pub mod psn;

use atat::atat_derive::AtatResp;

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Render a command the way it goes out on the wire.
#[cfg(test)]
pub(crate) fn render<C: atat::AtatCmd>(cmd: &C) -> std::string::String {
    let mut buf = [0u8; 512];
    let len = cmd.write(&mut buf);
    std::string::String::from_utf8(buf[..len].to_vec()).unwrap()
}
