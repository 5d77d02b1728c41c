//! ### 4 - GNSS Commands

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::GnssPowerResponse;
use types::*;

use super::NoResponse;

/// 4.2.1 GNSS power control +CGNSPWR
///
/// The GNSS engine shares the RF path with LTE, it has to be switched off
/// again before attaching to the network.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGNSPWR", NoResponse, termination = "\r")]
pub struct SetGnssPower {
    #[at_arg(position = 0)]
    pub mode: GnssPower,
}

/// 4.2.1 GNSS power control +CGNSPWR
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGNSPWR?", GnssPowerResponse, termination = "\r")]
pub struct GetGnssPower;

/// 4.2.2 GNSS navigation information parsed from NMEA sentences +CGNSINF
///
/// See [`crate::gnss::parse_fix`] for the reply layout.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGNSINF", NoResponse, termination = "\r")]
pub struct GetGnssInfo;
