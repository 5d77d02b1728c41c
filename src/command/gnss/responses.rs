//! Responses for GNSS Commands
use atat::atat_derive::AtatResp;

use super::types::GnssPower;
use super::GetGnssPower;
use crate::response::parse_info;

pub const GNSS_POWER_PREFIX: &str = "+CGNSPWR:";

/// 4.2.1 GNSS power control +CGNSPWR
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct GnssPowerResponse {
    #[at_arg(position = 0)]
    pub mode: GnssPower,
}

/// Power state out of a `+CGNSPWR: <mode>` reply frame, `None` when the frame
/// does not carry one.
pub fn gnss_power(text: &str) -> Option<GnssPower> {
    parse_info(&GetGnssPower, text, GNSS_POWER_PREFIX).map(|resp| resp.mode)
}
