//! Responses for Network service Commands
use atat::atat_derive::AtatResp;
use heapless::String;

use super::types::RegistrationStatus;
use super::GetGPRSNetworkRegistrationStatus;
use crate::response::{info_line, parse_info, Fields};

pub const SYSTEM_INFO_PREFIX: &str = "+CPSI:";
pub const BAND_CONFIG_PREFIX: &str = "+CBANDCFG:";
pub const GPRS_REGISTRATION_PREFIX: &str = "+CGREG:";

/// System mode reported while the module has no cell to camp on
pub const NO_SERVICE: &str = "NO SERVICE";

/// System mode out of a `+CPSI: <system mode>,<operation mode>,...` reply.
pub fn system_mode(text: &str) -> Option<&str> {
    let body = info_line(text, SYSTEM_INFO_PREFIX)?;
    Fields::new(body).get(0).map(str::trim)
}

/// Whether a `+CPSI?` reply reports a usable cell. Replies without a system
/// mode count as no service.
pub fn has_service(text: &str) -> bool {
    matches!(system_mode(text), Some(mode) if mode != NO_SERVICE)
}

/// Radio technology of the first band configuration line,
/// `+CBANDCFG: "CAT-M",1,2,3,...`.
pub fn band_technology(text: &str) -> Option<&str> {
    let body = info_line(text, BAND_CONFIG_PREFIX)?;
    Fields::new(body).get_unquoted(0)
}

/// 3.2.x Network registration status +CGREG
///
/// Location fields are only present with `<n> = 2`.
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct GPRSNetworkRegistrationStatus {
    #[at_arg(position = 0)]
    pub n: u8,
    #[at_arg(position = 1)]
    pub stat: RegistrationStatus,
    #[at_arg(position = 2)]
    pub lac: Option<String<8>>,
    #[at_arg(position = 3)]
    pub ci: Option<String<12>>,
}

/// `<stat>` of a `+CGREG: <n>,<stat>[,...]` reply frame.
pub fn gprs_registration(text: &str) -> Option<RegistrationStatus> {
    parse_info(
        &GetGPRSNetworkRegistrationStatus,
        text,
        GPRS_REGISTRATION_PREFIX,
    )
    .map(|resp| resp.stat)
}
