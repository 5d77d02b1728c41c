//! ### 5, 7 - Network service Commands

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::GPRSNetworkRegistrationStatus;

use super::NoResponse;

/// 5.2.x Inquiring UE system information +CPSI
///
/// Reports the system mode (`NO SERVICE`, `GSM`, `LTE CAT-M1`, `LTE NB-IOT`),
/// the operation mode and the serving cell.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CPSI?", NoResponse, termination = "\r")]
pub struct GetSystemInfo;

/// 5.2.x Configure CAT-M or NB-IOT band +CBANDCFG
///
/// The read command answers with one line per radio technology, large
/// enough to be delivered in several frames.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CBANDCFG?", NoResponse, termination = "\r")]
pub struct GetBandConfig;

/// 3.2.x Network registration status +CGREG
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGREG?", GPRSNetworkRegistrationStatus, termination = "\r")]
pub struct GetGPRSNetworkRegistrationStatus;
