//! ### 3, 6, 16 - Packet Switched Network Commands
//!
//! PDP context definition and activation, followed by the activation of the
//! application network the module's internet services (ping, MQTT) run on.

pub mod types;

use atat::atat_derive::AtatCmd;
use types::*;

use super::NoResponse;

/// 3.2.x Define PDP context +CGDCONT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse, termination = "\r")]
pub struct SetPDPContextDefinition<'a> {
    #[at_arg(position = 0)]
    pub cid: u8,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'a str,
    #[at_arg(position = 2, len = 99)]
    pub apn: &'a str,
    #[at_arg(position = 3, len = 15)]
    pub pdp_addr: &'a str,
}

/// 3.2.x Define PDP context +CGDCONT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGDCONT?", NoResponse, termination = "\r")]
pub struct GetPDPContextDefinition;

/// 3.2.x Show PDP address +CGPADDR
///
/// Addresses of every defined context.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGPADDR", NoResponse, termination = "\r")]
pub struct GetPDPAddress;

/// 3.2.x PDP context activate or deactivate +CGACT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGACT", NoResponse, termination = "\r")]
pub struct SetPDPContextState {
    #[at_arg(position = 0)]
    pub status: PDPContextStatus,
    #[at_arg(position = 1)]
    pub cid: u8,
}

/// 3.2.x PDP context activate or deactivate +CGACT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGACT?", NoResponse, termination = "\r")]
pub struct GetPDPContextState;

/// 6.2.x Configure PDP +CNCFG
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNCFG", NoResponse, termination = "\r")]
pub struct SetPdpConfig<'a> {
    #[at_arg(position = 0)]
    pub pdp_idx: u8,
    #[at_arg(position = 1)]
    pub ip_type: PdpIpType,
    #[at_arg(position = 2, len = 99)]
    pub apn: &'a str,
}

/// 6.2.x Configure PDP +CNCFG, with credentials
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNCFG", NoResponse, termination = "\r")]
pub struct SetPdpConfigAuth<'a> {
    #[at_arg(position = 0)]
    pub pdp_idx: u8,
    #[at_arg(position = 1)]
    pub ip_type: PdpIpType,
    #[at_arg(position = 2, len = 99)]
    pub apn: &'a str,
    #[at_arg(position = 3, len = 64)]
    pub username: &'a str,
    #[at_arg(position = 4, len = 64)]
    pub password: &'a str,
    #[at_arg(position = 5)]
    pub authentication: AuthenticationType,
}

/// 6.2.x APP network active +CNACT
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNACT", NoResponse, termination = "\r")]
pub struct SetAppNetworkActive {
    #[at_arg(position = 0)]
    pub pdp_idx: u8,
    #[at_arg(position = 1)]
    pub action: AppNetworkAction,
}

/// 6.2.x APP network active +CNACT
///
/// One `+CNACT: <pdpidx>,<statusx>,<address>` line per context.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNACT?", NoResponse, termination = "\r")]
pub struct GetAppNetworkActive;

/// 16.2.x Select PDP index for PING +SNPDPID
#[derive(Clone, AtatCmd)]
#[at_cmd("+SNPDPID", NoResponse, termination = "\r")]
pub struct SetPingPdp {
    #[at_arg(position = 0)]
    pub pdp_idx: u8,
}

/// 16.2.x Send IPv4 PING +SNPING4
#[derive(Clone, AtatCmd)]
#[at_cmd("+SNPING4", NoResponse, termination = "\r")]
pub struct Ping<'a> {
    #[at_arg(position = 0, len = 64)]
    pub host: &'a str,
    #[at_arg(position = 1)]
    pub count: u16,
    #[at_arg(position = 2)]
    pub size: u16,
    /// Milliseconds
    #[at_arg(position = 3)]
    pub timeout: u32,
}
