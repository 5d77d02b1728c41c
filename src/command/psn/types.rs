//! Argument and parameter types used by Packet Switched Network Commands and Responses
use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PDPContextStatus {
    Deactivated = 0,
    Activated = 1,
}

/// `<action>` of `+CNACT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppNetworkAction {
    Deactivate = 0,
    Activate = 1,
    AutoActivate = 2,
}

/// `<ip_type>` of `+CNCFG`
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdpIpType {
    Dual = 0,
    IPv4 = 1,
    IPv6 = 2,
    NonIp = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthenticationType {
    None = 0,
    PAP = 1,
    CHAP = 2,
    PapOrChap = 3,
}
