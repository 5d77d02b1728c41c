//! ### 3 - Mobile equipment control and status Commands

pub mod types;

use atat::atat_derive::AtatCmd;
use types::*;

use super::NoResponse;

/// 3.2.x Set phone functionality +CFUN
#[derive(Clone, AtatCmd)]
#[at_cmd("+CFUN", NoResponse, termination = "\r")]
pub struct SetModuleFunctionality {
    #[at_arg(position = 0)]
    pub fun: Functionality,
    #[at_arg(position = 1)]
    pub rst: Option<ResetMode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::render;

    #[test]
    fn full_functionality_without_reset() {
        let cmd = SetModuleFunctionality {
            fun: Functionality::Full,
            rst: Some(ResetMode::DontReset),
        };
        assert_eq!(render(&cmd), "AT+CFUN=1,0\r");
    }
}
