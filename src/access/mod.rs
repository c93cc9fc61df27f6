use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{SuretyError, SuretyResult};
use crate::primitives::Address;

/// Operational flag, administrative owner and the allowlist of callers
/// permitted to mutate the registries directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
    operational: bool,
    authorized_callers: HashSet<Address>,
}

impl AccessControl {
    pub fn new(owner: Address) -> Self {
        AccessControl {
            owner,
            operational: true,
            authorized_callers: HashSet::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn require_operational(&self) -> SuretyResult<()> {
        if self.operational {
            Ok(())
        } else {
            Err(SuretyError::NotOperational)
        }
    }

    pub fn require_owner(&self, caller: &Address) -> SuretyResult<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(SuretyError::AccessDenied(format!(
                "{} is not the contract owner",
                caller
            )))
        }
    }

    pub fn require_authorized(&self, caller: &Address) -> SuretyResult<()> {
        if self.authorized_callers.contains(caller) {
            Ok(())
        } else {
            Err(SuretyError::AccessDenied(format!(
                "{} is not an authorized caller",
                caller
            )))
        }
    }

    /// Flip the operational flag. Owner only, and allowed while paused.
    pub fn set_operational(&mut self, caller: &Address, operational: bool) -> SuretyResult<()> {
        self.require_owner(caller)?;
        self.operational = operational;
        Ok(())
    }

    pub fn authorize_caller(&mut self, caller: &Address, target: Address) -> SuretyResult<()> {
        self.require_owner(caller)?;
        self.require_operational()?;
        self.authorized_callers.insert(target);
        Ok(())
    }

    pub fn deauthorize_caller(&mut self, caller: &Address, target: &Address) -> SuretyResult<()> {
        self.require_owner(caller)?;
        self.require_operational()?;
        self.authorized_callers.remove(target);
        Ok(())
    }

    pub fn is_authorized(&self, target: &Address) -> bool {
        self.authorized_callers.contains(target)
    }
}
