//! Auditable ownership record with a two-step handover.
//!
//! The current owner nominates a successor; nothing changes until the
//! nominee accepts. Used for the farming owner and the governor guardian.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not the pending owner")]
    NotPendingOwner { caller: Address },

    #[error("no ownership transfer is pending")]
    NoPendingOwner,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    owner: Option<Address>,
    pending: Option<Address>,
}

impl Authority {
    pub fn new(owner: Address) -> Self {
        Self {
            owner: Some(owner),
            pending: None,
        }
    }

    /// Current owner, `None` once renounced.
    pub fn owner(&self) -> Option<&Address> {
        self.owner.as_ref()
    }

    pub fn pending(&self) -> Option<&Address> {
        self.pending.as_ref()
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner.as_ref() == Some(caller)
    }

    pub fn ensure_owner(&self, caller: &Address) -> Result<(), AuthorityError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(AuthorityError::NotOwner {
                caller: caller.clone(),
            })
        }
    }

    /// Nominate `next` as the successor. Replaces any earlier nomination.
    pub fn transfer(&mut self, caller: &Address, next: Address) -> Result<(), AuthorityError> {
        self.ensure_owner(caller)?;
        self.pending = Some(next);
        Ok(())
    }

    /// Complete the handover. Only the nominee may accept.
    pub fn accept(&mut self, caller: &Address) -> Result<(), AuthorityError> {
        match &self.pending {
            None => Err(AuthorityError::NoPendingOwner),
            Some(p) if p != caller => Err(AuthorityError::NotPendingOwner {
                caller: caller.clone(),
            }),
            Some(_) => {
                self.owner = self.pending.take();
                Ok(())
            }
        }
    }

    /// Give up ownership permanently.
    pub fn renounce(&mut self, caller: &Address) -> Result<(), AuthorityError> {
        self.ensure_owner(caller)?;
        self.owner = None;
        self.pending = None;
        Ok(())
    }
}
