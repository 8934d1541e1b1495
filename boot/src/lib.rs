/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Verified boot core: slot selection, BDB verification, anti-rollback
    counters and secret derivation.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod context;
mod env;
pub mod nvm;
pub mod secrets;
pub mod slot;

pub use context::{BootContext, ContextFlags};
pub use env::{BootEnv, Platform};
pub use nvm::{NvmStore, NvmrwVar, NVM_MAX_WRITE_RETRY};
pub use secrets::{get_constant, RoSecrets, RwSecrets, SecretType, Secrets};
pub use slot::{Slot, SlotDecision};
