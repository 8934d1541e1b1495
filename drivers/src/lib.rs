/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the collaborator drivers used by the boot core.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod extend;
mod mem;
mod nvm;
mod persistent;
pub mod printer;
mod reset;
mod sha256;
mod sig;
mod unimplemented;

pub use extend::{AccelExtend, HashExtend, Sha256Accel, Sha256Extend, SoftSha256Accel};
pub use mem::{MemNvm, MemRegister, MemReset};
pub use nvm::{NvmCopy, NvmDevice};
pub use persistent::{PersistentFlags, PersistentRegister};
pub use reset::ResetCtrl;
pub use sha256::{HmacSha256Alg, Sha256Alg, SoftSha256};
pub use sig::SignatureAlg;
pub use unimplemented::Unimplemented;
