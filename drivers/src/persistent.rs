/*++

Licensed under the Apache-2.0 license.

File Name:

    persistent.rs

Abstract:

    File contains API for the persistent vboot register, which survives a
    chip reset but not a power cycle.

--*/

use bdb_error::BootResult;
use bitflags::bitflags;

bitflags! {
    /// Bits of the persistent vboot register
    #[derive(Default)]
    pub struct PersistentFlags: u32 {
        /// Next boot should enter recovery
        const RECOVERY_REQUEST = 0x0000_0001;

        /// Boot the secondary slot instead of the primary
        const TRY_SECONDARY_BDB = 0x0000_0002;

        /// Last attempt on the primary slot did not reach finalize
        const FAILED_RW_PRIMARY = 0x0000_0004;

        /// Last attempt on the secondary slot did not reach finalize
        const FAILED_RW_SECONDARY = 0x0000_0008;
    }
}

/// Persistent register access
pub trait PersistentRegister {
    /// Read the raw register value
    fn read(&mut self) -> BootResult<u32>;

    /// Write the raw register value
    fn write(&mut self, val: u32) -> BootResult<()>;
}
