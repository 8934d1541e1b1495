/*++

Licensed under the Apache-2.0 license.

File Name:

    mem.rs

Abstract:

    File contains RAM-backed register, NVM and reset doubles for host builds.

--*/

use bdb_error::{BootError, BootResult};
use bdb_types::NVM_RW_MAX_STRUCT_SIZE;

use crate::{NvmCopy, NvmDevice, PersistentRegister, ResetCtrl};

/// Persistent register held in RAM
#[derive(Default, Debug, Clone)]
pub struct MemRegister {
    pub value: u32,
}

impl PersistentRegister for MemRegister {
    fn read(&mut self) -> BootResult<u32> {
        Ok(self.value)
    }

    fn write(&mut self, val: u32) -> BootResult<()> {
        self.value = val;
        Ok(())
    }
}

/// Two NVM-RW copies held in RAM, with fault injection
#[derive(Debug, Clone)]
pub struct MemNvm {
    copies: [[u8; NVM_RW_MAX_STRUCT_SIZE]; 2],

    /// Number of upcoming writes that land with their first byte flipped
    pub corrupt_writes: u32,

    /// Copy whose reads fail
    pub fail_reads: Option<NvmCopy>,

    /// Successful `write` calls per copy
    pub write_count: [u32; 2],
}

impl Default for MemNvm {
    fn default() -> Self {
        Self {
            copies: [[0xff; NVM_RW_MAX_STRUCT_SIZE]; 2],
            corrupt_writes: 0,
            fail_reads: None,
            write_count: [0; 2],
        }
    }
}

impl MemNvm {
    fn index(copy: NvmCopy) -> usize {
        match copy {
            NvmCopy::Primary => 0,
            NvmCopy::Secondary => 1,
        }
    }

    /// Raw contents of `copy`
    pub fn copy(&self, copy: NvmCopy) -> &[u8; NVM_RW_MAX_STRUCT_SIZE] {
        &self.copies[Self::index(copy)]
    }

    /// Mutable raw contents of `copy`, for seeding or corrupting
    pub fn copy_mut(&mut self, copy: NvmCopy) -> &mut [u8; NVM_RW_MAX_STRUCT_SIZE] {
        &mut self.copies[Self::index(copy)]
    }
}

impl NvmDevice for MemNvm {
    fn read(&mut self, copy: NvmCopy, buf: &mut [u8]) -> BootResult<()> {
        if self.fail_reads == Some(copy) {
            return Err(BootError::NVM_READ);
        }
        let src = self
            .copies[Self::index(copy)]
            .get(..buf.len())
            .ok_or(BootError::NVM_READ)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, copy: NvmCopy, buf: &[u8]) -> BootResult<()> {
        let idx = Self::index(copy);
        let dst = self.copies[idx]
            .get_mut(..buf.len())
            .ok_or(BootError::NVM_WRITE)?;
        dst.copy_from_slice(buf);
        if self.corrupt_writes > 0 {
            self.corrupt_writes -= 1;
            if let Some(b) = dst.first_mut() {
                *b ^= 0xff;
            }
        }
        self.write_count[idx] += 1;
        Ok(())
    }
}

/// Records reset requests instead of resetting
#[derive(Default, Debug, Clone)]
pub struct MemReset {
    pub resets: u32,
}

impl ResetCtrl for MemReset {
    fn reset_chip(&mut self) {
        self.resets += 1;
    }
}
