/*++

Licensed under the Apache-2.0 license.

File Name:

    nvm.rs

Abstract:

    File contains API for the non-volatile storage holding the two NVM-RW copies.

--*/

use bdb_error::BootResult;

/// Which NVM-RW copy to access
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NvmCopy {
    Primary,
    Secondary,
}

impl NvmCopy {
    pub const ALL: [NvmCopy; 2] = [NvmCopy::Primary, NvmCopy::Secondary];
}

impl ufmt::uDisplay for NvmCopy {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            NvmCopy::Primary => f.write_str("primary"),
            NvmCopy::Secondary => f.write_str("secondary"),
        }
    }
}

/// NVM device
pub trait NvmDevice {
    /// Fill `buf` from the start of `copy`
    fn read(&mut self, copy: NvmCopy, buf: &mut [u8]) -> BootResult<()>;

    /// Write `buf` to the start of `copy`
    fn write(&mut self, copy: NvmCopy, buf: &[u8]) -> BootResult<()>;
}
