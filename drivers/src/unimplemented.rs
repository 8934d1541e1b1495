/*++

Licensed under the Apache-2.0 license.

File Name:

    unimplemented.rs

Abstract:

    File contains the fallback driver used when a target provides no
    implementation for a collaborator. Every operation fails.

--*/

use bdb_error::{BootError, BootResult};
use bdb_types::Sha256Digest;

use crate::{
    HmacSha256Alg, NvmCopy, NvmDevice, PersistentRegister, ResetCtrl, Sha256Alg, SignatureAlg,
};

#[derive(Default, Debug, Copy, Clone)]
pub struct Unimplemented;

impl PersistentRegister for Unimplemented {
    fn read(&mut self) -> BootResult<u32> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }

    fn write(&mut self, _val: u32) -> BootResult<()> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }
}

impl NvmDevice for Unimplemented {
    fn read(&mut self, _copy: NvmCopy, _buf: &mut [u8]) -> BootResult<()> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }

    fn write(&mut self, _copy: NvmCopy, _buf: &[u8]) -> BootResult<()> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }
}

impl ResetCtrl for Unimplemented {
    fn reset_chip(&mut self) {}
}

impl Sha256Alg for Unimplemented {
    fn digest(&mut self, _buf: &[u8]) -> BootResult<Sha256Digest> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }
}

impl HmacSha256Alg for Unimplemented {
    fn hmac(&mut self, _key: &[u8], _data: &[u8]) -> BootResult<Sha256Digest> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }
}

impl SignatureAlg for Unimplemented {
    fn rsa4096_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }

    fn rsa3072b_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }

    fn ecdsa521_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Err(BootError::DRIVER_UNIMPLEMENTED)
    }
}
