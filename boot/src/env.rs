/*++

Licensed under the Apache-2.0 license.

File Name:

    env.rs

Abstract:

    File contains the platform environment consumed by the boot core.

--*/

use bdb_drivers::{
    HmacSha256Alg, NvmCopy, NvmDevice, PersistentRegister, ResetCtrl, Sha256Alg, SignatureAlg,
};
use bdb_error::BootResult;
use bdb_types::Sha256Digest;
use bdb_verify::BdbVerificationEnv;

/// Boot Environment
pub trait BootEnv: BdbVerificationEnv {
    /// Read the persistent boot register
    fn vboot_register(&mut self) -> BootResult<u32>;

    /// Write the persistent boot register
    fn set_vboot_register(&mut self, val: u32) -> BootResult<()>;

    /// Fill `buf` from the start of an NVM-RW copy
    fn read_nvm(&mut self, copy: NvmCopy, buf: &mut [u8]) -> BootResult<()>;

    /// Write `buf` to the start of an NVM-RW copy
    fn write_nvm(&mut self, copy: NvmCopy, buf: &[u8]) -> BootResult<()>;

    /// Calculate HMAC-SHA256
    fn hmac_sha256(&mut self, key: &[u8], data: &[u8]) -> BootResult<Sha256Digest>;

    /// Reset the chip. Returns only on hosts that emulate the reset.
    fn reset_chip(&mut self);
}

/// Combines the individual drivers into a `BootEnv`
#[derive(Default, Debug, Clone)]
pub struct Platform<R, N, T, C> {
    pub register: R,
    pub nvm: N,
    pub reset: T,
    pub crypto: C,
}

impl<R, N, T, C> Platform<R, N, T, C> {
    pub fn new(register: R, nvm: N, reset: T, crypto: C) -> Self {
        Self {
            register,
            nvm,
            reset,
            crypto,
        }
    }
}

impl<R, N, T, C> BdbVerificationEnv for Platform<R, N, T, C>
where
    C: Sha256Alg + SignatureAlg,
{
    fn sha256_digest(&mut self, data: &[u8]) -> BootResult<Sha256Digest> {
        self.crypto.digest(data)
    }

    fn rsa4096_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        self.crypto.rsa4096_verify(key_data, sig_data, digest)
    }

    fn rsa3072b_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        self.crypto.rsa3072b_verify(key_data, sig_data, digest)
    }

    fn ecdsa521_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        self.crypto.ecdsa521_verify(key_data, sig_data, digest)
    }
}

impl<R, N, T, C> BootEnv for Platform<R, N, T, C>
where
    R: PersistentRegister,
    N: NvmDevice,
    T: ResetCtrl,
    C: Sha256Alg + HmacSha256Alg + SignatureAlg,
{
    fn vboot_register(&mut self) -> BootResult<u32> {
        self.register.read()
    }

    fn set_vboot_register(&mut self, val: u32) -> BootResult<()> {
        self.register.write(val)
    }

    fn read_nvm(&mut self, copy: NvmCopy, buf: &mut [u8]) -> BootResult<()> {
        self.nvm.read(copy, buf)
    }

    fn write_nvm(&mut self, copy: NvmCopy, buf: &[u8]) -> BootResult<()> {
        self.nvm.write(copy, buf)
    }

    fn hmac_sha256(&mut self, key: &[u8], data: &[u8]) -> BootResult<Sha256Digest> {
        self.crypto.hmac(key, data)
    }

    fn reset_chip(&mut self) {
        self.reset.reset_chip()
    }
}
