/*++

Licensed under the Apache-2.0 license.

File Name:

    nvm.rs

Abstract:

    File contains the dual-copy, HMAC-sealed NVM-RW counter store.

--*/

use bdb_drivers::printer::ErrCode;
use bdb_drivers::{cprintln, NvmCopy};
use bdb_error::{BootError, BootResult};
use bdb_types::*;
use core::mem::size_of;
use subtle::ConstantTimeEq;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

use crate::BootEnv;

/// Write attempts per copy before the store is presumed corrupted
pub const NVM_MAX_WRITE_RETRY: u32 = 3;

const NVM_RW_EXT_SIZE: usize = NVM_RW_MAX_STRUCT_SIZE - NVM_RW_MIN_STRUCT_SIZE;

/// Fields readable before `struct_size` is known
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned)]
struct NvmrwPrefix {
    struct_magic: U32<LittleEndian>,
    struct_major_version: u8,
    struct_minor_version: u8,
    struct_size: U16<LittleEndian>,
}

const _: () = assert!(size_of::<NvmrwPrefix>() == NVM_RW_PREFIX_SIZE);

/// Working copy with room for the largest record any minor version may store
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Copy, Clone)]
struct NvmrwBuf {
    rec: Nvmrw,
    ext: [u8; NVM_RW_EXT_SIZE],
}

const _: () = assert!(size_of::<NvmrwBuf>() == NVM_RW_MAX_STRUCT_SIZE);

impl NvmrwBuf {
    fn new() -> Self {
        Self {
            rec: Nvmrw::new(),
            ext: [0; NVM_RW_EXT_SIZE],
        }
    }

    fn update_count(&self) -> u32 {
        self.rec.update_count.get()
    }
}

/// NVM-RW variable
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NvmrwVar {
    UpdateCount,
    Flags,
    MinKernelDataKeyVersion,
    MinKernelVersion,
    BucType,
}

impl TryFrom<u32> for NvmrwVar {
    type Error = BootError;

    fn try_from(value: u32) -> BootResult<Self> {
        match value {
            0 => Ok(NvmrwVar::UpdateCount),
            1 => Ok(NvmrwVar::Flags),
            2 => Ok(NvmrwVar::MinKernelDataKeyVersion),
            3 => Ok(NvmrwVar::MinKernelVersion),
            4 => Ok(NvmrwVar::BucType),
            _ => Err(BootError::NVM_VAR),
        }
    }
}

fn check_prefix(buf: &[u8]) -> BootResult<usize> {
    let (prefix, _) = LayoutVerified::<&[u8], NvmrwPrefix>::new_unaligned_from_prefix(buf)
        .ok_or(BootError::NVM_STRUCT_SIZE)?;

    if prefix.struct_magic.get() != NVM_RW_MAGIC {
        return Err(BootError::NVM_RW_MAGIC);
    }
    if prefix.struct_major_version != NVM_HEADER_VERSION_MAJOR {
        return Err(BootError::NVM_STRUCT_VERSION);
    }
    let size = prefix.struct_size.get() as usize;
    if !(NVM_RW_MIN_STRUCT_SIZE..=NVM_RW_MAX_STRUCT_SIZE).contains(&size) {
        return Err(BootError::NVM_STRUCT_SIZE);
    }
    Ok(size)
}

/// Check the structure of an NVM-RW record held in `buf`
///
/// # Returns
///
/// * `usize` - `struct_size` of the record
pub fn validate(buf: &[u8]) -> BootResult<usize> {
    let size = check_prefix(buf)?;
    if buf.len() < size {
        return Err(BootError::NVM_STRUCT_SIZE);
    }
    Ok(size)
}

/// Validate `buf` and check its trailing HMAC against `secret`
pub fn verify(env: &mut impl BootEnv, secret: &Secret, buf: &[u8]) -> BootResult<()> {
    let size = validate(buf)?;
    let (body, mac) = buf
        .get(..size)
        .ok_or(BootError::NVM_STRUCT_SIZE)?
        .split_at(size - NVM_HMAC_SIZE);

    let expected = env
        .hmac_sha256(secret, body)
        .map_err(|_| BootError::NVM_RW_HMAC)?;
    if !bool::from(expected[..].ct_eq(mac)) {
        return Err(BootError::NVM_RW_INVALID_HMAC);
    }
    Ok(())
}

/// In-memory working copy of NVM-RW plus the operations that move it to and
/// from the two device copies.
pub struct NvmStore {
    buf: NvmrwBuf,
    loaded: bool,
}

impl Default for NvmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NvmStore {
    pub fn new() -> Self {
        Self {
            buf: NvmrwBuf::new(),
            loaded: false,
        }
    }

    /// True once `read_and_sync` has produced a verified working copy
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Working copy
    pub fn record(&self) -> &Nvmrw {
        &self.buf.rec
    }

    /// Read one copy and verify it
    pub fn read(env: &mut impl BootEnv, secret: &Secret, copy: NvmCopy) -> BootResult<Nvmrw> {
        Self::read_buf(env, secret, copy).map(|buf| buf.rec)
    }

    fn read_buf(env: &mut impl BootEnv, secret: &Secret, copy: NvmCopy) -> BootResult<NvmrwBuf> {
        let mut buf = NvmrwBuf::new_zeroed();
        let bytes = buf.as_bytes_mut();

        env.read_nvm(copy, &mut bytes[..NVM_RW_PREFIX_SIZE])?;
        let size = check_prefix(bytes)?;
        env.read_nvm(copy, &mut bytes[..size])?;
        verify(env, secret, &bytes[..size])?;

        Ok(buf)
    }

    /// Read both copies, adopt the newest valid one as the working copy and
    /// bring the other copy back in line.
    pub fn read_and_sync(&mut self, env: &mut impl BootEnv, secret: &Secret) -> BootResult<()> {
        let primary = Self::read_buf(env, secret, NvmCopy::Primary);
        let secondary = Self::read_buf(env, secret, NvmCopy::Secondary);

        let (buf, stale) = match (primary, secondary) {
            (Ok(p), Ok(s)) if s.update_count() > p.update_count() => (s, Some(NvmCopy::Primary)),
            (Ok(p), Ok(s)) if p.update_count() > s.update_count() => (p, Some(NvmCopy::Secondary)),
            (Ok(p), Ok(_)) => (p, None),
            (Ok(p), Err(e)) => {
                cprintln!("[nvm] secondary rejected {}", ErrCode(e));
                (p, Some(NvmCopy::Secondary))
            }
            (Err(e), Ok(s)) => {
                cprintln!("[nvm] primary rejected {}", ErrCode(e));
                (s, Some(NvmCopy::Primary))
            }
            (Err(e), Err(_)) => {
                cprintln!("[nvm] no valid copy {}", ErrCode(e));
                return Err(e);
            }
        };

        self.buf = buf;
        self.loaded = true;

        if self.buf.rec.struct_minor_version != NVM_HEADER_VERSION_MINOR {
            cprintln!(
                "[nvm] migrating minor version {} to {}",
                self.buf.rec.struct_minor_version,
                NVM_HEADER_VERSION_MINOR
            );
            self.buf.rec.struct_minor_version = NVM_HEADER_VERSION_MINOR;
            self.buf.rec.struct_size.set(NVM_RW_MIN_STRUCT_SIZE as u16);
            self.buf.ext = [0; NVM_RW_EXT_SIZE];
            return self.write_both(env, secret);
        }

        if let Some(copy) = stale {
            cprintln!("[nvm] restoring {}", copy);
            self.write(env, secret, copy)?;
        }
        Ok(())
    }

    /// Reseal the working copy and write it to `copy`, reading it back to
    /// confirm. Gives up with `NVM_WRITE` after `NVM_MAX_WRITE_RETRY` attempts.
    pub fn write(&mut self, env: &mut impl BootEnv, secret: &Secret, copy: NvmCopy) -> BootResult<()> {
        if !self.loaded {
            return Err(BootError::NVM_NOT_LOADED);
        }
        let size = validate(self.buf.as_bytes())?;

        let (body, mac) = self.buf.as_bytes_mut()[..size].split_at_mut(size - NVM_HMAC_SIZE);
        let digest = env
            .hmac_sha256(secret, body)
            .map_err(|_| BootError::NVM_RW_HMAC)?;
        mac.copy_from_slice(&digest);

        let image = &self.buf.as_bytes()[..size];
        let mut readback = [0u8; NVM_RW_MAX_STRUCT_SIZE];
        for attempt in 1..=NVM_MAX_WRITE_RETRY {
            let result = env
                .write_nvm(copy, image)
                .and_then(|_| env.read_nvm(copy, &mut readback[..size]));
            match result {
                Ok(()) if readback[..size] == *image => return Ok(()),
                Ok(()) => cprintln!("[nvm] {} readback mismatch, attempt {}", copy, attempt),
                Err(e) => cprintln!("[nvm] {} write attempt {} failed {}", copy, attempt, ErrCode(e)),
            }
        }

        Err(BootError::NVM_WRITE)
    }

    /// Write primary, then secondary. The secondary is written even when the
    /// primary fails; the first error is returned.
    pub fn write_both(&mut self, env: &mut impl BootEnv, secret: &Secret) -> BootResult<()> {
        let primary = self.write(env, secret, NvmCopy::Primary);
        let secondary = self.write(env, secret, NvmCopy::Secondary);
        primary.and(secondary)
    }

    /// Read a variable from the working copy
    pub fn get(&self, var: NvmrwVar) -> u32 {
        let rec = &self.buf.rec;
        match var {
            NvmrwVar::UpdateCount => rec.update_count.get(),
            NvmrwVar::Flags => rec.flags.get(),
            NvmrwVar::MinKernelDataKeyVersion => rec.min_kernel_data_key_version.get(),
            NvmrwVar::MinKernelVersion => rec.min_kernel_version.get(),
            NvmrwVar::BucType => rec.buc_type as u32,
        }
    }

    /// Set a variable in the working copy. Nothing is written to the device.
    pub fn set(&mut self, var: NvmrwVar, value: u32) {
        let rec = &mut self.buf.rec;
        match var {
            NvmrwVar::UpdateCount => rec.update_count.set(value),
            NvmrwVar::Flags => rec.flags.set(value),
            NvmrwVar::MinKernelDataKeyVersion => rec.min_kernel_data_key_version.set(value),
            NvmrwVar::MinKernelVersion => rec.min_kernel_version.set(value),
            NvmrwVar::BucType => rec.buc_type = value as u8,
        }
    }

    fn commit(&mut self, env: &mut impl BootEnv, secret: &Secret) -> BootResult<()> {
        let count = self.get(NvmrwVar::UpdateCount).wrapping_add(1);
        self.set(NvmrwVar::UpdateCount, count);
        self.write_both(env, secret)
    }

    /// Raise the rollback minimums. Versions at or below the stored minimums
    /// change nothing and write nothing.
    pub fn update_rollback_counters(
        &mut self,
        env: &mut impl BootEnv,
        secret: &Secret,
        kernel_data_key_version: u32,
        kernel_version: u32,
    ) -> BootResult<()> {
        if !self.loaded {
            return Err(BootError::NVM_NOT_LOADED);
        }

        let mut changed = false;
        if kernel_data_key_version > self.get(NvmrwVar::MinKernelDataKeyVersion) {
            self.set(NvmrwVar::MinKernelDataKeyVersion, kernel_data_key_version);
            changed = true;
        }
        if kernel_version > self.get(NvmrwVar::MinKernelVersion) {
            self.set(NvmrwVar::MinKernelVersion, kernel_version);
            changed = true;
        }
        if !changed {
            return Ok(());
        }

        cprintln!(
            "[nvm] rollback minimums now {}/{}",
            self.get(NvmrwVar::MinKernelDataKeyVersion),
            self.get(NvmrwVar::MinKernelVersion)
        );
        self.commit(env, secret)
    }

    /// Store a new boot unlock code, encrypted as HMAC(`buc_secret`, `new_buc`)
    pub fn update_buc(
        &mut self,
        env: &mut impl BootEnv,
        secret: &Secret,
        buc_secret: &Secret,
        new_buc: &[u8],
    ) -> BootResult<()> {
        if !self.loaded {
            return Err(BootError::NVM_NOT_LOADED);
        }

        let enc = env.hmac_sha256(buc_secret, new_buc)?;
        if bool::from(enc[..].ct_eq(&self.buf.rec.buc_enc_digest[..])) {
            return Ok(());
        }

        self.buf.rec.buc_enc_digest = enc;
        self.commit(env, secret)
    }
}
