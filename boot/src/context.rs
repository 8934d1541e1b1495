/*++

Licensed under the Apache-2.0 license.

File Name:

    context.rs

Abstract:

    File contains the boot context tying verification, counters, secrets and
    slot selection together for one boot attempt.

--*/

use bdb_drivers::{cprintln, HashExtend};
use bdb_error::BootResult;
use bdb_types::Sha256Digest;
use bdb_verify::format::get_bdbkey;
use bdb_verify::{BdbVerifier, BdbVerifyResult};
use bitflags::bitflags;

use crate::nvm::{NvmStore, NvmrwVar};
use crate::secrets::{RoSecrets, SecretType, Secrets};
use crate::slot::{self, Slot, SlotDecision};
use crate::BootEnv;

bitflags! {
    /// Facts established during this boot attempt
    #[derive(Default)]
    pub struct ContextFlags: u32 {
        /// The BDB root key matched the fused digest
        const BDB_KEY_EFUSED = 0x1;

        /// The kernel data key was verified by a later stage
        const KERNEL_DATA_KEY_VERIFIED = 0x2;
    }
}

/// Boot Context
pub struct BootContext<'a, Env: BootEnv, X: HashExtend> {
    env: Env,
    extend: X,
    slot: Option<Slot>,
    flags: ContextFlags,
    bdb: Option<&'a [u8]>,
    secrets: Secrets,
    nvm: NvmStore,
}

impl<'a, Env: BootEnv, X: HashExtend> BootContext<'a, Env, X> {
    /// Create a new instance `BootContext`
    ///
    /// # Arguments
    ///
    /// * `env`    - Environment
    /// * `extend` - Hash-extend implementation used for every derivation
    /// * `ro`     - Secrets handed over by the previous stage, including the
    ///              incoming WSR
    pub fn new(env: Env, extend: X, ro: RoSecrets) -> Self {
        Self {
            env,
            extend,
            slot: None,
            flags: ContextFlags::default(),
            bdb: None,
            secrets: Secrets::new(ro),
            nvm: NvmStore::new(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    /// Slot chosen by `init_boot_attempt`, if it allowed the boot to proceed
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    /// BDB accepted by `verify_bdb`
    pub fn bdb(&self) -> Option<&'a [u8]> {
        self.bdb
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn nvm(&self) -> &NvmStore {
        &self.nvm
    }

    /// Record that a later stage verified the kernel data key
    pub fn set_kernel_data_key_verified(&mut self) {
        self.flags.insert(ContextFlags::KERNEL_DATA_KEY_VERIFIED);
    }

    pub fn init_boot_attempt(&mut self) -> BootResult<SlotDecision> {
        let decision = slot::init_boot_attempt(&mut self.env)?;
        if let SlotDecision::Proceed(slot) = decision {
            self.slot = Some(slot);
        }
        Ok(decision)
    }

    /// Verify `bdb` and keep it for later derivations
    ///
    /// # Arguments
    ///
    /// * `bdb`           - Entire BDB
    /// * `bdbkey_digest` - Fused digest of the root key, if any
    pub fn verify_bdb(
        &mut self,
        bdb: &'a [u8],
        bdbkey_digest: Option<&Sha256Digest>,
    ) -> BootResult<BdbVerifyResult> {
        let result = BdbVerifier::new(&mut self.env).verify(bdb, bdbkey_digest)?;
        self.bdb = Some(bdb);
        match result {
            BdbVerifyResult::Success => self.flags.insert(ContextFlags::BDB_KEY_EFUSED),
            BdbVerifyResult::GoodOtherThanKey => {
                cprintln!("[boot] BDB verified with a key other than the fused one")
            }
        }
        Ok(result)
    }

    pub fn read_and_sync_counters(&mut self) -> BootResult<()> {
        self.nvm
            .read_and_sync(&mut self.env, &self.secrets.ro.nvm_rw)
    }

    /// Derive one RW secret. `Bdb` defaults to the root key of the BDB
    /// accepted by `verify_bdb` when `buf` is `None`.
    pub fn derive_secret(&mut self, secret: SecretType, buf: Option<&[u8]>) -> BootResult<()> {
        let buf = match (secret, buf, self.bdb) {
            (SecretType::Bdb, None, Some(bdb)) => Some(get_bdbkey(bdb)?),
            _ => buf,
        };
        self.secrets.derive(
            &mut self.env,
            &mut self.extend,
            self.flags.contains(ContextFlags::KERNEL_DATA_KEY_VERIFIED),
            secret,
            buf,
        )
    }

    pub fn clear_secret(&mut self, secret: SecretType) {
        self.secrets.clear(secret)
    }

    pub fn update_rollback_counters(
        &mut self,
        kernel_data_key_version: u32,
        kernel_version: u32,
    ) -> BootResult<()> {
        self.nvm.update_rollback_counters(
            &mut self.env,
            &self.secrets.ro.nvm_rw,
            kernel_data_key_version,
            kernel_version,
        )
    }

    /// Store a new boot unlock code, sealed with the derived BUC secret
    pub fn update_buc(&mut self, new_buc: &[u8]) -> BootResult<()> {
        self.nvm.update_buc(
            &mut self.env,
            &self.secrets.ro.nvm_rw,
            &self.secrets.rw.buc,
            new_buc,
        )
    }

    pub fn nvmrw_get(&self, var: NvmrwVar) -> u32 {
        self.nvm.get(var)
    }

    pub fn nvmrw_set(&mut self, var: NvmrwVar, value: u32) {
        self.nvm.set(var, value)
    }

    pub fn finalize_boot_attempt(&mut self) -> BootResult<()> {
        let slot = slot::finalize_boot_attempt(&mut self.env)?;
        cprintln!("[boot] Slot {} boot attempt complete", slot);
        Ok(())
    }

    pub fn fail_boot_attempt(&mut self) {
        slot::fail_boot_attempt(&mut self.env)
    }
}
