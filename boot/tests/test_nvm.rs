// Licensed under the Apache-2.0 license

mod common;

use bdb_boot::*;
use bdb_drivers::*;
use bdb_error::BootError;
use bdb_types::*;
use common::*;

fn context<'a>(env: TestPlatform) -> BootContext<'a, TestPlatform, Sha256Extend> {
    BootContext::new(env, Sha256Extend, ro_secrets())
}

fn copies_equal(nvm: &MemNvm) -> bool {
    nvm.copy(NvmCopy::Primary)[..NVM_RW_MIN_STRUCT_SIZE]
        == nvm.copy(NvmCopy::Secondary)[..NVM_RW_MIN_STRUCT_SIZE]
}

#[test]
fn test_newer_primary_wins() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(5));
    seed(&mut env.nvm, NvmCopy::Secondary, record(3));

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 5);
    assert_eq!(ctx.env().nvm.write_count, [0, 1]);
    assert!(copies_equal(&ctx.env().nvm));

    for copy in NvmCopy::ALL {
        let rec = NvmStore::read(ctx.env_mut(), &NVM_SECRET, copy).unwrap();
        assert_eq!(rec.update_count.get(), 5);
    }
}

#[test]
fn test_newer_secondary_wins() {
    let mut env = platform();
    let mut newer = record(9);
    newer.min_kernel_version.set(0x20);
    seed(&mut env.nvm, NvmCopy::Primary, record(8));
    seed(&mut env.nvm, NvmCopy::Secondary, newer);

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::MinKernelVersion), 0x20);
    assert_eq!(ctx.env().nvm.write_count, [1, 0]);
    assert!(copies_equal(&ctx.env().nvm));
    assert_eq!(stored(&ctx.env().nvm, NvmCopy::Primary).update_count.get(), 9);
}

#[test]
fn test_corrupted_primary() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(2));
    seed(&mut env.nvm, NvmCopy::Secondary, record(7));
    env.nvm.copy_mut(NvmCopy::Primary)[12] ^= 0x10;
    assert_eq!(
        NvmStore::read(&mut env, &NVM_SECRET, NvmCopy::Primary),
        Err(BootError::NVM_RW_INVALID_HMAC)
    );

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 7);
    assert!(copies_equal(&ctx.env().nvm));
}

#[test]
fn test_unrestorable_secondary() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(1));
    env.nvm.fail_reads = Some(NvmCopy::Secondary);

    // Restore is attempted, but the read-back keeps failing
    let mut ctx = context(env);
    assert_eq!(ctx.read_and_sync_counters(), Err(BootError::NVM_WRITE));
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 1);
    assert_eq!(ctx.env().nvm.write_count, [0, NVM_MAX_WRITE_RETRY]);
}

#[test]
fn test_write_both_survives_primary_failure() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(4));
    seed(&mut env.nvm, NvmCopy::Secondary, record(4));

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    ctx.env_mut().nvm.fail_reads = Some(NvmCopy::Primary);

    assert_eq!(
        ctx.update_rollback_counters(3, 7),
        Err(BootError::NVM_WRITE)
    );
    assert_eq!(ctx.env().nvm.write_count, [NVM_MAX_WRITE_RETRY, 1]);

    let secondary = stored(&ctx.env().nvm, NvmCopy::Secondary);
    assert_eq!(secondary.update_count.get(), 5);
    assert_eq!(secondary.min_kernel_version.get(), 7);
}

#[test]
fn test_both_invalid() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Secondary, record(1));
    env.nvm.copy_mut(NvmCopy::Secondary)[40] ^= 1;

    let mut ctx = context(env);
    assert_eq!(
        ctx.read_and_sync_counters(),
        Err(BootError::NVM_RW_MAGIC)
    );
    assert!(!ctx.nvm().is_loaded());
    assert_eq!(
        ctx.update_rollback_counters(1, 1),
        Err(BootError::NVM_NOT_LOADED)
    );
}

#[test]
fn test_rollback_monotonic() {
    let mut env = platform();
    let mut rec = record(1);
    rec.min_kernel_data_key_version.set(2);
    rec.min_kernel_version.set(5);
    seed(&mut env.nvm, NvmCopy::Primary, rec);
    seed(&mut env.nvm, NvmCopy::Secondary, rec);

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();

    // Lower or equal versions change nothing
    ctx.update_rollback_counters(2, 4).unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::MinKernelVersion), 5);
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 1);
    assert_eq!(ctx.env().nvm.write_count, [0, 0]);

    ctx.update_rollback_counters(1, 6).unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::MinKernelDataKeyVersion), 2);
    assert_eq!(ctx.nvmrw_get(NvmrwVar::MinKernelVersion), 6);
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 2);
    assert_eq!(ctx.env().nvm.write_count, [1, 1]);

    for copy in NvmCopy::ALL {
        let rec = NvmStore::read(ctx.env_mut(), &NVM_SECRET, copy).unwrap();
        assert_eq!(rec.update_count.get(), 2);
        assert_eq!(rec.min_kernel_version.get(), 6);
    }
}

#[test]
fn test_write_retry() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(1));
    seed(&mut env.nvm, NvmCopy::Secondary, record(1));
    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();

    // Transient mismatches are retried
    ctx.env_mut().nvm.corrupt_writes = NVM_MAX_WRITE_RETRY - 1;
    ctx.update_rollback_counters(1, 1).unwrap();
    assert_eq!(ctx.env().nvm.write_count, [NVM_MAX_WRITE_RETRY, 1]);
    assert!(copies_equal(&ctx.env().nvm));

    // A copy that never reads back is fatal; the other copy is still written
    ctx.env_mut().nvm.corrupt_writes = NVM_MAX_WRITE_RETRY;
    assert_eq!(
        ctx.update_rollback_counters(2, 2),
        Err(BootError::NVM_WRITE)
    );
    assert_eq!(ctx.env().nvm.write_count, [2 * NVM_MAX_WRITE_RETRY, 2]);
}

#[test]
fn test_minor_version_migration() {
    let mut env = platform();
    for copy in NvmCopy::ALL {
        let mut rec = record(4);
        rec.struct_minor_version = NVM_HEADER_VERSION_MINOR + 1;
        rec.struct_size.set(NVM_RW_MAX_STRUCT_SIZE as u16);
        rec.min_kernel_version.set(3);
        seed(&mut env.nvm, copy, rec);
    }

    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    assert_eq!(ctx.env().nvm.write_count, [1, 1]);
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 4);

    for copy in NvmCopy::ALL {
        let rec = NvmStore::read(ctx.env_mut(), &NVM_SECRET, copy).unwrap();
        assert_eq!(rec.struct_minor_version, NVM_HEADER_VERSION_MINOR);
        assert_eq!(rec.struct_size.get() as usize, NVM_RW_MIN_STRUCT_SIZE);
        assert_eq!(rec.min_kernel_version.get(), 3);
    }
}

#[test]
fn test_update_buc() {
    let mut env = platform();
    seed(&mut env.nvm, NvmCopy::Primary, record(1));
    seed(&mut env.nvm, NvmCopy::Secondary, record(1));
    let mut ctx = context(env);
    ctx.read_and_sync_counters().unwrap();
    ctx.derive_secret(SecretType::Buc, None).unwrap();

    ctx.update_buc(b"1234").unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 2);
    let expected = SoftSha256.hmac(&ctx.secrets().rw.buc, b"1234").unwrap();
    assert_eq!(ctx.nvm().record().buc_enc_digest, expected);
    assert_eq!(
        stored(&ctx.env().nvm, NvmCopy::Secondary).buc_enc_digest,
        expected
    );

    // Same code again is a no-op
    ctx.update_buc(b"1234").unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 2);
    assert_eq!(ctx.env().nvm.write_count, [1, 1]);

    ctx.update_buc(b"5678").unwrap();
    assert_eq!(ctx.nvmrw_get(NvmrwVar::UpdateCount), 3);
}

#[test]
fn test_get_set_without_validation() {
    let mut ctx = context(platform());
    ctx.nvmrw_set(NvmrwVar::Flags, 0xdead_beef);
    assert_eq!(ctx.nvmrw_get(NvmrwVar::Flags), 0xdead_beef);
    assert_eq!(ctx.env().nvm.write_count, [0, 0]);

    assert_eq!(NvmrwVar::try_from(0), Ok(NvmrwVar::UpdateCount));
    assert_eq!(NvmrwVar::try_from(99), Err(BootError::NVM_VAR));
}
