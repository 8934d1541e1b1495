// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use bdb_boot::{Platform, RoSecrets};
use bdb_drivers::*;
use bdb_error::BootResult;
use bdb_types::*;
use bdb_verify::format::{check_key, get_bdbkey};
use zerocopy::{AsBytes, FromBytes};

pub const NVM_SECRET: Secret = [0x5a; 32];

/// Stand-in signature: SHA-256 over key data and digest, zero padded
pub fn fake_sig(alg: BdbSigAlg, key_data: &[u8], digest: &Sha256Digest) -> Vec<u8> {
    let mut sig = SoftSha256
        .digest(&[key_data, &digest[..]].concat())
        .unwrap()
        .to_vec();
    sig.resize(alg.sig_data_size(), 0);
    sig
}

pub struct TestSigner;

impl BdbSigner for TestSigner {
    fn sha256_digest(&mut self, data: &[u8]) -> anyhow::Result<Sha256Digest> {
        SoftSha256
            .digest(data)
            .map_err(|e| anyhow::anyhow!("digest failed: {:?}", e))
    }

    fn sign(
        &mut self,
        alg: BdbSigAlg,
        key_data: &[u8],
        digest: &Sha256Digest,
    ) -> anyhow::Result<Vec<u8>> {
        Ok(fake_sig(alg, key_data, digest))
    }
}

#[derive(Default)]
pub struct TestCrypto;

impl TestCrypto {
    fn check(alg: BdbSigAlg, key: &[u8], sig: &[u8], digest: &Sha256Digest) -> BootResult<bool> {
        Ok(fake_sig(alg, key, digest) == sig)
    }
}

impl Sha256Alg for TestCrypto {
    fn digest(&mut self, buf: &[u8]) -> BootResult<Sha256Digest> {
        SoftSha256.digest(buf)
    }
}

impl HmacSha256Alg for TestCrypto {
    fn hmac(&mut self, key: &[u8], data: &[u8]) -> BootResult<Sha256Digest> {
        SoftSha256.hmac(key, data)
    }
}

impl SignatureAlg for TestCrypto {
    fn rsa4096_verify(&mut self, key: &[u8], sig: &[u8], digest: &Sha256Digest) -> BootResult<bool> {
        Self::check(BdbSigAlg::Rsa4096, key, sig, digest)
    }

    fn rsa3072b_verify(&mut self, key: &[u8], sig: &[u8], digest: &Sha256Digest) -> BootResult<bool> {
        Self::check(BdbSigAlg::Rsa3072b, key, sig, digest)
    }

    fn ecdsa521_verify(&mut self, key: &[u8], sig: &[u8], digest: &Sha256Digest) -> BootResult<bool> {
        Self::check(BdbSigAlg::Ecdsa521, key, sig, digest)
    }
}

pub type TestPlatform = Platform<MemRegister, MemNvm, MemReset, TestCrypto>;

pub fn platform() -> TestPlatform {
    Platform::new(
        MemRegister::default(),
        MemNvm::default(),
        MemReset::default(),
        TestCrypto,
    )
}

pub fn ro_secrets() -> RoSecrets {
    RoSecrets {
        nvm_wp: [0x01; 32],
        nvm_rw: NVM_SECRET,
        bdb: [0x02; 32],
        boot_verified: [0x03; 32],
        boot_path: [0x04; 32],
        wsr: [0x06; 32],
    }
}

/// Current-version record with the given update count
pub fn record(update_count: u32) -> Nvmrw {
    let mut rec = Nvmrw::new();
    rec.update_count.set(update_count);
    rec
}

/// Recompute the trailing HMAC of the record in `buf`
pub fn seal(buf: &mut [u8]) {
    let size = u16::from_le_bytes([buf[6], buf[7]]) as usize;
    let mac = SoftSha256
        .hmac(&NVM_SECRET, &buf[..size - NVM_HMAC_SIZE])
        .unwrap();
    buf[size - NVM_HMAC_SIZE..size].copy_from_slice(&mac);
}

/// Seal `rec` and store it in `copy`
pub fn seed(nvm: &mut MemNvm, copy: NvmCopy, rec: Nvmrw) {
    let raw = nvm.copy_mut(copy);
    raw[..NVM_RW_MIN_STRUCT_SIZE].copy_from_slice(rec.as_bytes());
    seal(&mut raw[..]);
}

/// Record currently stored in `copy`
pub fn stored(nvm: &MemNvm, copy: NvmCopy) -> Nvmrw {
    Nvmrw::read_from_prefix(&nvm.copy(copy)[..]).unwrap()
}

pub fn bdb_builder() -> BdbBuilder {
    let mut bdbkey = BdbKeyConfig::new(BdbSigAlg::Rsa4096, 0x11);
    bdbkey.description = "root key".into();
    let mut datakey = BdbKeyConfig::new(BdbSigAlg::Rsa3072b, 0x22);
    datakey.key_version = 2;
    let mut builder = BdbBuilder::new(bdbkey, datakey);
    builder.oem_area_0 = vec![0xa5; 16];
    builder.add_hash(BdbDataType::SpRw, 0x1000, [0x33; 32]);
    builder.add_hash(BdbDataType::ApRw, 0x8000, [0x44; 32]);
    builder
}

pub fn build_bdb() -> Vec<u8> {
    bdb_builder().build(&mut TestSigner).unwrap()
}

/// Digest a platform would have fused for the root key of `bdb`
pub fn bdbkey_digest(bdb: &[u8]) -> Sha256Digest {
    let key = check_key(get_bdbkey(bdb).unwrap()).unwrap();
    SoftSha256.digest(key.as_bytes()).unwrap()
}
