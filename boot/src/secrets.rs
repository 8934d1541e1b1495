/*++

Licensed under the Apache-2.0 license.

File Name:

    secrets.rs

Abstract:

    File contains boot secret storage and the hash-chain derivation recipes.

--*/

use bdb_drivers::HashExtend;
use bdb_error::{BootError, BootResult};
use bdb_types::*;
use bdb_verify::format::check_key;
use bdb_verify::BdbVerificationEnv;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secrets handed over by the previous boot stage
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct RoSecrets {
    pub nvm_wp: Secret,
    pub nvm_rw: Secret,
    pub bdb: Secret,
    pub boot_verified: Secret,
    pub boot_path: Secret,

    /// Working secret register as left by the previous stage. Moved into
    /// the RW bank by `Secrets::new`.
    pub wsr: Secret,
}

/// Secrets derived by this stage for the next one
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct RwSecrets {
    pub bdb: Secret,
    pub boot_verified: Secret,
    pub boot_path: Secret,
    pub buc: Secret,
    pub wsr: Secret,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SecretType {
    NvmWp,
    NvmRw,
    Bdb,
    BootPath,
    BootVerified,
    Buc,
    Wsr,
}

impl TryFrom<u32> for SecretType {
    type Error = BootError;

    fn try_from(value: u32) -> BootResult<Self> {
        match value {
            0 => Ok(SecretType::NvmWp),
            1 => Ok(SecretType::NvmRw),
            2 => Ok(SecretType::Bdb),
            3 => Ok(SecretType::BootPath),
            4 => Ok(SecretType::BootVerified),
            5 => Ok(SecretType::Buc),
            6 => Ok(SecretType::Wsr),
            _ => Err(BootError::SECRET_TYPE),
        }
    }
}

/// Second half of the block for `get_constant` when extending the BDB secret
pub const CONSTANT_BDB: [u8; 32] = [
    0x1d, 0x08, 0x63, 0x17, 0x14, 0xe4, 0x89, 0x61, //
    0x4d, 0x7e, 0x96, 0x41, 0x29, 0xcb, 0x10, 0x7d, //
    0xde, 0xf9, 0x39, 0x5c, 0x1e, 0x57, 0xa3, 0x37, //
    0xe4, 0x16, 0x0f, 0xe4, 0x33, 0x3e, 0x48, 0x79, //
];

/// Boot verified, kernel data key verified
pub const CONSTANT_VERIFIED_0: ConstantBlock = [
    0x78, 0x31, 0xba, 0x94, 0xc1, 0x8a, 0x41, 0x0a, //
    0x8f, 0x59, 0xff, 0xea, 0x72, 0x19, 0xdf, 0xe1, //
    0xb2, 0x80, 0xae, 0x79, 0x65, 0x13, 0x54, 0xea, //
    0xd7, 0x89, 0x56, 0x24, 0x43, 0xf8, 0x9d, 0x42, //
    0x81, 0x82, 0x5d, 0x82, 0x9c, 0xd0, 0x27, 0xeb, //
    0xea, 0x9e, 0x44, 0x5f, 0x9c, 0xe6, 0x50, 0x9b, //
    0x55, 0xbe, 0xcc, 0x48, 0xe8, 0x89, 0xc3, 0x56, //
    0x3a, 0x82, 0xde, 0x30, 0xed, 0x70, 0x42, 0x75, //
];

/// Boot verified, kernel data key not verified
pub const CONSTANT_VERIFIED_1: ConstantBlock = [
    0xcb, 0x10, 0xe5, 0xec, 0x1e, 0xb3, 0x93, 0x50, //
    0xa5, 0x46, 0x7f, 0x91, 0xfa, 0x5e, 0x5a, 0xf8, //
    0x3e, 0x51, 0x46, 0xba, 0x8c, 0x15, 0x60, 0x73, //
    0x6a, 0x44, 0x85, 0x7b, 0xf0, 0x6b, 0x04, 0xd9, //
    0x24, 0x79, 0xf8, 0x27, 0x4b, 0x28, 0x3f, 0x30, //
    0xfb, 0x27, 0x8a, 0x0c, 0xed, 0x46, 0x95, 0x9c, //
    0xaf, 0xef, 0x76, 0xd0, 0x93, 0x49, 0x01, 0xaf, //
    0x82, 0x69, 0x49, 0xe8, 0xc0, 0x2a, 0x47, 0x7c, //
];

pub const CONSTANT_BUC: ConstantBlock = [
    0x18, 0x91, 0xb2, 0xfc, 0x42, 0xe2, 0xfd, 0x02, //
    0x24, 0x13, 0xac, 0xf2, 0xa6, 0x51, 0x46, 0x83, //
    0xef, 0x6d, 0x89, 0xab, 0x07, 0xfe, 0x17, 0xba, //
    0x84, 0x8c, 0xfe, 0x0d, 0x7d, 0xda, 0x0e, 0xbc, //
    0x33, 0xc5, 0x4c, 0xf5, 0x80, 0xe1, 0x83, 0x64, //
    0x41, 0x30, 0x72, 0x7c, 0x5c, 0x5f, 0xbb, 0x95, //
    0x82, 0xc2, 0xbb, 0xb1, 0x0a, 0x99, 0xc3, 0xdd, //
    0x99, 0x47, 0xb3, 0x7d, 0x2a, 0xb2, 0xb7, 0x4d, //
];

/// Second half of the block for `get_constant` when extending the boot path
pub const CONSTANT_BOOT_PATH: [u8; 32] = [
    0x73, 0x6a, 0xd3, 0x0f, 0x17, 0x7b, 0x1b, 0x81, //
    0x25, 0x43, 0xb6, 0x1e, 0xfa, 0xcc, 0xc9, 0x37, //
    0x19, 0x66, 0x52, 0xbd, 0xc8, 0xc3, 0xfd, 0xa3, //
    0x6e, 0xe6, 0x3c, 0x86, 0x1a, 0x03, 0xc8, 0x27, //
];

/// Second half of the block for `get_constant` when extending the WSR
pub const CONSTANT_WSR: [u8; 32] = [
    0x6d, 0xe7, 0xb8, 0xcc, 0xf3, 0x44, 0x8f, 0xbb, //
    0xcb, 0x11, 0xaa, 0xcb, 0x6a, 0x9c, 0x9c, 0xf3, //
    0x4f, 0x39, 0x0f, 0xcb, 0x2c, 0xb8, 0xca, 0xdf, //
    0x73, 0x4c, 0xc6, 0x92, 0xb6, 0x0e, 0xd2, 0xe7, //
];

/// Build an extend block from a key: its digest followed by `constant`
///
/// # Arguments
///
/// * `env`      - Environment providing SHA-256
/// * `buf`      - Key structure; only `struct_size` bytes are digested
/// * `constant` - Domain separation constant
pub fn get_constant(
    env: &mut impl BdbVerificationEnv,
    buf: &[u8],
    constant: &[u8; 32],
) -> BootResult<ConstantBlock> {
    let key = check_key(buf)?;
    let digest = env
        .sha256_digest(key.as_bytes())
        .map_err(|_| BootError::SIG_DIGEST_FAILURE)?;

    let mut block = [0u8; BDB_CONSTANT_BLOCK_SIZE];
    let (head, tail) = block.split_at_mut(SHA256_DIGEST_BYTE_SIZE);
    head.copy_from_slice(&digest);
    tail.copy_from_slice(constant);
    Ok(block)
}

/// Both secret banks of one boot stage
#[derive(Default)]
pub struct Secrets {
    pub ro: RoSecrets,
    pub rw: RwSecrets,
}

impl Secrets {
    /// Take over the secrets of the previous stage. The incoming WSR becomes
    /// the starting point of the RW chain and is cleared from `ro`.
    pub fn new(mut ro: RoSecrets) -> Self {
        let mut rw = RwSecrets::default();
        core::mem::swap(&mut rw.wsr, &mut ro.wsr);
        Self { ro, rw }
    }

    /// Derive one RW secret
    ///
    /// # Arguments
    ///
    /// * `env`                      - Environment providing SHA-256
    /// * `extend`                   - Hash-extend implementation
    /// * `kernel_data_key_verified` - Selects the boot-verified constant
    /// * `secret`                   - Secret to derive
    /// * `buf`                      - Key structure, required for `Bdb`, `BootPath` and `Wsr`
    pub fn derive(
        &mut self,
        env: &mut impl BdbVerificationEnv,
        extend: &mut impl HashExtend,
        kernel_data_key_verified: bool,
        secret: SecretType,
        buf: Option<&[u8]>,
    ) -> BootResult<()> {
        match secret {
            SecretType::Bdb => {
                let buf = buf.ok_or(BootError::NULL_PARAMETER)?;
                let by = get_constant(env, buf, &CONSTANT_BDB)?;
                extend.extend(&self.ro.bdb, &by, &mut self.rw.bdb);
            }
            SecretType::BootPath => {
                let buf = buf.ok_or(BootError::NULL_PARAMETER)?;
                let by = get_constant(env, buf, &CONSTANT_BOOT_PATH)?;
                extend.extend(&self.ro.boot_path, &by, &mut self.rw.boot_path);
            }
            SecretType::BootVerified => {
                let by = if kernel_data_key_verified {
                    &CONSTANT_VERIFIED_0
                } else {
                    &CONSTANT_VERIFIED_1
                };
                extend.extend(&self.ro.boot_verified, by, &mut self.rw.boot_verified);
            }
            SecretType::Buc => {
                extend.extend(&self.ro.boot_verified, &CONSTANT_BUC, &mut self.rw.buc)
            }
            SecretType::Wsr => {
                let buf = buf.ok_or(BootError::NULL_PARAMETER)?;
                let by = get_constant(env, buf, &CONSTANT_WSR)?;
                let from = Zeroizing::new(self.rw.wsr);
                extend.extend(&from, &by, &mut self.rw.wsr);
            }
            SecretType::NvmWp | SecretType::NvmRw => return Err(BootError::SECRET_TYPE),
        }
        Ok(())
    }

    /// Zero the slot holding `secret`
    pub fn clear(&mut self, secret: SecretType) {
        match secret {
            SecretType::NvmWp => self.ro.nvm_wp.zeroize(),
            SecretType::NvmRw => self.ro.nvm_rw.zeroize(),
            SecretType::Bdb => self.ro.bdb.zeroize(),
            SecretType::BootPath => self.ro.boot_path.zeroize(),
            SecretType::BootVerified => self.ro.boot_verified.zeroize(),
            SecretType::Buc => self.rw.buc.zeroize(),
            SecretType::Wsr => self.rw.wsr.zeroize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdb_drivers::{Sha256Alg, Sha256Extend, SoftSha256};
    use zerocopy::{AsBytes, FromBytes};

    struct DigestOnly;

    impl BdbVerificationEnv for DigestOnly {
        fn sha256_digest(&mut self, data: &[u8]) -> BootResult<Sha256Digest> {
            SoftSha256.digest(data)
        }

        fn rsa4096_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
            Ok(false)
        }

        fn rsa3072b_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
            Ok(false)
        }

        fn ecdsa521_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
            Ok(false)
        }
    }

    fn key() -> Vec<u8> {
        let mut k = BdbKey::new_zeroed();
        k.struct_magic.set(BDB_KEY_MAGIC);
        k.struct_major_version = BDB_KEY_VERSION_MAJOR;
        k.struct_size
            .set((BDB_KEY_FIXED_SIZE + BDB_ECDSA521_KEY_DATA_SIZE) as u16);
        k.hash_alg = BdbHashAlg::Sha256 as u8;
        k.sig_alg = BdbSigAlg::Ecdsa521 as u8;
        let mut out = k.as_bytes().to_vec();
        out.resize(BDB_KEY_FIXED_SIZE + BDB_ECDSA521_KEY_DATA_SIZE, 7);
        out
    }

    fn secrets() -> Secrets {
        let mut s = Secrets::default();
        s.ro.nvm_wp = [1; 32];
        s.ro.nvm_rw = [2; 32];
        s.ro.bdb = [3; 32];
        s.ro.boot_verified = [4; 32];
        s.ro.boot_path = [5; 32];
        s.rw.wsr = [6; 32];
        s
    }

    fn other_key() -> Vec<u8> {
        let mut k = key();
        let last = k.len() - 1;
        k[last] ^= 0xff;
        k
    }

    #[test]
    fn test_get_constant() {
        let k = key();
        let mut trailing = k.clone();
        trailing.extend([0xee; 16]);

        let block = get_constant(&mut DigestOnly, &k, &CONSTANT_WSR).unwrap();
        assert_eq!(&block[..32], &SoftSha256.digest(&k).unwrap());
        assert_eq!(&block[32..], &CONSTANT_WSR);

        // Bytes past struct_size are not part of the digest
        assert_eq!(
            get_constant(&mut DigestOnly, &trailing, &CONSTANT_WSR).unwrap(),
            block
        );
        assert_eq!(
            get_constant(&mut DigestOnly, &k[..k.len() - 1], &CONSTANT_WSR),
            Err(BootError::BDB_BUF_SIZE)
        );
    }

    #[test]
    fn test_derive_deterministic() {
        let k = key();
        for secret in [
            SecretType::Bdb,
            SecretType::BootPath,
            SecretType::BootVerified,
            SecretType::Buc,
            SecretType::Wsr,
        ] {
            let mut a = secrets();
            let mut b = secrets();
            a.derive(&mut DigestOnly, &mut Sha256Extend, true, secret, Some(&k))
                .unwrap();
            b.derive(&mut DigestOnly, &mut Sha256Extend, true, secret, Some(&k))
                .unwrap();
            assert_eq!(a.rw.bdb, b.rw.bdb);
            assert_eq!(a.rw.boot_path, b.rw.boot_path);
            assert_eq!(a.rw.boot_verified, b.rw.boot_verified);
            assert_eq!(a.rw.buc, b.rw.buc);
            assert_eq!(a.rw.wsr, b.rw.wsr);
        }
    }

    #[test]
    fn test_derive_recipes() {
        let k = key();
        let mut s = secrets();
        let mut expected = [0u8; 32];

        let by = get_constant(&mut DigestOnly, &k, &CONSTANT_BDB).unwrap();
        s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Bdb, Some(&k))
            .unwrap();
        Sha256Extend.extend(&[3; 32], &by, &mut expected);
        assert_eq!(s.rw.bdb, expected);
        assert_ne!(s.rw.bdb, [0; 32]);

        s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Buc, None)
            .unwrap();
        Sha256Extend.extend(&[4; 32], &CONSTANT_BUC, &mut expected);
        assert_eq!(s.rw.buc, expected);

        s.derive(&mut DigestOnly, &mut Sha256Extend, true, SecretType::BootVerified, None)
            .unwrap();
        let verified_0 = s.rw.boot_verified;
        s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::BootVerified, None)
            .unwrap();
        assert_ne!(s.rw.boot_verified, verified_0);
        Sha256Extend.extend(&[4; 32], &CONSTANT_VERIFIED_1, &mut expected);
        assert_eq!(s.rw.boot_verified, expected);

        // WSR chains from its own previous value
        let by = get_constant(&mut DigestOnly, &k, &CONSTANT_WSR).unwrap();
        s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Wsr, Some(&k))
            .unwrap();
        Sha256Extend.extend(&[6; 32], &by, &mut expected);
        assert_eq!(s.rw.wsr, expected);
        s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Wsr, Some(&k))
            .unwrap();
        assert_ne!(s.rw.wsr, expected);
    }

    #[test]
    fn test_derive_errors() {
        let mut s = secrets();
        for secret in [SecretType::Bdb, SecretType::BootPath, SecretType::Wsr] {
            assert_eq!(
                s.derive(&mut DigestOnly, &mut Sha256Extend, false, secret, None),
                Err(BootError::NULL_PARAMETER)
            );
        }
        for secret in [SecretType::NvmWp, SecretType::NvmRw] {
            assert_eq!(
                s.derive(&mut DigestOnly, &mut Sha256Extend, false, secret, None),
                Err(BootError::SECRET_TYPE)
            );
        }
        assert_eq!(SecretType::try_from(7), Err(BootError::SECRET_TYPE));
        assert_eq!(SecretType::try_from(6), Ok(SecretType::Wsr));
    }

    #[test]
    fn test_bdb_secret_bound_to_key() {
        let k = key();
        let other = other_key();
        assert!(check_key(&other).is_ok());

        let mut a = secrets();
        let mut b = secrets();
        a.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Bdb, Some(&k))
            .unwrap();
        b.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Bdb, Some(&other))
            .unwrap();
        assert_ne!(a.rw.bdb, b.rw.bdb);
    }

    #[test]
    fn test_new_moves_wsr() {
        let k = key();
        let mut ro = RoSecrets::default();
        ro.wsr = [0x77; 32];
        let mut seeded = Secrets::new(ro);
        assert_eq!(seeded.rw.wsr, [0x77; 32]);
        assert_eq!(seeded.ro.wsr, [0; 32]);

        let mut fresh = Secrets::new(RoSecrets::default());
        for s in [&mut seeded, &mut fresh] {
            s.derive(&mut DigestOnly, &mut Sha256Extend, false, SecretType::Wsr, Some(&k))
                .unwrap();
        }
        assert_ne!(seeded.rw.wsr, fresh.rw.wsr);

        let by = get_constant(&mut DigestOnly, &k, &CONSTANT_WSR).unwrap();
        let mut expected = [0u8; 32];
        Sha256Extend.extend(&[0x77; 32], &by, &mut expected);
        assert_eq!(seeded.rw.wsr, expected);
    }

    #[test]
    fn test_clear() {
        let mut s = secrets();
        s.rw.buc = [9; 32];
        for secret in [
            SecretType::NvmWp,
            SecretType::NvmRw,
            SecretType::Bdb,
            SecretType::BootPath,
            SecretType::BootVerified,
            SecretType::Buc,
            SecretType::Wsr,
        ] {
            s.clear(secret);
        }
        for slot in [
            &s.ro.nvm_wp,
            &s.ro.nvm_rw,
            &s.ro.bdb,
            &s.ro.boot_path,
            &s.ro.boot_verified,
            &s.rw.buc,
            &s.rw.wsr,
        ] {
            assert_eq!(*slot, [0; 32]);
        }
    }
}
