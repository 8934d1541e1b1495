/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains wire structures for the Boot Descriptor Block and the
    NVM-RW counter record.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
mod builder;

#[cfg(feature = "std")]
pub use builder::{BdbBuilder, BdbKeyConfig, BdbSigner};

use bdb_error::{BootError, BootResult};
use core::mem::size_of;
use memoffset::offset_of;
use zerocopy::byteorder::{LittleEndian, U16, U32, U64};
use zerocopy::{AsBytes, FromBytes, Unaligned};

type Le16 = U16<LittleEndian>;
type Le32 = U32<LittleEndian>;
type Le64 = U64<LittleEndian>;

pub const BDB_HEADER_MAGIC: u32 = 0x30426442;
pub const BDB_KEY_MAGIC: u32 = 0x73334256;
pub const BDB_SIG_MAGIC: u32 = 0x6b334256;
pub const BDB_DATA_MAGIC: u32 = 0x31426442;

pub const BDB_HEADER_VERSION_MAJOR: u8 = 1;
pub const BDB_HEADER_VERSION_MINOR: u8 = 0;
pub const BDB_KEY_VERSION_MAJOR: u8 = 1;
pub const BDB_KEY_VERSION_MINOR: u8 = 0;
pub const BDB_SIG_VERSION_MAJOR: u8 = 1;
pub const BDB_SIG_VERSION_MINOR: u8 = 0;
pub const BDB_DATA_VERSION_MAJOR: u8 = 1;
pub const BDB_DATA_VERSION_MINOR: u8 = 0;

pub const BDB_DESCRIPTION_MAX_SIZE: usize = 128;
pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;

pub const BDB_RSA4096_KEY_DATA_SIZE: usize = 1032;
pub const BDB_RSA4096_SIG_SIZE: usize = 512;
pub const BDB_ECDSA521_KEY_DATA_SIZE: usize = 132;
pub const BDB_ECDSA521_SIG_SIZE: usize = 132;
pub const BDB_RSA3072B_KEY_DATA_SIZE: usize = 776;
pub const BDB_RSA3072B_SIG_SIZE: usize = 384;

pub const BDB_HEADER_SIZE: usize = size_of::<BdbHeader>();
pub const BDB_KEY_FIXED_SIZE: usize = size_of::<BdbKey>();
pub const BDB_SIG_FIXED_SIZE: usize = size_of::<BdbSig>();
pub const BDB_DATA_FIXED_SIZE: usize = size_of::<BdbData>();
pub const BDB_HASH_SIZE: usize = size_of::<BdbHash>();

pub const NVM_RW_MAGIC: u32 = 0x3052766e;
pub const NVM_HEADER_VERSION_MAJOR: u8 = 1;
pub const NVM_HEADER_VERSION_MINOR: u8 = 0;
pub const NVM_HMAC_SIZE: usize = SHA256_DIGEST_BYTE_SIZE;
pub const NVM_RW_MIN_STRUCT_SIZE: usize = 96;
pub const NVM_RW_MAX_STRUCT_SIZE: usize = 128;

/// Bytes that must be read before `struct_size` is known
pub const NVM_RW_PREFIX_SIZE: usize = offset_of!(Nvmrw, update_count);

pub const BUC_ENC_DIGEST_SIZE: usize = SHA256_DIGEST_BYTE_SIZE;

pub const BDB_SECRET_SIZE: usize = 32;

/// Size of the `by` block consumed by one hash-extend step
pub const BDB_CONSTANT_BLOCK_SIZE: usize = 64;

pub type Sha256Digest = [u8; SHA256_DIGEST_BYTE_SIZE];
pub type Secret = [u8; BDB_SECRET_SIZE];
pub type ConstantBlock = [u8; BDB_CONSTANT_BLOCK_SIZE];

const _: () = assert!(BDB_HEADER_SIZE == 32);
const _: () = assert!(BDB_KEY_FIXED_SIZE == 144);
const _: () = assert!(BDB_SIG_FIXED_SIZE == 144);
const _: () = assert!(BDB_DATA_FIXED_SIZE == 160);
const _: () = assert!(BDB_HASH_SIZE == 56);
const _: () = assert!(size_of::<Nvmrw>() == NVM_RW_MIN_STRUCT_SIZE);
const _: () = assert!(offset_of!(Nvmrw, hmac) + NVM_HMAC_SIZE == NVM_RW_MIN_STRUCT_SIZE);

/// Hash algorithm
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum BdbHashAlg {
    Sha256 = 2,
}

impl TryFrom<u8> for BdbHashAlg {
    type Error = BootError;

    fn try_from(value: u8) -> BootResult<Self> {
        match value {
            2 => Ok(BdbHashAlg::Sha256),
            _ => Err(BootError::BDB_HASH_ALG),
        }
    }
}

/// Signature algorithm. Each variant fixes the size of the key and signature
/// payloads that may accompany it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum BdbSigAlg {
    Rsa4096 = 5,
    Ecdsa521 = 7,
    Rsa3072b = 9,
}

impl BdbSigAlg {
    /// Size of `key_data` for a key of this algorithm
    pub const fn key_data_size(self) -> usize {
        match self {
            BdbSigAlg::Rsa4096 => BDB_RSA4096_KEY_DATA_SIZE,
            BdbSigAlg::Ecdsa521 => BDB_ECDSA521_KEY_DATA_SIZE,
            BdbSigAlg::Rsa3072b => BDB_RSA3072B_KEY_DATA_SIZE,
        }
    }

    /// Size of `sig_data` for a signature of this algorithm
    pub const fn sig_data_size(self) -> usize {
        match self {
            BdbSigAlg::Rsa4096 => BDB_RSA4096_SIG_SIZE,
            BdbSigAlg::Ecdsa521 => BDB_ECDSA521_SIG_SIZE,
            BdbSigAlg::Rsa3072b => BDB_RSA3072B_SIG_SIZE,
        }
    }
}

impl TryFrom<u8> for BdbSigAlg {
    type Error = BootError;

    fn try_from(value: u8) -> BootResult<Self> {
        match value {
            5 => Ok(BdbSigAlg::Rsa4096),
            7 => Ok(BdbSigAlg::Ecdsa521),
            9 => Ok(BdbSigAlg::Rsa3072b),
            _ => Err(BootError::BDB_SIG_ALG),
        }
    }
}

/// Kind of payload a hash entry describes
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum BdbDataType {
    SpRw = 1,
    ApRw = 2,
    Mcu = 3,
}

impl From<BdbDataType> for u8 {
    /// Converts to this type from the input type.
    fn from(value: BdbDataType) -> Self {
        value as u8
    }
}

/// BDB Header
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone)]
pub struct BdbHeader {
    pub struct_magic: Le32,
    pub struct_major_version: u8,
    pub struct_minor_version: u8,
    pub struct_size: Le16,

    /// Recommended address to load the BDB
    pub bdb_load_address: Le64,

    /// Size of the entire BDB
    pub bdb_size: Le32,

    /// Bytes from the start of the header covered by the header signature
    pub signed_size: Le32,

    pub oem_area_0_size: Le32,

    pub reserved0: [u8; 4],
}

/// Public key. Followed by `struct_size - BDB_KEY_FIXED_SIZE` bytes of key data.
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone)]
pub struct BdbKey {
    pub struct_magic: Le32,
    pub struct_major_version: u8,
    pub struct_minor_version: u8,
    pub struct_size: Le16,
    pub hash_alg: u8,
    pub sig_alg: u8,
    pub reserved0: [u8; 2],
    pub key_version: Le32,
    pub description: [u8; BDB_DESCRIPTION_MAX_SIZE],
}

/// Signature. Followed by `struct_size - BDB_SIG_FIXED_SIZE` bytes of signature data.
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone)]
pub struct BdbSig {
    pub struct_magic: Le32,
    pub struct_major_version: u8,
    pub struct_minor_version: u8,
    pub struct_size: Le16,
    pub hash_alg: u8,
    pub sig_alg: u8,
    pub reserved0: [u8; 2],

    /// Number of bytes the signature claims to cover
    pub signed_size: Le32,

    pub description: [u8; BDB_DESCRIPTION_MAX_SIZE],
}

/// Data section. Followed by OEM area 1, `num_hashes` hash entries of
/// `hash_entry_size` bytes each, and finally the data signature.
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone)]
pub struct BdbData {
    pub struct_magic: Le32,
    pub struct_major_version: u8,
    pub struct_minor_version: u8,
    pub struct_size: Le16,
    pub data_version: Le32,
    pub oem_area_1_size: Le32,
    pub num_hashes: u8,
    pub hash_entry_size: u8,
    pub reserved0: [u8; 2],

    /// Bytes from the start of this struct covered by the data signature
    pub signed_size: Le32,

    pub reserved1: [u8; 8],
    pub description: [u8; BDB_DESCRIPTION_MAX_SIZE],
}

/// Hash entry describing one payload
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone)]
pub struct BdbHash {
    /// Offset of the payload in its partition
    pub offset: Le64,
    pub size: Le32,
    pub partition: u8,
    pub r#type: u8,
    pub reserved0: [u8; 2],
    pub load_address: Le64,
    pub digest: Sha256Digest,
}

/// NVM-RW counter record. Stored twice; each copy sealed by a trailing HMAC
/// over the first `struct_size - NVM_HMAC_SIZE` bytes.
#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Nvmrw {
    pub struct_magic: Le32,
    pub struct_major_version: u8,
    pub struct_minor_version: u8,
    pub struct_size: Le16,

    /// Incremented every time either copy is rewritten with new content
    pub update_count: Le32,

    pub flags: Le32,
    pub min_kernel_data_key_version: Le32,
    pub min_kernel_version: Le32,
    pub buc_type: u8,
    pub reserved0: [u8; 7],

    /// Boot unlock code, encrypted with the BUC secret
    pub buc_enc_digest: [u8; BUC_ENC_DIGEST_SIZE],

    pub hmac: [u8; NVM_HMAC_SIZE],
}

impl Nvmrw {
    /// Fresh record at the compiled-in version with all counters zero
    pub fn new() -> Self {
        let mut nvm = Self::new_zeroed();
        nvm.struct_magic.set(NVM_RW_MAGIC);
        nvm.struct_major_version = NVM_HEADER_VERSION_MAJOR;
        nvm.struct_minor_version = NVM_HEADER_VERSION_MINOR;
        nvm.struct_size.set(NVM_RW_MIN_STRUCT_SIZE as u16);
        nvm
    }
}

impl Default for Nvmrw {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the index of the first NUL byte, if the description has one
pub fn description_terminator(description: &[u8]) -> Option<usize> {
    description.iter().position(|&b| b == 0)
}
