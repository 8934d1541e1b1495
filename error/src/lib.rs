/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the boot core for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Boot Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootError(pub NonZeroU32);

/// Subsystem an error code belongs to. Encoded in the upper 16 bits of the code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed BDB structure. Never retryable.
    Structural,

    /// Signature, digest or algorithm failure. Always fatal to the boot attempt.
    Signature,

    /// A copy of NVM-RW failed validation or HMAC verification.
    NvmIntegrity,

    /// NVM device access failed.
    NvmIo,

    /// Caller violated an API contract.
    Parameter,

    /// Register, reset or crypto collaborator failure.
    Platform,

    Unknown,
}

impl ErrorKind {
    const fn from_component(component: u32) -> Self {
        match component {
            0x0001 => ErrorKind::Structural,
            0x0002 => ErrorKind::Signature,
            0x0003 => ErrorKind::NvmIntegrity,
            0x0004 => ErrorKind::NvmIo,
            0x0005 => ErrorKind::Parameter,
            0x0006 => ErrorKind::Platform,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: BootError = BootError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(& 'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl BootError {
    /// Create a boot error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a BootError from a u32 is to
    /// use `BootError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("BootError cannot be 0"),
        }
    }

    /// Subsystem that raised the error
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::from_component(self.0.get() >> 16)
    }

    /// Only device I/O failures may be retried, and only on the NVM write path.
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NvmIo)
    }

    define_error_constants![
        (BDB_BUF_SIZE, 0x0001_0001, "Buffer too small for the structure"),
        (BDB_STRUCT_MAGIC, 0x0001_0002, "Structure magic mismatch"),
        (
            BDB_STRUCT_VERSION,
            0x0001_0003,
            "Unsupported structure major version"
        ),
        (
            BDB_STRUCT_SIZE,
            0x0001_0004,
            "Declared structure size smaller than its fixed part"
        ),
        (BDB_BDB_SIZE, 0x0001_0005, "Declared BDB size too small"),
        (
            BDB_OEM_AREA_SIZE,
            0x0001_0006,
            "OEM area size not 32-bit aligned or overflowing"
        ),
        (
            BDB_OEM_AREA_0,
            0x0001_0007,
            "OEM area 0 does not fit in the buffer"
        ),
        (
            BDB_DESCRIPTION,
            0x0001_0008,
            "Description is not NUL-terminated"
        ),
        (BDB_HASH_ALG, 0x0001_0009, "Unsupported hash algorithm"),
        (
            BDB_SIG_ALG,
            0x0001_000A,
            "Unknown signature algorithm or payload size does not match it"
        ),
        (
            BDB_HASH_ENTRY_SIZE,
            0x0001_000B,
            "Hash entry size smaller than a hash entry"
        ),
        (
            BDB_SIGNED_SIZE,
            0x0001_000C,
            "Data signed size inconsistent with its contents"
        ),
        (
            BDB_HEADER_SIGNED_SIZE,
            0x0001_000D,
            "Header signed size does not cover the data key or exceeds the buffer"
        ),
        (
            BDB_HASH_NOT_FOUND,
            0x0001_000E,
            "No hash entry of the requested type"
        ),
        (
            SIG_ALG_MISMATCH,
            0x0002_0001,
            "Key and signature algorithms differ"
        ),
        (
            SIG_SIGNED_SIZE_MISMATCH,
            0x0002_0002,
            "Signature covers a different length than the structure it signs"
        ),
        (
            SIG_HEADER_INVALID,
            0x0002_0003,
            "Header signature did not verify against the root key"
        ),
        (
            SIG_DATA_INVALID,
            0x0002_0004,
            "Data signature did not verify against the data key"
        ),
        (SIG_DIGEST_FAILURE, 0x0002_0005, "Digest computation failed"),
        (
            SIG_VERIFY_FAILURE,
            0x0002_0006,
            "Signature engine reported an error"
        ),
        (NVM_RW_MAGIC, 0x0003_0001, "NVM-RW magic mismatch"),
        (
            NVM_STRUCT_VERSION,
            0x0003_0002,
            "Unsupported NVM-RW major version"
        ),
        (NVM_STRUCT_SIZE, 0x0003_0003, "NVM-RW struct size out of range"),
        (NVM_RW_HMAC, 0x0003_0004, "NVM-RW HMAC computation failed"),
        (NVM_RW_INVALID_HMAC, 0x0003_0005, "NVM-RW HMAC mismatch"),
        (NVM_READ, 0x0004_0001, "NVM device read failed"),
        (
            NVM_WRITE,
            0x0004_0002,
            "NVM write did not read back after all retries"
        ),
        (SECRET_TYPE, 0x0005_0001, "Unknown or underivable secret type"),
        (NVM_VAR, 0x0005_0002, "Unknown NVM-RW variable"),
        (NULL_PARAMETER, 0x0005_0003, "Required input was not supplied"),
        (
            NVM_NOT_LOADED,
            0x0005_0004,
            "NVM-RW working copy used before it was read"
        ),
        (
            DRIVER_UNIMPLEMENTED,
            0x0006_0003,
            "Collaborator not implemented on this target"
        ),
        (DRIVER_HMAC_FAILURE, 0x0006_0004, "HMAC engine failure"),
    ];
}

impl From<core::num::NonZeroU32> for crate::BootError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::BootError(val)
    }
}

impl From<BootError> for core::num::NonZeroU32 {
    fn from(val: BootError) -> Self {
        val.0
    }
}

impl From<BootError> for u32 {
    fn from(val: BootError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for BootError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(BootError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type BootResult<T> = Result<T, BootError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_try_from() {
        assert!(BootError::try_from(0).is_err());
        assert_eq!(
            Ok(BootError::NVM_RW_INVALID_HMAC),
            BootError::try_from(0x0003_0005)
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(BootError::BDB_STRUCT_MAGIC.kind(), ErrorKind::Structural);
        assert_eq!(BootError::SIG_ALG_MISMATCH.kind(), ErrorKind::Signature);
        assert_eq!(BootError::NVM_RW_INVALID_HMAC.kind(), ErrorKind::NvmIntegrity);
        assert_eq!(BootError::NVM_WRITE.kind(), ErrorKind::NvmIo);
        assert_eq!(BootError::SECRET_TYPE.kind(), ErrorKind::Parameter);
        assert_eq!(BootError::DRIVER_UNIMPLEMENTED.kind(), ErrorKind::Platform);
        assert!(BootError::NVM_READ.is_retryable());
        assert!(!BootError::SIG_HEADER_INVALID.is_retryable());
    }

    #[test]
    fn test_error_constants_uniqueness() {
        let constants = BootError::all_constants();
        let mut error_values = HashSet::new();
        let mut duplicates = Vec::new();

        for (name, value) in constants {
            if !error_values.insert(value) {
                duplicates.push((name, value));
            }
        }

        assert!(
            duplicates.is_empty(),
            "Found duplicate error codes: {:?}",
            duplicates
        );
    }
}
