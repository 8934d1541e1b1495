/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Boot Descriptor Block verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

pub mod format;
mod verifier;

use bdb_error::BootResult;
use bdb_types::*;

pub use format::{BdbDataView, BdbKeyView, BdbSigView};
pub use verifier::BdbVerifier;

/// Outcome of a verification that did not fail
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BdbVerifyResult {
    /// Fully verified, and the root key matched the expected digest
    Success,

    /// Fully verified, but the root key is not the expected one
    GoodOtherThanKey,
}

/// BDB Verification Environment
pub trait BdbVerificationEnv {
    /// Calculate SHA-256 Digest
    fn sha256_digest(&mut self, data: &[u8]) -> BootResult<Sha256Digest>;

    /// Perform RSA-4096 Verification
    fn rsa4096_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;

    /// Perform RSA-3072 (exponent 3) Verification
    fn rsa3072b_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;

    /// Perform ECDSA P-521 Verification
    fn ecdsa521_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;
}

impl<T: BdbVerificationEnv + ?Sized> BdbVerificationEnv for &mut T {
    fn sha256_digest(&mut self, data: &[u8]) -> BootResult<Sha256Digest> {
        (**self).sha256_digest(data)
    }

    fn rsa4096_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        (**self).rsa4096_verify(key_data, sig_data, digest)
    }

    fn rsa3072b_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        (**self).rsa3072b_verify(key_data, sig_data, digest)
    }

    fn ecdsa521_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool> {
        (**self).ecdsa521_verify(key_data, sig_data, digest)
    }
}
