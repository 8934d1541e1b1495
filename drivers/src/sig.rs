/*++

Licensed under the Apache-2.0 license.

File Name:

    sig.rs

Abstract:

    File contains API for the signature verification engines.

--*/

use bdb_error::BootResult;
use bdb_types::Sha256Digest;

/// Signature verification primitives. `Ok(false)` means the signature is
/// well-formed but does not match; `Err` means the engine itself failed.
pub trait SignatureAlg {
    fn rsa4096_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;

    fn rsa3072b_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;

    fn ecdsa521_verify(
        &mut self,
        key_data: &[u8],
        sig_data: &[u8],
        digest: &Sha256Digest,
    ) -> BootResult<bool>;
}
