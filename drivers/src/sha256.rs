/*++

Licensed under the Apache-2.0 license.

File Name:

    sha256.rs

Abstract:

    File contains API for SHA-256 and HMAC-SHA256 operations, and the software
    implementation used on the host.

--*/

use bdb_error::{BootError, BootResult};
use bdb_types::Sha256Digest;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub trait Sha256Alg {
    /// Calculate the digest of the buffer
    fn digest(&mut self, buf: &[u8]) -> BootResult<Sha256Digest>;
}

pub trait HmacSha256Alg {
    /// Calculate HMAC-SHA256 of `data` keyed by `key`
    fn hmac(&mut self, key: &[u8], data: &[u8]) -> BootResult<Sha256Digest>;
}

/// Software SHA-256 / HMAC-SHA256
#[derive(Default, Debug, Copy, Clone)]
pub struct SoftSha256;

impl Sha256Alg for SoftSha256 {
    fn digest(&mut self, buf: &[u8]) -> BootResult<Sha256Digest> {
        Ok(Sha256::digest(buf).into())
    }
}

impl HmacSha256Alg for SoftSha256 {
    fn hmac(&mut self, key: &[u8], data: &[u8]) -> BootResult<Sha256Digest> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
            .map_err(|_| BootError::DRIVER_HMAC_FAILURE)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }
}
