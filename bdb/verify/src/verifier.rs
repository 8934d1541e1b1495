/*++

Licensed under the Apache-2.0 license.

File Name:

   verifier.rs

Abstract:

    Boot Descriptor Block verification logic.

--*/

use crate::format::*;
use crate::*;
use bdb_drivers::cprintln;
use bdb_drivers::printer::ErrCode;
use bdb_error::BootError;
use subtle::ConstantTimeEq;

/// BDB Verifier
pub struct BdbVerifier<Env: BdbVerificationEnv> {
    /// Verification Environment
    env: Env,
}

impl<Env: BdbVerificationEnv> BdbVerifier<Env> {
    /// Create a new instance `BdbVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    /// Verify a Boot Descriptor Block
    ///
    /// # Arguments
    ///
    /// * `buf`            - Entire BDB
    /// * `bdbkey_digest`  - Expected SHA-256 digest of the root key, if known
    ///
    /// # Returns
    ///
    /// * `BdbVerifyResult` - `Success` only if the root key matched `bdbkey_digest`
    pub fn verify(
        &mut self,
        buf: &[u8],
        bdbkey_digest: Option<&Sha256Digest>,
    ) -> BootResult<BdbVerifyResult> {
        let result = self.verify_all(buf, bdbkey_digest);
        if let Err(e) = result {
            cprintln!("[bdb] Verification failed {}", ErrCode(e));
        }
        result
    }

    fn verify_all(
        &mut self,
        buf: &[u8],
        bdbkey_digest: Option<&Sha256Digest>,
    ) -> BootResult<BdbVerifyResult> {
        // Verify Header
        let header = check_header(buf)?;

        // Verify Root Key
        let bdbkey = check_key(get_bdbkey(buf)?)?;
        let key_matches = self.verify_bdbkey_digest(&bdbkey, bdbkey_digest)?;

        // OEM area 0 must fit, even though nothing here interprets it
        get_oem_area_0(buf)?;

        // Verify Data Key
        let datakey = check_key(get_datakey(buf)?)?;
        let header_signed_size = header.signed_size.get() as usize;
        if header_signed_size < datakey_end(buf)? || header_signed_size > buf.len() {
            return Err(BootError::BDB_HEADER_SIGNED_SIZE);
        }

        // Verify Header Signature
        let header_sig = check_sig(get_header_sig(buf)?)?;
        let header_signed = buf
            .get(..header_signed_size)
            .ok_or(BootError::BDB_HEADER_SIGNED_SIZE)?;
        self.verify_sig(
            &bdbkey,
            &header_sig,
            header_signed,
            BootError::SIG_HEADER_INVALID,
        )?;

        // Verify Data
        let data = check_data(get_data(buf)?)?;

        // Verify Data Signature
        let data_sig = check_sig(get_data_sig(buf)?)?;
        self.verify_sig(
            &datakey,
            &data_sig,
            data.as_bytes(),
            BootError::SIG_DATA_INVALID,
        )?;

        if key_matches {
            Ok(BdbVerifyResult::Success)
        } else {
            Ok(BdbVerifyResult::GoodOtherThanKey)
        }
    }

    /// Compare the root key digest with the expected one. A missing
    /// expectation never matches.
    fn verify_bdbkey_digest(
        &mut self,
        bdbkey: &BdbKeyView,
        expected: Option<&Sha256Digest>,
    ) -> BootResult<bool> {
        let Some(expected) = expected else {
            return Ok(false);
        };
        let actual = self
            .env
            .sha256_digest(bdbkey.as_bytes())
            .map_err(|_| BootError::SIG_DIGEST_FAILURE)?;
        Ok(bool::from(actual[..].ct_eq(&expected[..])))
    }

    /// Verify `sig` over `signed` with `key`
    fn verify_sig(
        &mut self,
        key: &BdbKeyView,
        sig: &BdbSigView,
        signed: &[u8],
        invalid: BootError,
    ) -> BootResult<()> {
        if sig.signed_size() != signed.len() {
            return Err(BootError::SIG_SIGNED_SIZE_MISMATCH);
        }
        if key.sig_alg != sig.sig_alg {
            return Err(BootError::SIG_ALG_MISMATCH);
        }
        if key.key_data().len() != key.sig_alg.key_data_size()
            || sig.sig_data().len() != sig.sig_alg.sig_data_size()
        {
            return Err(BootError::BDB_SIG_ALG);
        }

        let digest = self
            .env
            .sha256_digest(signed)
            .map_err(|_| BootError::SIG_DIGEST_FAILURE)?;

        let (key_data, sig_data) = (key.key_data(), sig.sig_data());
        let verified = match key.sig_alg {
            BdbSigAlg::Rsa4096 => self.env.rsa4096_verify(key_data, sig_data, &digest),
            BdbSigAlg::Rsa3072b => self.env.rsa3072b_verify(key_data, sig_data, &digest),
            BdbSigAlg::Ecdsa521 => self.env.ecdsa521_verify(key_data, sig_data, &digest),
        }
        .map_err(|_| BootError::SIG_VERIFY_FAILURE)?;

        if !verified {
            return Err(invalid);
        }
        Ok(())
    }
}
