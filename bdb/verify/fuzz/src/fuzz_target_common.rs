// Licensed under the Apache-2.0 license

use bdb_error::BootResult;
use bdb_types::*;
use bdb_verify::format::*;
use bdb_verify::*;

/// Accepts every signature, so inputs reach the data section checks
struct TestEnv;

impl BdbVerificationEnv for TestEnv {
    fn sha256_digest(&mut self, data: &[u8]) -> BootResult<Sha256Digest> {
        let mut digest = [0u8; 32];
        for (i, b) in data.iter().enumerate() {
            digest[i % 32] ^= *b;
        }
        Ok(digest)
    }

    fn rsa4096_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Ok(true)
    }

    fn rsa3072b_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Ok(true)
    }

    fn ecdsa521_verify(&mut self, _: &[u8], _: &[u8], _: &Sha256Digest) -> BootResult<bool> {
        Ok(true)
    }
}

pub fn harness(data: &[u8]) {
    let mut verifier = BdbVerifier::new(TestEnv);
    let result = verifier.verify(data, Some(&[0u8; 32]));

    // A BDB accepted here must have every region inside the buffer
    if result.is_ok() {
        let header = check_header(data).unwrap();
        assert!(header.signed_size.get() as usize <= data.len());
        check_data(get_data(data).unwrap()).unwrap();
        check_sig(get_data_sig(data).unwrap()).unwrap();
    }

    // Verification is deterministic
    assert_eq!(result, verifier.verify(data, Some(&[0u8; 32])));
}
