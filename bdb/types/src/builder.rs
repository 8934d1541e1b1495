/*++

Licensed under the Apache-2.0 license.

File Name:

   builder.rs

Abstract:

    Host-side BDB assembler used by tests and fuzz seeds.

--*/
use anyhow::bail;
use zerocopy::{AsBytes, FromBytes};

use crate::*;

/// Signing backend for the builder
pub trait BdbSigner {
    /// Calculate SHA-256 digest
    fn sha256_digest(&mut self, data: &[u8]) -> anyhow::Result<Sha256Digest>;

    /// Sign `digest` with the private half of the key whose public data is `key_data`
    fn sign(
        &mut self,
        alg: BdbSigAlg,
        key_data: &[u8],
        digest: &Sha256Digest,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Public key material placed in the BDB
#[derive(Debug, Clone)]
pub struct BdbKeyConfig {
    pub sig_alg: BdbSigAlg,
    pub key_version: u32,
    pub key_data: Vec<u8>,
    pub description: String,
}

impl BdbKeyConfig {
    /// Key of the given algorithm whose data is `fill` repeated
    pub fn new(sig_alg: BdbSigAlg, fill: u8) -> Self {
        Self {
            sig_alg,
            key_version: 1,
            key_data: vec![fill; sig_alg.key_data_size()],
            description: String::new(),
        }
    }
}

/// BDB assembler
#[derive(Debug, Clone)]
pub struct BdbBuilder {
    pub bdbkey: BdbKeyConfig,
    pub datakey: BdbKeyConfig,
    pub bdb_load_address: u64,
    pub oem_area_0: Vec<u8>,
    pub oem_area_1: Vec<u8>,
    pub data_version: u32,
    pub hashes: Vec<BdbHash>,
    pub header_description: String,
    pub data_description: String,
}

impl BdbBuilder {
    pub fn new(bdbkey: BdbKeyConfig, datakey: BdbKeyConfig) -> Self {
        Self {
            bdbkey,
            datakey,
            bdb_load_address: 0,
            oem_area_0: Vec::new(),
            oem_area_1: Vec::new(),
            data_version: 1,
            hashes: Vec::new(),
            header_description: "bdb header sig".into(),
            data_description: "bdb data".into(),
        }
    }

    /// Append a hash entry
    pub fn add_hash(&mut self, r#type: BdbDataType, offset: u64, digest: Sha256Digest) {
        let mut hash = BdbHash::new_zeroed();
        hash.offset.set(offset);
        hash.size.set(0x1000);
        hash.r#type = r#type.into();
        hash.load_address.set(0x2000_0000);
        hash.digest = digest;
        self.hashes.push(hash);
    }

    /// Generate a signed BDB
    pub fn build(&self, signer: &mut impl BdbSigner) -> anyhow::Result<Vec<u8>> {
        if self.oem_area_0.len() % 4 != 0 || self.oem_area_1.len() % 4 != 0 {
            bail!("OEM areas must be a multiple of 4 bytes");
        }
        if self.hashes.len() > u8::MAX as usize {
            bail!("Too many hash entries");
        }

        let bdbkey = Self::gen_key(&self.bdbkey)?;
        let datakey = Self::gen_key(&self.datakey)?;
        let data = self.gen_data()?;

        let header_signed_size =
            BDB_HEADER_SIZE + bdbkey.len() + self.oem_area_0.len() + datakey.len();
        let bdb_size = header_signed_size
            + BDB_SIG_FIXED_SIZE
            + self.bdbkey.sig_alg.sig_data_size()
            + data.len()
            + BDB_SIG_FIXED_SIZE
            + self.datakey.sig_alg.sig_data_size();

        let mut header = BdbHeader::new_zeroed();
        header.struct_magic.set(BDB_HEADER_MAGIC);
        header.struct_major_version = BDB_HEADER_VERSION_MAJOR;
        header.struct_minor_version = BDB_HEADER_VERSION_MINOR;
        header.struct_size.set(BDB_HEADER_SIZE as u16);
        header.bdb_load_address.set(self.bdb_load_address);
        header.bdb_size.set(bdb_size as u32);
        header.signed_size.set(header_signed_size as u32);
        header.oem_area_0_size.set(self.oem_area_0.len() as u32);

        let mut out = header.as_bytes().to_vec();
        out.extend(bdbkey);
        out.extend(&self.oem_area_0);
        out.extend(datakey);

        let header_sig = self.gen_sig(signer, &self.bdbkey, &out, &self.header_description)?;
        let data_sig = self.gen_sig(signer, &self.datakey, &data, "bdb data sig")?;
        out.extend(header_sig);
        out.extend(data);
        out.extend(data_sig);

        debug_assert_eq!(out.len(), bdb_size);
        Ok(out)
    }

    fn gen_data(&self) -> anyhow::Result<Vec<u8>> {
        let signed_size =
            BDB_DATA_FIXED_SIZE + self.oem_area_1.len() + self.hashes.len() * BDB_HASH_SIZE;

        let mut fixed = BdbData::new_zeroed();
        fixed.struct_magic.set(BDB_DATA_MAGIC);
        fixed.struct_major_version = BDB_DATA_VERSION_MAJOR;
        fixed.struct_minor_version = BDB_DATA_VERSION_MINOR;
        fixed.struct_size.set(BDB_DATA_FIXED_SIZE as u16);
        fixed.data_version.set(self.data_version);
        fixed.oem_area_1_size.set(self.oem_area_1.len() as u32);
        fixed.num_hashes = self.hashes.len() as u8;
        fixed.hash_entry_size = BDB_HASH_SIZE as u8;
        fixed.signed_size.set(signed_size as u32);
        write_description(&mut fixed.description, &self.data_description)?;

        let mut data = fixed.as_bytes().to_vec();
        data.extend(&self.oem_area_1);
        for hash in self.hashes.iter() {
            data.extend(hash.as_bytes());
        }
        Ok(data)
    }

    fn gen_key(config: &BdbKeyConfig) -> anyhow::Result<Vec<u8>> {
        let mut key = BdbKey::new_zeroed();
        key.struct_magic.set(BDB_KEY_MAGIC);
        key.struct_major_version = BDB_KEY_VERSION_MAJOR;
        key.struct_minor_version = BDB_KEY_VERSION_MINOR;
        key.struct_size.set((BDB_KEY_FIXED_SIZE + config.key_data.len()) as u16);
        key.hash_alg = BdbHashAlg::Sha256 as u8;
        key.sig_alg = config.sig_alg as u8;
        key.key_version.set(config.key_version);
        write_description(&mut key.description, &config.description)?;

        let mut out = key.as_bytes().to_vec();
        out.extend(&config.key_data);
        Ok(out)
    }

    fn gen_sig(
        &self,
        signer: &mut impl BdbSigner,
        key: &BdbKeyConfig,
        signed: &[u8],
        description: &str,
    ) -> anyhow::Result<Vec<u8>> {
        let digest = signer.sha256_digest(signed)?;
        let sig_data = signer.sign(key.sig_alg, &key.key_data, &digest)?;
        if sig_data.len() != key.sig_alg.sig_data_size() {
            bail!(
                "Signer produced {} bytes for {:?}",
                sig_data.len(),
                key.sig_alg
            );
        }

        let mut sig = BdbSig::new_zeroed();
        sig.struct_magic.set(BDB_SIG_MAGIC);
        sig.struct_major_version = BDB_SIG_VERSION_MAJOR;
        sig.struct_minor_version = BDB_SIG_VERSION_MINOR;
        sig.struct_size.set((BDB_SIG_FIXED_SIZE + sig_data.len()) as u16);
        sig.hash_alg = BdbHashAlg::Sha256 as u8;
        sig.sig_alg = key.sig_alg as u8;
        sig.signed_size.set(signed.len() as u32);
        write_description(&mut sig.description, description)?;

        let mut out = sig.as_bytes().to_vec();
        out.extend(sig_data);
        Ok(out)
    }
}

fn write_description(field: &mut [u8; BDB_DESCRIPTION_MAX_SIZE], text: &str) -> anyhow::Result<()> {
    if text.len() >= BDB_DESCRIPTION_MAX_SIZE {
        bail!("Description longer than {} bytes", BDB_DESCRIPTION_MAX_SIZE - 1);
    }
    field[..text.len()].copy_from_slice(text.as_bytes());
    Ok(())
}
