/*++

Licensed under the Apache-2.0 license.

File Name:

    format.rs

Abstract:

    Structural checks and bounds-checked accessors for the Boot Descriptor Block.

--*/

use bdb_error::{BootError, BootResult};
use bdb_types::*;
use zerocopy::{FromBytes, LayoutVerified, Unaligned};

/// Reference the fixed part of a structure at the start of `buf`
fn fixed<T: FromBytes + Unaligned>(buf: &[u8]) -> BootResult<&T> {
    LayoutVerified::<&[u8], T>::new_unaligned_from_prefix(buf)
        .map(|(lv, _)| lv.into_ref())
        .ok_or(BootError::BDB_BUF_SIZE)
}

/// Sub-slice `buf[offset..offset + len]`
fn sub(buf: &[u8], offset: usize, len: usize) -> BootResult<&[u8]> {
    let end = offset.checked_add(len).ok_or(BootError::BDB_BUF_SIZE)?;
    buf.get(offset..end).ok_or(BootError::BDB_BUF_SIZE)
}

/// Sub-slice `buf[offset..]`
fn tail(buf: &[u8], offset: usize) -> BootResult<&[u8]> {
    buf.get(offset..).ok_or(BootError::BDB_BUF_SIZE)
}

fn check_description(description: &[u8]) -> BootResult<()> {
    match description_terminator(description) {
        Some(_) => Ok(()),
        None => Err(BootError::BDB_DESCRIPTION),
    }
}

/// A key whose structure has been checked. `as_bytes` covers exactly `struct_size`.
#[derive(Debug, Copy, Clone)]
pub struct BdbKeyView<'a> {
    pub key: &'a BdbKey,
    pub sig_alg: BdbSigAlg,
    raw: &'a [u8],
    key_data: &'a [u8],
}

impl<'a> BdbKeyView<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    pub fn key_data(&self) -> &'a [u8] {
        self.key_data
    }

    pub fn key_version(&self) -> u32 {
        self.key.key_version.get()
    }
}

/// A signature whose structure has been checked
#[derive(Debug, Copy, Clone)]
pub struct BdbSigView<'a> {
    pub sig: &'a BdbSig,
    pub sig_alg: BdbSigAlg,
    sig_data: &'a [u8],
}

impl<'a> BdbSigView<'a> {
    pub fn sig_data(&self) -> &'a [u8] {
        self.sig_data
    }

    pub fn signed_size(&self) -> usize {
        self.sig.signed_size.get() as usize
    }
}

/// A data section whose structure has been checked. `as_bytes` covers exactly
/// `signed_size`, which includes OEM area 1 and every hash entry.
#[derive(Debug, Copy, Clone)]
pub struct BdbDataView<'a> {
    pub data: &'a BdbData,
    raw: &'a [u8],
}

impl<'a> BdbDataView<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    pub fn oem_area_1(&self) -> &'a [u8] {
        let start = self.data.struct_size.get() as usize;
        let len = self.data.oem_area_1_size.get() as usize;
        sub(self.raw, start, len).unwrap_or(&[])
    }

    /// Hash entries in table order
    pub fn hashes(&self) -> impl Iterator<Item = &'a BdbHash> + 'a {
        let start = self.data.struct_size.get() as usize + self.data.oem_area_1_size.get() as usize;
        let entry_size = self.data.hash_entry_size as usize;
        let num = self.data.num_hashes as usize;
        let table = sub(self.raw, start, num * entry_size).unwrap_or(&[]);
        table
            .chunks_exact(entry_size.max(1))
            .filter_map(|entry| fixed::<BdbHash>(entry).ok())
    }
}

/// Check the BDB header at the start of `buf`
pub fn check_header(buf: &[u8]) -> BootResult<&BdbHeader> {
    let h: &BdbHeader = fixed(buf)?;

    if buf.len() < h.struct_size.get() as usize {
        return Err(BootError::BDB_BUF_SIZE);
    }
    if h.struct_magic.get() != BDB_HEADER_MAGIC {
        return Err(BootError::BDB_STRUCT_MAGIC);
    }
    // Minor version changes are compatible in both directions
    if h.struct_major_version != BDB_HEADER_VERSION_MAJOR {
        return Err(BootError::BDB_STRUCT_VERSION);
    }
    if (h.struct_size.get() as usize) < BDB_HEADER_SIZE {
        return Err(BootError::BDB_STRUCT_SIZE);
    }
    if (h.bdb_size.get() as usize) < BDB_HEADER_SIZE {
        return Err(BootError::BDB_BDB_SIZE);
    }
    if h.oem_area_0_size.get() & 3 != 0 {
        return Err(BootError::BDB_OEM_AREA_SIZE);
    }

    Ok(h)
}

/// Check the key at the start of `buf`
pub fn check_key(buf: &[u8]) -> BootResult<BdbKeyView<'_>> {
    let key: &BdbKey = fixed(buf)?;
    let struct_size = key.struct_size.get() as usize;

    if buf.len() < struct_size {
        return Err(BootError::BDB_BUF_SIZE);
    }
    if key.struct_magic.get() != BDB_KEY_MAGIC {
        return Err(BootError::BDB_STRUCT_MAGIC);
    }
    if key.struct_major_version != BDB_KEY_VERSION_MAJOR {
        return Err(BootError::BDB_STRUCT_VERSION);
    }
    let payload_size = struct_size
        .checked_sub(BDB_KEY_FIXED_SIZE)
        .ok_or(BootError::BDB_STRUCT_SIZE)?;
    check_description(&key.description)?;
    BdbHashAlg::try_from(key.hash_alg)?;
    let sig_alg = BdbSigAlg::try_from(key.sig_alg)?;
    if payload_size != sig_alg.key_data_size() {
        return Err(BootError::BDB_SIG_ALG);
    }

    Ok(BdbKeyView {
        key,
        sig_alg,
        raw: sub(buf, 0, struct_size)?,
        key_data: sub(buf, BDB_KEY_FIXED_SIZE, payload_size)?,
    })
}

/// Check the signature at the start of `buf`
pub fn check_sig(buf: &[u8]) -> BootResult<BdbSigView<'_>> {
    let sig: &BdbSig = fixed(buf)?;
    let struct_size = sig.struct_size.get() as usize;

    if buf.len() < struct_size {
        return Err(BootError::BDB_BUF_SIZE);
    }
    if sig.struct_magic.get() != BDB_SIG_MAGIC {
        return Err(BootError::BDB_STRUCT_MAGIC);
    }
    if sig.struct_major_version != BDB_SIG_VERSION_MAJOR {
        return Err(BootError::BDB_STRUCT_VERSION);
    }
    let payload_size = struct_size
        .checked_sub(BDB_SIG_FIXED_SIZE)
        .ok_or(BootError::BDB_STRUCT_SIZE)?;
    check_description(&sig.description)?;
    BdbHashAlg::try_from(sig.hash_alg)?;
    let sig_alg = BdbSigAlg::try_from(sig.sig_alg)?;
    if payload_size != sig_alg.sig_data_size() {
        return Err(BootError::BDB_SIG_ALG);
    }

    Ok(BdbSigView {
        sig,
        sig_alg,
        sig_data: sub(buf, BDB_SIG_FIXED_SIZE, payload_size)?,
    })
}

/// Check the data section at the start of `buf`
pub fn check_data(buf: &[u8]) -> BootResult<BdbDataView<'_>> {
    let data: &BdbData = fixed(buf)?;
    let struct_size = data.struct_size.get() as u32;
    let signed_size = data.signed_size.get();

    if buf.len() < struct_size as usize || buf.len() < signed_size as usize {
        return Err(BootError::BDB_BUF_SIZE);
    }
    if data.struct_magic.get() != BDB_DATA_MAGIC {
        return Err(BootError::BDB_STRUCT_MAGIC);
    }
    if data.struct_major_version != BDB_DATA_VERSION_MAJOR {
        return Err(BootError::BDB_STRUCT_VERSION);
    }
    if (struct_size as usize) < BDB_DATA_FIXED_SIZE {
        return Err(BootError::BDB_STRUCT_SIZE);
    }
    check_description(&data.description)?;
    if (data.hash_entry_size as usize) < BDB_HASH_SIZE {
        return Err(BootError::BDB_HASH_ENTRY_SIZE);
    }

    // u16 + u8 * u8 cannot overflow a u32; adding the OEM area can
    let need_size = struct_size + data.num_hashes as u32 * data.hash_entry_size as u32;
    let oem_area_1_size = data.oem_area_1_size.get();
    let need_size = need_size
        .checked_add(oem_area_1_size)
        .ok_or(BootError::BDB_OEM_AREA_SIZE)?;
    if oem_area_1_size & 3 != 0 {
        return Err(BootError::BDB_OEM_AREA_SIZE);
    }
    if signed_size != need_size {
        return Err(BootError::BDB_SIGNED_SIZE);
    }

    Ok(BdbDataView {
        data,
        raw: sub(buf, 0, signed_size as usize)?,
    })
}

/*
 * Accessors. Each one derives its offset from the structures before it in the
 * chain; only the bounds of `buf` are enforced, so the result is meaningful
 * only once the preceding structures have been checked.
 */

pub fn get_header(buf: &[u8]) -> BootResult<&BdbHeader> {
    fixed(buf)
}

fn bdbkey_offset(buf: &[u8]) -> BootResult<usize> {
    Ok(get_header(buf)?.struct_size.get() as usize)
}

fn oem_area_0_offset(buf: &[u8]) -> BootResult<usize> {
    let offset = bdbkey_offset(buf)?;
    let key: &BdbKey = fixed(tail(buf, offset)?)?;
    Ok(offset + key.struct_size.get() as usize)
}

fn datakey_offset(buf: &[u8]) -> BootResult<usize> {
    let oem_size = get_header(buf)?.oem_area_0_size.get() as usize;
    oem_area_0_offset(buf)?
        .checked_add(oem_size)
        .ok_or(BootError::BDB_BUF_SIZE)
}

fn data_offset(buf: &[u8]) -> BootResult<usize> {
    let offset = get_header(buf)?.signed_size.get() as usize;
    let sig: &BdbSig = fixed(tail(buf, offset)?)?;
    Ok(offset + sig.struct_size.get() as usize)
}

/// Root key, from the end of the header to the end of the buffer
pub fn get_bdbkey(buf: &[u8]) -> BootResult<&[u8]> {
    tail(buf, bdbkey_offset(buf)?)
}

/// OEM area 0, exactly `oem_area_0_size` bytes
pub fn get_oem_area_0(buf: &[u8]) -> BootResult<&[u8]> {
    let len = get_header(buf)?.oem_area_0_size.get() as usize;
    sub(buf, oem_area_0_offset(buf)?, len).map_err(|_| BootError::BDB_OEM_AREA_0)
}

/// Data key, from the end of OEM area 0 to the end of the buffer
pub fn get_datakey(buf: &[u8]) -> BootResult<&[u8]> {
    tail(buf, datakey_offset(buf)?)
}

/// Offset one past the end of the data key
pub fn datakey_end(buf: &[u8]) -> BootResult<usize> {
    let offset = datakey_offset(buf)?;
    let key: &BdbKey = fixed(tail(buf, offset)?)?;
    Ok(offset + key.struct_size.get() as usize)
}

/// Header signature, starting at `header.signed_size`
pub fn get_header_sig(buf: &[u8]) -> BootResult<&[u8]> {
    tail(buf, get_header(buf)?.signed_size.get() as usize)
}

/// Data section, following the header signature
pub fn get_data(buf: &[u8]) -> BootResult<&[u8]> {
    tail(buf, data_offset(buf)?)
}

/// OEM area 1, exactly `oem_area_1_size` bytes
pub fn get_oem_area_1(buf: &[u8]) -> BootResult<&[u8]> {
    let data_buf = get_data(buf)?;
    let data: &BdbData = fixed(data_buf)?;
    sub(
        data_buf,
        data.struct_size.get() as usize,
        data.oem_area_1_size.get() as usize,
    )
}

/// First hash entry of the given type
pub fn get_hash_by_type(buf: &[u8], r#type: BdbDataType) -> BootResult<&BdbHash> {
    let data_buf = get_data(buf)?;
    let data: &BdbData = fixed(data_buf)?;
    let entry_size = data.hash_entry_size as usize;
    if entry_size < BDB_HASH_SIZE {
        return Err(BootError::BDB_HASH_ENTRY_SIZE);
    }

    let mut offset = (data.struct_size.get() as usize)
        .checked_add(data.oem_area_1_size.get() as usize)
        .ok_or(BootError::BDB_BUF_SIZE)?;
    for _ in 0..data.num_hashes {
        let hash: &BdbHash = fixed(sub(data_buf, offset, entry_size)?)?;
        if hash.r#type == u8::from(r#type) {
            return Ok(hash);
        }
        offset += entry_size;
    }

    Err(BootError::BDB_HASH_NOT_FOUND)
}

/// Data signature, at `data.signed_size` past the start of the data section
pub fn get_data_sig(buf: &[u8]) -> BootResult<&[u8]> {
    let data_buf = get_data(buf)?;
    let data: &BdbData = fixed(data_buf)?;
    tail(data_buf, data.signed_size.get() as usize)
}
