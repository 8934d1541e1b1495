/*++

Licensed under the Apache-2.0 license.

File Name:

    extend.rs

Abstract:

    File contains the hash-extend primitive used to derive secrets: one SHA-256
    compression of a 64-byte block, starting from the previous secret as the
    chaining value.

--*/

use bdb_types::{ConstantBlock, Secret};
use sha2::digest::block_buffer::Block;
use sha2::digest::consts::U64;

const STATE_WORDS: usize = 8;

/// Hash-extend step: `to = compress(from, by)`
pub trait HashExtend {
    fn extend(&mut self, from: &Secret, by: &ConstantBlock, to: &mut Secret);
}

impl<F> HashExtend for F
where
    F: FnMut(&Secret, &ConstantBlock, &mut Secret),
{
    fn extend(&mut self, from: &Secret, by: &ConstantBlock, to: &mut Secret) {
        self(from, by, to)
    }
}

fn state_from_bytes(bytes: &Secret) -> [u32; STATE_WORDS] {
    let mut state = [0u32; STATE_WORDS];
    for (word, chunk) in state.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    state
}

fn state_to_bytes(state: &[u32; STATE_WORDS], bytes: &mut Secret) {
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(state.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}

/// Reference implementation
#[derive(Default, Debug, Copy, Clone)]
pub struct Sha256Extend;

impl HashExtend for Sha256Extend {
    fn extend(&mut self, from: &Secret, by: &ConstantBlock, to: &mut Secret) {
        let mut state = state_from_bytes(from);
        let block = *Block::<U64>::from_slice(by);
        sha2::compress256(&mut state, &[block]);
        state_to_bytes(&state, to);
    }
}

/// SHA-256 block engine whose chaining value can be loaded directly
pub trait Sha256Accel {
    /// Load the chaining value
    fn load_state(&mut self, state: &[u32; STATE_WORDS]);

    /// Compress one block into the current state
    fn compress(&mut self, block: &ConstantBlock);

    /// Read back the chaining value
    fn read_state(&mut self) -> [u32; STATE_WORDS];
}

/// Hash-extend on a SHA-256 block engine
pub struct AccelExtend<A: Sha256Accel> {
    accel: A,
}

impl<A: Sha256Accel> AccelExtend<A> {
    pub fn new(accel: A) -> Self {
        Self { accel }
    }
}

impl<A: Sha256Accel> HashExtend for AccelExtend<A> {
    fn extend(&mut self, from: &Secret, by: &ConstantBlock, to: &mut Secret) {
        self.accel.load_state(&state_from_bytes(from));
        self.accel.compress(by);
        let state = self.accel.read_state();
        state_to_bytes(&state, to);
    }
}

/// Software model of a SHA-256 block engine
#[derive(Default, Debug, Clone)]
pub struct SoftSha256Accel {
    state: [u32; STATE_WORDS],
}

impl Sha256Accel for SoftSha256Accel {
    fn load_state(&mut self, state: &[u32; STATE_WORDS]) {
        self.state = *state;
    }

    fn compress(&mut self, block: &ConstantBlock) {
        let block = *Block::<U64>::from_slice(block);
        sha2::compress256(&mut self.state, &[block]);
    }

    fn read_state(&mut self) -> [u32; STATE_WORDS] {
        self.state
    }
}
