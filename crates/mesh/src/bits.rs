//! Packed bit storage for per-sample visibility masks.
//!
//! Subdivision grids store one hidden bit per sample, grouped per grid.
//! [`BitGroupVec`] packs all groups into one block array so the whole
//! structure can be cloned cheaply for double-buffered propagation, while
//! [`BitGroup`] is a single owned group used as scratch when recomputing a
//! grid's mask before deciding whether anything changed.

use serde::{Deserialize, Serialize};

const BLOCK_BITS: usize = 64;

fn block_count(bits: usize) -> usize {
    bits.div_ceil(BLOCK_BITS)
}

/// Mask selecting the valid bits of the last block of a span of `bits` bits.
fn tail_mask(bits: usize) -> u64 {
    let rem = bits % BLOCK_BITS;
    if rem == 0 { u64::MAX } else { (1u64 << rem) - 1 }
}

/// A single owned group of bits.
///
/// Invariant: bits past `len` are always zero, so block-wise comparison and
/// `any_set` never have to special-case the tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitGroup {
    blocks: Vec<u64>,
    len: usize,
}

impl BitGroup {
    pub fn new(len: usize, value: bool) -> Self {
        let mut group = Self {
            blocks: vec![0; block_count(len)],
            len,
        };
        if value {
            group.fill(true);
        }
        group
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.blocks[index / BLOCK_BITS] & (1u64 << (index % BLOCK_BITS)) != 0
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len);
        let block = &mut self.blocks[index / BLOCK_BITS];
        let bit = 1u64 << (index % BLOCK_BITS);
        if value {
            *block |= bit;
        } else {
            *block &= !bit;
        }
    }

    pub fn fill(&mut self, value: bool) {
        let pattern = if value { u64::MAX } else { 0 };
        self.blocks.fill(pattern);
        self.mask_tail();
    }

    /// Flip every bit in the group.
    pub fn invert(&mut self) {
        for block in &mut self.blocks {
            *block = !*block;
        }
        self.mask_tail();
    }

    pub fn any_set(&self) -> bool {
        self.blocks.iter().any(|&block| block != 0)
    }

    pub fn all_set(&self) -> bool {
        if self.len == 0 {
            return true;
        }
        let last = self.blocks.len() - 1;
        self.blocks[..last].iter().all(|&block| block == u64::MAX)
            && self.blocks[last] == tail_mask(self.len)
    }

    fn mask_tail(&mut self) {
        if let Some(last) = self.blocks.last_mut() {
            *last &= tail_mask(self.len);
        }
    }
}

/// A vector of equally sized bit groups, one group per grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitGroupVec {
    blocks: Vec<u64>,
    group_size: usize,
    blocks_per_group: usize,
    groups: usize,
}

impl BitGroupVec {
    pub fn new(groups: usize, group_size: usize, value: bool) -> Self {
        let blocks_per_group = block_count(group_size);
        let mut vec = Self {
            blocks: vec![0; groups * blocks_per_group],
            group_size,
            blocks_per_group,
            groups,
        };
        if value {
            vec.fill(true);
        }
        vec
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    fn group_blocks(&self, group: usize) -> &[u64] {
        let start = group * self.blocks_per_group;
        &self.blocks[start..start + self.blocks_per_group]
    }

    fn group_blocks_mut(&mut self, group: usize) -> &mut [u64] {
        let start = group * self.blocks_per_group;
        &mut self.blocks[start..start + self.blocks_per_group]
    }

    pub fn get(&self, group: usize, index: usize) -> bool {
        debug_assert!(index < self.group_size);
        self.group_blocks(group)[index / BLOCK_BITS] & (1u64 << (index % BLOCK_BITS)) != 0
    }

    pub fn set(&mut self, group: usize, index: usize, value: bool) {
        debug_assert!(index < self.group_size);
        let block = &mut self.group_blocks_mut(group)[index / BLOCK_BITS];
        let bit = 1u64 << (index % BLOCK_BITS);
        if value {
            *block |= bit;
        } else {
            *block &= !bit;
        }
    }

    pub fn fill(&mut self, value: bool) {
        let pattern = if value { u64::MAX } else { 0 };
        self.blocks.fill(pattern);
        if value {
            for group in 0..self.groups {
                self.mask_group_tail(group);
            }
        }
    }

    pub fn fill_group(&mut self, group: usize, value: bool) {
        let pattern = if value { u64::MAX } else { 0 };
        self.group_blocks_mut(group).fill(pattern);
        if value {
            self.mask_group_tail(group);
        }
    }

    pub fn invert_group(&mut self, group: usize) {
        for block in self.group_blocks_mut(group) {
            *block = !*block;
        }
        self.mask_group_tail(group);
    }

    pub fn any_set_in_group(&self, group: usize) -> bool {
        self.group_blocks(group).iter().any(|&block| block != 0)
    }

    pub fn all_set_in_group(&self, group: usize) -> bool {
        if self.group_size == 0 {
            return true;
        }
        let blocks = self.group_blocks(group);
        let last = blocks.len() - 1;
        blocks[..last].iter().all(|&block| block == u64::MAX)
            && blocks[last] == tail_mask(self.group_size)
    }

    pub fn any_set(&self) -> bool {
        self.blocks.iter().any(|&block| block != 0)
    }

    /// Copy one group out into an owned scratch buffer.
    pub fn group_to_owned(&self, group: usize) -> BitGroup {
        BitGroup {
            blocks: self.group_blocks(group).to_vec(),
            len: self.group_size,
        }
    }

    pub fn copy_group_from(&mut self, group: usize, source: &BitGroup) {
        debug_assert_eq!(source.len, self.group_size);
        self.group_blocks_mut(group).copy_from_slice(&source.blocks);
    }

    pub fn group_eq(&self, group: usize, other: &BitGroup) -> bool {
        self.group_size == other.len && self.group_blocks(group) == other.blocks.as_slice()
    }

    fn mask_group_tail(&mut self, group: usize) {
        let mask = tail_mask(self.group_size);
        if let Some(last) = self.group_blocks_mut(group).last_mut() {
            *last &= mask;
        }
    }
}
