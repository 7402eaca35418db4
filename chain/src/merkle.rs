//! Authenticated segment storage: a Merkle tree over fixed-size segments
//! of a file, with persisted internal nodes and verifiable membership
//! proofs ([`AuthDataBlock`]).

use std::fs;
use std::path::Path;

use crate::codec::Hash32;
use crate::storage::{Storage, StorageError};

/// Default segment size in bytes, per spec.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024;

/// A leaf segment plus the sibling hashes needed to recompute the root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthDataBlock {
    pub data: Vec<u8>,
    pub merkle_path: Vec<Hash32>,
}

impl AuthDataBlock {
    /// Recomputes the root from `data` and `merkle_path` given the leaf's
    /// `index`, and compares it against `root_hash`.
    pub fn check(&self, mut index: u64, root_hash: Hash32) -> bool {
        let mut h = Hash32::compute(&self.data);
        for sibling in &self.merkle_path {
            h = if index & 1 == 0 {
                Hash32::compute_pair(&h, sibling)
            } else {
                Hash32::compute_pair(sibling, &h)
            };
            index >>= 1;
        }
        h == root_hash
    }
}

fn next_power_of_two(n: u64) -> u64 {
    if n <= 1 {
        return 1;
    }
    1u64 << (64 - (n - 1).leading_zeros())
}

fn zero_segment(segment_size: usize) -> Vec<u8> {
    vec![0u8; segment_size]
}

/// A Merkle tree over `n` fixed-size segments, padded to the next power
/// of two, with every level persisted in a [`Storage`] keyed by
/// `(level, index)`.
pub struct MerkleTree {
    pub segment_size: usize,
    /// Number of real (non-padding) leaf segments.
    pub n: u64,
    /// Number of leaves after padding to a power of two.
    pub leaf_count: u64,
    /// `ceil(log2(max(n,2)))`: number of fold levels above the leaves.
    pub levels: u32,
    pub root_hash: Hash32,
}

impl MerkleTree {
    /// Builds a tree from a file of `n * segment_size` bytes (the last
    /// segment is zero-padded if the file length isn't a multiple of
    /// `segment_size`), persisting every level into `nodes` and every
    /// real leaf's bytes into `leaves`.
    pub fn from_file<L, N>(
        path: &Path,
        segment_size: usize,
        leaves: &mut L,
        nodes: &mut N,
    ) -> Result<Self, StorageError>
    where
        L: Storage<u64, Vec<u8>>,
        N: Storage<(u8, u64), Hash32>,
    {
        let bytes = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        let mut segments: Vec<Vec<u8>> = bytes
            .chunks(segment_size)
            .map(|chunk| {
                let mut seg = chunk.to_vec();
                seg.resize(segment_size, 0u8);
                seg
            })
            .collect();
        if segments.is_empty() {
            segments.push(zero_segment(segment_size));
        }
        let n = segments.len() as u64;

        for (i, seg) in segments.iter().enumerate() {
            leaves.set(i as u64, seg.clone());
        }

        let tree = Self::build(segments, segment_size, nodes)?;
        leaves.commit()?;
        nodes.commit()?;
        Ok(Self { n, ..tree })
    }

    fn build<N>(
        segments: Vec<Vec<u8>>,
        segment_size: usize,
        nodes: &mut N,
    ) -> Result<Self, StorageError>
    where
        N: Storage<(u8, u64), Hash32>,
    {
        let n = segments.len() as u64;
        let leaf_count = next_power_of_two(n.max(2));
        let levels = leaf_count.trailing_zeros();

        let zero_hash = Hash32::compute(&zero_segment(segment_size));
        let mut current: Vec<Hash32> = (0..leaf_count)
            .map(|i| {
                if i < n {
                    Hash32::compute(&segments[i as usize])
                } else {
                    zero_hash
                }
            })
            .collect();

        for (i, h) in current.iter().enumerate() {
            nodes.set((0, i as u64), *h);
        }

        for level in 0..levels {
            let mut next = Vec::with_capacity(current.len() / 2);
            for pair in current.chunks(2) {
                next.push(Hash32::compute_pair(&pair[0], &pair[1]));
            }
            for (i, h) in next.iter().enumerate() {
                nodes.set((level as u8 + 1, i as u64), *h);
            }
            current = next;
        }

        let root_hash = current[0];
        Ok(MerkleTree {
            segment_size,
            n,
            leaf_count,
            levels,
            root_hash,
        })
    }

    /// Rebuilds tree metadata (and re-derives the root) from an
    /// already-populated `nodes`/`leaves` store, without re-reading the
    /// source file. Used to verify P3: the same leaves always fold to
    /// the same root, whether built fresh or reopened.
    pub fn open<N>(n: u64, segment_size: usize, nodes: &N) -> Option<Self>
    where
        N: Storage<(u8, u64), Hash32>,
    {
        let leaf_count = next_power_of_two(n.max(2));
        let levels = leaf_count.trailing_zeros();

        let mut current: Vec<Hash32> = Vec::with_capacity(leaf_count as usize);
        for i in 0..leaf_count {
            current.push(nodes.get(&(0, i))?);
        }

        for level in 0..levels {
            let mut next = Vec::with_capacity(current.len() / 2);
            for pair in current.chunks(2) {
                next.push(Hash32::compute_pair(&pair[0], &pair[1]));
            }
            current = next;
        }

        Some(MerkleTree {
            segment_size,
            n,
            leaf_count,
            levels,
            root_hash: current[0],
        })
    }

    /// Loads the leaf segment at `index` (real or zero-padding) and its
    /// sibling path from level 0 up to the root.
    pub fn by_index<L, N>(&self, index: u64, leaves: &L, nodes: &N) -> Option<AuthDataBlock>
    where
        L: Storage<u64, Vec<u8>>,
        N: Storage<(u8, u64), Hash32>,
    {
        if index >= self.leaf_count {
            return None;
        }

        let data = if index < self.n {
            leaves.get(&index)?
        } else {
            zero_segment(self.segment_size)
        };

        let mut path = Vec::with_capacity(self.levels as usize);
        let mut idx = index;
        for level in 0..self.levels {
            let sibling_idx = idx ^ 1;
            let sibling = nodes.get(&(level as u8, sibling_idx))?;
            path.push(sibling);
            idx >>= 1;
        }

        Some(AuthDataBlock {
            data,
            merkle_path: path,
        })
    }
}
