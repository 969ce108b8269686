//! Fixed-depth Poseidon Merkle climbing and reference trees.
//!
//! A path is climbed from the leaf upwards. At each level the current node is
//! combined with its sibling via [`hash2`]; a `false` direction bit puts the
//! current node first (it is a left child), `true` puts the sibling first.
//! Index-addressed trees take the bits from the leaf index, lowest bit first.
//! The sparse tree takes them from the hash of its key.

use crate::field::FieldElement;
use crate::poseidon::{hash1, hash2};
use civitas_types::{CivitasError, CivitasResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sibling path for an index-addressed tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerklePath {
    pub leaf_index: u64,
    pub siblings: Vec<FieldElement>,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    pub fn direction_bits(&self) -> Vec<bool> {
        index_to_bits(self.leaf_index, self.siblings.len())
    }
}

/// Sibling path for a key-addressed sparse tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparsePath {
    pub siblings: Vec<FieldElement>,
    pub path_bits: Vec<bool>,
}

pub fn index_to_bits(index: u64, depth: usize) -> Vec<bool> {
    (0..depth)
        .map(|level| level < 64 && (index >> level) & 1 == 1)
        .collect()
}

/// Direction bits of a key in a sparse tree: the low `depth` bits of
/// `hash1(key)`, read low-to-high.
pub fn path_bits_for_key(key: &FieldElement, depth: usize) -> Vec<bool> {
    hash1(key).low_bits(depth)
}

fn bits_to_index(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .filter(|(_, bit)| **bit)
        .fold(0u64, |acc, (level, _)| acc | (1u64 << level))
}

pub fn climb_by_bits(
    leaf: &FieldElement,
    path_bits: &[bool],
    siblings: &[FieldElement],
) -> CivitasResult<FieldElement> {
    if path_bits.len() != siblings.len() {
        return Err(CivitasError::Construction(format!(
            "path has {} direction bits but {} siblings",
            path_bits.len(),
            siblings.len()
        )));
    }

    let mut current = *leaf;
    for (sibling, sibling_first) in siblings.iter().zip(path_bits) {
        current = if *sibling_first {
            hash2(sibling, &current)
        } else {
            hash2(&current, sibling)
        };
    }

    Ok(current)
}

pub fn climb_by_index(
    leaf: &FieldElement,
    leaf_index: u64,
    siblings: &[FieldElement],
) -> CivitasResult<FieldElement> {
    let depth = siblings.len();
    if depth < 64 && leaf_index >> depth != 0 {
        return Err(CivitasError::Construction(format!(
            "leaf index {} does not fit a tree of depth {}",
            leaf_index, depth
        )));
    }
    climb_by_bits(leaf, &index_to_bits(leaf_index, depth), siblings)
}

/// Root of a tree with no entries: the zero leaf climbed against zero
/// siblings.
fn empty_root(depth: usize) -> FieldElement {
    let zero = FieldElement::zero();
    (0..depth).fold(zero, |node, _| hash2(&node, &zero))
}

/// Builds the next level of a sparse level map. A missing sibling is the
/// zero element at every level, so a lone leaf at index 0 climbs to the same
/// root as an all-zero sibling path.
fn parent_level(level: &BTreeMap<u64, FieldElement>) -> BTreeMap<u64, FieldElement> {
    let empty = &FieldElement::zero();
    let mut parents = BTreeMap::new();
    for (&index, node) in level {
        let parent = index >> 1;
        if parents.contains_key(&parent) {
            continue;
        }
        let hashed = if index & 1 == 0 {
            let right = level.get(&(index | 1)).unwrap_or(empty);
            hash2(node, right)
        } else {
            let left = level.get(&(index & !1)).unwrap_or(empty);
            hash2(left, node)
        };
        parents.insert(parent, hashed);
    }
    parents
}

fn levels_of(leaves: BTreeMap<u64, FieldElement>, depth: usize) -> Vec<BTreeMap<u64, FieldElement>> {
    let mut levels = Vec::with_capacity(depth + 1);
    levels.push(leaves);
    for level in 0..depth {
        let next = parent_level(&levels[level]);
        levels.push(next);
    }
    levels
}

fn root_of(levels: &[BTreeMap<u64, FieldElement>], depth: usize) -> FieldElement {
    levels[depth]
        .get(&0)
        .copied()
        .unwrap_or_else(|| empty_root(depth))
}

fn siblings_for(
    levels: &[BTreeMap<u64, FieldElement>],
    index: u64,
    depth: usize,
) -> Vec<FieldElement> {
    let mut idx = index;
    let mut siblings = Vec::with_capacity(depth);
    for level in 0..depth {
        let sibling = levels[level]
            .get(&(idx ^ 1))
            .copied()
            .unwrap_or_else(FieldElement::zero);
        siblings.push(sibling);
        idx >>= 1;
    }
    siblings
}

/// Append-only Poseidon tree addressed by insertion index. Empty slots and
/// empty subtrees hold the zero element.
pub struct IndexedMerkleTree {
    leaves: Vec<FieldElement>,
    depth: usize,
}

impl IndexedMerkleTree {
    pub fn new(depth: usize) -> Self {
        Self {
            leaves: Vec::new(),
            depth,
        }
    }

    pub fn insert(&mut self, leaf: FieldElement) -> CivitasResult<u64> {
        let index = self.leaves.len() as u64;
        if self.depth < 64 && index >> self.depth != 0 {
            return Err(CivitasError::Construction(format!(
                "tree of depth {} is full",
                self.depth
            )));
        }
        self.leaves.push(leaf);
        Ok(index)
    }

    fn levels(&self) -> Vec<BTreeMap<u64, FieldElement>> {
        let leaves = self
            .leaves
            .iter()
            .enumerate()
            .map(|(i, leaf)| (i as u64, *leaf))
            .collect();
        levels_of(leaves, self.depth)
    }

    pub fn root(&self) -> FieldElement {
        if self.leaves.is_empty() {
            return empty_root(self.depth);
        }
        root_of(&self.levels(), self.depth)
    }

    pub fn proof(&self, index: u64) -> Option<MerklePath> {
        if index >= self.leaves.len() as u64 {
            return None;
        }
        let levels = self.levels();
        Some(MerklePath {
            leaf_index: index,
            siblings: siblings_for(&levels, index, self.depth),
        })
    }

    pub fn verify(leaf: &FieldElement, path: &MerklePath, root: &FieldElement) -> bool {
        matches!(climb_by_index(leaf, path.leaf_index, &path.siblings), Ok(computed) if computed == *root)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Key-addressed sparse Poseidon tree. A key's position is derived from
/// [`path_bits_for_key`]; two keys landing on the same position is an error.
pub struct SparseMerkleTree {
    depth: usize,
    leaves: BTreeMap<u64, FieldElement>,
    keys: BTreeMap<u64, FieldElement>,
}

impl SparseMerkleTree {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            leaves: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }

    pub fn position_of(&self, key: &FieldElement) -> u64 {
        bits_to_index(&path_bits_for_key(key, self.depth))
    }

    /// Inserts or replaces the leaf stored under `key`.
    pub fn insert(&mut self, key: FieldElement, leaf: FieldElement) -> CivitasResult<u64> {
        let position = self.position_of(&key);
        if let Some(existing) = self.keys.get(&position) {
            if *existing != key {
                return Err(CivitasError::Construction(format!(
                    "sparse tree position {} already holds a different key",
                    position
                )));
            }
        }
        self.keys.insert(position, key);
        self.leaves.insert(position, leaf);
        Ok(position)
    }

    pub fn root(&self) -> FieldElement {
        if self.leaves.is_empty() {
            return empty_root(self.depth);
        }
        root_of(&levels_of(self.leaves.clone(), self.depth), self.depth)
    }

    pub fn proof(&self, key: &FieldElement) -> Option<SparsePath> {
        let position = self.position_of(key);
        if self.keys.get(&position) != Some(key) {
            return None;
        }
        let levels = levels_of(self.leaves.clone(), self.depth);
        Some(SparsePath {
            siblings: siblings_for(&levels, position, self.depth),
            path_bits: path_bits_for_key(key, self.depth),
        })
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}
