//! # convoy-ring: Consistent-Hash Routing with Bounded Loads
//!
//! Deterministic key-to-member assignment for routing tenant work to a pool
//! of stateless workers. Keys hash into a fixed partition space; partitions
//! are owned by members through virtual-node placement on a sorted hash ring,
//! with a per-member load cap that keeps any single member from absorbing a
//! disproportionate share after a membership change.
//!
//! The hash is the big-endian first 8 bytes of a SHA-256 digest, so
//! assignments are stable across process restarts with no seed.

use std::collections::HashMap;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;

/// A physical ring member: an opaque worker address used both as the
/// routable identity and as the hash key for virtual-node placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RingMember(pub String);

impl RingMember {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RingMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RingMember {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

impl From<&str> for RingMember {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

/// Ring tuning parameters.
///
/// `partition_count` fixes the number of hash-space buckets independent of
/// membership; `replication_factor` is the number of virtual nodes placed
/// per member; `load_factor` bounds how many partitions one member may own
/// relative to the ideal average.
#[derive(Debug, Clone)]
pub struct RingConfig {
    pub partition_count: u64,
    pub replication_factor: u64,
    pub load_factor: f64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            partition_count: 71,
            replication_factor: 20,
            load_factor: 1.25,
        }
    }
}

/// Consistent-hash ring assigning byte-string keys to members.
///
/// Reads are pure in-memory lookups; membership mutation rebuilds only the
/// affected virtual nodes and redistributes the partition table. Callers
/// share a ring behind a reader/writer lock; nothing here blocks.
pub struct HashRing {
    config: RingConfig,
    members: HashMap<String, RingMember>,
    /// Virtual-node hashes, sorted for binary-search successor lookup
    sorted_hashes: Vec<u64>,
    /// Virtual-node hash -> owning member name
    virtual_nodes: HashMap<u64, String>,
    /// Partition id -> owning member name
    partitions: HashMap<u64, String>,
}

fn hash64(data: &[u8]) -> u64 {
    let digest = Sha256::digest(data);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

impl HashRing {
    /// Create an empty ring with the given configuration.
    pub fn new(config: RingConfig) -> Self {
        Self {
            config,
            members: HashMap::new(),
            sorted_hashes: Vec::new(),
            virtual_nodes: HashMap::new(),
            partitions: HashMap::new(),
        }
    }

    /// Create a ring with the default configuration and initial members.
    pub fn with_members<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<RingMember>,
    {
        let mut ring = Self::new(RingConfig::default());
        for member in members {
            ring.add(member.into());
        }
        ring
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Iterate the current member set in no particular order.
    pub fn members(&self) -> impl Iterator<Item = &RingMember> {
        self.members.values()
    }

    /// Add a member, placing its virtual nodes and redistributing partitions.
    ///
    /// Adding an already-present member is a reported no-op and returns
    /// `false`.
    pub fn add(&mut self, member: RingMember) -> bool {
        if self.members.contains_key(member.as_str()) {
            debug!(member = %member, "ignoring duplicate ring member");
            return false;
        }

        for i in 0..self.config.replication_factor {
            let hash = hash64(format!("{}{}", member.as_str(), i).as_bytes());
            self.virtual_nodes.insert(hash, member.as_str().to_string());
            self.sorted_hashes.push(hash);
        }
        self.sorted_hashes.sort_unstable();

        debug!(member = %member, "added ring member");
        self.members.insert(member.as_str().to_string(), member);
        self.distribute_partitions();
        true
    }

    /// Remove a member and return its partitions to the survivors.
    ///
    /// Removing an absent member is a reported no-op and returns `false`.
    pub fn remove(&mut self, member: &str) -> bool {
        if self.members.remove(member).is_none() {
            debug!(member, "ignoring removal of absent ring member");
            return false;
        }

        for i in 0..self.config.replication_factor {
            let hash = hash64(format!("{member}{i}").as_bytes());
            self.virtual_nodes.remove(&hash);
            if let Ok(idx) = self.sorted_hashes.binary_search(&hash) {
                self.sorted_hashes.remove(idx);
            }
        }

        debug!(member, "removed ring member");
        self.distribute_partitions();
        true
    }

    /// Resolve the member owning `key`.
    ///
    /// Returns `None` only when the ring has no members; the caller surfaces
    /// that as a routing failure.
    pub fn locate(&self, key: &[u8]) -> Option<&RingMember> {
        if self.members.is_empty() {
            return None;
        }
        let partition = hash64(key) % self.config.partition_count;
        let owner = self.partitions.get(&partition)?;
        self.members.get(owner)
    }

    /// Partitions owned per member, for balance inspection.
    pub fn loads(&self) -> HashMap<String, u64> {
        let mut loads: HashMap<String, u64> = HashMap::new();
        for owner in self.partitions.values() {
            *loads.entry(owner.clone()).or_insert(0) += 1;
        }
        loads
    }

    /// Maximum partitions one member may own under the current membership.
    fn max_load(&self) -> u64 {
        let average =
            (self.config.partition_count as f64 / self.members.len() as f64) * self.config.load_factor;
        average.ceil() as u64
    }

    /// Rebuild the partition table: each partition goes to the successor of
    /// its hash on the virtual-node ring, skipping members already at the
    /// load cap.
    fn distribute_partitions(&mut self) {
        self.partitions.clear();
        if self.members.is_empty() {
            return;
        }

        let max_load = self.max_load();
        let ring_len = self.sorted_hashes.len();
        let mut loads: HashMap<&str, u64> = HashMap::new();

        for partition in 0..self.config.partition_count {
            let key = hash64(&partition.to_le_bytes());
            let mut idx = match self.sorted_hashes.binary_search(&key) {
                Ok(i) => i,
                Err(i) => i % ring_len,
            };

            // The cap guarantees total capacity above the partition count, so
            // the walk always lands within one lap of the ring.
            for _ in 0..=ring_len {
                let owner = &self.virtual_nodes[&self.sorted_hashes[idx]];
                let load = loads.entry(owner.as_str()).or_insert(0);
                if *load < max_load {
                    *load += 1;
                    self.partitions.insert(partition, owner.clone());
                    break;
                }
                idx = (idx + 1) % ring_len;
            }
        }
    }
}
