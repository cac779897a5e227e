use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Generate a page seed from its path using CRC32
pub fn get_page_seed(path: &str) -> String {
    let mut buff = String::from(path);
    if !path.starts_with("page://") {
        buff = format!("page://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opaque block identifier, unique within a page's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Rich-text node identifier, unique within one field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sequential id generator.
///
/// Every id handed out or reserved is remembered, so a generator never
/// produces an id that is already in use on its page. Reserving an id of
/// the generator's own `seed-N` form also moves the counter past `N`, and
/// [`IdGenerator::advance_to`] restores a persisted high-water mark, so ids
/// of blocks removed before a reload are not minted again.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
    reserved: HashSet<String>,
}

impl IdGenerator {
    pub fn new(path: &str) -> Self {
        Self::from_seed(get_page_seed(path))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
            reserved: HashSet::new(),
        }
    }

    /// Mark an existing id as taken
    pub fn reserve(&mut self, id: impl Into<String>) {
        let id = id.into();
        if let Some(n) = self.sequence_of(&id) {
            self.advance_to(n);
        }
        self.reserved.insert(id);
    }

    /// Counter value of an id minted with this generator's seed
    fn sequence_of(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.seed.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    /// Never hand out a counter value at or below `count`
    pub fn advance_to(&mut self, count: u64) {
        self.count = self.count.max(count);
    }

    /// Last counter value used
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reserve_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.reserve(id);
        }
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.reserved.contains(id)
    }

    /// Generate next sequential ID, skipping reserved ones
    pub fn new_id(&mut self) -> String {
        loop {
            self.count += 1;
            let id = format!("{}-{}", self.seed, self.count);
            if self.reserved.insert(id.clone()) {
                return id;
            }
        }
    }

    pub fn new_block_id(&mut self) -> BlockId {
        BlockId(self.new_id())
    }

    pub fn new_node_id(&mut self) -> NodeId {
        NodeId(self.new_id())
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
