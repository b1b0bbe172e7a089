use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use log::debug;

use super::AccessType;
use super::FrameId;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

/// Replacer tracks frame usage for replacement in case the buffer pool is
/// full.
pub trait Replacer {
    /// Record the event that the given frame id is accessed at the current
    /// timestamp. Create a new entry for the access history if the frame id
    /// has not been seen before. New entries are non-evictable until
    /// set_evictable says otherwise.
    ///
    /// Return an error if the frame id is not smaller than the replacer
    /// capacity.
    fn record_access(&self, frame_id: FrameId, access_type: AccessType) -> Result<()>;

    /// Find the frame to evict with the replace policy. Only frames that are
    /// marked as evictable are candidates for eviction.
    ///
    /// Successful eviction of a frame decrements the size of the replacer
    /// and removes the frame's access history.
    ///
    /// Return the frame id if a frame is evicted successfully, None if no
    /// frame can be evicted.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame is evictable or non-evictable. This function
    /// also controls the replacer size. Note that size is equal to the
    /// number of evictable entries.
    ///
    /// If a frame was previously evictable and is to be set to
    /// non-evictable, the size decrements. If a frame was previously
    /// non-evictable and is to be set evictable, the size increments. In all
    /// other scenarios this function terminates without modifying anything.
    ///
    /// Return an error if the frame id is not smaller than the replacer
    /// capacity.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool) -> Result<()>;

    /// Check if a frame is evictable. If the frame is not found, return
    /// true.
    fn is_evictable(&self, frame_id: FrameId) -> bool;

    /// Remove an evictable frame from the replacer, along with its access
    /// history. This function also decrements the replacer size if the
    /// removal is successful.
    ///
    /// Note that this is different from evicting a frame, which always
    /// removes the frame with the coldest access history. This function
    /// removes the specified frame, no matter how warm it is.
    ///
    /// If remove is called on a non-evictable frame, return an error. If the
    /// specified frame is not found, do nothing without returning any error.
    fn remove(&self, frame_id: FrameId) -> Result<()>;

    /// Replacer size, the number of evictable frames.
    fn size(&self) -> usize;
}

struct LRUKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// History of the last seen k access timestamps of the frame.
    /// Most recent timestamp stored in front.
    history: VecDeque<usize>,
    /// Links in the owning container's list, as frame ids into its node map.
    prev: Option<FrameId>,
    next: Option<FrameId>,
}

impl LRUKNode {
    fn new(frame_id: FrameId, k: usize, timestamp: usize) -> Self {
        let mut history = VecDeque::with_capacity(k);
        history.push_front(timestamp);
        LRUKNode { k, frame_id, is_evictable: false, history, prev: None, next: None }
    }

    /// Push a new access timestamp, dropping the oldest one once the
    /// history holds k entries.
    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_back();
        }
        self.history.push_front(timestamp);
    }
}

/// One tier of the lru-k index: a doubly linked list of frame nodes plus a
/// frame id index, consistent with each other. The least recently inserted
/// or touched frame sits at the head, eviction scans from there. The map is
/// the single owner of the nodes, the list links are frame ids into it
/// rather than pointers.
struct LRUKContainer {
    nodes: HashMap<FrameId, LRUKNode>,
    head: Option<FrameId>,
    tail: Option<FrameId>,
}

impl LRUKContainer {
    fn new() -> Self {
        LRUKContainer { nodes: HashMap::new(), head: None, tail: None }
    }

    fn get(&self, frame_id: FrameId) -> Option<&LRUKNode> {
        self.nodes.get(&frame_id)
    }

    fn get_mut(&mut self, frame_id: FrameId) -> Option<&mut LRUKNode> {
        self.nodes.get_mut(&frame_id)
    }

    fn contains(&self, frame_id: FrameId) -> bool {
        self.nodes.contains_key(&frame_id)
    }

    /// Index the node by its frame id and append it at the tail, the most
    /// recently touched position.
    fn push_node(&mut self, mut node: LRUKNode) {
        let frame_id = node.frame_id;
        node.prev = self.tail;
        node.next = None;
        match self.tail {
            // list links always refer to indexed nodes, the lookup cannot
            // miss here.
            Some(tail) => self.nodes.get_mut(&tail).unwrap().next = Some(frame_id),
            None => self.head = Some(frame_id),
        }
        self.tail = Some(frame_id);
        self.nodes.insert(frame_id, node);
    }

    /// Unlink the node from the list and drop it from the index.
    fn remove_node(&mut self, frame_id: FrameId) -> Option<LRUKNode> {
        let node = self.nodes.remove(&frame_id)?;
        match node.prev {
            Some(prev) => self.nodes.get_mut(&prev).unwrap().next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes.get_mut(&next).unwrap().prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node)
    }

    /// Record an access on a node already in this container: update its
    /// history and move it to the tail.
    fn update_node(&mut self, frame_id: FrameId, timestamp: usize) {
        if let Some(node) = self.nodes.get_mut(&frame_id) {
            node.record_access(timestamp);
        }
        self.touch(frame_id);
    }

    /// Move the node to the tail unless it is already there.
    fn touch(&mut self, frame_id: FrameId) {
        if self.tail == Some(frame_id) {
            return;
        }
        if let Some(node) = self.remove_node(frame_id) {
            self.push_node(node);
        }
    }

    /// Scan from the head for the first evictable frame, remove it from
    /// both the list and the index, and return its id.
    fn evict(&mut self) -> Option<FrameId> {
        let mut cursor = self.head;
        while let Some(frame_id) = cursor {
            let node = &self.nodes[&frame_id];
            if !node.is_evictable {
                cursor = node.next;
                continue;
            }
            self.remove_node(frame_id);
            return Some(frame_id);
        }
        None
    }
}

/// LRUKReplacer implements the lru-k replacement policy.
///
/// The policy partitions the tracked frames into two tiers: a young tier
/// for frames with fewer than k recorded accesses, and an old tier for
/// frames whose history is full. A frame with fewer than k references has
/// an undefined k-th access time and ranks colder than any frame with a
/// full history, so eviction always drains the young tier first. Within a
/// tier, candidates are scanned from the least recently touched end.
///
/// A frame migrates from young to old at exactly its k-th recorded access,
/// landing at the old tier's tail.
pub struct LRUKReplacer {
    /// Frames with fewer than k recorded accesses.
    young: LRUKContainer,
    /// Frames with a full k-entry access history.
    old: LRUKContainer,
    /// Logical access clock, advanced once per recorded access. A coarse
    /// wall clock would tie within a second and fall back to arrival order
    /// anyway, the counter keeps the order exact.
    current_timestamp: usize,
    /// The number of evictable frames across both tiers.
    current_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        assert!(k > 0, "replacer k should be larger than zero");
        LRUKReplacer {
            young: LRUKContainer::new(),
            old: LRUKContainer::new(),
            current_timestamp: 0,
            current_size: 0,
            replacer_size: size,
            k,
        }
    }

    fn check_frame(&self, frame_id: FrameId) -> Result<()> {
        if frame_id >= self.replacer_size {
            return Err(Error::ReplacerFrameOutOfBound);
        }
        Ok(())
    }

    /// Record the event that the given frame id is accessed at the current
    /// timestamp. Create a new entry for the access history if the frame id
    /// has not been seen before.
    fn record_access(&mut self, frame_id: FrameId, _access_type: AccessType) -> Result<()> {
        self.check_frame(frame_id)?;
        self.current_timestamp += 1;
        let timestamp = self.current_timestamp;

        if let Some(node) = self.young.get(frame_id) {
            if node.history.len() + 1 >= self.k {
                // the k-th access matures the frame, move it from the
                // young tier to the old tier's tail.
                let mut node = self.young.remove_node(frame_id).unwrap();
                node.record_access(timestamp);
                self.old.push_node(node);
            } else {
                self.young.update_node(frame_id, timestamp);
            }
            return Ok(());
        }
        if self.old.contains(frame_id) {
            self.old.update_node(frame_id, timestamp);
            return Ok(());
        }

        let node = LRUKNode::new(frame_id, self.k, timestamp);
        if node.history.len() == self.k {
            // with k == 1 a single access is already a full history
            self.old.push_node(node);
        } else {
            self.young.push_node(node);
        }
        Ok(())
    }

    /// Find the frame to evict: the first evictable young frame, or failing
    /// that the first evictable old frame, scanning each tier from its
    /// least recently touched end.
    fn evict(&mut self) -> Option<FrameId> {
        let frame_id = match self.young.evict() {
            Some(frame_id) => frame_id,
            None => self.old.evict()?,
        };
        self.current_size -= 1;
        debug!("lru-k replacer evicted frame {}", frame_id);
        Some(frame_id)
    }

    /// Toggle whether a frame is evictable or non-evictable, keeping the
    /// evictable count in step.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) -> Result<()> {
        self.check_frame(frame_id)?;
        let node = match self.young.get_mut(frame_id) {
            Some(node) => node,
            None => match self.old.get_mut(frame_id) {
                Some(node) => node,
                // untracked frames are left alone
                None => return Ok(()),
            },
        };
        if node.is_evictable == evictable {
            return Ok(());
        }
        node.is_evictable = evictable;
        if evictable {
            self.current_size += 1;
        } else {
            self.current_size -= 1;
        }
        Ok(())
    }

    /// Check if a frame is evictable. If the frame is not found, return
    /// true.
    fn is_evictable(&self, frame_id: FrameId) -> bool {
        match self.young.get(frame_id).or_else(|| self.old.get(frame_id)) {
            Some(node) => node.is_evictable,
            None => true,
        }
    }

    /// Remove an evictable frame from whichever tier holds it, along with
    /// its access history.
    fn remove(&mut self, frame_id: FrameId) -> Result<()> {
        self.check_frame(frame_id)?;
        let evictable = match self.young.get(frame_id).or_else(|| self.old.get(frame_id)) {
            Some(node) => node.is_evictable,
            None => return Ok(()),
        };
        if !evictable {
            return Err(Error::ReplacerFrameNotEvictable);
        }
        if self.young.remove_node(frame_id).is_none() {
            self.old.remove_node(frame_id);
        }
        self.current_size -= 1;
        Ok(())
    }

    fn size(&self) -> usize {
        self.current_size
    }
}

/// SyncLRUKReplacer implements the thread-safe version of the lru-k
/// replacement policy, basically all the heavy lifting happens in the
/// LRUKReplacer under a single latch.
pub struct SyncLRUKReplacer {
    inner: Mutex<LRUKReplacer>,
}

impl SyncLRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let inner = Mutex::new(LRUKReplacer::new(k, size));
        SyncLRUKReplacer { inner }
    }

    /// Build a replacer from a loaded configuration.
    pub fn from_config(cfg: &Config) -> Self {
        SyncLRUKReplacer::new(cfg.replacer_k, cfg.pool_size)
    }
}

impl Replacer for SyncLRUKReplacer {
    fn record_access(&self, frame_id: FrameId, access_type: AccessType) -> Result<()> {
        let mut guard = self.inner.lock()?;
        guard.record_access(frame_id, access_type)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) -> Result<()> {
        let mut guard = self.inner.lock()?;
        guard.set_evictable(frame_id, evictable)
    }

    fn is_evictable(&self, frame_id: FrameId) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.is_evictable(frame_id)
    }

    fn remove(&self, frame_id: FrameId) -> Result<()> {
        let mut guard = self.inner.lock()?;
        guard.remove(frame_id)
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}
