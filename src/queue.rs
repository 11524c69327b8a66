use near_sdk::store::{LookupMap, Vector};
use near_sdk::{near, BlockHeight, IntoStorageKey};

use crate::hashlock::HashLock;

/// Secondary index of open HTLCs by expiration height.
///
/// Each height owns a bucket stored under the big-endian height, so an entry
/// is addressed by `prefix ‖ be(height)` and the hash locks inside it. The
/// runtime offers no prefix scans, so a min-heap of heights that received a
/// bucket lets the tick find every due height without probing empty ones. The
/// heap may hold heights whose bucket was drained by claims; those pop as
/// no-ops.
#[near(serializers = [borsh])]
pub struct ExpirationQueue {
    buckets: LookupMap<[u8; 8], Vec<HashLock>>,
    heights: Vector<BlockHeight>,
}

impl ExpirationQueue {
    pub fn new<B, H>(buckets_prefix: B, heights_prefix: H) -> Self
    where
        B: IntoStorageKey,
        H: IntoStorageKey,
    {
        Self {
            buckets: LookupMap::new(buckets_prefix),
            heights: Vector::new(heights_prefix),
        }
    }

    pub fn add(&mut self, height: BlockHeight, hash_lock: HashLock) {
        let key = height.to_be_bytes();
        match self.buckets.get_mut(&key) {
            Some(bucket) => {
                if !bucket.contains(&hash_lock) {
                    bucket.push(hash_lock);
                }
            }
            None => {
                self.buckets.insert(key, vec![hash_lock]);
                self.push_height(height);
            }
        }
    }

    /// Removes the entry if present.
    pub fn delete(&mut self, height: BlockHeight, hash_lock: &HashLock) {
        let key = height.to_be_bytes();
        let drained = match self.buckets.get_mut(&key) {
            Some(bucket) => {
                bucket.retain(|entry| entry != hash_lock);
                bucket.is_empty()
            }
            None => false,
        };
        if drained {
            self.buckets.remove(&key);
        }
    }

    pub fn contains(&self, height: BlockHeight, hash_lock: &HashLock) -> bool {
        self.buckets
            .get(&height.to_be_bytes())
            .map_or(false, |bucket| bucket.contains(hash_lock))
    }

    /// Hash locks filed at exactly `height`, in insertion order.
    pub fn hash_locks_at(&self, height: BlockHeight) -> Vec<HashLock> {
        self.buckets
            .get(&height.to_be_bytes())
            .cloned()
            .unwrap_or_default()
    }

    pub fn flush(&mut self) {
        self.buckets.flush();
        self.heights.flush();
    }

    /// The lowest pending height, if it is at or below `up_to`.
    pub fn peek_due_height(&self, up_to: BlockHeight) -> Option<BlockHeight> {
        self.heights.get(0).copied().filter(|lowest| *lowest <= up_to)
    }

    /// Pops the lowest pending height if it is at or below `up_to`.
    pub fn pop_due_height(&mut self, up_to: BlockHeight) -> Option<BlockHeight> {
        self.peek_due_height(up_to)?;

        let last = self.heights.len() - 1;
        self.swap_heights(0, last);
        let popped = self.heights.pop();
        self.sift_down(0);
        popped
    }

    fn push_height(&mut self, height: BlockHeight) {
        self.heights.push(height);
        let mut index = self.heights.len() - 1;
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heights[parent] <= self.heights[index] {
                break;
            }
            self.swap_heights(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: u32) {
        let len = self.heights.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < len && self.heights[left] < self.heights[smallest] {
                smallest = left;
            }
            if right < len && self.heights[right] < self.heights[smallest] {
                smallest = right;
            }
            if smallest == index {
                return;
            }
            self.swap_heights(index, smallest);
            index = smallest;
        }
    }

    fn swap_heights(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        let at_a = self.heights[a];
        let at_b = self.heights.replace(b, at_a);
        self.heights.replace(a, at_b);
    }
}
