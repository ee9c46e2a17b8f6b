//! Per-actor hook membership
//!
//! Update and late-update use FIFO queues that rotate: each pass captures the
//! queue length, pops the front key and pushes it back before the callback
//! runs. Keys merged while a pass is running land behind the captured prefix
//! and wait for the next pass. Contact hooks use key-ordered sets that are
//! snapshotted at the start of each pass.

use std::collections::{BTreeSet, VecDeque};

use crate::component::{Hook, HookSet};

/// Hook membership of the live components of one actor
#[derive(Debug, Default)]
pub struct HookQueues {
    update: VecDeque<String>,
    late_update: VecDeque<String>,
    destroy: BTreeSet<String>,
    collision_enter: BTreeSet<String>,
    collision_exit: BTreeSet<String>,
    trigger_enter: BTreeSet<String>,
    trigger_exit: BTreeSet<String>,
}

impl HookQueues {
    /// Add `key` to every structure whose hook is in `hooks`
    pub fn enroll(&mut self, key: &str, hooks: HookSet) {
        if hooks.contains(HookSet::UPDATE) {
            self.update.push_back(key.to_string());
        }
        if hooks.contains(HookSet::LATE_UPDATE) {
            self.late_update.push_back(key.to_string());
        }
        for hook in [Hook::Destroy, Hook::CollisionEnter, Hook::CollisionExit, Hook::TriggerEnter, Hook::TriggerExit] {
            if hooks.contains(hook.flag()) {
                if let Some(set) = self.ordered_mut(hook) {
                    set.insert(key.to_string());
                }
            }
        }
    }

    /// Remove `key` from every structure
    pub fn forget(&mut self, key: &str) {
        self.update.retain(|k| k != key);
        self.late_update.retain(|k| k != key);
        for hook in [Hook::Destroy, Hook::CollisionEnter, Hook::CollisionExit, Hook::TriggerEnter, Hook::TriggerExit] {
            if let Some(set) = self.ordered_mut(hook) {
                set.remove(key);
            }
        }
    }

    /// Length of the FIFO queue for `hook` (zero for ordered hooks)
    pub fn queue_len(&self, hook: Hook) -> usize {
        self.fifo(hook).map_or(0, VecDeque::len)
    }

    /// Pop the front key of the FIFO queue for `hook` and push it to the back
    pub fn rotate(&mut self, hook: Hook) -> Option<String> {
        let queue = self.fifo_mut(hook)?;
        let key = queue.pop_front()?;
        queue.push_back(key.clone());
        Some(key)
    }

    /// Keys registered for an ordered hook, ascending
    pub fn snapshot(&self, hook: Hook) -> Vec<String> {
        self.ordered(hook)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Take `key` out of the destroy set; true if it was there
    pub fn take_destroy(&mut self, key: &str) -> bool {
        self.destroy.remove(key)
    }

    /// True if `key` is registered for `hook`
    pub fn is_enrolled(&self, hook: Hook, key: &str) -> bool {
        if let Some(queue) = self.fifo(hook) {
            return queue.iter().any(|k| k == key);
        }
        self.ordered(hook).is_some_and(|set| set.contains(key))
    }

    fn fifo(&self, hook: Hook) -> Option<&VecDeque<String>> {
        match hook {
            Hook::Update => Some(&self.update),
            Hook::LateUpdate => Some(&self.late_update),
            _ => None,
        }
    }

    fn fifo_mut(&mut self, hook: Hook) -> Option<&mut VecDeque<String>> {
        match hook {
            Hook::Update => Some(&mut self.update),
            Hook::LateUpdate => Some(&mut self.late_update),
            _ => None,
        }
    }

    fn ordered(&self, hook: Hook) -> Option<&BTreeSet<String>> {
        match hook {
            Hook::Destroy => Some(&self.destroy),
            Hook::CollisionEnter => Some(&self.collision_enter),
            Hook::CollisionExit => Some(&self.collision_exit),
            Hook::TriggerEnter => Some(&self.trigger_enter),
            Hook::TriggerExit => Some(&self.trigger_exit),
            _ => None,
        }
    }

    fn ordered_mut(&mut self, hook: Hook) -> Option<&mut BTreeSet<String>> {
        match hook {
            Hook::Destroy => Some(&mut self.destroy),
            Hook::CollisionEnter => Some(&mut self.collision_enter),
            Hook::CollisionExit => Some(&mut self.collision_exit),
            Hook::TriggerEnter => Some(&mut self.trigger_enter),
            Hook::TriggerExit => Some(&mut self.trigger_exit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_cycles_through_queue() {
        let mut queues = HookQueues::default();
        queues.enroll("r0", HookSet::UPDATE);
        queues.enroll("r1", HookSet::UPDATE);

        assert_eq!(queues.rotate(Hook::Update).as_deref(), Some("r0"));
        assert_eq!(queues.rotate(Hook::Update).as_deref(), Some("r1"));
        assert_eq!(queues.rotate(Hook::Update).as_deref(), Some("r0"));
        assert_eq!(queues.queue_len(Hook::Update), 2);
        assert!(queues.rotate(Hook::TriggerEnter).is_none());
    }

    #[test]
    fn test_ordered_snapshot_is_ascending() {
        let mut queues = HookQueues::default();
        queues.enroll("r5", HookSet::COLLISION_ENTER);
        queues.enroll("r1", HookSet::COLLISION_ENTER | HookSet::DESTROY);
        queues.enroll("r3", HookSet::COLLISION_ENTER);

        assert_eq!(queues.snapshot(Hook::CollisionEnter), vec!["r1", "r3", "r5"]);
        assert!(queues.take_destroy("r1"));
        assert!(!queues.take_destroy("r1"));
    }

    #[test]
    fn test_forget_removes_from_every_structure() {
        let mut queues = HookQueues::default();
        queues.enroll("r0", HookSet::all());
        queues.forget("r0");
        for hook in Hook::ALL {
            assert!(!queues.is_enrolled(hook, "r0"));
        }
    }
}
