// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Mutex-guarded resource queues.
//!
//! A queue holds non-owning-style shared references (`Arc` clones) to
//! resources of one kind. Registration returns an opaque [`Membership`]
//! handle; the owning subsystem passes it back to unregister at release
//! time. Queue removal never destroys a resource and resource release must
//! unregister first, so membership and lifetime stay independent.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::render::renderable::Renderable;

static NEXT_QUEUE_ID: AtomicU32 = AtomicU32::new(1);

/// Opaque proof of queue membership. Obtained from `register`, consumed by
/// `unregister`. Dropping it without unregistering leaks the membership
/// (the resource stays queued), never memory.
#[derive(Debug)]
pub struct Membership {
    queue: u32,
    id: u64,
}

pub(crate) struct Member<T: ?Sized> {
    pub id: u64,
    pub res: Arc<T>,
}

pub struct RenderQueue<T: ?Sized> {
    queue_id: u32,
    next_member: AtomicU64,
    members: Mutex<Vec<Member<T>>>,
}

impl<T: ?Sized> Default for RenderQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> RenderQueue<T> {
    pub fn new() -> Self {
        Self {
            queue_id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
            next_member: AtomicU64::new(1),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Append a resource. Insertion order is not guaranteed to survive a
    /// sort.
    pub fn register(&self, res: Arc<T>) -> Membership {
        let id = self.next_member.fetch_add(1, Ordering::Relaxed);
        self.members.lock().push(Member { id, res });
        Membership {
            queue: self.queue_id,
            id,
        }
    }

    /// Remove a member. Returns the resource so the caller can finish
    /// tearing it down; `None` if the queue was cleared in the meantime.
    pub fn unregister(&self, membership: Membership) -> Option<Arc<T>> {
        debug_assert_eq!(
            membership.queue, self.queue_id,
            "membership used on the wrong queue"
        );
        let mut members = self.members.lock();
        let pos = members.iter().position(|m| m.id == membership.id)?;
        Some(members.remove(pos).res)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Clone of the member list for iteration outside the lock.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.members.lock().iter().map(|m| m.res.clone()).collect()
    }

    /// Run `evict` exactly once for every member, then empty the queue.
    /// The whole operation holds the queue lock.
    pub fn clear_with<F: FnMut(&Arc<T>)>(&self, mut evict: F) {
        let mut members = self.members.lock();
        for m in members.iter() {
            evict(&m.res);
        }
        members.clear();
    }

    /// Run `f` for every member under the queue lock.
    pub fn for_each<F: FnMut(&Arc<T>)>(&self, mut f: F) {
        let members = self.members.lock();
        for m in members.iter() {
            f(&m.res);
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Member<T>>> {
        self.members.lock()
    }
}

/// Descending distance, far objects first so near ones draw on top. Ties
/// break arbitrarily.
pub(crate) fn sort_by_distance(members: &mut [Member<dyn Renderable>]) {
    members.sort_by(|a, b| {
        b.res
            .distance()
            .partial_cmp(&a.res.distance())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

impl RenderQueue<dyn Renderable> {
    pub fn sort(&self) {
        sort_by_distance(&mut self.members.lock());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::renderable::RenderPass;
    use std::sync::atomic::AtomicUsize;

    struct TestObj {
        d: f32,
        kicked: AtomicUsize,
    }

    impl TestObj {
        fn new(d: f32) -> Arc<Self> {
            Arc::new(Self {
                d,
                kicked: AtomicUsize::new(0),
            })
        }
    }

    impl Renderable for TestObj {
        fn distance(&self) -> f32 {
            self.d
        }
        fn render(&self, _pass: &mut RenderPass<'_>) {}
        fn kicked_out(&self) {
            self.kicked.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_register_unregister() {
        let q: RenderQueue<dyn Renderable> = RenderQueue::new();
        let a = TestObj::new(1.0);
        let b = TestObj::new(2.0);
        let ma = q.register(a.clone());
        let _mb = q.register(b.clone());
        assert_eq!(q.len(), 2);
        assert!(q.unregister(ma).is_some());
        assert_eq!(q.len(), 1);
        // resource itself is still alive, unregistering never destroys
        assert_eq!(a.d, 1.0);
    }

    #[test]
    fn test_clear_evicts_each_member_exactly_once() {
        let q: RenderQueue<dyn Renderable> = RenderQueue::new();
        let objs: Vec<_> = (0..5).map(|i| TestObj::new(i as f32)).collect();
        let mut handles: Vec<_> = objs.iter().map(|o| q.register(o.clone())).collect();
        // unregister two of them before the clear
        q.unregister(handles.remove(0));
        q.unregister(handles.remove(2));
        q.clear_with(|o| o.kicked_out());
        assert!(q.is_empty());
        let kicked: Vec<usize> = objs.iter().map(|o| o.kicked.load(Ordering::SeqCst)).collect();
        // members removed before the clear get no notification
        assert_eq!(kicked, vec![0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_unregister_after_clear_is_noop() {
        let q: RenderQueue<dyn Renderable> = RenderQueue::new();
        let a = TestObj::new(1.0);
        let ma = q.register(a.clone());
        q.clear_with(|o| o.kicked_out());
        assert!(q.unregister(ma).is_none());
        assert_eq!(a.kicked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sort_descending_distance() {
        let q: RenderQueue<dyn Renderable> = RenderQueue::new();
        for d in [3.0, 9.0, 1.0, 7.0, 5.0] {
            q.register(TestObj::new(d));
        }
        q.sort();
        let dists: Vec<f32> = q.snapshot().iter().map(|o| o.distance()).collect();
        assert_eq!(dists, vec![9.0, 7.0, 5.0, 3.0, 1.0]);
    }

    #[test]
    fn test_concurrent_registration() {
        let q: Arc<RenderQueue<dyn Renderable>> = Arc::new(RenderQueue::new());
        let mut joins = vec![];
        for t in 0..4 {
            let q = q.clone();
            joins.push(std::thread::spawn(move || {
                let mut hs = vec![];
                for i in 0..50 {
                    hs.push(q.register(TestObj::new((t * 50 + i) as f32)));
                }
                // every other one unregisters again
                for h in hs.into_iter().step_by(2) {
                    q.unregister(h);
                }
            }));
        }
        for j in joins {
            j.join().unwrap();
        }
        assert_eq!(q.len(), 100);
    }
}
