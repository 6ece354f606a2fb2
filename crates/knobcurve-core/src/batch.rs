use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    knob::{DimIdx, ViewIdx},
    value::ValueChangeReason,
};

/// Raised by a knob whenever one of its dimension/view values changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChangeNotice {
    pub knob: Uuid,
    pub dimension: DimIdx,
    pub view: ViewIdx,
    pub reason: ValueChangeReason,
}

/// Downstream re-evaluation hook. Called once per flushed batch.
pub trait ChangeListener: Send + Sync {
    fn values_changed(&self, notices: &[ValueChangeNotice]);
}

#[derive(Debug, Default)]
struct Pending {
    depth: usize,
    notices: Vec<ValueChangeNotice>,
}

/// Queue of change notices plus the scope depth that defers them.
#[derive(Default)]
pub struct ChangeQueue {
    pending: Mutex<Pending>,
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
    evaluations: AtomicU64,
}

impl ChangeQueue {
    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Number of flushes delivered to listeners so far.
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.pending.lock().depth
    }

    pub fn begin(&self) -> ChangeBatch<'_> {
        let mut pending = self.pending.lock();
        pending.depth += 1;
        trace!(depth = pending.depth, "change batch opened");
        ChangeBatch { queue: self }
    }

    pub fn notify(&self, notice: ValueChangeNotice) {
        let ready = {
            let mut pending = self.pending.lock();
            pending.notices.push(notice);
            if pending.depth == 0 {
                std::mem::take(&mut pending.notices)
            } else {
                Vec::new()
            }
        };
        self.deliver(ready);
    }

    fn end(&self) {
        let ready = {
            let mut pending = self.pending.lock();
            pending.depth = pending.depth.saturating_sub(1);
            trace!(depth = pending.depth, "change batch closed");
            if pending.depth == 0 {
                std::mem::take(&mut pending.notices)
            } else {
                Vec::new()
            }
        };
        self.deliver(ready);
    }

    fn deliver(&self, notices: Vec<ValueChangeNotice>) {
        if notices.is_empty() {
            return;
        }
        let evaluation = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(evaluation, notices = notices.len(), "flushing value changes");
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.values_changed(&notices);
        }
    }
}

/// Scope token: notices raised while any batch is open are flushed once, when the outermost one drops.
#[must_use = "dropping the batch immediately flushes it"]
pub struct ChangeBatch<'a> {
    queue: &'a ChangeQueue,
}

impl Drop for ChangeBatch<'_> {
    fn drop(&mut self) {
        self.queue.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<usize>>,
    }

    impl ChangeListener for Recorder {
        fn values_changed(&self, notices: &[ValueChangeNotice]) {
            self.batches.lock().push(notices.len());
        }
    }

    fn notice() -> ValueChangeNotice {
        ValueChangeNotice {
            knob: Uuid::nil(),
            dimension: DimIdx(0),
            view: ViewIdx::MAIN,
            reason: ValueChangeReason::UserEdited,
        }
    }

    #[test]
    fn nested_batches_flush_once() {
        let queue = ChangeQueue::default();
        let recorder = Arc::new(Recorder::default());
        queue.add_listener(recorder.clone());
        {
            let _outer = queue.begin();
            queue.notify(notice());
            {
                let _inner = queue.begin();
                queue.notify(notice());
            }
            queue.notify(notice());
            assert_eq!(queue.evaluation_count(), 0);
        }
        assert_eq!(queue.evaluation_count(), 1);
        assert_eq!(*recorder.batches.lock(), vec![3]);
    }

    #[test]
    fn notices_outside_batch_flush_immediately() {
        let queue = ChangeQueue::default();
        queue.notify(notice());
        queue.notify(notice());
        assert_eq!(queue.evaluation_count(), 2);
    }

    #[test]
    fn empty_batch_does_not_evaluate() {
        let queue = ChangeQueue::default();
        drop(queue.begin());
        assert_eq!(queue.evaluation_count(), 0);
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn batch_flushes_on_early_return() {
        fn edit(queue: &ChangeQueue, bail: bool) -> Option<()> {
            let _batch = queue.begin();
            queue.notify(notice());
            if bail {
                return None;
            }
            queue.notify(notice());
            Some(())
        }
        let queue = ChangeQueue::default();
        assert!(edit(&queue, true).is_none());
        assert_eq!(queue.evaluation_count(), 1);
        assert_eq!(queue.depth(), 0);
    }
}
