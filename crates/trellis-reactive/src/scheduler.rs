//! Update Scheduler
//!
//! Collects effects that need to re-run and hands them out in batches.
//! Writes never run dependents directly; they only schedule them here, and
//! [`Runtime::flush`](crate::Runtime::flush) drains one batch at a time.

use core::cell::{Cell, RefCell};

use indexmap::IndexSet;

use crate::runtime::NodeId;

/// Insertion-ordered set of pending effect re-runs.
///
/// Scheduling is idempotent: a task scheduled twice before a flush runs once,
/// at the position of its first scheduling.
#[derive(Debug, Default)]
pub struct Scheduler {
	pending: RefCell<IndexSet<NodeId>>,
	/// Whether a flush has been requested since the last batch was taken
	flush_requested: Cell<bool>,
}

impl Scheduler {
	/// Create an empty scheduler
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a task to the pending set.
	///
	/// Returns `true` when this is the first schedule since the last batch was
	/// taken, i.e. the caller should request a flush.
	pub fn schedule(&self, id: NodeId) -> bool {
		self.pending.borrow_mut().insert(id);
		!self.flush_requested.replace(true)
	}

	/// Remove a task from the pending set
	pub fn unschedule(&self, id: NodeId) -> bool {
		self.pending.borrow_mut().shift_remove(&id)
	}

	/// Whether `id` is waiting for the next flush
	pub fn is_scheduled(&self, id: NodeId) -> bool {
		self.pending.borrow().contains(&id)
	}

	/// Number of pending tasks
	pub fn len(&self) -> usize {
		self.pending.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.borrow().is_empty()
	}

	/// Snapshot the pending set into a working list and clear it.
	///
	/// Tasks scheduled while the returned batch runs start a fresh batch.
	pub fn take_batch(&self) -> Vec<NodeId> {
		self.flush_requested.set(false);
		core::mem::take(&mut *self.pending.borrow_mut())
			.into_iter()
			.collect()
	}

	/// Put tasks that never ran back in front of the pending set, keeping
	/// their relative order.
	///
	/// Returns `true` when the caller should request a flush, like
	/// [`schedule`](Self::schedule).
	pub(crate) fn requeue_front(&self, ids: Vec<NodeId>) -> bool {
		if ids.is_empty() {
			return false;
		}
		let mut pending = self.pending.borrow_mut();
		let rest = core::mem::take(&mut *pending);
		pending.extend(ids);
		pending.extend(rest);
		!self.flush_requested.replace(true)
	}
}
