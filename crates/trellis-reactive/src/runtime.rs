//! Reactive Runtime
//!
//! This module provides the reactive runtime for managing Signal dependencies,
//! Effect execution, and update scheduling.
//!
//! ## Architecture
//!
//! Every piece of bookkeeping lives in an explicitly constructed [`Runtime`]
//! instead of thread-local tables, so independent runtimes (one per test, one
//! per server-side render) never observe each other:
//!
//! 1. **Observer Stack**: Tracks the currently executing Effect or Memo
//! 2. **Owner Stack**: Tracks which effect or scope owns newly created effects
//! 3. **Dependency Graph**: Signal -> subscribers and observer -> dependencies
//! 4. **Scheduler**: Batches writes; [`Runtime::flush`] drains one batch
//!
//! ## Example
//!
//! ```ignore
//! use trellis_reactive::{Effect, Runtime, Signal};
//!
//! let rt = Runtime::new();
//! let count = Signal::new(&rt, 0);
//!
//! let c = count.clone();
//! Effect::new(&rt, move || println!("Count is: {}", c.get()));
//!
//! count.set(42);
//! rt.flush();
//! ```

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::context::ContextFrame;
use crate::effect::{Cleanup, EffectState};
use crate::scheduler::Scheduler;

/// Unique identifier for reactive nodes (Signals, Effects, Memos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// Dependency graph node
#[derive(Debug, Default)]
pub(crate) struct DependencyNode {
	/// IDs of nodes that depend on this node
	pub(crate) subscribers: Vec<NodeId>,
	/// IDs of nodes this node depends on
	pub(crate) dependencies: Vec<NodeId>,
}

/// A deferred flush handed to the host's flush hook.
pub type FlushTask = Box<dyn FnOnce()>;

type FlushHook = Rc<dyn Fn(FlushTask)>;

/// Runtime configuration.
///
/// # Example
///
/// ```ignore
/// let options: RuntimeOptions = serde_json::from_str(r#"{"max_flush_rounds": 16}"#)?;
/// let rt = Runtime::with_options(options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
	/// Upper bound on consecutive batches drained by [`Runtime::run_until_idle`]
	pub max_flush_rounds: usize,
}

impl RuntimeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
		self.max_flush_rounds = rounds;
		self
	}
}

impl Default for RuntimeOptions {
	fn default() -> Self {
		Self {
			max_flush_rounds: 100,
		}
	}
}

/// Lifetime owner of effects and cleanups.
///
/// Every effect has one (reset on each re-run); every [`Scope`](crate::Scope)
/// wraps one.
#[derive(Default)]
pub(crate) struct Owner {
	cleanups: RefCell<Vec<Cleanup>>,
	disposed: Cell<bool>,
}

impl Owner {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Register a cleanup. Runs it right away if the owner is already gone.
	pub(crate) fn add_cleanup(&self, cleanup: Cleanup) {
		if self.disposed.get() {
			cleanup();
		} else {
			self.cleanups.borrow_mut().push(cleanup);
		}
	}

	/// Run registered cleanups, most recent first.
	pub(crate) fn run_cleanups(&self) {
		loop {
			let next = self.cleanups.borrow_mut().pop();
			match next {
				Some(cleanup) => cleanup(),
				None => break,
			}
		}
	}

	pub(crate) fn dispose(&self) {
		if !self.disposed.replace(true) {
			self.run_cleanups();
		}
	}

	pub(crate) fn is_disposed(&self) -> bool {
		self.disposed.get()
	}
}

pub(crate) struct RuntimeInner {
	/// Observer stack; `None` entries mark untracked sections
	observers: RefCell<Vec<Option<NodeId>>>,
	/// Owner stack; `None` entries mark detached sections
	owners: RefCell<Vec<Option<Rc<Owner>>>>,
	/// Dependency graph: NodeId -> DependencyNode
	pub(crate) dependency_graph: RefCell<BTreeMap<NodeId, DependencyNode>>,
	pub(crate) effects: RefCell<BTreeMap<NodeId, Rc<EffectState>>>,
	pub(crate) scheduler: Scheduler,
	pub(crate) context: RefCell<Option<Rc<ContextFrame>>>,
	flush_hook: RefCell<Option<FlushHook>>,
	options: RuntimeOptions,
}

/// Handle to a reactive runtime.
///
/// Cloning is cheap; all clones share the same dependency graph and scheduler.
#[derive(Clone)]
pub struct Runtime {
	pub(crate) inner: Rc<RuntimeInner>,
}

#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
	pub(crate) fn upgrade(&self) -> Option<Runtime> {
		self.0.upgrade().map(|inner| Runtime { inner })
	}
}

/// Pops the top of a runtime stack when dropped.
pub(crate) struct StackGuard<'a, T> {
	stack: &'a RefCell<Vec<T>>,
}

impl<T> Drop for StackGuard<'_, T> {
	fn drop(&mut self) {
		self.stack.borrow_mut().pop();
	}
}

/// Restores the previous context frame when dropped.
pub(crate) struct ContextRestore<'a> {
	slot: &'a RefCell<Option<Rc<ContextFrame>>>,
	previous: Option<Rc<ContextFrame>>,
}

impl Drop for ContextRestore<'_> {
	fn drop(&mut self) {
		*self.slot.borrow_mut() = self.previous.take();
	}
}

/// Re-queues the unfinished part of a batch if a task panics.
struct RequeueOnUnwind<'a> {
	runtime: &'a Runtime,
	remaining: std::vec::IntoIter<NodeId>,
}

impl Drop for RequeueOnUnwind<'_> {
	fn drop(&mut self) {
		if std::thread::panicking() {
			let rest: Vec<NodeId> = self.remaining.by_ref().collect();
			if !rest.is_empty() {
				tracing::warn!(
					requeued = rest.len(),
					"effect panicked during flush; re-queueing remaining tasks"
				);
				if self.runtime.inner.scheduler.requeue_front(rest) {
					self.runtime.request_flush();
				}
			}
		}
	}
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self::with_options(RuntimeOptions::default())
	}

	pub fn with_options(options: RuntimeOptions) -> Self {
		Self {
			inner: Rc::new(RuntimeInner {
				observers: RefCell::new(Vec::new()),
				owners: RefCell::new(Vec::new()),
				dependency_graph: RefCell::new(BTreeMap::new()),
				effects: RefCell::new(BTreeMap::new()),
				scheduler: Scheduler::new(),
				context: RefCell::new(None),
				flush_hook: RefCell::new(None),
				options,
			}),
		}
	}

	pub fn options(&self) -> &RuntimeOptions {
		&self.inner.options
	}

	pub(crate) fn downgrade(&self) -> WeakRuntime {
		WeakRuntime(Rc::downgrade(&self.inner))
	}

	/// Whether two handles refer to the same runtime
	pub fn ptr_eq(&self, other: &Runtime) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Set the function used to defer flushes.
	///
	/// The hook receives one task per batch: the first write after a flush
	/// requests it, later writes before the task runs only join the batch.
	/// Without a hook, updates must be flushed manually.
	///
	/// # Example
	///
	/// ```ignore
	/// let queue = Rc::new(RefCell::new(Vec::new()));
	/// let q = queue.clone();
	/// rt.set_flush_hook(move |task| q.borrow_mut().push(task));
	/// ```
	pub fn set_flush_hook<F>(&self, hook: F)
	where
		F: Fn(FlushTask) + 'static,
	{
		*self.inner.flush_hook.borrow_mut() = Some(Rc::new(hook));
	}

	/// Get the current observer (the currently executing Effect or Memo)
	pub fn current_observer(&self) -> Option<NodeId> {
		self.inner.observers.borrow().last().copied().flatten()
	}

	pub(crate) fn enter_observer(&self, observer: Option<NodeId>) -> StackGuard<'_, Option<NodeId>> {
		self.inner.observers.borrow_mut().push(observer);
		StackGuard {
			stack: &self.inner.observers,
		}
	}

	pub(crate) fn current_owner(&self) -> Option<Rc<Owner>> {
		self.inner.owners.borrow().last().cloned().flatten()
	}

	pub(crate) fn enter_owner(&self, owner: Option<Rc<Owner>>) -> StackGuard<'_, Option<Rc<Owner>>> {
		self.inner.owners.borrow_mut().push(owner);
		StackGuard {
			stack: &self.inner.owners,
		}
	}

	pub(crate) fn context_snapshot(&self) -> Option<Rc<ContextFrame>> {
		self.inner.context.borrow().clone()
	}

	pub(crate) fn enter_context(&self, frame: Option<Rc<ContextFrame>>) -> ContextRestore<'_> {
		let previous = self.inner.context.replace(frame);
		ContextRestore {
			slot: &self.inner.context,
			previous,
		}
	}

	/// Run `f` without tracking any signal reads.
	pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
		let _observer = self.enter_observer(None);
		f()
	}

	/// Run `f` with no owning effect or scope.
	///
	/// Effects created inside live until they are disposed explicitly.
	pub fn detached<R>(&self, f: impl FnOnce() -> R) -> R {
		let _owner = self.enter_owner(None);
		f()
	}

	/// Run `f` with `observer` collecting the reads.
	pub(crate) fn with_observer<R>(&self, observer: NodeId, f: impl FnOnce() -> R) -> R {
		let _observer = self.enter_observer(Some(observer));
		f()
	}

	/// Track a dependency between the current observer and a signal
	///
	/// This is called automatically when Signal::get() is invoked.
	pub fn track_dependency(&self, signal_id: NodeId) {
		if let Some(observer_id) = self.current_observer() {
			let mut graph = self.inner.dependency_graph.borrow_mut();

			// Add signal -> observer edge (signal has a new subscriber)
			let signal_node = graph.entry(signal_id).or_default();
			if !signal_node.subscribers.contains(&observer_id) {
				signal_node.subscribers.push(observer_id);
			}

			// Add observer -> signal edge (observer depends on signal)
			let observer_node = graph.entry(observer_id).or_default();
			if !observer_node.dependencies.contains(&signal_id) {
				observer_node.dependencies.push(signal_id);
			}
		}
	}

	/// Notify that a Signal has changed
	///
	/// Schedules every current subscriber for re-execution.
	pub fn notify_signal_change(&self, signal_id: NodeId) {
		let subscribers = self
			.inner
			.dependency_graph
			.borrow()
			.get(&signal_id)
			.map(|node| node.subscribers.clone())
			.unwrap_or_default();

		for subscriber_id in subscribers {
			self.schedule_update(subscriber_id);
		}
	}

	/// Schedule a node for update
	///
	/// The actual update is performed by the next flush.
	pub fn schedule_update(&self, node_id: NodeId) {
		if self.inner.scheduler.schedule(node_id) {
			self.request_flush();
		}
	}

	/// Hand the host one flush through the flush hook, if any.
	fn request_flush(&self) {
		let hook = self.inner.flush_hook.borrow().clone();
		if let Some(hook) = hook {
			let runtime = self.downgrade();
			hook(Box::new(move || {
				if let Some(rt) = runtime.upgrade() {
					rt.flush();
				}
			}));
		}
	}

	/// Run one batch of pending effects.
	///
	/// The pending set is snapshotted and cleared first, so effects scheduled
	/// while the batch runs wait for the next flush. Returns the number of
	/// effects executed.
	pub fn flush(&self) -> usize {
		let batch = self.inner.scheduler.take_batch();
		if batch.is_empty() {
			return 0;
		}
		tracing::trace!(batch = batch.len(), "flushing reactive updates");

		let mut guard = RequeueOnUnwind {
			runtime: self,
			remaining: batch.into_iter(),
		};
		let mut executed = 0;
		while let Some(id) = guard.remaining.next() {
			self.run_effect(id);
			executed += 1;
		}
		executed
	}

	/// Flush repeatedly until nothing is pending or the round limit is hit.
	pub fn run_until_idle(&self) -> usize {
		let mut executed = 0;
		for _ in 0..self.inner.options.max_flush_rounds {
			if self.inner.scheduler.is_empty() {
				return executed;
			}
			executed += self.flush();
		}
		if !self.inner.scheduler.is_empty() {
			tracing::warn!(
				max_flush_rounds = self.inner.options.max_flush_rounds,
				pending = self.inner.scheduler.len(),
				"reactive updates did not settle; stopping"
			);
		}
		executed
	}

	/// Whether any effect is waiting for a flush
	pub fn has_pending(&self) -> bool {
		!self.inner.scheduler.is_empty()
	}

	pub fn pending_count(&self) -> usize {
		self.inner.scheduler.len()
	}

	pub fn is_scheduled(&self, node_id: NodeId) -> bool {
		self.inner.scheduler.is_scheduled(node_id)
	}

	/// Execute an effect by its ID.
	///
	/// Runs the previous cleanups, drops the old dependencies, then executes the
	/// body with the effect installed as observer, owner and context.
	pub(crate) fn run_effect(&self, effect_id: NodeId) {
		let Some(state) = self.inner.effects.borrow().get(&effect_id).cloned() else {
			return;
		};
		if state.owner.is_disposed() {
			return;
		}

		let Ok(mut run) = state.run.try_borrow_mut() else {
			tracing::warn!(effect = ?effect_id, "effect re-entered while running; skipped");
			return;
		};
		state.owner.run_cleanups();
		self.clear_dependencies(effect_id);

		let _observer = self.enter_observer(Some(effect_id));
		let _owner = self.enter_owner(Some(state.owner.clone()));
		let _context = self.enter_context(state.context.clone());
		if let Some(cleanup) = run() {
			state.owner.add_cleanup(cleanup);
		}
	}

	pub(crate) fn dispose_effect(&self, effect_id: NodeId) {
		let state = self.inner.effects.borrow_mut().remove(&effect_id);
		self.inner.scheduler.unschedule(effect_id);
		self.remove_node(effect_id);
		if let Some(state) = state {
			state.owner.dispose();
		}
	}

	/// Clear dependencies for a node
	///
	/// This should be called before re-executing an Effect/Memo to clear old dependencies.
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.inner.dependency_graph.borrow_mut();

		let dependencies = match graph.get_mut(&node_id) {
			Some(node) => core::mem::take(&mut node.dependencies),
			None => return,
		};

		// Remove this node from all signal subscribers
		for dep_id in dependencies {
			if let Some(dep_node) = graph.get_mut(&dep_id) {
				dep_node.subscribers.retain(|&id| id != node_id);
			}
		}
	}

	/// Remove a node from the dependency graph
	///
	/// This should be called when a Signal/Effect/Memo goes away.
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);
		let removed = self.inner.dependency_graph.borrow_mut().remove(&node_id);
		if let Some(node) = removed {
			let mut graph = self.inner.dependency_graph.borrow_mut();
			for subscriber in node.subscribers {
				if let Some(sub_node) = graph.get_mut(&subscriber) {
					sub_node.dependencies.retain(|&id| id != node_id);
				}
			}
		}
	}

	/// Check if a node exists in the dependency graph (for testing)
	pub fn has_node(&self, node_id: NodeId) -> bool {
		self.inner.dependency_graph.borrow().contains_key(&node_id)
	}

	/// Get the number of subscribers for a node (for testing)
	pub fn subscriber_count(&self, node_id: NodeId) -> usize {
		self.inner
			.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.subscribers.len())
			.unwrap_or(0)
	}

	/// Get the number of dependencies recorded for an observer (for testing)
	pub fn dependency_count(&self, node_id: NodeId) -> usize {
		self.inner
			.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.dependencies.len())
			.unwrap_or(0)
	}

	/// Number of live effects (for testing)
	pub fn effect_count(&self) -> usize {
		self.inner.effects.borrow().len()
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

impl core::fmt::Debug for Runtime {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Runtime")
			.field("effects", &self.inner.effects.borrow().len())
			.field("pending", &self.inner.scheduler.len())
			.field("options", &self.inner.options)
			.finish()
	}
}
