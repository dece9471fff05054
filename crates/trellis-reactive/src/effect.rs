//! Effect - Reactive Side Effects
//!
//! `Effect` represents a side effect that automatically re-runs when its dependencies change.
//! Dependencies are tracked automatically - any Signal accessed inside the effect closure
//! becomes a dependency, and the set is rediscovered on every run.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: Signal::get() calls inside the effect are tracked
//! - **Batched Re-execution**: A changed Signal only schedules the effect; the next flush runs it
//! - **Cleanup Support**: The effect body may return a cleanup that runs before the next run
//! - **Ownership**: Effects created inside a running effect are disposed with it
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
//! let effect = Effect::new(&rt, move || {
//!     println!("Count is: {}", c.get());
//!     Some(|| println!("cleanup"))
//! });
//!
//! count.set(42);
//! rt.flush(); // Prints "cleanup" then "Count is: 42"
//! effect.dispose(); // Prints "cleanup"
//! ```

use core::cell::RefCell;
use std::rc::Rc;

use crate::context::ContextFrame;
use crate::runtime::{NodeId, Owner, Runtime, WeakRuntime};

/// Cleanup registered by an effect run or through [`on_cleanup`]
pub type Cleanup = Box<dyn FnOnce()>;

type EffectFn = Box<dyn FnMut() -> Option<Cleanup>>;

/// Values an effect body may return.
///
/// `()` means no cleanup; `Some(f)` registers `f` to run before the next run
/// or on disposal. Use `None::<fn()>` for a body that only sometimes cleans up.
pub trait IntoCleanup {
	fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
	fn into_cleanup(self) -> Option<Cleanup> {
		None
	}
}

impl<F> IntoCleanup for Option<F>
where
	F: FnOnce() + 'static,
{
	fn into_cleanup(self) -> Option<Cleanup> {
		self.map(|f| Box::new(f) as Cleanup)
	}
}

pub(crate) struct EffectState {
	pub(crate) run: RefCell<EffectFn>,
	/// Owns cleanups and nested effects of the latest run
	pub(crate) owner: Rc<Owner>,
	/// Context frame captured at creation and reinstalled on every run
	pub(crate) context: Option<Rc<ContextFrame>>,
}

/// A reactive effect that automatically re-runs when its dependencies change
///
/// Effects run immediately when created. Afterwards they re-run once per flush
/// in which any Signal read during their previous run changed.
///
/// Dropping the handle does not stop the effect: it lives until [`dispose`]
/// is called or its owner (the effect or [`Scope`](crate::Scope) that was
/// running when it was created) is torn down.
///
/// [`dispose`]: Effect::dispose
#[derive(Clone)]
pub struct Effect {
	id: NodeId,
	runtime: WeakRuntime,
}

impl Effect {
	/// Create a new Effect that runs the given function
	///
	/// The function runs immediately, and will automatically re-run whenever any
	/// Signal it accesses changes.
	///
	/// # Example
	///
	/// ```ignore
	/// let count = Signal::new(&rt, 0);
	///
	/// let c = count.clone();
	/// Effect::new(&rt, move || {
	///     println!("Count: {}", c.get());
	/// });
	/// ```
	pub fn new<F, R>(rt: &Runtime, mut f: F) -> Self
	where
		F: FnMut() -> R + 'static,
		R: IntoCleanup,
	{
		let effect = Self::register(rt, NodeId::new(), move || f().into_cleanup());
		rt.run_effect(effect.id);
		effect
	}

	/// Register an effect without running it.
	///
	/// The caller is responsible for having tracked the initial dependencies
	/// under `id`.
	pub(crate) fn register<F>(rt: &Runtime, id: NodeId, run: F) -> Self
	where
		F: FnMut() -> Option<Cleanup> + 'static,
	{
		let state = Rc::new(EffectState {
			run: RefCell::new(Box::new(run)),
			owner: Rc::new(Owner::new()),
			context: rt.context_snapshot(),
		});
		rt.inner.effects.borrow_mut().insert(id, state);

		if let Some(parent) = rt.current_owner() {
			let runtime = rt.downgrade();
			parent.add_cleanup(Box::new(move || {
				if let Some(rt) = runtime.upgrade() {
					rt.dispose_effect(id);
				}
			}));
		}

		Self {
			id,
			runtime: rt.downgrade(),
		}
	}

	/// Get the unique ID of this effect
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Re-run the effect synchronously, bypassing the scheduler.
	///
	/// A pending scheduled run is dropped since this run supersedes it.
	pub fn run(&self) {
		if let Some(rt) = self.runtime.upgrade() {
			rt.inner.scheduler.unschedule(self.id);
			rt.run_effect(self.id);
		}
	}

	/// Stop the effect.
	///
	/// Removes it from every dependency set, runs its cleanups (disposing
	/// nested effects) and drops any pending re-run. Calling it twice is a no-op.
	pub fn dispose(&self) {
		if let Some(rt) = self.runtime.upgrade() {
			rt.dispose_effect(self.id);
		}
	}

	pub fn is_disposed(&self) -> bool {
		match self.runtime.upgrade() {
			Some(rt) => !rt.inner.effects.borrow().contains_key(&self.id),
			None => true,
		}
	}
}

impl core::fmt::Debug for Effect {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Effect")
			.field("id", &self.id)
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

/// Register `f` to run when the current owner re-runs or is disposed.
///
/// Outside of any effect or scope the cleanup is dropped without running.
pub fn on_cleanup(rt: &Runtime, f: impl FnOnce() + 'static) {
	match rt.current_owner() {
		Some(owner) => owner.add_cleanup(Box::new(f)),
		None => tracing::trace!("on_cleanup called without an owner; cleanup dropped"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Signal;
	use core::cell::Cell;
	use rstest::rstest;

	#[rstest]
	fn test_effect_runs_immediately() {
		let rt = Runtime::new();
		let runs = Rc::new(Cell::new(0));

		let counter = runs.clone();
		Effect::new(&rt, move || counter.set(counter.get() + 1));

		assert_eq!(runs.get(), 1);
	}

	#[rstest]
	fn test_effect_reruns_after_flush() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let seen = Rc::new(RefCell::new(Vec::new()));

		let (s, log) = (signal.clone(), seen.clone());
		Effect::new(&rt, move || log.borrow_mut().push(s.get()));

		signal.set(1);
		assert_eq!(*seen.borrow(), vec![0]);
		rt.flush();
		assert_eq!(*seen.borrow(), vec![0, 1]);
	}

	#[rstest]
	fn test_cleanup_runs_before_rerun_and_on_dispose() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let log = Rc::new(RefCell::new(Vec::new()));

		let (s, l) = (signal.clone(), log.clone());
		let effect = Effect::new(&rt, move || {
			let value = s.get();
			l.borrow_mut().push(format!("run {value}"));
			let l = l.clone();
			Some(move || l.borrow_mut().push(format!("cleanup {value}")))
		});

		signal.set(1);
		rt.flush();
		effect.dispose();
		effect.dispose();

		assert_eq!(
			*log.borrow(),
			vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
		);
	}

	#[rstest]
	fn test_dispose_unschedules_and_unsubscribes() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let runs = Rc::new(Cell::new(0));

		let (s, r) = (signal.clone(), runs.clone());
		let effect = Effect::new(&rt, move || {
			s.get();
			r.set(r.get() + 1);
		});

		signal.set(1);
		assert!(rt.is_scheduled(effect.id()));
		effect.dispose();

		assert!(!rt.is_scheduled(effect.id()));
		assert_eq!(rt.subscriber_count(signal.id()), 0);
		assert_eq!(rt.flush(), 0);
		assert_eq!(runs.get(), 1);
		assert!(effect.is_disposed());
	}

	#[rstest]
	fn test_nested_effects_disposed_with_parent_rerun() {
		let rt = Runtime::new();
		let outer = Signal::new(&rt, 0);
		let inner = Signal::new(&rt, 0);
		let inner_runs = Rc::new(Cell::new(0));

		let (o, i, runs, runtime) = (outer.clone(), inner.clone(), inner_runs.clone(), rt.clone());
		Effect::new(&rt, move || {
			o.get();
			let (i, runs) = (i.clone(), runs.clone());
			Effect::new(&runtime, move || {
				i.get();
				runs.set(runs.get() + 1);
			});
		});
		assert_eq!(rt.effect_count(), 2);

		outer.set(1);
		rt.flush();
		// the first nested effect is gone, a fresh one replaced it
		assert_eq!(rt.effect_count(), 2);
		assert_eq!(rt.subscriber_count(inner.id()), 1);

		inner.set(1);
		rt.flush();
		assert_eq!(inner_runs.get(), 3);
	}

	#[rstest]
	fn test_dependencies_rediscovered_each_run() {
		let rt = Runtime::new();
		let flag = Signal::new(&rt, true);
		let a = Signal::new(&rt, 0);
		let b = Signal::new(&rt, 0);

		let (f, x, y) = (flag.clone(), a.clone(), b.clone());
		Effect::new(&rt, move || {
			if f.get() {
				x.get();
			} else {
				y.get();
			}
		});
		assert_eq!(rt.subscriber_count(a.id()), 1);
		assert_eq!(rt.subscriber_count(b.id()), 0);

		flag.set(false);
		rt.flush();
		assert_eq!(rt.subscriber_count(a.id()), 0);
		assert_eq!(rt.subscriber_count(b.id()), 1);
	}

	#[rstest]
	fn test_run_bypasses_scheduler() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let runs = Rc::new(Cell::new(0));

		let (s, r) = (signal.clone(), runs.clone());
		let effect = Effect::new(&rt, move || {
			s.get();
			r.set(r.get() + 1);
		});
		signal.set(5);
		effect.run();

		assert_eq!(runs.get(), 2);
		assert_eq!(rt.flush(), 0);
	}

	#[rstest]
	fn test_on_cleanup_registers_with_running_effect() {
		let rt = Runtime::new();
		let cleaned = Rc::new(Cell::new(false));

		let (c, runtime) = (cleaned.clone(), rt.clone());
		let effect = Effect::new(&rt, move || {
			let c = c.clone();
			on_cleanup(&runtime, move || c.set(true));
		});
		assert!(!cleaned.get());

		effect.dispose();
		assert!(cleaned.get());
	}

	#[rstest]
	fn test_reentrant_run_keeps_dependencies() {
		let rt = Runtime::new();
		let count = Signal::new(&rt, 0);
		let runs = Rc::new(Cell::new(0));
		let this: Rc<RefCell<Option<Effect>>> = Rc::default();

		let (c, r, me) = (count.clone(), runs.clone(), this.clone());
		let effect = Effect::new(&rt, move || {
			c.get();
			r.set(r.get() + 1);
			if let Some(me) = me.borrow().as_ref() {
				me.run();
			}
		});
		*this.borrow_mut() = Some(effect.clone());
		effect.run();

		assert_eq!(runs.get(), 2);
		assert_eq!(rt.subscriber_count(count.id()), 1);
		count.set(1);
		rt.flush();
		assert_eq!(runs.get(), 3);
		this.borrow_mut().take();
	}
}
