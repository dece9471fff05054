//! Scope - explicit ownership of effects
//!
//! A [`Scope`] collects every effect (and cleanup) created while it runs code,
//! and disposes all of them at once.
//!
//! ```ignore
//! let scope = Scope::new(&rt);
//! scope.run(|| {
//!     Effect::new(&rt, move || println!("{}", count.get()));
//! });
//! scope.dispose(); // the effect stops
//! ```

use std::rc::Rc;

use crate::effect::Cleanup;
use crate::runtime::{Owner, Runtime};

/// Owner of effects created inside [`Scope::run`]
#[derive(Clone)]
pub struct Scope {
	owner: Rc<Owner>,
	runtime: Runtime,
}

impl Scope {
	/// Create a scope.
	///
	/// A scope created while another owner is current is disposed with it.
	pub fn new(rt: &Runtime) -> Self {
		let owner = Rc::new(Owner::new());
		if let Some(parent) = rt.current_owner() {
			let child = Rc::downgrade(&owner);
			parent.add_cleanup(Box::new(move || {
				if let Some(child) = child.upgrade() {
					child.dispose();
				}
			}));
		}
		Self {
			owner,
			runtime: rt.clone(),
		}
	}

	/// Run `f` with this scope as the owner of new effects.
	pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
		let _owner = self.runtime.enter_owner(Some(self.owner.clone()));
		f()
	}

	/// Register a cleanup that runs when the scope is disposed
	pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
		self.owner.add_cleanup(Box::new(f) as Cleanup);
	}

	/// Dispose every effect owned by the scope and run its cleanups.
	///
	/// Idempotent. Effects later created inside [`run`](Self::run) are
	/// disposed as soon as they register.
	pub fn dispose(&self) {
		self.owner.dispose();
	}

	pub fn is_disposed(&self) -> bool {
		self.owner.is_disposed()
	}

	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}
}

impl core::fmt::Debug for Scope {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Scope")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Effect, Signal};
	use core::cell::Cell;
	use rstest::rstest;

	#[rstest]
	fn test_dispose_stops_owned_effects() {
		let rt = Runtime::new();
		let signal = Signal::new(&rt, 0);
		let runs = Rc::new(Cell::new(0));
		let scope = Scope::new(&rt);

		let (s, r) = (signal.clone(), runs.clone());
		let effect = scope.run(|| {
			Effect::new(&rt, move || {
				s.get();
				r.set(r.get() + 1);
			})
		});
		scope.dispose();
		signal.set(1);
		rt.flush();

		assert!(effect.is_disposed());
		assert_eq!(runs.get(), 1);
		assert_eq!(rt.subscriber_count(signal.id()), 0);
	}

	#[rstest]
	fn test_nested_scope_disposed_with_parent() {
		let rt = Runtime::new();
		let parent = Scope::new(&rt);
		let child = parent.run(|| Scope::new(&rt));
		let cleaned = Rc::new(Cell::new(false));

		let c = cleaned.clone();
		child.on_cleanup(move || c.set(true));
		parent.dispose();

		assert!(child.is_disposed());
		assert!(cleaned.get());
	}

	#[rstest]
	fn test_detached_effect_outlives_scope() {
		let rt = Runtime::new();
		let scope = Scope::new(&rt);

		let effect = scope.run(|| rt.detached(|| Effect::new(&rt, || ())));
		scope.dispose();

		assert!(!effect.is_disposed());
	}
}
