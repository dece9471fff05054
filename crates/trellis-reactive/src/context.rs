//! Context - values passed down to descendants without threading them through props
//!
//! A provided value is visible to everything that runs while the returned
//! [`ContextGuard`] is alive, and to every effect created during that time:
//! effects capture the context chain at creation and restore it on each run.
//!
//! ```ignore
//! let theme: Context<String> = Context::new();
//!
//! let _guard = rt.provide_context(&theme, "dark".to_string());
//! assert_eq!(rt.use_context(&theme), Some("dark".to_string()));
//! ```

use core::any::Any;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::rc::Rc;

use crate::runtime::Runtime;

/// One link of the persistent context chain.
pub(crate) struct ContextFrame {
	key: usize,
	value: Rc<dyn Any>,
	parent: Option<Rc<ContextFrame>>,
}

/// Typed key for a context value.
pub struct Context<T> {
	key: usize,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for Context<T> {}

impl<T: 'static> Context<T> {
	/// Create a new, distinct context key
	pub fn new() -> Self {
		static NEXT_KEY: AtomicUsize = AtomicUsize::new(0);
		Self {
			key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
			_marker: PhantomData,
		}
	}
}

impl<T: 'static> Default for Context<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> core::fmt::Debug for Context<T> {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Context")
			.field("key", &self.key)
			.field("type", &core::any::type_name::<T>())
			.finish()
	}
}

/// Removes a provided context value when dropped.
#[must_use = "the context value is removed as soon as the guard is dropped"]
pub struct ContextGuard {
	runtime: Runtime,
	previous: Option<Rc<ContextFrame>>,
}

impl Drop for ContextGuard {
	fn drop(&mut self) {
		*self.runtime.inner.context.borrow_mut() = self.previous.take();
	}
}

impl Runtime {
	/// Provide `value` for `ctx` until the guard is dropped.
	///
	/// Shadows any outer value for the same context.
	pub fn provide_context<T: 'static>(&self, ctx: &Context<T>, value: T) -> ContextGuard {
		let previous = self.context_snapshot();
		let frame = ContextFrame {
			key: ctx.key,
			value: Rc::new(value),
			parent: previous.clone(),
		};
		*self.inner.context.borrow_mut() = Some(Rc::new(frame));
		ContextGuard {
			runtime: self.clone(),
			previous,
		}
	}

	/// Read the nearest provided value for `ctx`.
	pub fn use_context<T: Clone + 'static>(&self, ctx: &Context<T>) -> Option<T> {
		let mut frame = self.context_snapshot();
		while let Some(current) = frame {
			if current.key == ctx.key {
				return current.value.downcast_ref::<T>().cloned();
			}
			frame = current.parent.clone();
		}
		None
	}

	pub fn has_context<T: 'static>(&self, ctx: &Context<T>) -> bool {
		let mut frame = self.context_snapshot();
		while let Some(current) = frame {
			if current.key == ctx.key {
				return true;
			}
			frame = current.parent.clone();
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Effect, Signal};
	use core::cell::RefCell;
	use rstest::rstest;

	#[rstest]
	fn test_use_context_with_value() {
		let rt = Runtime::new();
		let ctx: Context<i32> = Context::new();
		let _guard = rt.provide_context(&ctx, 42);

		assert_eq!(rt.use_context(&ctx), Some(42));
	}

	#[rstest]
	fn test_use_context_without_value() {
		let rt = Runtime::new();
		let ctx: Context<String> = Context::new();

		assert!(rt.use_context(&ctx).is_none());
		assert!(!rt.has_context(&ctx));
	}

	#[rstest]
	fn test_inner_provider_shadows_and_restores() {
		let rt = Runtime::new();
		let ctx: Context<&'static str> = Context::new();

		let _outer = rt.provide_context(&ctx, "outer");
		{
			let _inner = rt.provide_context(&ctx, "inner");
			assert_eq!(rt.use_context(&ctx), Some("inner"));
		}
		assert_eq!(rt.use_context(&ctx), Some("outer"));
	}

	#[rstest]
	fn test_effect_sees_context_from_creation_time() {
		let rt = Runtime::new();
		let ctx: Context<u8> = Context::new();
		let trigger = Signal::new(&rt, 0);
		let seen = Rc::new(RefCell::new(Vec::new()));

		{
			let _guard = rt.provide_context(&ctx, 7);
			let (t, s, runtime) = (trigger.clone(), seen.clone(), rt.clone());
			Effect::new(&rt, move || {
				t.get();
				s.borrow_mut().push(runtime.use_context(&ctx));
			});
		}
		assert!(rt.use_context(&ctx).is_none());

		trigger.set(1);
		rt.flush();

		assert_eq!(*seen.borrow(), vec![Some(7), Some(7)]);
		assert!(rt.use_context(&ctx).is_none());
	}
}
