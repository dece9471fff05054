//! Resource - values that arrive later
//!
//! A [`Resource`] is a signal over [`ResourceState`]. Whatever produces the
//! value (a callback, an I/O completion, a test) holds a [`ResourceHandle`]
//! and calls `resolve`/`fail`; readers re-render through the ordinary
//! scheduling path.
//!
//! ```ignore
//! let user = Resource::load(&rt, |handle| {
//!     client.fetch_user(move |result| match result {
//!         Ok(user) => handle.resolve(user),
//!         Err(err) => handle.fail(err),
//!     });
//! });
//!
//! Effect::new(&rt, move || match user.state() {
//!     ResourceState::Pending => println!("loading"),
//!     ResourceState::Ready(user) => println!("{user:?}"),
//!     ResourceState::Failed(err) => println!("{err}"),
//! });
//! ```

use crate::runtime::Runtime;
use crate::signal::Signal;

/// Loading state of a [`Resource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<T, E> {
	Pending,
	Ready(T),
	Failed(E),
}

impl<T, E> ResourceState<T, E> {
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending)
	}

	pub fn is_ready(&self) -> bool {
		matches!(self, Self::Ready(_))
	}
}

/// A reactive slot for a value produced asynchronously
pub struct Resource<T: 'static, E: 'static> {
	state: Signal<ResourceState<T, E>>,
}

impl<T: 'static, E: 'static> Clone for Resource<T, E> {
	fn clone(&self) -> Self {
		Self {
			state: self.state.clone(),
		}
	}
}

/// Write side of a [`Resource`], handed to whatever produces the value
pub struct ResourceHandle<T: 'static, E: 'static> {
	state: Signal<ResourceState<T, E>>,
}

impl<T: 'static, E: 'static> Clone for ResourceHandle<T, E> {
	fn clone(&self) -> Self {
		Self {
			state: self.state.clone(),
		}
	}
}

impl<T: 'static, E: 'static> Resource<T, E> {
	/// Create a pending resource
	pub fn new(rt: &Runtime) -> Self {
		Self {
			state: Signal::new(rt, ResourceState::Pending),
		}
	}

	/// Create a pending resource and hand its write side to `loader`.
	pub fn load(rt: &Runtime, loader: impl FnOnce(ResourceHandle<T, E>)) -> Self {
		let resource = Self::new(rt);
		rt.untrack(|| loader(resource.handle()));
		resource
	}

	pub fn handle(&self) -> ResourceHandle<T, E> {
		ResourceHandle {
			state: self.state.clone(),
		}
	}

	/// Current state, tracked
	pub fn state(&self) -> ResourceState<T, E>
	where
		T: Clone,
		E: Clone,
	{
		self.state.get()
	}

	pub fn is_pending(&self) -> bool {
		self.state.with(ResourceState::is_pending)
	}

	/// The value if ready, tracked
	pub fn ready(&self) -> Option<T>
	where
		T: Clone,
	{
		self.state.with(|state| match state {
			ResourceState::Ready(value) => Some(value.clone()),
			_ => None,
		})
	}

	/// The error if the load failed, tracked
	pub fn error(&self) -> Option<E>
	where
		E: Clone,
	{
		self.state.with(|state| match state {
			ResourceState::Failed(err) => Some(err.clone()),
			_ => None,
		})
	}

	pub fn resolve(&self, value: T) {
		self.handle().resolve(value);
	}

	pub fn fail(&self, error: E) {
		self.handle().fail(error);
	}

	/// Go back to pending, e.g. before a reload
	pub fn reset(&self) {
		self.state.update(|state| *state = ResourceState::Pending);
	}
}

impl<T: 'static, E: 'static> ResourceHandle<T, E> {
	pub fn resolve(&self, value: T) {
		self.state.update(|state| *state = ResourceState::Ready(value));
	}

	pub fn fail(&self, error: E) {
		self.state.update(|state| *state = ResourceState::Failed(error));
	}
}
