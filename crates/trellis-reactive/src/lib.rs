//! Trellis Reactive
//!
//! Fine-grained reactive primitives for the trellis view engine.
//!
//! ## Architecture
//!
//! The reactive system is built around an explicit [`Runtime`] handle:
//!
//! 1. **Observer Stack**: Tracks the currently executing [`Effect`]
//! 2. **Dependency Tracking**: [`Signal::get`] registers the current observer
//! 3. **Owner Stack**: Effects created while another effect (or a [`Scope`]) runs
//!    are disposed together with it
//! 4. **Batching**: Writes only schedule dependents; [`Runtime::flush`] runs every
//!    affected effect once, in first-scheduled order
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
//! count.set(1);
//! count.set(2);
//! rt.flush(); // prints "Count is: 2" once
//! ```

pub mod context;
pub mod effect;
pub mod memo;
pub mod resource;
pub mod runtime;
pub mod scheduler;
pub mod scope;
pub mod signal;

pub use context::{Context, ContextGuard};
pub use effect::{Effect, IntoCleanup, on_cleanup};
pub use memo::Memo;
pub use resource::{Resource, ResourceHandle, ResourceState};
pub use runtime::{FlushTask, NodeId, Runtime, RuntimeOptions};
pub use scheduler::Scheduler;
pub use scope::Scope;
pub use signal::{ReadSignal, Signal, WriteSignal, create_signal};
