//! Fine-grained reactivity
//!
//! This module provides access to trellis-reactive: the update scheduler,
//! signals, derived values, effects and ownership scopes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis::reactive::{Effect, Memo, Runtime, Signal};
//!
//! let rt = Runtime::new();
//! let count = Signal::new(&rt, 1);
//! let doubled = Memo::new(&rt, {
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! let _log = Effect::new(&rt, {
//!     let doubled = doubled.clone();
//!     move || println!("doubled = {}", doubled.get())
//! });
//!
//! count.set(2);
//! rt.flush();
//! ```

pub use trellis_reactive::*;
