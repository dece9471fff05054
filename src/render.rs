//! View descriptions, reconciliation, hydration and HTML serialization
//!
//! This module provides access to trellis-render.
//!
//! ## Architecture
//!
//! - **Descriptions**: immutable [`View`](trellis_render::View) trees built with [`el`](trellis_render::el) and friends
//! - **Roots**: a render function mounted into a container and patched on change
//! - **Directives**: `t-if`, `t-for`, `t-show`, `t-model` and user-registered hooks
//! - **SSR**: HTML output that hydrates back into a live tree

pub use trellis_render::*;
