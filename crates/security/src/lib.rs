//! Security for toolloop: filesystem sandboxing of tool paths.
//!
//! Every file tool resolves its path argument through a
//! [`WorkspaceSandbox`] and refuses anything that lands outside the root.

pub mod path;

pub use path::{PathValidationError, WorkspaceSandbox};
