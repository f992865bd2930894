//! Query capability traits, registry, and the router seam.

pub mod registry;
pub mod traits;

pub use registry::ToolRegistry;
pub use traits::{DispatchContext, Tool, ToolDispatcher, ToolOutput, ToolSchema};
