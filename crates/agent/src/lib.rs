//! The core agent loop - the heart of toolloop.
//!
//! Each invocation follows a **Stream → Accumulate → Execute** cycle:
//!
//! 1. **Stream** the running conversation plus the tool catalog to the model
//! 2. **Forward** content fragments to the caller as they arrive
//! 3. **Accumulate** tool-call fragments by stream index
//! 4. **If tool calls were requested**: run them, append the results, loop back to step 1
//! 5. **Otherwise**: emit `done`
//!
//! The loop is a pull-based event stream; dropping it abandons the
//! invocation.

pub mod accumulator;
pub mod loop_runner;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use accumulator::{PendingToolCall, PendingToolCalls};
pub use loop_runner::{AgentLoop, AgentStream, DEFAULT_MAX_ROUNDS, DEFAULT_SYSTEM_PROMPT};
pub use stream_event::AgentEvent;
