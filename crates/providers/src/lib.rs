//! Model endpoint clients for toolloop.
//!
//! All providers implement the `toolloop_core::Provider` trait. The agent
//! loop receives one explicitly constructed provider at startup.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
