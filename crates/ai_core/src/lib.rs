#![forbid(unsafe_code)]
//! AI Core - LLM gateway adapter
//!
//! Implements [`application::LlmGatewayPort`] against an OpenAI-compatible
//! chat-completions endpoint: free-form chat plus typed conversation
//! classification.

pub mod gateway;

pub use gateway::LlmGateway;
