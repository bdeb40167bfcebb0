// LLM abstraction layer

pub mod client;
pub mod groq;
pub mod openai;
pub mod provider;

#[cfg(test)]
pub mod scripted;

pub use client::GenerationClient;
pub use provider::*;
