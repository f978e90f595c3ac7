//! LLM integration for generating cover letters
//!
//! A single [`CoverLetterClient`] trait hides the wire differences between
//! the supported backends; [`create_client`] is the only dispatch point from
//! configuration to a concrete client.

mod anthropic;
mod client;
mod openai;
mod providers;

pub use client::{
    CoverLetterClient, GenerationRequest, ProviderInfo, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use providers::create_client;
