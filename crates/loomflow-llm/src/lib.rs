//! External text-generation collaborator for Loomflow.
//!
//! The engine only ever sees the [`TextGenerator`] trait; the production
//! implementation is [`GenerativeLanguageClient`], and deterministic stubs
//! ([`EchoGenerator`], [`StaticGenerator`], [`FailingGenerator`]) stand in
//! for it in tests.

pub mod client;
pub mod generator;

pub use client::GenerativeLanguageClient;
pub use generator::{
    DynGenerator, EchoGenerator, FailingGenerator, StaticGenerator, TextGenerator,
};
