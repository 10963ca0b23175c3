//! # Application Layer
//!
//! The reply engine: credential rotation, text generation, dispatch and
//! the per-channel worker loop, all wired together by the supervisor.

pub mod dispatcher;
pub mod generator;
pub mod keys;
pub mod supervisor;
pub mod worker;
