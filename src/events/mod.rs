//! Messages exchanged between the load pipeline and its loader threads.
//!
//! Submodules:
//! - [`loading`] – load commands and settlement messages
pub mod loading;
