//! Core domain types and logic.

pub mod rule;
pub mod violation;
pub mod error;
pub mod catalog;
pub mod config;
pub mod validator;
pub mod normalizer;
pub mod draft;
pub mod pipeline;
