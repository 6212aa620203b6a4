//! Cross-module tests for the note index and the search pipeline

pub mod helpers;
