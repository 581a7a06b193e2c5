//! Integration test host crate. All content lives under `tests/`.
