//! End-to-end tests for the identity runtime live in `tests/`.
