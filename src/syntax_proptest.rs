//! Property-based tests for the normalizer and the string comparison.
