//! End-to-end tests at the query level.
//!
//! Each test file covers a specific scenario, building a store and an
//! algebra tree and checking the solutions that come back.

#![cfg(test)]

mod helpers;

mod test_accumulator_errors;
mod test_algebra_processor;
mod test_binding_round_trip;
mod test_index_selection;
mod test_nested_patterns;
mod test_no_variables;
mod test_temporary_variables;
mod test_timeout;
