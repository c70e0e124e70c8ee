//! Endpoint behavior tests.
//!
//! Each module lists the rules it covers; tests are named `rule_N_...`.

mod harness;
