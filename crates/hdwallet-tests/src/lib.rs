//! Integration and adversarial test suite for the hdwallet backends.
//!
//! Tests here drive the public API the way a front-end would: unlock an
//! encrypted container, derive addresses, sign transactions against funded
//! previous outputs, and try to get a bad transaction signed.

pub mod helpers;
