//! Library surface of the sharplua driver, for the binary and the tests.

pub mod cli;
pub mod pipeline;
