//! JDBC acceptance test for PostgreSQL-wire-compatible databases.
//!
//! Renders a Java client program into a shell script, runs it in a one-shot
//! client container against the database under test and checks the exit code.

pub mod config;
pub mod container;
pub mod log_scope;
pub mod runner;
pub mod scenario;
pub mod template;

pub use config::{ConfigError, HarnessConfig};
pub use runner::{CaseOutcome, Expectation, HarnessError, Runner};
pub use scenario::{java_cases, run_java, Case};
pub use template::{render, SetterCall, JAVA_SCRIPT};
