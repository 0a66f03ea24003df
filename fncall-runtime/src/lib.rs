//! Invocation of tools and agent actions.
//!
//! A call flows through three stages: the target's declaration is resolved
//! from its schema document, the JSON arguments are checked by [`validate`],
//! and a [`LanguageRunner`] spawns the matching runtime with an
//! [`ExecutionContext`] that carries the `LLM_*` environment and a private
//! capture file. [`check`] reports what a repository still needs before its
//! tools can run.

#![warn(missing_docs, clippy::pedantic)]

pub mod check;
mod context;
mod dispatch;
mod env;
mod error;
pub mod runner;
pub mod validate;

pub use check::{CheckReport, Checker, Finding, FindingKind};
pub use context::{CaptureFile, EntryPoint, ExecutionContext};
pub use dispatch::{Dispatcher, InvocationOutput, InvocationRequest, TargetKind};
pub use env::EnvLookup;
pub use error::{EXIT_SOFTWARE, EXIT_USAGE, InvokeError, InvokeResult, ValidationError};
pub use runner::{LanguageRunner, NodeRunner, ProcessOutput, PythonRunner, ShellRunner, runner_for};
pub use validate::{ValidatedArgs, validate};
