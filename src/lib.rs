//! BDD execution core: runs Gherkin features against step definitions
//! registered in Rust and emits a strictly ordered Cucumber-Messages
//! envelope stream.
//!
//! The pipeline is: a [`FeatureCache`] parses sources once per URI, the
//! pickle compiler flattens them (backgrounds, rules, outline examples)
//! into [`Pickle`]s, a [`PickleFilter`] selects by tag expression and
//! scenario name, and the executor runs each pickle against a fresh
//! [`World`] with hooks, retries, dry-run, skip tags and attachments.
//! Every [`Sink`] sees the same canonically ordered [`Envelope`] stream.
//!
//! ```
//! use moonspec::{run, FeatureSource, RunOptions, Setup, World};
//!
//! #[derive(Default)]
//! struct Basket {
//!     cucumbers: i64,
//! }
//!
//! impl World for Basket {
//!     fn configure(setup: &mut Setup<Self>) {
//!         setup.given1("I have {int} cucumbers", |w: &mut Self, n: i64| {
//!             w.cucumbers = n;
//!             Ok(())
//!         });
//!         setup.when1("I eat {int} cucumbers", |w: &mut Self, n: i64| {
//!             w.cucumbers -= n;
//!             Ok(())
//!         });
//!         setup.then1(
//!             "I should have {int} cucumbers",
//!             |w: &mut Self, n: i64| {
//!                 anyhow::ensure!(w.cucumbers == n);
//!                 Ok(())
//!             },
//!         );
//!     }
//! }
//!
//! let result = run(Basket::default, RunOptions {
//!     sources: vec![FeatureSource::Text {
//!         uri: "math.feature".into(),
//!         content: "\
//! Feature: Simple math
//!   Scenario: Addition
//!     Given I have 5 cucumbers
//!     When I eat 3 cucumbers
//!     Then I should have 2 cucumbers
//! "
//!         .into(),
//!     }],
//!     ..RunOptions::default()
//! })
//! .unwrap();
//! assert_eq!(result.summary.passed, 1);
//! ```
//!
//! [`PickleFilter`]: crate::filter::PickleFilter

#![warn(rust_2018_idioms, missing_docs)]

// Re-export Gherkin for the convenience of everybody.
pub use gherkin;

pub mod config;
pub mod ctx;
pub mod error;
pub mod event;
pub mod expression;
pub mod feature;
pub mod filter;
pub mod hook;
mod macros;
pub mod pickle;
pub mod result;
pub mod runner;
pub mod setup;
pub mod sink;
pub mod step;
pub mod tag;
pub mod world;

pub use self::{
    config::MoonspecConfig,
    ctx::{CaseHookCtx, Ctx, RunHookCtx, StepHookCtx},
    error::{ConfigurationError, RunError},
    event::Envelope,
    expression::{
        Expression, ParamTypeRegistry, StepArg, StepValue, Transformer,
    },
    feature::{FeatureCache, FeatureSource, ParseErrorInfo},
    hook::{HookError, HookResult, HookType},
    pickle::{DataTable, Pickle, PickleStepType},
    result::{
        RunResult, RunSummary, ScenarioResult, ScenarioStatus, StepStatus,
    },
    runner::{run, run_or_fail, RunOptions},
    setup::Setup,
    sink::{MessageVec, Ndjson, Sink},
    step::{DocString, FromStepArg, Location, StepArgError},
    tag::TagExpr,
    world::World,
};
