//! The user-defined world: per-scenario state and the single glue
//! extension point.

use crate::setup::Setup;

/// Per-scenario state holder, created by the factory passed to
/// [`run()`].
///
/// The framework treats worlds as opaque: a fresh one is created for
/// every attempt of every pickle, handed to step handlers and case/step
/// hooks as `&mut Self`, and dropped when the attempt ends. Worlds are
/// never shared between pickles.
///
/// [`configure`] is the single extension point: it registers step
/// definitions, custom parameter types and hooks on the given [`Setup`].
/// It runs once up front (to emit glue-registration envelopes) and again
/// for every attempt, so anything captured by registered closures is
/// attempt-fresh.
///
/// ```
/// use moonspec::{Setup, World};
///
/// #[derive(Default)]
/// struct Calculator {
///     total: i64,
/// }
///
/// impl World for Calculator {
///     fn configure(setup: &mut Setup<Self>) {
///         setup.given1("I start with {int}", |world: &mut Self, n: i64| {
///             world.total = n;
///             Ok(())
///         });
///         setup.when1("I add {int}", |world: &mut Self, n: i64| {
///             world.total += n;
///             Ok(())
///         });
///         setup.then1("the total is {int}", |world: &mut Self, n: i64| {
///             anyhow::ensure!(world.total == n, "total is {}", world.total);
///             Ok(())
///         });
///     }
/// }
/// ```
///
/// [`run()`]: crate::run
/// [`configure`]: World::configure
pub trait World: Sized + 'static {
    /// Registers this world's glue on the given [`Setup`].
    fn configure(setup: &mut Setup<Self>);
}
