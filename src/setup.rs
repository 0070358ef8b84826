//! Registration façade handed to [`World::configure`].
//!
//! [`World::configure`]: crate::world::World::configure

use crate::{
    ctx::{CaseHookCtx, Ctx, RunHookCtx, StepHookCtx},
    error::ConfigurationError,
    event::emitter::IdGenerator,
    expression::{Expression, ExpressionError, ParamTypeRegistry, Transformer},
    hook::{Hook, HookHandler, HookRegistry, HookResult, HookType},
    step::{
        FromStepArg, Location, StepDefinition, StepHandler, StepKeyword,
        StepRegistry,
    },
};

struct RawStep<W> {
    keyword: StepKeyword,
    pattern: String,
    handler: StepHandler<W>,
    location: Location,
}

struct RawHook<W> {
    ty: HookType,
    handler: HookHandler<W>,
    location: Location,
}

/// The registries built from one [`Setup`].
#[derive(Debug)]
pub(crate) struct Glue<W> {
    pub(crate) steps: StepRegistry<W>,
    pub(crate) params: ParamTypeRegistry,
    pub(crate) hooks: HookRegistry<W>,
}

/// Collects step definitions, parameter types and hooks during
/// [`World::configure`].
///
/// Patterns are compiled when the whole configuration is complete, so
/// parameter types may be registered before or after the steps using
/// them. Registration order of steps is their match-attempt order.
///
/// [`World::configure`]: crate::world::World::configure
pub struct Setup<W> {
    steps: Vec<RawStep<W>>,
    params: ParamTypeRegistry,
    hooks: Vec<RawHook<W>>,
}

fn extract<T: FromStepArg>(ctx: &Ctx, idx: usize) -> anyhow::Result<T> {
    let arg = ctx
        .arg(idx)
        .ok_or_else(|| anyhow::anyhow!("step argument {idx} is missing"))?;
    T::from_step_arg(arg).map_err(Into::into)
}

macro_rules! typed_step_fns {
    ($( $plain:ident, $with_ctx:ident, $kw:ident,
        [$(($ty:ident, $idx:tt)),*] );* $(;)?) => {$(
        #[doc = concat!(
            "Registers a `", stringify!($kw),
            "` step; arguments are extracted via [`FromStepArg`].",
        )]
        #[track_caller]
        pub fn $plain<$($ty,)* F>(
            &mut self,
            pattern: impl Into<String>,
            handler: F,
        ) where
            $($ty: FromStepArg + 'static,)*
            F: Fn(&mut W $(, $ty)*) -> anyhow::Result<()> + 'static,
        {
            self.register_step(
                StepKeyword::$kw,
                pattern.into(),
                Location::caller(),
                Box::new(move |world, _ctx| {
                    let _args = ($(extract::<$ty>(_ctx, $idx)?,)*);
                    handler(world $(, _args.$idx)*)
                }),
            );
        }

        #[doc = concat!(
            "Registers a `", stringify!($kw),
            "` step receiving the [`Ctx`] alongside extracted arguments.",
        )]
        #[track_caller]
        pub fn $with_ctx<$($ty,)* F>(
            &mut self,
            pattern: impl Into<String>,
            handler: F,
        ) where
            $($ty: FromStepArg + 'static,)*
            F: Fn(&mut W, &mut Ctx $(, $ty)*) -> anyhow::Result<()> + 'static,
        {
            self.register_step(
                StepKeyword::$kw,
                pattern.into(),
                Location::caller(),
                Box::new(move |world, ctx| {
                    let _args = ($(extract::<$ty>(ctx, $idx)?,)*);
                    handler(world, ctx $(, _args.$idx)*)
                }),
            );
        }
    )*};
}

macro_rules! hook_fns {
    ($( $name:ident, $ty:ident, $variant:ident,
        |$($arg:ident: $argty:ty),*| );* $(;)?) => {$(
        #[doc = concat!(
            "Registers a [`HookType::", stringify!($ty), "`] hook.",
        )]
        #[track_caller]
        pub fn $name<F>(&mut self, handler: F)
        where
            F: Fn($($argty),*) -> anyhow::Result<()> + 'static,
        {
            self.register_hook(
                HookType::$ty,
                HookHandler::$variant(Box::new(handler)),
                Location::caller(),
            );
        }
    )*};
}

impl<W: 'static> Setup<W> {
    pub(crate) fn new() -> Self {
        Self {
            steps: Vec::new(),
            params: ParamTypeRegistry::new(),
            hooks: Vec::new(),
        }
    }

    fn register_step(
        &mut self,
        keyword: StepKeyword,
        pattern: String,
        location: Location,
        handler: StepHandler<W>,
    ) {
        self.steps.push(RawStep { keyword, pattern, handler, location });
    }

    fn register_hook(
        &mut self,
        ty: HookType,
        handler: HookHandler<W>,
        location: Location,
    ) {
        self.hooks.push(RawHook { ty, handler, location });
    }

    /// Registers a `Given` step with a raw pattern handler.
    #[track_caller]
    pub fn given<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&mut W, &mut Ctx) -> anyhow::Result<()> + 'static,
    {
        self.register_step(
            StepKeyword::Given,
            pattern.into(),
            Location::caller(),
            Box::new(handler),
        );
    }

    /// Registers a `When` step with a raw pattern handler.
    #[track_caller]
    pub fn when<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&mut W, &mut Ctx) -> anyhow::Result<()> + 'static,
    {
        self.register_step(
            StepKeyword::When,
            pattern.into(),
            Location::caller(),
            Box::new(handler),
        );
    }

    /// Registers a `Then` step with a raw pattern handler.
    #[track_caller]
    pub fn then<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&mut W, &mut Ctx) -> anyhow::Result<()> + 'static,
    {
        self.register_step(
            StepKeyword::Then,
            pattern.into(),
            Location::caller(),
            Box::new(handler),
        );
    }

    /// Registers a step matching any keyword.
    #[track_caller]
    pub fn step<F>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&mut W, &mut Ctx) -> anyhow::Result<()> + 'static,
    {
        self.register_step(
            StepKeyword::Step,
            pattern.into(),
            Location::caller(),
            Box::new(handler),
        );
    }

    typed_step_fns! {
        given0, given0_ctx, Given, [];
        given1, given1_ctx, Given, [(A, 0)];
        given2, given2_ctx, Given, [(A, 0), (B, 1)];
        given3, given3_ctx, Given, [(A, 0), (B, 1), (C, 2)];
        given4, given4_ctx, Given, [(A, 0), (B, 1), (C, 2), (D, 3)];
        when0, when0_ctx, When, [];
        when1, when1_ctx, When, [(A, 0)];
        when2, when2_ctx, When, [(A, 0), (B, 1)];
        when3, when3_ctx, When, [(A, 0), (B, 1), (C, 2)];
        when4, when4_ctx, When, [(A, 0), (B, 1), (C, 2), (D, 3)];
        then0, then0_ctx, Then, [];
        then1, then1_ctx, Then, [(A, 0)];
        then2, then2_ctx, Then, [(A, 0), (B, 1)];
        then3, then3_ctx, Then, [(A, 0), (B, 1), (C, 2)];
        then4, then4_ctx, Then, [(A, 0), (B, 1), (C, 2), (D, 3)];
        step0, step0_ctx, Step, [];
        step1, step1_ctx, Step, [(A, 0)];
        step2, step2_ctx, Step, [(A, 0), (B, 1)];
        step3, step3_ctx, Step, [(A, 0), (B, 1), (C, 2)];
        step4, step4_ctx, Step, [(A, 0), (B, 1), (C, 2), (D, 3)];
    }

    /// Registers a custom parameter type.
    ///
    /// Without a transformer, matches arrive as opaque
    /// [`StepValue::Custom`] payloads carrying the raw text.
    ///
    /// [`StepValue::Custom`]: crate::expression::StepValue::Custom
    pub fn add_param_type<I>(
        &mut self,
        name: impl Into<String>,
        patterns: I,
        transformer: Option<Transformer>,
    ) where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.params.register_custom(
            name,
            patterns.into_iter().map(Into::into).collect(),
            transformer,
        );
    }

    hook_fns! {
        before_test_run, BeforeTestRun, BeforeRun,
            |ctx: &mut RunHookCtx|;
        after_test_run, AfterTestRun, AfterRun,
            |ctx: &mut RunHookCtx, result: &HookResult|;
        before_test_case, BeforeTestCase, BeforeCase,
            |world: &mut W, ctx: &mut CaseHookCtx|;
        after_test_case, AfterTestCase, AfterCase,
            |world: &mut W, ctx: &mut CaseHookCtx, result: &HookResult|;
        before_test_step, BeforeTestStep, BeforeStep,
            |world: &mut W, ctx: &mut StepHookCtx|;
        after_test_step, AfterTestStep, AfterStep,
            |world: &mut W, ctx: &mut StepHookCtx, result: &HookResult|;
    }

    /// Compiles every registered pattern and mints definition ids.
    pub(crate) fn build(
        self,
        ids: &IdGenerator,
    ) -> Result<Glue<W>, ConfigurationError> {
        let mut steps = StepRegistry::new();
        for raw in self.steps {
            let expression = Expression::compile(&raw.pattern, &self.params)
                .map_err(|e| match e {
                    ExpressionError::UndefinedParameterType(name) => {
                        ConfigurationError::UnknownParameterType {
                            name,
                            pattern: raw.pattern.clone(),
                        }
                    }
                    other => ConfigurationError::InvalidStepPattern {
                        pattern: raw.pattern.clone(),
                        message: other.to_string(),
                    },
                })?;
            steps.push(StepDefinition {
                id: ids.next("sd"),
                keyword: raw.keyword,
                pattern: raw.pattern,
                expression,
                handler: raw.handler,
                location: Some(raw.location),
            });
        }

        let mut hooks = HookRegistry::new();
        for raw in self.hooks {
            hooks.push(Hook {
                id: ids.next("hook"),
                ty: raw.ty,
                handler: raw.handler,
                location: Some(raw.location),
            });
        }

        Ok(Glue { steps, params: self.params, hooks })
    }
}
