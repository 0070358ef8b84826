//! Per-invocation contexts passed to step handlers and hooks.
//!
//! Every context carries a buffer of pending attachments; the executor
//! drains the buffer after each handler invocation (whether it returned,
//! failed or panicked) and emits one envelope per entry.

use base64::Engine as _;

use crate::{
    event::ContentEncoding,
    expression::{StepArg, StepValue},
    pickle::{DataTable, PickleStepType},
    step::{FromStepArg, StepArgError},
};

/// A buffered attachment, not yet turned into an envelope.
#[derive(Clone, Debug)]
pub(crate) enum AttachmentRequest {
    /// Embedded content.
    Embedded {
        body: String,
        media_type: String,
        file_name: Option<String>,
        encoding: ContentEncoding,
    },

    /// Reference to externally stored content.
    External { url: String, media_type: String },
}

/// Buffer of pending attachments shared by every context type.
#[derive(Debug, Default)]
pub struct Attachments {
    buffer: Vec<AttachmentRequest>,
}

impl Attachments {
    /// Buffers an embedded text attachment (`IDENTITY` encoding).
    pub fn attach(
        &mut self,
        body: impl Into<String>,
        media_type: impl Into<String>,
        file_name: Option<&str>,
    ) {
        self.buffer.push(AttachmentRequest::Embedded {
            body: body.into(),
            media_type: media_type.into(),
            file_name: file_name.map(str::to_owned),
            encoding: ContentEncoding::Identity,
        });
    }

    /// Buffers an embedded binary attachment, Base64-encoding the bytes.
    pub fn attach_bytes(
        &mut self,
        data: &[u8],
        media_type: impl Into<String>,
        file_name: Option<&str>,
    ) {
        self.buffer.push(AttachmentRequest::Embedded {
            body: base64::engine::general_purpose::STANDARD.encode(data),
            media_type: media_type.into(),
            file_name: file_name.map(str::to_owned),
            encoding: ContentEncoding::Base64,
        });
    }

    /// Buffers a reference to externally stored content.
    pub fn attach_url(
        &mut self,
        url: impl Into<String>,
        media_type: impl Into<String>,
    ) {
        self.buffer.push(AttachmentRequest::External {
            url: url.into(),
            media_type: media_type.into(),
        });
    }

    pub(crate) fn drain(&mut self) -> Vec<AttachmentRequest> {
        std::mem::take(&mut self.buffer)
    }
}

/// Scenario metadata visible to handlers.
#[derive(Clone, Debug)]
pub struct ScenarioInfo {
    /// URI of the feature the scenario came from.
    pub uri: String,

    /// Scenario (pickle) display name.
    pub name: String,

    /// Inherited tag names, without the `@` sigil.
    pub tags: Vec<String>,
}

/// Step metadata visible to handlers.
#[derive(Clone, Debug)]
pub struct StepInfo {
    /// Step text, outline placeholders already substituted.
    pub text: String,

    /// Resolved step type.
    pub ty: PickleStepType,
}

/// Context of a step-handler invocation.
#[derive(Debug)]
pub struct Ctx {
    scenario: ScenarioInfo,
    step: StepInfo,
    args: Vec<StepArg>,
    attachments: Attachments,
}

impl Ctx {
    pub(crate) fn new(
        scenario: ScenarioInfo,
        step: StepInfo,
        args: Vec<StepArg>,
    ) -> Self {
        Self { scenario, step, args, attachments: Attachments::default() }
    }

    /// Scenario metadata.
    #[must_use]
    pub fn scenario(&self) -> &ScenarioInfo {
        &self.scenario
    }

    /// Step metadata.
    #[must_use]
    pub fn step(&self) -> &StepInfo {
        &self.step
    }

    /// Matched arguments, left to right. A DocString or DataTable block
    /// appears as a synthetic last argument.
    #[must_use]
    pub fn args(&self) -> &[StepArg] {
        &self.args
    }

    /// Argument at `idx`, if present.
    #[must_use]
    pub fn arg(&self, idx: usize) -> Option<&StepArg> {
        self.args.get(idx)
    }

    /// Argument at `idx` converted via [`FromStepArg`].
    ///
    /// # Errors
    ///
    /// If the argument is missing or does not convert.
    pub fn typed<T: FromStepArg>(
        &self,
        idx: usize,
    ) -> Result<T, StepArgError> {
        let arg = self.arg(idx).ok_or_else(|| {
            StepArgError::new(format!("step argument {idx} is missing"))
        })?;
        T::from_step_arg(arg)
    }

    /// The step's DocString block, if any.
    #[must_use]
    pub fn doc_string(&self) -> Option<&str> {
        self.args.iter().find_map(|a| match &a.value {
            StepValue::DocString(content) => Some(content.as_str()),
            _ => None,
        })
    }

    /// The step's data table, if any.
    #[must_use]
    pub fn data_table(&self) -> Option<&DataTable> {
        self.args.iter().find_map(|a| match &a.value {
            StepValue::DataTable(table) => Some(table),
            _ => None,
        })
    }
}

/// Context of a run-level hook invocation.
#[derive(Debug, Default)]
pub struct RunHookCtx {
    attachments: Attachments,
}

/// Context of a case-level hook invocation.
#[derive(Debug)]
pub struct CaseHookCtx {
    scenario: ScenarioInfo,
    attachments: Attachments,
}

impl CaseHookCtx {
    pub(crate) fn new(scenario: ScenarioInfo) -> Self {
        Self { scenario, attachments: Attachments::default() }
    }

    /// Scenario metadata.
    #[must_use]
    pub fn scenario(&self) -> &ScenarioInfo {
        &self.scenario
    }
}

/// Context of a step-level hook invocation.
#[derive(Debug)]
pub struct StepHookCtx {
    scenario: ScenarioInfo,
    step: StepInfo,
    attachments: Attachments,
}

impl StepHookCtx {
    pub(crate) fn new(scenario: ScenarioInfo, step: StepInfo) -> Self {
        Self { scenario, step, attachments: Attachments::default() }
    }

    /// Scenario metadata.
    #[must_use]
    pub fn scenario(&self) -> &ScenarioInfo {
        &self.scenario
    }

    /// Step metadata.
    #[must_use]
    pub fn step(&self) -> &StepInfo {
        &self.step
    }
}

macro_rules! impl_attachment_deref {
    ($($ctx:ty),* $(,)?) => {$(
        impl std::ops::Deref for $ctx {
            type Target = Attachments;

            fn deref(&self) -> &Attachments {
                &self.attachments
            }
        }

        impl std::ops::DerefMut for $ctx {
            fn deref_mut(&mut self) -> &mut Attachments {
                &mut self.attachments
            }
        }
    )*};
}

impl_attachment_deref!(Ctx, RunHookCtx, CaseHookCtx, StepHookCtx);
