use crate::device::{GraphicsContext, ShaderStage};

use super::error::PipelineError;

/// Shader text for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    stage: ShaderStage,
    text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, text: impl Into<String>) -> Self {
        Self { stage, text: text.into() }
    }

    pub fn vertex(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Vertex, text)
    }

    pub fn fragment(text: impl Into<String>) -> Self {
        Self::new(ShaderStage::Fragment, text)
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A successfully compiled shader object.
///
/// Owned by the caller until handed to
/// [`ProgramLinker::link`](super::ProgramLinker::link), which releases it.
#[must_use = "a compiled shader must be linked or released"]
#[derive(Debug)]
pub struct ShaderObject<S> {
    stage: ShaderStage,
    handle: S,
    compile_log: String,
}

impl<S: Copy> ShaderObject<S> {
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn handle(&self) -> S {
        self.handle
    }

    /// Driver output from a successful compile; usually empty.
    #[inline]
    pub fn compile_log(&self) -> &str {
        &self.compile_log
    }

    pub fn release<C: GraphicsContext<Shader = S>>(self, ctx: &mut C) {
        ctx.delete_shader(self.handle);
    }
}

pub struct ShaderCompiler;

impl ShaderCompiler {
    /// Creates a `stage` shader object from `text` and compiles it.
    ///
    /// On failure the shader object is deleted before returning, so no
    /// context object outlives the error.
    pub fn compile<C: GraphicsContext>(
        ctx: &mut C,
        stage: ShaderStage,
        text: &str,
    ) -> Result<ShaderObject<C::Shader>, PipelineError> {
        let handle = ctx
            .create_shader(stage)
            .map_err(PipelineError::creation("shader object"))?;
        ctx.shader_source(handle, text);
        ctx.compile_shader(handle);

        let compile_log = ctx.shader_info_log(handle);
        if !ctx.shader_compile_status(handle) {
            ctx.delete_shader(handle);
            log::error!("{stage} shader compile failed:\n{compile_log}");
            return Err(PipelineError::ShaderCompile { stage, log: compile_log });
        }

        log::debug!("compiled {stage} shader {handle:?}");
        Ok(ShaderObject { stage, handle, compile_log })
    }

    pub fn compile_source<C: GraphicsContext>(
        ctx: &mut C,
        source: &ShaderSource,
    ) -> Result<ShaderObject<C::Shader>, PipelineError> {
        Self::compile(ctx, source.stage(), source.text())
    }
}
