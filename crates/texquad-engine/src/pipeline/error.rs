use crate::device::ShaderStage;

/// Failures while building GPU objects.
///
/// Compile and link errors are static defects in shader source: they carry
/// the driver's diagnostic log so the source can be fixed, and there is no
/// retry path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link:\n{log}")]
    ProgramLink { log: String },

    /// The context could not allocate an object.
    #[error("failed to create {what}: {reason}")]
    ObjectCreation { what: &'static str, reason: String },
}

impl PipelineError {
    pub(crate) fn creation(what: &'static str) -> impl FnOnce(String) -> Self {
        move |reason| {
            log::error!("failed to create {what}: {reason}");
            PipelineError::ObjectCreation { what, reason }
        }
    }
}
