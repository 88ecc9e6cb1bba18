//! Shader compilation and program linking.
//!
//! Every constructor here either returns a usable object or an error with
//! the driver's diagnostic log; partially built context objects are always
//! released before the error is returned.

mod error;
mod program;
mod shader;

pub use error::PipelineError;
pub use program::{ProgramLinker, ProgramObject};
pub use shader::{ShaderCompiler, ShaderObject, ShaderSource};
