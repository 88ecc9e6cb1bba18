use crate::device::{GraphicsContext, ShaderStage};

use super::error::PipelineError;
use super::shader::{ShaderCompiler, ShaderObject, ShaderSource};

/// A linked program: one vertex and one fragment stage that compiled and
/// linked successfully. Only values of this type are ever made current.
#[must_use = "a linked program must be released"]
#[derive(Debug)]
pub struct ProgramObject<P> {
    handle: P,
}

impl<P: Copy> ProgramObject<P> {
    #[inline]
    pub fn handle(&self) -> P {
        self.handle
    }

    pub fn release<C: GraphicsContext<Program = P>>(self, ctx: &mut C) {
        ctx.delete_program(self.handle);
    }
}

pub struct ProgramLinker;

impl ProgramLinker {
    /// Links `vertex` and `fragment` into a program.
    ///
    /// Both shader objects are consumed: they are detached and released
    /// whether or not the link succeeds. A failed link also releases the
    /// program, so only the error escapes.
    pub fn link<C: GraphicsContext>(
        ctx: &mut C,
        vertex: ShaderObject<C::Shader>,
        fragment: ShaderObject<C::Shader>,
    ) -> Result<ProgramObject<C::Program>, PipelineError> {
        if vertex.stage() != ShaderStage::Vertex || fragment.stage() != ShaderStage::Fragment {
            let log = format!(
                "expected a vertex and a fragment shader, got {} and {}",
                vertex.stage(),
                fragment.stage()
            );
            vertex.release(ctx);
            fragment.release(ctx);
            log::error!("program link failed: {log}");
            return Err(PipelineError::ProgramLink { log });
        }

        let program = match ctx.create_program() {
            Ok(program) => program,
            Err(reason) => {
                vertex.release(ctx);
                fragment.release(ctx);
                return Err(PipelineError::creation("program object")(reason));
            }
        };

        let (vs, fs) = (vertex.handle(), fragment.handle());
        ctx.attach_shader(program, vs);
        ctx.attach_shader(program, fs);
        ctx.link_program(program);

        // Shaders are not needed once the link result exists.
        ctx.detach_shader(program, vs);
        ctx.detach_shader(program, fs);
        vertex.release(ctx);
        fragment.release(ctx);

        if !ctx.program_link_status(program) {
            let log = ctx.program_info_log(program);
            ctx.delete_program(program);
            log::error!("program link failed:\n{log}");
            return Err(PipelineError::ProgramLink { log });
        }

        log::debug!("linked program {program:?}");
        Ok(ProgramObject { handle: program })
    }

    /// Compiles both stages and links them.
    ///
    /// A fragment compile failure releases the already compiled vertex
    /// shader; linking is never attempted with a failed stage.
    pub fn build<C: GraphicsContext>(
        ctx: &mut C,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<ProgramObject<C::Program>, PipelineError> {
        let vs = ShaderCompiler::compile_source(ctx, vertex)?;
        let fs = match ShaderCompiler::compile_source(ctx, fragment) {
            Ok(fs) => fs,
            Err(err) => {
                vs.release(ctx);
                return Err(err);
            }
        };
        Self::link(ctx, vs, fs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftContext;

    const VS: &str = "
        attribute vec2 a_position;
        varying vec2 v_uv;
        void main() {
            v_uv = a_position;
            gl_Position = vec4(a_position, 0.0, 1.0);
        }";

    const FS: &str = "
        precision mediump float;
        varying vec2 v_uv;
        void main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }";

    fn assert_no_objects(ctx: &SoftContext) {
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 0);
    }

    #[test]
    fn links_and_releases_shaders() {
        let mut ctx = SoftContext::new(1, 1);
        let program =
            ProgramLinker::build(&mut ctx, &ShaderSource::vertex(VS), &ShaderSource::fragment(FS)).unwrap();
        assert_eq!(ctx.live_shaders(), 0);
        assert_eq!(ctx.live_programs(), 1);

        ctx.use_program(Some(program.handle()));
        assert!(ctx.take_errors().is_empty());
        ctx.use_program(None);

        program.release(&mut ctx);
        assert_no_objects(&ctx);
    }

    #[test]
    fn failed_fragment_releases_the_vertex_stage() {
        let mut ctx = SoftContext::new(1, 1);
        let err = ProgramLinker::build(
            &mut ctx,
            &ShaderSource::vertex(VS),
            &ShaderSource::fragment("void main() { gl_FragColor = ; }"),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ShaderCompile { stage: ShaderStage::Fragment, .. }));
        assert_no_objects(&ctx);
    }

    #[test]
    fn link_failure_releases_everything() {
        let mut ctx = SoftContext::new(1, 1);
        let fs = "precision mediump float; varying vec4 v_color;
            void main() { gl_FragColor = v_color; }";
        let err = ProgramLinker::build(&mut ctx, &ShaderSource::vertex(VS), &ShaderSource::fragment(fs))
            .unwrap_err();
        match err {
            PipelineError::ProgramLink { log } => assert!(log.contains("v_color"), "{log}"),
            other => panic!("unexpected {other}"),
        }
        assert_no_objects(&ctx);
    }

    #[test]
    fn uniform_declared_with_two_types_fails_to_link() {
        let mut ctx = SoftContext::new(1, 1);
        let vs = "attribute vec2 a_position; uniform vec4 u;
            void main() { gl_Position = vec4(a_position, 0.0, 1.0) + u; }";
        let fs = "precision mediump float; uniform vec2 u;
            void main() { gl_FragColor = vec4(u, 0.0, 1.0); }";
        let err = ProgramLinker::build(&mut ctx, &ShaderSource::vertex(vs), &ShaderSource::fragment(fs))
            .unwrap_err();
        match err {
            PipelineError::ProgramLink { log } => assert!(log.contains("uniform 'u'"), "{log}"),
            other => panic!("unexpected {other}"),
        }
        assert_no_objects(&ctx);
    }

    #[test]
    fn swapped_stages_fail_deterministically() {
        let mut ctx = SoftContext::new(1, 1);
        let vs = ShaderCompiler::compile(&mut ctx, ShaderStage::Vertex, VS).unwrap();
        let fs = ShaderCompiler::compile(&mut ctx, ShaderStage::Fragment, FS).unwrap();
        let err = ProgramLinker::link(&mut ctx, fs, vs).unwrap_err();
        assert!(matches!(err, PipelineError::ProgramLink { .. }));
        assert_no_objects(&ctx);
    }

    #[test]
    fn missing_main_is_a_link_error() {
        let mut ctx = SoftContext::new(1, 1);
        let err = ProgramLinker::build(
            &mut ctx,
            &ShaderSource::vertex("attribute vec2 a_position;"),
            &ShaderSource::fragment(FS),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::ProgramLink { .. }));
        assert_no_objects(&ctx);
    }
}
