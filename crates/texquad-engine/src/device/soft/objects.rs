//! Object tables of the reference context: shaders, programs, textures.

use std::rc::Rc;

use texquad_glsl::{CheckedShader, Stage, Type, Variable};

use crate::device::types::{PixelFormat, TextureFilter, TextureWrap};

/// Minimum `MAX_VERTEX_ATTRIBS` guaranteed by GLES 2.0.
pub const MAX_VERTEX_ATTRIBS: usize = 8;
/// Minimum `MAX_COMBINED_TEXTURE_IMAGE_UNITS` guaranteed by GLES 2.0.
pub const MAX_TEXTURE_UNITS: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftShader(pub(super) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftProgram(pub(super) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftBuffer(pub(super) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftTexture(pub(super) u32);

/// Uniform location: the owning program plus the uniform's slot index.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SoftUniformLocation {
    pub(super) program: SoftProgram,
    pub(super) index: usize,
}

// ── shaders ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(super) struct ShaderSlot {
    pub stage: Stage,
    pub source: String,
    pub compiled: Option<Rc<CheckedShader>>,
    pub info_log: String,
    /// Deleted while attached; freed once detached from every program.
    pub delete_pending: bool,
}

impl ShaderSlot {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            source: String::new(),
            compiled: None,
            info_log: String::new(),
            delete_pending: false,
        }
    }

    pub fn compile(&mut self) {
        match texquad_glsl::compile(&self.source, self.stage) {
            Ok(shader) => {
                self.compiled = Some(Rc::new(shader));
                self.info_log.clear();
            }
            Err(err) => {
                self.compiled = None;
                self.info_log = err.to_info_log_line();
            }
        }
    }
}

// ── programs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ActiveAttribute {
    pub name: String,
    pub ty: Type,
    pub location: u32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(super) enum UniformValue {
    Float([f32; 4]),
    Sampler(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ActiveUniform {
    pub name: String,
    pub ty: Type,
}

/// Result of a successful link.
#[derive(Debug)]
pub(super) struct LinkedProgram {
    pub vertex: Rc<CheckedShader>,
    pub fragment: Rc<CheckedShader>,
    pub attributes: Vec<ActiveAttribute>,
    pub uniforms: Vec<ActiveUniform>,
    /// Varyings written by the vertex stage and declared by the fragment stage.
    pub varyings: Vec<Variable>,
}

#[derive(Debug, Default)]
pub(super) struct ProgramSlot {
    pub attached: Vec<SoftShader>,
    pub linked: Option<LinkedProgram>,
    pub uniform_values: Vec<UniformValue>,
    pub info_log: String,
    /// Deleted while current; freed once another program is made current.
    pub delete_pending: bool,
}

impl ProgramSlot {
    pub fn install(&mut self, linked: LinkedProgram) {
        self.uniform_values = linked
            .uniforms
            .iter()
            .map(|u| match u.ty {
                Type::Sampler2D => UniformValue::Sampler(0),
                _ => UniformValue::Float([0.0; 4]),
            })
            .collect();
        self.linked = Some(linked);
        self.info_log.clear();
    }

    pub fn fail(&mut self, log: String) {
        self.linked = None;
        self.uniform_values.clear();
        self.info_log = log;
    }
}

/// Links one vertex and one fragment stage.
///
/// `stages` holds, per attached shader, its stage and its compiled form (if
/// it compiled). Errors are returned as info-log text.
pub(super) fn link(stages: &[(Stage, Option<Rc<CheckedShader>>)]) -> Result<LinkedProgram, String> {
    let pick = |stage: Stage| -> Result<Rc<CheckedShader>, String> {
        let mut matching = stages.iter().filter(|(s, _)| *s == stage);
        match (matching.next(), matching.next()) {
            (Some((_, Some(shader))), None) => Ok(Rc::clone(shader)),
            (Some((_, None)), None) => Err(format!("Link Error: the attached {stage} shader is not compiled")),
            (None, _) => Err(format!("Link Error: no {stage} shader attached")),
            (Some(_), Some(_)) => Err(format!("Link Error: more than one {stage} shader attached")),
        }
    };
    let vertex = pick(Stage::Vertex)?;
    let fragment = pick(Stage::Fragment)?;

    for shader in [&vertex, &fragment] {
        if !shader.interface.has_main {
            return Err(format!("Link Error: missing entry point 'main' in {} shader", shader.stage()));
        }
    }

    let vs = &vertex.interface;
    let fs = &fragment.interface;

    let mut varyings = Vec::new();
    for v in &fs.varyings {
        match vs.varying(&v.name) {
            Some(out) if out.ty == v.ty => varyings.push(v.clone()),
            Some(out) => {
                return Err(format!(
                    "Link Error: types of varying '{}' differ between stages ({} vs {})",
                    v.name, out.ty, v.ty
                ));
            }
            None if fs.is_referenced(&v.name) => {
                return Err(format!(
                    "Link Error: varying '{}' is read by the fragment shader but not declared by the vertex shader",
                    v.name
                ));
            }
            None => {}
        }
    }

    let mut uniforms: Vec<ActiveUniform> = Vec::new();
    for (stage_uniforms, iface) in [(&vs.uniforms, vs), (&fs.uniforms, fs)] {
        for u in stage_uniforms {
            if let Some(existing) = uniforms.iter().find(|a| a.name == u.name) {
                if existing.ty != u.ty {
                    return Err(format!(
                        "Link Error: uniform '{}' is declared with different types ({} vs {})",
                        u.name, existing.ty, u.ty
                    ));
                }
                continue;
            }
            let other = if std::ptr::eq(iface, vs) { fs } else { vs };
            if let Some(mismatch) = other.uniform(&u.name).filter(|o| o.ty != u.ty) {
                return Err(format!(
                    "Link Error: uniform '{}' is declared with different types ({} vs {})",
                    u.name, u.ty, mismatch.ty
                ));
            }
            if iface.is_referenced(&u.name) || other.is_referenced(&u.name) {
                uniforms.push(ActiveUniform { name: u.name.clone(), ty: u.ty });
            }
        }
    }

    let attributes: Vec<ActiveAttribute> = vs
        .attributes
        .iter()
        .filter(|a| vs.is_referenced(&a.name))
        .enumerate()
        .map(|(location, a)| ActiveAttribute {
            name: a.name.clone(),
            ty: a.ty,
            location: location as u32,
        })
        .collect();
    if attributes.len() > MAX_VERTEX_ATTRIBS {
        return Err(format!(
            "Link Error: too many active attributes ({} > {MAX_VERTEX_ATTRIBS})",
            attributes.len()
        ));
    }

    Ok(LinkedProgram { vertex, fragment, attributes, uniforms, varyings })
}

// ── textures ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(super) struct TextureSlot {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Level-0 texels, row 0 at `t = 0`.
    pub texels: Vec<u8>,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for TextureSlot {
    /// GL defaults: repeat wrapping, mipmapped minification, no image.
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: PixelFormat::Rgba8,
            texels: Vec::new(),
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            min_filter: TextureFilter::NearestMipmapLinear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

impl TextureSlot {
    /// A texture is complete when level 0 exists and the minification filter
    /// does not require levels that were never uploaded.
    pub fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.min_filter.uses_mipmaps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(src: &str, stage: Stage) -> (Stage, Option<Rc<CheckedShader>>) {
        (stage, Some(Rc::new(texquad_glsl::compile(src, stage).unwrap())))
    }

    const VS: &str = "attribute vec2 a_pos; attribute vec4 a_unused; varying vec4 v_color;
        void main() { v_color = vec4(1.0); gl_Position = vec4(a_pos, 0.0, 1.0); }";
    const FS: &str = "precision mediump float; varying vec4 v_color;
        void main() { gl_FragColor = v_color; }";

    #[test]
    fn links_and_assigns_locations_to_active_attributes_only() {
        let linked = link(&[compiled(VS, Stage::Vertex), compiled(FS, Stage::Fragment)]).unwrap();
        assert_eq!(linked.attributes.len(), 1);
        assert_eq!(linked.attributes[0].name, "a_pos");
        assert_eq!(linked.attributes[0].location, 0);
        assert_eq!(linked.varyings.len(), 1);
    }

    #[test]
    fn missing_fragment_stage() {
        let err = link(&[compiled(VS, Stage::Vertex)]).unwrap_err();
        assert!(err.contains("no fragment shader"), "{err}");
    }

    #[test]
    fn uncompiled_stage_fails() {
        let err = link(&[compiled(VS, Stage::Vertex), (Stage::Fragment, None)]).unwrap_err();
        assert!(err.contains("not compiled"), "{err}");
    }

    #[test]
    fn two_vertex_stages_fail() {
        let err = link(&[
            compiled(VS, Stage::Vertex),
            compiled(VS, Stage::Vertex),
            compiled(FS, Stage::Fragment),
        ])
        .unwrap_err();
        assert!(err.contains("more than one vertex"), "{err}");
    }

    #[test]
    fn undeclared_varying_fails() {
        let fs = "precision mediump float; varying vec2 v_uv;
            void main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }";
        let err = link(&[compiled(VS, Stage::Vertex), compiled(fs, Stage::Fragment)]).unwrap_err();
        assert!(err.contains("v_uv"), "{err}");
    }

    #[test]
    fn varying_type_mismatch_fails() {
        let fs = "precision mediump float; varying vec3 v_color;
            void main() { gl_FragColor = vec4(v_color, 1.0); }";
        assert!(link(&[compiled(VS, Stage::Vertex), compiled(fs, Stage::Fragment)]).is_err());
    }

    #[test]
    fn uniform_type_mismatch_fails() {
        let vs = "attribute vec2 a_pos; uniform vec4 u_tint; varying vec4 v_color;
            void main() { v_color = u_tint; gl_Position = vec4(a_pos, 0.0, 1.0); }";
        let fs = "precision mediump float; uniform vec2 u_tint; varying vec4 v_color;
            void main() { gl_FragColor = v_color + vec4(u_tint, 0.0, 0.0); }";
        let err = link(&[compiled(vs, Stage::Vertex), compiled(fs, Stage::Fragment)]).unwrap_err();
        assert!(err.contains("uniform 'u_tint'"), "{err}");
        assert!(err.contains("vec4 vs vec2"), "{err}");
    }

    #[test]
    fn missing_main_fails_at_link_time() {
        let fs = "precision mediump float; varying vec4 v_color;";
        let err = link(&[compiled(VS, Stage::Vertex), compiled(fs, Stage::Fragment)]).unwrap_err();
        assert!(err.contains("main"), "{err}");
    }

    #[test]
    fn default_texture_is_incomplete() {
        let mut tex = TextureSlot::default();
        assert!(!tex.is_complete());
        tex.width = 1;
        tex.height = 1;
        assert!(!tex.is_complete(), "mipmapped min filter without mips");
        tex.min_filter = TextureFilter::Nearest;
        assert!(tex.is_complete());
    }
}
