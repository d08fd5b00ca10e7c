use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gpu::{
    FixedFunctionState, GpuBackend, GpuError, PipelineDesc, PipelineHandle, RenderTargetFormats,
    ShaderCode, ShaderFlavor, ShaderModuleDesc, ShaderStage,
};

use super::push::PushConstants;

/// Entry point used for every shader stage.
pub const ENTRY_POINT: &str = "main";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "unknown shader suffix on {0} (expected *.vert.spv, *.frag.spv, *.vert.wgsl or *.frag.wgsl)"
    )]
    UnknownSuffix(PathBuf),

    #[error("failed to read shader {path}")]
    ReadShader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader {0} is not valid UTF-8")]
    InvalidText(PathBuf),

    #[error("no shader stages configured")]
    NoStages,

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A shader file read from disk with its inferred stage.
#[derive(Debug, Clone)]
pub struct LoadedShader {
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub code: ShaderCode,
}

/// Maps every file to its stage, failing before any file is read.
pub fn classify_shaders(files: &[PathBuf]) -> Result<Vec<(ShaderStage, ShaderFlavor)>, PipelineError> {
    if files.is_empty() {
        return Err(PipelineError::NoStages);
    }
    files
        .iter()
        .map(|path| {
            ShaderStage::from_path(path).ok_or_else(|| PipelineError::UnknownSuffix(path.clone()))
        })
        .collect()
}

/// Reads every shader file. Suffixes are validated first, so a naming error
/// is reported even when an earlier file is also unreadable.
pub fn load_shaders(files: &[PathBuf]) -> Result<Vec<LoadedShader>, PipelineError> {
    let kinds = classify_shaders(files)?;
    files
        .iter()
        .zip(kinds)
        .map(|(path, (stage, flavor))| {
            let code = read_code(path, flavor)?;
            Ok(LoadedShader {
                path: path.clone(),
                stage,
                code,
            })
        })
        .collect()
}

fn read_code(path: &Path, flavor: ShaderFlavor) -> Result<ShaderCode, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::ReadShader {
        path: path.to_path_buf(),
        source,
    })?;
    match flavor {
        ShaderFlavor::SpirV => Ok(ShaderCode::SpirV(bytes)),
        ShaderFlavor::Wgsl => String::from_utf8(bytes)
            .map(ShaderCode::Wgsl)
            .map_err(|_| PipelineError::InvalidText(path.to_path_buf())),
    }
}

/// A built graphics pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Pipeline {
    pub handle: PipelineHandle,
    pub formats: RenderTargetFormats,
    /// Increments on every rebuild; 0 for the startup pipeline.
    pub generation: u32,
}

/// Builds the cube pipeline from shader files.
///
/// State is fixed: no vertex input (vertices are fetched through the
/// push-constant address), triangle list, one dynamic viewport, solid fill,
/// single sample, depth test+write, blending off.
pub fn build_pipeline(
    backend: &mut impl GpuBackend,
    files: &[PathBuf],
    formats: RenderTargetFormats,
) -> Result<PipelineHandle, PipelineError> {
    let shaders = load_shaders(files)?;

    let labels: Vec<String> = shaders.iter().map(|s| s.path.display().to_string()).collect();
    let stages: Vec<ShaderModuleDesc<'_>> = shaders
        .iter()
        .zip(&labels)
        .map(|(s, label)| ShaderModuleDesc {
            label,
            stage: s.stage,
            entry_point: ENTRY_POINT,
            code: &s.code,
        })
        .collect();

    let handle = backend.create_pipeline(&PipelineDesc {
        label: "cube pipeline",
        stages: &stages,
        targets: formats,
        state: FixedFunctionState::default(),
        push_constant_size: PushConstants::SIZE as u32,
    })?;
    Ok(handle)
}

/// Owns the live pipeline and rebuilds it on request.
///
/// The outgoing pipeline is destroyed only after the device has been
/// drained, and no accessor hands it out afterwards.
#[derive(Debug)]
pub struct PipelineManager {
    files: Vec<PathBuf>,
    current: Pipeline,
}

impl PipelineManager {
    pub fn build(
        backend: &mut impl GpuBackend,
        files: Vec<PathBuf>,
        formats: RenderTargetFormats,
    ) -> Result<Self, PipelineError> {
        let handle = build_pipeline(backend, &files, formats)?;
        log::info!("built cube pipeline from {} shader stage(s)", files.len());
        Ok(Self {
            files,
            current: Pipeline {
                handle,
                formats,
                generation: 0,
            },
        })
    }

    #[inline]
    pub fn current(&self) -> &Pipeline {
        &self.current
    }

    pub fn shader_files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Drains the device, builds a replacement, swaps it in and destroys the
    /// previous pipeline.
    ///
    /// On error the previous pipeline stays current and alive; callers treat
    /// the error as fatal.
    pub fn reload(&mut self, backend: &mut impl GpuBackend) -> Result<&Pipeline, PipelineError> {
        backend.drain()?;

        let handle = build_pipeline(backend, &self.files, self.current.formats)?;
        let next = Pipeline {
            handle,
            formats: self.current.formats,
            generation: self.current.generation.wrapping_add(1),
        };
        let previous = std::mem::replace(&mut self.current, next);
        backend.destroy_pipeline(previous.handle);

        log::info!("reloaded cube pipeline (generation {})", self.current.generation);
        Ok(&self.current)
    }

    /// Destroys the live pipeline. The device must already be drained.
    pub fn destroy(self, backend: &mut impl GpuBackend) {
        backend.destroy_pipeline(self.current.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{DeviceEvent, HeadlessBackend, ImageFormat};

    fn formats() -> RenderTargetFormats {
        RenderTargetFormats {
            color: ImageFormat::Bgra8UnormSrgb,
            depth: ImageFormat::Depth32Float,
        }
    }

    fn shader_dir() -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let vert = dir.path().join("cube.vert.wgsl");
        let frag = dir.path().join("cube.frag.spv");
        std::fs::write(&vert, "@vertex fn main() {}").unwrap();
        std::fs::write(&frag, [0x03, 0x02, 0x23, 0x07]).unwrap();
        (dir, vec![vert, frag])
    }

    #[test]
    fn loads_stages_by_suffix() {
        let (_dir, files) = shader_dir();
        let shaders = load_shaders(&files).unwrap();
        assert_eq!(shaders[0].stage, ShaderStage::Vertex);
        assert!(matches!(shaders[0].code, ShaderCode::Wgsl(_)));
        assert_eq!(shaders[1].stage, ShaderStage::Fragment);
        assert_eq!(shaders[1].code, ShaderCode::SpirV(vec![0x03, 0x02, 0x23, 0x07]));
    }

    #[test]
    fn unknown_suffix_fails_before_touching_the_backend() {
        let (dir, mut files) = shader_dir();
        files.push(dir.path().join("cube.comp.spv"));

        let mut backend = HeadlessBackend::new();
        let err = PipelineManager::build(&mut backend, files, formats()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownSuffix(p) if p.ends_with("cube.comp.spv")));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn suffix_is_checked_before_reading() {
        let files = vec![PathBuf::from("/missing/cube.vert.spv"), PathBuf::from("cube.geom")];
        assert!(matches!(load_shaders(&files), Err(PipelineError::UnknownSuffix(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let files = vec![PathBuf::from("/definitely/missing/cube.vert.spv")];
        assert!(matches!(load_shaders(&files), Err(PipelineError::ReadShader { .. })));
    }

    #[test]
    fn empty_shader_list_is_rejected() {
        assert!(matches!(load_shaders(&[]), Err(PipelineError::NoStages)));
    }

    #[test]
    fn reload_drains_before_replacing() {
        let (_dir, files) = shader_dir();
        let mut backend = HeadlessBackend::new();
        let mut pipelines = PipelineManager::build(&mut backend, files.clone(), formats()).unwrap();
        assert_eq!(pipelines.shader_files(), files.as_slice());
        let old = pipelines.current().handle;
        backend.clear_journal();

        let new = pipelines.reload(&mut backend).unwrap().handle;

        assert_ne!(old, new);
        assert_eq!(
            backend.journal(),
            &[
                DeviceEvent::Drain,
                DeviceEvent::CreatePipeline(new),
                DeviceEvent::DestroyPipeline(old),
            ]
        );
        assert!(!backend.is_pipeline_alive(old));
        assert_eq!(pipelines.current().generation, 1);
    }

    #[test]
    fn failed_reload_keeps_the_previous_pipeline() {
        let (dir, files) = shader_dir();
        let mut backend = HeadlessBackend::new();
        let mut pipelines = PipelineManager::build(&mut backend, files, formats()).unwrap();
        let old = pipelines.current().handle;

        drop(dir);
        let err = pipelines.reload(&mut backend).unwrap_err();
        assert!(matches!(err, PipelineError::ReadShader { .. }));
        assert_eq!(pipelines.current().handle, old);
        assert!(backend.is_pipeline_alive(old));
    }
}
