//! Device resources the passes share: one program per shading model,
//! the built-in meshes and the fallback textures.

use crate::assets::{MeshHandle, ProgramHandle, TextureHandle};

/// One program per pass family.
///
/// | Program      | Uniforms                                                          |
/// |--------------|-------------------------------------------------------------------|
/// | `lit`        | transforms, `viewPos`, `material.*`, `dirLight.*`, `pointLights[i].*`, `pointLightCount` |
/// | `flat_color` | transforms, `lightColor`                                          |
/// | `alpha`      | transforms, `texture1`, `alphaCutoff`                             |
/// | `reflection` | transforms, `cameraPos`, `skybox`                                 |
/// | `skybox`     | `view` (rotation only), `projection`, `skybox`                    |
/// | `screen`     | `screenTexture`, `effect`                                         |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSet {
    pub lit: ProgramHandle,
    pub flat_color: ProgramHandle,
    pub alpha: ProgramHandle,
    pub reflection: ProgramHandle,
    pub skybox: ProgramHandle,
    pub screen: ProgramHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinMeshes {
    /// Inward-facing ±1 cube.
    pub skybox_cube: MeshHandle,
    /// NDC quad covering the viewport.
    pub screen_quad: MeshHandle,
    /// Drawn at each point light when markers are enabled.
    pub light_marker: MeshHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResources {
    pub programs: ProgramSet,
    pub meshes: BuiltinMeshes,
    /// Bound in place of an absent diffuse texture.
    pub fallback_texture: TextureHandle,
    /// 1×1 black; bound for an absent specular map.
    pub blank_texture: TextureHandle,
    /// Bound when the scene has no environment cubemap.
    pub fallback_cubemap: TextureHandle,
}
