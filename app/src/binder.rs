//! Decides which materials of a renderer get protected and drives the shader
//! patcher and the vertex encoder for them.

use std::collections::BTreeSet;

use shroud_core::asset;
use shroud_core::encoder::{EncodeInput, EncodeReport, OffsetSampler, VertexEncoder};
use shroud_core::material::{Material, MaterialSlot, ShaderRef};
use shroud_core::mesh::Mesh;
use shroud_shader::{ShaderCapabilities, ShaderPatcher};
use shroud_vfs::AssetStore;

use crate::context::ProtectContext;
use crate::report::{MeshOutcome, MeshStatus, ShaderOutcome, ShaderStatus};
use crate::scene::{protected_mesh_path, RendererEntry};

/// Probe for shaders that must be locked (baked to a fixed variant) before
/// their source can be patched.
pub trait ShaderLocker {
    fn can_lock(&self, material: &Material) -> bool;
    fn is_locked(&self, material: &Material) -> bool;
    /// Lock or unlock `material`. Returns whether the state changed.
    fn set_locked(&self, material: &mut Material, locked: bool) -> bool;
}

impl<T: ShaderLocker + ?Sized> ShaderLocker for &T {
    fn can_lock(&self, material: &Material) -> bool {
        (**self).can_lock(material)
    }

    fn is_locked(&self, material: &Material) -> bool {
        (**self).is_locked(material)
    }

    fn set_locked(&self, material: &mut Material, locked: bool) -> bool {
        (**self).set_locked(material, locked)
    }
}

/// For hosts without lockable shaders.
pub struct NoLocker;

impl ShaderLocker for NoLocker {
    fn can_lock(&self, _material: &Material) -> bool {
        false
    }

    fn is_locked(&self, _material: &Material) -> bool {
        false
    }

    fn set_locked(&self, _material: &mut Material, _locked: bool) -> bool {
        false
    }
}

/// Key material and output locations shared by every renderer of a run.
#[derive(Debug, Clone, Copy)]
pub struct BindOptions<'a> {
    /// Source of the generated decode support file.
    pub decode_source: &'a str,
    pub weights: &'a [f32],
    /// Asset paths of materials never to protect.
    pub ignored: &'a BTreeSet<String>,
    /// Asset directory encoded meshes are saved into.
    pub output_dir: &'a str,
}

pub struct MaterialBinder<'a, S> {
    store: &'a dyn AssetStore,
    capabilities: &'a ShaderCapabilities,
    locker: &'a dyn ShaderLocker,
    options: BindOptions<'a>,
    encoder: VertexEncoder<S>,
}

impl<'a, S: OffsetSampler> MaterialBinder<'a, S> {
    pub fn new(
        store: &'a dyn AssetStore,
        capabilities: &'a ShaderCapabilities,
        locker: &'a dyn ShaderLocker,
        options: BindOptions<'a>,
        encoder: VertexEncoder<S>,
    ) -> Self {
        Self {
            store,
            capabilities,
            locker,
            options,
            encoder,
        }
    }

    /// Protect the materials of `renderer` and, if any of them ends up
    /// protected, encode its mesh.
    ///
    /// The rebound renderer is appended to the context.
    pub fn bind_renderer(&mut self, ctx: &mut ProtectContext, renderer: &RendererEntry) {
        if renderer.cloth {
            ctx.audit
                .warn(format!("Ignoring {}: cloth simulation found", renderer.name));
            self.skip_renderer(ctx, renderer, "cloth simulation");
            return;
        }
        if let Some(mesh) = renderer.mesh.as_deref() {
            if !asset::is_supported_source(Some(mesh)) {
                ctx.audit.warn(format!(
                    "Ignoring {}: mesh {mesh} is built in or has no asset",
                    renderer.name
                ));
                self.skip_renderer(ctx, renderer, "unsupported mesh asset");
                return;
            }
        }

        let mut materials = Vec::with_capacity(renderer.materials.len());
        for (slot, material) in renderer.materials.iter().enumerate() {
            match material {
                Some(path) => materials.push(path.clone()),
                None => ctx.audit.warn(format!(
                    "{}: material slot {slot} is empty, removing it",
                    renderer.name
                )),
            }
        }

        let protected = self.bind_materials(ctx, &materials);

        let mut mesh_out = renderer.mesh.clone();
        if let Some(mesh) = renderer.mesh.as_deref() {
            let status = if protected {
                self.encode_mesh(ctx, mesh, &materials)
            } else {
                ctx.audit.warn(format!(
                    "Ignoring encode on {}: no materials protected",
                    renderer.name
                ));
                MeshStatus::Skipped("no protected materials".into())
            };
            if let MeshStatus::Encoded { output, .. } | MeshStatus::Reused { output } = &status {
                mesh_out = Some(output.clone());
            }
            ctx.report.meshes.push(MeshOutcome {
                renderer: renderer.name.clone(),
                mesh: Some(mesh.to_owned()),
                status,
            });
        }

        ctx.rebound.push(RendererEntry {
            name: renderer.name.clone(),
            mesh: mesh_out,
            materials: materials.into_iter().map(Some).collect(),
            cloth: false,
        });
    }

    /// Protect every eligible material in `paths`.
    ///
    /// Returns whether at least one of them is protected afterwards, including
    /// materials that already were.
    pub fn bind_materials(&mut self, ctx: &mut ProtectContext, paths: &[String]) -> bool {
        let loaded: Vec<&String> = paths
            .iter()
            .filter(|path| self.load_material(ctx, path))
            .collect();

        self.lock_materials(ctx, &loaded);

        let mut protected = false;
        for path in loaded {
            protected |= self.protect_material(ctx, path);
        }
        protected
    }

    fn skip_renderer(&self, ctx: &mut ProtectContext, renderer: &RendererEntry, reason: &str) {
        ctx.report.meshes.push(MeshOutcome {
            renderer: renderer.name.clone(),
            mesh: renderer.mesh.clone(),
            status: MeshStatus::Skipped(reason.to_owned()),
        });
        ctx.rebound.push(renderer.clone());
    }

    fn load_material(&self, ctx: &mut ProtectContext, path: &str) -> bool {
        if ctx.materials.contains_key(path) {
            return true;
        }
        let loaded = self
            .store
            .read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Material::from_json(&text).map_err(|e| e.to_string()));
        match loaded {
            Ok(material) => {
                ctx.materials.insert(path.to_owned(), material);
                true
            }
            Err(e) => {
                ctx.audit.error(format!("Failed to load material {path}: {e}"));
                ctx.report.shaders.push(ShaderOutcome {
                    material: path.to_owned(),
                    status: ShaderStatus::Failed(e),
                });
                false
            }
        }
    }

    fn is_candidate(&self, path: &str, material: &Material) -> bool {
        !material.is_protected() && !self.options.ignored.contains(path)
    }

    /// Lock every lockable candidate that is not locked yet.
    fn lock_materials(&self, ctx: &mut ProtectContext, paths: &[&String]) {
        for path in paths {
            let Some(material) = ctx.materials.get_mut(path.as_str()) else {
                continue;
            };
            if !self.is_candidate(path, material)
                || !self.locker.can_lock(material)
                || self.locker.is_locked(material)
            {
                continue;
            }
            if self.locker.set_locked(material, true) {
                ctx.audit.info(format!("Locked {path} before patching"));
                let saved = material.to_json().map_err(|e| e.to_string()).and_then(|json| {
                    self.store
                        .write(path, json.into_bytes())
                        .map_err(|e| e.to_string())
                });
                if let Err(e) = saved {
                    ctx.audit.error(format!("Failed to save locked {path}: {e}"));
                }
            }
        }
    }

    fn protect_material(&self, ctx: &mut ProtectContext, path: &str) -> bool {
        let Some(material) = ctx.materials.get(path).cloned() else {
            return false;
        };
        let status = self.material_status(ctx, path, material);
        let protected = matches!(
            status,
            ShaderStatus::Protected { .. } | ShaderStatus::Reused { .. } | ShaderStatus::AlreadyProtected
        );
        ctx.report.shaders.push(ShaderOutcome {
            material: path.to_owned(),
            status,
        });
        protected
    }

    fn material_status(
        &self,
        ctx: &mut ProtectContext,
        path: &str,
        mut material: Material,
    ) -> ShaderStatus {
        if material.is_protected() {
            return ShaderStatus::AlreadyProtected;
        }
        let Some(rules) = self.capabilities.lookup(&material.shader.name) else {
            log::debug!("{path}: shader '{}' is not patchable", material.shader.name);
            return ShaderStatus::Skipped("shader not protection-capable".into());
        };
        ctx.audit.info(format!(
            "Found supported material {path} with shader {}",
            material.shader.name
        ));
        if self.options.ignored.contains(path) {
            ctx.audit.warn(format!("{path} is ignored, skipping"));
            return ShaderStatus::Skipped("ignored".into());
        }
        if !asset::is_supported_source(Some(&material.shader.path)) {
            ctx.audit.warn(format!(
                "Not patching shader {}: it is not a project asset",
                material.shader.name
            ));
            return ShaderStatus::Skipped("built-in shader".into());
        }
        if self.locker.can_lock(&material) && !self.locker.is_locked(&material) {
            ctx.audit.error(format!(
                "{path}: shader {} can be locked but is not, skipping",
                material.shader.name
            ));
            return ShaderStatus::Skipped("shader not locked".into());
        }

        let source = material.shader.path.clone();
        let status = match ctx.patched.get(&source) {
            Some(Ok(shader)) => ShaderStatus::Reused {
                shader: shader.clone(),
            },
            Some(Err(e)) => ShaderStatus::Failed(e.clone()),
            None => {
                let patcher = ShaderPatcher::new(self.store, self.options.decode_source);
                match patcher.patch(&source, rules) {
                    Ok(patched) => {
                        for warning in &patched.warnings {
                            ctx.audit.warn(warning.clone());
                        }
                        for miss in &patched.misses {
                            ctx.audit.warn(format!(
                                "{}: {} rule matched nothing",
                                miss.file,
                                miss.category.label()
                            ));
                        }
                        ctx.audit
                            .info(format!("Patched {source} into {}", patched.shader.path));
                        ctx.patched.insert(source, Ok(patched.shader.clone()));
                        ShaderStatus::Protected {
                            shader: patched.shader,
                            rule_misses: patched.misses.len(),
                            warnings: patched.warnings,
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        ctx.audit.error(format!("Failed to patch {source}: {reason}"));
                        ctx.patched.insert(source, Err(reason.clone()));
                        ShaderStatus::Failed(reason)
                    }
                }
            }
        };

        let shader = match &status {
            ShaderStatus::Protected { shader, .. } | ShaderStatus::Reused { shader } => {
                shader.clone()
            }
            _ => return status,
        };
        match self.rebind_material(path, &mut material, shader) {
            Ok(()) => {
                ctx.audit.info(format!(
                    "Assigned {} to {path} with a hidden fallback",
                    material.shader.name
                ));
                ctx.materials.insert(path.to_owned(), material);
                status
            }
            Err(e) => {
                ctx.audit.error(format!("Failed to save {path}: {e}"));
                ShaderStatus::Failed(e)
            }
        }
    }

    fn rebind_material(
        &self,
        path: &str,
        material: &mut Material,
        shader: ShaderRef,
    ) -> Result<(), String> {
        material.bind_protected(shader);
        let json = material.to_json().map_err(|e| e.to_string())?;
        self.store
            .write(path, json.into_bytes())
            .map_err(|e| e.to_string())
    }

    fn encode_mesh(
        &mut self,
        ctx: &mut ProtectContext,
        mesh_path: &str,
        materials: &[String],
    ) -> MeshStatus {
        match ctx.encoded.get(mesh_path) {
            Some(Ok(output)) => {
                return MeshStatus::Reused {
                    output: output.clone(),
                }
            }
            Some(Err(e)) => return MeshStatus::Failed(e.clone()),
            None => {}
        }

        let result = self.encode_fresh(ctx, mesh_path, materials);
        ctx.encoded.insert(
            mesh_path.to_owned(),
            result.as_ref().map(|(output, _)| output.clone()).map_err(Clone::clone),
        );
        match result {
            Ok((output, report)) => MeshStatus::Encoded { output, report },
            Err(e) => {
                ctx.audit.error(format!("Failed to encode {mesh_path}: {e}"));
                MeshStatus::Failed(e)
            }
        }
    }

    fn encode_fresh(
        &mut self,
        ctx: &mut ProtectContext,
        mesh_path: &str,
        materials: &[String],
    ) -> Result<(String, EncodeReport), String> {
        let text = self
            .store
            .read_to_string(mesh_path)
            .map_err(|e| e.to_string())?;
        let mesh = Mesh::from_json(&text).map_err(|e| e.to_string())?;

        let slots: Vec<Option<MaterialSlot<'_>>> = materials
            .iter()
            .map(|path| {
                ctx.materials
                    .get(path)
                    .map(|material| MaterialSlot::new(path, material))
            })
            .collect();
        let encoded = self
            .encoder
            .encode(&EncodeInput {
                mesh: &mesh,
                source_path: Some(mesh_path),
                slots: &slots,
                weights: self.options.weights,
                ignored: self.options.ignored,
            })
            .map_err(|e| e.to_string())?;

        let report = encoded.report;
        if report.has_anomalies() {
            ctx.audit.warn(format!(
                "{mesh_path}: {} orphan vertices, {} out of range indices, {} clamped and {} malformed submeshes",
                report.orphan_vertices.len(),
                report.out_of_range.len(),
                report.clamped_submeshes.len(),
                report.malformed_submeshes.len()
            ));
        }

        let output = protected_mesh_path(self.options.output_dir, mesh_path);
        let json = encoded.mesh.to_json().map_err(|e| e.to_string())?;
        self.store
            .write(&output, json.into_bytes())
            .map_err(|e| e.to_string())?;
        ctx.audit.info(format!(
            "Encoded {mesh_path} into {output} ({} vertices displaced)",
            report.displaced
        ));
        Ok((output, report))
    }
}
