//! Top-level protection run over a scene manifest.

use std::collections::BTreeSet;

use rand::Rng;
use shroud_core::encoder::{EncodeError, RandomOffsets, VertexEncoder};
use shroud_core::key::{KeyDerivation, KeyError, KeySchedule, KeyVector};
use shroud_shader::decode::decode_fragment;
use shroud_shader::{PatchError, ShaderCapabilities};
use shroud_vfs::{AssetStore, VfsError};

use crate::binder::{BindOptions, MaterialBinder, NoLocker, ShaderLocker};
use crate::config::{ConfigError, ShroudConfig};
use crate::context::ProtectContext;
use crate::keys::{persist_keys, KeyNotifier, KeyStore, NoNotifier};
use crate::report::ProtectReport;
use crate::scene::SceneManifest;

/// Keys shorter than this are flagged as especially weak.
pub const WEAK_KEY_BITS: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ProtectError {
    #[error("cancelled: {free} free parameter bits for a {requested}-bit key")]
    Cancelled { free: usize, requested: usize },
    #[error("missing {0}")]
    MissingComponent(String),
    #[error(transparent)]
    Store(#[from] VfsError),
    #[error("malformed scene manifest {path}: {source}")]
    Manifest {
        path: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The person (or flag) answering questions during a run.
pub trait Operator {
    /// Whether to go on with a `free_bits` key instead of `requested` bits.
    fn confirm_short_key(&self, free_bits: usize, requested: usize) -> bool;
}

/// Answers from a fixed setting, such as a command line flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOperator {
    pub accept_short_key: bool,
}

impl Operator for FixedOperator {
    fn confirm_short_key(&self, _free_bits: usize, _requested: usize) -> bool {
        self.accept_short_key
    }
}

/// Protects every renderer of a scene with a freshly generated key.
pub struct Protector<'a> {
    store: &'a dyn AssetStore,
    config: &'a ShroudConfig,
    capabilities: ShaderCapabilities,
    operator: Box<dyn Operator + 'a>,
    locker: Box<dyn ShaderLocker + 'a>,
    key_stores: Vec<Box<dyn KeyStore + 'a>>,
    notifier: Box<dyn KeyNotifier + 'a>,
}

impl<'a> Protector<'a> {
    pub fn new(store: &'a dyn AssetStore, config: &'a ShroudConfig) -> Self {
        Self {
            store,
            config,
            capabilities: config.capabilities(),
            operator: Box::new(FixedOperator::default()),
            locker: Box::new(NoLocker),
            key_stores: Vec::new(),
            notifier: Box::new(NoNotifier),
        }
    }

    pub fn with_operator(mut self, operator: impl Operator + 'a) -> Self {
        self.operator = Box::new(operator);
        self
    }

    pub fn with_locker(mut self, locker: impl ShaderLocker + 'a) -> Self {
        self.locker = Box::new(locker);
        self
    }

    /// Add a place the key bits are persisted into.
    pub fn with_key_store(mut self, store: impl KeyStore + 'a) -> Self {
        self.key_stores.push(Box::new(store));
        self
    }

    pub fn with_notifier(mut self, notifier: impl KeyNotifier + 'a) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Key length for this run, after checking the parameter budget.
    ///
    /// Nothing has been written when this fails.
    pub fn key_length(&self, manifest: &SceneManifest) -> Result<usize, ProtectError> {
        self.config.validate()?;
        let budget = manifest
            .budget
            .ok_or_else(|| ProtectError::MissingComponent("parameter budget".into()))?;
        let requested = self.config.protect.key_length;
        let free = budget.free();
        if free >= requested {
            return Ok(requested);
        }
        if free == 0 || !self.operator.confirm_short_key(free, requested) {
            return Err(ProtectError::Cancelled { free, requested });
        }
        if free < WEAK_KEY_BITS {
            log::warn!("Using a {free}-bit key, this is especially insecure");
        } else {
            log::warn!("Using a {free}-bit key instead of {requested} bits");
        }
        Ok(free)
    }

    /// Protect `manifest`, recording into `ctx`.
    ///
    /// Per-asset failures end up in the returned report and the audit trail.
    /// Only problems found before anything is written are returned as errors.
    pub fn protect<R: Rng>(
        &self,
        manifest: &SceneManifest,
        rng: &mut R,
        ctx: &mut ProtectContext,
    ) -> Result<ProtectReport, ProtectError> {
        let settings = &self.config.protect;
        if manifest.renderers.is_empty() && settings.additional_materials.is_empty() {
            return Err(ProtectError::MissingComponent(format!(
                "renderers in scene '{}'",
                manifest.name
            )));
        }
        let key_length = self.key_length(manifest)?;

        let key = KeyVector::generate(key_length, rng);
        let schedule = KeySchedule::generate(key_length, rng);
        let bit_names = key.bit_names(&self.config.params);
        let weights = schedule.derive(&key)?;
        let decode_source = decode_fragment(&schedule, &bit_names)?;
        let encoder = VertexEncoder::new(
            settings.clamped_distort_ratio(),
            RandomOffsets::new(&mut *rng),
        )?;

        ctx.audit.info(format!(
            "Protecting '{}' with a {key_length}-bit key",
            manifest.name.trim()
        ));
        ctx.report.bit_names = bit_names.clone();
        ctx.report.bits = key.bits().to_vec();

        let ignored: BTreeSet<String> = settings.ignored_materials.iter().cloned().collect();
        let mut binder = MaterialBinder::new(
            self.store,
            &self.capabilities,
            self.locker.as_ref(),
            BindOptions {
                decode_source: &decode_source,
                weights: &weights,
                ignored: &ignored,
                output_dir: &settings.output_dir,
            },
            encoder,
        );

        if !settings.additional_materials.is_empty() {
            ctx.audit.info("Protecting additional materials");
            binder.bind_materials(ctx, &settings.additional_materials);
        }
        for renderer in &manifest.renderers {
            binder.bind_renderer(ctx, renderer);
        }

        self.save_scene(manifest, ctx);
        if let Err(e) = self.store.refresh_index() {
            ctx.audit.warn(format!("Failed to refresh the asset index: {e}"));
        }
        self.save_keys(&key, &bit_names, ctx);

        let report = ctx.take_report();
        ctx.audit.info(format!("Done: {}", report.summary()));
        Ok(report)
    }

    fn save_scene(&self, manifest: &SceneManifest, ctx: &mut ProtectContext) {
        let rebound = SceneManifest {
            name: format!("{}_Protected", manifest.name.trim()),
            renderers: ctx.rebound.clone(),
            budget: manifest.budget,
        };
        let path = manifest.protected_path(&self.config.protect.output_dir);
        let saved = rebound
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .write(&path, json.into_bytes())
                    .map_err(|e| e.to_string())
            });
        match saved {
            Ok(()) => {
                ctx.audit.info(format!("Saved rebound scene to {path}"));
                ctx.report.scene = Some(path);
            }
            Err(e) => ctx.audit.error(format!("Failed to save {path}: {e}")),
        }
    }

    fn save_keys(&self, key: &KeyVector, bit_names: &[String], ctx: &mut ProtectContext) {
        let Some(owner) = self.config.protect.owner_id.as_deref() else {
            ctx.audit
                .warn("No owner id configured, keys were not written to saved parameters");
            return;
        };
        if self.key_stores.is_empty() {
            ctx.audit.warn("No key store configured, keys were not written");
            return;
        }
        let stores: Vec<&dyn KeyStore> = self
            .key_stores
            .iter()
            .map(|s| s.as_ref() as &dyn KeyStore)
            .collect();
        match persist_keys(&stores, owner, bit_names, key, self.notifier.as_ref()) {
            Ok(written) => {
                ctx.audit.info(format!("Wrote keys for {owner} to {written} profiles"));
                ctx.report.keys_written = written;
            }
            Err(e) => ctx.audit.error(format!("Failed to write keys for {owner}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use shroud_vfs::MemoryProvider;

    use super::*;
    use crate::scene::ParameterBudget;

    fn manifest(free: Option<usize>) -> SceneManifest {
        SceneManifest {
            name: "Avatar".into(),
            renderers: Vec::new(),
            budget: free.map(|free| ParameterBudget {
                capacity: 256,
                used: 256 - free,
            }),
        }
    }

    #[rstest]
    #[case(Some(200), false, Some(32))]
    #[case(Some(32), false, Some(32))]
    #[case(Some(20), true, Some(20))]
    #[case(Some(20), false, None)]
    #[case(Some(0), true, None)]
    fn key_length_respects_budget(
        #[case] free: Option<usize>,
        #[case] accept: bool,
        #[case] expected: Option<usize>,
    ) {
        let mem = MemoryProvider::new();
        let config = ShroudConfig::default();
        let protector = Protector::new(&mem, &config).with_operator(FixedOperator {
            accept_short_key: accept,
        });
        match (protector.key_length(&manifest(free)), expected) {
            (Ok(len), Some(expected)) => assert_eq!(len, expected),
            (Err(ProtectError::Cancelled { free: f, requested }), None) => {
                assert_eq!(Some(f), free);
                assert_eq!(requested, 32);
            }
            (other, _) => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_budget_is_a_missing_component() {
        let mem = MemoryProvider::new();
        let config = ShroudConfig::default();
        let protector = Protector::new(&mem, &config);
        assert!(matches!(
            protector.key_length(&manifest(None)),
            Err(ProtectError::MissingComponent(_))
        ));
    }

    #[test]
    fn zero_key_length_is_rejected_before_writing() {
        let mem = MemoryProvider::new();
        let mut config = ShroudConfig::default();
        config.protect.key_length = 0;
        config.protect.additional_materials.push("Materials/Skin.mat.json".into());
        let mut ctx = ProtectContext::new();

        let result =
            Protector::new(&mem, &config).protect(&manifest(Some(64)), &mut rand::thread_rng(), &mut ctx);
        assert!(matches!(
            result,
            Err(ProtectError::Config(ConfigError::ZeroKeyLength))
        ));
        assert!(mem.paths().is_empty());
    }

    #[test]
    fn empty_scene_writes_nothing() {
        let mem = MemoryProvider::new();
        let config = ShroudConfig::default();
        let protector = Protector::new(&mem, &config);
        let mut ctx = ProtectContext::new();

        let result = protector.protect(&manifest(Some(64)), &mut rand::thread_rng(), &mut ctx);
        assert!(matches!(result, Err(ProtectError::MissingComponent(_))));
        assert!(mem.paths().is_empty());
    }
}
