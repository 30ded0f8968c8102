//! Registry of patchable shader families.

use serde::{Deserialize, Serialize};

use crate::rules::{PatchRule, ShaderPatchRuleSet};

/// A shader family: every program whose declared name contains `fragment`
/// is patched with `rules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderCapability {
    #[serde(rename = "match")]
    pub fragment: String,
    #[serde(flatten)]
    pub rules: ShaderPatchRuleSet,
}

/// Lookup table from declared shader names to rule sets.
///
/// Later registrations take precedence, so families loaded from the
/// configuration file override built-ins with an overlapping fragment.
#[derive(Debug, Clone, Default)]
pub struct ShaderCapabilities {
    entries: Vec<ShaderCapability>,
}

impl ShaderCapabilities {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in families.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ShaderCapability {
            fragment: "Shroud/".to_owned(),
            rules: builtin_unlit_vertex(),
        });
        registry
    }

    pub fn register(&mut self, capability: ShaderCapability) {
        log::debug!(
            "registered shader family '{}' for names containing '{}'",
            capability.rules.name,
            capability.fragment
        );
        self.entries.push(capability);
    }

    /// Rule set for the program declared as `shader_name`.
    pub fn lookup(&self, shader_name: &str) -> Option<&ShaderPatchRuleSet> {
        self.entries
            .iter()
            .rev()
            .find(|entry| shader_name.contains(entry.fragment.as_str()))
            .map(|entry| &entry.rules)
    }

    /// Whether the program declared as `shader_name` can be protected.
    pub fn is_capable(&self, shader_name: &str) -> bool {
        self.lookup(shader_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<ShaderCapability> for ShaderCapabilities {
    fn extend<T: IntoIterator<Item = ShaderCapability>>(&mut self, iter: T) {
        for capability in iter {
            self.register(capability);
        }
    }
}

/// Rules for hand-written vertex/fragment programs following the usual
/// `appdata` / `v2f vert(appdata v)` layout.
fn builtin_unlit_vertex() -> ShaderPatchRuleSet {
    ShaderPatchRuleSet {
        name: "unlit-vertex".to_owned(),
        uv: PatchRule::new(
            ["float2 uv : TEXCOORD0;"],
            "{OrigText}\n    float2 shroudOffsetA : TEXCOORD6;\n    float2 shroudOffsetB : TEXCOORD7;",
        )
        .with_includes(),
        vertex_entry: PatchRule::new(
            ["v2f vert (appdata v)\n{", "v2f vert(appdata v)\n{"],
            "{OrigText}\n    v.vertex.xyz = ShroudDecode(v.vertex.xyz, v.normal, v.shroudOffsetA, v.shroudOffsetB);",
        )
        .with_includes(),
        vertex_setup: PatchRule::new(["#pragma vertex vert"], "{OrigText}\n{decode}"),
    }
}
