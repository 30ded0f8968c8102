use shroud_core::asset;
use shroud_core::material::ShaderRef;
use shroud_vfs::{path, AssetStore};

use crate::decode::{self, DECODE_FILE_NAME};
use crate::error::PatchError;
use crate::includes::IncludeGraphResolver;
use crate::program::{self, ShaderProgram};
use crate::rules::{RuleCategory, ShaderPatchRuleSet};

/// Suffix inserted before the extension of every patched file.
pub const PROTECTED_FILE_SUFFIX: &str = "_Protected";

/// A rule that found nothing to replace in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMiss {
    pub file: String,
    pub category: RuleCategory,
}

/// What happened to one discovered include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeOutcome {
    /// Written to `output`.
    Patched { source: String, output: String },
    /// Already carries the sentinel and was left alone.
    AlreadyPatched { source: String },
    /// Reading or writing failed; the include was skipped.
    Failed { source: String, reason: String },
}

/// Result of patching one root program.
#[derive(Debug, Clone)]
pub struct PatchedShader {
    /// Path of the source program.
    pub source_path: String,
    /// The protected program, by output path and renamed declaration.
    pub shader: ShaderRef,
    /// True when the source already was a patched program.
    pub already_patched: bool,
    pub includes: Vec<IncludeOutcome>,
    pub misses: Vec<RuleMiss>,
    /// Non-fatal problems, already logged.
    pub warnings: Vec<String>,
}

/// A file being patched, before it is written.
struct PendingFile {
    source: String,
    output: String,
    text: String,
}

/// Weaves the decode routine into a shader program and its includes.
///
/// The patcher only reads the original files. Every output is written next
/// to its source with [`PROTECTED_FILE_SUFFIX`] inserted before the
/// extension, along with the decode support file next to the root.
pub struct ShaderPatcher<'a> {
    store: &'a dyn AssetStore,
    decode_source: &'a str,
}

impl<'a> ShaderPatcher<'a> {
    /// Create a patcher writing `decode_source` as the decode support file.
    pub fn new(store: &'a dyn AssetStore, decode_source: &'a str) -> Self {
        Self {
            store,
            decode_source,
        }
    }

    /// Patch the program at `root_path` with `rules`.
    ///
    /// Fails only when the root itself cannot be read, has no declared name,
    /// or cannot be written. Problems with includes and rules that match
    /// nothing are recorded in the returned [`PatchedShader`].
    pub fn patch(
        &self,
        root_path: &str,
        rules: &ShaderPatchRuleSet,
    ) -> Result<PatchedShader, PatchError> {
        let root_path = &path::normalize(root_path)?;
        if asset::is_builtin_placeholder(root_path) {
            return Err(PatchError::unsupported(root_path, "built-in shader"));
        }
        let program = ShaderProgram::load(self.store, root_path)?;
        let name = program
            .declared_name()
            .ok_or_else(|| PatchError::unsupported(root_path, "no Shader declaration"))?
            .to_owned();

        let mut result = PatchedShader {
            source_path: root_path.to_owned(),
            shader: ShaderRef::new(root_path, name.clone()),
            already_patched: false,
            includes: Vec::new(),
            misses: Vec::new(),
            warnings: Vec::new(),
        };

        if program.is_patched() {
            log::info!("{root_path} is already protected, nothing to do");
            result.already_patched = true;
            return Ok(result);
        }

        let root_dir = path::parent(root_path);
        let mut root = PendingFile {
            source: root_path.to_owned(),
            output: path::with_stem_suffix(root_path, PROTECTED_FILE_SUFFIX),
            text: program::rename_declaration(&program.source, &name),
        };
        let directive = decode::include_directive(root_dir, root_dir);
        for (category, rule) in rules.rules() {
            match rule.apply(&root.text, &directive) {
                Some(text) => root.text = text,
                None => record_miss(&mut result, root_path, category),
            }
        }

        let mut pending = Vec::new();
        let resolver = IncludeGraphResolver::new(self.store).exclude(DECODE_FILE_NAME);
        for include in resolver.resolve(root_path, &program.source) {
            let text = match self.store.read_to_string(&include) {
                Ok(text) => text,
                Err(err) => {
                    record_failure(&mut result, &include, err.to_string());
                    continue;
                }
            };
            if program::is_patched(&text) {
                result.includes.push(IncludeOutcome::AlreadyPatched { source: include });
                continue;
            }

            let directive = decode::include_directive(path::parent(&include), root_dir);
            let mut text = text;
            for (category, rule) in rules.include_rules(&include) {
                match rule.apply(&text, &directive) {
                    Some(patched) => text = patched,
                    None => record_miss(&mut result, &include, category),
                }
            }
            pending.push(PendingFile {
                output: path::with_stem_suffix(&include, PROTECTED_FILE_SUFFIX),
                source: include,
                text,
            });
        }

        // A failed write drops that include from the renames and the
        // survivors are written again, so nothing points at a missing file.
        let mut written = vec![true; pending.len()];
        let renames = loop {
            let renames: Vec<(&str, &str)> = pending
                .iter()
                .zip(&written)
                .filter(|(_, ok)| **ok)
                .map(|(file, _)| (path::file_name(&file.source), path::file_name(&file.output)))
                .collect();
            let mut dropped = false;
            for (file, ok) in pending.iter().zip(written.iter_mut()) {
                if !*ok {
                    continue;
                }
                let text = rewrite_references(&file.text, &renames);
                if let Err(err) = self
                    .store
                    .write(&file.output, program::with_sentinel(&text).into_bytes())
                {
                    record_failure(&mut result, &file.source, err.to_string());
                    *ok = false;
                    dropped = true;
                }
            }
            if !dropped {
                break renames;
            }
        };
        root.text = rewrite_references(&root.text, &renames);

        for (file, _) in pending.iter().zip(&written).filter(|(_, ok)| **ok) {
            log::debug!("wrote include {}", file.output);
            result.includes.push(IncludeOutcome::Patched {
                source: file.source.clone(),
                output: file.output.clone(),
            });
        }

        let decode_path = path::join(root_dir, DECODE_FILE_NAME)?;
        if let Err(err) = self
            .store
            .write(&decode_path, self.decode_source.as_bytes().to_vec())
        {
            let warning = format!("cannot write {decode_path}: {err}");
            log::warn!("{warning}");
            result.warnings.push(warning);
        }

        self.store
            .write(&root.output, program::with_sentinel(&root.text).into_bytes())?;
        log::info!("protected {} -> {}", root.source, root.output);

        result.shader = ShaderRef::new(root.output, program::protected_name(&name));
        Ok(result)
    }
}

fn record_miss(result: &mut PatchedShader, file: &str, category: RuleCategory) {
    log::warn!("{file}: {} rule matched nothing, skipped", category.label());
    result.misses.push(RuleMiss {
        file: file.to_owned(),
        category,
    });
}

fn record_failure(result: &mut PatchedShader, include: &str, reason: String) {
    let warning = format!("include {include} skipped: {reason}");
    log::warn!("{warning}");
    result.warnings.push(warning);
    result.includes.push(IncludeOutcome::Failed {
        source: include.to_owned(),
        reason,
    });
}

fn is_file_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

/// Replace each `old` file name with `new` wherever it starts on a file-name
/// boundary (start of text, or preceded by a character that cannot be part
/// of a file name).
///
/// ```
/// use shroud_shader::rewrite_references;
///
/// let text = "#include \"a.cginc\"\n#include \"data.cginc\"";
/// assert_eq!(
///     rewrite_references(text, &[("a.cginc", "a_Protected.cginc")]),
///     "#include \"a_Protected.cginc\"\n#include \"data.cginc\""
/// );
/// ```
pub fn rewrite_references(text: &str, renames: &[(&str, &str)]) -> String {
    let mut current = text.to_owned();
    for &(old, new) in renames {
        if old.is_empty() || old == new {
            continue;
        }
        let mut out = String::with_capacity(current.len());
        let mut last = 0;
        for (at, _) in current.match_indices(old) {
            let at_boundary = current[..at]
                .chars()
                .next_back()
                .map_or(true, |ch| !is_file_name_char(ch));
            if at_boundary {
                out.push_str(&current[last..at]);
                out.push_str(new);
                last = at + old.len();
            }
        }
        out.push_str(&current[last..]);
        current = out;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PatchRule;
    use shroud_vfs::MemoryProvider;

    const DECODE: &str = "float3 ShroudDecode();";

    fn rules() -> ShaderPatchRuleSet {
        ShaderPatchRuleSet {
            name: "test".into(),
            uv: PatchRule::new(["UV_IN"], "{OrigText} UV_OFFSETS").with_includes(),
            vertex_entry: PatchRule::new(["VERT_BODY"], "VERT_BODY\n{decode}"),
            vertex_setup: PatchRule::new(["SETUP"], "{OrigText}!")
                .with_includes()
                .excluding("Shadow"),
        }
    }

    #[test]
    fn boundary_rewrite() {
        let renames = [("Light.cginc", "Light_Protected.cginc")];
        assert_eq!(
            rewrite_references("\"Light.cginc\" \"Core/Light.cginc\" \"MyLight.cginc\"", &renames),
            "\"Light_Protected.cginc\" \"Core/Light_Protected.cginc\" \"MyLight.cginc\""
        );
        assert_eq!(rewrite_references("Light.cginc", &renames), "Light_Protected.cginc");
    }

    #[test]
    fn root_without_declaration_is_unsupported() {
        let store = MemoryProvider::new();
        store.insert("Broken.shader", "Pass {}");
        let err = ShaderPatcher::new(&store, DECODE)
            .patch("Broken.shader", &rules())
            .unwrap_err();
        assert!(matches!(err, PatchError::UnsupportedAsset { .. }));
    }

    #[test]
    fn builtin_root_is_unsupported() {
        let store = MemoryProvider::new();
        let err = ShaderPatcher::new(&store, DECODE)
            .patch("Resources/unity_builtin_extra", &rules())
            .unwrap_err();
        assert!(matches!(err, PatchError::UnsupportedAsset { .. }));
    }

    #[test]
    fn missing_root_is_store_error() {
        let store = MemoryProvider::new();
        let err = ShaderPatcher::new(&store, DECODE)
            .patch("Nope.shader", &rules())
            .unwrap_err();
        assert!(matches!(err, PatchError::Store(_)));
    }

    #[test]
    fn patches_root_and_includes() {
        let store = MemoryProvider::new();
        store.insert(
            "Shaders/Toon.shader",
            "Shader \"Toon\" {\n#include \"Core/Light.cginc\"\nUV_IN\nVERT_BODY\nSETUP\n}",
        );
        store.insert("Shaders/Core/Light.cginc", "#include \"Shadow.cginc\"\nUV_IN SETUP");
        store.insert("Shaders/Core/Shadow.cginc", "SETUP");

        let patched = ShaderPatcher::new(&store, DECODE)
            .patch("Shaders/Toon.shader", &rules())
            .unwrap();

        assert_eq!(patched.shader.name, "Toon/Protected");
        assert_eq!(patched.shader.path, "Shaders/Toon_Protected.shader");
        assert_eq!(
            store.text("Shaders/Toon_Protected.shader").unwrap(),
            "// shroud: protected\nShader \"Toon/Protected\" {\n#include \"Core/Light_Protected.cginc\"\nUV_IN UV_OFFSETS\nVERT_BODY\n#include \"ShroudDecode.cginc\"\nSETUP!\n}"
        );
        assert_eq!(
            store.text("Shaders/Core/Light_Protected.cginc").unwrap(),
            "// shroud: protected\n#include \"Shadow_Protected.cginc\"\nUV_IN UV_OFFSETS SETUP!"
        );
        // Excluded from the setup rule, copied with the uv rule missing.
        assert_eq!(
            store.text("Shaders/Core/Shadow_Protected.cginc").unwrap(),
            "// shroud: protected\nSETUP"
        );
        assert_eq!(store.text("Shaders/ShroudDecode.cginc").as_deref(), Some(DECODE));
        assert_eq!(
            patched.misses,
            vec![RuleMiss {
                file: "Shaders/Core/Shadow.cginc".into(),
                category: RuleCategory::Uv
            }]
        );
    }

    #[test]
    fn patched_root_is_left_alone() {
        let store = MemoryProvider::new();
        let source = "// shroud: protected\nShader \"Toon/Protected\" {}";
        store.insert("Toon_Protected.shader", source);

        let patched = ShaderPatcher::new(&store, DECODE)
            .patch("Toon_Protected.shader", &rules())
            .unwrap();

        assert!(patched.already_patched);
        assert_eq!(patched.shader.name, "Toon/Protected");
        assert_eq!(store.paths(), vec!["Toon_Protected.shader"]);
    }
}
