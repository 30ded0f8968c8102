//! Textual `#include` discovery.

use std::collections::HashSet;

use shroud_vfs::{path, AssetStore};

const INCLUDE_KEYWORD: &str = "#include ";
const INCLUDE_QUOTED: &str = "#include \"";

/// Extract the quoted target of an `#include` line.
///
/// The target is the text between the first `#include "` and the last `"`
/// on the line. Angle-bracket includes and malformed lines yield `None`.
pub fn include_target(line: &str) -> Option<&str> {
    if !line.contains(INCLUDE_KEYWORD) {
        return None;
    }
    let start = line.find(INCLUDE_QUOTED)? + INCLUDE_QUOTED.len();
    let end = line.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(&line[start..end])
}

/// Discovers the transitive include files of a shader program.
///
/// Each quoted include is resolved against the directory of the file that
/// names it, `..` segments collapsed. A file is recursed into the first time
/// it is found; includes that do not exist in the store are skipped.
pub struct IncludeGraphResolver<'a> {
    store: &'a dyn AssetStore,
    excluded: Vec<String>,
}

impl<'a> IncludeGraphResolver<'a> {
    pub fn new(store: &'a dyn AssetStore) -> Self {
        Self {
            store,
            excluded: Vec::new(),
        }
    }

    /// Skip include targets containing `fragment`.
    pub fn exclude(mut self, fragment: impl Into<String>) -> Self {
        self.excluded.push(fragment.into());
        self
    }

    /// Includes reachable from `source`, which lives at `root_path`, in
    /// discovery order without duplicates.
    pub fn resolve(&self, root_path: &str, source: &str) -> Vec<String> {
        let root_path = match path::normalize(root_path) {
            Ok(normalized) => normalized,
            Err(err) => {
                log::warn!("cannot resolve includes of {root_path}: {err}");
                return Vec::new();
            }
        };
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(root_path.clone());
        self.visit(path::parent(&root_path), source, &mut found, &mut seen);
        found
    }

    fn visit(
        &self,
        dir: &str,
        source: &str,
        found: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) {
        for line in source.lines() {
            let Some(target) = include_target(line) else {
                continue;
            };
            if self.excluded.iter().any(|f| target.contains(f.as_str())) {
                continue;
            }
            let target = target
                .strip_prefix('/')
                .or_else(|| target.strip_prefix('\\'))
                .unwrap_or(target);
            let resolved = match path::join(dir, target) {
                Ok(resolved) => resolved,
                Err(err) => {
                    log::debug!("ignoring include '{target}': {err}");
                    continue;
                }
            };
            if seen.contains(&resolved) {
                continue;
            }
            if !self.store.exists(&resolved).unwrap_or(false) {
                log::debug!("include '{resolved}' not found, skipping");
                continue;
            }

            seen.insert(resolved.clone());
            found.push(resolved.clone());

            match self.store.read_to_string(&resolved) {
                Ok(text) => self.visit(path::parent(&resolved), &text, found, seen),
                Err(err) => log::warn!("cannot scan include '{resolved}': {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_vfs::MemoryProvider;

    #[test]
    fn include_target_extraction() {
        assert_eq!(include_target("#include \"Light.cginc\""), Some("Light.cginc"));
        assert_eq!(
            include_target("    #include \"../Core/Light.cginc\" // shading"),
            Some("../Core/Light.cginc")
        );
        // The closing quote is the last one on the line.
        assert_eq!(
            include_target("#include \"A.cginc\" // see \"B\""),
            Some("A.cginc\" // see \"B")
        );
        assert_eq!(include_target("#include <UnityCG.cginc>"), None);
        assert_eq!(include_target("#include_with_pragmas \"x\""), None);
        assert_eq!(include_target("float4 vert();"), None);
    }

    #[test]
    fn discovery_is_depth_first_and_deduplicated() {
        let store = MemoryProvider::new();
        store.insert("Shaders/Core/A.cginc", "#include \"B.cginc\"\n#include \"../Common.cginc\"");
        store.insert("Shaders/Core/B.cginc", "#include \"/A.cginc\"");
        store.insert("Shaders/Common.cginc", "float3 common;");

        let resolver = IncludeGraphResolver::new(&store);
        let found = resolver.resolve(
            "Shaders/Toon.shader",
            "#include \"Core/A.cginc\"\n#include \"Common.cginc\"\n#include \"Missing.cginc\"",
        );

        assert_eq!(
            found,
            vec![
                "Shaders/Core/A.cginc",
                "Shaders/Core/B.cginc",
                "Shaders/Common.cginc"
            ]
        );
    }

    #[test]
    fn excluded_targets_are_skipped() {
        let store = MemoryProvider::new();
        store.insert("ShroudDecode.cginc", "");
        store.insert("Light.cginc", "");

        let found = IncludeGraphResolver::new(&store)
            .exclude("ShroudDecode.cginc")
            .resolve(
                "Toon.shader",
                "#include \"ShroudDecode.cginc\"\n#include \"Light.cginc\"",
            );
        assert_eq!(found, vec!["Light.cginc"]);
    }

    #[test]
    fn self_include_terminates() {
        let store = MemoryProvider::new();
        store.insert("Loop.cginc", "#include \"Loop.cginc\"");
        let found = IncludeGraphResolver::new(&store)
            .resolve("Toon.shader", "#include \"Loop.cginc\"");
        assert_eq!(found, vec!["Loop.cginc"]);
    }
}
