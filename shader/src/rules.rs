//! Find/replace rules that inject the decode call into a shader family.

use serde::{Deserialize, Serialize};

/// Placeholder re-embedding the matched text.
const ORIG_TEXT: &str = "{OrigText}";
/// Placeholder for the decode include directive.
const DECODE: &str = "{decode}";

/// The three rule categories, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Passes the offset channels (uv 6/7) through the vertex input struct.
    Uv,
    /// Calls the decode routine at the top of the vertex function.
    VertexEntry,
    /// Declares or includes what the vertex function needs.
    VertexSetup,
}

impl RuleCategory {
    /// All categories in application order.
    pub const ORDER: [RuleCategory; 3] = [Self::Uv, Self::VertexEntry, Self::VertexSetup];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uv => "uv",
            Self::VertexEntry => "vertex entry",
            Self::VertexSetup => "vertex setup",
        }
    }
}

/// One find/replace rule.
///
/// Every find string that occurs is replaced everywhere by the template,
/// with `{OrigText}` standing for the matched text and `{decode}` for the
/// decode include directive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatchRule {
    pub find: Vec<String>,
    pub replace: String,
    /// Whether the rule also runs on included files.
    #[serde(default)]
    pub apply_to_includes: bool,
    /// Include path fragments the rule never runs on.
    #[serde(default)]
    pub exclude_includes: Vec<String>,
}

impl PatchRule {
    pub fn new<I, S>(find: I, replace: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            find: find.into_iter().map(Into::into).collect(),
            replace: replace.into(),
            apply_to_includes: false,
            exclude_includes: Vec::new(),
        }
    }

    pub fn with_includes(mut self) -> Self {
        self.apply_to_includes = true;
        self
    }

    pub fn excluding(mut self, fragment: impl Into<String>) -> Self {
        self.exclude_includes.push(fragment.into());
        self
    }

    /// Whether the rule runs on the include at `path`.
    pub fn applies_to_include(&self, path: &str) -> bool {
        self.apply_to_includes
            && self
                .exclude_includes
                .iter()
                .all(|fragment| !path.contains(fragment.as_str()))
    }

    /// Apply the rule to `text`.
    ///
    /// Returns `None` when no find string occurs.
    pub fn apply(&self, text: &str, decode: &str) -> Option<String> {
        let mut current = text.to_owned();
        let mut matched = false;
        for needle in &self.find {
            if needle.is_empty() || !current.contains(needle.as_str()) {
                continue;
            }
            let replacement = expand_template(&self.replace, needle, decode);
            current = current.replace(needle.as_str(), &replacement);
            matched = true;
        }
        matched.then_some(current)
    }
}

/// Substitute both placeholders in a single pass so neither expansion is
/// rescanned for the other.
fn expand_template(template: &str, orig: &str, decode: &str) -> String {
    let mut out = String::with_capacity(template.len() + orig.len() + decode.len());
    let mut rest = template;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(ORIG_TEXT) {
            out.push_str(orig);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix(DECODE) {
            out.push_str(decode);
            rest = tail;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

/// The ordered rules for one shader family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShaderPatchRuleSet {
    pub name: String,
    #[serde(default)]
    pub uv: PatchRule,
    #[serde(default)]
    pub vertex_entry: PatchRule,
    #[serde(default)]
    pub vertex_setup: PatchRule,
}

impl ShaderPatchRuleSet {
    pub fn rule(&self, category: RuleCategory) -> &PatchRule {
        match category {
            RuleCategory::Uv => &self.uv,
            RuleCategory::VertexEntry => &self.vertex_entry,
            RuleCategory::VertexSetup => &self.vertex_setup,
        }
    }

    /// Rules in application order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleCategory, &PatchRule)> + '_ {
        RuleCategory::ORDER.into_iter().map(|c| (c, self.rule(c)))
    }

    /// Rules that run on the include at `path`, in application order.
    pub fn include_rules<'a>(
        &'a self,
        path: &'a str,
    ) -> impl Iterator<Item = (RuleCategory, &'a PatchRule)> + 'a {
        self.rules()
            .filter(move |(_, rule)| rule.applies_to_include(path))
    }
}
