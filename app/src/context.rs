//! State shared by every step of a protection run.

use std::collections::HashMap;

use shroud_core::material::{Material, ShaderRef};

use crate::audit::AuditLog;
use crate::report::ProtectReport;
use crate::scene::RendererEntry;

/// Run state passed explicitly to the protection entry points.
///
/// Holds the audit trail, the report under construction and the memo tables
/// that make sure a shader program, a material or a mesh shared between
/// several renderers is only processed once.
#[derive(Debug, Default)]
pub struct ProtectContext {
    /// The audit trail.
    pub(crate) audit: AuditLog,
    /// The report being filled in.
    pub(crate) report: ProtectReport,
    /// Materials loaded so far, by asset path, in their current state.
    pub(crate) materials: HashMap<String, Material>,
    /// Patch results by source shader path.
    pub(crate) patched: HashMap<String, Result<ShaderRef, String>>,
    /// Encoding results by source mesh path: output path or failure.
    pub(crate) encoded: HashMap<String, Result<String, String>>,
    /// Renderers as they should be bound after protection.
    pub(crate) rebound: Vec<RendererEntry>,
}

impl ProtectContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the audit trail.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Get the audit trail for recording.
    pub fn audit_mut(&mut self) -> &mut AuditLog {
        &mut self.audit
    }

    /// Get the report built so far.
    pub fn report(&self) -> &ProtectReport {
        &self.report
    }

    /// Get the renderers rebound so far.
    pub fn rebound(&self) -> &[RendererEntry] {
        &self.rebound
    }

    /// Get the cached state of a material.
    pub fn material(&self, path: &str) -> Option<&Material> {
        self.materials.get(path)
    }

    /// Move the finished report out, leaving an empty one.
    pub(crate) fn take_report(&mut self) -> ProtectReport {
        std::mem::take(&mut self.report)
    }
}
