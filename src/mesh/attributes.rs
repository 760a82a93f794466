//! Attached (borrowed) vertex attributes and draw-time attribute resolution.

use std::collections::HashSet;
use std::sync::Weak;

use parking_lot::RwLock;

use crate::backend::{AttributeBinding, AttributeStep, BufferHandle};

use super::buffer::{GeometryBuffer, SharedBuffer};
use super::format::VertexFormat;

/// An attribute stream borrowed from another buffer owner.
///
/// Only a `Weak` reference to the lender is kept: attaching never extends the
/// lender's lifetime. If the lender is gone by draw time the attachment is
/// skipped.
#[derive(Debug, Clone)]
pub struct AttachedAttribute {
    /// Name the attribute is exposed under in this mesh.
    pub name: String,
    source: Weak<RwLock<GeometryBuffer>>,
    /// Index of the attribute in the source buffer's format.
    pub index_in_source: usize,
    pub step: AttributeStep,
    pub enabled: bool,
}

impl AttachedAttribute {
    pub(crate) fn new(
        name: impl Into<String>,
        source: &SharedBuffer,
        index_in_source: usize,
        step: AttributeStep,
    ) -> Self {
        Self {
            name: name.into(),
            source: std::sync::Arc::downgrade(source),
            index_in_source,
            step,
            enabled: true,
        }
    }

    /// The lending buffer, if it still exists.
    pub fn source(&self) -> Option<SharedBuffer> {
        self.source.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.source.strong_count() > 0
    }
}

/// Merge primary and attached attributes into draw slots.
///
/// Primary attributes come first in declaration order, then attachments in
/// attachment order. An attachment is dropped if its name is already taken
/// (by a primary attribute, enabled or not, or by an earlier attachment), if
/// its lender no longer exists or is currently mapped, or if the lender's
/// format no longer has the referenced attribute.
pub fn resolve_attributes(
    format: &VertexFormat,
    enabled: &[bool],
    primary: BufferHandle,
    attachments: &[AttachedAttribute],
) -> Vec<AttributeBinding> {
    let mut taken: HashSet<&str> = HashSet::new();
    let mut bindings = Vec::new();
    let stride = format.stride() as u64;

    for (index, attr) in format.attributes().iter().enumerate() {
        taken.insert(attr.name.as_str());
        if !enabled.get(index).copied().unwrap_or(true) {
            continue;
        }
        bindings.push(AttributeBinding {
            slot: bindings.len() as u32,
            name: attr.name.clone(),
            buffer: primary,
            offset: attr.offset as u64,
            stride,
            component_type: attr.component_type,
            component_count: attr.component_count,
            step: AttributeStep::PerVertex,
        });
    }

    for attached in attachments.iter().filter(|a| a.enabled) {
        if !taken.insert(attached.name.as_str()) {
            log::debug!(
                "attached attribute '{}' ignored: name already in use",
                attached.name
            );
            continue;
        }
        let Some(source) = attached.source() else {
            log::warn!(
                "attached attribute '{}' ignored: source buffer was destroyed",
                attached.name
            );
            continue;
        };
        let Some(source) = source.try_read() else {
            log::warn!(
                "attached attribute '{}' ignored: source buffer is mapped",
                attached.name
            );
            continue;
        };
        let Some(source_format) = source.format() else {
            continue;
        };
        let Some(attr) = source_format.attribute(attached.index_in_source) else {
            log::warn!(
                "attached attribute '{}' ignored: source has no attribute {}",
                attached.name,
                attached.index_in_source
            );
            continue;
        };
        bindings.push(AttributeBinding {
            slot: bindings.len() as u32,
            name: attached.name.clone(),
            buffer: source.handle(),
            offset: attr.offset as u64,
            stride: source_format.stride() as u64,
            component_type: attr.component_type,
            component_count: attr.component_count,
            step: attached.step,
        });
    }

    bindings
}
