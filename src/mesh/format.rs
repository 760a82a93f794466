//! Vertex format definitions for meshes.
//!
//! A vertex format is an ordered list of named attributes packed into a single
//! interleaved record. The record size (stride) is derived from the attributes
//! unless explicitly overridden.
//!
//! Formats are shared via `Arc` since there are typically only a few
//! combinations across many meshes.
//!
//! # Example
//!
//! ```ignore
//! let format = Arc::new(VertexFormat::new()
//!     .with_attribute("VertexPosition", ComponentType::Float, 2)
//!     .with_attribute("VertexTexCoord", ComponentType::Float, 2)
//!     .with_attribute("VertexColor", ComponentType::Unorm8, 4));
//! assert_eq!(format.stride(), 20);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::backend::ComponentType;
use crate::error::{GraphicsError, GraphicsResult};

/// A single named vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Name the attribute is matched by (e.g. a shader input).
    pub name: String,
    pub component_type: ComponentType,
    /// Number of components, 1 to 4.
    pub component_count: u8,
    /// Byte offset within the vertex record.
    pub offset: usize,
}

impl VertexAttribute {
    pub fn new(
        name: impl Into<String>,
        component_type: ComponentType,
        component_count: u8,
        offset: usize,
    ) -> Self {
        Self {
            name: name.into(),
            component_type,
            component_count,
            offset,
        }
    }

    /// Size in bytes of this attribute.
    pub fn size(&self) -> usize {
        self.component_type.size() * self.component_count as usize
    }

    /// Byte just past the end of this attribute.
    pub fn end(&self) -> usize {
        self.offset + self.size()
    }
}

/// Describes the layout of one interleaved vertex record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexFormat {
    attributes: Vec<VertexAttribute>,
    stride: Option<usize>,
}

impl VertexFormat {
    /// Create a new empty vertex format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute right after the current last attribute.
    pub fn with_attribute(
        self,
        name: impl Into<String>,
        component_type: ComponentType,
        component_count: u8,
    ) -> Self {
        let offset = self.packed_size();
        self.with_attribute_at(name, component_type, component_count, offset)
    }

    /// Append an attribute at an explicit byte offset.
    pub fn with_attribute_at(
        mut self,
        name: impl Into<String>,
        component_type: ComponentType,
        component_count: u8,
        offset: usize,
    ) -> Self {
        self.attributes.push(VertexAttribute::new(
            name,
            component_type,
            component_count,
            offset,
        ));
        self
    }

    /// Override the stride (padding after the last attribute).
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Position (float2), texture coordinate (float2) and color (unorm8x4).
    pub fn default_2d() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_attribute("VertexPosition", ComponentType::Float, 2)
                .with_attribute("VertexTexCoord", ComponentType::Float, 2)
                .with_attribute("VertexColor", ComponentType::Unorm8, 4),
        )
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute(&self, index: usize) -> Option<&VertexAttribute> {
        self.attributes.get(index)
    }

    /// Index of an attribute by name.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|attr| attr.name == name)
    }

    /// Bytes from the start of one vertex to the start of the next.
    pub fn stride(&self) -> usize {
        self.stride.unwrap_or_else(|| self.packed_size())
    }

    fn packed_size(&self) -> usize {
        self.attributes
            .iter()
            .map(VertexAttribute::end)
            .max()
            .unwrap_or(0)
    }

    /// Check names, component counts, overlaps and stride.
    pub fn validate(&self) -> GraphicsResult<()> {
        if self.attributes.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "vertex format must declare at least one attribute".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for attr in &self.attributes {
            if !(1..=4).contains(&attr.component_count) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "attribute '{}' has {} components, expected 1 to 4",
                    attr.name, attr.component_count
                )));
            }
            if !names.insert(attr.name.as_str()) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "duplicate vertex attribute '{}'",
                    attr.name
                )));
            }
        }

        let mut ranges: Vec<_> = self.attributes.iter().collect();
        ranges.sort_by_key(|attr| attr.offset);
        for pair in ranges.windows(2) {
            if pair[0].end() > pair[1].offset {
                return Err(GraphicsError::InvalidParameter(format!(
                    "attributes '{}' and '{}' overlap",
                    pair[0].name, pair[1].name
                )));
            }
        }

        let stride = self.stride();
        if self.packed_size() > stride {
            return Err(GraphicsError::InvalidParameter(format!(
                "attributes need {} bytes but the stride is {}",
                self.packed_size(),
                stride
            )));
        }
        Ok(())
    }
}
