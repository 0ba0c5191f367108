//! Composite column names.
//!
//! A composite is a length-prefixed concatenation of byte components, each
//! followed by an end-of-component byte. The last component's trailing byte
//! doubles as a marker distinguishing ordinary cell names from range-tombstone
//! bounds.

use crate::codec;
use crate::error::Result;
use crate::schema::Schema;

/// Marker byte terminating a composite.
///
/// `StartRange`/`EndRange` turn a clustering prefix into the inclusive bounds
/// of a range tombstone; everything else ends in `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum CompositeMarker {
    StartRange = -1,
    None = 0,
    EndRange = 1,
}

impl CompositeMarker {
    fn as_byte(self) -> u8 {
        self as i8 as u8
    }
}

/// A column-name composite in its serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Composite(Vec<u8>);

impl Composite {
    /// Builds a composite from exploded components with a trailing `marker`.
    ///
    /// Every component serializes as `u16 length, bytes, end-of-component`;
    /// the last end-of-component byte is `marker`, all earlier ones are zero.
    /// With no components at all the composite is the bare marker byte, which
    /// lets a caller graft the marker onto an existing clustering prefix.
    pub fn from_exploded(components: &[&[u8]], marker: CompositeMarker) -> Result<Composite> {
        if components.is_empty() {
            return Ok(Composite(vec![marker.as_byte()]));
        }
        let mut out = Vec::new();
        for (i, component) in components.iter().enumerate() {
            out.extend_from_slice(&codec::truncate16(component.len())?.to_be_bytes());
            out.extend_from_slice(component);
            let eoc = if i == components.len() - 1 {
                marker.as_byte()
            } else {
                CompositeMarker::None.as_byte()
            };
            out.push(eoc);
        }
        Ok(Composite(out))
    }

    /// Builds the composite form of a clustering key.
    ///
    /// Non-compound schemas have at most one clustering component and store
    /// it raw, without composite framing.
    pub fn from_clustering(schema: &Schema, components: &[Vec<u8>]) -> Result<Composite> {
        if components.is_empty() {
            // No clustering columns: no prefix at all, not a bare marker.
            return Ok(Composite(Vec::new()));
        }
        if schema.is_compound() {
            let refs: Vec<&[u8]> = components.iter().map(|c| c.as_slice()).collect();
            Self::from_exploded(&refs, CompositeMarker::None)
        } else {
            Ok(Composite(components[0].clone()))
        }
    }

    /// The clustering prefix shared by all static cells.
    pub fn static_prefix() -> Composite {
        Composite(vec![0xff, 0xff])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
