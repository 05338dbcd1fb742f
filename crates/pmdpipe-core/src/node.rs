//! Hierarchy node kinds and paths
//!
//! The openPMD hierarchy is a closed set of node kinds:
//!
//! ```text
//! Series
//! └── Iteration (indexed)
//!     ├── meshes: MeshContainer ── Mesh ── RecordComponent
//!     └── particles: ParticleContainer ── ParticleSpecies
//!         ├── Record ── RecordComponent
//!         └── particlePatches: ParticlePatches ── PatchRecord ── PatchRecordComponent
//! ```
//!
//! Nodes are addressed by a [`NodePath`] whose first segment is the iteration
//! index. Backends own the node storage; the pipe only holds paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the mesh container below an iteration
pub const MESHES: &str = "meshes";
/// Name of the particle container below an iteration
pub const PARTICLES: &str = "particles";
/// Name of the particle patch container below a particle species
pub const PARTICLE_PATCHES: &str = "particlePatches";

/// Kind of a hierarchy node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Series,
    /// Iteration as yielded by a read stream
    IndexedIteration,
    /// Iteration as opened on a write stream
    Iteration,
    MeshContainer,
    ParticleContainer,
    Mesh,
    ParticleSpecies,
    Record,
    RecordComponent,
    ParticlePatches,
    PatchRecord,
    PatchRecordComponent,
}

impl NodeKind {
    /// Kind a child named `name` takes below a node of this kind
    ///
    /// `None` if nodes of this kind cannot have such a child.
    pub fn child_kind(&self, name: &str) -> Option<NodeKind> {
        match self {
            NodeKind::Series => Some(NodeKind::Iteration),
            NodeKind::IndexedIteration | NodeKind::Iteration => match name {
                MESHES => Some(NodeKind::MeshContainer),
                PARTICLES => Some(NodeKind::ParticleContainer),
                _ => None,
            },
            NodeKind::MeshContainer => Some(NodeKind::Mesh),
            NodeKind::ParticleContainer => Some(NodeKind::ParticleSpecies),
            NodeKind::Mesh | NodeKind::Record => Some(NodeKind::RecordComponent),
            NodeKind::ParticleSpecies => match name {
                PARTICLE_PATCHES => Some(NodeKind::ParticlePatches),
                _ => Some(NodeKind::Record),
            },
            NodeKind::ParticlePatches => Some(NodeKind::PatchRecord),
            NodeKind::PatchRecord => Some(NodeKind::PatchRecordComponent),
            NodeKind::RecordComponent | NodeKind::PatchRecordComponent => None,
        }
    }

    /// Whether a source node of this kind may be copied onto a sink node of `dest`
    ///
    /// Kinds must be equal, except that an indexed (read) iteration maps onto
    /// a plain (write) iteration.
    pub fn is_compatible_with(&self, dest: NodeKind) -> bool {
        match (self, dest) {
            (NodeKind::IndexedIteration, NodeKind::Iteration) => true,
            (src, dst) => *src == dst,
        }
    }

    /// Whether the node carries a dataset
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::RecordComponent | NodeKind::PatchRecordComponent
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Series => "series",
            NodeKind::IndexedIteration => "indexed iteration",
            NodeKind::Iteration => "iteration",
            NodeKind::MeshContainer => "mesh container",
            NodeKind::ParticleContainer => "particle container",
            NodeKind::Mesh => "mesh",
            NodeKind::ParticleSpecies => "particle species",
            NodeKind::Record => "record",
            NodeKind::RecordComponent => "record component",
            NodeKind::ParticlePatches => "particle patches",
            NodeKind::PatchRecord => "patch record",
            NodeKind::PatchRecordComponent => "patch record component",
        };
        f.write_str(name)
    }
}

/// Location of a node inside a series
///
/// The empty path is the series itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// Path of the series root
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of an iteration
    pub fn iteration(index: u64) -> Self {
        Self::root().child(index.to_string())
    }

    /// Path of a child of this node
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Path segments from the root
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the series root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iteration index this path belongs to, if any
    pub fn iteration_index(&self) -> Option<u64> {
        self.segments.first().and_then(|s| s.parse().ok())
    }

    /// Last segment, if any
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path of the parent, `None` for the root
    pub fn parent(&self) -> Option<NodePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/data/")?;
        for segment in &self.segments {
            write!(f, "{segment}/")?;
        }
        Ok(())
    }
}
