//! Shared fixtures for the copy integration tests
#![allow(dead_code)]

use pmdpipe_copy::{Copier, CopyStats, PipeConfig};
use pmdpipe_core::{
    Attribute, AttributeValue, Chunk, Datatype, NodeKind, Rank, RankTable, Result,
};
use pmdpipe_memory::{DatasetData, JsonOptions, MemoryReader, MemoryStore, MemoryWriter, NodeData, SeriesData};

/// Iterations of the synthetic series
pub const ITERATIONS: [u64; 2] = [100, 200];

pub fn f64_bytes(values: impl IntoIterator<Item = f64>) -> Vec<u8> {
    values.into_iter().flat_map(f64::to_le_bytes).collect()
}

pub fn u64_bytes(values: impl IntoIterator<Item = u64>) -> Vec<u8> {
    values.into_iter().flat_map(u64::to_le_bytes).collect()
}

/// Float64 component whose element `i` holds `seed + i`
pub fn regular(extent: Vec<u64>, chunks: Vec<Chunk>, seed: f64) -> NodeData {
    let volume: u64 = extent.iter().product();
    NodeData::new(NodeKind::RecordComponent)
        .with_attribute("unitSI", Attribute::float(1.0))
        .with_dataset(DatasetData {
            dtype: Datatype::Float64,
            extent,
            constant: None,
            chunks,
            data: f64_bytes((0..volume).map(|i| seed + i as f64)),
        })
}

/// Float64 component holding `value` everywhere
pub fn constant(value: f64, extent: Vec<u64>) -> NodeData {
    NodeData::new(NodeKind::RecordComponent)
        .with_attribute("unitSI", Attribute::float(1.0))
        .with_attribute(
            "value",
            Attribute::new(AttributeValue::Float(value), Datatype::Float64),
        )
        .with_attribute(
            "shape",
            Attribute::new(AttributeValue::UIntVec(extent.clone()), Datatype::VecUInt64),
        )
        .with_dataset(DatasetData {
            dtype: Datatype::Float64,
            extent,
            constant: Some(AttributeValue::Float(value)),
            chunks: Vec::new(),
            data: Vec::new(),
        })
}

/// Float64 component without elements
pub fn empty(extent: Vec<u64>) -> NodeData {
    NodeData::new(NodeKind::RecordComponent).with_dataset(DatasetData {
        dtype: Datatype::Float64,
        extent,
        constant: None,
        chunks: Vec::new(),
        data: Vec::new(),
    })
}

fn patch_component(dtype: Datatype, data: Vec<u8>) -> NodeData {
    NodeData::new(NodeKind::PatchRecordComponent).with_dataset(DatasetData {
        dtype,
        extent: vec![2],
        constant: None,
        chunks: vec![Chunk::new(vec![0], vec![2])],
        data,
    })
}

/// Two rows of two each, written by sources 0 and 1
fn halves_2d() -> Vec<Chunk> {
    vec![
        Chunk::new(vec![0, 0], vec![2, 4]),
        Chunk::new(vec![2, 0], vec![2, 4]).with_source(1),
    ]
}

fn halves_1d() -> Vec<Chunk> {
    vec![
        Chunk::new(vec![0], vec![3]),
        Chunk::new(vec![3], vec![3]).with_source(1),
    ]
}

/// One iteration: a regular mesh, a constant mesh, one species with three
/// records and particle patches
pub fn iteration(index: u64) -> NodeData {
    let seed = index as f64;

    let meshes = NodeData::new(NodeKind::MeshContainer)
        .with_child(
            "E",
            NodeData::new(NodeKind::Mesh)
                .with_attribute(
                    "axisLabels",
                    Attribute::new(
                        AttributeValue::StringVec(vec!["x".into(), "y".into()]),
                        Datatype::VecString,
                    ),
                )
                .with_attribute(
                    "gridSpacing",
                    Attribute::new(AttributeValue::FloatVec(vec![1.0, 1.0]), Datatype::VecFloat64),
                )
                .with_child("x", regular(vec![4, 4], halves_2d(), seed)),
        )
        .with_child(
            "B",
            NodeData::new(NodeKind::Mesh).with_child("z", constant(1.5, vec![4, 4])),
        );

    let unit_dimension = Attribute::new(
        AttributeValue::FloatVec(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        Datatype::VecFloat64,
    );
    let position = NodeData::new(NodeKind::Record)
        .with_attribute("unitDimension", unit_dimension.clone())
        .with_child("x", regular(vec![6], halves_1d(), seed + 10.0))
        .with_child("y", regular(vec![6], halves_1d(), seed + 20.0))
        .with_child("z", regular(vec![6], halves_1d(), seed + 30.0));
    let momentum = NodeData::new(NodeKind::Record)
        .with_attribute("unitDimension", unit_dimension)
        .with_child("x", regular(vec![6], vec![Chunk::new(vec![0], vec![6])], seed + 40.0));
    let weighting = NodeData::new(NodeKind::Record).with_child("SCALAR", constant(1.0, vec![6]));

    let patches = NodeData::new(NodeKind::ParticlePatches)
        .with_child(
            "numParticles",
            NodeData::new(NodeKind::PatchRecord)
                .with_child("SCALAR", patch_component(Datatype::UInt64, u64_bytes([3, 3]))),
        )
        .with_child(
            "offset",
            NodeData::new(NodeKind::PatchRecord)
                .with_attribute("unitDimension", Attribute::new(
                    AttributeValue::FloatVec(vec![1.0]),
                    Datatype::VecFloat64,
                ))
                .with_child("x", patch_component(Datatype::Float64, f64_bytes([0.0, 2.0]))),
        );

    let electrons = NodeData::new(NodeKind::ParticleSpecies)
        .with_attribute("particleShape", Attribute::float(3.0))
        .with_child("position", position)
        .with_child("momentum", momentum)
        .with_child("weighting", weighting)
        .with_child("particlePatches", patches);

    NodeData::new(NodeKind::Iteration)
        .with_attribute("dt", Attribute::float(0.5))
        .with_attribute("time", Attribute::float(seed * 0.5))
        .with_attribute("timeUnitSI", Attribute::float(1.0))
        .with_attribute(
            "snapshot",
            Attribute::new(AttributeValue::UInt(index), Datatype::UInt64),
        )
        .with_child("meshes", meshes)
        .with_child(
            "particles",
            NodeData::new(NodeKind::ParticleContainer).with_child("electrons", electrons),
        )
}

/// Series written by two producers on hosts `n0` and `n1`
pub fn synthetic_series() -> SeriesData {
    let mut data = SeriesData::default();
    for (name, value) in [
        ("openPMD", "1.1.0"),
        ("basePath", "/data/%T/"),
        ("iterationEncoding", "variableBased"),
        ("iterationFormat", "/data/%T/"),
        ("author", "pmdpipe tests"),
        ("software", "synthetic"),
    ] {
        data.attributes.insert(name.into(), Attribute::string(value));
    }
    data.rank_table = Some(hosts(&["n0", "n1"]));
    for index in ITERATIONS {
        data.iterations.insert(index, iteration(index));
    }
    data
}

pub fn hosts(names: &[&str]) -> RankTable {
    names
        .iter()
        .enumerate()
        .map(|(r, h)| (r as Rank, h.to_string()))
        .collect()
}

/// Copy `source` into a fresh in-memory sink as a single worker
pub fn run_serial(source: &MemoryStore, config: PipeConfig) -> Result<(MemoryStore, CopyStats)> {
    let sink = MemoryStore::new();
    let mut reader = MemoryReader::new(source.clone());
    let mut writer = MemoryWriter::new(sink.clone(), JsonOptions::default());
    let stats = Copier::serial(config)?.run(&mut reader, &mut writer)?;
    writer.finish()?;
    Ok((sink, stats))
}

/// Copy `source` into a fresh sink with one worker per entry of `hosts`,
/// running the workers one after another
pub fn run_group(
    source: &MemoryStore,
    host_names: &[&str],
    config: PipeConfig,
) -> Result<(MemoryStore, Vec<CopyStats>)> {
    let sink = MemoryStore::new();
    let dest = hosts(host_names);
    let mut all = Vec::new();
    for rank in dest.keys().copied() {
        let copier = Copier::with_rank_table(config.clone(), rank, dest.clone())?;
        let mut reader = MemoryReader::new(source.clone());
        let mut writer = MemoryWriter::new(
            sink.clone(),
            JsonOptions {
                pretty: false,
                source_id: rank,
            },
        );
        all.push(copier.run(&mut reader, &mut writer)?);
        writer.finish()?;
    }
    Ok((sink, all))
}

/// Assert that `sink` mirrors `source` below every iteration
pub fn assert_iterations_copied(source: &SeriesData, sink: &SeriesData) {
    assert_eq!(
        source.iterations.keys().collect::<Vec<_>>(),
        sink.iterations.keys().collect::<Vec<_>>()
    );
    for (index, node) in &source.iterations {
        assert_node_copied(&format!("/data/{index}/"), node, &sink.iterations[index]);
    }
}

fn assert_node_copied(path: &str, src: &NodeData, dst: &NodeData) {
    assert_eq!(src.kind, dst.kind, "kind of {path}");

    let constant = src.dataset.as_ref().is_some_and(|d| d.constant.is_some());
    let ignored: &[&str] = match src.kind {
        NodeKind::Iteration => &["snapshot"],
        NodeKind::RecordComponent if constant => &["value", "shape"],
        _ => &[],
    };
    for (name, attribute) in &src.attributes {
        if !ignored.contains(&name.as_str()) {
            assert_eq!(dst.attributes.get(name), Some(attribute), "attribute {path}@{name}");
        }
    }

    match (&src.dataset, &dst.dataset) {
        (None, None) => {}
        (Some(s), Some(d)) => {
            assert_eq!(s.dtype, d.dtype, "dtype of {path}");
            assert_eq!(s.extent, d.extent, "extent of {path}");
            assert_eq!(s.constant, d.constant, "constant of {path}");
            if let Some(value) = &s.constant {
                assert_eq!(&dst.attributes["value"].value, value, "value of {path}");
            } else {
                assert_eq!(s.data, d.data, "data of {path}");
            }
        }
        (s, d) => panic!("dataset of {path}: source {s:?}, sink {d:?}"),
    }

    assert_eq!(
        src.children.keys().collect::<Vec<_>>(),
        dst.children.keys().collect::<Vec<_>>(),
        "children of {path}"
    );
    for (name, child) in &src.children {
        assert_node_copied(&format!("{path}{name}/"), child, &dst.children[name]);
    }
}
