//! One serial copy between two JSON series files
//!
//! Both ends go through the memory backend: the input file is loaded as a
//! whole, streamed through the linear reader and written to a fresh store
//! that is persisted once every iteration is closed.

use anyhow::{Context, Result};
use pmdpipe_copy::{Copier, CopyStats, PipeConfig};
use pmdpipe_core::{HostInfo, PipeError};
use pmdpipe_memory::{BackendConfig, MemoryReader, MemoryStore, MemoryWriter};
use std::path::PathBuf;

/// Parameters of one pipe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeOptions {
    /// Series to read
    pub infile: PathBuf,
    /// Series to create
    pub outfile: PathBuf,
    /// Backend options for the source (JSON, or `@file`)
    pub inconfig: String,
    /// Backend options for the sink (JSON, or `@file`)
    pub outconfig: String,
    /// Request a distributed run
    pub mpi: bool,
}

impl PipeOptions {
    /// Options for a serial copy with default backend configuration
    pub fn new(infile: impl Into<PathBuf>, outfile: impl Into<PathBuf>) -> Self {
        Self {
            infile: infile.into(),
            outfile: outfile.into(),
            inconfig: "{}".to_string(),
            outconfig: "{}".to_string(),
            mpi: false,
        }
    }
}

/// Copy `options.infile` to `options.outfile`
///
/// The distribution strategy comes from `OPENPMD_CHUNK_DISTRIBUTION`.
pub fn run(options: &PipeOptions) -> Result<CopyStats> {
    if options.mpi {
        return Err(PipeError::configuration(
            "distributed runs need a message-passing communicator; this build only supports serial runs",
        )
        .into());
    }

    let config = PipeConfig::from_env()?;
    // parsed for validation and warnings, the reader has no tunables
    BackendConfig::parse(&options.inconfig).context("invalid --inconfig")?;
    let outconfig = BackendConfig::parse(&options.outconfig).context("invalid --outconfig")?;

    let source = MemoryStore::open(&options.infile)
        .with_context(|| format!("cannot open {}", options.infile.display()))?;
    let sink = MemoryStore::create(&options.outfile);
    match HostInfo::Hostname.local() {
        Ok(host) => sink.set_source_host(outconfig.json.source_id, host),
        Err(e) => tracing::warn!(error = %e, "cannot determine hostname, rank table not written"),
    }

    tracing::info!(
        infile = %options.infile.display(),
        outfile = %options.outfile.display(),
        strategy = %config.strategy,
        "starting pipe"
    );

    let mut reader = MemoryReader::new(source);
    let pretty = outconfig.json.pretty;
    let mut writer = MemoryWriter::new(sink.clone(), outconfig.json);
    let stats = Copier::serial(config)?.run(&mut reader, &mut writer)?;
    writer.finish()?;

    tracing::info!(
        iterations = stats.iterations,
        bytes = stats.bytes_loaded,
        pretty,
        "pipe finished"
    );
    Ok(stats)
}
