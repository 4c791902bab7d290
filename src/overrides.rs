//! Static overrides loaded from the records file.
//!
//! The file holds one `domain=ip.v4.addr` record per line. Names listed here
//! are answered immediately, before the engine touches the network.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::debug;

use crate::error::ResolveError;
use crate::resolver::normalize;

/// Exact-name answers that short-circuit resolution.
///
/// Read-only after load; safe to share across handler tasks.
#[derive(Debug, Default)]
pub struct StaticOverrides {
    entries: HashMap<String, Ipv4Addr>,
}

impl StaticOverrides {
    /// Load overrides from a records file.
    ///
    /// A missing file or a malformed line is a startup error.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ResolveError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let overrides = Self::parse(&text)
            .map_err(|e| ResolveError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(
            path = %path.display(),
            entries = overrides.len(),
            "loaded static overrides"
        );
        Ok(overrides)
    }

    /// Parse records from text, one `domain=ip` per line.
    ///
    /// Lines are split on the first `=`; empty lines are skipped.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut entries = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (domain, address) = line
                .split_once('=')
                .ok_or_else(|| format!("line {}: expected domain=address", idx + 1))?;
            let address: Ipv4Addr = address
                .trim()
                .parse()
                .map_err(|e| format!("line {}: bad address: {}", idx + 1, e))?;

            entries.insert(normalize(domain), address);
        }

        Ok(Self { entries })
    }

    /// Look up an exact normalized name.
    pub fn lookup(&self, domain: &str) -> Option<Ipv4Addr> {
        self.entries.get(domain).copied()
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no records are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
