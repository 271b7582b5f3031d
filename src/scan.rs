//! Single pass over a dump: classify entities, count malformed lines and optionally
//! keep the entities whose truthy claims point at a given value.

use crate::config::PROGRESS_INTERVAL;
use crate::dump::{DumpWriter, WikidataJsonDump};
use crate::entity::{Entity, HasClaims};
use crate::error::Error;
use crate::stats::ScanStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Selects entities whose truthy claims for `property_id` include the entity `value_id`,
/// e.g. P31 = Q5 for humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthyFilter {
    pub property_id: String,
    pub value_id: String,
}

impl TruthyFilter {
    pub fn new(property_id: impl Into<String>, value_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            value_id: value_id.into(),
        }
    }

    pub fn matches(&self, entity: &impl HasClaims) -> crate::Result<bool> {
        let group = entity.get_truthy_claim_group(&self.property_id)?;
        Ok(group.iter().any(|claim| {
            claim
                .main_snak
                .datavalue
                .as_ref()
                .and_then(|dv| dv.as_entity_id())
                == Some(self.value_id.as_str())
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Stop after this many entity lines.
    pub limit: Option<u64>,
    /// Without a filter every parsed entity matches.
    pub filter: Option<TruthyFilter>,
    /// Matching entities are written here as a dump.
    pub output: Option<PathBuf>,
}

pub fn scan_dump(path: impl AsRef<Path>, options: &ScanOptions) -> Result<ScanStats> {
    let path = path.as_ref();
    let dump = WikidataJsonDump::new(path)
        .with_context(|| format!("Unsupported dump file: {}", path.display()))?;
    let reader = dump
        .open()
        .with_context(|| format!("Failed to open dump at: {}", path.display()))?;

    let mut writer = match &options.output {
        Some(out) => Some(
            DumpWriter::create(out)
                .with_context(|| format!("Failed to create output dump: {}", out.display()))?,
        ),
        None => None,
    };

    let stats = ScanStats::new();
    let pb = ProgressBar::new_spinner();

    info!("Scanning dump: {}", path.display());

    for result in reader {
        if options.limit.is_some_and(|limit| stats.lines() >= limit) {
            break;
        }
        stats.inc_lines();
        if stats.lines() % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e @ Error::MalformedDumpLine { .. }) => {
                warn!(error = %e, "Skipping malformed line");
                stats.inc_malformed();
                continue;
            }
            Err(e) => {
                pb.finish_and_clear();
                return Err(e).with_context(|| format!("Failed reading dump: {}", path.display()));
            }
        };

        let entity = match Entity::from_value(raw) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(line = stats.lines(), error = %e, "Skipping unparseable entity");
                stats.inc_malformed();
                continue;
            }
        };
        stats.inc_entity(entity.entity_type());

        let matched = match &options.filter {
            Some(filter) => match filter.matches(&entity) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(id = entity.entity_id(), error = %e, "Skipping entity with malformed claims");
                    stats.inc_malformed();
                    continue;
                }
            },
            None => true,
        };
        if !matched {
            continue;
        }
        stats.inc_matched();

        if let Some(w) = writer.as_mut() {
            w.write_entity(entity.raw())
                .with_context(|| format!("Failed to write entity {}", entity.entity_id()))?;
        }
    }

    pb.finish_and_clear();

    if let Some(w) = writer {
        let out = w.finish().context("Failed to finish output dump")?;
        info!(path = ?out, entities = stats.matched(), "Output dump written");
    }

    info!(
        lines = stats.lines(),
        items = stats.items(),
        properties = stats.properties(),
        lexemes = stats.lexemes(),
        malformed = stats.malformed(),
        matched = stats.matched(),
        "Scan complete"
    );

    Ok(stats)
}
