//! Icarus: streaming Wikidata JSON dump reader, chunker and typed entity model
//!
//! This crate reads multi-gigabyte Wikidata dumps one entity at a time and interprets the
//! loosely typed entity documents on demand:
//!
//! 1. **Dump Reader** -- Stream `.json`, `.json.gz` or `.json.bz2` dumps line by line,
//!    yielding one JSON object per entity without materializing the file
//! 2. **Chunker** -- Re-segment a dump into smaller files that the same reader can open
//!    on their own
//! 3. **Entity Model** -- Items, properties and lexemes backed by their raw document, with
//!    labels, claims and sitelinks extracted on each accessor call
//! 4. **Truthy Filter** -- Reduce a claim group to its best-ranked, non-deprecated claims
//!
//! # Key Modules
//!
//! - [`dump`] -- Streaming reader, dump writer and chunking
//! - [`entity`] -- Item, Property, Lexeme, Form and Sense accessors
//! - [`claim`] -- Claims, qualifiers, references, ranks and claim groups
//! - [`snak`] -- Property/value assertions
//! - [`datavalue`] -- The typed value variants (time, quantity, coordinates, ...)
//! - [`scan`] -- Single-pass dump scan with truthy filtering
//! - [`stats`] -- Atomic counters for scan metrics
//! - [`config`] -- Constants for buffers, chunking and defaults
//!
//! # Example Usage
//!
//! ```bash
//! # Keep every human (P31 = Q5) from the first million entities
//! icarus scan -i wikidata-20240101-all.json.bz2 --limit 1000000 \
//!     --property P31 --value Q5 --output humans.json.bz2
//!
//! # Split a dump into files of 10k entities
//! icarus chunk -i wikidata-20240101-all.json.bz2 --lines-per-chunk 10000
//! ```

pub mod claim;
pub mod config;
pub mod datavalue;
pub mod dump;
pub mod entity;
pub mod error;
pub mod scan;
pub mod snak;
pub mod stats;

pub use claim::{Claim, ClaimGroup, Qualifier, Rank, Reference};
pub use datavalue::DataValue;
pub use dump::{ChunkOptions, Compression, DumpReader, DumpWriter, WikidataJsonDump};
pub use entity::{Entity, EntityType, HasClaims, Item, Lexeme, Property, Terms};
pub use error::{Error, Result};
pub use snak::{Snak, SnakType};
