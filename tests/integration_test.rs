//! Integration tests for reading Wikidata dumps and interpreting their entities.
//!
//! Tests are organized into logical sections:
//!
//! - **Reader Tests** -- compression sniffing, array and bare layouts, malformed lines
//! - **Entity Tests** -- typed access to entities streamed from a compressed dump
//! - **Scan Tests** -- the truthy filter pipeline end to end
//!
//! # Test Strategy
//!
//! All tests share a `sample_entities()` fixture: one item with ranked claims, one
//! property and one lexeme, shaped like the entities in a real dump. Fixtures are written
//! with real `bzip2` and `flate2` encoders so the reader sees the same bytes it would in
//! production.

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use icarus::claim::Rank;
use icarus::dump::{DumpReader, WikidataJsonDump};
use icarus::entity::{Entity, HasClaims, Terms};
use icarus::scan::{scan_dump, ScanOptions, TruthyFilter};
use icarus::Error;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

fn statement(id: &str, property: &str, qid: &str, rank: &str) -> Value {
    json!({
        "id": id,
        "type": "statement",
        "rank": rank,
        "mainsnak": {
            "snaktype": "value",
            "property": property,
            "datatype": "wikibase-item",
            "datavalue": {
                "type": "wikibase-entityid",
                "value": {"entity-type": "item", "numeric-id": qid[1..].parse::<u64>().unwrap(), "id": qid}
            }
        }
    })
}

/// Q42 with two P69 claims (normal then preferred), a P31 claim and an enwiki sitelink,
/// P31 as a property and L7 as a lexeme.
fn sample_entities() -> Vec<Value> {
    vec![
        json!({
            "id": "Q42",
            "type": "item",
            "labels": {"en": {"language": "en", "value": "Douglas Adams"}},
            "descriptions": {"en": {"language": "en", "value": "English writer and humorist"}},
            "aliases": {"en": [{"language": "en", "value": "Douglas Noel Adams"}]},
            "claims": {
                "P31": [statement("Q42$1", "P31", "Q5", "normal")],
                "P69": [
                    statement("Q42$2", "P69", "Q691283", "normal"),
                    statement("Q42$3", "P69", "Q4961791", "preferred")
                ]
            },
            "sitelinks": {
                "enwiki": {"site": "enwiki", "title": "Douglas Adams", "badges": []}
            }
        }),
        json!({
            "id": "P31",
            "type": "property",
            "datatype": "wikibase-item",
            "labels": {"en": {"language": "en", "value": "instance of"}},
            "claims": {}
        }),
        json!({
            "id": "L7",
            "type": "lexeme",
            "lemmas": {"en": {"language": "en", "value": "cat"}},
            "language": "Q1860",
            "lexicalCategory": "Q1084",
            "claims": [],
            "forms": [],
            "senses": []
        }),
    ]
}

/// Dump body in the published layout: `[`, one entity per line joined by `,\n`, `]`.
fn dump_body(entities: &[Value]) -> String {
    let lines: Vec<String> = entities.iter().map(Value::to_string).collect();
    format!("[\n{}\n]\n", lines.join(",\n"))
}

fn bz2_bytes(body: &str) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::fast());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn gz_bytes(body: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(body.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

fn read_all(path: &Path) -> Vec<Value> {
    DumpReader::open(path)
        .unwrap()
        .collect::<icarus::Result<Vec<_>>>()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Reader Tests
// ---------------------------------------------------------------------------

#[test]
fn test_reads_all_three_compressions() {
    let dir = TempDir::new().unwrap();
    let body = dump_body(&sample_entities());
    let paths = [
        write_fixture(&dir, "plain.json", body.as_bytes()),
        write_fixture(&dir, "gzip.json.gz", &gz_bytes(&body)),
        write_fixture(&dir, "bzip.json.bz2", &bz2_bytes(&body)),
    ];

    for path in &paths {
        assert_eq!(read_all(path), sample_entities(), "{}", path.display());
    }
}

#[test]
fn test_bare_line_delimited_input() {
    let dir = TempDir::new().unwrap();
    let body: String = sample_entities()
        .iter()
        .map(|e| format!("{e}\n"))
        .collect();
    let path = write_fixture(&dir, "bare.json", body.as_bytes());

    assert_eq!(read_all(&path), sample_entities());
}

#[test]
fn test_empty_dump_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "empty.json.bz2", &bz2_bytes("[\n]\n"));
    assert!(read_all(&path).is_empty());
}

#[test]
fn test_multi_member_streams_are_read_to_the_end() {
    let dir = TempDir::new().unwrap();
    let entities = sample_entities();
    let first = format!("[\n{},\n", entities[0]);
    let second = format!("{},\n{}\n]\n", entities[1], entities[2]);

    let mut gz = gz_bytes(&first);
    gz.extend(gz_bytes(&second));
    let mut bz = bz2_bytes(&first);
    bz.extend(bz2_bytes(&second));

    let gz_path = write_fixture(&dir, "multi.json.gz", &gz);
    let bz_path = write_fixture(&dir, "multi.json.bz2", &bz);

    assert_eq!(read_all(&gz_path), entities);
    assert_eq!(read_all(&bz_path), entities);
}

#[test]
fn test_malformed_line_is_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    let entities = sample_entities();
    let body = format!(
        "[\n{},\n{{\"id\": \"Q1\",\n{}\n]\n",
        entities[0], entities[1]
    );
    let path = write_fixture(&dir, "broken.json", body.as_bytes());

    let results: Vec<_> = DumpReader::open(&path).unwrap().collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap()["id"], "Q42");
    assert!(matches!(
        results[1],
        Err(Error::MalformedDumpLine { line_number: 3, .. })
    ));
    assert_eq!(results[2].as_ref().unwrap()["id"], "P31");
}

#[test]
fn test_non_object_line_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "numbers.json", b"[\n1,\n{\"id\":\"Q1\",\"type\":\"item\"}\n]\n");

    let results: Vec<_> = DumpReader::open(&path).unwrap().collect();
    assert!(matches!(results[0], Err(Error::MalformedDumpLine { .. })));
    assert!(results[1].is_ok());
}

#[test]
fn test_unsupported_extension() {
    let tmp = NamedTempFile::new().unwrap();
    assert!(matches!(
        DumpReader::open(tmp.path()),
        Err(Error::UnsupportedCompression { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let dump = WikidataJsonDump::new(dir.path().join("absent.json.bz2")).unwrap();
    assert!(matches!(dump.open(), Err(Error::Io(_))));
}

#[test]
fn test_reopen_restarts_from_the_beginning() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "restart.json.bz2",
        &bz2_bytes(&dump_body(&sample_entities())),
    );
    let dump = WikidataJsonDump::new(&path).unwrap();

    let first = dump.open().unwrap().next().unwrap().unwrap();
    let again = dump.open().unwrap().next().unwrap().unwrap();
    assert_eq!(first["id"], "Q42");
    assert_eq!(again, first);
}

#[test]
fn test_iter_lines_returns_normalised_text() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "lines.json.gz",
        &gz_bytes(&dump_body(&sample_entities())),
    );
    let lines: Vec<String> = WikidataJsonDump::new(&path)
        .unwrap()
        .iter_lines()
        .unwrap()
        .collect::<icarus::Result<_>>()
        .unwrap();

    assert_eq!(lines.len(), 3);
    for (line, entity) in lines.iter().zip(sample_entities()) {
        assert!(line.starts_with('{') && line.ends_with('}'));
        assert_eq!(serde_json::from_str::<Value>(line).unwrap(), entity);
    }
}

// ---------------------------------------------------------------------------
// Entity Tests
// ---------------------------------------------------------------------------

#[test]
fn test_entities_from_compressed_dump() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "entities.json.bz2",
        &bz2_bytes(&dump_body(&sample_entities())),
    );

    let entities: Vec<Entity> = DumpReader::open(&path)
        .unwrap()
        .map(|raw| Entity::from_value(raw.unwrap()).unwrap())
        .collect();

    let Entity::Item(item) = &entities[0] else {
        panic!("expected an item");
    };
    assert_eq!(item.entity_id(), "Q42");
    assert_eq!(item.get_label("en"), "Douglas Adams");
    assert_eq!(item.get_aliases("en"), vec!["Douglas Noel Adams"]);
    assert_eq!(item.get_enwiki_title(), "Douglas Adams");

    let educated_at = item.get_claim_group("P69").unwrap();
    assert_eq!(educated_at.len(), 2);
    let truthy = item.get_truthy_claim_group("P69").unwrap();
    assert_eq!(truthy.len(), 1);
    assert_eq!(truthy[0].rank, Rank::Preferred);
    assert_eq!(
        truthy[0].main_snak.datavalue.as_ref().and_then(|dv| dv.as_entity_id()),
        Some("Q4961791")
    );

    let Entity::Property(property) = &entities[1] else {
        panic!("expected a property");
    };
    assert_eq!(property.datatype(), "wikibase-item");
    assert!(property.get_claim_groups().unwrap().is_empty());

    let Entity::Lexeme(lexeme) = &entities[2] else {
        panic!("expected a lexeme");
    };
    assert_eq!(lexeme.get_lemma("en"), "cat");
    assert!(lexeme.get_forms().unwrap().is_empty());
    assert!(lexeme.get_claim_groups().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Scan Tests
// ---------------------------------------------------------------------------

#[test]
fn test_scan_keeps_truthy_matches_only() {
    let dir = TempDir::new().unwrap();
    let input = write_fixture(
        &dir,
        "scan.json.bz2",
        &bz2_bytes(&dump_body(&sample_entities())),
    );

    // Q691283 is only a normal-rank value, outranked by the preferred claim
    let outranked = ScanOptions {
        filter: Some(TruthyFilter::new("P69", "Q691283")),
        ..ScanOptions::default()
    };
    assert_eq!(scan_dump(&input, &outranked).unwrap().matched(), 0);

    let output = dir.path().join("educated.json.gz");
    let preferred = ScanOptions {
        filter: Some(TruthyFilter::new("P69", "Q4961791")),
        output: Some(output.clone()),
        ..ScanOptions::default()
    };
    let stats = scan_dump(&input, &preferred).unwrap();
    assert_eq!(stats.items(), 1);
    assert_eq!(stats.properties(), 1);
    assert_eq!(stats.lexemes(), 1);
    assert_eq!(stats.matched(), 1);

    let written = read_all(&output);
    assert_eq!(written, vec![sample_entities()[0].clone()]);
}
