//! Claims (statements), their qualifiers and references, and per-property claim groups.

use crate::error::{Error, Result};
use crate::snak::Snak;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Preferred,
    Normal,
    Deprecated,
}

impl Rank {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "preferred" => Some(Rank::Preferred),
            "normal" => Some(Rank::Normal),
            "deprecated" => Some(Rank::Deprecated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Preferred => "preferred",
            Rank::Normal => "normal",
            Rank::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    /// Opaque identity hash supplied by the source.
    pub hash: String,
    pub snak: Snak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub hash: String,
    /// Snaks per property id, iterated in `snaks_order`.
    pub snaks: IndexMap<String, Vec<Snak>>,
    pub snaks_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub id: Option<String>,
    /// "statement" or "claim"
    pub claim_type: Option<String>,
    pub rank: Rank,
    pub main_snak: Snak,
    pub qualifiers: IndexMap<String, Vec<Qualifier>>,
    pub qualifiers_order: Vec<String>,
    pub references: Vec<Reference>,
}

/// Ordered claims sharing one property id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClaimGroup {
    /// `None` only when the group was built from no claims at all.
    pub property_id: Option<String>,
    claims: Vec<Claim>,
}

fn required_str<'a>(raw: &'a Value, context: &'static str, key: &'static str) -> Result<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .ok_or(Error::MissingKey { context, key })
}

fn optional_string(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Explicit order list if the source gave one, else the map's own key order.
fn declared_order(
    map: &Map<String, Value>,
    order: Option<&Value>,
    context: &'static str,
) -> Result<Vec<String>> {
    match order {
        Some(Value::Array(ids)) => ids
            .iter()
            .map(|id| {
                id.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::invalid(context, format!("non-string order entry {id}")))
            })
            .collect(),
        Some(Value::Null) | None => Ok(map.keys().cloned().collect()),
        Some(other) => Err(Error::invalid(
            context,
            format!("order must be a list, found {other}"),
        )),
    }
}

/// Groups `map` entries by property id following `order`. Keys the order list omits
/// are appended afterwards in map order.
fn group_by_property<T>(
    map: &Map<String, Value>,
    order: &[String],
    context: &'static str,
    parse: impl Fn(&Value) -> Result<T>,
) -> Result<IndexMap<String, Vec<T>>> {
    let mut grouped = IndexMap::with_capacity(map.len());
    let remaining = map.keys().filter(|k| !order.contains(k));

    for property_id in order.iter().chain(remaining) {
        if grouped.contains_key(property_id) {
            continue;
        }
        let entries = map.get(property_id).ok_or_else(|| {
            Error::invalid(context, format!("order names `{property_id}` but it has no entries"))
        })?;
        let entries = entries.as_array().ok_or_else(|| {
            Error::invalid(context, format!("entries for `{property_id}` must be a list"))
        })?;
        let parsed = entries.iter().map(&parse).collect::<Result<Vec<_>>>()?;
        grouped.insert(property_id.clone(), parsed);
    }

    Ok(grouped)
}

impl Qualifier {
    pub fn from_value(raw: &Value) -> Result<Self> {
        Ok(Self {
            hash: required_str(raw, "qualifier", "hash")?.to_string(),
            snak: Snak::from_value(raw)?,
        })
    }
}

impl Reference {
    pub fn from_value(raw: &Value) -> Result<Self> {
        let hash = required_str(raw, "reference", "hash")?.to_string();
        let empty = Map::new();
        let snaks_map = match raw.get("snaks") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => &empty,
            Some(other) => {
                return Err(Error::invalid(
                    "reference",
                    format!("snaks must be an object, found {other}"),
                ))
            }
        };
        let snaks_order = declared_order(snaks_map, raw.get("snaks-order"), "reference")?;
        let snaks = group_by_property(snaks_map, &snaks_order, "reference", Snak::from_value)?;

        Ok(Self {
            hash,
            snaks,
            snaks_order,
        })
    }

    /// All snaks in deterministic property order.
    pub fn iter_snaks(&self) -> impl Iterator<Item = &Snak> {
        self.snaks.values().flatten()
    }
}

impl Claim {
    pub fn from_value(raw: &Value) -> Result<Self> {
        let main_snak = Snak::from_value(raw.get("mainsnak").ok_or(Error::MissingKey {
            context: "claim",
            key: "mainsnak",
        })?)?;
        let rank_str = required_str(raw, "claim", "rank")?;
        let rank = Rank::parse(rank_str)
            .ok_or_else(|| Error::invalid("claim", format!("unknown rank `{rank_str}`")))?;

        let (qualifiers, qualifiers_order) = match raw.get("qualifiers") {
            Some(Value::Object(map)) => {
                let order = declared_order(map, raw.get("qualifiers-order"), "claim qualifiers")?;
                let grouped =
                    group_by_property(map, &order, "claim qualifiers", Qualifier::from_value)?;
                (grouped, order)
            }
            Some(Value::Null) | None => (IndexMap::new(), Vec::new()),
            Some(other) => {
                return Err(Error::invalid(
                    "claim",
                    format!("qualifiers must be an object, found {other}"),
                ))
            }
        };

        let references = match raw.get("references") {
            Some(Value::Array(refs)) => refs
                .iter()
                .map(Reference::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(Error::invalid(
                    "claim",
                    format!("references must be a list, found {other}"),
                ))
            }
        };

        Ok(Self {
            id: optional_string(raw, "id"),
            claim_type: optional_string(raw, "type"),
            rank,
            main_snak,
            qualifiers,
            qualifiers_order,
            references,
        })
    }

    pub fn property_id(&self) -> &str {
        &self.main_snak.property_id
    }

    pub fn iter_qualifiers(&self) -> impl Iterator<Item = &Qualifier> {
        self.qualifiers.values().flatten()
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Claim(type={}, rank={}, mainsnak={}, qualifiers={}, references={})",
            self.claim_type.as_deref().unwrap_or("None"),
            self.rank,
            self.main_snak,
            self.qualifiers.values().map(Vec::len).sum::<usize>(),
            self.references.len()
        )
    }
}

impl ClaimGroup {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps already-grouped claims. Claims for different properties are rejected.
    pub fn from_claims(claims: Vec<Claim>) -> Result<Self> {
        let property_id = claims.first().map(|c| c.property_id().to_string());
        if let Some(expected) = &property_id {
            if let Some(other) = claims.iter().find(|c| c.property_id() != expected.as_str()) {
                return Err(Error::invalid(
                    "claim group",
                    format!(
                        "claims for {expected} and {} cannot share a group",
                        other.property_id()
                    ),
                ));
            }
        }
        Ok(Self {
            property_id,
            claims,
        })
    }

    pub fn from_list(raw_claims: &[Value]) -> Result<Self> {
        let claims = raw_claims
            .iter()
            .map(Claim::from_value)
            .collect::<Result<Vec<_>>>()?;
        Self::from_claims(claims)
    }

    pub fn from_value(raw: &Value) -> Result<Self> {
        match raw {
            Value::Array(list) => Self::from_list(list),
            other => Err(Error::invalid(
                "claim group",
                format!("expected a list of claims, found {other}"),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Claim> {
        self.claims.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Claim> {
        self.claims.iter()
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Best non-deprecated claims: the preferred ones if any exist, else the normal ones.
    pub fn truthy(&self) -> ClaimGroup {
        self.clone().into_truthy()
    }

    pub fn into_truthy(mut self) -> ClaimGroup {
        let best = if self.claims.iter().any(|c| c.rank == Rank::Preferred) {
            Rank::Preferred
        } else {
            Rank::Normal
        };
        self.claims.retain(|c| c.rank == best);
        self
    }
}

impl Index<usize> for ClaimGroup {
    type Output = Claim;

    fn index(&self, index: usize) -> &Claim {
        &self.claims[index]
    }
}

impl IntoIterator for ClaimGroup {
    type Item = Claim;
    type IntoIter = std::vec::IntoIter<Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClaimGroup {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

impl fmt::Display for ClaimGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClaimGroup(property_id={}, claims={})",
            self.property_id.as_deref().unwrap_or("None"),
            self.claims.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_snak(property: &str, qid: &str) -> Value {
        json!({
            "snaktype": "value",
            "property": property,
            "datatype": "wikibase-item",
            "datavalue": {"type": "wikibase-entityid", "value": {"entity-type": "item", "id": qid}}
        })
    }

    fn claim(property: &str, qid: &str, rank: &str) -> Value {
        json!({
            "id": format!("Q42${qid}"),
            "type": "statement",
            "rank": rank,
            "mainsnak": item_snak(property, qid)
        })
    }

    fn group(claims: Vec<Value>) -> ClaimGroup {
        ClaimGroup::from_list(&claims).unwrap()
    }

    fn ids(group: &ClaimGroup) -> Vec<String> {
        group
            .iter()
            .map(|c| c.id.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn parses_claim_with_qualifiers_in_declared_order() {
        let raw = json!({
            "id": "Q42$1",
            "type": "statement",
            "rank": "normal",
            "mainsnak": item_snak("P69", "Q691283"),
            "qualifiers": {
                "P580": [{
                    "hash": "h580",
                    "snaktype": "value",
                    "property": "P580",
                    "datatype": "time",
                    "datavalue": {"type": "time", "value": {"time": "+1971-00-00T00:00:00Z", "precision": 9}}
                }],
                "P582": [{"hash": "h582", "snaktype": "novalue", "property": "P582"}]
            },
            "qualifiers-order": ["P582", "P580"]
        });

        let claim = Claim::from_value(&raw).unwrap();
        assert_eq!(claim.property_id(), "P69");
        assert_eq!(claim.rank, Rank::Normal);
        assert_eq!(claim.claim_type.as_deref(), Some("statement"));
        let order: Vec<_> = claim.qualifiers.keys().cloned().collect();
        assert_eq!(order, vec!["P582", "P580"]);
        assert_eq!(claim.qualifiers_order, vec!["P582", "P580"]);
        assert_eq!(claim.qualifiers["P582"][0].hash, "h582");
        assert!(claim.qualifiers["P582"][0].snak.datavalue.is_none());
        assert_eq!(claim.iter_qualifiers().count(), 2);
        assert!(claim.references.is_empty());
    }

    #[test]
    fn qualifiers_fall_back_to_dictionary_order() {
        let raw = json!({
            "rank": "normal",
            "mainsnak": item_snak("P69", "Q1"),
            "qualifiers": {
                "P812": [{"hash": "a", "snaktype": "somevalue", "property": "P812"}],
                "P512": [{"hash": "b", "snaktype": "somevalue", "property": "P512"}]
            }
        });
        let claim = Claim::from_value(&raw).unwrap();
        let order: Vec<_> = claim.qualifiers.keys().cloned().collect();
        assert_eq!(order, vec!["P812", "P512"]);
    }

    #[test]
    fn qualifiers_missing_from_order_are_kept() {
        let raw = json!({
            "rank": "normal",
            "mainsnak": item_snak("P69", "Q1"),
            "qualifiers": {
                "P1": [{"hash": "a", "snaktype": "novalue", "property": "P1"}],
                "P2": [{"hash": "b", "snaktype": "novalue", "property": "P2"}]
            },
            "qualifiers-order": ["P2"]
        });
        let claim = Claim::from_value(&raw).unwrap();
        let order: Vec<_> = claim.qualifiers.keys().cloned().collect();
        assert_eq!(order, vec!["P2", "P1"]);
    }

    #[test]
    fn qualifier_order_naming_absent_property_is_invalid() {
        let raw = json!({
            "rank": "normal",
            "mainsnak": item_snak("P69", "Q1"),
            "qualifiers": {},
            "qualifiers-order": ["P9"]
        });
        let err = Claim::from_value(&raw).unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
    }

    #[test]
    fn references_follow_snaks_order() {
        let raw = json!({
            "rank": "preferred",
            "mainsnak": item_snak("P69", "Q1"),
            "references": [{
                "hash": "r1",
                "snaks": {
                    "P248": [item_snak("P248", "Q5375741")],
                    "P854": [{
                        "snaktype": "value",
                        "property": "P854",
                        "datatype": "url",
                        "datavalue": {"type": "string", "value": "http://example.org"}
                    }]
                },
                "snaks-order": ["P854", "P248"]
            }]
        });
        let claim = Claim::from_value(&raw).unwrap();
        assert_eq!(claim.references.len(), 1);
        let reference = &claim.references[0];
        assert_eq!(reference.hash, "r1");
        assert_eq!(reference.snaks_order, vec!["P854", "P248"]);
        let props: Vec<_> = reference.iter_snaks().map(|s| s.property_id.as_str()).collect();
        assert_eq!(props, vec!["P854", "P248"]);
    }

    #[test]
    fn reference_without_hash_is_reported() {
        let err = Reference::from_value(&json!({"snaks": {}})).unwrap_err();
        assert!(matches!(err, Error::MissingKey { context: "reference", key: "hash" }));
    }

    #[test]
    fn rank_is_case_insensitive() {
        assert_eq!(Rank::parse("Preferred"), Some(Rank::Preferred));
        assert_eq!(Rank::parse("DEPRECATED"), Some(Rank::Deprecated));
        assert_eq!(Rank::parse("best"), None);
    }

    #[test]
    fn unknown_rank_is_invalid() {
        let err = Claim::from_value(&claim("P31", "Q5", "best")).unwrap_err();
        assert!(matches!(err, Error::Invalid { context: "claim", .. }));
    }

    #[test]
    fn missing_mainsnak_is_reported() {
        let err = Claim::from_value(&json!({"rank": "normal"})).unwrap_err();
        assert!(matches!(err, Error::MissingKey { key: "mainsnak", .. }));
    }

    #[test]
    fn group_preserves_source_order() {
        let g = group(vec![
            claim("P551", "Q1", "normal"),
            claim("P551", "Q2", "deprecated"),
            claim("P551", "Q3", "preferred"),
        ]);
        assert_eq!(g.property_id.as_deref(), Some("P551"));
        assert_eq!(g.len(), 3);
        assert_eq!(ids(&g), vec!["Q42$Q1", "Q42$Q2", "Q42$Q3"]);
        assert_eq!(g[2].rank, Rank::Preferred);
        assert_eq!(g.to_string(), "ClaimGroup(property_id=P551, claims=3)");
    }

    #[test]
    fn group_rejects_mixed_properties() {
        let err = ClaimGroup::from_list(&[claim("P1", "Q1", "normal"), claim("P2", "Q2", "normal")])
            .unwrap_err();
        assert!(matches!(err, Error::Invalid { context: "claim group", .. }));
    }

    #[test]
    fn empty_group() {
        let g = ClaimGroup::from_list(&[]).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.property_id, None);
        assert!(g.truthy().is_empty());
    }

    #[test]
    fn truthy_prefers_preferred() {
        let g = group(vec![
            claim("P69", "Q1", "normal"),
            claim("P69", "Q2", "preferred"),
            claim("P69", "Q3", "normal"),
        ]);
        let truthy = g.truthy();
        assert_eq!(ids(&truthy), vec!["Q42$Q2"]);
        assert_eq!(truthy.property_id.as_deref(), Some("P69"));
    }

    #[test]
    fn truthy_falls_back_to_normal() {
        let g = group(vec![
            claim("P69", "Q1", "normal"),
            claim("P69", "Q2", "deprecated"),
            claim("P69", "Q3", "normal"),
        ]);
        assert_eq!(ids(&g.into_truthy()), vec!["Q42$Q1", "Q42$Q3"]);
    }

    #[test]
    fn truthy_of_all_deprecated_is_empty() {
        let g = group(vec![
            claim("P69", "Q1", "deprecated"),
            claim("P69", "Q2", "deprecated"),
        ]);
        assert!(g.truthy().is_empty());
    }

    #[test]
    fn group_from_non_list_is_invalid() {
        let err = ClaimGroup::from_value(&json!({"not": "a list"})).unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
    }
}
