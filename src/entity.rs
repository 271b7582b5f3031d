//! Items, properties and lexemes backed by their raw JSON document.
//!
//! Only the entity id is extracted at construction. Labels, claims, sitelinks, forms and
//! senses are read from the backing document on every accessor call and never cached,
//! so a bulk scan that only looks at ids pays nothing for the rest. Missing languages,
//! properties and sitelinks yield empty values; structurally broken claims are errors.

use crate::claim::ClaimGroup;
use crate::config::DEFAULT_LANGUAGE;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Item,
    Property,
    Lexeme,
}

impl EntityType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(EntityType::Item),
            "property" => Some(EntityType::Property),
            "lexeme" => Some(EntityType::Lexeme),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Item => "item",
            EntityType::Property => "property",
            EntityType::Lexeme => "lexeme",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sitelink {
    #[serde(default)]
    pub site: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// `value` of the `lang` entry in a language-keyed term map, or "".
fn term<'a>(terms: Option<&'a Value>, lang: &str) -> &'a str {
    terms
        .and_then(|t| t.get(lang))
        .and_then(|t| t.get("value"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn str_field<'a>(raw: &'a Value, key: &str) -> &'a str {
    raw.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Validates the id and type of a raw entity document and returns the id.
fn entity_id_of(raw: &Value, expected: EntityType) -> Result<String> {
    if !raw.is_object() {
        return Err(Error::invalid("entity", "expected a JSON object"));
    }
    let id = raw.get("id").and_then(Value::as_str).ok_or(Error::MissingKey {
        context: "entity",
        key: "id",
    })?;
    let found = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or(Error::MissingKey {
            context: "entity",
            key: "type",
        })?;
    if found != expected.as_str() {
        return Err(Error::EntityTypeMismatch {
            expected: expected.as_str(),
            found: found.to_string(),
        });
    }
    Ok(id.to_string())
}

/// Claim-group access for anything carrying a `claims` mapping: items, properties,
/// lexemes and their forms and senses.
pub trait HasClaims {
    /// The raw `claims` mapping, `None` when absent or empty.
    fn raw_claims(&self) -> Option<&Map<String, Value>>;

    fn get_claim_groups(&self) -> Result<IndexMap<String, ClaimGroup>> {
        let Some(claims) = self.raw_claims() else {
            return Ok(IndexMap::new());
        };
        claims
            .iter()
            .map(|(property_id, list)| {
                ClaimGroup::from_value(list).map(|group| (property_id.clone(), group))
            })
            .collect()
    }

    /// Claims for one property; an absent property gives an empty group.
    fn get_claim_group(&self, property_id: &str) -> Result<ClaimGroup> {
        match self.raw_claims().and_then(|c| c.get(property_id)) {
            Some(list) => ClaimGroup::from_value(list),
            None => Ok(ClaimGroup::empty()),
        }
    }

    /// Truthy claims per property. Each property is resolved independently.
    fn get_truthy_claim_groups(&self) -> Result<IndexMap<String, ClaimGroup>> {
        Ok(self
            .get_claim_groups()?
            .into_iter()
            .map(|(property_id, group)| (property_id, group.into_truthy()))
            .collect())
    }

    fn get_truthy_claim_group(&self, property_id: &str) -> Result<ClaimGroup> {
        Ok(self.get_claim_group(property_id)?.into_truthy())
    }
}

/// Labels, descriptions and aliases, shared by items and properties.
pub trait Terms {
    fn raw(&self) -> &Value;

    fn get_label(&self, lang: &str) -> &str {
        term(self.raw().get("labels"), lang)
    }

    fn get_description(&self, lang: &str) -> &str {
        term(self.raw().get("descriptions"), lang)
    }

    fn get_aliases(&self, lang: &str) -> Vec<&str> {
        self.raw()
            .get("aliases")
            .and_then(|a| a.get(lang))
            .and_then(Value::as_array)
            .map(|aliases| {
                aliases
                    .iter()
                    .filter_map(|a| a.get("value").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    entity_id: String,
    raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    entity_id: String,
    raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    entity_id: String,
    raw: Value,
}

/// A form of a lexeme, borrowed from the lexeme's document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Form<'a> {
    pub form_id: &'a str,
    raw: &'a Value,
}

/// A sense of a lexeme, borrowed from the lexeme's document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sense<'a> {
    pub sense_id: &'a str,
    raw: &'a Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Item(Item),
    Property(Property),
    Lexeme(Lexeme),
}

impl Item {
    pub fn from_value(raw: Value) -> Result<Self> {
        let entity_id = entity_id_of(&raw, EntityType::Item)?;
        Ok(Self { entity_id, raw })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_type(&self) -> EntityType {
        EntityType::Item
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn get_sitelinks(&self) -> Result<IndexMap<String, Sitelink>> {
        self.get_sitelinks_with_prefix("")
    }

    /// Sitelinks whose site key starts with `prefix` ("en", "enwiki", ...).
    pub fn get_sitelinks_with_prefix(&self, prefix: &str) -> Result<IndexMap<String, Sitelink>> {
        let Some(sitelinks) = self.raw.get("sitelinks").and_then(Value::as_object) else {
            return Ok(IndexMap::new());
        };
        sitelinks
            .iter()
            .filter(|(site, _)| site.starts_with(prefix))
            .map(|(site, link)| -> Result<(String, Sitelink)> {
                let mut sitelink = Sitelink::deserialize(link)
                    .map_err(|e| Error::invalid("sitelink", format!("{site}: {e}")))?;
                if sitelink.site.is_empty() {
                    sitelink.site = site.clone();
                }
                Ok((site.clone(), sitelink))
            })
            .collect()
    }

    pub fn get_enwiki_title(&self) -> &str {
        self.raw
            .get("sitelinks")
            .and_then(|s| s.get("enwiki"))
            .map(|link| str_field(link, "title"))
            .unwrap_or("")
    }
}

impl Property {
    pub fn from_value(raw: Value) -> Result<Self> {
        let entity_id = entity_id_of(&raw, EntityType::Property)?;
        Ok(Self { entity_id, raw })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_type(&self) -> EntityType {
        EntityType::Property
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Declared datatype of values for this property ("wikibase-item", "time", ...).
    pub fn datatype(&self) -> &str {
        str_field(&self.raw, "datatype")
    }
}

impl Lexeme {
    pub fn from_value(raw: Value) -> Result<Self> {
        let entity_id = entity_id_of(&raw, EntityType::Lexeme)?;
        Ok(Self { entity_id, raw })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn entity_type(&self) -> EntityType {
        EntityType::Lexeme
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn get_lemma(&self, lang: &str) -> &str {
        term(self.raw.get("lemmas"), lang)
    }

    /// Item id of the lexeme's language.
    pub fn language(&self) -> &str {
        str_field(&self.raw, "language")
    }

    pub fn lexical_category(&self) -> &str {
        str_field(&self.raw, "lexicalCategory")
    }

    pub fn get_forms(&self) -> Result<Vec<Form<'_>>> {
        self.sub_entities("forms")
            .iter()
            .map(Form::from_value)
            .collect()
    }

    pub fn get_senses(&self) -> Result<Vec<Sense<'_>>> {
        self.sub_entities("senses")
            .iter()
            .map(Sense::from_value)
            .collect()
    }

    fn sub_entities(&self, key: &str) -> &[Value] {
        self.raw
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl<'a> Form<'a> {
    pub fn from_value(raw: &'a Value) -> Result<Self> {
        let form_id = raw.get("id").and_then(Value::as_str).ok_or(Error::MissingKey {
            context: "form",
            key: "id",
        })?;
        Ok(Self { form_id, raw })
    }

    pub fn get_representation(&self, lang: &str) -> &'a str {
        term(self.raw.get("representations"), lang)
    }

    /// Item ids of grammatical features (tense, person, number, ...).
    pub fn grammatical_features(&self) -> Vec<&'a str> {
        self.raw
            .get("grammaticalFeatures")
            .and_then(Value::as_array)
            .map(|f| f.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl<'a> Sense<'a> {
    pub fn from_value(raw: &'a Value) -> Result<Self> {
        let sense_id = raw.get("id").and_then(Value::as_str).ok_or(Error::MissingKey {
            context: "sense",
            key: "id",
        })?;
        Ok(Self { sense_id, raw })
    }

    pub fn get_gloss(&self, lang: &str) -> &'a str {
        term(self.raw.get("glosses"), lang)
    }
}

impl Entity {
    /// Builds the variant named by the document's `type`.
    pub fn from_value(raw: Value) -> Result<Self> {
        let kind = raw.get("type").and_then(Value::as_str).ok_or(Error::MissingKey {
            context: "entity",
            key: "type",
        })?;
        let parsed = EntityType::parse(kind);
        match parsed {
            Some(EntityType::Item) => Item::from_value(raw).map(Entity::Item),
            Some(EntityType::Property) => Property::from_value(raw).map(Entity::Property),
            Some(EntityType::Lexeme) => Lexeme::from_value(raw).map(Entity::Lexeme),
            None => Err(Error::invalid(
                "entity",
                format!("unsupported entity type `{}`", str_field(&raw, "type")),
            )),
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Entity::Item(e) => e.entity_id(),
            Entity::Property(e) => e.entity_id(),
            Entity::Lexeme(e) => e.entity_id(),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Item(_) => EntityType::Item,
            Entity::Property(_) => EntityType::Property,
            Entity::Lexeme(_) => EntityType::Lexeme,
        }
    }

    pub fn raw(&self) -> &Value {
        match self {
            Entity::Item(e) => &e.raw,
            Entity::Property(e) => &e.raw,
            Entity::Lexeme(e) => &e.raw,
        }
    }

    pub fn into_raw(self) -> Value {
        match self {
            Entity::Item(e) => e.raw,
            Entity::Property(e) => e.raw,
            Entity::Lexeme(e) => e.raw,
        }
    }
}

impl Terms for Item {
    fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Terms for Property {
    fn raw(&self) -> &Value {
        &self.raw
    }
}

macro_rules! claims_from_raw {
    ($($ty:ty),*) => {
        $(impl HasClaims for $ty {
            fn raw_claims(&self) -> Option<&Map<String, Value>> {
                self.raw.get("claims").and_then(Value::as_object)
            }
        })*
    };
}

claims_from_raw!(Item, Property, Lexeme, Form<'_>, Sense<'_>);

impl HasClaims for Entity {
    fn raw_claims(&self) -> Option<&Map<String, Value>> {
        self.raw().get("claims").and_then(Value::as_object)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item(label={}, id={}, description={}, aliases={:?}, enwiki_title={})",
            self.get_label(DEFAULT_LANGUAGE),
            self.entity_id,
            self.get_description(DEFAULT_LANGUAGE),
            self.get_aliases(DEFAULT_LANGUAGE),
            self.get_enwiki_title()
        )
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property(label={}, id={}, description={}, aliases={:?})",
            self.get_label(DEFAULT_LANGUAGE),
            self.entity_id,
            self.get_description(DEFAULT_LANGUAGE),
            self.get_aliases(DEFAULT_LANGUAGE)
        )
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexeme(lemma={}, id={}, language={}, lexical_category={}, forms={}, senses={})",
            self.get_lemma(DEFAULT_LANGUAGE),
            self.entity_id,
            self.language(),
            self.lexical_category(),
            self.sub_entities("forms").len(),
            self.sub_entities("senses").len()
        )
    }
}

impl fmt::Display for Form<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Form(form_id={}, representation={}, grammatical_features={:?})",
            self.form_id,
            self.get_representation(DEFAULT_LANGUAGE),
            self.grammatical_features()
        )
    }
}

impl fmt::Display for Sense<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sense(sense_id={}, gloss={})",
            self.sense_id,
            self.get_gloss(DEFAULT_LANGUAGE)
        )
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Item(e) => e.fmt(f),
            Entity::Property(e) => e.fmt(f),
            Entity::Lexeme(e) => e.fmt(f),
        }
    }
}
