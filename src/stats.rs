use crate::entity::EntityType;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected while scanning a dump
#[derive(Debug, Default)]
pub struct ScanStats {
    pub lines_read: AtomicU64,
    pub items_found: AtomicU64,
    pub properties_found: AtomicU64,
    pub lexemes_found: AtomicU64,
    pub malformed_lines: AtomicU64,
    pub entities_matched: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_lines(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_entity(&self, entity_type: EntityType) {
        let counter = match entity_type {
            EntityType::Item => &self.items_found,
            EntityType::Property => &self.properties_found,
            EntityType::Lexeme => &self.lexemes_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_matched(&self) {
        self.entities_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lines(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn items(&self) -> u64 {
        self.items_found.load(Ordering::Relaxed)
    }

    pub fn properties(&self) -> u64 {
        self.properties_found.load(Ordering::Relaxed)
    }

    pub fn lexemes(&self) -> u64 {
        self.lexemes_found.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed_lines.load(Ordering::Relaxed)
    }

    pub fn matched(&self) -> u64 {
        self.entities_matched.load(Ordering::Relaxed)
    }

    /// Entities that parsed into a known type
    pub fn entities(&self) -> u64 {
        self.items() + self.properties() + self.lexemes()
    }
}
