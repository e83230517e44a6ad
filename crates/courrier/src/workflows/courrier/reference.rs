use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::domain::{CourrierType, Reference};

const SEQUENCE_WIDTH: usize = 5;

/// Issues references of the form `ENT-2025-00001` / `SOR-2025-00001`.
///
/// Sequences are kept per direction and year, so references sort in issue
/// order within a partition. Seed the generator from the store on startup so
/// numbering resumes after the highest reference already issued.
#[derive(Debug, Default)]
pub struct ReferenceGenerator {
    counters: Mutex<HashMap<(CourrierType, i32), u32>>,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a Reference>,
    {
        let generator = Self::new();
        for reference in existing {
            generator.observe(reference);
        }
        generator
    }

    /// Record an externally known reference so later sequences skip past it.
    /// References in any other format are ignored.
    pub fn observe(&self, reference: &Reference) {
        let Some((courrier_type, year, sequence)) = parse(reference.as_str()) else {
            return;
        };

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let current = counters.entry((courrier_type, year)).or_insert(0);
        if sequence > *current {
            *current = sequence;
        }
    }

    pub fn next(&self, courrier_type: CourrierType, year: i32) -> Reference {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = counters.entry((courrier_type, year)).or_insert(0);
        *slot = slot.saturating_add(1);
        let sequence = *slot;

        Reference(format!(
            "{}-{year:04}-{:0width$}",
            courrier_type.reference_prefix(),
            sequence,
            width = SEQUENCE_WIDTH
        ))
    }
}

/// Split a generated reference into its direction, year and sequence.
pub fn parse(reference: &str) -> Option<(CourrierType, i32, u32)> {
    let mut parts = reference.trim().splitn(3, '-');
    let courrier_type = match parts.next()? {
        "ENT" => CourrierType::Entrant,
        "SOR" => CourrierType::Sortant,
        _ => return None,
    };
    let year = parts.next()?.parse::<i32>().ok()?;
    let sequence = parts.next()?.parse::<u32>().ok()?;
    Some((courrier_type, year, sequence))
}
