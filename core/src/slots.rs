use std::collections::BTreeMap;

/// Provider meal-slot names and the diet-plan slot each one lands in.
pub const DEFAULT_SLOT_MAPPING: [(&str, &str); 5] = [
    ("Śniadanie", "breakfast"),
    ("II śniadanie", "second_breakfast"),
    ("Obiad", "dinner"),
    ("Podwieczorek", "snack"),
    ("Kolacja", "supper"),
];

/// Translation table from provider slot names to plan slot keys.
///
/// Lookups are exact. Names missing from the table have no plan slot; callers
/// skip them rather than inventing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMapping {
    entries: BTreeMap<String, String>,
}

impl SlotMapping {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn plan_slot(&self, source_slot: &str) -> Option<&str> {
        self.entries.get(source_slot).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SlotMapping {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_SLOT_MAPPING)
    }
}
