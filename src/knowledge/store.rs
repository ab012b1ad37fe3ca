//! Immutable, ordered store of survival tips parsed from the JSON corpus.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::entry::{Entry, RawEntry};

/// Errors that can occur while parsing the corpus.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Malformed corpus: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Record #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("Record #{index} is missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("Records #{first} and #{second} share the id '{id}'")]
    DuplicateId {
        id: String,
        first: usize,
        second: usize,
    },
}

/// The parsed knowledge base.
///
/// Entries keep corpus order, which is also the tie-break order when
/// ranking. Nothing is added or removed after `load`.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
    digest: [u8; 32],
}

impl KnowledgeStore {
    /// Parse a JSON array of tip records.
    ///
    /// Every record needs `main_category`, `sub_category`, `instruction` and
    /// the tip text under `tips` (or the older `tip`). Any `id` in the input
    /// is ignored; ids are derived as `{main_category}_{sub_category}` and
    /// must be unique.
    pub fn load(raw: &[u8]) -> Result<Self, KnowledgeError> {
        let records: Vec<RawEntry> = serde_json::from_slice(raw)?;

        let mut entries = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            if record.main_category.trim().is_empty() {
                return Err(KnowledgeError::EmptyField {
                    index,
                    field: "main_category",
                });
            }
            if record.sub_category.trim().is_empty() {
                return Err(KnowledgeError::EmptyField {
                    index,
                    field: "sub_category",
                });
            }

            let entry = Entry::from_raw(record).ok_or(KnowledgeError::MissingField {
                index,
                field: "tips",
            })?;
            if let Some(&first) = positions.get(&entry.id) {
                return Err(KnowledgeError::DuplicateId {
                    id: entry.id,
                    first,
                    second: index,
                });
            }

            positions.insert(entry.id.clone(), index);
            entries.push(entry);
        }

        Ok(Self {
            entries,
            positions,
            digest: Sha256::digest(raw).into(),
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA256 of the raw corpus bytes, hex encoded.
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_assigns_ids_in_order() {
        let raw = br#"[
            {"main_category": "Water", "sub_category": "Purify", "tips": "Boil", "instruction": "Boil for 1 minute"},
            {"main_category": "Fire", "sub_category": "Start", "tips": "Friction", "instruction": "Use a bow drill"}
        ]"#;

        let store = KnowledgeStore::load(raw).unwrap();
        let ids: Vec<&str> = store.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Water_Purify", "Fire_Start"]);
        assert_eq!(store.get("Fire_Start").unwrap().tip_text, "Friction");
    }

    #[test]
    fn test_input_id_is_ignored() {
        let raw = br#"[{"id": "custom", "main_category": "Shelter", "sub_category": "Lean-to",
            "tips": "Use a ridge pole", "instruction": "Prop branches against a fallen log"}]"#;

        let store = KnowledgeStore::load(raw).unwrap();
        assert_eq!(store.entries()[0].id, "Shelter_Lean-to");
        assert!(store.get("custom").is_none());
    }

    #[test]
    fn test_legacy_tip_field() {
        let primary = br#"[{"main_category": "Food", "sub_category": "Forage",
            "tips": "Avoid white berries", "instruction": "Learn local plants"}]"#;
        let legacy = br#"[{"main_category": "Food", "sub_category": "Forage",
            "tip": "Avoid white berries", "instruction": "Learn local plants"}]"#;

        let a = KnowledgeStore::load(primary).unwrap();
        let b = KnowledgeStore::load(legacy).unwrap();
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_both_tip_names_on_one_record() {
        let raw = br#"[{"main_category": "Water", "sub_category": "Purify",
            "tips": "Boil", "tip": "Boil it", "instruction": "Boil for 1 minute"}]"#;

        let store = KnowledgeStore::load(raw).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Water_Purify").unwrap().tip_text, "Boil");
    }

    #[test]
    fn test_missing_instruction_fails() {
        let raw = br#"[{"main_category": "Water", "sub_category": "Purify", "tips": "Boil"}]"#;
        let err = KnowledgeStore::load(raw).unwrap_err();
        assert!(matches!(err, KnowledgeError::Parse(_)));
        assert!(err.to_string().contains("instruction"));
    }

    #[test]
    fn test_missing_tip_text_fails() {
        let raw = br#"[
            {"main_category": "Fire", "sub_category": "Start", "tips": "Friction", "instruction": "Use a bow drill"},
            {"main_category": "Water", "sub_category": "Purify", "instruction": "Boil"}
        ]"#;
        let err = KnowledgeStore::load(raw).unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::MissingField {
                index: 1,
                field: "tips"
            }
        ));
        assert!(err.to_string().contains("tips"));
    }

    #[test]
    fn test_not_json_fails() {
        assert!(matches!(
            KnowledgeStore::load(b"not json at all"),
            Err(KnowledgeError::Parse(_))
        ));
        assert!(matches!(
            KnowledgeStore::load(br#"{"main_category": "Water"}"#),
            Err(KnowledgeError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_category_fails() {
        let raw = br#"[{"main_category": "  ", "sub_category": "Purify", "tips": "Boil", "instruction": "Boil"}]"#;
        let err = KnowledgeStore::load(raw).unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::EmptyField {
                index: 0,
                field: "main_category"
            }
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let raw = br#"[
            {"main_category": "Water", "sub_category": "Purify", "tips": "Boil", "instruction": "Boil for 1 minute"},
            {"main_category": "Fire", "sub_category": "Start", "tips": "Friction", "instruction": "Use a bow drill"},
            {"main_category": "Water", "sub_category": "Purify", "tips": "Filter", "instruction": "Use a cloth"}
        ]"#;

        match KnowledgeStore::load(raw) {
            Err(KnowledgeError::DuplicateId { id, first, second }) => {
                assert_eq!(id, "Water_Purify");
                assert_eq!(first, 0);
                assert_eq!(second, 2);
            }
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_corpus() {
        let store = KnowledgeStore::load(b"[]").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = KnowledgeStore::load(b"[]").unwrap();
        let b = KnowledgeStore::load(b"[]").unwrap();
        let c = KnowledgeStore::load(b"[ ]").unwrap();
        assert_eq!(a.digest_hex(), b.digest_hex());
        assert_ne!(a.digest_hex(), c.digest_hex());
        assert_eq!(a.digest_hex().len(), 64);
    }
}
