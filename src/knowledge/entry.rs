use serde::{Deserialize, Serialize};

/// A single piece of advice from the knowledge base.
///
/// The `id` is never read from input; it is derived from the two category
/// labels when the corpus is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: String,
    pub main_category: String,
    pub sub_category: String,
    #[serde(rename = "tips")]
    pub tip_text: String,
    pub instruction: String,
}

/// On-disk shape of a tip record. Older corpora spell the tip field `tip`;
/// some records carry both.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEntry {
    pub main_category: String,
    pub sub_category: String,
    pub tips: Option<String>,
    pub tip: Option<String>,
    pub instruction: String,
}

impl Entry {
    /// `None` when the record has no tip text under either name. If both
    /// are present, `tips` wins.
    pub(crate) fn from_raw(raw: RawEntry) -> Option<Self> {
        let tip_text = raw.tips.or(raw.tip)?;
        Some(Self {
            id: derive_id(&raw.main_category, &raw.sub_category),
            main_category: raw.main_category,
            sub_category: raw.sub_category,
            tip_text,
            instruction: raw.instruction,
        })
    }

    /// Text handed to the embedder for this entry.
    pub fn searchable_content(&self) -> String {
        format!(
            "Topic: {}. Tip: {}. How to do it: {}",
            self.sub_category, self.tip_text, self.instruction
        )
    }
}

pub(crate) fn derive_id(main_category: &str, sub_category: &str) -> String {
    format!("{}_{}", main_category, sub_category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Entry {
        Entry::from_raw(RawEntry {
            main_category: "Water".to_string(),
            sub_category: "Purify".to_string(),
            tips: Some("Boil".to_string()),
            tip: None,
            instruction: "Boil for 1 minute".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_primary_tip_name_wins() {
        let entry = Entry::from_raw(RawEntry {
            main_category: "Water".to_string(),
            sub_category: "Purify".to_string(),
            tips: Some("Boil".to_string()),
            tip: Some("Boil it".to_string()),
            instruction: "Boil for 1 minute".to_string(),
        })
        .unwrap();
        assert_eq!(entry.tip_text, "Boil");
    }

    #[test]
    fn test_no_tip_text() {
        let raw = RawEntry {
            main_category: "Water".to_string(),
            sub_category: "Purify".to_string(),
            ..Default::default()
        };
        assert!(Entry::from_raw(raw).is_none());
    }

    #[test]
    fn test_id_from_categories() {
        assert_eq!(water().id, "Water_Purify");
    }

    #[test]
    fn test_searchable_content_format() {
        assert_eq!(
            water().searchable_content(),
            "Topic: Purify. Tip: Boil. How to do it: Boil for 1 minute"
        );
    }

    #[test]
    fn test_searchable_content_follows_fields() {
        let mut entry = water();
        entry.instruction = "Boil for 3 minutes at altitude".to_string();
        assert!(entry
            .searchable_content()
            .ends_with("How to do it: Boil for 3 minutes at altitude"));
    }

    #[test]
    fn test_serializes_tip_under_primary_name() {
        let json = serde_json::to_value(water()).unwrap();
        assert_eq!(json["tips"], "Boil");
        assert!(json.get("tip_text").is_none());
    }
}
