use crate::api::models::ContactRecord;

/// Category part of the table filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Records with an empty tag set.
    None,
    Tag(String),
}

impl CategoryFilter {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "" | "all" => Self::All,
            "none" => Self::None,
            tag => Self::Tag(tag.to_string()),
        }
    }

    pub fn matches(&self, record: &ContactRecord) -> bool {
        match self {
            Self::All => true,
            Self::None => record.paqueteria.is_empty(),
            Self::Tag(tag) => record.paqueteria.contains(tag),
        }
    }
}

/// Search text plus category. An empty text matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    text: String,
    pub category: CategoryFilter,
}

impl Filter {
    pub fn new(text: &str, category: CategoryFilter) -> Self {
        Self { text: text.trim().to_lowercase(), category }
    }

    pub fn matches(&self, record: &ContactRecord) -> bool {
        self.matches_text(record) && self.category.matches(record)
    }

    fn matches_text(&self, record: &ContactRecord) -> bool {
        if self.text.is_empty() {
            return true;
        }
        [&record.nombre, &record.cedula, &record.telefono, &record.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.text))
    }
}
