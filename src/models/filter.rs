//! Search filter model

use serde::{Deserialize, Serialize};

/// Initiative column a composite filter searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    #[default]
    Name,
    Description,
    Location,
}

impl FilterField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Location => "location",
        }
    }
}

impl std::str::FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "location" => Ok(Self::Location),
            _ => Err(format!("Invalid filter field: {}", s)),
        }
    }
}

/// A single-field, case-insensitive "contains" search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeFilter {
    /// Text searched for
    pub key: String,
    #[serde(default)]
    pub field_name: FilterField,
}

impl CompositeFilter {
    pub fn new(key: impl Into<String>, field_name: FilterField) -> Self {
        Self {
            key: key.into(),
            field_name,
        }
    }

    /// `ilike` pattern matching the key anywhere in the column.
    ///
    /// Wildcards in the key are escaped, so it is matched literally.
    pub fn pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.key.len() + 2);
        pattern.push('%');
        for c in self.key.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}
