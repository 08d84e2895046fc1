use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

/// Which bucket a category lives in. Each bucket has its own hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryType::Income => write!(f, "income"),
            CategoryType::Expense => write!(f, "expense"),
            CategoryType::Transfer => write!(f, "transfer"),
        }
    }
}

/// A secondary (leaf) category together with the name of its primary parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<CategoryId>,
    pub uid: i64,
    pub category_type: CategoryType,
    pub parent_name: String,
    pub name: String,
}

impl Category {
    pub fn new(uid: i64, category_type: CategoryType, parent_name: &str, name: &str) -> Self {
        Category {
            id: None,
            uid,
            category_type,
            parent_name: parent_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn with_id(mut self, id: CategoryId) -> Self {
        self.id = Some(id);
        self
    }
}
