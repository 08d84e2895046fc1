use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<TagId>,
    pub uid: i64,
    pub name: String,
}

impl Tag {
    pub fn new(uid: i64, name: &str) -> Self {
        Tag {
            id: None,
            uid,
            name: name.to_string(),
        }
    }

    pub fn with_id(mut self, id: TagId) -> Self {
        self.id = Some(id);
        self
    }
}
