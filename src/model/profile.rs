use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub bio: String,
}

impl Profile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bio: bio.into(),
        }
    }
}
