use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Tags {
    pub tags: Vec<String>,
}

impl<T> UserWrapper<T> {
    pub fn wrap_with_user_data(request: T) -> UserWrapper<T> {
        UserWrapper { user: request }
    }
}
