mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

#[derive(Deserialize, Serialize, Debug)]
pub struct PromptQueryParams {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "get_default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn get_default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for PromptQueryParams {
    fn default() -> Self {
        PromptQueryParams {
            sort: None,
            search: None,
            category: None,
            tag: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
