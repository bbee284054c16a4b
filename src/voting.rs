use crate::errors::RequestError;

/// A requested vote. `Clear` retracts and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
    Down,
    Clear,
    Up,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Clear => 0,
            VoteValue::Up => 1,
        }
    }

    /// Accepts a JSON integer or an integer string such as `"1"`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RequestError> {
        let parsed = match value {
            serde_json::Value::Number(number) => number.as_i64(),
            serde_json::Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .ok_or_else(|| RequestError::Validation("Invalid vote value".into()))
            .and_then(VoteValue::try_from)
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = RequestError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Clear),
            1 => Ok(VoteValue::Up),
            _ => Err(RequestError::Validation("Invalid vote value".into())),
        }
    }
}

/// What has to happen to the caller's vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    Insert(i64),
    Update(i64),
    Delete,
    Unchanged,
}

impl VoteTransition {
    /// `existing` is the stored value (always -1 or 1) if the caller already voted.
    pub fn resolve(existing: Option<i64>, requested: VoteValue) -> Self {
        match (existing, requested) {
            (None, VoteValue::Clear) => VoteTransition::Unchanged,
            (Some(_), VoteValue::Clear) => VoteTransition::Delete,
            (None, value) => VoteTransition::Insert(value.as_i64()),
            (Some(current), value) if current == value.as_i64() => VoteTransition::Delete,
            (Some(_), value) => VoteTransition::Update(value.as_i64()),
        }
    }
}
