use serde_json::{Map, Value};

/// Structured fields recognised in an inbound channel message.
///
/// Every field is optional and independent; an empty payload is valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundPayload {
    pub connection_id: Option<String>,
    /// `(field name, url)` for every top-level string field named `*Url` / `*_url`.
    pub result_urls: Vec<(String, String)>,
    pub processed_message: Option<String>,
}

impl InboundPayload {
    /// Returns `None` when `raw` is not a JSON object; such lines are display-only.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let Value::Object(fields) = value else {
            return None;
        };
        Some(Self::from_fields(&fields))
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let mut payload = Self::default();
        for (key, value) in fields {
            let Some(text) = value.as_str() else {
                continue;
            };
            if key == "connectionId" {
                payload.connection_id = Some(text.to_string());
            } else if key == "processed_message" {
                payload.processed_message = Some(text.to_string());
            } else if is_result_url_key(key) {
                payload.result_urls.push((key.clone(), text.to_string()));
            }
        }
        payload
    }

    pub fn is_empty(&self) -> bool {
        self.connection_id.is_none() && self.result_urls.is_empty() && self.processed_message.is_none()
    }
}

fn is_result_url_key(key: &str) -> bool {
    let Some(split) = key.len().checked_sub(3) else {
        return false;
    };
    if split == 0 || !key.is_char_boundary(split) {
        return false;
    }
    let (stem, suffix) = key.split_at(split);
    if !suffix.eq_ignore_ascii_case("url") {
        return false;
    }
    // `barUrl` / `result_url`, but not `curl` or `hurl`.
    stem.ends_with('_') || suffix.starts_with('U')
}
