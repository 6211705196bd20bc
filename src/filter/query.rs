use serde_json::{Map, Value as JsonValue, json};

use super::{CompareOp, Filter};

impl Filter {
    /// Renders the filter as a MongoDB-style query document.
    ///
    /// This is the shape a driver-backed gateway hands to the store;
    /// `Filter::All` renders as the empty document.
    pub fn to_query_document(&self) -> JsonValue {
        match self {
            Filter::All => JsonValue::Object(Map::new()),
            Filter::Compare { field, op, value } => {
                let operator = match op {
                    CompareOp::Eq => "$eq",
                    CompareOp::Ne => "$ne",
                    CompareOp::Gt => "$gt",
                    CompareOp::Gte => "$gte",
                    CompareOp::Lt => "$lt",
                    CompareOp::Lte => "$lte",
                };
                json!({ field.as_str(): { operator: value.to_json() } })
            }
            Filter::In { field, values } => {
                let values: Vec<JsonValue> = values.iter().map(|v| v.to_json()).collect();
                json!({ field.as_str(): { "$in": values } })
            }
            Filter::Exists { field, exists } => json!({ field.as_str(): { "$exists": exists } }),
            // `$and` rejects empty arrays too; no constraint matches everything.
            Filter::And(parts) if parts.is_empty() => JsonValue::Object(Map::new()),
            Filter::And(parts) => json!({ "$and": render_all(parts) }),
            Filter::Or(parts) if parts.is_empty() => {
                // `$or` rejects empty arrays; an impossible `$in` keeps the
                // "matches nothing" meaning.
                json!({ "_id": { "$in": [] } })
            }
            Filter::Or(parts) => json!({ "$or": render_all(parts) }),
            Filter::Not(inner) => json!({ "$nor": [inner.to_query_document()] }),
        }
    }
}

fn render_all(parts: &[Filter]) -> Vec<JsonValue> {
    parts.iter().map(Filter::to_query_document).collect()
}
