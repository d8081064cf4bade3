//! Wire protocol
//!
//! JSON text frames exchanged with the bus status server. Inbound frames
//! are either a keepalive response or a snapshot; a snapshot always
//! describes the whole board, never a delta.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};

/// Discriminant of the inbound heartbeat response.
pub static KEEPALIVE_RESPONSE: &str = "keepalive-response";

/// Discriminant of the outbound heartbeat.
pub static KEEPALIVE: &str = "keepalive";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,
}

/// Opaque server-assigned identifier. The server uses both numbers and
/// strings; identifiers are only ever compared for equality, so `1` and
/// `"1"` are different.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Num(i64),
    Text(String),
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ident::Num(n) => write!(f, "{}", n),
            Ident::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Ident {
    fn from(n: i64) -> Ident {
        Ident::Num(n)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Ident {
        Ident::Text(s.to_string())
    }
}

/// The closed set of route states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "a")]
    Arrived,
    #[serde(rename = "o")]
    OnTime,
    #[serde(rename = "d")]
    Delayed,
}

impl Status {
    /// Board order.
    pub const ALL: [Status; 3] = [Status::Arrived, Status::OnTime, Status::Delayed];

    pub fn code(&self) -> &'static str {
        match self {
            Status::Arrived => "a",
            Status::OnTime => "o",
            Status::Delayed => "d",
        }
    }

    pub fn from_code(code: &str) -> Option<Status> {
        match code {
            "a" => Some(Status::Arrived),
            "o" => Some(Status::OnTime),
            "d" => Some(Status::Delayed),
            _ => None,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Arrived => write!(f, "Arrived"),
            Status::OnTime => write!(f, "On Time"),
            Status::Delayed => write!(f, "Delayed"),
        }
    }
}

/// Accepts a string, a number or null and keeps it as a display string.
fn display_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Ident,
    pub status: Status,
    #[serde(default, deserialize_with = "display_string")]
    pub bus_number: Option<String>,
    #[serde(default)]
    pub route_name: String,
    #[serde(default)]
    pub space: Option<Ident>,
}

/// Full description of the board as pushed by the server. Every field is
/// optional; `error` short-circuits everything else.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub all_routes: Option<Vec<Route>>,
    #[serde(default)]
    pub user_route_id: Option<Ident>,
    #[serde(default)]
    pub user_route_name: Option<String>,
    #[serde(default)]
    pub announcement: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    KeepaliveResponse,
    Snapshot(Snapshot),
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Inbound, Error> {
        let value: Value = serde_json::from_str(text)?;
        let obj = if let Value::Object(obj) = &value {
            obj
        } else {
            return Err(Error::NotAnObject);
        };
        if let Some(Value::String(kind)) = obj.get("type") {
            if kind == KEEPALIVE_RESPONSE {
                return Ok(Inbound::KeepaliveResponse);
            }
        }
        Ok(Inbound::Snapshot(serde_json::from_value(value)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Keepalive,
    SetStatus {
        id: Ident,
        status: Status,
    },
    /// Assignment change. `extra` is merged into the message; `id` and
    /// `time` always take precedence over keys of the same name.
    Assign {
        id: Ident,
        time: String,
        extra: Map<String, Value>,
    },
    Announce(String),
}

impl Outbound {
    pub fn to_value(&self) -> Value {
        match self {
            Outbound::Keepalive => json!({ "type": KEEPALIVE }),
            Outbound::SetStatus { id, status } => json!({ "id": id, "status": status }),
            Outbound::Assign { id, time, extra } => {
                let mut obj = extra.clone();
                obj.insert("id".to_string(), json!(id));
                obj.insert("time".to_string(), Value::String(time.clone()));
                Value::Object(obj)
            }
            Outbound::Announce(text) => json!({ "announcement": text }),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}
