//! Tuple-shaped protocol messages (§4.4).
//!
//! The wire format is a heterogeneous tuple with a leading string tag. We
//! model each request as a tagged Rust variant but serialize/deserialize it
//! by hand as a JSON array so the bytes on the wire are bit-exact tuples,
//! rather than leaking serde's default externally-tagged enum representation
//! (`{"HELLO": [...]}`).

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A request sent from client to daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Hello {
        proto_version: u32,
        auth_token: String,
    },
    Ping,
    Call {
        method: String,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    },
    Shutdown {
        force: bool,
    },
}

impl Request {
    pub fn tag(&self) -> &'static str {
        match self {
            Request::Hello { .. } => "HELLO",
            Request::Ping => "PING",
            Request::Call { .. } => "CALL",
            Request::Shutdown { .. } => "SHUTDOWN",
        }
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Request::Hello {
                proto_version,
                auth_token,
            } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("HELLO")?;
                seq.serialize_element(proto_version)?;
                seq.serialize_element(auth_token)?;
                seq.end()
            }
            Request::Ping => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element("PING")?;
                seq.end()
            }
            Request::Call {
                method,
                args,
                kwargs,
            } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element("CALL")?;
                seq.serialize_element(method)?;
                seq.serialize_element(args)?;
                seq.serialize_element(kwargs)?;
                seq.end()
            }
            Request::Shutdown { force } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("SHUTDOWN")?;
                seq.serialize_element(force)?;
                seq.end()
            }
        }
    }
}

/// Error produced while interpreting an otherwise well-formed array as a
/// [`Request`]. Carries the diagnostic text verbatim so callers can send it
/// straight back as an `ERR` reply without terminating the connection, per
/// §4.4's "unknown tags receive an ERR reply without closing."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage(pub String);

impl fmt::Display for UnknownMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Request::from_value(value).map_err(de::Error::custom)
    }
}

impl Request {
    /// Parse a raw decoded array into a typed request, distinguishing
    /// "not a valid tuple at all" (a malformed frame, handled as a protocol
    /// error that closes the connection) from "a syntactically valid tuple
    /// with an unrecognized tag" (an [`UnknownMessage`], handled as a
    /// soft `ERR` reply on an otherwise-live connection).
    pub fn from_value(value: Value) -> Result<Request, UnknownMessage> {
        let arr = value
            .as_array()
            .ok_or_else(|| UnknownMessage("request is not an array".to_string()))?;
        let tag = arr
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| UnknownMessage("request is missing a tag".to_string()))?;

        match tag {
            "HELLO" => {
                let proto_version = arr
                    .get(1)
                    .and_then(Value::as_u64)
                    .ok_or_else(|| UnknownMessage("malformed HELLO".to_string()))?
                    as u32;
                let auth_token = arr
                    .get(2)
                    .and_then(Value::as_str)
                    .ok_or_else(|| UnknownMessage("malformed HELLO".to_string()))?
                    .to_string();
                Ok(Request::Hello {
                    proto_version,
                    auth_token,
                })
            }
            "PING" => Ok(Request::Ping),
            "CALL" => {
                let method = arr
                    .get(1)
                    .and_then(Value::as_str)
                    .ok_or_else(|| UnknownMessage("malformed CALL".to_string()))?
                    .to_string();
                let args = arr
                    .get(2)
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| UnknownMessage("malformed CALL".to_string()))?;
                let kwargs = arr
                    .get(3)
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(|| UnknownMessage("malformed CALL".to_string()))?;
                Ok(Request::Call {
                    method,
                    args,
                    kwargs,
                })
            }
            "SHUTDOWN" => {
                let force = arr.get(1).and_then(Value::as_bool).unwrap_or(false);
                Ok(Request::Shutdown { force })
            }
            other => Err(UnknownMessage(format!("unknown message type: {other}"))),
        }
    }
}

/// A reply sent from daemon to client: `("OK", ...fields)` or `("ERR", text)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(Vec<Value>),
    Err(String),
}

impl Reply {
    pub fn ok(fields: Vec<Value>) -> Reply {
        Reply::Ok(fields)
    }

    pub fn err(message: impl Into<String>) -> Reply {
        Reply::Err(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }

    /// The first `OK` payload field, if any. Most replies carry exactly one.
    pub fn first_ok_field(&self) -> Option<&Value> {
        match self {
            Reply::Ok(fields) => fields.first(),
            Reply::Err(_) => None,
        }
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reply::Ok(fields) => {
                let mut seq = serializer.serialize_seq(Some(1 + fields.len()))?;
                seq.serialize_element("OK")?;
                for field in fields {
                    seq.serialize_element(field)?;
                }
                seq.end()
            }
            Reply::Err(message) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("ERR")?;
                seq.serialize_element(message)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Reply {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReplyVisitor;

        impl<'de> Visitor<'de> for ReplyVisitor {
            type Value = Reply;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a (\"OK\", ...) or (\"ERR\", text) tuple")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Reply, A::Error> {
                let tag: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::custom("reply is missing a tag"))?;
                match tag.as_str() {
                    "OK" => {
                        let mut fields = Vec::new();
                        while let Some(field) = seq.next_element::<Value>()? {
                            fields.push(field);
                        }
                        Ok(Reply::Ok(fields))
                    }
                    "ERR" => {
                        let message: String = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::custom("ERR reply is missing text"))?;
                        Ok(Reply::Err(message))
                    }
                    other => Err(de::Error::custom(format!("unknown reply tag: {other}"))),
                }
            }
        }

        deserializer.deserialize_seq(ReplyVisitor)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
