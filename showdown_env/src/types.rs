//! Common types for the Showdown environment abstraction.

use serde::{Deserialize, Serialize};

/// A reachable attack endpoint of a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address
    pub address: String,

    /// Attack port
    pub port: u16,
}

impl Endpoint {
    /// Creates a new endpoint.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// One registry entry as reported by service discovery.
///
/// Address and port are optional because a peer may be listed before it
/// has been assigned either; callers decide whether that is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Combatant display name
    pub name: String,

    /// Network address, if assigned
    #[serde(default)]
    pub address: Option<String>,

    /// Attack port, if assigned
    #[serde(default)]
    pub port: Option<u16>,
}

impl PeerRecord {
    /// Creates a fully resolved record.
    pub fn resolved(name: impl Into<String>, endpoint: &Endpoint) -> Self {
        Self {
            name: name.into(),
            address: Some(endpoint.address.clone()),
            port: Some(endpoint.port),
        }
    }

    /// Returns the endpoint if both address and port are present and non-empty.
    pub fn endpoint(&self) -> Option<Endpoint> {
        let address = self.address.as_deref().filter(|a| !a.is_empty())?;
        let port = self.port.filter(|p| *p != 0)?;
        Some(Endpoint::new(address, port))
    }
}

/// Attack call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Damage magnitude to apply
    pub damage: u64,
}

/// Attack call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResponse {
    /// Human-readable outcome
    pub message: String,
}

/// Journal-append call request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRequest {
    /// Opaque event payload (the event message bytes)
    pub payload: Vec<u8>,
}

impl JournalRequest {
    /// Creates a request carrying a text message.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            payload: text.into().into_bytes(),
        }
    }
}

/// Journal-append call response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalResponse {
    /// Offset assigned to the appended record
    pub offset: u64,
}

/// Reply frame written by the RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply<T> {
    /// The handler succeeded
    Ok { body: T },

    /// The handler failed; the message is surfaced to the caller
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("10.0.0.7", 50002).to_string(), "10.0.0.7:50002");
        assert_eq!(Endpoint::new("::1", 50003).to_string(), "[::1]:50003");
    }

    #[test]
    fn test_peer_record_requires_address_and_port() {
        let full = PeerRecord {
            name: "Doc".into(),
            address: Some("10.0.0.7".into()),
            port: Some(50002),
        };
        assert_eq!(full.endpoint(), Some(Endpoint::new("10.0.0.7", 50002)));

        let no_ip = PeerRecord {
            address: Some(String::new()),
            ..full.clone()
        };
        assert_eq!(no_ip.endpoint(), None);

        let no_port = PeerRecord { port: None, ..full };
        assert_eq!(no_port.endpoint(), None);
    }

    #[test]
    fn test_reply_wire_shape() {
        let ok: Reply<JournalResponse> = Reply::Ok {
            body: JournalResponse { offset: 42 },
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"status":"ok","body":{"offset":42}}"#);

        let err: Reply<JournalResponse> =
            serde_json::from_str(r#"{"status":"error","message":"disk full"}"#).unwrap();
        assert_eq!(
            err,
            Reply::Error {
                message: "disk full".into()
            }
        );
    }
}
