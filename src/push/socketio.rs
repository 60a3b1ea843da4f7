//! Socket.IO (Engine.IO v4) push transport over a WebSocket.
//!
//! Only the slice of the protocol a listener needs is handled: the open
//! handshake, joining the default namespace, answering heartbeats and decoding
//! event packets.

use color_eyre::{eyre::eyre, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::PushConfig;
use crate::record::api_types::{ApiEnvelope, ApiRecord};
use crate::record::{map_record, Record};

use super::{PushEvent, PushSink, PushSource, Subscription};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push source connected to a Socket.IO server.
#[derive(Debug, Clone)]
pub struct SocketIoSource {
  url: Url,
  event: String,
  reconnect_delay: Duration,
  reconnect_attempts: u32,
}

impl SocketIoSource {
  pub fn new(api_url: &str, push: &PushConfig) -> Result<Self> {
    Ok(Self {
      url: socket_url(api_url)?,
      event: push.event.clone(),
      reconnect_delay: Duration::from_millis(push.reconnect_delay_ms),
      reconnect_attempts: push.reconnect_attempts,
    })
  }
}

impl PushSource for SocketIoSource {
  fn subscribe(&self, sink: PushSink) -> Result<Subscription> {
    let source = self.clone();
    let handle = tokio::spawn(async move { source.run(sink).await });
    Ok(Subscription::from_task(handle))
  }
}

impl SocketIoSource {
  async fn run(self, sink: PushSink) {
    // Consecutive attempts since the last established session
    let mut attempts = 0u32;
    loop {
      match connect_async(self.url.as_str()).await {
        Ok((socket, _)) => {
          let (reason, established) = self.pump(socket, &sink).await;
          if established {
            attempts = 0;
            sink(PushEvent::Disconnected { reason });
          } else {
            warn!(reason = %reason, "push session ended before joining");
          }
        }
        Err(e) => warn!(url = %self.url, error = %e, "push connection failed"),
      }

      attempts += 1;
      if attempts > self.reconnect_attempts {
        warn!(
          attempts = self.reconnect_attempts,
          "giving up on push connection"
        );
        return;
      }
      tokio::time::sleep(self.reconnect_delay).await;
      debug!(attempt = attempts, "reconnecting push connection");
    }
  }

  /// Drive one WebSocket session. Returns the close reason and whether the
  /// namespace was joined.
  async fn pump(&self, socket: Socket, sink: &PushSink) -> (String, bool) {
    let (mut tx, mut rx) = socket.split();
    let mut established = false;

    while let Some(msg) = rx.next().await {
      let text = match msg {
        Ok(Message::Text(text)) => text,
        Ok(Message::Close(_)) => return ("closed by server".to_string(), established),
        Ok(_) => continue,
        Err(e) => return (e.to_string(), established),
      };

      let reply = match parse_frame(text.as_str()) {
        Some(Frame::Open) => Some("40"),
        Some(Frame::Ping) => Some("3"),
        Some(Frame::Connect) => {
          established = true;
          info!(url = %self.url, "push connected");
          sink(PushEvent::Connected);
          None
        }
        Some(Frame::ConnectError(message)) => {
          return (format!("namespace refused: {}", message), established)
        }
        Some(Frame::Close) | Some(Frame::Disconnect) => {
          return ("server disconnect".to_string(), established)
        }
        Some(Frame::Event { name, payload }) if name == self.event => {
          match decode_record_created(payload) {
            Some(record) => sink(PushEvent::RecordCreated(record)),
            None => warn!(event = %name, "dropping malformed push payload"),
          }
          None
        }
        Some(Frame::Event { name, .. }) => {
          debug!(event = %name, "ignoring push event");
          None
        }
        Some(Frame::Noop) => None,
        None => {
          debug!(frame = %text.as_str(), "ignoring unrecognised frame");
          None
        }
      };

      if let Some(reply) = reply {
        if let Err(e) = tx.send(Message::Text(reply.into())).await {
          return (e.to_string(), established);
        }
      }
    }

    ("connection closed".to_string(), established)
  }
}

/// WebSocket endpoint for the Socket.IO server behind `api_url`.
pub fn socket_url(api_url: &str) -> Result<Url> {
  let mut base = Url::parse(api_url).map_err(|e| eyre!("Invalid API url '{}': {}", api_url, e))?;
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }
  let mut url = base
    .join("socket.io/")
    .map_err(|e| eyre!("Failed to build socket url: {}", e))?;

  let scheme = match url.scheme() {
    "http" | "ws" => "ws",
    "https" | "wss" => "wss",
    other => return Err(eyre!("Unsupported scheme for push connection: {}", other)),
  };
  url
    .set_scheme(scheme)
    .map_err(|_| eyre!("Failed to set scheme {} on {}", scheme, url))?;
  url
    .query_pairs_mut()
    .clear()
    .append_pair("EIO", "4")
    .append_pair("transport", "websocket");
  Ok(url)
}

/// A decoded Engine.IO / Socket.IO frame.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
  Open,
  Close,
  Ping,
  Noop,
  Connect,
  Disconnect,
  ConnectError(String),
  Event { name: String, payload: Value },
}

fn parse_frame(text: &str) -> Option<Frame> {
  let packet = text.get(..1)?;
  let rest = &text[1..];
  match packet {
    "0" => Some(Frame::Open),
    "1" => Some(Frame::Close),
    "2" => Some(Frame::Ping),
    // Pong and noop need no answer
    "3" | "6" => Some(Frame::Noop),
    "4" => parse_socket_packet(rest),
    _ => None,
  }
}

fn parse_socket_packet(text: &str) -> Option<Frame> {
  let kind = text.get(..1)?;
  let mut body = &text[1..];

  // Only the default namespace is joined
  if body.starts_with('/') {
    body = &body[body.find(',')? + 1..];
  }

  match kind {
    "0" => Some(Frame::Connect),
    "1" => Some(Frame::Disconnect),
    "2" => {
      // Skip an optional ack id
      let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
      let mut args: Vec<Value> = serde_json::from_str(body).ok()?;
      if args.is_empty() {
        return None;
      }
      let name = args.remove(0).as_str()?.to_string();
      let payload = if args.is_empty() {
        Value::Null
      } else {
        args.remove(0)
      };
      Some(Frame::Event { name, payload })
    }
    "4" => {
      let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());
      Some(Frame::ConnectError(message))
    }
    _ => None,
  }
}

/// Decode a `{ success, data }` record-created payload.
fn decode_record_created(payload: Value) -> Option<Record> {
  let envelope: ApiEnvelope<ApiRecord> = serde_json::from_value(payload).ok()?;
  if !envelope.success {
    return None;
  }
  map_record(envelope.data?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Arc;
  use tokio::net::TcpListener;
  use tokio::sync::mpsc;

  #[test]
  fn test_socket_url() {
    assert_eq!(
      socket_url("http://localhost:3001").unwrap().as_str(),
      "ws://localhost:3001/socket.io/?EIO=4&transport=websocket"
    );
    assert_eq!(
      socket_url("https://cv.example.com/backend/").unwrap().as_str(),
      "wss://cv.example.com/backend/socket.io/?EIO=4&transport=websocket"
    );
    assert!(socket_url("ftp://example.com").is_err());
  }

  #[test]
  fn test_parse_engine_packets() {
    assert_eq!(
      parse_frame(r#"0{"sid":"abc","pingInterval":25000}"#),
      Some(Frame::Open)
    );
    assert_eq!(parse_frame("2"), Some(Frame::Ping));
    assert_eq!(parse_frame("3"), Some(Frame::Noop));
    assert_eq!(parse_frame(r#"40{"sid":"xyz"}"#), Some(Frame::Connect));
    assert_eq!(parse_frame("41"), Some(Frame::Disconnect));
    assert_eq!(parse_frame(""), None);
    assert_eq!(parse_frame("x"), None);
  }

  #[test]
  fn test_parse_event_packet() {
    let frame = parse_frame(r#"42["newCV",{"success":true,"data":{"_id":"x9"}}]"#).unwrap();
    assert_eq!(
      frame,
      Frame::Event {
        name: "newCV".to_string(),
        payload: json!({ "success": true, "data": { "_id": "x9" } }),
      }
    );

    // Ack id and explicit namespace
    let frame = parse_frame(r#"42/,7["newCV",null]"#).unwrap();
    assert_eq!(
      frame,
      Frame::Event {
        name: "newCV".to_string(),
        payload: Value::Null,
      }
    );

    assert_eq!(parse_frame(r#"42["#), None);
    assert_eq!(parse_frame(r#"42[]"#), None);
  }

  #[test]
  fn test_parse_connect_error() {
    assert_eq!(
      parse_frame(r#"44{"message":"Not authorized"}"#),
      Some(Frame::ConnectError("Not authorized".to_string()))
    );
  }

  #[test]
  fn test_decode_record_created() {
    let record = decode_record_created(json!({
      "success": true,
      "data": { "_id": "x9", "fullName": "Michael Chen", "score": 72 }
    }))
    .unwrap();
    assert_eq!(record.id, "x9");
    assert_eq!(record.score, Some(72));

    assert!(decode_record_created(json!({ "success": false })).is_none());
    assert!(decode_record_created(json!({ "success": true, "data": { "score": 10 } })).is_none());
    assert!(decode_record_created(json!("garbage")).is_none());
  }

  #[tokio::test]
  async fn test_session_handshake_and_event_delivery() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
      let (stream, _) = listener.accept().await.unwrap();
      let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
      ws.send(Message::Text(r#"0{"sid":"s1","pingInterval":25000}"#.into()))
        .await
        .unwrap();
      let join = ws.next().await.unwrap().unwrap();
      assert_eq!(join.to_text().unwrap(), "40");
      ws.send(Message::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();
      ws.send(Message::Text("2".into())).await.unwrap();
      let pong = ws.next().await.unwrap().unwrap();
      assert_eq!(pong.to_text().unwrap(), "3");
      ws.send(Message::Text(r#"42["other",{}]"#.into()))
        .await
        .unwrap();
      ws.send(Message::Text(
        r#"42["newCV",{"success":true,"data":{"_id":"x9","fullName":"Michael Chen","score":72}}]"#
          .into(),
      ))
      .await
      .unwrap();
      ws.close(None).await.unwrap();
    });

    let push = PushConfig {
      reconnect_attempts: 0,
      ..PushConfig::default()
    };
    let source = SocketIoSource::new(&format!("http://{}", addr), &push).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink: PushSink = Arc::new(move |event| {
      let _ = tx.send(event);
    });
    let subscription = source.subscribe(sink).unwrap();

    let mut received = Vec::new();
    while received.len() < 3 {
      let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
      received.push(event);
    }

    assert_eq!(received[0], PushEvent::Connected);
    match &received[1] {
      PushEvent::RecordCreated(record) => assert_eq!(record.id, "x9"),
      other => panic!("expected a record, got {:?}", other),
    }
    assert!(matches!(received[2], PushEvent::Disconnected { .. }));

    server.await.unwrap();
    subscription.unsubscribe();
  }
}
