//! Overlay and moderator sockets.
//!
//! Each socket gets a `scene.full` on connect and then every broadcast in
//! the order the authority applied it. A socket that falls behind the
//! broadcast buffer is dropped; its client reconnects and resyncs from a
//! fresh snapshot.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use overlay_proto::{ClientCommand, ServerMessage};
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::{error::AuthorityError, service::SceneAuthority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Overlay,
    Moderator,
}

impl Channel {
    fn as_str(self) -> &'static str {
        match self {
            Channel::Overlay => "overlay",
            Channel::Moderator => "moderator",
        }
    }

    /// Overlays only report telemetry; moderators may send anything.
    fn admit(self, command: &ClientCommand) -> Result<(), AuthorityError> {
        match (self, command) {
            (Channel::Moderator, _) | (Channel::Overlay, ClientCommand::OverlayAck { .. }) => Ok(()),
            (Channel::Overlay, _) => Err(AuthorityError::NotAllowed(command.tag())),
        }
    }
}

pub async fn overlay(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Channel::Overlay))
}

pub async fn moderator(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state, Channel::Moderator))
}

/// Decode and apply one inbound frame. Returns the reply for the sender.
fn handle_text(authority: &SceneAuthority, channel: Channel, text: &str) -> Option<ServerMessage> {
    let command = match ClientCommand::decode(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!(%err, channel = channel.as_str(), "Dropping malformed command");
            return None;
        }
    };

    let kind = command.tag();
    let result = channel
        .admit(&command)
        .and_then(|()| authority.handle_command(command));
    match result {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(%err, kind, channel = channel.as_str(), "Command rejected");
            None
        }
    }
}

async fn send_message<S>(
    sink: &mut S,
    message: &ServerMessage,
) -> Result<(), <S as Sink<Message>>::Error>
where
    S: Sink<Message> + Unpin,
{
    match message.encode() {
        Ok(text) => sink.send(Message::Text(text.into())).await,
        Err(err) => {
            tracing::error!(%err, kind = message.tag(), "Failed to encode reply");
            Ok(())
        }
    }
}

async fn serve_socket(socket: WebSocket, state: AppState, channel: Channel) {
    let authority = state.authority;
    let (full, mut feed) = authority.subscribe();
    let (mut sink, mut stream) = socket.split();

    tracing::info!(channel = channel.as_str(), version = authority.version(), "Socket connected");

    if send_message(&mut sink, &full).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = feed.recv() => match event {
                Ok(text) => {
                    if sink.send(Message::Text(String::from(&*text).into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, channel = channel.as_str(), "Socket lagged, dropping it");
                    break;
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_text(&authority, channel, text.as_str())
                        && send_message(&mut sink, &reply).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(%err, channel = channel.as_str(), "Socket read failed");
                    break;
                }
            },
        }
    }

    let _ = sink.close().await;
    tracing::info!(channel = channel.as_str(), "Socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_proto::LayerPatch;

    #[test]
    fn test_overlay_may_only_ack() {
        let authority = SceneAuthority::new(50);
        let clear = ClientCommand::Clear.encode().unwrap();

        assert!(handle_text(&authority, Channel::Overlay, &clear).is_none());
        assert_eq!(authority.version(), 0);

        let ack = ClientCommand::OverlayAck {
            version: 0,
            server_ts: Some(10),
            applied_ts: 25,
        }
        .encode()
        .unwrap();
        assert!(handle_text(&authority, Channel::Overlay, &ack).is_none());
        assert_eq!(authority.metrics().overlay_apply_latency_p95_ms, Some(15));
    }

    #[test]
    fn test_moderator_commands_and_replies() {
        let authority = SceneAuthority::new(50);
        let add = ClientCommand::Add {
            item: LayerPatch {
                id: Some("a".into()),
                ..LayerPatch::default()
            },
        }
        .encode()
        .unwrap();
        assert!(handle_text(&authority, Channel::Moderator, &add).is_none());
        assert_eq!(authority.version(), 1);

        let save = ClientCommand::PresetSave { name: "x".into() }
            .encode()
            .unwrap();
        assert_eq!(
            handle_text(&authority, Channel::Moderator, &save),
            Some(ServerMessage::PresetSaved { name: "x".into() })
        );
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        let authority = SceneAuthority::new(50);
        for frame in ["not json", r#"{"id":"a"}"#, r#"{"type":"scene.explode"}"#] {
            assert!(handle_text(&authority, Channel::Moderator, frame).is_none());
        }
        assert_eq!(authority.version(), 0);
    }

    #[test]
    fn test_channel_admission() {
        assert!(Channel::Moderator.admit(&ClientCommand::HistoryUndo).is_ok());
        assert!(matches!(
            Channel::Overlay.admit(&ClientCommand::HistoryUndo),
            Err(AuthorityError::NotAllowed("history.undo"))
        ));
    }
}
