use futures::{SinkExt, StreamExt};
use overlay_proto::{ClientCommand, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Link, TransportEvent};
use crate::config::{Role, TransportConfig};
use crate::error::ClientError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Result<Socket, ClientError> {
    let (socket, _) = tokio_tungstenite::connect_async(url).await?;
    Ok(socket)
}

fn decode_event(text: &str) -> Result<ServerMessage, ClientError> {
    Ok(ServerMessage::decode(text)?)
}

/// Why a connection epoch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SessionEnd {
    Closed,
    Failed,
    ConsumerGone,
    Shutdown,
}

/// Connect, run one session, back off, repeat until shutdown.
pub(super) async fn connect_loop(
    config: TransportConfig,
    role: Role,
    events: mpsc::Sender<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<ClientCommand>,
    link: watch::Sender<Link>,
    mut shutdown: watch::Receiver<bool>,
) {
    let url = match config.ws_url(role) {
        Ok(url) => url,
        Err(err) => {
            tracing::error!(%err, "Streaming disabled");
            return;
        }
    };
    let mut epoch = 0u64;

    loop {
        let connected = tokio::select! {
            result = connect(url.as_str()) => result,
            _ = shutdown.changed() => return,
        };

        match connected {
            Ok(socket) => {
                epoch += 1;
                tracing::info!(epoch, url = %url, "Stream connected");
                let _ = link.send(Link::up(epoch));
                if events.send(TransportEvent::Connected { epoch }).await.is_err() {
                    return;
                }

                let end = run_session(socket, epoch, &events, &mut commands, &mut shutdown).await;
                let _ = link.send(Link::down(epoch));
                tracing::warn!(epoch, reason = ?end, "Stream disconnected");

                if matches!(end, SessionEnd::ConsumerGone | SessionEnd::Shutdown)
                    || events.send(TransportEvent::Disconnected { epoch }).await.is_err()
                {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(%err, url = %url, "Stream connect failed");
            }
        }

        let backoff = tokio::time::sleep(config.reconnect_backoff);
        tokio::pin!(backoff);
        loop {
            tokio::select! {
                () = &mut backoff => break,
                Some(command) = commands.recv() => {
                    tracing::debug!(command = command.tag(), "Dropping command while disconnected");
                }
                _ = shutdown.changed() => return,
            }
        }
    }
}

/// Pump one connected socket until it closes. Malformed frames are logged and
/// skipped; they never end the session.
pub(super) async fn run_session<S>(
    socket: WebSocketStream<S>,
    epoch: u64,
    events: &mpsc::Sender<TransportEvent>,
    commands: &mut mpsc::UnboundedReceiver<ClientCommand>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_event(text.as_str()) {
                    Ok(message) => {
                        tracing::trace!(epoch, kind = message.tag(), "Event received");
                        if events.send(TransportEvent::Message { epoch, message }).await.is_err() {
                            return SessionEnd::ConsumerGone;
                        }
                    }
                    Err(err) => tracing::warn!(epoch, %err, "Dropping malformed event"),
                },
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Closed,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(epoch, %err, "Stream read failed");
                    return SessionEnd::Failed;
                }
            },
            Some(command) = commands.recv() => match command.encode() {
                Ok(text) => {
                    if let Err(err) = sink.send(Message::Text(text.into())).await {
                        tracing::warn!(epoch, %err, "Stream write failed");
                        return SessionEnd::Failed;
                    }
                }
                Err(err) => tracing::warn!(epoch, %err, "Dropping unencodable command"),
            },
            _ = shutdown.changed() => {
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_proto::{Layer, LayerKind};
    use tokio_tungstenite::tungstenite::protocol::Role as WsRole;

    async fn socket_pair() -> (
        WebSocketStream<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client, WsRole::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, WsRole::Server, None).await;
        (client, server)
    }

    #[tokio::test]
    async fn test_session_skips_malformed_and_forwards_commands() {
        let (client, mut server) = socket_pair().await;
        let (event_tx, mut events) = mpsc::channel(8);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let session = tokio::spawn(async move {
            run_session(client, 3, &event_tx, &mut command_rx, &mut shutdown_rx).await
        });

        server.send(Message::Text("{not json".into())).await.unwrap();
        server
            .send(Message::Text(r#"{"type":"scene.bogus"}"#.into()))
            .await
            .unwrap();
        let add = ServerMessage::SceneAdd {
            item: Layer::new("a", LayerKind::Text, "hi"),
        };
        server
            .send(Message::Text(add.encode().unwrap().into()))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Message {
                epoch: 3,
                message: add
            })
        );

        command_tx.send(ClientCommand::Clear).unwrap();
        let Some(Ok(Message::Text(text))) = server.next().await else {
            panic!("expected a text frame");
        };
        assert_eq!(ClientCommand::decode(text.as_str()).unwrap(), ClientCommand::Clear);

        server.close(None).await.unwrap();
        assert_eq!(session.await.unwrap(), SessionEnd::Closed);
    }

    #[test]
    fn test_malformed_event_is_protocol_error() {
        assert!(matches!(decode_event("{not json"), Err(ClientError::Protocol(_))));
        assert!(matches!(
            decode_event(r#"{"type":"scene.bogus"}"#),
            Err(ClientError::Protocol(_))
        ));
        assert!(decode_event(r#"{"type":"scene.clear"}"#).is_ok());
    }

    #[tokio::test]
    async fn test_refused_connect_is_websocket_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(&format!("ws://{addr}/ws/overlay")).await;
        assert!(matches!(result, Err(ClientError::WebSocket(_))));
    }
}
