//! WebSocket endpoint for the operator console.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use orka_core::{
    ClientConfig, ConsoleFeed, Notification, ServerOptions,
    traits::{ControlPlane, Dialer, SettingsError, SettingsStore},
};
use orka_hub::Hub;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::protocol::{ConsoleFrame, ConsoleReply, ConsoleRequest, QueryKind};

/// WebSocket upgrade handler for operator consoles.
pub async fn console_ws_handler<S, D>(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<Hub<ConsoleFeed, S, D>>>,
) -> impl IntoResponse
where
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    ws.on_upgrade(move |socket| handle_console_socket(socket, hub))
}

async fn handle_console_socket<S, D>(socket: WebSocket, hub: Arc<Hub<ConsoleFeed, S, D>>)
where
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    let (mut sender, mut receiver) = socket.split();

    // Channel for sending frames to the console
    let (tx, mut rx) = mpsc::unbounded_channel::<ConsoleFrame>();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize console frame: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Replay recent history, then follow live notifications.
    let mut feed = hub.control().history_plus_stream();
    let feed_tx = tx.clone();
    let feed_task = tokio::spawn(async move {
        while let Some(notification) = feed.next().await {
            if feed_tx.send(ConsoleFrame::Notification(notification)).is_err() {
                break;
            }
        }
    });

    tracing::info!("Console connected");

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Console socket error: {e}");
                break;
            }
        };

        let request: ConsoleRequest = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Invalid console message: {e}");
                let _ = tx.send(ConsoleFrame::Reply(ConsoleReply::Error {
                    message: format!("Invalid message: {e}"),
                }));
                continue;
            }
        };

        if let Some(reply) = dispatch(&hub, request).await {
            let _ = tx.send(ConsoleFrame::Reply(reply));
        }
    }

    feed_task.abort();
    send_task.abort();

    tracing::info!("Console disconnected");
}

/// Apply one console request to the hub.
///
/// Returns the reply to send back, if the request warrants one.
pub async fn dispatch<C, S, D>(hub: &Arc<Hub<C, S, D>>, request: ConsoleRequest) -> Option<ConsoleReply>
where
    C: ControlPlane + 'static,
    S: SettingsStore + 'static,
    D: Dialer + 'static,
{
    let settings = hub.settings();
    let outcome: Result<(), SettingsError> = match request {
        ConsoleRequest::SendCommand { name, command } => {
            hub.send_command(&name, command);
            Ok(())
        }
        ConsoleRequest::AddClient { name, host, port } => hub
            .add_client(ClientConfig::new(name, host, port))
            .await
            .map(drop),
        ConsoleRequest::RemoveClient { name } => hub.remove_client(&name).await,
        ConsoleRequest::ConnectClient { name, host, port } => match (host, port) {
            (Some(host), Some(port)) => {
                hub.connect_client(&name, &host, port);
                Ok(())
            }
            _ => match hub.connect_known(&name).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => {
                    return Some(ConsoleReply::Error {
                        message: format!("No connection details for client {name}"),
                    });
                }
                Err(e) => Err(e),
            },
        },
        ConsoleRequest::DisconnectClient { name } => {
            hub.disconnect_client(&name);
            Ok(())
        }
        ConsoleRequest::Shutdown => {
            let hub = Arc::clone(hub);
            tokio::spawn(async move { hub.shutdown().await });
            Ok(())
        }
        ConsoleRequest::OpenExternalView { name, host } => {
            hub.open_external_view(&name, &host);
            Ok(())
        }
        ConsoleRequest::CreateList { name, attributes } => {
            settings.create_list(&name, attributes).await
        }
        ConsoleRequest::RemoveList { name } => settings.remove_list(&name).await,
        ConsoleRequest::AddClientsToList { list, clients } => {
            settings.add_clients_to_list(&list, &clients).await
        }
        ConsoleRequest::RemoveClientsFromList { list, clients } => {
            settings.remove_clients_from_list(&list, &clients).await
        }
        ConsoleRequest::CreateTask { name, definition } => settings.add_task(&name, definition).await,
        ConsoleRequest::DeleteTask { name } => settings.remove_task(&name).await,
        ConsoleRequest::ToggleNotification { kind, enabled } => {
            settings.toggle_notification(&kind, enabled).await
        }
        ConsoleRequest::SetServerOptions { port } => {
            settings.set_server_options(ServerOptions { port }).await
        }
        ConsoleRequest::SetConnectionSettings { settings: value } => {
            settings.set_connection_settings(value).await
        }
        ConsoleRequest::SetWebhook { url } => settings.set_webhook(url).await,
        ConsoleRequest::ResetSettings => {
            let reset = settings.reset().await;
            if reset.is_ok() {
                hub.control().notify(Notification::SettingsRestored);
            }
            reset
        }
        ConsoleRequest::Query { request_id, what } => {
            return Some(query(hub, request_id, what).await);
        }
        ConsoleRequest::Ping => return Some(ConsoleReply::Pong),
    };

    outcome.err().map(|e| {
        tracing::error!("Console request failed: {e}");
        ConsoleReply::Error {
            message: e.to_string(),
        }
    })
}

async fn query<C, S, D>(hub: &Hub<C, S, D>, request_id: Option<String>, what: QueryKind) -> ConsoleReply
where
    C: ControlPlane,
    S: SettingsStore,
    D: Dialer,
{
    let settings = hub.settings();
    let data = match what {
        QueryKind::Clients => to_value(settings.clients().await),
        QueryKind::Lists => to_value(settings.lists().await),
        QueryKind::Tasks => to_value(settings.tasks().await),
        QueryKind::ConnectionSettings => settings.connection_settings().await,
        QueryKind::NotificationSettings => to_value(settings.notification_preferences().await),
        // `port` is what this process listens on; `stored_port` takes effect on restart.
        QueryKind::ServerOptions => settings.server_options().await.map(|stored| {
            json!({ "port": hub.config().listen_port, "stored_port": stored.port })
        }),
        QueryKind::Connected => Ok(json!(hub.registry().all_names())),
    };

    match data {
        Ok(data) => ConsoleReply::QueryResult {
            request_id,
            what,
            data,
        },
        Err(e) => ConsoleReply::Error {
            message: e.to_string(),
        },
    }
}

fn to_value<T: Serialize>(result: Result<T, SettingsError>) -> Result<Value, SettingsError> {
    Ok(serde_json::to_value(result?)?)
}
