
// End-to-end session tests over real WebSocket connections
#[cfg(test)]
mod tests {
    use crate::messaging::{ClientMessage, ServerMessage};
    use crate::*;
    use futures_util::{SinkExt, StreamExt};
    use skirmish_core::{BroadcastEvent, CharacterVariant, Command, EntityId, Event, ObserverView, TeamIndex};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct Running {
        server: Arc<GameServer>,
        url: String,
        shutdown: ShutdownState,
        task: JoinHandle<Result<(), ServerError>>,
    }

    async fn start(config: ServerConfig) -> Running {
        let server = Arc::new(create_server_with_config(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let url = format!("ws://{}", listener.local_addr().expect("bound address"));
        let shutdown = ShutdownState::new();
        let task = {
            let server = server.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { server.serve(listener, shutdown).await })
        };
        Running {
            server,
            url,
            shutdown,
            task,
        }
    }

    fn fast_config() -> ServerConfig {
        ServerConfig {
            tick_interval_ms: 10,
            ..Default::default()
        }
    }

    async fn connect(url: &str) -> Client {
        let (client, _) = connect_async(url).await.expect("server accepts the handshake");
        client
    }

    async fn send(client: &mut Client, message: &ClientMessage) {
        let text = serde_json::to_string(message).expect("client frame encodes");
        client.send(Message::Text(text.into())).await.expect("frame sent");
    }

    async fn next_message(client: &mut Client) -> ServerMessage {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(3), client.next())
                .await
                .expect("a frame arrives in time")
                .expect("stream still open")
                .expect("valid websocket frame");
            if let Message::Text(text) = msg {
                return <ServerMessage as Event>::deserialize(text.as_bytes()).expect("server frame parses");
            }
        }
    }

    async fn join(client: &mut Client, name: &str, variant: CharacterVariant, team: i32) -> (EntityId, ObserverView) {
        send(
            client,
            &ClientMessage::Join {
                name: name.to_string(),
                variant,
                team: TeamIndex(team),
            },
        )
        .await;

        loop {
            if let ServerMessage::Welcome { entity, snapshot, .. } = next_message(client).await {
                let mut view = ObserverView::new();
                view.apply_snapshot(&snapshot);
                return (entity, view);
            }
        }
    }

    async fn stop(running: Running) {
        running.server.shutdown().await.expect("shutdown signal sent");
        tokio::time::timeout(Duration::from_secs(3), running.task)
            .await
            .expect("server stops in time")
            .expect("server task did not panic")
            .expect("server stopped cleanly");
        assert!(running.shutdown.is_shutdown_complete());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_join_command_and_tick_delivery() {
        let running = start(fast_config()).await;

        let mut ada = connect(&running.url).await;
        let (ada_entity, _) = join(&mut ada, "ada", CharacterVariant::RangedSingle, 0).await;

        let mut bo = connect(&running.url).await;
        let (bo_entity, bo_view) = join(&mut bo, "bo", CharacterVariant::MeleeSingle, 1).await;
        assert_ne!(ada_entity, bo_entity);
        assert!(
            bo_view.read(ada_entity, skirmish_core::FieldKey::CurrentHealth).is_some(),
            "a late joiner sees earlier entities in its welcome snapshot"
        );

        send(
            &mut ada,
            &ClientMessage::Command(Command::AttackPrimary {
                pressed: true,
                aim: None,
            }),
        )
        .await;

        let mut committed = false;
        for _ in 0..100 {
            if let ServerMessage::Tick(output) = next_message(&mut bo).await {
                if output
                    .events
                    .iter()
                    .any(|e| matches!(e, BroadcastEvent::AttackCommitted { entity, .. } if *entity == ada_entity))
                {
                    committed = true;
                    break;
                }
            }
        }
        assert!(committed, "every session observes the attack commit");
        assert_eq!(running.server.get_connection_manager().connection_count(), 2);

        stop(running).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_client_dropping_right_after_join_is_despawned() {
        let running = start(fast_config()).await;

        let mut ada = connect(&running.url).await;
        let (ada_entity, _) = join(&mut ada, "ada", CharacterVariant::MeleeSingle, 0).await;

        let mut ghost = connect(&running.url).await;
        send(
            &mut ghost,
            &ClientMessage::Join {
                name: "ghost".to_string(),
                variant: CharacterVariant::RangedSingle,
                team: TeamIndex(1),
            },
        )
        .await;
        drop(ghost);

        let mut spawned = None;
        let mut despawned = false;
        for _ in 0..100 {
            let ServerMessage::Tick(output) = next_message(&mut ada).await else { continue };
            if spawned.is_none() {
                spawned = output.fields.iter().map(|u| u.entity).find(|e| *e != ada_entity);
            }
            if output
                .events
                .iter()
                .any(|e| matches!(e, BroadcastEvent::Despawned { entity } if Some(*entity) == spawned))
            {
                despawned = true;
                break;
            }
        }
        assert!(spawned.is_some(), "the ghost's join reached the authority");
        assert!(despawned, "the ghost's entity is released when its socket drops");

        for _ in 0..50 {
            if running.server.get_connection_manager().connection_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(running.server.get_connection_manager().connection_count(), 1);

        stop(running).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_frame_must_be_a_join() {
        let running = start(fast_config()).await;

        let mut client = connect(&running.url).await;
        send(&mut client, &ClientMessage::Command(Command::Interact)).await;
        match next_message(&mut client).await {
            ServerMessage::Error { code, .. } => assert_eq!(code, "join_required"),
            other => panic!("expected an error frame, got {other:?}"),
        }

        stop(running).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_limit_refuses_extra_sessions() {
        let running = start(ServerConfig {
            max_connections: 1,
            ..fast_config()
        })
        .await;

        let mut first = connect(&running.url).await;
        join(&mut first, "ada", CharacterVariant::MeleeSingle, 0).await;

        let mut second = connect(&running.url).await;
        match next_message(&mut second).await {
            ServerMessage::Error { code, .. } => assert_eq!(code, "server_full"),
            other => panic!("expected an error frame, got {other:?}"),
        }

        stop(running).await;
    }
}
