mod common;

use std::time::Duration;

use clan_core::Metadata;
use clan_runtime::{
    ClanRuntime, EntityStore, HookEventKind, InMemoryStore, NewPlayer, RuntimeConfig, SqliteStore,
    Topic,
};
use common::{charter, definition, id};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Accepts HTTP requests and forwards each request line and body.
async fn spawn_receiver() -> (String, mpsc::UnboundedReceiver<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                let (head, body) = loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        return;
                    }
                    raw.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&raw).to_string();
                    let Some(split) = text.find("\r\n\r\n") else {
                        continue;
                    };
                    let head = text[..split].to_string();
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    let body = &text[split + 4..];
                    if body.len() >= length {
                        break (head, body.to_string());
                    }
                };
                socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await
                    .unwrap();
                let request_line = head.lines().next().unwrap_or_default().to_string();
                let _ = tx.send((request_line, body));
            });
        }
    });

    (address, rx)
}

#[tokio::test]
async fn committed_changes_reach_subscribers() {
    let runtime = ClanRuntime::builder(InMemoryStore::new())
        .dispatch_hooks(false)
        .build()
        .await
        .unwrap();
    assert!(!runtime.is_dispatching());
    let mut clans = runtime.subscribe(Topic::Clan);
    let mut all = runtime.subscribe_all();

    let service = runtime.service();
    let game = service.upsert_game(definition(3)).unwrap();
    service
        .create_player(
            &game.public_id,
            NewPlayer {
                public_id: id("a"),
                name: "A".into(),
                metadata: Metadata::new(),
            },
        )
        .unwrap();
    service
        .create_clan(&game.public_id, &id("a"), charter("wolves"))
        .unwrap();

    let event = clans.recv().await.unwrap();
    assert_eq!(event.kind, HookEventKind::ClanCreated);
    assert_eq!(event.payload["publicID"], "wolves");
    assert_eq!(event.payload["owner"], "a");

    assert_eq!(all.recv().await.unwrap().kind, HookEventKind::PlayerCreated);
    assert_eq!(all.recv().await.unwrap().kind, HookEventKind::ClanCreated);

    runtime.shutdown().await.unwrap();
}

/// Registers a hook, applies to a clan and checks the rendered POST arrives.
async fn assert_application_hook_delivered<S: EntityStore + 'static>(store: S) {
    let (address, mut requests) = spawn_receiver().await;

    let config = RuntimeConfig {
        hook_timeout: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    let runtime = ClanRuntime::builder(store)
        .config(config)
        .build()
        .await
        .unwrap();
    assert!(runtime.is_dispatching());

    let service = runtime.service();
    let game = service.upsert_game(definition(3)).unwrap();
    for name in ["a", "b"] {
        service
            .create_player(
                &game.public_id,
                NewPlayer {
                    public_id: id(name),
                    name: name.to_uppercase(),
                    metadata: Metadata::new(),
                },
            )
            .unwrap();
    }
    service
        .create_clan(&game.public_id, &id("a"), charter("wolves"))
        .unwrap();
    service
        .register_hook(
            &game.public_id,
            id("on-apply"),
            HookEventKind::ApplicationCreated,
            format!("{address}/clans/{{{{clan.publicID}}}}/applications"),
        )
        .unwrap();

    service
        .apply(&game.public_id, &id("wolves"), &id("b"), Some("hi".into()))
        .unwrap();

    let (request_line, body) = tokio::time::timeout(Duration::from_secs(5), requests.recv())
        .await
        .expect("hook was not delivered")
        .unwrap();
    assert_eq!(request_line, "POST /clans/wolves/applications HTTP/1.1");
    let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["gameID"], "game");
    assert_eq!(payload["player"]["publicID"], "b");
    assert_eq!(payload["message"], "hi");

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn dispatcher_posts_rendered_hook_urls() {
    assert_application_hook_delivered(InMemoryStore::new()).await;
}

#[tokio::test]
async fn dispatcher_reads_hooks_from_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("hooks.db")).unwrap();
    assert_application_hook_delivered(store).await;
}
