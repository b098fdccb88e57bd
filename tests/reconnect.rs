//! Reconnect behaviour against a loopback server.

#![cfg(feature = "tokio")]

use std::time::Duration;

use slirc_session::error::SessionError;
use slirc_session::{Client, Event, ReconnectPolicy, Session, SessionConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read until `needle` has arrived and the last line is complete.
async fn read_until(sock: &mut TcpStream, needle: &str) -> String {
    let mut seen = Vec::new();
    let mut buf = [0u8; 512];
    while !String::from_utf8_lossy(&seen).contains(needle) || !seen.ends_with(b"\r\n") {
        let n = sock.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed early");
        seen.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(seen).unwrap()
}

/// Read the registration burst, which ends with USER.
async fn read_login(sock: &mut TcpStream) -> String {
    read_until(sock, "USER ").await
}

fn config(port: u16) -> SessionConfig {
    let mut config = SessionConfig::new("127.0.0.1", port, "bot");
    config.reconnect = ReconnectPolicy::immediate();
    config
}

#[tokio::test]
async fn test_close_clears_state_and_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut first, _) = listener.accept().await.unwrap();
        let login1 = read_login(&mut first).await;
        first
            .write_all(
                b":srv 001 bot :Welcome\r\n\
                  :srv 005 bot CHANMODES=b,k,l,imnpst PREFIX=(ov)@+ :are supported\r\n\
                  :bot!b@h JOIN #c\r\n",
            )
            .await
            .unwrap();
        // the channel bootstrap requests prove the JOIN was processed
        read_until(&mut first, "MODE #c +b").await;
        drop(first);

        let (mut second, _) = listener.accept().await.unwrap();
        let login2 = read_login(&mut second).await;
        second.write_all(b":srv 001 bot :Welcome back\r\n").await.unwrap();

        let mut rest = Vec::new();
        let _ = second.read_to_end(&mut rest).await;
        (login1, login2)
    });

    let mut connects = 0;
    let mut log = Vec::new();
    let handler = |session: &mut Session, event: &Event| match event {
        Event::Connect => {
            connects += 1;
            log.push(format!("connect {}", session.channels().count()));
            if connects == 2 {
                assert!(session.isupport().is_empty());
                session.kill();
            }
        }
        Event::Disconnect => log.push(format!("disconnect {}", session.channels().count())),
        Event::Join { channel, .. } => log.push(format!("join {}", channel)),
        _ => {}
    };

    let mut client = Client::new(config(port), handler);
    tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client did not stop")
        .expect("client failed");
    drop(client);

    assert_eq!(
        log,
        [
            "connect 0",
            "join #c",
            "disconnect 1",
            "connect 0",
            "disconnect 0"
        ]
    );

    let (login1, login2) = server.await.unwrap();
    assert_eq!(login1, "NICK bot\r\nUSER bot 0 * :bot\r\n");
    assert_eq!(login2, login1);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = config(port);
    config.reconnect.max_attempts = Some(3);
    let mut client = Client::new(config, |_: &mut Session, _: &Event| {});

    let err = tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client did not stop")
        .unwrap_err();
    assert!(matches!(err, SessionError::ReconnectExhausted(3)));
}

#[tokio::test]
async fn test_failed_connects_notify_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut config = config(port);
    config.reconnect.max_attempts = Some(2);
    let mut disconnects = 0;
    let handler = |session: &mut Session, event: &Event| {
        if let Event::Disconnect = event {
            assert_eq!(session.channels().count(), 0);
            disconnects += 1;
        }
    };
    let mut client = Client::new(config, handler);

    let err = tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client did not stop")
        .unwrap_err();
    drop(client);
    assert!(matches!(err, SessionError::ReconnectExhausted(2)));
    assert_eq!(disconnects, 2);
}

#[tokio::test]
async fn test_kill_handle_stops_idle_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        read_login(&mut sock).await;
        let mut rest = Vec::new();
        let _ = sock.read_to_end(&mut rest).await;
    });

    let mut client = Client::new(config(port), |_: &mut Session, _: &Event| {});
    let handle = client.kill_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.kill();
    });

    tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client did not stop")
        .expect("client failed");
    server.await.unwrap();
}
