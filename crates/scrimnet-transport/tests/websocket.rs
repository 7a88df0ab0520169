//! Integration tests for the WebSocket transport: a real server and a
//! real tokio-tungstenite client exchanging frames over localhost.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    use scrimnet_transport::{Connection, Listener, WsListener};

    async fn connect_client(
        addr: std::net::SocketAddr,
    ) -> tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    > {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let mut listener = WsListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");

        let server_handle =
            tokio::spawn(async move { listener.accept().await.expect("should accept") });

        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // Server sends; UTF-8 payloads go out as text frames.
        server_conn
            .send(br#"{"type":"lobbyClosed","reason":"test"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(
            msg.into_data().as_ref(),
            br#"{"type":"lobbyClosed","reason":"test"}"#,
        );

        // Client sends text; server receives the bytes.
        client_ws
            .send(Message::Text(r#"{"type":"getPublicLobbies"}"#.into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"getPublicLobbies"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let mut listener = WsListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().unwrap();

        let server_handle =
            tokio::spawn(async move { listener.accept().await.expect("should accept") });
        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_send_while_recv_pending_does_not_block() {
        let mut listener = WsListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().unwrap();

        let server_handle =
            tokio::spawn(async move { listener.accept().await.expect("should accept") });
        let mut client_ws = connect_client(addr).await;
        let server_conn = std::sync::Arc::new(server_handle.await.unwrap());

        // Park a reader on the connection, then send from another task.
        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        server_conn.send(b"pushed mid-read").await.expect("send");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"pushed mid-read");

        client_ws
            .send(Message::Text("done".into()))
            .await
            .unwrap();
        let received = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"done");
    }
}
