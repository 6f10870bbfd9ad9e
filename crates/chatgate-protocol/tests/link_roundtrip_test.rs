// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Localhost QUIC round-trip tests for the link layer.

use std::net::SocketAddr;
use std::sync::Arc;

use chatgate_protocol::frame::Frame;
use chatgate_protocol::message::{LinkRequest, LinkResponse, NamedRef};
use chatgate_protocol::{LinkClient, LinkClientConfig, LinkServer};

/// Spawn a server that answers every request with a canned channel list.
async fn spawn_echo_server() -> (Arc<LinkServer>, SocketAddr) {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = Arc::new(LinkServer::localhost(addr).expect("bind localhost server"));
    let local_addr = server.local_addr().unwrap();

    let accept_server = server.clone();
    tokio::spawn(async move {
        accept_server
            .run(|conn| async move {
                conn.run(|mut stream| async move {
                    let Ok(frame) = stream.read_frame().await else {
                        return;
                    };
                    let Ok(request) = frame.decode::<LinkRequest>() else {
                        return;
                    };
                    let response = match request {
                        LinkRequest::ListChannels => LinkResponse::Channels(vec![NamedRef {
                            name: "general".into(),
                            id: "C1".into(),
                        }]),
                        other => LinkResponse::Error {
                            code: "UNEXPECTED".into(),
                            message: other.op_name().into(),
                        },
                    };
                    let _ = stream.write_frame(&Frame::response(&response).unwrap()).await;
                    let _ = stream.finish();
                })
                .await;
            })
            .await
    });

    (server, local_addr)
}

fn client_for(addr: SocketAddr) -> LinkClient {
    LinkClient::new(LinkClientConfig {
        gateway_addr: addr,
        dangerous_skip_cert_verification: true,
        connect_timeout_ms: 2_000,
        retry_interval_ms: 100,
        ..Default::default()
    })
    .expect("create client")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_request_response_roundtrip() {
    let (server, addr) = spawn_echo_server().await;
    let client = client_for(addr);

    client.connect_with_retry().await.expect("connect");
    assert!(client.is_connected().await);

    let response: LinkResponse = client.request(&LinkRequest::ListChannels).await.unwrap();
    match response {
        LinkResponse::Channels(channels) => {
            assert_eq!(channels.len(), 1);
            assert_eq!(channels[0].id, "C1");
        }
        other => panic!("unexpected response: {:?}", other),
    }

    client.close().await;
    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_multiple_requests_reuse_connection() {
    let (server, addr) = spawn_echo_server().await;
    let client = client_for(addr);

    for _ in 0..3 {
        let response: LinkResponse = client.request(&LinkRequest::ListChannels).await.unwrap();
        assert!(matches!(response, LinkResponse::Channels(_)));
    }

    client.close().await;
    server.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fire_and_forget_does_not_block() {
    let (server, addr) = spawn_echo_server().await;
    let client = client_for(addr);

    client
        .send_fire_and_forget(&LinkRequest::ListChannels)
        .await
        .expect("fire-and-forget send");

    client.close().await;
    server.close();
}
