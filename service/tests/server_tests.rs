//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Acceptance loop tests over real loopback sockets.

use serigate_serial::{SerialPortInfo, VirtualSerialLine};
use serigate_service::{
    GatewayError, GatewayHandler, OpenLine, SerialLineFactory, SerialPool, ServerConfig,
    GatewayServer,
};
use serigate_telnet::consts;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;

/// A factory over a pre-created in-memory device; the far side is kept by
/// the test to play the serial device.
struct TestFactory {
    info: SerialPortInfo,
    io: Mutex<Option<DuplexStream>>,
}

impl TestFactory {
    fn pair(device: &str) -> (Self, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        (
            TestFactory {
                info: SerialPortInfo::new(device),
                io: Mutex::new(Some(near)),
            },
            far,
        )
    }
}

impl SerialLineFactory for TestFactory {
    fn info(&self) -> &SerialPortInfo {
        &self.info
    }

    fn open(&self) -> serigate_service::Result<OpenLine> {
        let io = self
            .io
            .lock()
            .expect("factory lock")
            .take()
            .ok_or_else(|| GatewayError::Other("device already open".to_string()))?;
        Ok(OpenLine {
            io: Box::new(io),
            control: Box::new(VirtualSerialLine::default()),
        })
    }
}

#[tokio::test]
async fn server_serves_a_telnet_connection_end_to_end() {
    let (factory, serial_device) = TestFactory::pair("/dev/ttyV0");
    let pool = SerialPool::new(vec![Box::new(factory)]);
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
    let server = GatewayServer::new(config, pool).await.unwrap();
    server.start(Arc::new(GatewayHandler)).await.unwrap();

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    // the session opens with the telnet offers
    let mut offers = [0u8; 18];
    client.read_exact(&mut offers).await.unwrap();
    assert_eq!(
        &offers[..3],
        &[consts::IAC, consts::DO, consts::option::COM_PORT_CONTROL]
    );

    // serial data flows out to the network client
    let (_device_read, mut device_write) = tokio::io::split(serial_device);
    device_write.write_all(b"ready\r\n").await.unwrap();
    let mut greeting = [0u8; 7];
    client.read_exact(&mut greeting).await.unwrap();
    assert_eq!(&greeting, b"ready\r\n");

    drop(client);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn connections_without_a_free_line_are_turned_away() {
    let pool = SerialPool::new(Vec::new());
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
    let server = GatewayServer::new(config, pool).await.unwrap();
    server.start(Arc::new(GatewayHandler)).await.unwrap();

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut notice = Vec::new();
    client.read_to_end(&mut notice).await.unwrap();
    assert_eq!(&notice, b"\r\nserigate: no serial line available\r\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn server_lifecycle_flags() {
    let pool = SerialPool::new(Vec::new());
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
    let server = GatewayServer::new(config, pool).await.unwrap();
    assert!(!server.is_running());

    server.start(Arc::new(GatewayHandler)).await.unwrap();
    assert!(server.is_running());
    assert!(server.start(Arc::new(GatewayHandler)).await.is_err());

    server.shutdown().await.unwrap();
    assert!(!server.is_running());
    assert!(server.shutdown().await.is_err());
}
