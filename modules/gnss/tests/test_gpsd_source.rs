use common::{fix::Fix, provider::ProviderError};
use futures::StreamExt;
use gnss::{FixSource, gpsd_source::{GpsdSource, parse_tpv_line}};
use std::{str::FromStr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

const TIMEOUT_MS: u64 = 100;

const TPV_MSG: &str = "{\"class\":\"TPV\",\"time\":\"2005-06-08T10:34:48.283Z\",\"lat\":37.7749,\"lon\":-122.4194,\"speed\":22.0,\"mode\":3}\n";

const NO_FIX_TPV_MSG: &str = "{\"class\":\"TPV\",\"mode\":1}\n";

const SKY_MSG: &str = "{\"class\":\"SKY\",\"device\":\"/dev/pts/1\",\"satellites\":[{\"PRN\":23,\"el\":6,\"az\":84,\"ss\":0,\"used\":false}]}\n";

struct GpsdServer {
    socket: TcpListener,
}

impl GpsdServer {
    async fn new() -> GpsdServer {
        GpsdServer {
            socket: TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind gpsd test server"),
        }
    }

    fn address(&self) -> String {
        self.socket.local_addr().unwrap().to_string()
    }

    async fn accept_client(&self) -> TcpStream {
        let (client, _) = timeout(Duration::from_millis(TIMEOUT_MS), self.socket.accept())
            .await
            .expect("No client connected within timeout")
            .expect("Client connection failed");
        client
    }
}

fn expected_fix() -> Fix {
    Fix::new(
        37.7749,
        -122.4194,
        chrono::DateTime::<chrono::Utc>::from_str("2005-06-08T10:34:48.283Z").unwrap(),
    )
}

#[test]
fn parse_tpv_report() {
    assert_eq!(parse_tpv_line(TPV_MSG.trim()), Some(expected_fix()));
}

#[test]
fn ignore_reports_without_position() {
    assert_eq!(parse_tpv_line(NO_FIX_TPV_MSG.trim()), None);
    assert_eq!(parse_tpv_line(SKY_MSG.trim()), None);
    assert_eq!(parse_tpv_line("not json"), None);
}

#[test]
fn reject_invalid_address() {
    assert!(GpsdSource::new("localhost").is_err());
}

#[tokio::test]
#[test_log::test]
async fn enable_gpsd_notifications() {
    let server = GpsdServer::new().await;
    let source = GpsdSource::new(&server.address()).unwrap();
    let (stream, client) = tokio::join!(source.open(), server.accept_client());
    let _stream = stream.expect("Failed to open gpsd source");
    let mut client = client;
    let enable_cmd = gpsd_proto::ENABLE_WATCH_CMD;
    let mut buf: Vec<u8> = vec![0; enable_cmd.len()];
    timeout(Duration::from_millis(TIMEOUT_MS), client.read_exact(&mut buf))
        .await
        .expect("Enable command not received in time")
        .unwrap();
    assert_eq!(std::str::from_utf8(&buf).unwrap(), enable_cmd);
}

#[tokio::test]
#[test_log::test]
async fn stream_fixes_from_tpv_reports() {
    let server = GpsdServer::new().await;
    let source = GpsdSource::new(&server.address()).unwrap();
    let (stream, client) = tokio::join!(source.open(), server.accept_client());
    let mut stream = stream.unwrap();
    let mut client = client;
    client.write_all(SKY_MSG.as_bytes()).await.unwrap();
    client.write_all(TPV_MSG.as_bytes()).await.unwrap();
    let fix = timeout(Duration::from_millis(TIMEOUT_MS), stream.next())
        .await
        .expect("Failed to receive fix in required time")
        .unwrap()
        .unwrap();
    assert_eq!(fix, expected_fix());

    drop(client);
    let end = timeout(Duration::from_millis(TIMEOUT_MS), stream.next())
        .await
        .expect("Stream did not end after the connection closed");
    assert!(end.is_none());
}

#[tokio::test]
async fn report_connection_failure() {
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let source = GpsdSource::new(&address).unwrap();
    match source.open().await {
        Err(ProviderError::Connection(_)) => (),
        Err(e) => panic!("Unexpected error {e}"),
        Ok(_) => panic!("Connected to a closed port"),
    }
}
