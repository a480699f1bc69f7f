//! Full session lifecycle against the mock client.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use mocap_harness::providers::MockClient;
use mocap_harness::types::{
    ConnectionConfig, IDENTITY_ORIENTATION, MocapFrame, RigidBody, ServerDescription, Severity,
    TransportMode,
};
use mocap_harness::{ErrorCode, HarnessError, Session, SessionState, ShutdownSignal};

/// Shared in-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

fn unicast_config() -> ConnectionConfig {
    ConnectionConfig::new("127.0.0.1", "127.0.0.1")
        .and_then(|config| config.with_ports(1510, 1511))
        .map(|config| config.with_transport(TransportMode::Unicast))
        .unwrap()
}

fn mock_motive() -> MockClient {
    MockClient::new().with_server(ServerDescription::present("MockMotive", (3, 0, 0), (4, 1, 0)))
}

#[tokio::test(start_paused = true)]
async fn session_lifecycle_with_mock_server() {
    let (logs, _guard) = capture_logs();
    let client = mock_motive();

    let mut session = Session::configure(unicast_config(), client.clone()).unwrap();
    let server = session.connect().unwrap();
    assert_eq!(server.application_name, "MockMotive");
    assert_eq!(server.protocol_version.to_string(), "4.1.0.0");
    assert_eq!(session.state(), SessionState::Connected);
    assert!(logs.contents().contains("Connected to Motive server: MockMotive"));

    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    session
        .register_frame_handler(move |frame| {
            frames_tx.send(frame.clone())?;
            Ok(())
        })
        .unwrap();

    let frame = MocapFrame::new(42)
        .with_rigid_bodies(vec![RigidBody::new(1, [0.0, 0.0, 0.0], IDENTITY_ORIENTATION)]);
    let emitter = client.clone();
    let sent = frame.clone();
    let delivered = std::thread::spawn(move || emitter.emit_frame(&sent)).join().unwrap();
    assert!(delivered);

    let received = tokio::time::timeout(Duration::from_secs(1), frames_rx.recv())
        .await
        .expect("frame was not delivered")
        .expect("handler channel closed");
    assert_eq!(received, frame);
    assert_eq!(session.latest_frame().as_deref(), Some(&frame));

    let poll = Duration::from_millis(100);
    let trigger_after = Duration::from_millis(250);
    let signal = ShutdownSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(trigger_after).await;
        trigger.trigger();
    });

    let start = Instant::now();
    session.run_until_signaled(&signal, poll).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= trigger_after);
    assert!(elapsed - trigger_after <= poll, "idle loop overshot by {:?}", elapsed - trigger_after);

    session.shutdown().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(client.disconnect_calls(), 1);
    assert!(!client.is_connected());

    // The dispatcher exits after shutdown and drops the sender; no duplicate
    // delivery of frame 42 may be pending.
    assert_eq!(frames_rx.recv().await, None);

    let stats = session.stats();
    assert_eq!(stats.frames_received, 1);
    assert_eq!(stats.frames_dropped, 0);
    assert!(logs.contents().contains("Shutting down..."));
}

#[tokio::test]
async fn shutdown_twice_disconnects_once() {
    let client = mock_motive();
    let mut session = Session::configure(unicast_config(), client.clone()).unwrap();
    session.connect().unwrap();

    session.shutdown().unwrap();
    session.shutdown().unwrap();
    drop(session);

    assert_eq!(client.disconnect_calls(), 1);
}

#[tokio::test]
async fn absent_host_fails_and_releases_transport() {
    let client = MockClient::new();
    let mut session = Session::configure(unicast_config(), client.clone()).unwrap();

    let err = session.connect().unwrap_err();
    assert!(matches!(err, HarnessError::ServerAbsent { ref server } if server == "127.0.0.1"));
    assert_eq!(err.exit_code(), 1);
    assert!(!client.is_connected());

    session.shutdown().unwrap();
    assert_eq!(client.disconnect_calls(), 1);
}

#[tokio::test]
async fn connect_failure_surfaces_code() {
    let client = mock_motive().fail_connect(ErrorCode::NETWORK);
    let mut session = Session::configure(unicast_config(), client.clone()).unwrap();

    let err = session.connect().unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NETWORK));
    assert!(err.to_string().contains("error code 3"));

    session.shutdown().unwrap();
    assert_eq!(client.disconnect_calls(), 0);
}

#[tokio::test]
async fn failing_message_handler_keeps_receiving() {
    let client = mock_motive();
    let mut session = Session::configure(unicast_config(), client.clone()).unwrap();
    session.connect().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_message_handler(move |severity, text| {
            tx.send((severity, text.to_string()))?;
            if severity == Severity::Error {
                anyhow::bail!("refusing {text}");
            }
            Ok(())
        })
        .unwrap();

    assert!(client.emit_message(Severity::Error, "first"));
    assert!(client.emit_message(Severity::Warning, "second"));

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first, (Severity::Error, "first".to_string()));
    assert_eq!(second, (Severity::Warning, "second".to_string()));

    tokio::task::yield_now().await;
    assert_eq!(session.stats().handler_failures, 1);
    session.shutdown().unwrap();
}
