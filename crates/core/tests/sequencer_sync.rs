//! Bridge against a fake clip sequencer on the loopback interface.

use std::sync::Arc;
use std::time::Duration;

use conductor_core::{DirtyFlags, SequencerBridge, SequencerCommand, SequencerSettings};
use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

const TRANSPORT: &str = "transport,p,120.0,0.5,n,3,1";
const TRACKS: &str = "tracks,t,2,Ep,pW,t,2,c,E";

/// Answers state requests with fixed payloads and reports every other address.
async fn fake_sequencer() -> (u16, mpsc::UnboundedReceiver<OscMessage>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((size, from)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok((_, OscPacket::Message(msg))) = decoder::decode_udp(&buf[..size]) else {
                continue;
            };
            let payload = match msg.addr.as_str() {
                "/state/transport" => TRANSPORT,
                "/state/tracks" => TRACKS,
                _ => {
                    let _ = tx.send(msg);
                    continue;
                }
            };
            let reply = OscPacket::Message(OscMessage {
                addr: "/stateFromShepherd".to_string(),
                args: vec![OscType::String(payload.to_string())],
            });
            let bytes = encoder::encode(&reply).unwrap();
            let _ = socket.send_to(&bytes, from).await;
        }
    });

    (port, rx)
}

async fn start_bridge(send_port: u16) -> (Arc<SequencerBridge>, Arc<DirtyFlags>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let dirty = Arc::new(DirtyFlags::default());
    dirty.take_pads();
    dirty.take_buttons();

    let settings = SequencerSettings {
        host: "127.0.0.1".to_string(),
        send_port,
        receive_port: 0,
        transport_poll_hz: 20,
        tracks_poll_hz: 20,
        ..SequencerSettings::default()
    };
    let bridge = Arc::new(SequencerBridge::new(settings, dirty.clone()));
    bridge.start().await.unwrap();
    (bridge, dirty)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_polled_state_reaches_snapshot() {
    let (port, _commands) = fake_sequencer().await;
    let (bridge, dirty) = start_bridge(port).await;

    wait_for(|| bridge.grid().num_tracks() == 2 && bridge.transport().bpm == 120.0).await;

    let transport = bridge.transport();
    assert!(transport.is_playing);
    assert!(!transport.metronome_on);
    assert_eq!(transport.selected_track, 3);
    assert_eq!(transport.selected_scene, 1);

    assert!(bridge.clip(0, 1).playing);
    assert!(bridge.clip(1, 1).empty);
    assert!(dirty.take_pads());
    assert!(dirty.take_buttons());

    // The same payloads keep arriving without changing anything
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!dirty.take_pads());
    assert!(!dirty.take_buttons());

    bridge.stop();
    assert!(!bridge.is_running());
}

#[tokio::test]
async fn test_commands_are_sent() {
    let (port, mut commands) = fake_sequencer().await;
    let (bridge, _) = start_bridge(port).await;

    bridge.send(SequencerCommand::PlayStopClip { track: 1, clip: 6 });
    bridge.send(SequencerCommand::SetBpm(98.0));

    let first = tokio::time::timeout(Duration::from_secs(3), commands.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.addr, "/clip/playStop");
    assert_eq!(first.args, vec![OscType::Int(1), OscType::Int(6)]);

    let second = tokio::time::timeout(Duration::from_secs(3), commands.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.addr, "/transport/setBpm");
    assert_eq!(second.args, vec![OscType::Float(98.0)]);

    bridge.stop();
}

#[tokio::test]
async fn test_no_listener_is_silent() {
    // Nobody answers on this port; the bridge keeps polling without state
    let unused = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = unused.local_addr().unwrap().port();
    drop(unused);

    let (bridge, dirty) = start_bridge(port).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(bridge.grid().num_tracks(), 0);
    assert!(!dirty.take_pads());
    bridge.stop();
}

#[tokio::test]
async fn test_dropping_bridge_releases_socket() {
    let (port, _commands) = fake_sequencer().await;
    let (bridge, _) = start_bridge(port).await;
    let local = bridge.local_addr().unwrap();
    let weak = Arc::downgrade(&bridge);

    drop(bridge);
    assert!(weak.upgrade().is_none());

    // Tasks exit on their next wakeup and release the reply socket
    let rebound = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let Ok(socket) = UdpSocket::bind(("0.0.0.0", local.port())).await {
                return socket;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(rebound.is_ok());
}
