use super::*;
use crate::bencode::{encode, Value};
use crate::config::ClientConfig;
use crate::metainfo::InfoHash;
use crate::peer::PeerId;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn dict(entries: Vec<(&str, Value)>) -> Value {
    let map: BTreeMap<Bytes, Value> = entries
        .into_iter()
        .map(|(k, v)| (Bytes::copy_from_slice(k.as_bytes()), v))
        .collect();
    Value::Dict(map)
}

fn compact_body(complete: i64, incomplete: i64, peers: &[u8]) -> Vec<u8> {
    encode(&dict(vec![
        ("complete", Value::Integer(complete)),
        ("incomplete", Value::Integer(incomplete)),
        ("interval", Value::Integer(1800)),
        ("peers", Value::Bytes(Bytes::copy_from_slice(peers))),
    ]))
    .unwrap()
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

/// Serves `body` to every request and records each request line.
async fn stub_tracker(body: Vec<u8>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/announce", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let head = String::from_utf8_lossy(&head);
            if let Some(line) = head.lines().next() {
                seen.lock().push(line.to_string());
            }

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes()).await;
            let _ = stream.write_all(&body).await;
            let _ = stream.shutdown().await;
        }
    });

    (url, requests)
}

/// Accepts connections and never answers.
async fn silent_tracker() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/announce", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    url
}

async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/announce", listener.local_addr().unwrap());
    drop(listener);
    url
}

fn request(event: TrackerEvent) -> AnnounceRequest {
    AnnounceRequest {
        info_hash: InfoHash::from_bytes(&[0xab; 20]).unwrap(),
        peer_id: PeerId(*b"-BC0001-abcdefghijkl"),
        port: 6881,
        uploaded: 10,
        downloaded: 20,
        left: 30,
        event,
    }
}

#[test]
fn test_tracker_event() {
    assert_eq!(TrackerEvent::Started.as_str(), "started");
    assert_eq!(TrackerEvent::Stopped.as_str(), "stopped");
    assert_eq!(TrackerEvent::Completed.as_str(), "completed");
    assert_eq!(TrackerEvent::None.as_str(), "");
    assert_eq!(TrackerEvent::default(), TrackerEvent::None);
}

#[test]
fn test_compact_peer_v4() {
    let bytes = [192, 168, 1, 1, 0x1A, 0xE1]; // 192.168.1.1:6881
    let peer = Peer::from_compact_v4(&bytes).unwrap();

    assert_eq!(peer.addr, addr("192.168.1.1:6881"));
    assert_eq!(peer.peer_id, None);
    assert!(Peer::from_compact_v4(&bytes[..5]).is_none());
}

#[test]
fn test_compact_peer_v6() {
    let mut bytes = [0u8; 18];
    bytes[15] = 1;
    bytes[16] = 0x1A;
    bytes[17] = 0xE1;
    let peer = Peer::from_compact_v6(&bytes).unwrap();
    assert_eq!(peer.addr, addr("[::1]:6881"));
}

#[test]
fn test_parse_compact_peers() {
    let data = [
        192, 168, 1, 1, 0x1A, 0xE1, // 192.168.1.1:6881
        10, 0, 0, 1, 0x1A, 0xE1, // 10.0.0.1:6881
    ];

    let peers = parse_compact_peers(&data);
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[1].addr, addr("10.0.0.1:6881"));
}

#[test]
fn test_parse_compact_peers_drops_partial_record() {
    let data = [10, 0, 0, 1, 0x1A, 0xE1, 10, 0, 0];
    let peers = parse_compact_peers(&data);
    assert_eq!(peers, vec![Peer::new(addr("10.0.0.1:6881"))]);
}

#[test]
fn test_parse_response_compact() {
    let mut peers6 = vec![0u8; 18];
    peers6[15] = 1;
    peers6[17] = 80;
    let body = encode(&dict(vec![
        ("complete", Value::Integer(5)),
        ("incomplete", Value::Integer(3)),
        ("interval", Value::Integer(900)),
        ("min interval", Value::Integer(60)),
        ("peers", Value::Bytes(Bytes::from_static(&[127, 0, 0, 1, 0x1A, 0xE1]))),
        ("peers6", Value::Bytes(Bytes::from(peers6))),
        ("tracker id", Value::string("abc")),
    ]))
    .unwrap();

    let response = parse_response(&body).unwrap();
    assert_eq!(response.interval, 900);
    assert_eq!(response.min_interval, Some(60));
    assert_eq!(response.seeders(), 5);
    assert_eq!(response.leechers(), 3);
    assert_eq!(response.tracker_id.as_deref(), Some("abc"));
    assert_eq!(
        response.peers.iter().map(|p| p.addr).collect::<Vec<_>>(),
        vec![addr("127.0.0.1:6881"), addr("[::1]:80")]
    );
}

#[test]
fn test_parse_response_dictionary_peers() {
    let body = encode(&dict(vec![
        ("interval", Value::Integer(1800)),
        (
            "peers",
            Value::List(vec![
                dict(vec![
                    ("ip", Value::string("10.0.0.2")),
                    ("peer id", Value::string("-UT3500-abcdefghijkl")),
                    ("port", Value::Integer(51413)),
                ]),
                dict(vec![
                    ("ip", Value::string("2001:db8::1")),
                    ("port", Value::Integer(6881)),
                ]),
                dict(vec![
                    ("ip", Value::string("not-an-ip.example")),
                    ("port", Value::Integer(6881)),
                ]),
            ]),
        ),
    ]))
    .unwrap();

    let response = parse_response(&body).unwrap();
    assert_eq!(response.peers.len(), 2);
    assert_eq!(response.peers[0].addr, addr("10.0.0.2:51413"));
    assert_eq!(
        response.peers[0].peer_id.and_then(|id| id.client_id().map(String::from)),
        Some("UT3500".to_string())
    );
    assert_eq!(response.peers[1].addr, addr("[2001:db8::1]:6881"));
    assert_eq!(response.peers[1].peer_id, None);
    assert_eq!(response.complete, None);
    assert_eq!(response.seeders(), 0);
}

#[test]
fn test_parse_response_failure_reason() {
    let body = b"d14:failure reason17:torrent not founde";
    match parse_response(body) {
        Err(TrackerError::Failure(reason)) => assert_eq!(reason, "torrent not found"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_parse_response_ignores_unknown_keys_and_defaults_interval() {
    let body = b"d11:external ip4:\x7f\x00\x00\x015:peers0:e";
    let response = parse_response(body).unwrap();
    assert_eq!(response.interval, 1800);
    assert!(response.peers.is_empty());
}

#[test]
fn test_parse_response_invalid() {
    for body in [&b"not bencode"[..], b"le", b"d8:intervali-1ee", b""] {
        match parse_response(body) {
            Err(TrackerError::InvalidResponse(msg)) => {
                assert!(msg.contains("compact"));
                assert!(msg.contains("dictionary"));
            }
            other => panic!("expected invalid response for {:?}, got {:?}", body, other),
        }
    }
}

#[test]
fn test_announce_response() {
    let mut response = AnnounceResponse::new(1800);
    response.complete = Some(10);
    response.incomplete = Some(5);

    assert_eq!(response.interval, 1800);
    assert_eq!(response.seeders(), 10);
    assert_eq!(response.leechers(), 5);
}

#[test]
fn test_counter() {
    let counter = Counter::new();
    counter.add(3);
    counter.add(4);
    assert_eq!(counter.value(), 7);
    counter.reset();
    assert_eq!(counter.value(), 0);
}

#[test]
fn test_peer_pool_deduplicates_by_address() {
    let pool = PeerPool::new();
    let id = PeerId(*b"-UT3500-abcdefghijkl");

    pool.add(Peer::with_id(addr("10.0.0.1:6881"), id));
    pool.add(Peer::new(addr("10.0.0.1:6881")));
    pool.add(Peer::new(addr("10.0.0.2:6881")));

    assert_eq!(pool.len(), 2);
    assert!(pool.contains(&addr("10.0.0.2:6881")));
    assert_eq!(pool.peers()[0].peer_id, Some(id));

    let other = PeerPool::new();
    other.add(Peer::new(addr("10.0.0.3:6881")));
    pool.merge(other);
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.to_string().lines().count(), 3);
}

#[test]
fn test_peer_pool_concurrent_adds() {
    let pool = Arc::new(PeerPool::new());
    let handles: Vec<_> = (0..4u8)
        .map(|t| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for i in 0..50u8 {
                    pool.add(Peer::new(SocketAddr::from(([10, t, 0, i], 6881))));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(pool.len(), 200);
}

#[test]
fn test_http_tracker_invalid_url() {
    assert!(matches!(
        HttpTracker::new("ftp://tracker.example.com"),
        Err(TrackerError::InvalidUrl(_))
    ));
    assert!(HttpTracker::new("udp://tracker.example.com:80").is_err());
}

#[test]
fn test_announce_url() {
    let tracker = HttpTracker::new("http://tracker.example.com/announce").unwrap();
    let url = tracker.announce_url(&request(TrackerEvent::Started));

    assert!(url.starts_with("http://tracker.example.com/announce?info_hash=%AB%AB"));
    assert!(url.contains("&peer_id=-BC0001-abcdefghijkl"));
    assert!(url.contains("&port=6881&uploaded=10&downloaded=20&left=30&compact=1"));
    assert!(url.ends_with("&event=started"));

    let tracker = HttpTracker::new("http://tracker.example.com/announce?passkey=xyz").unwrap();
    let url = tracker.announce_url(&request(TrackerEvent::None));
    assert!(url.starts_with("http://tracker.example.com/announce?passkey=xyz&info_hash="));
    assert!(!url.contains("event="));
}

#[tokio::test]
async fn test_http_announce() {
    let body = encode(&dict(vec![
        ("complete", Value::Integer(2)),
        ("incomplete", Value::Integer(1)),
        ("interval", Value::Integer(1800)),
        ("peers", Value::Bytes(Bytes::from_static(&[10, 0, 0, 1, 0x1A, 0xE1]))),
        ("tracker id", Value::string("t-42")),
    ]))
    .unwrap();
    let (url, requests) = stub_tracker(body).await;
    let tracker = HttpTracker::new(&url).unwrap();

    let response = tracker.announce(&request(TrackerEvent::Started)).await.unwrap();
    assert_eq!(response.seeders(), 2);
    assert_eq!(response.peers, vec![Peer::new(addr("10.0.0.1:6881"))]);
    assert_eq!(tracker.tracker_id().as_deref(), Some("t-42"));

    let line = requests.lock()[0].clone();
    assert!(line.starts_with("GET /announce?info_hash=%AB"));
    assert!(line.contains("compact=1"));
    assert!(line.contains("event=started"));
}

#[tokio::test]
async fn test_http_announce_respects_interval_and_tracker_id() {
    let body = encode(&dict(vec![
        ("interval", Value::Integer(1800)),
        ("min interval", Value::Integer(600)),
        ("peers", Value::Bytes(Bytes::new())),
        ("tracker id", Value::string("t-42")),
    ]))
    .unwrap();
    let (url, requests) = stub_tracker(body).await;
    let tracker = HttpTracker::new(&url).unwrap();

    tracker.announce(&request(TrackerEvent::None)).await.unwrap();

    match tracker.announce(&request(TrackerEvent::None)).await {
        Err(TrackerError::TooSoon(wait)) => {
            assert!(wait <= Duration::from_secs(600));
            assert!(wait > Duration::from_secs(590));
        }
        other => panic!("expected TooSoon, got {:?}", other.map(|r| r.interval)),
    }
    assert!(tracker.remaining_wait().is_some());

    // Events bypass the interval and carry the remembered tracker id.
    tracker.announce(&request(TrackerEvent::Completed)).await.unwrap();

    let requests = requests.lock();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].contains("trackerid="));
    assert!(requests[1].contains("trackerid=t-42"));
    assert!(requests[1].contains("event=completed"));
}

#[tokio::test]
async fn test_http_announce_failure_reason() {
    let (url, _) = stub_tracker(b"d14:failure reason12:unregisterede".to_vec()).await;
    let tracker = HttpTracker::new(&url).unwrap();

    let result = tracker.announce(&request(TrackerEvent::Started)).await;
    assert!(matches!(result, Err(TrackerError::Failure(ref r)) if r == "unregistered"));
    assert!(tracker.remaining_wait().is_none());
}

#[tokio::test]
async fn test_http_announce_timeout() {
    let url = silent_tracker().await;
    let tracker = HttpTracker::with_timeout(&url, Duration::from_millis(200)).unwrap();

    let result = tracker.announce(&request(TrackerEvent::Started)).await;
    assert!(matches!(result, Err(TrackerError::Timeout)));
}

#[tokio::test]
async fn test_tracker_set_aggregates_and_skips_failures() {
    let (good_a, _) = stub_tracker(compact_body(
        4,
        2,
        &[10, 0, 0, 1, 0x1A, 0xE1, 10, 0, 0, 2, 0x1A, 0xE1],
    ))
    .await;
    let (good_b, requests_b) = stub_tracker(compact_body(1, 7, &[10, 0, 0, 2, 0x1A, 0xE1])).await;
    let (failing, _) = stub_tracker(b"d14:failure reason4:nopee".to_vec()).await;
    let refused = closed_port_url().await;

    let urls = vec![
        good_a.clone(),
        good_b.clone(),
        good_b.clone(),
        failing,
        refused,
        "udp://tracker.example.com:1337/announce".to_string(),
    ];
    let config = ClientConfig::default().with_port(7000);
    let set = TrackerSet::from_urls(urls, InfoHash::from_bytes(&[1; 20]).unwrap(), config);
    assert_eq!(set.len(), 4);

    let summary = set.announce(0, 0, 1000, TrackerEvent::Started).await;

    assert_eq!(summary.responded, 2);
    assert_eq!(summary.seeders, 5);
    assert_eq!(summary.leechers, 9);
    assert_eq!(summary.peers.len(), 2);
    assert!(summary.peers.contains(&addr("10.0.0.2:6881")));

    let requests_b = requests_b.lock();
    assert_eq!(requests_b.len(), 1);
    assert!(requests_b[0].contains("port=7000"));
    assert!(requests_b[0].contains("left=1000"));
}

#[tokio::test]
async fn test_tracker_set_empty() {
    let set = TrackerSet::from_urls(
        Vec::<String>::new(),
        InfoHash::default(),
        ClientConfig::default(),
    );
    assert!(set.is_empty());

    let summary = set.announce(0, 0, 0, TrackerEvent::None).await;
    assert_eq!(summary.responded, 0);
    assert!(summary.peers.is_empty());
}
