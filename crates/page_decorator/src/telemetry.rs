//! Real user monitoring (RUM) beacons.
//!
//! A page view is either in the sample or not; that decision is made once,
//! when the page context is built, and every checkpoint of a sampled view is
//! posted fire-and-forget through a [`BeaconSink`]. Nothing here can fail the
//! page: sink errors are dropped on the floor.

use core::cell::RefCell;
use core::mem::take;
use core::time::Duration;
use futures::future::join_all;
use log::debug;
use rand::Rng as _;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use url::Url;

/// Upper bound for one beacon request, and for [`HttpBeaconSink::flush`].
const BEACON_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for serialized beacons.
pub trait BeaconSink {
    /// Queues `body` for delivery to `url`. Must not block and must not fail.
    fn send(&self, url: &str, body: String);
}

/// Posts beacons over HTTP on spawned tokio tasks. Outside a runtime the
/// beacon is silently dropped.
///
/// Spawned posts only make progress while the runtime is alive; call
/// [`flush`](Self::flush) before shutting it down.
#[derive(Default)]
pub struct HttpBeaconSink {
    client: reqwest::Client,
    in_flight: RefCell<Vec<JoinHandle<()>>>,
}

impl HttpBeaconSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            in_flight: RefCell::default(),
        }
    }

    /// Waits for every beacon sent so far, for at most ten seconds.
    pub async fn flush(&self) {
        let pending = take(&mut *self.in_flight.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let count = pending.len();
        if timeout(BEACON_TIMEOUT, join_all(pending)).await.is_err() {
            debug!("gave up waiting for {count} beacons");
        }
    }
}

impl BeaconSink for HttpBeaconSink {
    fn send(&self, url: &str, body: String) {
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let request = self.client.post(url).timeout(BEACON_TIMEOUT).body(body);
        let task = handle.spawn(async move {
            if let Err(err) = request.send().await {
                debug!("beacon not delivered: {err}");
            }
        });
        let mut in_flight = self.in_flight.borrow_mut();
        in_flight.retain(|pending| !pending.is_finished());
        in_flight.push(task);
    }
}

/// Discards every beacon.
#[derive(Clone, Copy, Default)]
pub struct NoopBeaconSink;

impl BeaconSink for NoopBeaconSink {
    fn send(&self, _url: &str, _body: String) {}
}

/// Wire format of one beacon; `data` is flattened into the top level.
#[derive(Serialize)]
struct Beacon<'data> {
    weight: u32,
    id: &'data str,
    referer: &'data str,
    generation: &'data str,
    checkpoint: &'data str,
    #[serde(flatten)]
    data: Map<String, Value>,
}

/// Per-page sampling state.
#[derive(Clone, Debug)]
pub struct RumSampler {
    weight: u32,
    id: String,
    random: f64,
}

impl RumSampler {
    /// Draws the sampling decision for a page view. `?rum=on` forces a
    /// weight of 1, otherwise `default_weight` applies.
    pub fn new(page_url: &Url, default_weight: u32) -> Self {
        let mut rng = rand::rng();
        let random: f64 = rng.random();
        let suffix: u64 = rng.random();
        let id = format!(
            "{}-{}-{}",
            hash_code(page_url.as_str()),
            unix_millis(),
            &format!("{suffix:016x}")[..14]
        );
        Self::with_random(page_url, default_weight, random, id)
    }

    /// Deterministic constructor, mainly for tests.
    pub fn with_random(page_url: &Url, default_weight: u32, random: f64, id: String) -> Self {
        let forced = page_url
            .query_pairs()
            .any(|(key, value)| key == "rum" && value == "on");
        let weight = if forced { 1 } else { default_weight.max(1) };
        Self { weight, id, random }
    }

    pub const fn weight(&self) -> u32 {
        self.weight
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A view is sampled when `random * weight < 1`; a zero draw never is.
    pub fn is_selected(&self) -> bool {
        self.random > 0.0 && self.random * f64::from(self.weight) < 1.0
    }

    /// Builds the endpoint URL and JSON body for a checkpoint, or `None` when
    /// this view is not sampled.
    pub fn beacon(
        &self,
        endpoint: &str,
        referer: &str,
        generation: &str,
        checkpoint: &str,
        data: Map<String, Value>,
    ) -> Option<(String, String)> {
        if !self.is_selected() {
            return None;
        }
        let beacon = Beacon {
            weight: self.weight,
            id: &self.id,
            referer,
            generation,
            checkpoint,
            data,
        };
        let body = serde_json::to_string(&beacon).ok()?;
        Some((format!("{}/{}", endpoint.trim_end_matches('/'), self.weight), body))
    }
}

/// 32-bit string hash over UTF-16 code units (`h * 31 + c`, wrapping).
pub fn hash_code(input: &str) -> i32 {
    input.encode_utf16().fold(0_i32, |acc, unit| {
        acc.wrapping_shl(5)
            .wrapping_sub(acc)
            .wrapping_add(i32::from(unit))
    })
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener as StdListener;
    use std::thread;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use tokio::runtime::Builder;
    use tokio::spawn;

    fn page(query: &str) -> Url {
        Url::parse(&format!("https://example.com/page{query}")).unwrap()
    }

    #[test]
    fn hash_matches_java_string_hash() {
        assert_eq!(hash_code(""), 0);
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("hello"), 99_162_322);
        // Wraps instead of overflowing.
        assert_eq!(hash_code("https://example.com/some/long/path"), {
            "https://example.com/some/long/path"
                .encode_utf16()
                .fold(0_i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)))
        });
    }

    #[test]
    fn rum_query_forces_weight_one() {
        let sampler = RumSampler::with_random(&page("?rum=on"), 100, 0.5, String::from("id"));
        assert_eq!(sampler.weight(), 1);
        assert!(sampler.is_selected());

        let sampler = RumSampler::with_random(&page(""), 100, 0.5, String::from("id"));
        assert_eq!(sampler.weight(), 100);
        assert!(!sampler.is_selected());
    }

    #[test]
    fn zero_draw_is_never_selected() {
        let sampler = RumSampler::with_random(&page("?rum=on"), 100, 0.0, String::from("id"));
        assert!(!sampler.is_selected());
    }

    #[test]
    fn beacon_flattens_data() {
        let sampler = RumSampler::with_random(&page("?rum=on"), 100, 0.25, String::from("abc"));
        let mut data = Map::new();
        data.insert(String::from("target"), Value::from("hero"));
        let (url, body) = sampler
            .beacon("https://rum.example/.rum/", "https://example.com/page", "proj", "top", data)
            .unwrap();
        assert_eq!(url, "https://rum.example/.rum/1");
        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["checkpoint"], "top");
        assert_eq!(parsed["generation"], "proj");
        assert_eq!(parsed["id"], "abc");
        assert_eq!(parsed["weight"], 1);
        assert_eq!(parsed["target"], "hero");
    }

    #[test]
    fn generated_ids_have_three_parts() {
        let sampler = RumSampler::new(&page(""), 100);
        let parts: Vec<&str> = sampler.id().rsplitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 14);
    }

    /// Accepts one connection and returns the raw request once `marker`
    /// has arrived.
    async fn receive_one(listener: TcpListener, marker: &'static str) -> String {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut chunk = [0_u8; 1024];
        while !String::from_utf8_lossy(&received).contains(marker) {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..read]);
        }
        stream
            .write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8_lossy(&received).into_owned()
    }

    fn local_sink() -> HttpBeaconSink {
        HttpBeaconSink::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[tokio::test]
    async fn flush_delivers_pending_beacons() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = spawn(receive_one(listener, "\"checkpoint\":\"load\""));

        let sink = local_sink();
        sink.send(&format!("http://{addr}/.rum/1"), String::from("{\"checkpoint\":\"load\"}"));
        sink.flush().await;

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /.rum/1 "), "{request}");
        assert!(request.contains("{\"checkpoint\":\"load\"}"));
        assert!(sink.in_flight.borrow().is_empty());
    }

    #[test]
    fn flushed_beacons_survive_runtime_shutdown() {
        let listener = StdListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(BEACON_TIMEOUT)).unwrap();
            let mut received = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !String::from_utf8_lossy(&received).contains("last") {
                let read = stream.read(&mut chunk).unwrap();
                if read == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..read]);
            }
            stream
                .write_all(b"HTTP/1.1 204 No Content\r\ncontent-length: 0\r\n\r\n")
                .unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });

        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        let sink = local_sink();
        runtime.block_on(async {
            sink.send(&format!("http://{addr}/.rum/1"), String::from("last"));
            sink.flush().await;
        });
        drop(runtime);

        assert!(server.join().unwrap().contains("last"));
    }

    #[tokio::test]
    async fn flush_without_beacons_returns() {
        local_sink().flush().await;
    }
}
