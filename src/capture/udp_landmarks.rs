use super::{FaceLandmarker, Frame, HandLandmarker};
use crate::config::FeedConfig;
use crate::types::{FaceLandmarks, Handedness, HandLandmarks, Point2};
use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum JsonLandmarkMsg {
    Face {
        #[serde(default)]
        points: Vec<[f64; 2]>,
    },
    Hands {
        #[serde(default)]
        hands: Vec<JsonHand>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct JsonHand {
    label: Handedness,
    #[serde(default = "full_score")]
    score: f32,
    points: Vec<[f64; 2]>,
}

fn full_score() -> f32 {
    1.0
}

/// One decoded estimator result
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkUpdate {
    /// `None` when the estimator saw no face
    Face(Option<FaceLandmarks>),
    Hands(Vec<HandLandmarks>),
}

/// Decode one datagram.
///
/// `{"kind":"face","points":[[x,y],...]}` or
/// `{"kind":"hands","hands":[{"label":"Left","score":0.9,"points":[[x,y],...]}]}`.
/// With `mirror_x` the estimator is assumed to have run on un-mirrored frames:
/// x is flipped and hand labels swap.
pub fn parse_landmark_message(msg: &str, mirror_x: bool, min_hand_score: f32) -> Option<LandmarkUpdate> {
    let msg = msg.trim();
    if msg.is_empty() {
        return None;
    }

    let to_point = |[x, y]: [f64; 2]| {
        let x = x.clamp(0.0, 1.0);
        Point2::new(if mirror_x { 1.0 - x } else { x }, y.clamp(0.0, 1.0))
    };

    match serde_json::from_str::<JsonLandmarkMsg>(msg).ok()? {
        JsonLandmarkMsg::Face { points } => {
            if points.is_empty() {
                return Some(LandmarkUpdate::Face(None));
            }
            let points = points.into_iter().map(to_point).collect();
            Some(LandmarkUpdate::Face(Some(FaceLandmarks::new(points))))
        }
        JsonLandmarkMsg::Hands { hands } => {
            let hands = hands
                .into_iter()
                .filter(|h| h.score >= min_hand_score)
                .take(2)
                .map(|h| {
                    let handedness = match (h.label, mirror_x) {
                        (Handedness::Left, true) => Handedness::Right,
                        (Handedness::Right, true) => Handedness::Left,
                        (label, false) => label,
                    };
                    HandLandmarks::new(handedness, h.points.into_iter().map(to_point).collect())
                })
                .collect();
            Some(LandmarkUpdate::Hands(hands))
        }
    }
}

#[derive(Default)]
struct Latest {
    face: Option<(Instant, Option<FaceLandmarks>)>,
    hands: Option<(Instant, Vec<HandLandmarks>)>,
}

/// Landmarks published over UDP by an external estimator process.
///
/// The listener runs on the tokio runtime; pipelines read the most recent
/// result. Results older than `stale_after` count as nothing detected.
#[derive(Clone)]
pub struct UdpLandmarkFeed {
    latest: Arc<Mutex<Latest>>,
    stale_after: Duration,
    local_addr: SocketAddr,
}

impl UdpLandmarkFeed {
    /// Bind the socket and spawn the listener task
    pub async fn bind(bind_addr: SocketAddr, config: &FeedConfig, min_hand_score: f32) -> Result<Self> {
        let sock = UdpSocket::bind(bind_addr).await?;
        let local_addr = sock.local_addr()?;
        log::info!("UDP landmark listener bound on {local_addr}");

        let latest = Arc::new(Mutex::new(Latest::default()));
        let storage = Arc::clone(&latest);
        let mirror_x = config.mirror_x;

        tokio::spawn(async move {
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let (len, _src) = match sock.recv_from(&mut buf).await {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!("UDP landmark recv error: {e}");
                        continue;
                    }
                };

                let Some(update) = std::str::from_utf8(&buf[..len])
                    .ok()
                    .and_then(|s| parse_landmark_message(s, mirror_x, min_hand_score))
                else {
                    log::debug!("Ignoring undecodable landmark datagram ({len} bytes)");
                    continue;
                };

                if let Ok(mut latest) = storage.lock() {
                    let now = Instant::now();
                    match update {
                        LandmarkUpdate::Face(face) => latest.face = Some((now, face)),
                        LandmarkUpdate::Hands(hands) => latest.hands = Some((now, hands)),
                    }
                }
            }
        });

        Ok(Self {
            latest,
            stale_after: Duration::from_millis(config.stale_after_ms),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn fresh<T: Clone>(&self, pick: impl Fn(&Latest) -> Option<&(Instant, T)>) -> Option<T> {
        let latest = self.latest.lock().ok()?;
        let (at, value) = pick(&latest)?;
        (at.elapsed() <= self.stale_after).then(|| value.clone())
    }
}

impl FaceLandmarker for UdpLandmarkFeed {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<FaceLandmarks>> {
        Ok(self.fresh(|l| l.face.as_ref()).flatten())
    }
}

impl HandLandmarker for UdpLandmarkFeed {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<HandLandmarks>> {
        Ok(self.fresh(|l| l.hands.as_ref()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_face_points() {
        let update = parse_landmark_message(r#"{"kind":"face","points":[[0.25,0.75],[0.5,0.5]]}"#, false, 0.5)
            .expect("parse");
        let LandmarkUpdate::Face(Some(face)) = update else {
            panic!("expected a face");
        };
        assert_eq!(face.points.len(), 2);
        assert!((face.points[0].x - 0.25).abs() < 1e-9);
        assert!((face.points[0].y - 0.75).abs() < 1e-9);
    }

    #[test]
    fn parse_empty_face_means_no_face() {
        let update = parse_landmark_message(r#"{"kind":"face","points":[]}"#, false, 0.5);
        assert_eq!(update, Some(LandmarkUpdate::Face(None)));
    }

    #[test]
    fn parse_hands_mirrored() {
        let msg = r#"{"kind":"hands","hands":[
            {"label":"Left","score":0.9,"points":[[0.2,0.4]]},
            {"label":"Right","score":0.3,"points":[[0.6,0.4]]}
        ]}"#;
        let Some(LandmarkUpdate::Hands(hands)) = parse_landmark_message(msg, true, 0.5) else {
            panic!("expected hands");
        };
        // low-score hand dropped, survivor flipped
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, Handedness::Right);
        assert!((hands[0].points[0].x - 0.8).abs() < 1e-9);
    }

    #[test]
    fn parse_garbage() {
        assert!(parse_landmark_message("", false, 0.5).is_none());
        assert!(parse_landmark_message("x=0.1 y=0.2", false, 0.5).is_none());
        assert!(parse_landmark_message(r#"{"kind":"pose"}"#, false, 0.5).is_none());
    }

    #[tokio::test]
    async fn udp_feed_delivers_latest_hands() {
        let config = FeedConfig {
            stale_after_ms: 5_000,
            ..FeedConfig::default()
        };
        let mut feed = UdpLandmarkFeed::bind("127.0.0.1:0".parse().unwrap(), &config, 0.5)
            .await
            .unwrap();
        let frame = Frame::new(4, 4);
        assert!(HandLandmarker::detect(&mut feed, &frame).unwrap().is_empty());

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let points: Vec<[f64; 2]> = vec![[0.5, 0.5]; 21];
        let msg = serde_json::json!({
            "kind": "hands",
            "hands": [{"label": "Right", "points": points}],
        });
        sender
            .send_to(msg.to_string().as_bytes(), feed.local_addr())
            .await
            .unwrap();

        let mut hands = Vec::new();
        for _ in 0..100 {
            hands = HandLandmarker::detect(&mut feed, &frame).unwrap();
            if !hands.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hands.len(), 1);
        assert!(hands[0].is_complete());
        assert!(FaceLandmarker::detect(&mut feed, &frame).unwrap().is_none());
    }
}
