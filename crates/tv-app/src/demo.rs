//! Demo mode for the telemetry viewer
//! Creates synthetic play sessions to showcase the pipeline

use serde_json::{json, Value as JsonValue};
use tv_core::ports::SESSION_COLLECTION;
use tv_core::DEFAULT_LEVEL_KEY;
use tv_data::MemoryDocumentStore;

pub const DEMO_DATABASE: &str = "telemetry";
pub const DEMO_COLLECTION: &str = "player_position";

const LEVELS: [&str; 3] = [DEFAULT_LEVEL_KEY, "forest", "desert"];
const SESSIONS: usize = 6;
const SAMPLES_PER_SESSION: usize = 40;

fn session_id(session: usize) -> String {
    format!("session-{:02}", session)
}

fn session_starts() -> Vec<JsonValue> {
    (0..SESSIONS)
        .map(|s| {
            json!({
                "session_id": session_id(s),
                "params": { "level_key": LEVELS[s % LEVELS.len()] },
            })
        })
        .collect()
}

/// Players circling outward while climbing. Every seventh sample lost its
/// position, which is what position mode filters on.
fn player_positions() -> Vec<JsonValue> {
    let mut documents = Vec::with_capacity(SESSIONS * SAMPLES_PER_SESSION);
    for s in 0..SESSIONS {
        let phase = s as f64 * std::f64::consts::FRAC_PI_3;
        for i in 0..SAMPLES_PER_SESSION {
            let t = i as f64 * 0.5;
            let radius = 5.0 + t;
            let speed = 3.0 + (t * 0.7 + phase).sin().abs() * 4.0;

            let params = if i % 7 == 6 {
                json!({ "speed": speed })
            } else {
                let (x, y, z) = (radius * (t + phase).cos(), radius * (t + phase).sin(), t * 0.2);
                json!({ "position": format!("{:.3} {:.3} {:.3}", x, y, z), "speed": speed })
            };

            documents.push(json!({
                "session_id": session_id(s),
                "time": t,
                "params": params,
            }));
        }
    }
    documents
}

fn tech_performance() -> Vec<JsonValue> {
    let mut documents = Vec::with_capacity(SESSIONS * SAMPLES_PER_SESSION);
    for s in 0..SESSIONS {
        for i in 0..SAMPLES_PER_SESSION {
            let t = i as f64 * 0.5;
            let frame_ms = 16.6 + (t * 1.3 + s as f64).sin() * 4.0;
            let mut document = json!({
                "session_id": session_id(s),
                "time": t,
                "fps": (1000.0 / frame_ms).round(),
                "frame_ms": frame_ms,
            });
            // GPU timings only arrive from some clients
            if s % 2 == 0 {
                document["gpu_ms"] = json!(frame_ms * 0.6);
            }
            documents.push(document);
        }
    }
    documents
}

/// Demo collections, in the order they are listed
pub fn demo_collections() -> Vec<(&'static str, Vec<JsonValue>)> {
    vec![
        (SESSION_COLLECTION, session_starts()),
        (DEMO_COLLECTION, player_positions()),
        ("tech_performance", tech_performance()),
    ]
}

/// In-memory store holding the demo database
pub fn demo_store() -> MemoryDocumentStore {
    demo_collections()
        .into_iter()
        .fold(MemoryDocumentStore::new(), |store, (collection, documents)| {
            store.with_collection(DEMO_DATABASE, collection, documents)
        })
}
