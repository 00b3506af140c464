use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use wirepack::Value;
use wirerpc::CallError;
use wirerpc::ErrorCode;
use wirerpc::Request;

use crate::channel::DuplexChannelTransport;
use crate::client::Client;
use crate::config::ServerConfig;
use crate::context::ServerContext;
use crate::controller::Controller;
use crate::endpoint::Endpoint;
use crate::engine::ChannelLevel;
use crate::handles::ObjectManager;
use crate::query::PeriodicQuery;
use crate::server::Server;
use crate::transport;
use crate::transport::StreamTransport;
use crate::transport::Transport;
use crate::transport::TransportConfig;

// ============================================================================
//  HELPERS
// ============================================================================

fn server() -> Server {
    Server::new(ServerConfig::default()).unwrap()
}

/// Dispatches straight into the server, bypassing any transport.
fn call(server: &Server, endpoint: Endpoint, args: Vec<Value>) -> Vec<Value> {
    let (class, function) = endpoint.names();
    let req = Request::new(1, class, function, args);
    server.dispatcher().dispatch(server.context(), &req).results
}

fn status_of(results: &[Value]) -> u64 {
    results[0].as_u64().unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn stream_pair(config: TransportConfig) -> (StreamTransport, tokio::io::DuplexStream) {
    let (ours, theirs) = tokio::io::duplex(4096);
    let (read, write) = tokio::io::split(ours);
    (StreamTransport::new(read, write).with_config(config), theirs)
}

// ============================================================================
//  HANDLE TABLE
// ============================================================================

#[test]
fn test_handles_are_fresh_after_free() {
    let table = ObjectManager::new(1001);
    let a = table.allocate(Arc::new("a"));
    assert_eq!(a, 1001);
    assert_eq!(table.free(a).map(|s| *s), Some("a"));

    let b = table.allocate(Arc::new("b"));
    assert_eq!(b, 1002);
    assert!(table.find(a).is_none());
    assert_eq!(table.find(b).map(|s| *s), Some("b"));
}

#[test]
fn test_free_is_idempotent() {
    let table = ObjectManager::new(1);
    let h = table.allocate(Arc::new(7u32));
    assert!(table.free(h).is_some());
    assert!(table.free(h).is_none());
    assert!(table.free(999).is_none());
    assert!(table.is_empty());
}

#[test]
fn test_allocate_same_object_keeps_its_handle() {
    let table = ObjectManager::new(1);
    let obj = Arc::new(String::from("meter"));
    let h1 = table.allocate(obj.clone());
    let h2 = table.allocate(obj.clone());
    assert_eq!(h1, h2);
    assert_eq!(table.len(), 1);
    assert_eq!(table.find_handle(&obj), Some(h1));
}

#[test]
fn test_free_object_removes_both_directions() {
    let table = ObjectManager::new(1);
    let obj = Arc::new(1u8);
    let h = table.allocate(obj.clone());
    assert_eq!(table.free_object(&obj), Some(h));
    assert!(table.find(h).is_none());
    assert!(table.find_handle(&obj).is_none());
    assert_eq!(table.free_object(&obj), None);
}

// ============================================================================
//  ENGINE LIFECYCLE
// ============================================================================

#[test]
fn test_engine_events_drive_handles() {
    let ctx = ServerContext::default();
    let source = ctx.engine.create_source("wasapi_input_capture", "Mic");
    let handle = ctx.sources.find_handle(&source).unwrap();
    assert_eq!(handle, 1001);

    assert!(ctx.engine.release_source(&source));
    assert!(ctx.sources.find(handle).is_none());
    assert!(!ctx.engine.release_source(&source));
    assert_eq!(ctx.engine.source_count(), 0);
}

#[test]
fn test_meter_does_not_keep_source_alive() {
    let ctx = ServerContext::default();
    let source = ctx.engine.create_source("noise", "Noise");
    let meter = ctx.engine.create_meter(crate::engine::FaderType::Log, 33);
    meter.attach(&source);
    assert!(meter.levels().is_ok());

    ctx.engine.release_source(&source);
    drop(source);
    assert_eq!(meter.levels(), Err(crate::engine::MeterError::SourceGone));

    meter.detach();
    assert_eq!(meter.levels(), Err(crate::engine::MeterError::Detached));
}

#[test]
fn test_meter_callback_count_never_underflows() {
    let ctx = ServerContext::default();
    let meter = ctx.engine.create_meter(crate::engine::FaderType::Cubic, 33);
    meter.remove_callback();
    assert_eq!(meter.callbacks(), 0);
    meter.add_callback();
    meter.add_callback();
    meter.remove_callback();
    assert_eq!(meter.callbacks(), 1);
}

// ============================================================================
//  HANDLERS
// ============================================================================

#[test]
fn test_every_endpoint_is_registered() {
    let server = server();
    let registry = server.dispatcher().registry();
    assert_eq!(registry.len(), Endpoint::ALL.len());
    for endpoint in Endpoint::ALL {
        let (class, function) = endpoint.names();
        let id = registry.resolve(class, function).unwrap();
        assert_eq!(registry.get(id).unwrap().params, endpoint.params());
    }
}

#[test]
fn test_endpoints_are_grouped_by_collection() {
    let registry = crate::handlers::registry().unwrap();
    let mut collections: Vec<&str> = registry.iter().map(|f| f.collection.as_str()).collect();
    collections.dedup();
    // Each collection registers as one contiguous block.
    assert_eq!(collections, vec!["Input", "Source", "VolMeter"]);
}

#[test]
fn test_volmeter_create_then_attach_unknown_source() {
    let server = server();
    let created = call(&server, Endpoint::VolMeterCreate, vec![Value::Int32(0)]);
    assert_eq!(created, vec![Value::UInt64(0), Value::UInt64(1001), Value::UInt32(33)]);

    let attached = call(&server, Endpoint::VolMeterAttach, vec![Value::UInt64(1001), Value::UInt64(42)]);
    assert_eq!(
        attached,
        vec![
            Value::UInt64(ErrorCode::InvalidReference.as_u64()),
            Value::String("Source reference is not valid.".into()),
        ]
    );
}

#[test]
fn test_volmeter_create_rejects_unknown_fader() {
    let server = server();
    let results = call(&server, Endpoint::VolMeterCreate, vec![Value::Int32(3)]);
    assert_eq!(status_of(&results), ErrorCode::BadParameter.as_u64());
    assert_eq!(server.context().engine.meter_count(), 0);
}

#[test]
fn test_volmeter_interval() {
    let server = server();
    call(&server, Endpoint::VolMeterCreate, vec![Value::Int32(1)]);

    let zero = call(&server, Endpoint::VolMeterSetUpdateInterval, vec![Value::UInt64(1001), Value::UInt32(0)]);
    assert_eq!(status_of(&zero), ErrorCode::BadParameter.as_u64());

    let set = call(&server, Endpoint::VolMeterSetUpdateInterval, vec![Value::UInt64(1001), Value::UInt32(50)]);
    assert_eq!(set, vec![Value::UInt64(0), Value::UInt32(50)]);
    let get = call(&server, Endpoint::VolMeterGetUpdateInterval, vec![Value::UInt64(1001)]);
    assert_eq!(get, vec![Value::UInt64(0), Value::UInt32(50)]);
}

#[test]
fn test_volmeter_query_layout() {
    let server = server();
    let source = call(&server, Endpoint::InputCreate, vec!["audio".into(), "Desktop".into()]);
    let source_handle = source[1].as_u64().unwrap();
    call(&server, Endpoint::VolMeterCreate, vec![Value::Int32(0)]);

    let detached = call(&server, Endpoint::VolMeterQuery, vec![Value::UInt64(1001)]);
    assert_eq!(status_of(&detached), ErrorCode::Error.as_u64());

    server.context().sources.find(source_handle).unwrap().set_levels(vec![
        ChannelLevel { magnitude: -20.0, peak: -10.0, input_peak: -5.0 },
        ChannelLevel { magnitude: -21.0, peak: -11.0, input_peak: -6.0 },
    ]);
    call(&server, Endpoint::VolMeterAttach, vec![Value::UInt64(1001), Value::UInt64(source_handle)]);

    let levels = call(&server, Endpoint::VolMeterQuery, vec![Value::UInt64(1001)]);
    assert_eq!(
        levels,
        vec![
            Value::UInt64(0),
            Value::UInt32(2),
            Value::Float32(-20.0),
            Value::Float32(-10.0),
            Value::Float32(-5.0),
            Value::Float32(-21.0),
            Value::Float32(-11.0),
            Value::Float32(-6.0),
        ]
    );

    // Releasing the source leaves the meter attached to nothing.
    call(&server, Endpoint::SourceRelease, vec![Value::UInt64(source_handle)]);
    let gone = call(&server, Endpoint::VolMeterQuery, vec![Value::UInt64(1001)]);
    assert_eq!(status_of(&gone), ErrorCode::Error.as_u64());
}

#[test]
fn test_source_properties() {
    let server = server();
    let created = call(&server, Endpoint::InputCreate, vec!["image_source".into(), "Logo".into()]);
    let h = Value::UInt64(created[1].as_u64().unwrap());

    assert_eq!(call(&server, Endpoint::SourceGetId, vec![h.clone()])[1], Value::from("image_source"));
    assert_eq!(
        call(&server, Endpoint::SourceSetName, vec![h.clone(), "Banner".into()]),
        vec![Value::UInt64(0), Value::from("Banner")]
    );
    assert_eq!(call(&server, Endpoint::SourceGetName, vec![h.clone()])[1], Value::from("Banner"));

    let json = r#"{"file":"logo.png"}"#;
    call(&server, Endpoint::SourceUpdate, vec![h.clone(), json.into()]);
    assert_eq!(call(&server, Endpoint::SourceGetSettings, vec![h.clone()])[1], Value::from(json));

    call(&server, Endpoint::SourceSetFlags, vec![h.clone(), Value::UInt32(4)]);
    assert_eq!(call(&server, Endpoint::SourceGetFlags, vec![h.clone()])[1], Value::UInt32(4));

    assert_eq!(call(&server, Endpoint::SourceGetMuted, vec![h.clone()])[1], Value::Int32(0));
    call(&server, Endpoint::SourceSetMuted, vec![h.clone(), Value::Int32(1)]);
    assert_eq!(call(&server, Endpoint::SourceGetMuted, vec![h.clone()])[1], Value::Int32(1));

    call(&server, Endpoint::SourceSetEnabled, vec![h.clone(), Value::Int32(0)]);
    assert_eq!(call(&server, Endpoint::SourceGetEnabled, vec![h.clone()])[1], Value::Int32(0));

    assert_eq!(call(&server, Endpoint::SourceGetStatus, vec![h.clone()]), vec![Value::UInt64(0), Value::UInt32(1)]);
}

#[test]
fn test_released_source_is_invalid_reference() {
    let server = server();
    let created = call(&server, Endpoint::InputCreate, vec!["color".into(), "Red".into()]);
    let h = Value::UInt64(created[1].as_u64().unwrap());

    assert_eq!(call(&server, Endpoint::SourceRelease, vec![h.clone()]), vec![Value::UInt64(0)]);
    let after = call(&server, Endpoint::SourceGetName, vec![h.clone()]);
    assert_eq!(status_of(&after), ErrorCode::InvalidReference.as_u64());

    // A second release names a handle that no longer exists.
    let again = call(&server, Endpoint::SourceRelease, vec![h]);
    assert_eq!(status_of(&again), ErrorCode::InvalidReference.as_u64());
}

#[test]
fn test_input_create_rejects_empty_id() {
    let server = server();
    let results = call(&server, Endpoint::InputCreate, vec!["".into(), "Nameless".into()]);
    assert_eq!(status_of(&results), ErrorCode::BadParameter.as_u64());
    assert!(server.context().sources.is_empty());
}

#[test]
fn test_handler_argument_types_are_checked() {
    let server = server();
    let results = call(&server, Endpoint::SourceGetName, vec![Value::Int64(1001)]);
    assert_eq!(status_of(&results), ErrorCode::BadParameter.as_u64());
}

// ============================================================================
//  STREAM TRANSPORT
// ============================================================================

#[tokio::test]
async fn test_stream_transport_frames_are_length_prefixed() {
    let (transport, mut raw) = stream_pair(TransportConfig::default());
    transport.send(b"hello").await.unwrap();

    let len = raw.read_u32_le().await.unwrap();
    assert_eq!(len, 5);
    let mut body = [0u8; 5];
    raw.read_exact(&mut body).await.unwrap();
    assert_eq!(&body, b"hello");

    raw.write_u32_le(3).await.unwrap();
    raw.write_all(b"abc").await.unwrap();
    assert_eq!(transport.recv().await.unwrap(), Some(b"abc".to_vec()));
}

#[tokio::test]
async fn test_stream_transport_enforces_frame_limit() {
    let (transport, mut raw) = stream_pair(TransportConfig::default().with_max_frame_len(4));
    assert_eq!(
        transport.send(b"12345").await,
        Err(transport::Error::PayloadTooLarge { len: 5, max: 4 })
    );

    raw.write_u32_le(100).await.unwrap();
    assert_eq!(
        transport.recv().await,
        Err(transport::Error::PayloadTooLarge { len: 100, max: 4 })
    );
}

#[tokio::test]
async fn test_stream_transport_close_and_truncation() {
    let (transport, raw) = stream_pair(TransportConfig::default());
    drop(raw);
    assert_eq!(transport.recv().await, Ok(None));

    let (transport, mut raw) = stream_pair(TransportConfig::default());
    raw.write_u32_le(10).await.unwrap();
    raw.write_all(b"abc").await.unwrap();
    drop(raw);
    assert!(matches!(transport.recv().await, Err(transport::Error::ConnectionLost(_))));
}

#[tokio::test]
async fn test_stream_transport_cut_inside_length_prefix() {
    let (transport, mut raw) = stream_pair(TransportConfig::default());
    raw.write_all(&[7, 0]).await.unwrap();
    drop(raw);
    assert_eq!(
        transport.recv().await,
        Err(transport::Error::ConnectionLost("stream ended after 2 of 4 length bytes".into()))
    );
}

#[tokio::test]
async fn test_stream_transport_carries_server_traffic() {
    let server = Arc::new(server());
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (r, w) = tokio::io::split(server_io);
    let serving = server.spawn(Box::new(StreamTransport::new(r, w)));

    let (r, w) = tokio::io::split(client_io);
    let client_side = StreamTransport::new(r, w);
    let req = Request::new(3, "VolMeter", "Create", vec![Value::Int32(2)]);
    client_side.send(&req.to_bytes().unwrap()).await.unwrap();

    let reply = client_side.recv().await.unwrap().unwrap();
    match wirerpc::Frame::decode(&reply).unwrap() {
        wirerpc::Frame::Response(resp) => {
            assert_eq!(resp.correlation_id, 3);
            assert_eq!(resp.results, vec![Value::UInt64(0), Value::UInt64(1001), Value::UInt32(33)]);
        }
        other => panic!("expected response, got {:?}", other),
    }

    drop(client_side);
    serving.await.unwrap();
}

// ============================================================================
//  CLIENT
// ============================================================================

#[test]
fn test_client_is_empty_once_disconnected() {
    let rt = runtime();
    let (client_side, server_side) = DuplexChannelTransport::pair();
    let client = rt.block_on(async { Client::new(Box::new(client_side)) });

    drop(server_side);
    let deadline = Instant::now() + Duration::from_secs(5);
    while client.is_connected() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!client.is_connected());
    assert!(client.call_synchronous("Source", "GetName", &[Value::UInt64(1)]).is_empty());
    assert_eq!(client.call(Endpoint::SourceGetName, &[Value::UInt64(1)]), Err(CallError::Unavailable));
}

#[test]
fn test_outstanding_call_wakes_on_disconnect() {
    let rt = runtime();
    let (client_side, server_side) = DuplexChannelTransport::pair();
    let client = Arc::new(rt.block_on(async { Client::new(Box::new(client_side)) }));

    let caller = {
        let client = client.clone();
        std::thread::spawn(move || client.call_synchronous("VolMeter", "Query", &[Value::UInt64(1001)]))
    };

    rt.block_on(async move {
        // Take the request off the wire, then hang up without answering.
        let request = server_side.recv().await.unwrap();
        assert!(request.is_some());
        drop(server_side);
    });

    assert!(caller.join().unwrap().is_empty());
    assert_eq!(client.pending_calls(), 0);
}

#[test]
fn test_client_ignores_responses_nobody_waits_for() {
    let rt = runtime();
    let (client_side, server_side) = DuplexChannelTransport::pair();
    let client = Arc::new(rt.block_on(async { Client::new(Box::new(client_side)) }));

    let caller = {
        let client = client.clone();
        std::thread::spawn(move || client.call_synchronous("Source", "GetStatus", &[Value::UInt64(5)]))
    };

    rt.block_on(async move {
        let bytes = server_side.recv().await.unwrap().unwrap();
        let id = wirerpc::decode_correlation_id(&bytes).unwrap();
        let stray = wirerpc::Response::new(id + 100, vec![Value::UInt64(0)]);
        server_side.send(&stray.to_bytes().unwrap()).await.unwrap();
        let real = wirerpc::Response::new(id, vec![Value::UInt64(0), Value::UInt32(1)]);
        server_side.send(&real.to_bytes().unwrap()).await.unwrap();
        // Keep the connection open until the caller has its answer.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    assert_eq!(caller.join().unwrap(), vec![Value::UInt64(0), Value::UInt32(1)]);
}

#[test]
fn test_controller_without_connection_is_unavailable() {
    let controller = Controller::new();
    assert!(controller.connection().is_none());
    assert!(!controller.is_connected());
    assert!(controller.call_synchronous("Input", "Create", &[]).is_empty());
    assert_eq!(
        controller.call(Endpoint::InputCreate, &[Value::from("a"), Value::from("b")]),
        Err(CallError::Unavailable)
    );
}

// ============================================================================
//  PERIODIC QUERY
// ============================================================================

#[test]
fn test_periodic_query_survives_failures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let counter = calls.clone();
    let mut query = PeriodicQuery::start(
        Arc::new(AtomicU32::new(2)),
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(CallError::Unavailable)
            } else {
                Ok(vec![Value::UInt32(n as u32)])
            }
        },
        tx,
    );

    for _ in 0..3 {
        let payload = rx.blocking_recv().unwrap();
        assert_eq!(payload[0].as_u32().unwrap() % 2, 1);
    }
    assert!(query.is_running());

    query.stop();
    assert!(!query.is_running());
    assert!(calls.load(Ordering::SeqCst) >= 6);
}

#[test]
fn test_periodic_query_stop_interrupts_sleep() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut query = PeriodicQuery::start(
        Arc::new(AtomicU32::new(60_000)),
        || Ok(vec![Value::Null]),
        tx,
    );
    assert!(rx.blocking_recv().is_some());

    let started = Instant::now();
    query.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    // The sender went away with the thread.
    assert!(rx.blocking_recv().is_none());
}

/// Runs a query that takes `work` to answer, at `interval_ms`, and returns the gaps between the
/// starts of consecutive calls.
fn query_start_gaps(interval_ms: u32, work: Duration, rounds: usize) -> Vec<Duration> {
    let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let recorded = starts.clone();
    let mut query = PeriodicQuery::start(
        Arc::new(AtomicU32::new(interval_ms)),
        move || {
            recorded.lock().unwrap().push(Instant::now());
            std::thread::sleep(work);
            Ok(vec![Value::Null])
        },
        tx,
    );
    for _ in 0..rounds {
        rx.blocking_recv().unwrap();
    }
    query.stop();

    let starts = starts.lock().unwrap();
    starts.windows(2).map(|w| w[1] - w[0]).collect()
}

#[test]
fn test_periodic_query_slow_call_runs_back_to_back() {
    // The call outlasts the interval, so the next one starts as soon as it returns.
    let gaps = query_start_gaps(10, Duration::from_millis(30), 6);
    assert!(gaps.len() >= 5);
    let mean = gaps.iter().sum::<Duration>() / gaps.len() as u32;
    assert!(gaps.iter().all(|gap| *gap >= Duration::from_millis(30)));
    assert!(mean < Duration::from_millis(38), "mean gap {:?}", mean);
}

#[test]
fn test_periodic_query_period_includes_call_time() {
    // Call time is taken out of the sleep, so calls start roughly one interval apart.
    let gaps = query_start_gaps(40, Duration::from_millis(20), 6);
    assert!(gaps.len() >= 5);
    let mean = gaps.iter().sum::<Duration>() / gaps.len() as u32;
    assert!(gaps.iter().all(|gap| *gap >= Duration::from_millis(38)));
    assert!(mean < Duration::from_millis(55), "mean gap {:?}", mean);
}
