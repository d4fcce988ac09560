use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use huddle::signaling::{ClientMessage, ConnectionId, OutboundMessage, Outbox, Router, dispatch};

const ROOM_SIZE: u64 = 8;

/// outbox that only counts frames
struct Sink(usize);

impl Outbox for Sink {
    fn send(&mut self, _to: ConnectionId, message: OutboundMessage) {
        black_box(message);
        self.0 += 1;
    }
}

/// router with one full room
fn populated_router() -> Router {
    let mut router = Router::new();
    for i in 0..ROOM_SIZE {
        let join = format!(r#"{{"type":"join-room","roomId":"bench","userId":"peer{}"}}"#, i);
        router.handle_text(ConnectionId::from(i), &join);
    }
    router
}

/// parsing benchmark
fn bench_parsing(c: &mut Criterion) {
    let frame = r#"{"type":"ice-candidate","to":"broadcast","candidate":{"candidate":"candidate:1 1 UDP 2122252543 192.168.1.100 51234 typ host","sdpMid":"0"}}"#;

    let mut group = c.benchmark_group("Parsing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ClientMessage", |b| {
        b.iter(|| black_box(ClientMessage::parse(black_box(frame)).unwrap()))
    });

    group.finish();
}

/// routing benchmark: direct and broadcast paths
fn bench_routing(c: &mut Criterion) {
    let direct = r#"{"type":"offer","to":"peer3","offer":{"type":"offer","sdp":"v=0"}}"#;
    let broadcast = r#"{"type":"ice-candidate","to":"broadcast","candidate":{"candidate":"c"}}"#;

    let mut group = c.benchmark_group("Routing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("direct", |b| {
        let mut router = populated_router();
        let mut sink = Sink(0);
        b.iter(|| {
            let batches = router.handle_text(ConnectionId::from(0), black_box(direct));
            dispatch(&mut sink, batches);
        })
    });

    group.bench_function("broadcast", |b| {
        let mut router = populated_router();
        let mut sink = Sink(0);
        b.iter(|| {
            let batches = router.handle_text(ConnectionId::from(0), black_box(broadcast));
            dispatch(&mut sink, batches);
        })
    });

    group.finish();
}

/// join/leave churn in a busy room
fn bench_churn(c: &mut Criterion) {
    let join = r#"{"type":"join-room","roomId":"bench","userId":"visitor"}"#;
    let visitor = ConnectionId::from(ROOM_SIZE + 1);

    let mut group = c.benchmark_group("Churn");
    group.throughput(Throughput::Elements(1));

    group.bench_function("join_disconnect", |b| {
        let mut router = populated_router();
        let mut sink = Sink(0);
        b.iter(|| {
            let batches = router.handle_text(visitor, black_box(join));
            dispatch(&mut sink, batches);
            let batches = router.handle_disconnect(visitor);
            dispatch(&mut sink, batches);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_routing, bench_churn);
criterion_main!(benches);
