use criterion::{BatchSize, Criterion};
use std::hint::black_box;
use presslog::agent::{Agent, Parts};
use presslog::boot::{FixedReset, ResetReason};
use presslog::clock::UnixClock;
use presslog::config::AgentConfig;
use presslog::forward::ChannelClient;
use presslog::input::{InputPins, Level};
use presslog::network::AlwaysConnected;
use presslog::storage::MemStore;

const CONFIG: &str = r#"{
    "lines": [
        {"label": "Blue", "line": 4},
        {"label": "Yellow", "line": 5},
        {"label": "Green", "line": 6}
    ],
    "clear_pair": [4, 5],
    "broker": "bench:1883",
    "topic": "bench/events"
}"#;

struct Pins([Level; 8]);

impl InputPins for Pins {
    fn read(&mut self, line_id: u8) -> Level {
        self.0[line_id as usize]
    }
}

/// Accepts every publish and discards it.
struct Sink;

impl ChannelClient for Sink {
    type Error = ();

    fn connect(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn publish(&mut self, _topic: &str, payload: &[u8]) -> Result<(), ()> {
        black_box(payload);
        Ok(())
    }

    fn poll(&mut self, _now_ms: u64) -> Result<(), ()> {
        Ok(())
    }
}

type BenchAgent = Agent<Pins, UnixClock, MemStore<4, 8192>, Sink, AlwaysConnected>;

fn setup_agent() -> BenchAgent {
    let config = AgentConfig::from_json(CONFIG).expect("Invalid bench config");
    let mut clock = UnixClock::new(0);
    clock.set(1_704_096_000, 0);
    let mut agent = Agent::new(
        &config,
        Parts {
            pins: Pins([Level::High; 8]),
            clock,
            store: MemStore::new(),
            channel: Sink,
            network: AlwaysConnected,
        },
    )
    .expect("Failed to build agent");
    agent
        .start(&mut FixedReset(ResetReason::PowerOn), 0)
        .expect("Failed to start agent");
    agent
}

pub fn bench_idle_tick(c: &mut Criterion) {
    let mut agent = setup_agent();
    let mut now = 0;
    c.bench_function("tick_idle", |b| {
        b.iter(|| {
            now += 100;
            black_box(agent.tick(now));
        })
    });
}

pub fn bench_press_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("press_dispatch");
    group.bench_function("store_and_forward", |b| {
        b.iter_batched_ref(
            || {
                let mut agent = setup_agent();
                agent.pins_mut().0[6] = Level::Low;
                agent
            },
            |agent| black_box(agent.tick(100)),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
