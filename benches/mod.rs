use criterion::{criterion_group, criterion_main};

mod pipeline;

criterion_group!(
    benches,
    pipeline::bench_idle_tick,
    pipeline::bench_press_dispatch,
    mqtt::bench_publish,
    mqtt::bench_keep_alive_poll
);
criterion_main!(benches);
