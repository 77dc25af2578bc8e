use std::sync::Arc;

use blinds_core::estimator::{Motion, project};
use blinds_core::mocks::RecordingDevice;
use blinds_core::{BlindsSession, TravelProfile};
use blinds_traits::{Changes, DpValue, ManualClock};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn tune(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p blinds_core --bench estimator
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_projection(c: &mut Criterion) {
    let mut g = c.benchmark_group("projection");
    tune(&mut g);

    let travel = TravelProfile::new(Some(50), Some(10));
    let times: Vec<f64> = (0..10_000).map(|i| f64::from(i) * 5.0).collect();
    for motion in [Motion::Opening, Motion::Closing] {
        g.bench_function(format!("project_{motion}"), |b| {
            b.iter(|| {
                let mut acc = 0.0;
                for &t in &times {
                    acc += project(black_box(motion), -12_500.0, t, &travel);
                }
                black_box(acc)
            })
        });
    }
    g.finish();
}

pub fn bench_echo_burst(c: &mut Criterion) {
    let mut g = c.benchmark_group("session");
    tune(&mut g);

    let burst: Vec<Changes> = (0..100)
        .map(|p| [("2".to_string(), DpValue::Int(p))].into())
        .collect();
    g.bench_function("percent_control_burst_100", |b| {
        b.iter_batched(
            || {
                let initial: Changes = [("2".to_string(), DpValue::Int(0))].into();
                BlindsSession::builder()
                    .with_device(RecordingDevice::default())
                    .with_clock(Arc::new(ManualClock::new()))
                    .with_initial_state(initial)
                    .build()
                    .expect("session")
            },
            |mut s| {
                for changes in &burst {
                    s.handle_changes(black_box(changes));
                }
                black_box(s.estimate())
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(estimator, bench_projection, bench_echo_burst);
criterion_main!(estimator);
