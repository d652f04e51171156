#[cfg(feature = "instrumentation")]
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "instrumentation")]
static RENDER_NANOS: AtomicU64 = AtomicU64::new(0);
#[cfg(feature = "instrumentation")]
static RENDER_SAMPLES: AtomicU64 = AtomicU64::new(0);

#[cfg(feature = "instrumentation")]
pub struct Instrumentation(std::time::Instant);

#[cfg(not(feature = "instrumentation"))]
pub struct Instrumentation();

pub fn begin() -> Instrumentation {
    #[cfg(feature = "instrumentation")]
    {
        Instrumentation(std::time::Instant::now())
    }
    #[cfg(not(feature = "instrumentation"))]
    {
        Instrumentation()
    }
}

/// Record the time spent rendering `_samples` samples since `begin()`
pub fn end(_i: Instrumentation, _samples: u64) {
    #[cfg(feature = "instrumentation")]
    {
        let nanos = _i.0.elapsed().as_nanos() as u64;
        RENDER_NANOS.fetch_add(nanos, Ordering::Relaxed);
        RENDER_SAMPLES.fetch_add(_samples, Ordering::Relaxed);
    }
}

/// Log how much faster than real time the rendering ran
pub fn report(_sample_rate: u32) {
    #[cfg(feature = "instrumentation")]
    {
        let nanos = RENDER_NANOS.load(Ordering::Relaxed);
        let samples = RENDER_SAMPLES.load(Ordering::Relaxed);
        if nanos == 0 || samples == 0 {
            return;
        }
        let audio_nanos = samples as u128 * 1_000_000_000 / _sample_rate as u128;
        log::info!(
            "rendered {} samples in {}us ({}ns/sample, {}x real time)",
            samples,
            nanos / 1000,
            nanos / samples,
            audio_nanos / nanos as u128
        );
    }
}
