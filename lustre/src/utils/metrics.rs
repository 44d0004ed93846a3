/// Runs `f` and, with the `metrics` feature enabled, logs how long it took.
#[cfg(feature = "metrics")]
pub fn measure<T>(label: &str, f: impl FnOnce() -> T) -> T {
    use std::time::Instant;

    let tt = Instant::now();
    let result = f();

    log::debug!("{label}: {}", humantime::format_duration(tt.elapsed()));

    result
}

#[cfg(not(feature = "metrics"))]
pub fn measure<T>(_: &str, f: impl FnOnce() -> T) -> T {
    f()
}
