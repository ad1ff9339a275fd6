/// Recommended error type for a scenario's `main` function and for shared step code. Compatible
/// with the [crate::definition::HookResult] type so `?` propagates errors either way.
pub type ProbeResult<T> = anyhow::Result<T>;
