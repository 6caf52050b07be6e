/// Crate-wide result alias used at application and presentation boundaries.
pub type Result<T> = anyhow::Result<T>;
