//! Logging setup.

/// Installs `env_logger` as the `log` backend.
///
/// Does nothing when a logger is already installed, so tests and host
/// applications may call it repeatedly. Filter with `RUST_LOG`, e.g.
/// `RUST_LOG=highres_core=debug`.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
