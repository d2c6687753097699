use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber on stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Keep patient identifiers out of logs: `PT-2025-001` becomes `PT-2****`.
pub fn mask_patient_id(patient_id: &str) -> String {
    let prefix: String = patient_id.chars().take(4).collect();
    if patient_id.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}
