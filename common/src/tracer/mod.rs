mod tracer_engine;

pub use tracer_engine::{TracerEngine, TracerOptions};

/// Should be called at the start of each binary.
/// Installs the stdout tracer and reports which component initialised it.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{
        let tracer = TracerEngine::new($options, env!("CARGO_BIN_NAME"), module_path!());
        tracing::debug!("Tracer initialised for {}", tracer.service_name());
        tracer
    }};
}
