use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Default)]
pub struct TracerOptions {
    /// Used when `RUST_LOG` is unset, e.g. "info" or "trace_to_segments=debug".
    pub default_filter: Option<String>,
    /// Include the target (module path) of each event in the stdout output.
    pub with_target: bool,
}

/// This object initialises the stdout tracer, given a TracerOptions struct.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stdout tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary installing the tracer.
    /// * `module_name` - The name of the current module.
    /// #Returns
    /// An instance of TracerEngine
    pub fn new(options: TracerOptions, service_name: &str, module_name: &str) -> Self {
        let stdout_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(options.with_target);

        // `RUST_LOG` takes precedence over the caller's default
        let log_filter = match options.default_filter {
            Some(default) if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() => {
                EnvFilter::new(default)
            }
            _ => EnvFilter::from_default_env(),
        };

        let subscriber =
            tracing_subscriber::Registry::default().with(stdout_tracer.with_filter(log_filter));

        //  This is only called once, so will never panic
        tracing::subscriber::set_global_default(subscriber)
            .expect("tracing::subscriber::set_global_default should only be called once");

        tracing::trace!("Stdout tracer installed by {module_name}");

        Self {
            service_name: service_name.to_owned(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
