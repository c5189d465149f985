use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "flotila=info,actix_web=info";

/// Inicializa el subscriber global. `RUST_LOG` reemplaza el filtro por defecto.
/// Llamarlo más de una vez no tiene efecto.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
