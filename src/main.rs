// --- Flotila: mantenimiento de flota - Archivo principal ---
//
// Uso:
//   flotila [serve]        inicia el servidor HTTP
//   flotila ingest [dir]   ingesta única del directorio de servicios

use std::path::PathBuf;
use tracing::error;

use flotila::config::AppConfig;
use flotila::store::SqliteStore;
use flotila::{logging, run_ingest, run_server};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    logging::init();
    let config = AppConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("ingest") => {
            let config = match args.get(1) {
                Some(dir) => config.with_data_dir(PathBuf::from(dir)),
                None => config,
            };
            let store = match SqliteStore::open(&config.db_path) {
                Ok(s) => Some(s),
                Err(e) => {
                    error!("no se pudo abrir el almacén {}: {}", config.db_path.display(), e);
                    None
                }
            };
            let store_ref = store.as_ref().map(|s| s as &dyn flotila::store::DocumentStore);
            match run_ingest(&config.data_dir, &config.output_path, store_ref) {
                Ok(set) => {
                    let services: usize = set.values().map(Vec::len).sum();
                    println!("{} vehículos, {} servicios -> {}", set.len(), services, config.output_path.display());
                    Ok(())
                }
                Err(e) => Err(std::io::Error::other(e.to_string())),
            }
        }
        None | Some("serve") => run_server(config).await,
        Some(other) => {
            eprintln!("comando desconocido '{}'. Uso: flotila [serve | ingest [dir]]", other);
            std::process::exit(2);
        }
    }
}
