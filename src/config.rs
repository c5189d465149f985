// Configuración desde variables de entorno (y `.env` si existe)

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "servis_data";
pub const DEFAULT_DB_PATH: &str = "data/flotila.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
const ARTIFACT_FILE: &str = "services.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directorio con un libro de servicio por vehículo.
    pub data_dir: PathBuf,
    /// Ruta del artefacto JSON generado por la ingesta.
    pub output_path: PathBuf,
    pub db_path: PathBuf,
    pub bind: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        AppConfig {
            output_path: data_dir.join(ARTIFACT_FILE),
            data_dir,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Lee `FLOTILA_DATA_DIR`, `FLOTILA_OUTPUT`, `FLOTILA_DB_PATH` y
    /// `FLOTILA_BIND`. Valores ausentes o inválidos usan el valor por defecto.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let data_dir = non_empty_var("FLOTILA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let output_path = non_empty_var("FLOTILA_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(ARTIFACT_FILE));
        let db_path = non_empty_var("FLOTILA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let bind = match non_empty_var("FLOTILA_BIND") {
            Some(b) if b.parse::<SocketAddr>().is_ok() => b,
            Some(b) => {
                warn!("FLOTILA_BIND inválido ('{}'), se usa {}", b, DEFAULT_BIND);
                DEFAULT_BIND.to_string()
            }
            None => DEFAULT_BIND.to_string(),
        };

        AppConfig { data_dir, output_path, db_path, bind }
    }

    /// Misma configuración con otro directorio de datos (el artefacto lo sigue
    /// si no se fijó aparte).
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        if self.output_path == self.data_dir.join(ARTIFACT_FILE) {
            self.output_path = dir.join(ARTIFACT_FILE);
        }
        self.data_dir = dir;
        self
    }
}
