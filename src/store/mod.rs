//! Almacén de documentos.
//!
//! Colecciones de documentos JSON indexados por clave, con suscripción a
//! cambios. `SqliteStore` es la implementación local; el resto del crate sólo
//! conoce el trait `DocumentStore`.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

use crate::error::{FlotilaError, Result};
use crate::models::{ServiceRecord, VehicleServiceSet};

pub const SERVICES_COLLECTION: &str = "services";
pub const VEHICLE_KM_COLLECTION: &str = "vehicles_km";
pub const VEHICLES_COLLECTION: &str = "vehicles";

pub type Document = Value;
/// Documentos de una colección, clave -> documento.
pub type Documents = BTreeMap<String, Document>;
pub type Callback = Arc<dyn Fn(&Documents) + Send + Sync>;

pub trait DocumentStore: Send + Sync {
    fn get_all(&self, collection: &str) -> Result<Documents>;

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        Ok(self.get_all(collection)?.remove(key))
    }

    /// Crea o reemplaza el documento `key`.
    fn set(&self, collection: &str, key: &str, value: &Document) -> Result<()>;

    /// Registra `callback`: se invoca una vez con el contenido actual y luego
    /// tras cada `set` sobre la colección. Se cancela con `Subscription::unsubscribe`
    /// o al soltar el `Subscription`.
    fn subscribe(&self, collection: &str, callback: Callback) -> Result<Subscription>;
}

type Registry = Mutex<HashMap<String, Vec<(u64, Callback)>>>;

#[derive(Default)]
struct Subscribers {
    next_id: Mutex<u64>,
    registry: Arc<Registry>,
}

impl Subscribers {
    fn add(&self, collection: &str, callback: Callback) -> Result<Subscription> {
        let id = {
            let mut next = self.next_id.lock().map_err(|_| FlotilaError::LockPoisoned)?;
            *next += 1;
            *next
        };
        let mut reg = self.registry.lock().map_err(|_| FlotilaError::LockPoisoned)?;
        reg.entry(collection.to_string()).or_default().push((id, callback));
        Ok(Subscription {
            collection: collection.to_string(),
            id,
            registry: Arc::downgrade(&self.registry),
        })
    }

    fn callbacks(&self, collection: &str) -> Vec<Callback> {
        match self.registry.lock() {
            Ok(reg) => reg
                .get(collection)
                .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

/// Suscripción activa. Soltarla equivale a cancelarla.
pub struct Subscription {
    collection: String,
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // el trabajo lo hace Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else { return };
        if let Ok(mut reg) = registry.lock() {
            if let Some(subs) = reg.get_mut(&self.collection) {
                subs.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

/// Almacén sobre una base SQLite: tabla `documents(collection, key, value)`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    subscribers: Subscribers,
}

impl SqliteStore {
    /// Abre (o crea) el archivo de base de datos, creando el directorio si falta.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            )",
            [],
        )?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            subscribers: Subscribers::default(),
        })
    }

    fn notify(&self, collection: &str) -> Result<()> {
        let callbacks = self.subscribers.callbacks(collection);
        if callbacks.is_empty() {
            return Ok(());
        }
        let docs = self.get_all(collection)?;
        for cb in callbacks {
            cb(&docs);
        }
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn get_all(&self, collection: &str) -> Result<Documents> {
        let conn = self.conn.lock().map_err(|_| FlotilaError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT key, value FROM documents WHERE collection = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut docs = Documents::new();
        for r in rows {
            let (key, raw) = r?;
            match serde_json::from_str(&raw) {
                Ok(v) => {
                    docs.insert(key, v);
                }
                Err(e) => warn!("{}/{}: documento ilegible: {}", collection, key, e),
            }
        }
        Ok(docs)
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().map_err(|_| FlotilaError::LockPoisoned)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn set(&self, collection: &str, key: &str, value: &Document) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        {
            let conn = self.conn.lock().map_err(|_| FlotilaError::LockPoisoned)?;
            conn.execute(
                "INSERT INTO documents (collection, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![collection, key, raw, chrono::Utc::now().to_rfc3339()],
            )?;
        }
        debug!("{}/{} actualizado", collection, key);
        self.notify(collection)
    }

    fn subscribe(&self, collection: &str, callback: Callback) -> Result<Subscription> {
        let sub = self.subscribers.add(collection, Arc::clone(&callback))?;
        let docs = self.get_all(collection)?;
        callback(&docs);
        Ok(sub)
    }
}

/// Publica un documento por placa en `services` como `{"services": [...]}`.
/// Devuelve el número de documentos escritos.
pub fn publish_service_sets<S: DocumentStore + ?Sized>(store: &S, set: &VehicleServiceSet) -> Result<usize> {
    for (plate, services) in set {
        store.set(SERVICES_COLLECTION, plate, &json!({ "services": services }))?;
    }
    Ok(set.len())
}

/// Lee la colección `services`. Los documentos que no tienen la forma esperada
/// se registran y se omiten.
pub fn load_service_sets<S: DocumentStore + ?Sized>(store: &S) -> Result<VehicleServiceSet> {
    let mut set = VehicleServiceSet::new();
    for (plate, doc) in store.get_all(SERVICES_COLLECTION)? {
        let Some(raw) = doc.get("services") else {
            warn!("services/{}: falta el campo 'services'", plate);
            continue;
        };
        match serde_json::from_value::<Vec<ServiceRecord>>(raw.clone()) {
            Ok(services) => {
                set.insert(plate, services);
            }
            Err(e) => warn!("services/{}: {}", plate, e),
        }
    }
    Ok(set)
}

fn odometer_from(doc: &Document) -> Option<f64> {
    let v = doc.get("kilometers").or_else(|| doc.get("km"))?;
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => crate::excel::cell::parse_number_text(s),
        _ => None,
    }
}

/// Odómetro actual del vehículo (`vehicles_km/<placa>`).
pub fn current_odometer<S: DocumentStore + ?Sized>(store: &S, plate: &str) -> Result<Option<f64>> {
    Ok(store.get(VEHICLE_KM_COLLECTION, plate)?.as_ref().and_then(odometer_from))
}

pub fn set_odometer<S: DocumentStore + ?Sized>(store: &S, plate: &str, kilometers: f64) -> Result<()> {
    store.set(VEHICLE_KM_COLLECTION, plate, &json!({ "kilometers": kilometers }))
}

/// Colección de origen registrada en `vehicles/<placa>` (`collectionSource`).
pub fn collection_source<S: DocumentStore + ?Sized>(store: &S, plate: &str) -> Result<Option<String>> {
    Ok(store
        .get(VEHICLES_COLLECTION, plate)?
        .and_then(|doc| doc.get("collectionSource").and_then(Value::as_str).map(str::to_string)))
}
