// src/core/file_storage.rs
use crate::core::error::StorageError;
use crate::core::models::{Entity, Kind, CLASS_KEY};

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, warn};

/// Owns every live entity, keyed by `"<Kind>.<id>"`, and the JSON file
/// they are persisted to.
pub struct FileStorage {
    path: PathBuf,
    objects: BTreeMap<String, Entity>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: BTreeMap::new(),
        }
    }

    /// Creates the engine and loads whatever the file currently holds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut storage = Self::new(path);
        storage.reload();
        storage
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> &BTreeMap<String, Entity> {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
        self.objects.values().filter(move |entity| entity.kind() == kind)
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn get(&self, kind: Kind, id: &str) -> Option<&Entity> {
        self.objects.get(&Entity::storage_key(kind, id))
    }

    pub fn get_mut(&mut self, kind: Kind, id: &str) -> Option<&mut Entity> {
        self.objects.get_mut(&Entity::storage_key(kind, id))
    }

    pub fn contains(&self, kind: Kind, id: &str) -> bool {
        self.objects.contains_key(&Entity::storage_key(kind, id))
    }

    /// Inserts or overwrites the entry for `entity`.
    pub fn register(&mut self, entity: Entity) -> String {
        let key = entity.key();
        self.objects.insert(key.clone(), entity);
        key
    }

    /// Builds a fresh entity and registers it. Nothing is written to disk.
    pub fn create(&mut self, kind: Kind) -> &Entity {
        let entity = Entity::new(kind);
        let key = self.register(entity);
        &self.objects[&key]
    }

    pub fn remove(&mut self, kind: Kind, id: &str) -> Option<Entity> {
        self.objects.remove(&Entity::storage_key(kind, id))
    }

    /// Refreshes the entity's `updated_at` and persists the whole cache.
    pub fn save_entity(&mut self, kind: Kind, id: &str) -> Result<(), StorageError> {
        if let Some(entity) = self.get_mut(kind, id) {
            entity.touch();
        }
        self.save()
    }

    /// Serializes the whole cache and replaces the file with it.
    pub fn save(&self) -> Result<(), StorageError> {
        let serialized: Map<String, Value> = self
            .objects
            .iter()
            .map(|(key, entity)| (key.clone(), Value::Object(entity.to_dict())))
            .collect();
        let json = serde_json::to_string_pretty(&serialized)?;

        let io_error = |source| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let mut temp_file = self.path.clone().into_os_string();
        temp_file.push(".temp");
        fs::write(&temp_file, &json).map_err(io_error)?;
        if let Err(e) = fs::rename(&temp_file, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp_file) {
                warn!("Failed to remove {}: {}", temp_file.to_string_lossy(), cleanup);
            }
            return Err(io_error(e));
        }

        debug!("Saved {} objects to {}", self.objects.len(), self.path.display());
        Ok(())
    }

    /// Replaces the cache with the file contents. A missing, unreadable or
    /// malformed file leaves the cache empty.
    pub fn reload(&mut self) {
        self.objects.clear();

        let data = match Self::load_objects(&self.path) {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!("No storage file at {}. Starting empty.", self.path.display());
                return;
            }
            Err(e) => {
                warn!("Failed to load objects from {}: {}. Starting empty.", self.path.display(), e);
                return;
            }
        };

        for (key, value) in data {
            let Some(bag) = value.as_object() else {
                warn!("Skipping {}: entry is not an object", key);
                continue;
            };
            let Some(kind) = bag.get(CLASS_KEY).and_then(Value::as_str).and_then(Kind::from_name) else {
                debug!("Skipping {}: unknown type tag", key);
                continue;
            };
            match Entity::from_dict(kind, bag) {
                Ok(entity) => {
                    self.register(entity);
                }
                Err(e) => warn!("Skipping {}: {}", key, e),
            }
        }

        debug!("Loaded {} objects from {}", self.objects.len(), self.path.display());
    }

    fn load_objects(path: &Path) -> Result<Option<Map<String, Value>>, Box<dyn std::error::Error>> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&json)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err("top-level value is not an object".into()),
        }
    }
}
