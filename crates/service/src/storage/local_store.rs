use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::{matching_children, segments, DocumentStore, StoreError};

/// In-process JSON tree with optional file persistence.
///
/// Mirrors the store semantics the services rely on: `null` deletes, empty
/// objects vanish, equality queries match string children. Without a file it
/// is a plain in-memory store, which is what the tests inject.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<RwLock<Value>>,
    file_path: Option<PathBuf>,
}

impl LocalStore {
    /// Empty store that never touches disk.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self { inner: Arc::new(RwLock::new(Value::Object(Map::new()))), file_path: None })
    }

    /// Initialize the store from a path. Creates the file with an empty tree if missing.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let tree: Value = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Value::Object(Map::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Decode(format!("{}: {e}", file_path.display())))?,
            Err(_) => {
                let empty = Value::Object(Map::new());
                fs::write(&file_path, serde_json::to_vec(&empty).map_err(|e| StoreError::Io(e.to_string()))?)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                empty
            }
        };
        let tree = if tree.is_object() { tree } else { Value::Object(Map::new()) };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(tree)), file_path: Some(file_path) }))
    }

    async fn save(&self, tree: &Value) -> Result<(), StoreError> {
        let Some(path) = &self.file_path else { return Ok(()) };
        let data = serde_json::to_vec_pretty(tree).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::write(path, data).await.map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    /// Apply `change` to a copy of `tree`; the copy replaces it only once saved.
    async fn commit(&self, tree: &mut Value, change: impl FnOnce(&mut Value)) -> Result<(), StoreError> {
        if self.file_path.is_none() {
            change(tree);
            return Ok(());
        }
        let mut next = tree.clone();
        change(&mut next);
        self.save(&next).await?;
        *tree = next;
        Ok(())
    }

    /// Snapshot of the whole tree.
    pub async fn dump(&self) -> Value {
        self.inner.read().await.clone()
    }
}

fn lookup<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(tree, |node, seg| node.as_object()?.get(seg))
}

/// Set `value` at `path`, creating intermediate objects. `null` removes the
/// node and prunes parents left empty.
fn set(tree: &mut Value, path: &str, value: Value) {
    let segs: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        *tree = if value.is_object() { value } else { Value::Object(Map::new()) };
        return;
    };
    if value.is_null() {
        remove(tree, &segs);
        return;
    }
    let mut node = tree;
    for seg in parents {
        node = ensure_object(node)
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.to_string(), value);
}

/// Scalars in the way of a deeper write are replaced by an object.
fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

/// Remove the node at `segs`; returns true when the caller's node became empty.
fn remove(node: &mut Value, segs: &[&str]) -> bool {
    let Value::Object(map) = node else { return false };
    match segs {
        [] => false,
        [last] => {
            map.remove(*last);
            map.is_empty()
        }
        [head, rest @ ..] => {
            if let Some(child) = map.get_mut(*head) {
                if remove(child, rest) {
                    map.remove(*head);
                }
            }
            map.is_empty()
        }
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let tree = self.inner.read().await;
        Ok(lookup(&tree, path).filter(|v| !v.is_null()).cloned())
    }

    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let mut tree = self.inner.write().await;
        debug!(%path, backend = "local", "write");
        self.commit(&mut tree, |t| set(t, path, value.clone())).await
    }

    async fn create(&self, path: &str, value: &Value) -> Result<bool, StoreError> {
        // the write lock spans check and set
        let mut tree = self.inner.write().await;
        if lookup(&tree, path).is_some_and(|v| !v.is_null()) {
            return Ok(false);
        }
        debug!(%path, backend = "local", "create");
        self.commit(&mut tree, |t| set(t, path, value.clone())).await?;
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut tree = self.inner.write().await;
        debug!(%path, backend = "local", "delete");
        self.commit(&mut tree, |t| set(t, path, Value::Null)).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Map<String, Value>, StoreError> {
        let tree = self.inner.read().await;
        let Some(Value::Object(children)) = lookup(&tree, collection) else {
            return Ok(Map::new());
        };
        Ok(matching_children(children, field, value))
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn read_write_delete_and_prune() -> Result<(), anyhow::Error> {
        let store = LocalStore::in_memory();

        assert!(store.read("clientes/u1").await?.is_none());
        store.write("clientes/u1", &json!({"id": "u1"})).await?;
        assert_eq!(store.read("clientes/u1").await?, Some(json!({"id": "u1"})));
        assert_eq!(store.read("clientes/u1/id").await?, Some(json!("u1")));

        store.delete("clientes/u1").await?;
        assert!(store.read("clientes/u1").await?.is_none());
        // empty parents disappear, like the hosted store
        assert_eq!(store.dump().await, json!({}));

        store.write("clientes/u2", &json!({"id": "u2"})).await?;
        store.write("clientes/u2", &Value::Null).await?;
        assert!(store.read("clientes").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn create_is_create_if_absent() -> Result<(), anyhow::Error> {
        let store = LocalStore::in_memory();
        assert!(store.create("cidades/c1", &json!({"nome": "A"})).await?);
        assert!(!store.create("cidades/c1", &json!({"nome": "B"})).await?);
        assert_eq!(store.read("cidades/c1/nome").await?, Some(json!("A")));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creates_have_one_winner() -> Result<(), anyhow::Error> {
        let store = LocalStore::in_memory();
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = Arc::clone(&store);
            handles.push(tokio::spawn(async move { s.create("clientes/same", &json!({ "n": i })).await }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await?? {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_field_matches_string_children() -> Result<(), anyhow::Error> {
        let store = LocalStore::in_memory();
        store.write("clientes/u1", &json!({"cidadeId": "c1"})).await?;
        store.write("clientes/u2", &json!({"cidadeId": "c2"})).await?;
        store.write("clientes/u3", &json!({"cidadeId": "c1"})).await?;
        store.write("clientes/u4", &json!({"cidadeId": null})).await?;

        let hits = store.find_by_field("clientes", "cidadeId", "c1").await?;
        assert_eq!(hits.keys().collect::<Vec<_>>(), vec!["u1", "u3"]);
        assert!(store.find_by_field("nada", "cidadeId", "c1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn file_backed_store_persists() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("local_store_{}.json", uuid::Uuid::new_v4()));
        let store = LocalStore::open(&tmp).await?;
        store.write("cidades/c1", &json!({"nome": "Springfield"})).await?;
        store.write("cidades/c2", &json!({"nome": "Shelbyville"})).await?;
        store.delete("cidades/c2").await?;

        let reloaded = LocalStore::open(&tmp).await?;
        assert_eq!(reloaded.read("cidades/c1/nome").await?, Some(json!("Springfield")));
        assert!(reloaded.read("cidades/c2").await?.is_none());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("local_store_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"{not json").await?;
        assert!(matches!(LocalStore::open(&tmp).await, Err(StoreError::Decode(_))));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_leaves_memory_unchanged() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("local_store_{}.json", uuid::Uuid::new_v4()));
        let store = LocalStore::open(&tmp).await?;
        store.write("cidades/c1", &json!({"nome": "Springfield"})).await?;

        // a directory where the data file should be makes every save fail
        tokio::fs::remove_file(&tmp).await?;
        tokio::fs::create_dir(&tmp).await?;
        assert!(matches!(store.write("cidades/c2", &json!({"nome": "X"})).await, Err(StoreError::Io(_))));
        assert!(matches!(store.create("cidades/c3", &json!({"nome": "Y"})).await, Err(StoreError::Io(_))));
        assert!(matches!(store.delete("cidades/c1").await, Err(StoreError::Io(_))));
        assert_eq!(store.dump().await, json!({"cidades": {"c1": {"nome": "Springfield"}}}));

        tokio::fs::remove_dir(&tmp).await?;
        assert!(store.create("cidades/c3", &json!({"nome": "Y"})).await?);
        let reloaded = LocalStore::open(&tmp).await?;
        assert_eq!(reloaded.read("cidades/c3/nome").await?, Some(json!("Y")));
        assert_eq!(reloaded.read("cidades/c1/nome").await?, Some(json!("Springfield")));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
