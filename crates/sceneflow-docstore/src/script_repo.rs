//! Script persistence over Firestore.
//!
//! Scripts live in per-user subcollections (`users/{user_id}/scripts`) and
//! are written wholesale: the full document is replaced on every save so the
//! persisted snapshot is always internally consistent.

use tracing::{debug, info};

use sceneflow_models::{Script, ScriptId};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{fields_to_object, object_to_fields, Write};

/// Repository for script documents.
#[derive(Clone)]
pub struct ScriptRepository {
    client: FirestoreClient,
}

impl ScriptRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn collection(user_id: &str) -> String {
        format!("users/{}/scripts", user_id)
    }

    /// Create a new script document. Fails if the id already exists.
    pub async fn create(&self, script: &Script) -> FirestoreResult<()> {
        let collection = Self::collection(&script.user_id);
        let fields = object_to_fields(&serde_json::to_value(script)?);

        self.client
            .with_retry("create_script", || async {
                self.client
                    .create_document(&collection, script.script_id.as_str(), fields.clone())
                    .await
            })
            .await?;

        info!(
            script_id = %script.script_id,
            user_id = %script.user_id,
            "Created script document"
        );
        Ok(())
    }

    /// Persist the full script state, replacing the stored document.
    pub async fn save(&self, script: &Script) -> FirestoreResult<()> {
        let collection = Self::collection(&script.user_id);
        let fields = object_to_fields(&serde_json::to_value(script)?);

        self.client
            .with_retry("save_script", || async {
                self.client
                    .set_document(&collection, script.script_id.as_str(), fields.clone())
                    .await
            })
            .await?;

        debug!(
            script_id = %script.script_id,
            scenes = script.scenes.len(),
            status = %script.status,
            "Saved script document"
        );
        Ok(())
    }

    /// Load a script. Returns `None` if it does not exist.
    pub async fn load(
        &self,
        user_id: &str,
        script_id: &ScriptId,
    ) -> FirestoreResult<Option<Script>> {
        let collection = Self::collection(user_id);

        let document = self
            .client
            .with_retry("load_script", || async {
                self.client
                    .get_document(&collection, script_id.as_str())
                    .await
            })
            .await?;

        match document {
            Some(doc) => {
                let fields = doc.fields.unwrap_or_default();
                let script: Script = serde_json::from_value(fields_to_object(&fields))?;
                Ok(Some(script))
            }
            None => Ok(None),
        }
    }

    /// List all scripts for a user, following pagination.
    pub async fn list(&self, user_id: &str) -> FirestoreResult<Vec<Script>> {
        let collection = Self::collection(user_id);
        let mut scripts = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .client
                .with_retry("list_scripts", || {
                    // Cloned per attempt: the async move block consumes its
                    // captures, and the retry loop calls the closure again.
                    let collection = collection.clone();
                    let token = page_token.clone();
                    async move {
                        self.client
                            .list_documents(&collection, Some(100), token.as_deref())
                            .await
                    }
                })
                .await?;

            for doc in response.documents.unwrap_or_default() {
                let fields = doc.fields.unwrap_or_default();
                match serde_json::from_value::<Script>(fields_to_object(&fields)) {
                    Ok(script) => scripts.push(script),
                    Err(e) => {
                        // Skip undecodable documents rather than failing the
                        // whole listing; they are surfaced in logs.
                        tracing::warn!(
                            user_id = %user_id,
                            doc = doc.name.as_deref().unwrap_or("<unnamed>"),
                            "Skipping undecodable script document: {}",
                            e
                        );
                    }
                }
            }

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(scripts)
    }

    /// Delete a script document atomically.
    ///
    /// Uses a batch write so future per-script side documents can join the
    /// same atomic delete. Deleting a missing script is a no-op.
    pub async fn delete(&self, user_id: &str, script_id: &ScriptId) -> FirestoreResult<()> {
        let collection = Self::collection(user_id);
        let name = self
            .client
            .full_document_name(&collection, script_id.as_str());

        self.client
            .with_retry("delete_script", || {
                let writes = vec![Write::delete(name.clone())];
                async move { self.client.batch_write(writes).await }
            })
            .await?;

        info!(script_id = %script_id, user_id = %user_id, "Deleted script document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceneflow_models::Scene;

    use crate::error::FirestoreError;
    use crate::retry::{with_retry, RetryConfig};

    #[test]
    fn test_collection_path_is_user_scoped() {
        assert_eq!(
            ScriptRepository::collection("user-42"),
            "users/user-42/scripts"
        );
    }

    #[test]
    fn test_script_roundtrips_through_firestore_fields() {
        let mut script = Script::new("user-1", "Roundtrip", "a draft");
        script.scenes.push(Scene::new(0, "opening shot"));
        script.scenes.push(Scene::new(1, "closing shot"));

        let fields = object_to_fields(&serde_json::to_value(&script).unwrap());
        let back: Script = serde_json::from_value(fields_to_object(&fields)).unwrap();

        assert_eq!(back.script_id, script.script_id);
        assert_eq!(back.scenes.len(), 2);
        assert_eq!(back.scenes[1].narrative, "closing shot");
        assert_eq!(back.status, script.status);
    }

    // The list pagination loop hands `with_retry` a closure whose async move
    // block consumes its captures; each attempt must clone the collection
    // path afresh or a retried page blows up on a moved value.
    #[tokio::test]
    async fn test_page_fetch_closure_is_reinvocable_across_attempts() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        };
        let collection = ScriptRepository::collection("user-1");
        let attempts = AtomicU32::new(0);

        let result = with_retry(&config, "list_scripts", || {
            let collection = collection.clone();
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(FirestoreError::RateLimited(1))
                } else {
                    Ok(collection)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "users/user-1/scripts");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
