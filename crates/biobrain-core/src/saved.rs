//! Answers pinned for offline review. Append-only, unbounded.

use std::rc::Rc;

use chrono::Utc;
use biobrain_types::{Result, conversation::SavedAnswer};

use crate::ports::StoragePort;

pub const SAVED_ANSWERS_KEY: &str = "biobrain:saved";

#[derive(Clone)]
pub struct SavedAnswers {
    storage: Rc<dyn StoragePort>,
}

impl SavedAnswers {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    /// All saved answers, oldest first. Corrupted data reads as empty.
    pub async fn list(&self) -> Vec<SavedAnswer> {
        match self.storage.get(SAVED_ANSWERS_KEY).await {
            Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("Saved answers are corrupted ({}), treating as empty", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read saved answers: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn save(&self, content: impl Into<String>) -> Result<SavedAnswer> {
        let answer = SavedAnswer {
            content: content.into(),
            saved_at: Utc::now(),
        };
        let mut all = self.list().await;
        all.push(answer.clone());

        let json = serde_json::to_string(&all)?;
        self.storage.set(SAVED_ANSWERS_KEY, &json).await.map_err(|e| {
            log::error!("Failed to save answer: {}", e);
            e
        })?;
        Ok(answer)
    }
}
