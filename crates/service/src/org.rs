//! Collections and tags

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use strongbox_store::{Collection, CollectionStore, NewCollection, Tag, TagStore};

use crate::error::{FieldError, Result, ServiceError};

/// Serialisable view of a collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Collection> for CollectionView {
    fn from(collection: Collection) -> Self {
        Self {
            id: collection.id,
            name: collection.name,
            description: collection.description,
            icon: collection.icon,
            color: collection.color,
            created_at: collection.created_at,
        }
    }
}

/// Serialisable view of a tag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// Input for collection create/update.
#[derive(Debug, Clone)]
pub struct CollectionInput {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Collections and tags, per-account.
#[derive(Clone)]
pub struct OrgService {
    collections: Arc<dyn CollectionStore>,
    tags: Arc<dyn TagStore>,
}

impl OrgService {
    pub fn new(collections: Arc<dyn CollectionStore>, tags: Arc<dyn TagStore>) -> Self {
        Self { collections, tags }
    }

    pub async fn create_collection(
        &self,
        account_id: Uuid,
        input: CollectionInput,
    ) -> Result<CollectionView> {
        let input = validate_collection(input)?;
        let created = self
            .collections
            .create(
                account_id,
                NewCollection {
                    name: input.name,
                    description: input.description,
                    icon: input.icon,
                    color: input.color,
                },
            )
            .await?;
        Ok(created.into())
    }

    pub async fn list_collections(&self, account_id: Uuid) -> Result<Vec<CollectionView>> {
        let collections = self.collections.list(account_id).await?;
        Ok(collections.into_iter().map(Into::into).collect())
    }

    pub async fn update_collection(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: CollectionInput,
    ) -> Result<CollectionView> {
        let input = validate_collection(input)?;
        let updated = self
            .collections
            .update(
                account_id,
                id,
                NewCollection {
                    name: input.name,
                    description: input.description,
                    icon: input.icon,
                    color: input.color,
                },
            )
            .await?;
        Ok(updated.into())
    }

    /// Deletes the collection; its entries move to uncategorised.
    pub async fn delete_collection(&self, account_id: Uuid, id: Uuid) -> Result<()> {
        if !self.collections.delete(account_id, id).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    /// Moves owned entries into a collection, or to uncategorised when
    /// `collection_id` is absent. Returns how many entries moved.
    pub async fn move_entries(
        &self,
        account_id: Uuid,
        entry_ids: &[Uuid],
        collection_id: Option<Uuid>,
    ) -> Result<u64> {
        Ok(self
            .collections
            .move_entries(account_id, entry_ids, collection_id)
            .await?)
    }

    /// Idempotent per `(account, name)`: concurrent creates collapse to
    /// the single surviving row.
    pub async fn create_tag(&self, account_id: Uuid, name: &str) -> Result<TagView> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(ServiceError::validation(
                "name",
                "must be between 1 and 50 characters",
            ));
        }
        let tag = self.tags.create(account_id, name).await?;
        Ok(tag.into())
    }

    pub async fn list_tags(&self, account_id: Uuid) -> Result<Vec<TagView>> {
        let tags = self.tags.list(account_id).await?;
        Ok(tags.into_iter().map(Into::into).collect())
    }

    pub async fn delete_tag(&self, account_id: Uuid, id: Uuid) -> Result<()> {
        if !self.tags.delete(account_id, id).await? {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    /// Replaces an owned entry's tag set with the given names, creating
    /// missing tags along the way.
    pub async fn set_entry_tags(
        &self,
        account_id: Uuid,
        entry_id: Uuid,
        names: &[String],
    ) -> Result<Vec<TagView>> {
        let mut ids = Vec::with_capacity(names.len());
        let mut views = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > 50 {
                continue;
            }
            let tag = self.tags.create(account_id, name).await?;
            ids.push(tag.id);
            views.push(tag.into());
        }
        self.tags.set_entry_tags(account_id, entry_id, &ids).await?;
        Ok(views)
    }
}

impl std::fmt::Debug for OrgService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgService").finish_non_exhaustive()
    }
}

fn validate_collection(mut input: CollectionInput) -> Result<CollectionInput> {
    input.name = input.name.trim().to_string();
    let mut errors = Vec::new();
    if input.name.is_empty() || input.name.chars().count() > 100 {
        errors.push(FieldError::new(
            "name",
            "must be between 1 and 100 characters",
        ));
    }
    if input
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > 500)
    {
        errors.push(FieldError::new(
            "description",
            "must be at most 500 characters",
        ));
    }
    if errors.is_empty() {
        Ok(input)
    } else {
        Err(ServiceError::Validation(errors))
    }
}
