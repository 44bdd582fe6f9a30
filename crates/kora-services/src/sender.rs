//! Sender identity validation and lifecycle

use kora_core::{
    models::SenderIdentity, traits::SenderRepository, AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub struct SenderValidator {
    repo: Arc<dyn SenderRepository>,
}

impl SenderValidator {
    pub fn new(repo: Arc<dyn SenderRepository>) -> Self {
        Self { repo }
    }

    /// Resolve the identity a send will use
    ///
    /// A supplied identifier is matched against display name and id within the
    /// business's approved identities. Without one, the most recently created
    /// approved identity is used.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        business_id: Uuid,
        identifier: Option<&str>,
    ) -> AppResult<SenderIdentity> {
        let identifier = identifier.map(str::trim).filter(|s| !s.is_empty());

        let found = match identifier {
            Some(identifier) => self.repo.find_approved(business_id, identifier).await?,
            None => self.repo.find_default_approved(business_id).await?,
        };

        match found {
            Some(sender) => {
                debug!("Using sender {} ({})", sender.display_name, sender.id);
                Ok(sender)
            }
            None => Err(AppError::SenderNotFound(
                identifier.unwrap_or("<default>").to_string(),
            )),
        }
    }

    /// Register a new identity pending approval
    #[instrument(skip(self))]
    pub async fn register(&self, business_id: Uuid, display_name: &str) -> AppResult<SenderIdentity> {
        let sender = SenderIdentity::register(business_id, display_name)?;
        let created = self.repo.create(&sender).await?;
        info!(
            "Sender {} registered for business {}, awaiting approval",
            created.display_name, business_id
        );
        Ok(created)
    }

    /// Delete an identity no message refers to
    #[instrument(skip(self))]
    pub async fn delete(&self, business_id: Uuid, sender_id: Uuid) -> AppResult<()> {
        if self.repo.delete_unused(business_id, sender_id).await? {
            info!("Sender {} deleted", sender_id);
            Ok(())
        } else {
            Err(AppError::SenderNotFound(sender_id.to_string()))
        }
    }
}
