use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::bids::BidRepository;
use crate::features::tenders::TenderRepository;
use crate::features::users::dtos::{PublicUserDto, UpdateUserDto, UserResponseDto};
use crate::features::users::models::UserChanges;
use crate::features::users::UserRepository;
use crate::modules::cache::ResponseCache;
use crate::shared::constants::{
    bid_cache_key, tender_bids_cache_key, tender_cache_key, TENDERS_CACHE_KEY,
};

/// Service for reading and managing user profiles
pub struct UserService {
    users: Arc<dyn UserRepository>,
    tenders: Arc<dyn TenderRepository>,
    bids: Arc<dyn BidRepository>,
    cache: ResponseCache,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tenders: Arc<dyn TenderRepository>,
        bids: Arc<dyn BidRepository>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            users,
            tenders,
            bids,
            cache,
        }
    }

    pub async fn get_me(&self, user_id: Uuid) -> Result<UserResponseDto> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserResponseDto::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_public(&self, user_id: Uuid) -> Result<PublicUserDto> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUserDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn update_me(&self, user_id: Uuid, dto: UpdateUserDto) -> Result<UserResponseDto> {
        if dto.full_name.is_none() && dto.email.is_none() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }

        let changes = UserChanges {
            full_name: dto.full_name.map(|name| name.trim().to_string()),
            email: dto.email.map(|email| email.trim().to_lowercase()),
        };

        let user = self
            .users
            .update(user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!("User updated: id={}", user.id);
        Ok(user.into())
    }

    /// Delete the account. Its tenders, bids and notifications go with it, so
    /// every cached view of them is dropped as well.
    pub async fn delete_me(&self, user_id: Uuid) -> Result<()> {
        // Collected before the delete cascades
        let keys = self.cache_keys_for(user_id).await?;

        if !self.users.delete(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.cache.invalidate(keys).await;

        tracing::info!("User deleted: id={}", user_id);
        Ok(())
    }

    /// Keys for the user's tenders with all their bids, and for every tender
    /// the user bid on
    async fn cache_keys_for(&self, user_id: Uuid) -> Result<Vec<String>> {
        let mut keys = vec![TENDERS_CACHE_KEY.to_string()];

        let owned = self.tenders.list().await?;
        for tender in owned.iter().filter(|t| t.client_id == user_id) {
            keys.push(tender_cache_key(tender.id));
            keys.push(tender_bids_cache_key(tender.id));
            for bid in self.bids.list_by_tender(tender.id).await? {
                keys.push(bid_cache_key(tender.id, bid.id));
            }
        }

        // An awarded bid going away also clears the tender's awarded_bid_id
        for bid in self.bids.list_by_contractor(user_id).await? {
            keys.push(tender_cache_key(bid.tender_id));
            keys.push(tender_bids_cache_key(bid.tender_id));
            keys.push(bid_cache_key(bid.tender_id, bid.id));
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
