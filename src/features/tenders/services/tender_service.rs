use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::bids::models::Bid;
use crate::features::bids::BidRepository;
use crate::features::notifications::NotificationService;
use crate::features::tenders::dtos::{CreateTenderDto, TenderResponseDto, UpdateTenderDto};
use crate::features::tenders::models::{
    AwardNotifyTarget, AwardRecipient, NewTender, Tender, TenderChanges, TenderStatus,
};
use crate::features::tenders::TenderRepository;
use crate::modules::cache::ResponseCache;
use crate::shared::constants::{
    bid_cache_key, tender_bids_cache_key, tender_cache_key, TENDERS_CACHE_KEY,
};

/// Service for tender management and awarding
pub struct TenderService {
    tenders: Arc<dyn TenderRepository>,
    bids: Arc<dyn BidRepository>,
    notifications: Arc<NotificationService>,
    cache: ResponseCache,
    award_notify: AwardNotifyTarget,
}

impl TenderService {
    pub fn new(
        tenders: Arc<dyn TenderRepository>,
        bids: Arc<dyn BidRepository>,
        notifications: Arc<NotificationService>,
        cache: ResponseCache,
        award_notify: AwardNotifyTarget,
    ) -> Self {
        Self {
            tenders,
            bids,
            notifications,
            cache,
            award_notify,
        }
    }

    pub async fn create(&self, client_id: Uuid, dto: CreateTenderDto) -> Result<TenderResponseDto> {
        let title = dto.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        ensure_future(dto.deadline, "Deadline")?;
        ensure_positive(dto.budget, "Budget")?;

        let tender = self
            .tenders
            .create(NewTender {
                client_id,
                title,
                description: dto.description,
                deadline: dto.deadline,
                budget: dto.budget,
            })
            .await?;

        self.cache.invalidate([TENDERS_CACHE_KEY]).await;

        tracing::info!("Tender created: id={}, client={}", tender.id, client_id);
        Ok(tender.into())
    }

    pub async fn list(&self) -> Result<Vec<TenderResponseDto>> {
        self.cache
            .get_or_load(TENDERS_CACHE_KEY, || async {
                let tenders = self.tenders.list().await?;
                Ok::<_, AppError>(tenders.into_iter().map(TenderResponseDto::from).collect())
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<TenderResponseDto> {
        self.cache
            .get_or_load(&tender_cache_key(id), || async {
                self.tenders
                    .find_by_id(id)
                    .await?
                    .map(TenderResponseDto::from)
                    .ok_or_else(|| AppError::NotFound("Tender not found".to_string()))
            })
            .await
    }

    pub async fn update(
        &self,
        id: Uuid,
        client_id: Uuid,
        dto: UpdateTenderDto,
    ) -> Result<TenderResponseDto> {
        let tender = self.owned_tender(id, client_id).await?;

        if !tender.is_open() {
            return Err(AppError::Conflict(
                "Tenders can only be updated while open".to_string(),
            ));
        }
        if dto.status == Some(TenderStatus::Awarded) {
            return Err(AppError::Validation(
                "Status cannot be set to awarded; award a bid instead".to_string(),
            ));
        }
        if let Some(deadline) = dto.deadline {
            ensure_future(deadline, "Deadline")?;
        }
        if let Some(budget) = dto.budget {
            ensure_positive(budget, "Budget")?;
        }

        let changes = TenderChanges {
            title: dto.title.map(|t| t.trim().to_string()),
            description: dto.description,
            deadline: dto.deadline,
            budget: dto.budget,
            status: dto.status,
        };

        let updated = self
            .tenders
            .update_open(id, changes)
            .await?
            .ok_or_else(|| AppError::Conflict("Tender is no longer open".to_string()))?;

        self.cache
            .invalidate([TENDERS_CACHE_KEY.to_string(), tender_cache_key(id)])
            .await;

        tracing::info!("Tender updated: id={}, status={:?}", id, updated.status);
        Ok(updated.into())
    }

    pub async fn delete(&self, id: Uuid, client_id: Uuid) -> Result<()> {
        self.owned_tender(id, client_id).await?;

        // Collected before the delete cascades to the bids
        let keys = self.cache_keys_for(id).await;

        if !self.tenders.delete(id).await? {
            return Err(AppError::NotFound(
                "Tender not found or access denied".to_string(),
            ));
        }

        self.cache.invalidate(keys).await;

        tracing::info!("Tender deleted: id={}", id);
        Ok(())
    }

    /// Award `bid_id` and notify the configured recipients.
    ///
    /// Notifications are sent only after the award is committed. Failing to
    /// record or enqueue them is logged and does not undo the award.
    pub async fn award(
        &self,
        id: Uuid,
        client_id: Uuid,
        bid_id: Uuid,
    ) -> Result<TenderResponseDto> {
        let tender = self.owned_tender(id, client_id).await?;

        if !tender.is_open() {
            return Err(AppError::Conflict(
                "Only open tenders can be awarded".to_string(),
            ));
        }

        let bid = self
            .bids
            .find_by_id(bid_id)
            .await?
            .filter(|bid| bid.tender_id == id)
            .ok_or_else(|| AppError::NotFound("Bid not found or access denied".to_string()))?;

        let awarded = self.tenders.award(id, bid_id).await?.ok_or_else(|| {
            AppError::Conflict("Tender was awarded or closed concurrently".to_string())
        })?;

        tracing::info!(
            "Tender awarded: id={}, bid={}, contractor={}",
            id,
            bid_id,
            bid.contractor_id
        );

        let keys = self.cache_keys_for(id).await;
        self.cache.invalidate(keys).await;

        for recipient in award_recipients(self.award_notify, &awarded, &bid) {
            if let Err(e) = self
                .notifications
                .notify(recipient.user_id, recipient.message)
                .await
            {
                tracing::error!(
                    "Failed to record award notification for user {}: {}",
                    recipient.user_id,
                    e
                );
            }
        }

        Ok(awarded.into())
    }

    /// Listing, tender, bid listing and every bid of the tender
    async fn cache_keys_for(&self, id: Uuid) -> Vec<String> {
        let mut keys = vec![
            TENDERS_CACHE_KEY.to_string(),
            tender_cache_key(id),
            tender_bids_cache_key(id),
        ];

        match self.bids.list_by_tender(id).await {
            Ok(bids) => keys.extend(bids.iter().map(|bid| bid_cache_key(id, bid.id))),
            Err(e) => tracing::warn!("Could not list bids to invalidate for tender {}: {}", id, e),
        }

        keys
    }

    /// Fetch a tender the caller owns; someone else's tender looks like a missing one
    async fn owned_tender(&self, id: Uuid, client_id: Uuid) -> Result<Tender> {
        self.tenders
            .find_by_id(id)
            .await?
            .filter(|tender| tender.client_id == client_id)
            .ok_or_else(|| AppError::NotFound("Tender not found or access denied".to_string()))
    }
}

fn award_recipients(target: AwardNotifyTarget, tender: &Tender, bid: &Bid) -> Vec<AwardRecipient> {
    let mut recipients = Vec::with_capacity(2);

    if target.notifies_client() {
        recipients.push(AwardRecipient {
            user_id: tender.client_id,
            message: format!(
                "Your tender \"{}\" has been awarded to bid {}",
                tender.title, bid.id
            ),
        });
    }
    if target.notifies_contractor() {
        recipients.push(AwardRecipient {
            user_id: bid.contractor_id,
            message: format!("Your bid on tender \"{}\" has been awarded", tender.title),
        });
    }

    recipients
}

pub(crate) fn ensure_future(at: DateTime<Utc>, field: &str) -> Result<()> {
    if at <= Utc::now() {
        return Err(AppError::Validation(format!(
            "{} must be in the future",
            field
        )));
    }
    Ok(())
}

pub(crate) fn ensure_positive(amount: Decimal, field: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::bids::models::BidStatus;
    use crate::features::notifications::models::QueuedNotificationMessage;
    use crate::features::users::models::UserRole;
    use crate::modules::queue::NotificationQueue;
    use crate::shared::test_helpers::{
        seed_bid, seed_tender, seed_user, FailingQueue, InMemoryQueue, InMemoryStore, MemoryCache,
    };
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    const QUEUE: &str = "notifications";

    struct Fixture {
        store: Arc<InMemoryStore>,
        queue: Arc<InMemoryQueue>,
        service: TenderService,
    }

    fn fixture(award_notify: AwardNotifyTarget) -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let queue = Arc::new(InMemoryQueue::default());
        let service = service_with_queue(&store, queue.clone(), award_notify);
        Fixture {
            store,
            queue,
            service,
        }
    }

    fn service_with_queue(
        store: &Arc<InMemoryStore>,
        queue: Arc<dyn NotificationQueue>,
        award_notify: AwardNotifyTarget,
    ) -> TenderService {
        let notifications = Arc::new(NotificationService::new(
            store.clone(),
            queue,
            QUEUE.to_string(),
        ));
        TenderService::new(
            store.clone(),
            store.clone(),
            notifications,
            ResponseCache::new(Arc::new(MemoryCache::default()), Duration::from_secs(600)),
            award_notify,
        )
    }

    fn create_dto() -> CreateTenderDto {
        CreateTenderDto {
            title: "Office renovation".to_string(),
            description: "Two floors".to_string(),
            deadline: Utc::now() + ChronoDuration::days(7),
            budget: Decimal::new(1_500_000, 2),
        }
    }

    #[tokio::test]
    async fn test_create_opens_tender() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;

        let tender = fx.service.create(client.id, create_dto()).await.unwrap();

        assert_eq!(tender.status, TenderStatus::Open);
        assert_eq!(tender.client_id, client.id);
    }

    #[tokio::test]
    async fn test_create_rejects_past_deadline_and_non_positive_budget() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;

        let past = CreateTenderDto {
            deadline: Utc::now() - ChronoDuration::minutes(1),
            ..create_dto()
        };
        assert!(matches!(
            fx.service.create(client.id, past).await,
            Err(AppError::Validation(_))
        ));

        let free = CreateTenderDto {
            budget: Decimal::ZERO,
            ..create_dto()
        };
        assert!(matches!(
            fx.service.create(client.id, free).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_refreshed_after_create() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;

        assert!(fx.service.list().await.unwrap().is_empty());
        fx.service.create(client.id, create_dto()).await.unwrap();

        assert_eq!(fx.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_award_persists_then_notifies_client_once() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;
        let contractor = seed_user(&fx.store, UserRole::Contractor).await;
        let tender = seed_tender(&fx.store, client.id).await;
        let winner = seed_bid(&fx.store, tender.id, contractor.id).await;
        let loser = seed_bid(&fx.store, tender.id, contractor.id).await;

        let awarded = fx
            .service
            .award(tender.id, client.id, winner.id)
            .await
            .unwrap();

        assert_eq!(awarded.status, TenderStatus::Awarded);
        assert_eq!(awarded.awarded_bid_id, Some(winner.id));
        assert_eq!(fx.store.bid(winner.id).unwrap().status, BidStatus::Accepted);
        assert_eq!(fx.store.bid(loser.id).unwrap().status, BidStatus::Rejected);

        let records = fx.store.notifications_for(client.id);
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_delivered);

        let published = fx.queue.published(QUEUE);
        assert_eq!(published.len(), 1);
        let message: QueuedNotificationMessage = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(message.id, records[0].id);
        assert_eq!(message.user_id, client.id);
    }

    #[tokio::test]
    async fn test_award_notifies_both_when_configured() {
        let fx = fixture(AwardNotifyTarget::Both);
        let client = seed_user(&fx.store, UserRole::Client).await;
        let contractor = seed_user(&fx.store, UserRole::Contractor).await;
        let tender = seed_tender(&fx.store, client.id).await;
        let bid = seed_bid(&fx.store, tender.id, contractor.id).await;

        fx.service.award(tender.id, client.id, bid.id).await.unwrap();

        assert_eq!(fx.store.notifications_for(client.id).len(), 1);
        assert_eq!(fx.store.notifications_for(contractor.id).len(), 1);
        assert_eq!(fx.queue.published(QUEUE).len(), 2);
    }

    #[tokio::test]
    async fn test_second_award_conflicts_without_new_notification() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;
        let contractor = seed_user(&fx.store, UserRole::Contractor).await;
        let tender = seed_tender(&fx.store, client.id).await;
        let first = seed_bid(&fx.store, tender.id, contractor.id).await;
        let second = seed_bid(&fx.store, tender.id, contractor.id).await;

        fx.service.award(tender.id, client.id, first.id).await.unwrap();
        let again = fx.service.award(tender.id, client.id, second.id).await;

        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(fx.store.notifications_for(client.id).len(), 1);
        assert_eq!(fx.queue.published(QUEUE).len(), 1);
    }

    #[tokio::test]
    async fn test_award_checks_ownership_and_bid_tender() {
        let fx = fixture(AwardNotifyTarget::Client);
        let owner = seed_user(&fx.store, UserRole::Client).await;
        let stranger = seed_user(&fx.store, UserRole::Client).await;
        let contractor = seed_user(&fx.store, UserRole::Contractor).await;
        let tender = seed_tender(&fx.store, owner.id).await;
        let other_tender = seed_tender(&fx.store, owner.id).await;
        let foreign_bid = seed_bid(&fx.store, other_tender.id, contractor.id).await;
        let bid = seed_bid(&fx.store, tender.id, contractor.id).await;

        assert!(matches!(
            fx.service.award(tender.id, stranger.id, bid.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            fx.service.award(tender.id, owner.id, foreign_bid.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(fx.queue.published(QUEUE).is_empty());
    }

    #[tokio::test]
    async fn test_award_survives_queue_outage() {
        let store = Arc::new(InMemoryStore::default());
        let service = service_with_queue(&store, Arc::new(FailingQueue), AwardNotifyTarget::Client);
        let client = seed_user(&store, UserRole::Client).await;
        let contractor = seed_user(&store, UserRole::Contractor).await;
        let tender = seed_tender(&store, client.id).await;
        let bid = seed_bid(&store, tender.id, contractor.id).await;

        let awarded = service.award(tender.id, client.id, bid.id).await.unwrap();

        assert_eq!(awarded.status, TenderStatus::Awarded);
        // Record exists and stays undelivered for the reconnect backfill
        let records = store.notifications_for(client.id);
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_delivered);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;
        let tender = seed_tender(&fx.store, client.id).await;

        let to_awarded = UpdateTenderDto {
            status: Some(TenderStatus::Awarded),
            ..Default::default()
        };
        assert!(matches!(
            fx.service.update(tender.id, client.id, to_awarded).await,
            Err(AppError::Validation(_))
        ));

        let close = UpdateTenderDto {
            status: Some(TenderStatus::Closed),
            ..Default::default()
        };
        let closed = fx.service.update(tender.id, client.id, close).await.unwrap();
        assert_eq!(closed.status, TenderStatus::Closed);

        let retitle = UpdateTenderDto {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            fx.service.update(tender.id, client.id, retitle).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_get_reflects_update_after_invalidation() {
        let fx = fixture(AwardNotifyTarget::Client);
        let client = seed_user(&fx.store, UserRole::Client).await;
        let tender = seed_tender(&fx.store, client.id).await;

        // Warm the cache
        fx.service.get(tender.id).await.unwrap();

        let retitle = UpdateTenderDto {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        fx.service.update(tender.id, client.id, retitle).await.unwrap();

        assert_eq!(fx.service.get(tender.id).await.unwrap().title, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_by_other_client_is_not_found() {
        let fx = fixture(AwardNotifyTarget::Client);
        let owner = seed_user(&fx.store, UserRole::Client).await;
        let stranger = seed_user(&fx.store, UserRole::Client).await;
        let tender = seed_tender(&fx.store, owner.id).await;

        assert!(matches!(
            fx.service.delete(tender.id, stranger.id).await,
            Err(AppError::NotFound(_))
        ));
        fx.service.delete(tender.id, owner.id).await.unwrap();
        assert!(matches!(
            fx.service.get(tender.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
