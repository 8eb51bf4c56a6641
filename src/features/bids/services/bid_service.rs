use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::bids::dtos::{BidResponseDto, CreateBidDto};
use crate::features::bids::models::NewBid;
use crate::features::bids::BidRepository;
use crate::features::tenders::services::{ensure_future, ensure_positive};
use crate::features::tenders::TenderRepository;
use crate::modules::cache::ResponseCache;
use crate::shared::constants::{bid_cache_key, tender_bids_cache_key};

/// Service for placing, reading and withdrawing bids
pub struct BidService {
    bids: Arc<dyn BidRepository>,
    tenders: Arc<dyn TenderRepository>,
    cache: ResponseCache,
}

impl BidService {
    pub fn new(
        bids: Arc<dyn BidRepository>,
        tenders: Arc<dyn TenderRepository>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            bids,
            tenders,
            cache,
        }
    }

    pub async fn create(
        &self,
        tender_id: Uuid,
        contractor_id: Uuid,
        dto: CreateBidDto,
    ) -> Result<BidResponseDto> {
        let tender = self
            .tenders
            .find_by_id(tender_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tender not found".to_string()))?;

        if !tender.accepts_bids(Utc::now()) {
            return Err(AppError::Validation(
                "Tender is not open for bidding".to_string(),
            ));
        }
        ensure_positive(dto.price, "Price")?;
        ensure_future(dto.delivery_time, "Delivery time")?;

        let bid = self
            .bids
            .create(NewBid {
                tender_id,
                contractor_id,
                price: dto.price,
                delivery_time: dto.delivery_time,
                comments: dto
                    .comments
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            })
            .await?;

        self.cache.invalidate([tender_bids_cache_key(tender_id)]).await;

        tracing::info!(
            "Bid placed: id={}, tender={}, contractor={}",
            bid.id,
            tender_id,
            contractor_id
        );
        Ok(bid.into())
    }

    pub async fn list(&self, tender_id: Uuid) -> Result<Vec<BidResponseDto>> {
        self.cache
            .get_or_load(&tender_bids_cache_key(tender_id), || async {
                if self.tenders.find_by_id(tender_id).await?.is_none() {
                    return Err(AppError::NotFound("Tender not found".to_string()));
                }
                let bids = self.bids.list_by_tender(tender_id).await?;
                Ok(bids.into_iter().map(BidResponseDto::from).collect())
            })
            .await
    }

    pub async fn get(&self, tender_id: Uuid, bid_id: Uuid) -> Result<BidResponseDto> {
        self.cache
            .get_or_load(&bid_cache_key(tender_id, bid_id), || async {
                self.bids
                    .find_by_id(bid_id)
                    .await?
                    .filter(|bid| bid.tender_id == tender_id)
                    .map(BidResponseDto::from)
                    .ok_or_else(|| AppError::NotFound("Bid not found".to_string()))
            })
            .await
    }

    /// Bids placed by the contractor; not cached since only the owner reads them
    pub async fn mine(&self, contractor_id: Uuid) -> Result<Vec<BidResponseDto>> {
        let bids = self.bids.list_by_contractor(contractor_id).await?;
        Ok(bids.into_iter().map(BidResponseDto::from).collect())
    }

    /// Withdraw a pending bid owned by the contractor
    pub async fn delete(&self, bid_id: Uuid, contractor_id: Uuid) -> Result<()> {
        let bid = self
            .bids
            .find_by_id(bid_id)
            .await?
            .filter(|bid| bid.contractor_id == contractor_id)
            .ok_or_else(|| AppError::NotFound("Bid not found or access denied".to_string()))?;

        if !bid.is_pending() {
            return Err(AppError::Conflict(
                "Only pending bids can be withdrawn".to_string(),
            ));
        }

        if !self.bids.delete_pending(bid_id, contractor_id).await? {
            return Err(AppError::Conflict(
                "Bid was settled before it could be withdrawn".to_string(),
            ));
        }

        self.cache
            .invalidate([
                tender_bids_cache_key(bid.tender_id),
                bid_cache_key(bid.tender_id, bid_id),
            ])
            .await;

        tracing::info!("Bid withdrawn: id={}, tender={}", bid_id, bid.tender_id);
        Ok(())
    }
}
