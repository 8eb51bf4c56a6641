//! In-memory doubles for the repositories, the queue and the cache.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::{from_fn_with_state, Next},
    response::Response,
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::JwtValidator;
use crate::features::bids::models::{Bid, BidStatus, NewBid};
use crate::features::bids::BidRepository;
use crate::features::notifications::models::Notification;
use crate::features::notifications::NotificationRepository;
use crate::features::tenders::models::{NewTender, Tender, TenderChanges, TenderStatus};
use crate::features::tenders::TenderRepository;
use crate::features::users::models::{NewUser, User, UserChanges, UserRole};
use crate::features::users::UserRepository;
use crate::modules::cache::{CacheError, CacheStore};
use crate::modules::queue::{NotificationQueue, QueueError};

// =============================================================================
// AUTH
// =============================================================================

async fn inject_user(
    State(user): State<AuthenticatedUser>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Wrap `router` so every request is made as `user`
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(from_fn_with_state(user, inject_user))
}

pub fn test_jwt_validator() -> JwtValidator {
    JwtValidator::new(
        "test-secret-key-for-unit-tests-only",
        Duration::from_secs(3600),
        Duration::ZERO,
    )
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tenders: Vec<Tender>,
    bids: Vec<Bid>,
    notifications: Vec<Notification>,
}

/// Implements every repository trait over shared vectors
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn bid(&self, id: Uuid) -> Option<Bid> {
        self.tables.lock().bids.iter().find(|b| b.id == id).cloned()
    }

    pub fn bids_for_tender(&self, tender_id: Uuid) -> Vec<Bid> {
        self.tables
            .lock()
            .bids
            .iter()
            .filter(|b| b.tender_id == tender_id)
            .cloned()
            .collect()
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.tables
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn email_taken(users: &[User], email: &str, except: Option<Uuid>) -> bool {
    users
        .iter()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock();
        if email_taken(&tables.users, &user.email, None) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut tables = self.tables.lock();
        if let Some(email) = &changes.email {
            if email_taken(&tables.users, email, Some(id)) {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        // Mirrors the ON DELETE rules of the schema
        let owned: Vec<Uuid> = tables
            .tenders
            .iter()
            .filter(|t| t.client_id == id)
            .map(|t| t.id)
            .collect();
        tables.tenders.retain(|t| t.client_id != id);
        tables
            .bids
            .retain(|b| b.contractor_id != id && !owned.contains(&b.tender_id));
        let remaining: Vec<Uuid> = tables.bids.iter().map(|b| b.id).collect();
        for tender in tables.tenders.iter_mut() {
            if tender
                .awarded_bid_id
                .is_some_and(|bid_id| !remaining.contains(&bid_id))
            {
                tender.awarded_bid_id = None;
            }
        }
        tables.notifications.retain(|n| n.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TenderRepository for InMemoryStore {
    async fn create(&self, tender: NewTender) -> Result<Tender> {
        let now = Utc::now();
        let tender = Tender {
            id: Uuid::new_v4(),
            client_id: tender.client_id,
            title: tender.title,
            description: tender.description,
            deadline: tender.deadline,
            budget: tender.budget,
            status: TenderStatus::Open,
            awarded_bid_id: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().tenders.push(tender.clone());
        Ok(tender)
    }

    async fn list(&self) -> Result<Vec<Tender>> {
        let mut tenders = self.tables.lock().tenders.clone();
        tenders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tenders)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tender>> {
        Ok(self.tables.lock().tenders.iter().find(|t| t.id == id).cloned())
    }

    async fn update_open(&self, id: Uuid, changes: TenderChanges) -> Result<Option<Tender>> {
        let mut tables = self.tables.lock();
        let Some(tender) = tables
            .tenders
            .iter_mut()
            .find(|t| t.id == id && t.status == TenderStatus::Open)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            tender.title = title;
        }
        if let Some(description) = changes.description {
            tender.description = description;
        }
        if let Some(deadline) = changes.deadline {
            tender.deadline = deadline;
        }
        if let Some(budget) = changes.budget {
            tender.budget = budget;
        }
        if let Some(status) = changes.status {
            tender.status = status;
        }
        tender.updated_at = Utc::now();
        Ok(Some(tender.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock();
        let before = tables.tenders.len();
        tables.tenders.retain(|t| t.id != id);
        tables.bids.retain(|b| b.tender_id != id);
        Ok(tables.tenders.len() < before)
    }

    async fn award(&self, tender_id: Uuid, bid_id: Uuid) -> Result<Option<Tender>> {
        let mut tables = self.tables.lock();
        let bid_on_tender = tables
            .bids
            .iter()
            .any(|b| b.id == bid_id && b.tender_id == tender_id);
        if !bid_on_tender {
            return Ok(None);
        }

        let Some(tender) = tables
            .tenders
            .iter_mut()
            .find(|t| t.id == tender_id && t.status == TenderStatus::Open)
        else {
            return Ok(None);
        };
        tender.status = TenderStatus::Awarded;
        tender.awarded_bid_id = Some(bid_id);
        tender.updated_at = Utc::now();
        let awarded = tender.clone();

        for bid in tables.bids.iter_mut().filter(|b| b.tender_id == tender_id) {
            bid.status = if bid.id == bid_id {
                BidStatus::Accepted
            } else {
                BidStatus::Rejected
            };
        }

        Ok(Some(awarded))
    }
}

#[async_trait]
impl BidRepository for InMemoryStore {
    async fn create(&self, bid: NewBid) -> Result<Bid> {
        let bid = Bid {
            id: Uuid::new_v4(),
            tender_id: bid.tender_id,
            contractor_id: bid.contractor_id,
            price: bid.price,
            delivery_time: bid.delivery_time,
            comments: bid.comments,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        };
        self.tables.lock().bids.push(bid.clone());
        Ok(bid)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Bid>> {
        Ok(self.bid(id))
    }

    async fn list_by_tender(&self, tender_id: Uuid) -> Result<Vec<Bid>> {
        Ok(self.bids_for_tender(tender_id))
    }

    async fn list_by_contractor(&self, contractor_id: Uuid) -> Result<Vec<Bid>> {
        let mut bids: Vec<Bid> = self
            .tables
            .lock()
            .bids
            .iter()
            .filter(|b| b.contractor_id == contractor_id)
            .cloned()
            .collect();
        bids.reverse();
        Ok(bids)
    }

    async fn delete_pending(&self, id: Uuid, contractor_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock();
        let before = tables.bids.len();
        tables.bids.retain(|b| {
            !(b.id == id && b.contractor_id == contractor_id && b.status == BidStatus::Pending)
        });
        Ok(tables.bids.len() < before)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, user_id: Uuid, message: &str) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            message: message.to_string(),
            is_delivered: false,
            created_at: Utc::now(),
            delivered_at: None,
        };
        self.tables.lock().notifications.push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self
            .tables
            .lock()
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_delivered(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock();
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && !n.is_delivered)
        {
            Some(notification) => {
                notification.is_delivered = true;
                notification.delivered_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_undelivered_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        Ok(self
            .notifications_for(user_id)
            .into_iter()
            .filter(|n| !n.is_delivered)
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let mut notifications = self.notifications_for(user_id);
        notifications.reverse();
        Ok(notifications)
    }
}

// =============================================================================
// SEEDING
// =============================================================================

pub async fn seed_user(store: &Arc<InMemoryStore>, role: UserRole) -> User {
    let email: String = SafeEmail().fake();
    UserRepository::create(
        store.as_ref(),
        NewUser {
            full_name: Name().fake(),
            email: email.to_lowercase(),
            password_hash: "not-a-real-hash".to_string(),
            role,
        },
    )
    .await
    .expect("seed user")
}

/// An open tender with a deadline a week out
pub async fn seed_tender(store: &Arc<InMemoryStore>, client_id: Uuid) -> Tender {
    TenderRepository::create(
        store.as_ref(),
        NewTender {
            client_id,
            title: "Warehouse roof repair".to_string(),
            description: "Replace damaged panels".to_string(),
            deadline: Utc::now() + ChronoDuration::days(7),
            budget: Decimal::new(2_500_000, 2),
        },
    )
    .await
    .expect("seed tender")
}

pub async fn seed_bid(store: &Arc<InMemoryStore>, tender_id: Uuid, contractor_id: Uuid) -> Bid {
    BidRepository::create(
        store.as_ref(),
        NewBid {
            tender_id,
            contractor_id,
            price: Decimal::new(1_800_000, 2),
            delivery_time: Utc::now() + ChronoDuration::days(30),
            comments: None,
        },
    )
    .await
    .expect("seed bid")
}

// =============================================================================
// QUEUE
// =============================================================================

/// Records every publish; `consume` replays what was published so far
#[derive(Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl InMemoryQueue {
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues.lock().get(queue).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl NotificationQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> std::result::Result<(), QueueError> {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push(payload);
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
    ) -> std::result::Result<BoxStream<'static, std::result::Result<Vec<u8>, QueueError>>, QueueError>
    {
        let messages = self.published(queue);
        Ok(stream::iter(messages.into_iter().map(Ok)).boxed())
    }
}

/// Broker that is never reachable
pub struct FailingQueue;

#[async_trait]
impl NotificationQueue for FailingQueue {
    async fn publish(&self, queue: &str, _payload: Vec<u8>) -> std::result::Result<(), QueueError> {
        Err(QueueError::Publish {
            queue: queue.to_string(),
            reason: "broker unreachable".to_string(),
        })
    }

    async fn consume(
        &self,
        _queue: &str,
    ) -> std::result::Result<BoxStream<'static, std::result::Result<Vec<u8>, QueueError>>, QueueError>
    {
        Err(QueueError::Connection("broker unreachable".to_string()))
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Duration)>>,
}

impl MemoryCache {
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.entries.lock().get(key).map(|(_, ttl)| *ttl)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        Ok(self.entries.lock().get(key).map(|(value, _)| value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> std::result::Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Cache backend that fails every call
pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> std::result::Result<Option<String>, CacheError> {
        Err(CacheError::Backend("cache unavailable".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> std::result::Result<(), CacheError> {
        Err(CacheError::Backend("cache unavailable".to_string()))
    }

    async fn del(&self, _key: &str) -> std::result::Result<(), CacheError> {
        Err(CacheError::Backend("cache unavailable".to_string()))
    }
}
