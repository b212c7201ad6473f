//! In-memory store implementations shared by the integration suites.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use rotta::application::repos::{
    ContentInventory, ContentInventoryWrite, EligibilityFilter, NewRedirectRule, RepoError,
    RuleStore, UpsertContentItemParams,
};
use rotta::domain::entities::{ContentItemRecord, RedirectRuleRecord};
use rotta::domain::types::ContentStatus;

#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<RedirectRuleRecord>>,
    next_id: AtomicI64,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_by_id(&self, id: i64) -> Option<RedirectRuleRecord> {
        self.rules
            .lock()
            .expect("rule store lock")
            .iter()
            .find(|rule| rule.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.lock().expect("rule store lock").len()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_exact(&self, source: &str) -> Result<Option<RedirectRuleRecord>, RepoError> {
        Ok(self
            .rules
            .lock()
            .expect("rule store lock")
            .iter()
            .find(|rule| !rule.is_regex && rule.source == source)
            .cloned())
    }

    async fn list_regex_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError> {
        Ok(self
            .rules
            .lock()
            .expect("rule store lock")
            .iter()
            .filter(|rule| rule.is_regex)
            .cloned()
            .collect())
    }

    async fn list_rules(&self) -> Result<Vec<RedirectRuleRecord>, RepoError> {
        Ok(self.rules.lock().expect("rule store lock").clone())
    }

    async fn insert_rule(&self, rule: NewRedirectRule) -> Result<RedirectRuleRecord, RepoError> {
        let mut rules = self.rules.lock().expect("rule store lock");
        if !rule.is_regex
            && rules
                .iter()
                .any(|existing| !existing.is_regex && existing.source == rule.source)
        {
            return Err(RepoError::Duplicate {
                constraint: "redirect_rules_exact_source".to_string(),
            });
        }

        let record = RedirectRuleRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            source: rule.source,
            destination: rule.destination,
            status: rule.status,
            is_regex: rule.is_regex,
            hit_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        rules.push(record.clone());
        Ok(record)
    }

    async fn delete_rule(&self, id: i64) -> Result<bool, RepoError> {
        let mut rules = self.rules.lock().expect("rule store lock");
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        Ok(rules.len() < before)
    }

    async fn record_hit(&self, id: i64) -> Result<(), RepoError> {
        let mut rules = self.rules.lock().expect("rule store lock");
        match rules.iter_mut().find(|rule| rule.id == id) {
            Some(rule) => {
                rule.hit_count += 1;
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct MemoryInventory {
    items: Mutex<Vec<ContentItemRecord>>,
    /// Number of `page_items` calls, i.e. per-page generation fetches.
    pub page_fetches: AtomicUsize,
}

pub fn published_item(content_type: &str, address: &str, updated_at: OffsetDateTime) -> ContentItemRecord {
    ContentItemRecord {
        id: Uuid::new_v4(),
        content_type: content_type.to_string(),
        address: address.to_string(),
        status: ContentStatus::Published,
        noindex: false,
        created_at: updated_at,
        updated_at,
    }
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, item: ContentItemRecord) {
        self.items.lock().expect("inventory lock").push(item);
    }

    pub fn page_fetch_count(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn eligible(item: &ContentItemRecord, filter: &EligibilityFilter) -> bool {
        if filter.published_only && item.status != ContentStatus::Published {
            return false;
        }
        if filter.exclude_noindex && item.noindex {
            return false;
        }
        if let Some(cutoff) = filter.modified_after
            && item.updated_at < cutoff
        {
            return false;
        }
        true
    }

    fn eligible_sorted(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Vec<ContentItemRecord> {
        let mut items: Vec<ContentItemRecord> = self
            .items
            .lock()
            .expect("inventory lock")
            .iter()
            .filter(|item| item.content_type == content_type && Self::eligible(item, filter))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        items
    }
}

#[async_trait]
impl ContentInventory for MemoryInventory {
    async fn list_types(&self) -> Result<Vec<String>, RepoError> {
        let mut types: Vec<String> = self
            .items
            .lock()
            .expect("inventory lock")
            .iter()
            .map(|item| item.content_type.clone())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }

    async fn count_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<u64, RepoError> {
        Ok(self.eligible_sorted(content_type, filter).len() as u64)
    }

    async fn page_items(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<ContentItemRecord>, RepoError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        if page == 0 {
            return Ok(Vec::new());
        }
        let items = self.eligible_sorted(content_type, filter);
        let start = (page as usize - 1) * page_size as usize;
        Ok(items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect())
    }

    async fn most_recently_modified(
        &self,
        content_type: &str,
        filter: &EligibilityFilter,
    ) -> Result<Option<OffsetDateTime>, RepoError> {
        Ok(self
            .eligible_sorted(content_type, filter)
            .first()
            .map(|item| item.updated_at))
    }
}

#[async_trait]
impl ContentInventoryWrite for MemoryInventory {
    async fn find_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        Ok(self
            .items
            .lock()
            .expect("inventory lock")
            .iter()
            .find(|item| item.id == id)
            .cloned())
    }

    async fn upsert_item(
        &self,
        params: UpsertContentItemParams,
    ) -> Result<ContentItemRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut items = self.items.lock().expect("inventory lock");
        if let Some(existing) = items.iter_mut().find(|item| item.id == params.id) {
            existing.content_type = params.content_type;
            existing.address = params.address;
            existing.status = params.status;
            existing.noindex = params.noindex;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let record = ContentItemRecord {
            id: params.id,
            content_type: params.content_type,
            address: params.address,
            status: params.status,
            noindex: params.noindex,
            created_at: now,
            updated_at: now,
        };
        items.push(record.clone());
        Ok(record)
    }

    async fn delete_item(&self, id: Uuid) -> Result<Option<ContentItemRecord>, RepoError> {
        let mut items = self.items.lock().expect("inventory lock");
        let position = items.iter().position(|item| item.id == id);
        Ok(position.map(|index| items.remove(index)))
    }
}
