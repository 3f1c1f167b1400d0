//! In-memory port implementations shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::{Consultation, ConsultationId, ConsultationStatus};
use astroconsult_types::error::RepositoryError;
use astroconsult_types::user::{AstrologerProfile, User, UserId, UserRole};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::repository::consultation::ConsultationRepository;
use crate::repository::directory::AstrologerDirectory;
use crate::repository::message::MessageRepository;

pub fn user(role: UserRole, first_name: &str) -> User {
    User {
        id: UserId::new(),
        phone_number: format!("9198{:08}", rand_digits()),
        first_name: first_name.to_string(),
        last_name: String::new(),
        role,
        created_at: Utc::now(),
    }
}

fn rand_digits() -> u32 {
    (uuid::Uuid::now_v7().as_u128() % 100_000_000) as u32
}

pub fn profile(user_id: UserId, chat_rate: Decimal, is_online: bool) -> AstrologerProfile {
    AstrologerProfile {
        user_id,
        display_name: "Test Astrologer".to_string(),
        chat_rate,
        call_rate: chat_rate * Decimal::from(2),
        is_online,
        is_busy: false,
    }
}

#[derive(Clone, Default)]
pub struct InMemoryConsultations {
    rows: Arc<Mutex<HashMap<ConsultationId, Consultation>>>,
}

impl InMemoryConsultations {
    pub fn insert_raw(&self, consultation: Consultation) {
        self.rows.lock().unwrap().insert(consultation.id, consultation);
    }

    pub fn snapshot(&self, id: &ConsultationId) -> Option<Consultation> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

impl ConsultationRepository for InMemoryConsultations {
    async fn create(
        &self,
        consultation: &Consultation,
        first_consultation_free_minutes: u32,
    ) -> Result<Consultation, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let has_history = rows
            .values()
            .any(|c| c.customer_id == consultation.customer_id);
        let stored = Consultation {
            free_minutes_used: if has_history { 0 } else { first_consultation_free_minutes },
            ..consultation.clone()
        };
        rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: &ConsultationId) -> Result<Option<Consultation>, RepositoryError> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Consultation>, RepositoryError> {
        let rows = self.rows.lock().unwrap();
        let mut mine: Vec<Consultation> = rows
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(mine)
    }

    async fn compare_and_set(
        &self,
        updated: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&updated.id) {
            Some(current) if current.status == expected => {
                *current = updated.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Consultation store where another writer commits `winner` between a
/// transition's read and its compare-and-set.
#[derive(Clone, Default)]
pub struct RacingConsultations {
    pub inner: InMemoryConsultations,
    winner: Arc<Mutex<Option<Consultation>>>,
}

impl RacingConsultations {
    pub fn commit_before_next_write(&self, winner: Consultation) {
        *self.winner.lock().unwrap() = Some(winner);
    }
}

impl ConsultationRepository for RacingConsultations {
    async fn create(
        &self,
        consultation: &Consultation,
        first_consultation_free_minutes: u32,
    ) -> Result<Consultation, RepositoryError> {
        self.inner.create(consultation, first_consultation_free_minutes).await
    }

    async fn get(&self, id: &ConsultationId) -> Result<Option<Consultation>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Consultation>, RepositoryError> {
        self.inner.list_for_user(user_id).await
    }

    async fn compare_and_set(
        &self,
        updated: &Consultation,
        expected: ConsultationStatus,
    ) -> Result<bool, RepositoryError> {
        let winner = self.winner.lock().unwrap().take();
        if let Some(winner) = winner {
            self.inner.insert_raw(winner);
        }
        self.inner.compare_and_set(updated, expected).await
    }
}

#[derive(Default)]
struct MessageRows {
    known: HashSet<ConsultationId>,
    messages: Vec<ChatMessage>,
}

/// Message log that only accepts appends for consultations marked with `allow`.
#[derive(Clone, Default)]
pub struct InMemoryMessages {
    inner: Arc<Mutex<MessageRows>>,
}

impl InMemoryMessages {
    pub fn allow(&self, consultation_id: ConsultationId) {
        self.inner.lock().unwrap().known.insert(consultation_id);
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }
}

impl MessageRepository for InMemoryMessages {
    async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.known.contains(&message.consultation_id) {
            return Err(RepositoryError::NotFound);
        }
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn list(&self, consultation_id: &ConsultationId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.consultation_id == *consultation_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

/// Message repository whose every call takes `.0` to complete.
pub struct SlowMessages(pub Duration);

impl MessageRepository for SlowMessages {
    async fn append(&self, _message: &ChatMessage) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }

    async fn list(&self, _consultation_id: &ConsultationId) -> Result<Vec<ChatMessage>, RepositoryError> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
pub struct StaticDirectory {
    profiles: Arc<Mutex<HashMap<UserId, AstrologerProfile>>>,
}

impl StaticDirectory {
    pub fn with(profile: AstrologerProfile) -> Self {
        let dir = Self::default();
        dir.put(profile);
        dir
    }

    pub fn put(&self, profile: AstrologerProfile) {
        self.profiles.lock().unwrap().insert(profile.user_id, profile);
    }
}

impl AstrologerDirectory for StaticDirectory {
    async fn find_astrologer(&self, user_id: &UserId) -> Result<Option<AstrologerProfile>, RepositoryError> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }
}

/// Directory whose lookups always fail, as when the profile service is down.
pub struct UnreachableDirectory;

impl AstrologerDirectory for UnreachableDirectory {
    async fn find_astrologer(&self, _user_id: &UserId) -> Result<Option<AstrologerProfile>, RepositoryError> {
        Err(RepositoryError::Connection)
    }
}
