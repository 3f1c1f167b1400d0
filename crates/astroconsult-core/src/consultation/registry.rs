//! Session registry: the authoritative owner of consultation lifecycle.
//!
//! Every operation takes the acting user explicitly. Transitions load the
//! current row, apply a pure transition, then persist with a compare-and-set
//! on the prior status. Losing that race surfaces as `StateConflict` with the
//! status the winner left behind.

use std::sync::Arc;

use astroconsult_types::chat::ChatMessage;
use astroconsult_types::consultation::{Consultation, ConsultationId, ConsultationType};
use astroconsult_types::error::ConsultationError;
use astroconsult_types::user::{User, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::chat::MessageStore;
use crate::consultation::transition;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::directory::AstrologerDirectory;
use crate::repository::message::MessageRepository;

/// A consultation together with its ordered chat history.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationDetail {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub messages: Vec<ChatMessage>,
}

type Transition = fn(&Consultation, DateTime<Utc>) -> Result<Consultation, ConsultationError>;

/// Service owning consultation creation, transitions, and participant-scoped reads.
///
/// Generic over the repository ports; astroconsult-core never depends on
/// astroconsult-infra.
pub struct SessionRegistry<C: ConsultationRepository, D: AstrologerDirectory, M: MessageRepository> {
    consultations: C,
    directory: D,
    messages: Arc<MessageStore<M>>,
    first_consultation_free_minutes: u32,
}

impl<C, D, M> SessionRegistry<C, D, M>
where
    C: ConsultationRepository,
    D: AstrologerDirectory,
    M: MessageRepository,
{
    /// Create a registry.
    ///
    /// - `messages`: shared with the chat gateway so history reads and live
    ///   appends go through the same store
    /// - `first_consultation_free_minutes`: promotional allowance on a
    ///   customer's first-ever consultation
    pub fn new(
        consultations: C,
        directory: D,
        messages: Arc<MessageStore<M>>,
        first_consultation_free_minutes: u32,
    ) -> Self {
        Self {
            consultations,
            directory,
            messages,
            first_consultation_free_minutes,
        }
    }

    /// Open a new pending consultation between `caller` (as customer) and
    /// `astrologer_id`, pricing it at the astrologer's current rate.
    pub async fn create(
        &self,
        caller: &User,
        astrologer_id: &UserId,
        consultation_type: ConsultationType,
    ) -> Result<Consultation, ConsultationError> {
        if *astrologer_id == caller.id {
            return Err(ConsultationError::validation(
                "astrologer_id",
                "Cannot start a consultation with yourself",
            ));
        }

        let profile = self
            .directory
            .find_astrologer(astrologer_id)
            .await
            .map_err(|e| {
                warn!(astrologer_id = %astrologer_id, error = %e, "astrologer lookup failed");
                ConsultationError::ExternalDependency(format!("astrologer lookup failed: {e}"))
            })?
            .ok_or_else(|| ConsultationError::validation("astrologer_id", "Astrologer not found"))?;

        if !profile.is_available() {
            return Err(ConsultationError::validation(
                "astrologer_id",
                "Astrologer is not online",
            ));
        }

        let rate = profile.rate_for(consultation_type);
        if rate <= Decimal::ZERO {
            return Err(ConsultationError::ExternalDependency(format!(
                "no usable {consultation_type} rate for astrologer {astrologer_id}"
            )));
        }

        let pending = Consultation::new_pending(
            caller.id,
            *astrologer_id,
            consultation_type,
            rate,
            Utc::now(),
        );
        let created = self
            .consultations
            .create(&pending, self.first_consultation_free_minutes)
            .await?;

        info!(
            consultation_id = %created.id,
            customer_id = %created.customer_id,
            astrologer_id = %created.astrologer_id,
            consultation_type = %created.consultation_type,
            rate_per_minute = %created.rate_per_minute,
            free_minutes_used = created.free_minutes_used,
            "consultation created"
        );
        Ok(created)
    }

    /// `pending -> active`.
    pub async fn start(&self, caller: &User, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        let started = self.transition(caller, id, transition::start).await?;
        info!(consultation_id = %id, user_id = %caller.id, "consultation started");
        Ok(started)
    }

    /// `active -> completed`, writing the final bill exactly once.
    pub async fn end(&self, caller: &User, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        let ended = self.transition(caller, id, transition::end).await?;
        info!(
            consultation_id = %id,
            user_id = %caller.id,
            duration_minutes = ended.duration_minutes,
            free_minutes_used = ended.free_minutes_used,
            total_cost = %ended.total_cost.unwrap_or_default(),
            "consultation ended"
        );
        Ok(ended)
    }

    /// `pending -> cancelled`.
    pub async fn cancel(&self, caller: &User, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        let cancelled = self.transition(caller, id, transition::cancel).await?;
        info!(consultation_id = %id, user_id = %caller.id, "consultation cancelled");
        Ok(cancelled)
    }

    /// Live elapsed minutes, for display only.
    pub async fn elapsed_minutes(&self, caller: &User, id: &ConsultationId) -> Result<u32, ConsultationError> {
        let consultation = self.get(caller, id).await?;
        Ok(transition::elapsed_minutes(&consultation, Utc::now()))
    }

    /// Fetch a consultation. Non-participants get `NotFound`.
    pub async fn get(&self, caller: &User, id: &ConsultationId) -> Result<Consultation, ConsultationError> {
        self.participant_consultation(caller, id)
            .await?
            .ok_or(ConsultationError::NotFound)
    }

    /// A consultation with its full ordered chat history.
    pub async fn detail(&self, caller: &User, id: &ConsultationId) -> Result<ConsultationDetail, ConsultationError> {
        let consultation = self.get(caller, id).await?;
        let messages = self.messages.list(id).await?;
        Ok(ConsultationDetail {
            consultation,
            messages,
        })
    }

    /// Ordered chat history of a consultation the caller takes part in.
    pub async fn history(&self, caller: &User, id: &ConsultationId) -> Result<Vec<ChatMessage>, ConsultationError> {
        self.get(caller, id).await?;
        Ok(self.messages.list(id).await?)
    }

    /// Every consultation where the caller is customer or astrologer, newest first.
    pub async fn list_mine(&self, caller: &User) -> Result<Vec<Consultation>, ConsultationError> {
        Ok(self.consultations.list_for_user(&caller.id).await?)
    }

    /// The consultation if `user` is one of its two participants.
    ///
    /// `Ok(None)` covers both a missing consultation and a non-participant,
    /// so callers cannot tell the two apart.
    pub async fn participant_consultation(
        &self,
        user: &User,
        id: &ConsultationId,
    ) -> Result<Option<Consultation>, ConsultationError> {
        let found = self.consultations.get(id).await?;
        Ok(found.filter(|c| c.is_participant(&user.id)))
    }

    async fn transition(
        &self,
        caller: &User,
        id: &ConsultationId,
        apply: Transition,
    ) -> Result<Consultation, ConsultationError> {
        let current = self
            .consultations
            .get(id)
            .await?
            .ok_or(ConsultationError::NotFound)?;

        if !current.is_participant(&caller.id) {
            return Err(ConsultationError::Forbidden);
        }

        let next = apply(&current, Utc::now())?;
        if self.consultations.compare_and_set(&next, current.status).await? {
            return Ok(next);
        }

        let actual = self
            .consultations
            .get(id)
            .await?
            .map(|c| c.status)
            .ok_or(ConsultationError::NotFound)?;
        warn!(
            consultation_id = %id,
            expected = %current.status,
            actual = %actual,
            "lost consultation transition race"
        );
        Err(ConsultationError::StateConflict {
            expected: current.status,
            actual,
        })
    }
}
