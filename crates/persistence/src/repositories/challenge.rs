//! Challenge repository: daily proofs and admin-managed listings.
//!
//! Challenges are groups with `is_challenge` set, so creation, membership
//! and chat go through [`GroupRepository`](super::GroupRepository).

use chrono::NaiveDate;
use domain::models::challenge::{record_proof, ProofError, ProofOutcome, ProofState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::GroupWithMembershipEntity;
use crate::metrics::QueryTimer;

/// Result of submitting a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSubmission {
    NotMember,
    AlreadySubmitted,
    Recorded(ProofOutcome),
}

/// Repository for challenge proofs.
#[derive(Clone)]
pub struct ChallengeRepository {
    pool: PgPool,
}

impl ChallengeRepository {
    /// Creates a new ChallengeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record today's proof and advance the member's streak.
    ///
    /// The member row is locked for the whole read-modify-write so two
    /// concurrent submissions cannot both count.
    pub async fn submit_proof(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        image_url: &str,
        today: NaiveDate,
        duration_days: i32,
    ) -> Result<ProofSubmission, sqlx::Error> {
        let timer = QueryTimer::new("submit_challenge_proof");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (i32, Option<NaiveDate>)>(
            r#"
            SELECT current_streak, last_proof_date
            FROM group_members
            WHERE group_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((current_streak, last_proof_date)) = row else {
            tx.rollback().await?;
            timer.record();
            return Ok(ProofSubmission::NotMember);
        };

        let state = ProofState {
            current_streak,
            last_proof_date,
        };
        let (next, outcome) = match record_proof(state, today, duration_days) {
            Ok(applied) => applied,
            Err(ProofError::AlreadySubmittedToday) => {
                tx.rollback().await?;
                timer.record();
                return Ok(ProofSubmission::AlreadySubmitted);
            }
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO challenge_proofs (group_id, user_id, proof_date, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, user_id, proof_date) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(today)
        .bind(image_url)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            timer.record();
            return Ok(ProofSubmission::AlreadySubmitted);
        }

        sqlx::query(
            r#"
            UPDATE group_members
            SET current_streak = $3,
                last_proof_date = $4,
                completed_at = CASE
                    WHEN $5 AND completed_at IS NULL THEN NOW()
                    ELSE completed_at
                END
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(next.current_streak)
        .bind(next.last_proof_date)
        .bind(outcome.completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(ProofSubmission::Recorded(outcome))
    }

    pub async fn has_proof_on(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("has_challenge_proof");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM challenge_proofs
                WHERE group_id = $1 AND user_id = $2 AND proof_date = $3
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Public admin-managed challenges, newest first.
    pub async fn official_challenges(
        &self,
        user_id: Uuid,
        category: Option<&str>,
    ) -> Result<Vec<GroupWithMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_official_challenges");
        let result = sqlx::query_as::<_, GroupWithMembershipEntity>(
            r#"
            SELECT g.id, g.name, g.description, g.category, g.creator_id, g.cover_image_url,
                   g.is_public, g.allow_member_posting, g.allow_member_messaging,
                   g.requires_approval, g.is_challenge, g.challenge_goal,
                   g.challenge_duration_days, g.managed_by_admin, g.challenge_category,
                   g.created_at, g.updated_at,
                   (SELECT COUNT(*) FROM group_members WHERE group_id = g.id) AS member_count,
                   gm.role AS your_role,
                   u.display_name AS creator_display_name,
                   u.anonymous_username AS creator_anonymous_username,
                   u.avatar_url AS creator_avatar_url
            FROM groups g
            LEFT JOIN group_members gm ON gm.group_id = g.id AND gm.user_id = $1
            LEFT JOIN users u ON u.id = g.creator_id
            WHERE g.is_challenge AND g.managed_by_admin AND g.is_public
              AND ($2::text IS NULL OR g.challenge_category = $2)
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
