//! Group repository: groups, membership, invitations and group chat.

use chrono::NaiveDate;
use domain::models::group::{apply_warning, WarningOutcome, DEFAULT_ACTIVITIES};
use shared::pagination::StreamCursor;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{
    GroupEntity, GroupInvitationEntity, GroupMemberEntity, GroupMessageEntity, GroupRoleDb,
    GroupWithMembershipEntity, MemberWithUserEntity,
};
use crate::metrics::QueryTimer;

/// Input for a new group. Challenge fields are set only for challenges.
#[derive(Debug, Clone)]
pub struct NewGroup<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub creator_id: Uuid,
    pub cover_image_url: Option<&'a str>,
    pub is_public: bool,
    pub challenge: Option<NewChallenge<'a>>,
}

#[derive(Debug, Clone)]
pub struct NewChallenge<'a> {
    pub goal: &'a str,
    pub duration_days: i32,
    pub managed_by_admin: bool,
    pub category: &'a str,
}

/// Settings update. `None` leaves a column alone; `cover_image_url: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct GroupSettingsChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub allow_member_posting: Option<bool>,
    pub allow_member_messaging: Option<bool>,
    pub requires_approval: Option<bool>,
    pub cover_image_url: Option<Option<String>>,
}

/// Result of a warning issued inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningResult {
    NotMember,
    Applied(WarningOutcome),
}

/// Repository for group-related database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Creates a new GroupRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a group, make the creator a member with the creator role and,
    /// for regular groups, seed the default activities.
    pub async fn create_group(&self, group: NewGroup<'_>) -> Result<GroupEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group");
        let mut tx = self.pool.begin().await?;

        let (is_challenge, goal, duration, managed, challenge_category) = match &group.challenge {
            Some(c) => (
                true,
                Some(c.goal),
                Some(c.duration_days),
                c.managed_by_admin,
                Some(c.category),
            ),
            None => (false, None, None, false, None),
        };

        let created = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO groups (name, description, category, creator_id, cover_image_url, is_public,
                                is_challenge, challenge_goal, challenge_duration_days,
                                managed_by_admin, challenge_category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, name, description, category, creator_id, cover_image_url, is_public,
                      allow_member_posting, allow_member_messaging, requires_approval,
                      is_challenge, challenge_goal, challenge_duration_days, managed_by_admin,
                      challenge_category, created_at, updated_at
            "#,
        )
        .bind(group.name)
        .bind(group.description)
        .bind(group.category)
        .bind(group.creator_id)
        .bind(group.cover_image_url)
        .bind(group.is_public)
        .bind(is_challenge)
        .bind(goal)
        .bind(duration)
        .bind(managed)
        .bind(challenge_category)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, 'creator')
            "#,
        )
        .bind(created.id)
        .bind(group.creator_id)
        .execute(&mut *tx)
        .await?;

        if !is_challenge {
            seed_default_activities(&mut tx, created.id).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(created)
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, description, category, creator_id, cover_image_url, is_public,
                   allow_member_posting, allow_member_messaging, requires_approval,
                   is_challenge, challenge_goal, challenge_duration_days, managed_by_admin,
                   challenge_category, created_at, updated_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a group with member count and the caller's role.
    pub async fn find_with_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupWithMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_with_membership");
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
            LEFT JOIN group_members gm ON gm.group_id = g.id AND gm.user_id = $2
            LEFT JOIN users u ON u.id = g.creator_id
            WHERE g.id = $1
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Groups visible to the user, newest first. Private groups are only
    /// listed when asked for and the user belongs to them.
    pub async fn list_groups(
        &self,
        user_id: Uuid,
        include_private: bool,
        category: Option<&str>,
    ) -> Result<Vec<GroupWithMembershipEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_groups");
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
            WHERE (g.is_public OR ($2 AND gm.user_id IS NOT NULL))
              AND ($3::text IS NULL OR g.category = $3)
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(include_private)
        .bind(category)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Apply a settings update.
    pub async fn update_settings(
        &self,
        group_id: Uuid,
        changes: GroupSettingsChanges,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_group_settings");
        let (set_cover, cover) = match changes.cover_image_url {
            Some(value) => (true, value),
            None => (false, None),
        };
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_public = COALESCE($4, is_public),
                allow_member_posting = COALESCE($5, allow_member_posting),
                allow_member_messaging = COALESCE($6, allow_member_messaging),
                requires_approval = COALESCE($7, requires_approval),
                cover_image_url = CASE WHEN $8 THEN $9 ELSE cover_image_url END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, category, creator_id, cover_image_url, is_public,
                      allow_member_posting, allow_member_messaging, requires_approval,
                      is_challenge, challenge_goal, challenge_duration_days, managed_by_admin,
                      challenge_category, created_at, updated_at
            "#,
        )
        .bind(group_id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.is_public)
        .bind(changes.allow_member_posting)
        .bind(changes.allow_member_messaging)
        .bind(changes.requires_approval)
        .bind(set_cover)
        .bind(cover)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete a group. Members, activities, streaks and chat go with it.
    pub async fn delete_group(&self, group_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_group");
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    // Membership

    pub async fn find_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_member");
        let result = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            SELECT group_id, user_id, role, warnings, current_streak, last_proof_date,
                   completed_at, joined_at
            FROM group_members
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Add a member. Returns `false` when the user already belongs to the group.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRoleDb,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("add_group_member");
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("remove_group_member");
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRoleDb,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("set_group_member_role");
        let result = sqlx::query(
            "UPDATE group_members SET role = $3 WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Add one warning under a row lock. Reaching the limit removes the member.
    pub async fn issue_warning(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<WarningResult, sqlx::Error> {
        let timer = QueryTimer::new("issue_group_warning");
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT warnings FROM group_members
            WHERE group_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            timer.record();
            return Ok(WarningResult::NotMember);
        };

        let outcome = apply_warning(current);
        match outcome {
            WarningOutcome::Warned { warnings } => {
                sqlx::query(
                    "UPDATE group_members SET warnings = $3 WHERE group_id = $1 AND user_id = $2",
                )
                .bind(group_id)
                .bind(user_id)
                .bind(warnings)
                .execute(&mut *tx)
                .await?;
            }
            WarningOutcome::Removed { .. } => {
                sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
                    .bind(group_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        timer.record();
        Ok(WarningResult::Applied(outcome))
    }

    /// Members with profiles, creator first then by join time. `today` is
    /// used for the proof-of-the-day flag.
    pub async fn list_members(
        &self,
        group_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<MemberWithUserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_members");
        let result = sqlx::query_as::<_, MemberWithUserEntity>(
            r#"
            SELECT gm.group_id, gm.user_id, gm.role, gm.warnings, gm.current_streak,
                   gm.last_proof_date, gm.completed_at, gm.joined_at,
                   u.display_name, u.anonymous_username, u.avatar_url,
                   EXISTS (
                       SELECT 1 FROM challenge_proofs p
                       WHERE p.group_id = gm.group_id AND p.user_id = gm.user_id
                         AND p.proof_date = $2
                   ) AS has_proof_today
            FROM group_members gm
            JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1
            ORDER BY CASE gm.role WHEN 'creator' THEN 0 WHEN 'admin' THEN 1 ELSE 2 END,
                     gm.joined_at ASC
            "#,
        )
        .bind(group_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    // Invitations

    /// Invite an email address. Re-inviting refreshes a previous invitation.
    pub async fn create_invitation(
        &self,
        group_id: Uuid,
        inviter_id: Uuid,
        invitee_email: &str,
    ) -> Result<GroupInvitationEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_group_invitation");
        let result = sqlx::query_as::<_, GroupInvitationEntity>(
            r#"
            INSERT INTO group_invitations (group_id, inviter_id, invitee_email)
            VALUES ($1, $2, LOWER($3))
            ON CONFLICT (group_id, invitee_email)
            DO UPDATE SET inviter_id = EXCLUDED.inviter_id, status = 'pending', created_at = NOW()
            RETURNING id, group_id, inviter_id, invitee_email, status, created_at
            "#,
        )
        .bind(group_id)
        .bind(inviter_id)
        .bind(invitee_email)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark a pending invitation for `email` as accepted. Returns whether one existed.
    pub async fn consume_invitation(
        &self,
        group_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("consume_group_invitation");
        let result = sqlx::query(
            r#"
            UPDATE group_invitations
            SET status = 'accepted'
            WHERE group_id = $1 AND invitee_email = LOWER($2) AND status = 'pending'
            "#,
        )
        .bind(group_id)
        .bind(email)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    // Group chat

    pub async fn insert_message(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<GroupMessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_group_message");
        let result = sqlx::query_as::<_, GroupMessageEntity>(
            r#"
            WITH inserted AS (
                INSERT INTO group_messages (group_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, group_id, user_id, content, created_at
            )
            SELECT i.id, i.group_id, i.user_id, i.content, i.created_at,
                   u.display_name, u.anonymous_username, u.avatar_url
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Chat messages ascending; after a cursor, or the latest `limit`.
    pub async fn list_messages(
        &self,
        group_id: Uuid,
        after: Option<StreamCursor>,
        limit: i64,
    ) -> Result<Vec<GroupMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_group_messages");
        let result = match after {
            Some(cursor) => {
                sqlx::query_as::<_, GroupMessageEntity>(
                    r#"
                    SELECT m.id, m.group_id, m.user_id, m.content, m.created_at,
                           u.display_name, u.anonymous_username, u.avatar_url
                    FROM group_messages m
                    JOIN users u ON u.id = m.user_id
                    WHERE m.group_id = $1 AND (m.created_at, m.id) > ($2, $3)
                    ORDER BY m.created_at ASC, m.id ASC
                    LIMIT $4
                    "#,
                )
                .bind(group_id)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, GroupMessageEntity>(
                    r#"
                    SELECT * FROM (
                        SELECT m.id, m.group_id, m.user_id, m.content, m.created_at,
                               u.display_name, u.anonymous_username, u.avatar_url
                        FROM group_messages m
                        JOIN users u ON u.id = m.user_id
                        WHERE m.group_id = $1
                        ORDER BY m.created_at DESC, m.id DESC
                        LIMIT $2
                    ) latest
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(group_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        };
        timer.record();
        result
    }
}

async fn seed_default_activities(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
) -> Result<(), sqlx::Error> {
    for (activity_type, name, description) in DEFAULT_ACTIVITIES {
        sqlx::query(
            r#"
            INSERT INTO group_activities (group_id, activity_type, name, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, activity_type) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(activity_type)
        .bind(name)
        .bind(description)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
