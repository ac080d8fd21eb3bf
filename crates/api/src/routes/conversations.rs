//! Direct conversations and message requests.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::conversation::{
    opening_status, ordered_participants, Conversation, ConversationStatus, ConversationSummary,
    Message, MessagePage, MessageRequestSummary, MessagesQuery, SendMessageRequest,
    StartConversationRequest,
};
use domain::models::notification::{NewNotification, NotificationKind};
use domain::models::user::MessagePreference;
use persistence::repositories::{ConversationRepository, NotificationRepository, UserRepository};
use shared::pagination::StreamCursor;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::routes::profiles::public_profiles;
use crate::routes::streams;

/// Loads a conversation the caller takes part in. Outsiders get a 404.
async fn participant_conversation(
    repo: &ConversationRepository,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Conversation, ApiError> {
    repo.find_by_id(conversation_id)
        .await?
        .map(Conversation::from)
        .filter(|c| c.has_participant(user_id))
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))
}

fn by_conversation(messages: Vec<Message>) -> HashMap<Uuid, Message> {
    messages
        .into_iter()
        .map(|m| (m.conversation_id, m))
        .collect()
}

/// Open (or return) the conversation with another user. Depending on the
/// recipient's preference it starts accepted or as a message request.
///
/// POST /api/v1/conversations
pub async fn start_conversation(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<StartConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let users = UserRepository::new(state.pool.clone());
    let recipient = users
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let repo = ConversationRepository::new(state.pool.clone());
    let (p1, p2) = ordered_participants(user_auth.user_id, recipient.id);
    if let Some(existing) = repo.find_by_pair(p1, p2).await? {
        return Ok((StatusCode::OK, Json(existing.into())));
    }

    let preference = MessagePreference::from(recipient.message_preference);
    let status = opening_status(user_auth.user_id, recipient.id, preference)?;

    let (entity, created) = repo
        .get_or_create(p1, p2, user_auth.user_id, status.into())
        .await?;
    let conversation: Conversation = entity.into();

    if created && conversation.status == ConversationStatus::Pending {
        let notification = NewNotification::new(recipient.id, NotificationKind::MessageRequest)
            .from_user(user_auth.user_id)
            .for_conversation(conversation.id);
        if let Err(e) = NotificationRepository::new(state.pool.clone())
            .insert(&notification)
            .await
        {
            warn!(
                conversation_id = %conversation.id,
                error = %e,
                "Failed to store message request notification"
            );
        }
    }

    info!(
        conversation_id = %conversation.id,
        initiator_id = %user_auth.user_id,
        status = conversation.status.as_str(),
        created,
        "Conversation opened"
    );
    let code = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((code, Json(conversation)))
}

/// Send a message in a conversation the caller takes part in.
///
/// POST /api/v1/conversations/:conversation_id/messages
pub async fn send_message(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    request.validate()?;

    let repo = ConversationRepository::new(state.pool.clone());
    participant_conversation(&repo, conversation_id, user_auth.user_id).await?;

    let message: Message = repo
        .insert_message(conversation_id, user_auth.user_id, request.content.trim())
        .await?
        .into();

    info!(
        conversation_id = %conversation_id,
        message_id = %message.id,
        sender_id = %user_auth.user_id,
        "Message sent"
    );
    Ok((StatusCode::CREATED, Json(message)))
}

/// Messages in ascending order, optionally only those after a cursor.
///
/// GET /api/v1/conversations/:conversation_id/messages?after=&limit=
pub async fn list_messages(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagePage<Message>>, ApiError> {
    let (after, limit) = streams::window(&query)?;

    let repo = ConversationRepository::new(state.pool.clone());
    participant_conversation(&repo, conversation_id, user_auth.user_id).await?;

    let messages: Vec<Message> = repo
        .list_messages(conversation_id, after, limit)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(streams::page(messages, query.after.as_deref(), |m| {
        StreamCursor::new(m.created_at, m.id)
    })))
}

/// Accepted conversations, most recently active first.
///
/// GET /api/v1/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let repo = ConversationRepository::new(state.pool.clone());
    let conversations: Vec<Conversation> = repo
        .list_accepted(user_auth.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
    let others: Vec<Uuid> = conversations
        .iter()
        .map(|c| c.other_participant(user_auth.user_id))
        .collect();

    let profiles = public_profiles(&state, &others).await?;
    let mut last = by_conversation(
        repo.last_messages(&ids)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    );

    let summaries = conversations
        .into_iter()
        .map(|conversation| {
            let other = conversation.other_participant(user_auth.user_id);
            ConversationSummary {
                other_user: profiles.get(&other).cloned(),
                last_message: last.remove(&conversation.id),
                conversation,
            }
        })
        .collect();
    Ok(Json(summaries))
}

/// Pending conversations addressed to the caller, with their opening message.
///
/// GET /api/v1/conversations/requests
pub async fn pending_requests(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<Vec<MessageRequestSummary>>, ApiError> {
    let repo = ConversationRepository::new(state.pool.clone());
    let conversations: Vec<Conversation> = repo
        .list_pending_for_recipient(user_auth.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
    let initiators: Vec<Uuid> = conversations.iter().map(|c| c.initiator_id).collect();

    let profiles = public_profiles(&state, &initiators).await?;
    let mut first = by_conversation(
        repo.first_messages(&ids)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    );

    let requests = conversations
        .into_iter()
        .map(|conversation| MessageRequestSummary {
            from_user: profiles.get(&conversation.initiator_id).cloned(),
            first_message: first.remove(&conversation.id),
            conversation,
        })
        .collect();
    Ok(Json(requests))
}

/// Accept a message request. Recipient only.
///
/// POST /api/v1/conversations/:conversation_id/accept
pub async fn accept_request(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Conversation>, ApiError> {
    let repo = ConversationRepository::new(state.pool.clone());
    let conversation = participant_conversation(&repo, conversation_id, user_auth.user_id).await?;
    if !conversation.can_respond(user_auth.user_id) {
        return Err(ApiError::Forbidden(
            "Only the recipient of a pending request can accept it".to_string(),
        ));
    }

    let accepted: Conversation = repo
        .accept(conversation_id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Request is no longer pending".to_string()))?
        .into();

    info!(
        conversation_id = %conversation_id,
        user_id = %user_auth.user_id,
        "Message request accepted"
    );
    Ok(Json(accepted))
}

/// Decline a message request. The conversation and its messages are deleted.
///
/// POST /api/v1/conversations/:conversation_id/decline
pub async fn decline_request(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let repo = ConversationRepository::new(state.pool.clone());
    let conversation = participant_conversation(&repo, conversation_id, user_auth.user_id).await?;
    if !conversation.can_respond(user_auth.user_id) {
        return Err(ApiError::Forbidden(
            "Only the recipient of a pending request can decline it".to_string(),
        ));
    }

    repo.delete(conversation_id).await?;
    info!(
        conversation_id = %conversation_id,
        user_id = %user_auth.user_id,
        "Message request declined"
    );
    Ok(StatusCode::NO_CONTENT)
}
