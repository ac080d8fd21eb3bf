//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod conversation;
pub mod group;
pub mod matching;
pub mod notification;
pub mod post;
pub mod streak;
pub mod user;
pub mod wellness;

pub use conversation::{ConversationEntity, ConversationStatusDb, MessageEntity};
pub use group::{
    AvailableStreakEntity, GroupActivityEntity, GroupEntity, GroupInvitationEntity,
    GroupMemberEntity, GroupMessageEntity, GroupRoleDb, GroupWithMembershipEntity,
    MemberWithUserEntity,
};
pub use matching::{
    MatchEntity, MatchMessageEntity, MatchRequestEntity, MatchRequestStatusDb, MatchStatusDb,
    PendingMatchRequestEntity,
};
pub use notification::NotificationEntity;
pub use post::{
    CommentEntity, FlaggedPostEntity, PostCategoryDb, PostEntity, PostVoteEntity, ReportEntity,
    ReportStatusDb, VoteTypeDb,
};
pub use streak::{DailyUpdateEntity, NamedStreakEntity, StreakEntity, StreakWithUserEntity};
pub use user::{
    LoginDayEntity, MatchCandidateEntity, MessagePreferenceDb, ProfileStatsEntity,
    PublicProfileEntity, UserEntity,
};
pub use wellness::{GratitudeEntryEntity, MoodEntryEntity};
