pub mod board;
pub mod countdown;
pub mod domain;
pub mod error;
pub mod feed;
pub mod history;
pub mod identity;
pub mod leaderboard;
pub mod ports;
pub mod session;
pub mod timer;
pub mod vocabulary;

pub use domain::{
    LeaderboardEntry, Message, NewMessage, NewStudyLog, SessionConfig, SessionRun, StudyLogRecord,
    Subject, TimeLeft, User,
};
pub use error::{TrackerError, TrackerResult};
pub use feed::FeedState;
pub use history::{HistorySource, HistorySummary};
pub use ports::{
    Document, DocumentStore, IdentityProvider, PortError, PortResult, Query, Subscription,
    SubscriptionHandle, WishGenerationService,
};
pub use session::StudySession;
pub use timer::{StudyTimer, TimerState};
pub use vocabulary::{LearningStats, ProgressUpdate, Topic, TopicProgress, VocabItem};
