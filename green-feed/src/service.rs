use async_trait::async_trait;
use green_post::{CommentRequest, Post, PostCreate, PostId, PostUpdate, ReactionKind, UserId};
use log::warn;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Failure reported by the remote community api.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{message}")]
    Service {
        code: Option<String>,
        message: String,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Network(String),
    #[error("Unknown error")]
    Unknown,
}

impl ServiceError {
    /// The message carried by the failure, if it has a non-blank one.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            ServiceError::Service { message, .. } => message.as_str(),
            ServiceError::Unauthorized(message) => message.as_str(),
            ServiceError::Network(message) => message.as_str(),
            ServiceError::Unknown => return None,
        };
        if message.trim().is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

#[async_trait]
pub trait CommunityService: Send + Sync {
    async fn list_posts(&self, skip: usize, limit: usize) -> Result<Vec<Post>, ServiceError>;

    async fn list_user_posts(
        &self,
        user_id: &UserId,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Post>, ServiceError>;

    async fn get_post(&self, post_id: &PostId) -> Result<Post, ServiceError>;

    async fn create_post(&self, post: &PostCreate) -> Result<Post, ServiceError>;

    async fn update_post(&self, post_id: &PostId, update: &PostUpdate)
        -> Result<Post, ServiceError>;

    async fn delete_post(&self, post_id: &PostId) -> Result<(), ServiceError>;

    async fn add_reaction(
        &self,
        post_id: &PostId,
        reaction_type: ReactionKind,
    ) -> Result<Post, ServiceError>;

    async fn remove_reaction(&self, post_id: &PostId) -> Result<Post, ServiceError>;

    async fn add_comment(
        &self,
        post_id: &PostId,
        comment: &CommentRequest,
    ) -> Result<Post, ServiceError>;
}

/// Blocking, user-facing notification owned by the host.
pub trait Notify: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier for hosts without a dialog surface.
pub struct LogNotify;

impl Notify for LogNotify {
    fn notify(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Handles to the remote collaborators, passed to whatever needs them.
#[derive(Clone)]
pub struct Services {
    pub community: Arc<dyn CommunityService>,
    pub notify: Arc<dyn Notify>,
}

impl Services {
    pub fn new(community: Arc<dyn CommunityService>) -> Self {
        Self {
            community,
            notify: Arc::new(LogNotify),
        }
    }

    pub fn with_notify(mut self, notify: Arc<dyn Notify>) -> Self {
        self.notify = notify;
        self
    }
}
