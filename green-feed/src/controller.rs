use green_post::{CommentRequest, Post, PostCreate, PostId, PostUpdate, ReactionKind, UserId};
use log::{debug, trace, warn};
use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::Mutex;

use crate::{FeedConfig, ServiceError, Services};

const LOAD_POSTS_FAILED: &str = "Failed to load posts";
const CREATE_POST_FAILED: &str = "Failed to create post";
const UPDATE_POST_FAILED: &str = "Failed to update post";
const RELOAD_POST_FAILED: &str = "Failed to reload post";
const ADD_REACTION_FAILED: &str = "Failed to add reaction";
const REMOVE_REACTION_FAILED: &str = "Failed to remove reaction";
const ADD_COMMENT_FAILED: &str = "Failed to add comment";
const DELETE_POST_FAILED: &str = "Failed to delete post";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    LoadingInitial,
    LoadingMore,
    Refreshing,
}

/// Which remote list the controller pages through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedScope {
    All,
    User(UserId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub skip: usize,
    pub has_more: bool,
    pub status: FeedStatus,
    pub error: Option<String>,
}

#[derive(Debug)]
struct FeedState {
    posts: Vec<Post>,
    skip: usize,
    has_more: bool,
    status: FeedStatus,
    error: Option<String>,
    loaded_once: bool,
    next_seq: u64,
    applied_seq: HashMap<PostId, u64>,
}

impl FeedState {
    fn new() -> Self {
        Self {
            posts: Vec::new(),
            skip: 0,
            has_more: true,
            status: FeedStatus::Idle,
            error: None,
            loaded_once: false,
            next_seq: 0,
            applied_seq: HashMap::new(),
        }
    }

    fn issue_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // a response is applied only if nothing issued later for the same post already was
    fn accept(&mut self, post_id: &PostId, seq: u64) -> bool {
        let applied = self.applied_seq.entry(post_id.clone()).or_insert(0);
        if seq > *applied {
            *applied = seq;
            true
        } else {
            false
        }
    }

    fn replace_post(&mut self, post_id: &PostId, updated: Post) {
        for post in self.posts.iter_mut().filter(|post| post.id == *post_id) {
            *post = updated.clone();
        }
    }
}

/// Paginated, in-memory view over the remote post list.
///
/// Writes go to the remote service first; the local list only changes once
/// the authoritative post comes back, by replacing the entry with the same id.
/// The state lock is never held across a remote call, so independent
/// operations run concurrently. Nothing guards against two concurrent
/// `load_posts(false)` calls requesting the same page.
#[derive(Clone)]
pub struct FeedController {
    state: Arc<Mutex<FeedState>>,
    services: Services,
    config: FeedConfig,
    scope: FeedScope,
}

impl FeedController {
    pub fn new(services: Services, config: FeedConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState::new())),
            services,
            config,
            scope: FeedScope::All,
        }
    }

    pub fn with_scope(mut self, scope: FeedScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    // state

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;
        FeedSnapshot {
            posts: state.posts.clone(),
            skip: state.skip,
            has_more: state.has_more,
            status: state.status,
            error: state.error.clone(),
        }
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.lock().await.posts.clone()
    }

    pub async fn post(&self, post_id: &PostId) -> Option<Post> {
        let state = self.state.lock().await;
        state.posts.iter().find(|post| post.id == *post_id).cloned()
    }

    pub async fn status(&self) -> FeedStatus {
        self.state.lock().await.status
    }

    pub async fn loading(&self) -> bool {
        matches!(
            self.status().await,
            FeedStatus::LoadingInitial | FeedStatus::LoadingMore
        )
    }

    pub async fn refreshing(&self) -> bool {
        self.status().await == FeedStatus::Refreshing
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    // operations

    pub async fn load_posts(&self, refresh: bool) {
        let page_size = self.config.page_size();
        let skip = {
            let mut state = self.state.lock().await;
            state.status = if refresh {
                FeedStatus::Refreshing
            } else if state.loaded_once {
                FeedStatus::LoadingMore
            } else {
                FeedStatus::LoadingInitial
            };
            state.error = None;
            if refresh {
                0
            } else {
                state.skip
            }
        };

        trace!("Requesting page at {} (refresh: {})", skip, refresh);
        let result = match &self.scope {
            FeedScope::All => self.services.community.list_posts(skip, page_size).await,
            FeedScope::User(user_id) => {
                self.services
                    .community
                    .list_user_posts(user_id, skip, page_size)
                    .await
            }
        };

        let mut state = self.state.lock().await;
        state.status = FeedStatus::Idle;
        match result {
            Ok(page) => {
                debug!("Loaded {} posts at {}", page.len(), skip);
                state.has_more = page.len() == page_size;
                if refresh {
                    state.posts = page;
                } else {
                    state.posts.extend(page);
                }
                state.skip = skip + page_size;
                state.loaded_once = true;
            }
            Err(err) => {
                drop(state);
                self.fail(err, LOAD_POSTS_FAILED).await;
            }
        }
    }

    pub async fn refresh_posts(&self) {
        self.load_posts(true).await
    }

    /// Returns whether the post was created. The created post is put at the head.
    pub async fn create_post(&self, post: PostCreate) -> bool {
        self.clear_error().await;

        match self.services.community.create_post(&post).await {
            Ok(created) => {
                debug!("Created post {}", created.id);
                self.state.lock().await.posts.insert(0, created);
                true
            }
            Err(err) => {
                self.fail(err, CREATE_POST_FAILED).await;
                false
            }
        }
    }

    pub async fn update_post(&self, post_id: &PostId, update: PostUpdate) {
        let request = self.services.community.update_post(post_id, &update);
        self.reconcile(post_id, request, UPDATE_POST_FAILED).await
    }

    /// Re-fetches a single post and replaces the local copy.
    pub async fn reload_post(&self, post_id: &PostId) {
        let request = self.services.community.get_post(post_id);
        self.reconcile(post_id, request, RELOAD_POST_FAILED).await
    }

    pub async fn add_reaction(&self, post_id: &PostId, reaction_type: ReactionKind) {
        let request = self.services.community.add_reaction(post_id, reaction_type);
        self.reconcile(post_id, request, ADD_REACTION_FAILED).await
    }

    pub async fn remove_reaction(&self, post_id: &PostId) {
        let request = self.services.community.remove_reaction(post_id);
        self.reconcile(post_id, request, REMOVE_REACTION_FAILED).await
    }

    pub async fn add_comment(&self, post_id: &PostId, content: &str) {
        let comment = CommentRequest {
            content: content.to_string(),
        };
        let request = self.services.community.add_comment(post_id, &comment);
        self.reconcile(post_id, request, ADD_COMMENT_FAILED).await
    }

    pub async fn delete_post(&self, post_id: &PostId) {
        let seq = self.begin_mutation().await;

        match self.services.community.delete_post(post_id).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                if state.accept(post_id, seq) {
                    debug!("Deleted post {}", post_id);
                    state.posts.retain(|post| post.id != *post_id);
                    state.applied_seq.remove(post_id);
                }
            }
            Err(err) => self.fail(err, DELETE_POST_FAILED).await,
        }
    }

    // helpers

    async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    async fn begin_mutation(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.error = None;
        state.issue_seq()
    }

    async fn reconcile<F>(&self, post_id: &PostId, request: F, fallback: &str)
    where
        F: Future<Output = Result<Post, ServiceError>>,
    {
        // the request future is lazy, so the sequence is taken before it is sent
        let seq = self.begin_mutation().await;

        match request.await {
            Ok(updated) => {
                let mut state = self.state.lock().await;
                if state.accept(post_id, seq) {
                    state.replace_post(post_id, updated);
                } else {
                    debug!("Dropping stale response {} for post {}", seq, post_id);
                }
            }
            Err(err) => self.fail(err, fallback).await,
        }
    }

    async fn fail(&self, err: ServiceError, fallback: &str) {
        let message = err.message().unwrap_or(fallback).to_string();
        warn!("{}: {:?}", fallback, err);
        self.state.lock().await.error = Some(message.clone());
        self.services.notify.notify(&message);
    }
}
