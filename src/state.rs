//! Application state and the observable wrapper that reports every write.
//!
//! [`ApplicationState`] is plain data. All mutation goes through the setter
//! methods of [`ObservedState`], each of which writes exactly one
//! [`StatePath`] and then synchronously notifies every registered listener
//! with that path. Listeners receive a shared borrow of the state, so a render
//! action cannot write back into the state it is rendering.

use crate::feed::FeedItem;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identity of a post, assigned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a subscribed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedId(pub u64);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Form
// ============================================================================

/// Lifecycle of a feed submission.
///
/// `Idle → Loading → {Idle, Failed}`, and `Failed → Loading` on retry. The
/// controller drives every transition; the view only reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormProcessState {
    #[default]
    Idle,
    Loading,
    Failed,
}

/// A process state name that is not one of `idle`, `loading`, `failed`.
///
/// This indicates a programming error in whatever produced the name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown formProcessState: {0}")]
pub struct UnknownProcessState(pub String);

impl FromStr for FormProcessState {
    type Err = UnknownProcessState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "loading" => Ok(Self::Loading),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownProcessState(other.to_string())),
        }
    }
}

impl FormProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormValidity {
    #[default]
    Valid,
    Invalid,
}

/// Why the last submission was rejected. Each kind has a catalog entry under
/// `errorMessages.<key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    InvalidUrl,
    Duplicate,
    NetworkError,
    ParsingError,
    MalformedFeed,
    Unknown,
}

impl ErrorKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::InvalidUrl => "invalidUrl",
            Self::Duplicate => "duplicate",
            Self::NetworkError => "networkError",
            Self::ParsingError => "parsingError",
            Self::MalformedFeed => "malformedFeed",
            Self::Unknown => "unknown",
        }
    }

    /// Full catalog key for this error's message.
    pub fn message_key(self) -> String {
        format!("errorMessages.{}", self.key())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Form {
    pub valid: FormValidity,
    pub error_type: Option<ErrorKind>,
    /// Current contents of the URL input.
    pub value: String,
}

// ============================================================================
// Content
// ============================================================================

/// Summary of a subscribed feed, as shown in the feeds list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: FeedId,
    pub url: String,
    pub title: String,
    pub description: String,
}

/// A feed item with the identity the view uses for previews and read marks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub feed_id: FeedId,
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Post {
    pub fn from_item(id: PostId, feed_id: FeedId, item: FeedItem) -> Self {
        Self {
            id,
            feed_id,
            title: item.item_title,
            link: item.item_link,
            description: item.item_description,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RssContent {
    pub feeds: Vec<Feed>,
    pub posts: Vec<Post>,
}

/// Contents of the preview dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalContent {
    pub title: String,
    pub description: String,
    pub link: String,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationState {
    pub form_process_state: FormProcessState,
    pub form: Form,
    pub rss_content: RssContent,
    pub viewed_posts: BTreeSet<PostId>,
    pub modal: Option<ModalContent>,
}

impl ApplicationState {
    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.rss_content.posts.iter().find(|p| p.id == id)
    }

    pub fn is_viewed(&self, id: PostId) -> bool {
        self.viewed_posts.contains(&id)
    }
}

// ============================================================================
// Observation
// ============================================================================

/// Identifies the state field written by a setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatePath {
    FormProcessState,
    FormValid,
    FormErrorType,
    FormValue,
    RssFeeds,
    RssPosts,
    ViewedPosts,
    Modal,
}

impl StatePath {
    /// Dotted name of the field, as used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FormProcessState => "formProcessState",
            Self::FormValid => "form.valid",
            Self::FormErrorType => "form.errorType",
            Self::FormValue => "form.value",
            Self::RssFeeds => "rssContent.feeds",
            Self::RssPosts => "rssContent.posts",
            Self::ViewedPosts => "viewedPosts",
            Self::Modal => "modal",
        }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Listener = Box<dyn FnMut(StatePath, &ApplicationState)>;

/// Application state plus the listeners that observe it.
pub struct ObservedState {
    state: ApplicationState,
    listeners: Vec<Listener>,
}

impl ObservedState {
    pub fn new(state: ApplicationState) -> Self {
        Self {
            state,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener called after every write, in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(StatePath, &ApplicationState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    fn notify(&mut self, path: StatePath) {
        tracing::trace!(path = %path, listeners = self.listeners.len(), "State changed");
        for listener in self.listeners.iter_mut() {
            listener(path, &self.state);
        }
    }

    pub fn set_form_process_state(&mut self, value: FormProcessState) {
        self.state.form_process_state = value;
        self.notify(StatePath::FormProcessState);
    }

    pub fn set_form_validity(&mut self, value: FormValidity) {
        self.state.form.valid = value;
        self.notify(StatePath::FormValid);
    }

    pub fn set_form_error(&mut self, value: Option<ErrorKind>) {
        self.state.form.error_type = value;
        self.notify(StatePath::FormErrorType);
    }

    pub fn set_form_value(&mut self, value: impl Into<String>) {
        self.state.form.value = value.into();
        self.notify(StatePath::FormValue);
    }

    pub fn push_feed(&mut self, feed: Feed) {
        self.state.rss_content.feeds.push(feed);
        self.notify(StatePath::RssFeeds);
    }

    /// Inserts `posts` ahead of the existing ones, keeping their relative order.
    pub fn prepend_posts(&mut self, posts: Vec<Post>) {
        let existing = std::mem::take(&mut self.state.rss_content.posts);
        let mut merged = posts;
        merged.extend(existing);
        self.state.rss_content.posts = merged;
        self.notify(StatePath::RssPosts);
    }

    pub fn set_posts(&mut self, posts: Vec<Post>) {
        self.state.rss_content.posts = posts;
        self.notify(StatePath::RssPosts);
    }

    /// Adds `id` to the viewed set.
    ///
    /// Returns `false` without writing anything if no post with that id is
    /// present. Marking an already viewed post still counts as a write.
    pub fn mark_viewed(&mut self, id: PostId) -> bool {
        if self.state.post(id).is_none() {
            tracing::warn!(post_id = %id, "Ignoring viewed mark for unknown post");
            return false;
        }
        self.state.viewed_posts.insert(id);
        self.notify(StatePath::ViewedPosts);
        true
    }

    pub fn set_modal(&mut self, value: Option<ModalContent>) {
        self.state.modal = value;
        self.notify(StatePath::Modal);
    }
}

impl fmt::Debug for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedState")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
