//! The controller: owns the observed state and turns user actions and network
//! results into state writes.
//!
//! Every write goes through [`ObservedState`], so the page follows along
//! without the controller touching the document. The controller is the only
//! place that assigns feed and post ids.

use crate::config::Config;
use crate::dom::Element;
use crate::feed::{parse_feed, FeedDocument, FeedError, FeedItem, FetchError, Fetcher};
use crate::i18n::Catalog;
use crate::state::{
    ApplicationState, ErrorKind, Feed, FeedId, FormProcessState, FormValidity, ModalContent,
    ObservedState, Post, PostId,
};
use crate::util::{validate_feed_url, UrlValidationError};
use crate::view::{DomHandles, ViewRenderer};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use thiserror::Error;

/// Feeds fetched at once during a refresh round.
const MAX_CONCURRENT_REFRESHES: usize = 4;

/// Why a submission did not produce a feed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Rejected feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    #[error("Feed already added: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl SubmitError {
    /// The catalog error key shown to the user.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(UrlValidationError::Empty) => ErrorKind::Required,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::Fetch(_) => ErrorKind::NetworkError,
            Self::Feed(FeedError::Parse { .. }) => ErrorKind::ParsingError,
            Self::Feed(FeedError::MalformedFeed { .. }) => ErrorKind::MalformedFeed,
        }
    }
}

pub struct Controller {
    state: ObservedState,
    fetcher: Fetcher,
    allow_private_hosts: bool,
    next_feed_id: u64,
    next_post_id: u64,
}

impl Controller {
    /// Creates a controller whose state renders into `handles`.
    pub fn new(config: &Config, handles: DomHandles, catalog: Catalog) -> Result<Self, FetchError> {
        let state = ViewRenderer::attach(ApplicationState::default(), handles, catalog);
        Ok(Self::with_state(state, Fetcher::new(config)?, config))
    }

    pub fn with_state(state: ObservedState, fetcher: Fetcher, config: &Config) -> Self {
        Self {
            state,
            fetcher,
            allow_private_hosts: config.allow_private_hosts,
            next_feed_id: 1,
            next_post_id: 1,
        }
    }

    pub fn state(&self) -> &ApplicationState {
        self.state.state()
    }

    /// Validates `input`, downloads the feed and adds it with its posts.
    ///
    /// Validation failures mark the form invalid and never enter `Loading`.
    /// Download and parse failures end in `Failed`. Success ends in `Idle`.
    pub async fn submit(&mut self, input: &str) -> Result<FeedId, SubmitError> {
        self.state.set_form_value(input);

        let url = match self.validate(input) {
            Ok(url) => url,
            Err(e) => {
                tracing::info!(input = %input, error = %e, "Feed URL rejected");
                self.state.set_form_error(Some(e.kind()));
                self.state.set_form_validity(FormValidity::Invalid);
                return Err(e);
            }
        };

        self.state.set_form_error(None);
        self.state.set_form_validity(FormValidity::Valid);
        self.state.set_form_process_state(FormProcessState::Loading);

        match load(&self.fetcher, &url).await {
            Ok(document) => {
                let feed_id = self.add_feed(url, document);
                self.state.set_form_value("");
                self.state.set_form_process_state(FormProcessState::Idle);
                Ok(feed_id)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to load feed");
                self.state.set_form_error(Some(e.kind()));
                self.state.set_form_process_state(FormProcessState::Failed);
                Err(e)
            }
        }
    }

    /// Re-downloads every subscribed feed and adds posts whose link is new for
    /// that feed. Returns the number of posts added.
    ///
    /// Failures are logged and skipped; they do not touch the form state.
    pub async fn refresh(&mut self) -> usize {
        let targets: Vec<(FeedId, String)> = self
            .state()
            .rss_content
            .feeds
            .iter()
            .map(|feed| (feed.id, feed.url.clone()))
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let fetcher = &self.fetcher;
        let results: Vec<(FeedId, String, Result<FeedDocument, SubmitError>)> =
            stream::iter(targets)
                .map(|(feed_id, url)| async move {
                    let result = load(fetcher, &url).await;
                    (feed_id, url, result)
                })
                .buffered(MAX_CONCURRENT_REFRESHES)
                .collect()
                .await;

        let mut fresh: Vec<(FeedId, FeedItem)> = Vec::new();
        for (feed_id, url, result) in results {
            match result {
                Ok(document) => {
                    let known: HashSet<&str> = self
                        .state()
                        .rss_content
                        .posts
                        .iter()
                        .filter(|post| post.feed_id == feed_id)
                        .map(|post| post.link.as_str())
                        .collect();
                    fresh.extend(
                        document
                            .items
                            .into_iter()
                            .filter(|item| !known.contains(item.item_link.as_str()))
                            .map(|item| (feed_id, item)),
                    );
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "Refresh failed"),
            }
        }

        let added = fresh.len();
        if added > 0 {
            let posts = fresh
                .into_iter()
                .map(|(feed_id, item)| Post::from_item(self.allocate_post_id(), feed_id, item))
                .collect();
            self.state.prepend_posts(posts);
        }
        tracing::debug!(added = added, "Refresh round complete");
        added
    }

    /// Shows `id` in the preview dialog and marks it viewed.
    pub fn preview(&mut self, id: PostId) -> bool {
        let Some(post) = self.state().post(id).cloned() else {
            tracing::warn!(post_id = %id, "Preview requested for unknown post");
            return false;
        };
        self.state.set_modal(Some(ModalContent {
            title: post.title,
            description: post.description,
            link: post.link,
        }));
        self.state.mark_viewed(id)
    }

    /// Marks `id` viewed without opening the preview, as when the link itself
    /// is followed.
    pub fn mark_viewed(&mut self, id: PostId) -> bool {
        self.state.mark_viewed(id)
    }

    pub fn close_preview(&mut self) {
        self.state.set_modal(None);
    }

    /// Resolves a `data-id` attribute on a rendered row control to its post.
    pub fn post_for_control(&self, control: &Element) -> Option<PostId> {
        let id = control.attribute("data-id")?.parse().ok()?;
        self.state().post(PostId(id)).map(|post| post.id)
    }

    fn validate(&self, input: &str) -> Result<String, SubmitError> {
        let url = validate_feed_url(input, self.allow_private_hosts)?.to_string();
        if self.state().rss_content.feeds.iter().any(|feed| feed.url == url) {
            return Err(SubmitError::Duplicate(url));
        }
        Ok(url)
    }

    fn add_feed(&mut self, url: String, document: FeedDocument) -> FeedId {
        let feed_id = FeedId(self.next_feed_id);
        self.next_feed_id += 1;

        let FeedDocument {
            title,
            description,
            items,
        } = document;
        let count = items.len();

        self.state.push_feed(Feed {
            id: feed_id,
            url: url.clone(),
            title,
            description,
        });
        let posts = items
            .into_iter()
            .map(|item| Post::from_item(self.allocate_post_id(), feed_id, item))
            .collect();
        self.state.prepend_posts(posts);

        tracing::info!(feed_id = %feed_id, url = %url, posts = count, "Feed added");
        feed_id
    }

    fn allocate_post_id(&mut self) -> PostId {
        let id = PostId(self.next_post_id);
        self.next_post_id += 1;
        id
    }
}

async fn load(fetcher: &Fetcher, url: &str) -> Result<FeedDocument, SubmitError> {
    let text = fetcher.fetch_text(url).await?;
    Ok(parse_feed(&text)?)
}
