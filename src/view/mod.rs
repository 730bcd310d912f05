//! State-driven rendering into the document tree.
//!
//! [`ViewRenderer::attach`] wraps an [`ApplicationState`] in an
//! [`ObservedState`] and registers itself as a listener. From then on every
//! write made through the returned handle re-renders the matching region of
//! the page, synchronously and once per write.
//!
//! # Module Structure
//!
//! - `page` - Page scaffold and the explicit region handles
//! - `form` - Submit control, input and feedback text
//! - `feeds` - Feeds list
//! - `posts` - Posts list
//! - `modal` - Preview dialog

mod feeds;
mod form;
mod modal;
mod page;
mod posts;

pub use page::{DomHandles, ModalHandles, Page};

use crate::i18n::Catalog;
use crate::state::{ApplicationState, ObservedState, StatePath};

/// A region of the page that is redrawn as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    ProcessState,
    Validity,
    Posts,
    Feeds,
    Modal,
}

impl RenderTarget {
    /// The region a write to `path` invalidates, if any.
    ///
    /// Paths the view does not display map to `None` and are ignored.
    pub fn for_path(path: StatePath) -> Option<Self> {
        match path {
            StatePath::FormProcessState => Some(Self::ProcessState),
            StatePath::FormValid => Some(Self::Validity),
            StatePath::RssPosts => Some(Self::Posts),
            StatePath::RssFeeds => Some(Self::Feeds),
            // Read marks change the styling of every row, so the whole list is rebuilt.
            StatePath::ViewedPosts => Some(Self::Posts),
            StatePath::Modal => Some(Self::Modal),
            StatePath::FormErrorType | StatePath::FormValue => None,
        }
    }
}

/// Renders state into the regions named by a [`DomHandles`].
pub struct ViewRenderer {
    handles: DomHandles,
    catalog: Catalog,
}

impl ViewRenderer {
    pub fn new(handles: DomHandles, catalog: Catalog) -> Self {
        Self { handles, catalog }
    }

    /// Wraps `state` and returns the handle all mutations must go through.
    pub fn attach(state: ApplicationState, handles: DomHandles, catalog: Catalog) -> ObservedState {
        let renderer = Self::new(handles, catalog);
        let mut observed = ObservedState::new(state);
        observed.subscribe(move |path, state| renderer.dispatch(path, state));
        observed
    }

    pub fn dispatch(&self, path: StatePath, state: &ApplicationState) {
        match RenderTarget::for_path(path) {
            Some(target) => {
                tracing::debug!(path = %path, target = ?target, "Rendering");
                self.render(target, state);
            }
            None => tracing::trace!(path = %path, "No view bound to path"),
        }
    }

    pub fn render(&self, target: RenderTarget, state: &ApplicationState) {
        match target {
            RenderTarget::ProcessState => {
                form::render_process_state(&self.handles, &self.catalog, state)
            }
            RenderTarget::Validity => form::render_validity(&self.handles, &self.catalog, state),
            RenderTarget::Posts => posts::render(&self.handles.posts, &self.catalog, state),
            RenderTarget::Feeds => {
                feeds::render(&self.handles.feeds, &self.catalog, &state.rss_content.feeds)
            }
            RenderTarget::Modal => modal::render(&self.handles.modal, &self.catalog, state),
        }
    }
}
