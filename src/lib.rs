//! feedview: an RSS aggregator core.
//!
//! - [`feed`] - Download and parse RSS 2.0 documents
//! - [`state`] - Application state and its observable wrapper
//! - [`view`] - Renders state writes into a [`dom`] page
//! - [`app`] - Controller tying submissions, refreshes and previews together
//! - [`config`], [`i18n`], [`util`] - Configuration, message catalog, URL checks

pub mod app;
pub mod config;
pub mod dom;
pub mod feed;
pub mod i18n;
pub mod state;
pub mod util;
pub mod view;
