use crate::dom::{Element, Node};
use crate::i18n::Catalog;
use crate::state::{ApplicationState, Post};

pub(super) const CLASS_UNREAD: &str = "font-weight-bold";
pub(super) const CLASS_READ: &str = "font-weight-normal";

/// Rebuild the posts list from scratch.
///
/// Row weight is recomputed from `viewed_posts` on every call.
pub(super) fn render(container: &Element, catalog: &Catalog, state: &ApplicationState) {
    let heading = Element::new("h2");
    heading.set_text_content(&catalog.t("postsTitle"));

    let list = Element::with_class("ul", "list-group");
    let preview_label = catalog.t("previewBtn");
    for post in &state.rss_content.posts {
        list.append_child(render_row(post, state.is_viewed(post.id), &preview_label));
    }

    container.replace_children(vec![Node::from(heading), Node::from(list)]);
}

fn render_row(post: &Post, viewed: bool, preview_label: &str) -> Element {
    let id = post.id.to_string();

    let row = Element::with_class(
        "li",
        "list-group-item d-flex justify-content-between align-items-start",
    );

    let link = Element::with_class("a", if viewed { CLASS_READ } else { CLASS_UNREAD });
    link.set_attribute("href", &post.link);
    link.set_attribute("data-id", &id);
    link.set_attribute("target", "_blank");
    link.set_attribute("rel", "noopener noreferrer");
    link.set_text_content(&post.title);

    let preview = Element::with_class("button", "btn btn-primary btn-sm");
    preview.set_attribute("type", "button");
    preview.set_attribute("data-toggle", "modal");
    preview.set_attribute("data-target", "#modal");
    preview.set_attribute("data-id", &id);
    preview.set_text_content(preview_label);

    row.append_child(link);
    row.append_child(preview);
    row
}
