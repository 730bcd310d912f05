use crate::dom::{Element, Node};
use crate::i18n::Catalog;
use crate::state::Feed;

/// Rebuild the feeds list from scratch.
pub(super) fn render(container: &Element, catalog: &Catalog, feeds: &[Feed]) {
    let heading = Element::new("h2");
    heading.set_text_content(&catalog.t("feedsTitle"));

    let list = Element::with_class("ul", "list-group mb-5");
    for feed in feeds {
        let item = Element::with_class("li", "list-group-item");
        item.set_attribute("data-id", &feed.id.to_string());

        let title = Element::new("h3");
        title.set_text_content(&feed.title);
        let description = Element::new("p");
        description.set_text_content(&feed.description);

        item.append_child(title);
        item.append_child(description);
        list.append_child(item);
    }

    container.replace_children(vec![Node::from(heading), Node::from(list)]);
}
