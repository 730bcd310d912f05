use crate::dom::Element;
use crate::i18n::Catalog;

/// The fixed fields of the preview dialog.
#[derive(Clone)]
pub struct ModalHandles {
    pub title: Element,
    pub body: Element,
    pub link: Element,
    pub close: Element,
}

/// Explicit handles to every page region the renderer writes to.
#[derive(Clone)]
pub struct DomHandles {
    pub input: Element,
    pub submit: Element,
    pub feedback: Element,
    pub feeds: Element,
    pub posts: Element,
    pub modal: ModalHandles,
}

/// A complete page skeleton with its region handles.
pub struct Page {
    pub root: Element,
    pub handles: DomHandles,
}

impl Page {
    /// Builds the static layout: form, posts and feeds columns, preview dialog.
    pub fn new() -> Self {
        Self::with_catalog(&Catalog::english())
    }

    pub fn with_catalog(catalog: &Catalog) -> Self {
        let root = Element::with_class("main", "container-fluid");

        let form = Element::with_class("form", "rss-form");
        let input = Element::with_class("input", "form-control");
        input.set_attribute("name", "url");
        input.set_attribute("type", "text");
        input.set_attribute("autocomplete", "off");
        let submit = Element::with_class("button", "btn btn-lg btn-primary");
        submit.set_attribute("type", "submit");
        submit.set_text_content(&catalog.t("submitBtn"));
        let feedback = Element::with_class("p", "feedback m-0 small");
        form.append_child(input.clone());
        form.append_child(submit.clone());
        form.append_child(feedback.clone());
        root.append_child(form);

        let row = Element::with_class("section", "row");
        let posts = Element::with_class("div", "col posts");
        let feeds = Element::with_class("div", "col feeds");
        row.append_child(posts.clone());
        row.append_child(feeds.clone());
        root.append_child(row);

        let dialog = Element::with_class("div", "modal fade");
        dialog.set_attribute("id", "modal");
        let title = Element::with_class("h5", "modal-title");
        let body = Element::with_class("div", "modal-body text-break");
        let link = Element::with_class("a", "btn btn-primary full-article");
        link.set_attribute("target", "_blank");
        link.set_attribute("rel", "noopener noreferrer");
        let close = Element::with_class("button", "btn btn-secondary");
        close.set_attribute("data-dismiss", "modal");
        dialog.append_child(title.clone());
        dialog.append_child(body.clone());
        dialog.append_child(link.clone());
        dialog.append_child(close.clone());
        root.append_child(dialog);

        Self {
            root,
            handles: DomHandles {
                input,
                submit,
                feedback,
                feeds,
                posts,
                modal: ModalHandles {
                    title,
                    body,
                    link,
                    close,
                },
            },
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_point_into_the_page() {
        let page = Page::new();
        let posts = page.root.find_by_class("posts").unwrap();
        assert!(posts.same_node(&page.handles.posts));
        let link = page.root.find_by_class("full-article").unwrap();
        assert!(link.same_node(&page.handles.modal.link));
        assert_eq!(page.handles.submit.text_content(), "Add");
    }
}
