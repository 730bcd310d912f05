use super::ModalHandles;
use crate::i18n::Catalog;
use crate::state::ApplicationState;

/// Fill the preview dialog from `state.modal`. An empty modal clears it.
pub(super) fn render(handles: &ModalHandles, catalog: &Catalog, state: &ApplicationState) {
    match &state.modal {
        Some(content) => {
            handles.title.set_text_content(&content.title);
            handles.body.set_text_content(&content.description);
            handles.link.set_attribute("href", &content.link);
        }
        None => {
            handles.title.set_text_content("");
            handles.body.set_text_content("");
            handles.link.remove_attribute("href");
        }
    }
    handles.link.set_text_content(&catalog.t("modalLink"));
    handles.close.set_text_content(&catalog.t("closeBtn"));
}
