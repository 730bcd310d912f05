use super::DomHandles;
use crate::dom::Element;
use crate::i18n::Catalog;
use crate::state::{ApplicationState, ErrorKind, FormProcessState, FormValidity};

const CLASS_SUCCESS: &str = "text-success";
const CLASS_DANGER: &str = "text-danger";
const CLASS_INVALID: &str = "is-invalid";

/// Render the submit control, input and feedback for the current process state.
pub(super) fn render_process_state(
    handles: &DomHandles,
    catalog: &Catalog,
    state: &ApplicationState,
) {
    let DomHandles {
        input,
        submit,
        feedback,
        ..
    } = handles;

    match state.form_process_state {
        FormProcessState::Loading => {
            submit.set_attribute("disabled", "disabled");
            input.set_attribute("readonly", "true");
        }
        FormProcessState::Idle => {
            submit.remove_attribute("disabled");
            input.remove_attribute("readonly");
            input.remove_class(CLASS_INVALID);
            show_feedback(feedback, CLASS_SUCCESS, &catalog.t("loaded"));
            input.set_attribute("value", "");
        }
        FormProcessState::Failed => {
            submit.remove_attribute("disabled");
            input.remove_attribute("readonly");
            input.add_class(CLASS_INVALID);
            show_feedback(feedback, CLASS_DANGER, &error_message(catalog, state));
        }
    }
}

/// Render the invalid-input marker and, when invalid, the validation message.
pub(super) fn render_validity(handles: &DomHandles, catalog: &Catalog, state: &ApplicationState) {
    match state.form.valid {
        FormValidity::Valid => handles.input.remove_class(CLASS_INVALID),
        FormValidity::Invalid => {
            handles.input.add_class(CLASS_INVALID);
            show_feedback(&handles.feedback, CLASS_DANGER, &error_message(catalog, state));
        }
    }
}

fn error_message(catalog: &Catalog, state: &ApplicationState) -> String {
    let kind = state.form.error_type.unwrap_or(ErrorKind::Unknown);
    catalog.t(&kind.message_key())
}

fn show_feedback(feedback: &Element, class: &str, text: &str) {
    feedback.remove_class(CLASS_SUCCESS);
    feedback.remove_class(CLASS_DANGER);
    feedback.add_class(class);
    feedback.set_text_content(text);
}
