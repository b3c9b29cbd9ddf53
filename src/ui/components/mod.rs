mod confirm_dialog;
mod input;
mod key_result;
mod search_input;
mod teacher_form;
mod toast;

pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use teacher_form::{FormEvent, FormMode, TeacherFormModal};
pub use toast::Toasts;
