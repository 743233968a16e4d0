//! An abstraction layer for native message dialogs to enable testing.

/// Shows blocking messages to the user.
///
/// Tests substitute a recording implementation so no OS dialog is opened.
pub trait DialogService: Send + Sync {
    /// Reports an unrecoverable startup failure. Returns once dismissed.
    fn show_fatal(&self, title: &str, message: &str);
}

/// The production implementation that uses the `rfd` crate to show native OS dialogs.
pub struct NativeDialogService;

impl DialogService for NativeDialogService {
    fn show_fatal(&self, title: &str, message: &str) {
        let _ = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Error)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}
