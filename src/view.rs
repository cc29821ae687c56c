//! The page surface the listing workflow drives.
//!
//! `ListingView` is everything the workflow needs from the page: notices,
//! field markers, the price display, the loading overlay, the submit button,
//! the gallery, the full-size viewer, the console test helper and navigation.
//! [`RecordingView`] keeps every call for assertions.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::domain::form::FormField;

/// Kind of transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient, auto-dismissing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    /// How long the page should keep it visible
    pub duration_ms: u64,
}

/// One gallery entry as rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Position in the gallery; pass to `remove_image`/`view_image`
    pub index: usize,
    pub src: String,
}

/// Appearance of the submit button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitControl {
    Ready,
    Busy,
}

impl SubmitControl {
    pub fn label(self) -> &'static str {
        match self {
            SubmitControl::Ready => "List Account",
            SubmitControl::Busy => "Submitting...",
        }
    }

    pub fn enabled(self) -> bool {
        matches!(self, SubmitControl::Ready)
    }
}

/// Page surface driven by [`crate::page::ListingPage`].
pub trait ListingView: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Mark or unmark a field as invalid.
    fn set_field_invalid(&self, field: FormField, invalid: bool);

    /// Show an estimate, or clear the display with `None`.
    fn set_price(&self, price: Option<i64>);

    fn set_loading(&self, visible: bool);

    fn set_submit_control(&self, control: SubmitControl);

    /// Clear every input of the form.
    fn reset_form(&self);

    fn render_gallery(&self, thumbnails: &[Thumbnail]);

    fn open_viewer(&self, src: &str);

    fn show_console_helper(&self);

    fn set_console_helper_enabled(&self, enabled: bool);

    fn remove_console_helper(&self);

    fn navigate(&self, path: &str);
}

/// Everything a [`RecordingView`] was told, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Notice(Notice),
    FieldInvalid(FormField, bool),
    Price(Option<i64>),
    Loading(bool),
    SubmitControl(SubmitControl),
    ResetForm,
    Gallery(Vec<Thumbnail>),
    Viewer(String),
    ConsoleHelperShown,
    ConsoleHelperEnabled(bool),
    ConsoleHelperRemoved,
    Navigate(String),
}

/// View that records calls instead of drawing anything.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Notice(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_notice(&self) -> Option<Notice> {
        self.notices().pop()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Navigate(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recently rendered gallery.
    pub fn gallery(&self) -> Vec<Thumbnail> {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::Gallery(thumbs) => Some(thumbs.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn gallery_renders(&self) -> usize {
        self.count(|event| matches!(event, ViewEvent::Gallery(_)))
    }

    /// Fields currently marked invalid.
    pub fn invalid_fields(&self) -> HashSet<FormField> {
        let mut invalid = HashSet::new();
        for event in self.events.lock().iter() {
            if let ViewEvent::FieldInvalid(field, flag) = event {
                if *flag {
                    invalid.insert(*field);
                } else {
                    invalid.remove(field);
                }
            }
        }
        invalid
    }

    /// Current price display.
    pub fn price(&self) -> Option<i64> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ViewEvent::Price(price) => Some(*price),
            _ => None,
        })?
    }

    pub fn loading(&self) -> bool {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::Loading(visible) => Some(*visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn submit_control(&self) -> SubmitControl {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::SubmitControl(control) => Some(*control),
                _ => None,
            })
            .unwrap_or(SubmitControl::Ready)
    }

    pub fn console_helper_shown(&self) -> usize {
        self.count(|event| matches!(event, ViewEvent::ConsoleHelperShown))
    }

    pub fn console_helper_present(&self) -> bool {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::ConsoleHelperShown => Some(true),
                ViewEvent::ConsoleHelperRemoved => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn count(&self, predicate: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().push(event);
    }
}

impl ListingView for RecordingView {
    fn notify(&self, notice: Notice) {
        self.push(ViewEvent::Notice(notice));
    }

    fn set_field_invalid(&self, field: FormField, invalid: bool) {
        self.push(ViewEvent::FieldInvalid(field, invalid));
    }

    fn set_price(&self, price: Option<i64>) {
        self.push(ViewEvent::Price(price));
    }

    fn set_loading(&self, visible: bool) {
        self.push(ViewEvent::Loading(visible));
    }

    fn set_submit_control(&self, control: SubmitControl) {
        self.push(ViewEvent::SubmitControl(control));
    }

    fn reset_form(&self) {
        self.push(ViewEvent::ResetForm);
    }

    fn render_gallery(&self, thumbnails: &[Thumbnail]) {
        self.push(ViewEvent::Gallery(thumbnails.to_vec()));
    }

    fn open_viewer(&self, src: &str) {
        self.push(ViewEvent::Viewer(src.to_string()));
    }

    fn show_console_helper(&self) {
        self.push(ViewEvent::ConsoleHelperShown);
    }

    fn set_console_helper_enabled(&self, enabled: bool) {
        self.push(ViewEvent::ConsoleHelperEnabled(enabled));
    }

    fn remove_console_helper(&self) {
        self.push(ViewEvent::ConsoleHelperRemoved);
    }

    fn navigate(&self, path: &str) {
        self.push(ViewEvent::Navigate(path.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::StatField;

    #[test]
    fn test_invalid_fields_follow_latest_marking() {
        let view = RecordingView::new();
        let level = FormField::Stat(StatField::Level);
        view.set_field_invalid(FormField::Uid, true);
        view.set_field_invalid(level, true);
        view.set_field_invalid(FormField::Uid, false);

        let invalid = view.invalid_fields();
        assert!(!invalid.contains(&FormField::Uid));
        assert!(invalid.contains(&level));
    }

    #[test]
    fn test_price_display_tracks_last_value() {
        let view = RecordingView::new();
        assert_eq!(view.price(), None);
        view.set_price(Some(800));
        assert_eq!(view.price(), Some(800));
        view.set_price(None);
        assert_eq!(view.price(), None);
    }

    #[test]
    fn test_submit_control_labels() {
        assert_eq!(SubmitControl::Busy.label(), "Submitting...");
        assert!(!SubmitControl::Busy.enabled());
        assert!(SubmitControl::Ready.enabled());
    }
}
