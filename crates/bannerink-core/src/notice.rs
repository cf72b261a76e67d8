//! User-visible, dismissible notices.
//!
//! Component-level failures end up here instead of aborting the session.
//! Each notice is tagged with the operation that failed so an export error
//! is never confused with a load error.

use std::fmt;

/// Which operation produced a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// An image could not be fetched or decoded.
    Load,
    Export,
    /// The drawing surface is unavailable.
    Surface,
    Validation,
    Storage,
}

impl NoticeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NoticeKind::Load => "Image load failed",
            NoticeKind::Export => "Export failed",
            NoticeKind::Surface => "Canvas unavailable",
            NoticeKind::Validation => "Invalid project",
            NoticeKind::Storage => "Save failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub kind: NoticeKind,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

/// Active notices in the order they were raised.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
    next_id: u64,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a notice and log it.
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> NoticeId {
        self.next_id += 1;
        let notice = Notice {
            id: NoticeId(self.next_id),
            kind,
            message: message.into(),
        };
        log::warn!("{notice}");
        let id = notice.id;
        self.notices.push(notice);
        id
    }

    /// Dismiss a notice. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }

    pub fn of_kind(&self, kind: NoticeKind) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |notice| notice.kind == kind)
    }

    /// Dismiss every notice of one kind.
    pub fn clear_kind(&mut self, kind: NoticeKind) {
        self.notices.retain(|notice| notice.kind != kind);
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
