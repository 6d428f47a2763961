//! Staged profile edits for the expanded user row.
//!
//! Requests are performed by the caller; this type decides what to send and
//! how the staged state moves once the server has answered. Staged values only
//! change after a confirmed success.

use roster_shared::{
    api::{ProfileUpdateRequest, PublicProfileResponse},
    FollowStats, BIO_MAX_CHARS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaField {
    Avatar,
    Banner,
}

impl MediaField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Avatar => "Avatar",
            Self::Banner => "Banner",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Request currently waiting for an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Save,
    Upload(MediaField),
    Remove(MediaField),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Snapshot {
    bio: String,
    avatar_url: Option<String>,
    banner_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileEditor {
    pub user_id: i64,
    pub load: LoadState,
    pub username: String,
    pub class: Option<String>,
    pub stats: Option<FollowStats>,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub status: Option<String>,
    pending: Option<Pending>,
    saved: Snapshot,
}

const BUSY_MESSAGE: &str = "Please wait for the current request to finish.";

impl ProfileEditor {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            load: LoadState::Loading,
            username: String::new(),
            class: None,
            stats: None,
            bio: String::new(),
            avatar_url: None,
            banner_url: None,
            status: None,
            pending: None,
            saved: Snapshot::default(),
        }
    }

    pub fn on_loaded(&mut self, profile: PublicProfileResponse) {
        let user = profile.user;
        self.username = user.username;
        self.class = user.class;
        self.stats = profile.stats;
        self.bio = user.bio.unwrap_or_default();
        self.avatar_url = user.avatar_url;
        self.banner_url = user.banner_url;
        self.saved = self.snapshot();
        self.load = LoadState::Ready;
    }

    pub fn on_load_failed(&mut self, message: String) {
        self.load = LoadState::Failed(message);
    }

    pub fn is_ready(&self) -> bool {
        self.load == LoadState::Ready
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// True when staged values differ from what the server last confirmed.
    pub fn is_dirty(&self) -> bool {
        self.snapshot() != self.saved
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            banner_url: self.banner_url.clone(),
        }
    }

    /// Claims the editor for one request. Refuses while another is pending.
    fn begin(&mut self, pending: Pending) -> bool {
        if !self.is_ready() {
            return false;
        }
        if self.pending.is_some() {
            self.status = Some(BUSY_MESSAGE.to_string());
            return false;
        }
        self.pending = Some(pending);
        true
    }

    pub fn set_bio(&mut self, bio: String) {
        self.bio = bio;
    }

    /// Full staged tuple for a save, or `None` when the save must not be sent.
    pub fn save_request(&mut self) -> Option<ProfileUpdateRequest> {
        if self.bio.chars().count() > BIO_MAX_CHARS {
            self.status = Some(format!(
                "Bio is too long (max {} characters)",
                BIO_MAX_CHARS
            ));
            return None;
        }
        if !self.begin(Pending::Save) {
            return None;
        }

        Some(ProfileUpdateRequest {
            user_id: self.user_id,
            bio: Some(Some(self.bio.clone())),
            avatar_url: Some(self.avatar_url.clone()),
            banner_url: Some(self.banner_url.clone()),
        })
    }

    pub fn finish_save(&mut self, result: Result<(), Option<String>>) {
        self.pending = None;
        match result {
            Ok(()) => {
                self.saved = self.snapshot();
                self.status = Some("Profile saved.".to_string());
            }
            Err(message) => {
                self.status = Some(message.unwrap_or_else(|| "Save failed".to_string()));
            }
        }
    }

    pub fn begin_upload(&mut self, field: MediaField) -> bool {
        self.begin(Pending::Upload(field))
    }

    /// Stages an uploaded URL. It is not persisted until the next save.
    pub fn finish_upload(&mut self, field: MediaField, result: Result<String, Option<String>>) {
        self.pending = None;
        match result {
            Ok(url) => {
                *self.media_mut(field) = Some(url);
                self.status = Some(format!("{} updated. Remember to save.", field.label()));
            }
            Err(message) => {
                self.status = Some(message.unwrap_or_else(|| "Upload failed".to_string()));
            }
        }
    }

    /// Update that clears only `field`; other staged edits stay local.
    /// Nothing is sent when the field is already empty.
    pub fn remove_request(&mut self, field: MediaField) -> Option<ProfileUpdateRequest> {
        if self.media(field).is_none() || !self.begin(Pending::Remove(field)) {
            return None;
        }

        let mut req = ProfileUpdateRequest {
            user_id: self.user_id,
            ..Default::default()
        };
        match field {
            MediaField::Avatar => req.avatar_url = Some(None),
            MediaField::Banner => req.banner_url = Some(None),
        }
        Some(req)
    }

    pub fn finish_remove(&mut self, field: MediaField, result: Result<(), Option<String>>) {
        self.pending = None;
        match result {
            Ok(()) => {
                *self.media_mut(field) = None;
                match field {
                    MediaField::Avatar => self.saved.avatar_url = None,
                    MediaField::Banner => self.saved.banner_url = None,
                }
                self.status = Some(format!("{} removed.", field.label()));
            }
            Err(message) => {
                self.status = Some(message.unwrap_or_else(|| "Remove failed".to_string()));
            }
        }
    }

    pub fn media(&self, field: MediaField) -> Option<&str> {
        match field {
            MediaField::Avatar => self.avatar_url.as_deref(),
            MediaField::Banner => self.banner_url.as_deref(),
        }
    }

    fn media_mut(&mut self, field: MediaField) -> &mut Option<String> {
        match field {
            MediaField::Avatar => &mut self.avatar_url,
            MediaField::Banner => &mut self.banner_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_shared::PublicUser;

    fn loaded(bio: Option<&str>, avatar: Option<&str>, banner: Option<&str>) -> ProfileEditor {
        let mut editor = ProfileEditor::new(42);
        editor.on_loaded(PublicProfileResponse {
            user: PublicUser {
                id: 42,
                username: "mia".to_string(),
                class: Some("7b".to_string()),
                bio: bio.map(str::to_string),
                avatar_url: avatar.map(str::to_string),
                banner_url: banner.map(str::to_string),
            },
            stats: Some(FollowStats {
                follower_count: 3,
                following_count: 1,
            }),
        });
        editor
    }

    #[test]
    fn load_populates_fields_exactly() {
        let editor = loaded(Some("hello"), Some("/media/avatars/a.png"), None);
        assert!(editor.is_ready());
        assert_eq!(editor.bio, "hello");
        assert_eq!(editor.avatar_url.as_deref(), Some("/media/avatars/a.png"));
        assert_eq!(editor.banner_url, None);
        assert_eq!(editor.stats.map(|s| s.follower_count), Some(3));
        assert!(!editor.is_dirty());

        let editor = loaded(None, None, None);
        assert_eq!(editor.bio, "");
    }

    #[test]
    fn nothing_is_sent_before_load() {
        let mut editor = ProfileEditor::new(1);
        assert!(editor.save_request().is_none());
        assert!(!editor.begin_upload(MediaField::Avatar));

        editor.on_load_failed("Not found".to_string());
        assert!(editor.save_request().is_none());
    }

    #[test]
    fn save_sends_full_tuple() {
        let mut editor = loaded(Some("hi"), Some("/a.png"), None);
        let req = editor.save_request().unwrap();
        assert_eq!(req.user_id, 42);
        assert_eq!(req.bio, Some(Some("hi".to_string())));
        assert_eq!(req.avatar_url, Some(Some("/a.png".to_string())));
        assert_eq!(req.banner_url, Some(None));
        assert_eq!(editor.pending(), Some(Pending::Save));
    }

    #[test]
    fn repeated_saves_are_identical() {
        let mut editor = loaded(Some("same"), None, Some("/b.png"));
        let first = editor.save_request().unwrap();
        editor.finish_save(Ok(()));
        let second = editor.save_request().unwrap();
        editor.finish_save(Ok(()));

        assert_eq!(first, second);
        assert!(!editor.is_dirty());
        assert_eq!(editor.status.as_deref(), Some("Profile saved."));
    }

    #[test]
    fn requests_are_refused_while_one_is_pending() {
        let mut editor = loaded(None, None, None);
        assert!(editor.begin_upload(MediaField::Avatar));
        assert!(editor.save_request().is_none());
        assert!(editor.remove_request(MediaField::Banner).is_none());
        assert!(!editor.begin_upload(MediaField::Banner));
        assert_eq!(editor.status.as_deref(), Some(BUSY_MESSAGE));

        editor.finish_upload(MediaField::Avatar, Ok("/media/avatars/x.png".to_string()));
        assert!(!editor.is_busy());
        assert!(editor.save_request().is_some());
    }

    #[test]
    fn upload_stages_url_without_saving() {
        let mut editor = loaded(None, None, None);
        assert!(editor.begin_upload(MediaField::Banner));
        editor.finish_upload(MediaField::Banner, Ok("/media/banners/b.webp".to_string()));

        assert_eq!(editor.banner_url.as_deref(), Some("/media/banners/b.webp"));
        assert!(editor.is_dirty());
        assert_eq!(
            editor.status.as_deref(),
            Some("Banner updated. Remember to save.")
        );
    }

    #[test]
    fn failed_upload_keeps_staged_url() {
        let mut editor = loaded(None, Some("/old.png"), None);
        assert!(editor.begin_upload(MediaField::Avatar));
        editor.finish_upload(
            MediaField::Avatar,
            Err(Some("Unsupported file type".to_string())),
        );
        assert_eq!(editor.avatar_url.as_deref(), Some("/old.png"));
        assert_eq!(editor.status.as_deref(), Some("Unsupported file type"));

        assert!(editor.begin_upload(MediaField::Avatar));
        editor.finish_upload(MediaField::Avatar, Err(None));
        assert_eq!(editor.status.as_deref(), Some("Upload failed"));
        assert_eq!(editor.avatar_url.as_deref(), Some("/old.png"));
    }

    #[test]
    fn removing_avatar_does_not_send_staged_banner() {
        let mut editor = loaded(Some("bio"), Some("/a.png"), Some("/b.png"));
        assert!(editor.begin_upload(MediaField::Banner));
        editor.finish_upload(MediaField::Banner, Ok("/new-banner.png".to_string()));

        let req = editor.remove_request(MediaField::Avatar).unwrap();
        assert_eq!(req.avatar_url, Some(None));
        assert_eq!(req.banner_url, None);
        assert_eq!(req.bio, None);

        editor.finish_remove(MediaField::Avatar, Ok(()));
        assert_eq!(editor.avatar_url, None);
        assert_eq!(editor.banner_url.as_deref(), Some("/new-banner.png"));
        assert_eq!(editor.status.as_deref(), Some("Avatar removed."));
        // The staged banner is still unsaved.
        assert!(editor.is_dirty());
    }

    #[test]
    fn failed_remove_keeps_field() {
        let mut editor = loaded(None, None, Some("/b.png"));
        editor.remove_request(MediaField::Banner).unwrap();
        editor.finish_remove(MediaField::Banner, Err(None));
        assert_eq!(editor.banner_url.as_deref(), Some("/b.png"));
        assert_eq!(editor.status.as_deref(), Some("Remove failed"));
    }

    #[test]
    fn removing_an_empty_field_sends_nothing() {
        let mut editor = loaded(None, None, Some("/b.png"));
        assert!(editor.remove_request(MediaField::Avatar).is_none());
        assert!(!editor.is_busy());

        assert!(editor.remove_request(MediaField::Banner).is_some());
    }

    #[test]
    fn long_bio_is_rejected_locally() {
        let mut editor = loaded(None, None, None);
        editor.set_bio("é".repeat(BIO_MAX_CHARS));
        assert!(editor.save_request().is_some());
        editor.finish_save(Err(Some("Database error".to_string())));
        assert_eq!(editor.status.as_deref(), Some("Database error"));

        editor.set_bio("x".repeat(BIO_MAX_CHARS + 1));
        assert!(editor.save_request().is_none());
        assert!(!editor.is_busy());
        assert!(editor.status.as_deref().unwrap_or("").starts_with("Bio is too long"));
    }
}
