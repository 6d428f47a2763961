//! Filter, paging and row-expansion state of the user list.

use roster_shared::{
    api::{UserListParams, UserPageResponse},
    UserSummary, CLASSES, NO_CLASS_VALUE,
};

#[derive(Debug, Clone, Default)]
pub struct UserListState {
    pub data: Option<UserPageResponse>,
    pub selected: usize,
    /// The one open row, if any.
    pub expanded_id: Option<i64>,
    pub compact: bool,
    pub query: String,
    /// 0 = all classes, 1 = no class, then `CLASSES` in order.
    class_idx: usize,
    pub page: u32,
}

impl UserListState {
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Default::default()
        }
    }

    pub fn users(&self) -> &[UserSummary] {
        self.data.as_ref().map(|d| d.users.as_slice()).unwrap_or(&[])
    }

    pub fn selected_user(&self) -> Option<&UserSummary> {
        self.users().get(self.selected)
    }

    pub fn expanded_user(&self) -> Option<&UserSummary> {
        let id = self.expanded_id?;
        self.users().iter().find(|u| u.id == id)
    }

    pub fn total_pages(&self) -> i64 {
        self.data.as_ref().map(|d| d.total_pages).unwrap_or(0)
    }

    /// Query value of the class filter; empty for no constraint.
    pub fn class_value(&self) -> &str {
        match self.class_idx {
            0 => "",
            1 => NO_CLASS_VALUE,
            i => CLASSES.get(i - 2).copied().unwrap_or(""),
        }
    }

    pub fn class_label(&self) -> &str {
        match self.class_idx {
            0 => "All classes",
            1 => "No class",
            _ => self.class_value(),
        }
    }

    pub fn cycle_class(&mut self) {
        self.class_idx = (self.class_idx + 1) % (CLASSES.len() + 2);
        self.page = 1;
        self.expanded_id = None;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.page = 1;
        self.expanded_id = None;
    }

    pub fn next_page(&mut self) -> bool {
        if (self.page as i64) < self.total_pages() {
            self.page += 1;
            self.expanded_id = None;
            return true;
        }
        false
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            self.expanded_id = None;
            return true;
        }
        false
    }

    pub fn toggle_compact(&mut self) {
        self.compact = !self.compact;
        if self.compact {
            self.expanded_id = None;
        }
    }

    pub fn params(&self) -> UserListParams {
        let class = self.class_value();
        UserListParams {
            q: (!self.query.is_empty()).then(|| self.query.clone()),
            class: (!class.is_empty()).then(|| class.to_string()),
            page: Some(self.page.to_string()),
            ..Default::default()
        }
    }

    pub fn on_loaded(&mut self, data: UserPageResponse) {
        self.page = data.page;
        if let Some(id) = self.expanded_id {
            if !data.users.iter().any(|u| u.id == id) {
                self.expanded_id = None;
            }
        }
        self.selected = self.selected.min(data.users.len().saturating_sub(1));
        self.data = Some(data);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.users().len() {
            self.selected += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Opens the selected row, closing any other. Toggling the open row closes
    /// it. Returns the id of the row that is now open.
    pub fn toggle_expanded(&mut self) -> Option<i64> {
        if self.compact {
            return None;
        }
        let id = self.selected_user()?.id;
        self.expanded_id = if self.expanded_id == Some(id) {
            None
        } else {
            Some(id)
        };
        self.expanded_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_shared::{Role, RoleStats};

    fn user(id: i64) -> UserSummary {
        UserSummary {
            id,
            username: format!("user{}", id),
            role: Role::User,
            class: None,
            avatar_url: None,
            has_voted: false,
        }
    }

    fn page(ids: &[i64], page: u32, total_pages: i64) -> UserPageResponse {
        UserPageResponse {
            users: ids.iter().copied().map(user).collect(),
            total: ids.len() as i64,
            page,
            total_pages,
            q: String::new(),
            class: String::new(),
            stats: RoleStats::default(),
            groups: Vec::new(),
            user_bans: Vec::new(),
            ip_bans: Vec::new(),
        }
    }

    #[test]
    fn only_one_row_is_open() {
        let mut list = UserListState::new();
        list.on_loaded(page(&[5, 4, 3], 1, 1));

        assert_eq!(list.toggle_expanded(), Some(5));
        list.move_down();
        assert_eq!(list.toggle_expanded(), Some(4));
        assert_eq!(list.expanded_id, Some(4));
        assert_eq!(list.toggle_expanded(), None);
        assert_eq!(list.expanded_id, None);
    }

    #[test]
    fn compact_view_has_no_open_row() {
        let mut list = UserListState::new();
        list.on_loaded(page(&[1], 1, 1));
        list.toggle_expanded();
        list.toggle_compact();
        assert_eq!(list.expanded_id, None);
        assert_eq!(list.toggle_expanded(), None);
    }

    #[test]
    fn reload_clamps_selection_and_drops_missing_row() {
        let mut list = UserListState::new();
        list.on_loaded(page(&[9, 8, 7], 1, 1));
        list.move_down();
        list.move_down();
        list.toggle_expanded();

        list.on_loaded(page(&[9], 1, 1));
        assert_eq!(list.selected, 0);
        assert_eq!(list.expanded_id, None);
    }

    #[test]
    fn paging_stays_in_range() {
        let mut list = UserListState::new();
        list.on_loaded(page(&[1], 1, 3));
        assert!(!list.prev_page());
        assert!(list.next_page());
        assert!(list.next_page());
        assert!(!list.next_page());
        assert_eq!(list.page, 3);
    }

    #[test]
    fn class_filter_cycles_through_all_values() {
        let mut list = UserListState::new();
        assert_eq!(list.class_value(), "");
        list.cycle_class();
        assert_eq!(list.class_value(), NO_CLASS_VALUE);
        assert_eq!(list.class_label(), "No class");
        list.cycle_class();
        assert_eq!(list.class_value(), CLASSES[0]);
        for _ in 0..CLASSES.len() {
            list.cycle_class();
        }
        assert_eq!(list.class_value(), "");
    }

    #[test]
    fn params_omit_empty_filters() {
        let mut list = UserListState::new();
        let params = list.params();
        assert_eq!(params.q, None);
        assert_eq!(params.class, None);
        assert_eq!(params.page.as_deref(), Some("1"));

        list.set_query("  mi ");
        list.cycle_class();
        let params = list.params();
        assert_eq!(params.q.as_deref(), Some("mi"));
        assert_eq!(params.class.as_deref(), Some("none"));
    }
}
