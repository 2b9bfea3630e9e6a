/// Application name
pub const APP_NAME: &str = "Campus Forum";

/// Department sentinel that grants cross-department moderation authority
pub const SUPER_ADMIN_DEPARTMENT: &str = "ALL_BRANCHES";

/// Shown when a blocked user's blocker record no longer exists
pub const UNKNOWN_BLOCKER_NAME: &str = "a Super Admin";

/// Maximum length of a query or reply body, in characters
pub const MAX_POST_LENGTH: usize = 10_000;

/// Settings key of the global posting killswitch
pub const SETTING_CHAT_LOCKED: &str = "is_chat_locked";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
