//! Configuration for the session store.

/// Default table name for persisted session records.
pub const DEFAULT_TABLE_NAME: &str = "sessions";

/// Default session max age: 30 days.
pub const DEFAULT_MAX_AGE: i64 = 60 * 60 * 24 * 30;

/// Default maximum length of a sealed payload, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Per-session policy applied when a session is saved.
///
/// `max_age` semantics follow cookie conventions: `0` means a session
/// cookie (the persisted record still gets the store's default expiry),
/// a negative value deletes the session immediately, and a positive value
/// is the expiry horizon in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Token path scope handed to the transport layer.
    pub path: String,

    /// Token domain scope handed to the transport layer.
    pub domain: Option<String>,

    /// Max age in seconds (0 = session cookie, negative = delete now).
    pub max_age: i64,

    /// Restrict the token to secure transports.
    pub secure: bool,

    /// Hide the token from client-side scripts.
    pub http_only: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: DEFAULT_MAX_AGE,
            secure: false,
            http_only: true,
        }
    }
}

impl SessionOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token path scope.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the token domain scope.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the max age in seconds.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the secure flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the http-only flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

/// Store-level configuration, fixed at construction time.
///
/// Each store instance owns an immutable copy, so multiple independently
/// configured stores can coexist in one process.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Logical table the store's records live in.
    pub table_name: String,

    /// Skip schema creation at construction. Operations fail (without
    /// panicking) if the table does not already exist.
    pub skip_create_table: bool,

    /// Default options handed to every freshly created session.
    pub session_options: SessionOptions,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            skip_create_table: false,
            session_options: SessionOptions::default(),
        }
    }
}

impl StoreOptions {
    /// Create store options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table name.
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Skip table creation at construction.
    pub fn with_skip_create_table(mut self, skip: bool) -> Self {
        self.skip_create_table = skip;
        self
    }

    /// Set the default session options.
    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }
}
