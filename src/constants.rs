//! Application constants for API endpoints, polling windows, git hosting and
//! validation rules.
//!
//! Everything tunable about timing lives here so tests and callers share the
//! same defaults.

/// Backend API endpoint paths.
pub mod api {
    pub const LOGIN_START: &str = "/login/start";
    pub const LOGIN_POLL: &str = "/login/poll";
    pub const VERIFY: &str = "/verify";
    pub const LOGOUT: &str = "/logout";
    pub const ORGANIZATIONS: &str = "/organizations";
    pub const APPLICATIONS: &str = "/applications";
    pub const APPLICATION_FROM_REPO: &str = "/application/from-repo";
    pub const APPLICATION_ENV: &str = "/application/env";
    pub const ORGANIZATION_APPLICATIONS: &str = "/organizations/applications";
    pub const TEMPLATES: &str = "/templates";
    pub const APPLICATION_TEMPLATE: &str = "/applications/template";
    pub const ADD_GH_COLLABORATORS: &str = "/applications/add-gh-collaborators";
    pub const APPLICATION_VERSIONS: &str = "/applications/versions";
    pub const VERSION_STATUS: &str = "/applications/versions/status";

    /// Request timeout for every backend call (seconds).
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Internal error codes returned by the backend in `error.internal_code`.
pub mod error_codes {
    pub const UNAUTHORIZED: u32 = 2000;
    pub const INVALID_TOKEN: u32 = 2001;
    pub const INVALID_USER_CODE: u32 = 2002;
    pub const TOKEN_NOT_FOUND: u32 = 2003;
    pub const INVALID_DEVICE_CODE: u32 = 2004;
    pub const AUTHORIZATION_PENDING: u32 = 2005;

    pub const ORGANIZATION_NOT_FOUND: u32 = 3000;
    pub const NOT_ORG_MEMBER: u32 = 3001;
    pub const NO_CREATE_PERMISSION: u32 = 3002;

    pub const APPLICATION_NOT_FOUND: u32 = 4000;
    pub const NO_APPLICATION_ACCESS: u32 = 4001;
    pub const DUPLICATE_APP_NAME: u32 = 4002;

    pub const GITHUB_REPO_NOT_FOUND: u32 = 5000;
    pub const GITHUB_REPO_ACCESS_DENIED: u32 = 5001;
    pub const GITHUB_COLLABORATOR_ADD_FAILED: u32 = 5002;
}

/// Git hosting constants.
pub mod git {
    /// SSH host used for connectivity probes and username detection.
    pub const SSH_HOST: &str = "git@github.com";

    /// Base URL for invitation links.
    pub const GITHUB_WEB_BASE: &str = "https://github.com";

    /// Connect timeout for the SSH connectivity probe (seconds).
    pub const SSH_PROBE_TIMEOUT_SECS: u32 = 5;

    /// Connect timeout for the SSH username detection handshake (seconds).
    pub const SSH_IDENTIFY_TIMEOUT_SECS: u32 = 2;

    /// Marker printed by the host on a successful SSH handshake.
    pub const SSH_SUCCESS_MARKER: &str = "successfully authenticated";

    pub const SSH_REMOTE_PATTERN: &str = r"^git@github\.com:([^/]+)/([^/]+?)(\.git)?$";
    pub const HTTPS_REMOTE_PATTERN: &str = r"^https://github\.com/([^/]+)/([^/]+?)(\.git)?$";

    /// GitHub usernames are alphanumeric with single inner hyphens.
    pub const SSH_GREETING_PATTERN: &str =
        r"Hi ([a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)! You've successfully authenticated";

    pub const NOREPLY_EMAIL_PATTERN: &str = r"^(?:(\d+)\+)?([^@]+)@users\.noreply\.github\.com$";

    /// Substrings (lower-case) identifying access-related git failures.
    pub const ACCESS_ERROR_PATTERNS: &[&str] = &[
        "repository not found",
        "could not read from remote repository",
        "authentication failed",
        "permission denied",
        "403",
        "401",
        "access denied",
        "fatal: unable to access",
    ];

    pub const DEFAULT_REMOTE: &str = "origin";
    pub const DEFAULT_BRANCH: &str = "main";
}

/// Repository access reconciliation timing.
pub mod access {
    /// Interval between access probes while waiting for an invitation (seconds).
    pub const POLL_INTERVAL_SECS: u64 = 2;

    /// Maximum time spent waiting for access to propagate (seconds).
    pub const POLL_TIMEOUT_SECS: u64 = 5 * 60;
}

/// Retry policy for git operations racing access propagation.
pub mod retry {
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const BASE_DELAY_MS: u64 = 200;
}

/// Deployment status polling.
pub mod deploy {
    /// Delay between status fetches (milliseconds).
    pub const POLL_INTERVAL_MS: u64 = 1000;

    /// Spinner redraw interval (milliseconds).
    pub const SPINNER_TICK_MS: u64 = 100;

    /// The ellipsis animation advances once every this many spinner ticks.
    pub const DOTS_TICK_DIVISOR: u32 = 5;

    /// Upper bound of the ellipsis animation.
    pub const MAX_DOTS: u8 = 4;
}

/// Credential store keys.
pub mod credentials {
    /// Service name scoping all stored credentials.
    pub const SERVICE: &str = "major-cli";
    pub const TOKEN_KEY: &str = "token";
    pub const ORG_ID_KEY: &str = "default-org";
    pub const ORG_NAME_KEY: &str = "default-org-name";
    pub const GITHUB_USERNAME_KEY: &str = "github-username";
    pub const FILE_NAME: &str = "credentials.toml";
}

/// Deploy URL slug validation.
pub mod slug {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 63;
    pub const PATTERN: &str = r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$";
    pub const RESERVED: &[&str] = &[
        "admin",
        "api",
        "www",
        "app",
        "mail",
        "ftp",
        "staging",
        "prod",
        "dev",
        "test",
        "beta",
        "status",
        "help",
        "support",
        "docs",
        "blog",
        "dashboard",
        "internal",
        "major",
    ];
    pub const RESERVED_PREFIXES: &[&str] = &["s-", "vs-"];
}

/// GitHub username validation.
pub mod github {
    /// GitHub username limit.
    pub const MAX_USERNAME_LENGTH: usize = 39;
}
