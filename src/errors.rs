use thiserror::Error;

use crate::constants::error_codes;

/// Errors that can occur when talking to the Major backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("API error (status {status_code}): {message}")]
    Backend {
        status_code: u16,
        internal_code: Option<u32>,
        message: String,
    },
    #[error("not logged in: {0}")]
    NoToken(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn internal_code(&self) -> Option<u32> {
        match self {
            ApiError::Backend { internal_code, .. } => *internal_code,
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_authorization_pending(&self) -> bool {
        self.internal_code() == Some(error_codes::AUTHORIZATION_PENDING)
    }

    pub fn is_invalid_device_code(&self) -> bool {
        self.internal_code() == Some(error_codes::INVALID_DEVICE_CODE)
    }
}

/// Errors produced by the git/ssh subprocess adapter.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to start `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed: {output}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },
    #[error("not a git repository")]
    NotARepository,
}

/// Coarse classification of user-facing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flag/prompt input; never retried.
    UserInput,
    /// Repository access problems; retried before surfacing.
    Access,
    /// Missing, expired or rejected credentials.
    Authentication,
    /// Backend rejected the request.
    Backend,
    /// Anything the user cannot fix by re-running with different input.
    Fatal,
}

impl ErrorKind {
    /// Process exit status reported for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Fatal => 1,
            ErrorKind::UserInput => 2,
            ErrorKind::Authentication => 3,
            ErrorKind::Access => 4,
            ErrorKind::Backend => 5,
        }
    }
}

/// User-facing CLI errors. The `Display` output is the title shown in the
/// error box; [`CliError::suggestion`] is the hint printed underneath.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Not logged in!")]
    NotLoggedIn,
    #[error("Your session has expired!")]
    SessionExpired,
    #[error("Token not active")]
    TokenNotActive,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid user code")]
    InvalidUserCode,
    #[error("Invalid device code")]
    InvalidDeviceCode,
    #[error("Authorization pending")]
    AuthorizationPending,
    #[error("Authentication timeout - code expired")]
    LoginTimeout,

    #[error("Organization not found")]
    OrganizationNotFound,
    #[error("Not an organization member")]
    NotOrgMember,
    #[error("No permission to create")]
    NoCreatePermission,
    #[error("No organization selected")]
    NoOrganizationSelected,
    #[error("No organizations available")]
    NoOrganizationsAvailable,

    #[error("Application not found")]
    ApplicationNotFound,
    #[error("No application access")]
    NoApplicationAccess,
    #[error("Application name already exists")]
    DuplicateAppName,
    #[error("No applications available for this organization")]
    NoApplicationsAvailable,
    #[error("No templates available")]
    NoTemplatesAvailable,

    #[error("GitHub repository not found")]
    GitHubRepoNotFound,
    #[error("GitHub repository access denied")]
    GitHubRepoAccessDenied,
    #[error("Failed to add GitHub collaborator")]
    GitHubCollaboratorAddFailed,
    #[error("GitHub username required")]
    GitHubUsernameRequired,

    #[error("Not in a git repository")]
    NotInGitRepository,
    #[error("No git remote found in directory")]
    NoGitRemote,
    #[error("Unsupported git remote URL format")]
    UnsupportedRemoteUrl { url: String },
    #[error("No valid clone method available")]
    NoValidCloneMethod,
    #[error("Failed to access repository after accepting invitation")]
    GitRepositoryAccessFailed,
    #[error("Timeout waiting for repository access")]
    RepositoryAccessTimeout,
    #[error("Repository invitation pending")]
    InvitationPending { url: String },

    #[error("Deployment failed with status: {status}")]
    DeploymentFailed { status: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
    #[error("Operation cancelled")]
    OperationCancelled,

    #[error(transparent)]
    Api(ApiError),

    #[error("{title}")]
    Context {
        title: String,
        #[source]
        source: Box<CliError>,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CliError {
    /// Actionable hint shown below the error title, if any.
    pub fn suggestion(&self) -> Option<String> {
        let login = "Run 'major user login' to get started.";
        let relogin = "Run 'major user login' to login again.";
        let ssh_check = "Please check your SSH keys are configured correctly. Run 'ssh -T git@github.com' to test your GitHub SSH connection.";

        let text = match self {
            CliError::NotLoggedIn => login,
            CliError::SessionExpired | CliError::TokenNotActive => relogin,
            CliError::Unauthorized => {
                "You don't have permission to perform this action. Try running 'major user login' again."
            }
            CliError::InvalidUserCode | CliError::InvalidDeviceCode | CliError::LoginTimeout => {
                "Please try logging in again with 'major user login'."
            }
            CliError::AuthorizationPending => "Please complete the login process in your browser.",
            CliError::OrganizationNotFound => {
                "The organization does not exist or you don't have access to it."
            }
            CliError::NotOrgMember => {
                "You are not a member of this organization. Please contact an admin."
            }
            CliError::NoCreatePermission => {
                "You don't have permission to create resources in this organization."
            }
            CliError::NoOrganizationSelected => "Run 'major org select' to choose an organization.",
            CliError::NoOrganizationsAvailable => {
                "Please create one on https://app.major.build. Then run 'major org select' to select it."
            }
            CliError::ApplicationNotFound => {
                "The application does not exist or you don't have access to it."
            }
            CliError::NoApplicationAccess => {
                "You don't have permission to access this application."
            }
            CliError::DuplicateAppName => {
                "An application with this name already exists. Please choose a different name."
            }
            CliError::NoApplicationsAvailable => "Create an application first with 'major app create'.",
            CliError::NoTemplatesAvailable => "No templates are available. Please contact support.",
            CliError::GitHubRepoNotFound => {
                "Most likely, this is not a major application repository.\n\nYou can create a new application with 'major app create' or clone an existing application with 'major app clone'."
            }
            CliError::GitHubRepoAccessDenied => {
                "Unable to access the GitHub repository. Please check your permissions."
            }
            CliError::GitHubCollaboratorAddFailed => {
                "Unable to add collaborator to the GitHub repository. Please check your permissions."
            }
            CliError::GitHubUsernameRequired => {
                "Pass --github-username or run 'major user gitconfig' to store your GitHub username."
            }
            CliError::NotInGitRepository => {
                "You probably need to cd into your application directory first."
            }
            CliError::NoGitRemote => {
                "Please make sure you are in a git repository and have a remote origin set."
            }
            CliError::UnsupportedRemoteUrl { url } => {
                return Some(format!(
                    "Only GitHub SSH (git@github.com:owner/repo.git) and HTTPS (https://github.com/owner/repo.git) URLs are supported.\n\nReceived: {}",
                    url
                ));
            }
            CliError::NoValidCloneMethod => ssh_check,
            CliError::GitRepositoryAccessFailed => ssh_check,
            CliError::RepositoryAccessTimeout => "Please try again after accepting the invitation.",
            CliError::InvitationPending { url } => {
                return Some(format!(
                    "Accept the invitation at {} and run the command again.",
                    url
                ));
            }
            CliError::Context { source, .. } => return source.suggestion(),
            CliError::DeploymentFailed { .. }
            | CliError::InvalidInput { .. }
            | CliError::OperationCancelled
            | CliError::Api(_)
            | CliError::Unexpected(_) => return None,
        };
        Some(text.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::NotLoggedIn
            | CliError::SessionExpired
            | CliError::TokenNotActive
            | CliError::Unauthorized
            | CliError::InvalidUserCode
            | CliError::InvalidDeviceCode
            | CliError::AuthorizationPending
            | CliError::LoginTimeout => ErrorKind::Authentication,

            CliError::GitHubRepoAccessDenied
            | CliError::GitRepositoryAccessFailed
            | CliError::RepositoryAccessTimeout
            | CliError::InvitationPending { .. } => ErrorKind::Access,

            CliError::InvalidInput { .. }
            | CliError::GitHubUsernameRequired
            | CliError::NoOrganizationSelected
            | CliError::OperationCancelled => ErrorKind::UserInput,

            CliError::OrganizationNotFound
            | CliError::NotOrgMember
            | CliError::NoCreatePermission
            | CliError::NoOrganizationsAvailable
            | CliError::ApplicationNotFound
            | CliError::NoApplicationAccess
            | CliError::DuplicateAppName
            | CliError::NoApplicationsAvailable
            | CliError::NoTemplatesAvailable
            | CliError::GitHubRepoNotFound
            | CliError::GitHubCollaboratorAddFailed
            | CliError::DeploymentFailed { .. }
            | CliError::Api(_) => ErrorKind::Backend,

            CliError::Context { source, .. } => source.kind(),

            CliError::NotInGitRepository
            | CliError::NoGitRemote
            | CliError::UnsupportedRemoteUrl { .. }
            | CliError::NoValidCloneMethod
            | CliError::Unexpected(_) => ErrorKind::Fatal,
        }
    }

    /// Innermost error once all `Context` layers are peeled off.
    pub fn root(&self) -> &CliError {
        match self {
            CliError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        if let ApiError::NoToken(_) = err {
            return CliError::NotLoggedIn;
        }

        match err.internal_code() {
            Some(error_codes::UNAUTHORIZED) => CliError::Unauthorized,
            Some(error_codes::INVALID_TOKEN) => CliError::SessionExpired,
            Some(error_codes::INVALID_USER_CODE) => CliError::InvalidUserCode,
            Some(error_codes::TOKEN_NOT_FOUND) => CliError::NotLoggedIn,
            Some(error_codes::INVALID_DEVICE_CODE) => CliError::InvalidDeviceCode,
            Some(error_codes::AUTHORIZATION_PENDING) => CliError::AuthorizationPending,
            Some(error_codes::ORGANIZATION_NOT_FOUND) => CliError::OrganizationNotFound,
            Some(error_codes::NOT_ORG_MEMBER) => CliError::NotOrgMember,
            Some(error_codes::NO_CREATE_PERMISSION) => CliError::NoCreatePermission,
            Some(error_codes::APPLICATION_NOT_FOUND) => CliError::ApplicationNotFound,
            Some(error_codes::NO_APPLICATION_ACCESS) => CliError::NoApplicationAccess,
            Some(error_codes::DUPLICATE_APP_NAME) => CliError::DuplicateAppName,
            Some(error_codes::GITHUB_REPO_NOT_FOUND) => CliError::GitHubRepoNotFound,
            Some(error_codes::GITHUB_REPO_ACCESS_DENIED) => CliError::GitHubRepoAccessDenied,
            Some(error_codes::GITHUB_COLLABORATOR_ADD_FAILED) => {
                CliError::GitHubCollaboratorAddFailed
            }
            _ if err.is_unauthorized() => CliError::SessionExpired,
            _ => CliError::Api(err),
        }
    }
}

/// Attach a user-facing title to an error while keeping its suggestion.
pub trait WrapErr<T> {
    fn wrap_err(self, title: impl Into<String>) -> Result<T, CliError>;
}

impl<T, E> WrapErr<T> for Result<T, E>
where
    E: Into<CliError>,
{
    fn wrap_err(self, title: impl Into<String>) -> Result<T, CliError> {
        self.map_err(|err| CliError::Context {
            title: title.into(),
            source: Box::new(err.into()),
        })
    }
}
