//! # Major CLI
//!
//! A command-line client for the Major application platform.
//!
//! This library provides functionality to:
//! - Log in with a device code and manage the default organization
//! - Create applications from templates and clone or pull their repositories
//! - Reconcile GitHub repository access through collaborator invitations
//! - Commit, deploy and watch a new application version
//!
//! ## Modules
//!
//! - [`access`] - Repository access probing and invitation waiting
//! - [`api`] - HTTP client for the backend API
//! - [`app`] - Application context shared by every command
//! - [`app_deps`] - Trait seams for the backend, git, prompts and browser
//! - [`auth`] - Device-code token polling
//! - [`commands`] - Command implementations
//! - [`config`] - Configuration file parsing
//! - [`credentials`] - Persistent credential storage
//! - [`deploy`] - Deployment status polling and rendering
//! - [`git`] - `git`/`ssh` subprocesses and remote URL parsing
//! - [`prompt`] - Interactive terminal widgets
//! - [`retry`] - Retry combinator for access-sensitive git operations
//! - [`validation`] - Input validation utilities
//! - [`paths`] - XDG-compliant path resolution
//! - [`error`] - Error formatting utilities
//! - [`errors`] - Structured error types
//! - [`constants`] - Application constants

pub mod access;
pub mod api;
pub mod app;
pub mod app_deps;
pub mod auth;
pub mod browser;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod deploy;
pub mod error;
pub mod errors;
pub mod git;
pub mod paths;
pub mod prompt;
pub mod retry;
pub mod validation;
