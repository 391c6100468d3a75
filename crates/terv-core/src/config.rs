use std::env;
use std::io;
use std::path::PathBuf;

use terv_backend::{Displayer, ManagerError};

/// Environment variable enabling automatic installs (defaults to enabled).
pub const AUTO_INSTALL_ENV_NAME: &str = "TERV_AUTO_INSTALL";
const ROOT_ENV_NAME: &str = "TERV_ROOT";
const FORCE_REMOTE_ENV_NAME: &str = "TERV_FORCE_REMOTE";
const TOKEN_ENV_NAME: &str = "TERV_GITHUB_TOKEN";

const ROOT_DIR_NAME: &str = ".terv";

/// Read-only bundle shared by every manager built for one invocation.
pub struct Config {
    pub root_path: PathBuf,
    pub working_dir: PathBuf,
    pub no_install: bool,
    pub force_remote: bool,
    pub github_token: String,
    pub displayer: Displayer,
}

impl Config {
    /// Build the configuration from the process environment. Proxy
    /// invocations get a buffering displayer so the proxied tool's output
    /// stays clean.
    ///
    /// # Errors
    /// Returns an error when neither `TERV_ROOT` nor a home directory is
    /// available, or when the working directory cannot be determined.
    pub fn from_env(proxy_call: bool) -> Result<Self, ManagerError> {
        let root_path = env::var_os(ROOT_ENV_NAME).map(PathBuf::from).or_else(|| {
            dirs::home_dir().map(|home| home.join(ROOT_DIR_NAME))
        });
        let Some(root_path) = root_path else {
            return Err(ManagerError::Io(io::Error::other(
                "could not determine the terv root directory (set TERV_ROOT)",
            )));
        };

        Ok(Self {
            root_path,
            working_dir: env::current_dir()?,
            no_install: !env_bool(AUTO_INSTALL_ENV_NAME, true),
            force_remote: env_bool(FORCE_REMOTE_ENV_NAME, false),
            github_token: env::var(TOKEN_ENV_NAME).unwrap_or_default(),
            displayer: if proxy_call {
                Displayer::buffered()
            } else {
                Displayer::direct()
            },
        })
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            "" => default,
            other => {
                log::warn!("unrecognized boolean value {other:?} for {name}, using default");
                default
            }
        },
        Err(_) => default,
    }
}
