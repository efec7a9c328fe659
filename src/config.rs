use std::env;

use serde::Serialize;

use crate::error::AnnotateError;

pub const DEFAULT_HOST: &str = "bhomero01lp";
pub const DEFAULT_PORT: u16 = 4064;
pub const DEFAULT_GROUP: &str = "invitro_arsenic";
pub const DEFAULT_NAMESPACE: &str = "jax.org/omeroutils/invitro_arsenic/plate_metadata/v0";

/// Where to reach the OMERO server and which annotation namespace to use.
/// Built-in defaults, overridden by `OMERO_*` environment variables,
/// overridden in turn by CLI flags.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub group: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub insecure: bool,
    pub group: Option<String>,
    pub namespace: Option<String>,
}

impl ServerConfig {
    pub fn resolve(overrides: &ServerOverrides) -> Result<Self, AnnotateError> {
        Self::resolve_with(&|key| env::var(key).ok(), overrides)
    }

    pub fn resolve_with(
        env: &dyn Fn(&str) -> Option<String>,
        overrides: &ServerOverrides,
    ) -> Result<Self, AnnotateError> {
        let host = overrides
            .host
            .clone()
            .or_else(|| env("OMERO_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port {
            Some(port) => port,
            None => match env("OMERO_PORT") {
                Some(raw) => raw.parse::<u16>().map_err(|_| {
                    AnnotateError::InvalidConfig(format!("OMERO_PORT is not a port number: {raw}"))
                })?,
                None => DEFAULT_PORT,
            },
        };

        let secure = if overrides.insecure {
            false
        } else {
            match env("OMERO_SECURE").as_deref() {
                Some("0") | Some("false") | Some("no") => false,
                _ => true,
            }
        };

        let group = overrides
            .group
            .clone()
            .or_else(|| env("OMERO_GROUP"))
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());

        let namespace = overrides
            .namespace
            .clone()
            .or_else(|| env("OMERO_ANNOTATION_NS"))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            return Err(AnnotateError::InvalidConfig(
                "annotation namespace must not be empty".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            secure,
            group,
            namespace,
        })
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn resolve(user_flag: Option<&str>) -> Result<Self, AnnotateError> {
        Self::resolve_with(&|key| env::var(key).ok(), user_flag)
    }

    pub fn resolve_with(
        env: &dyn Fn(&str) -> Option<String>,
        user_flag: Option<&str>,
    ) -> Result<Self, AnnotateError> {
        let username = user_flag
            .map(|user| user.to_string())
            .or_else(|| env("OMERO_USER"))
            .ok_or_else(|| {
                AnnotateError::InvalidConfig(
                    "no OMERO user given (--user or OMERO_USER)".to_string(),
                )
            })?;
        let password = env("OMERO_PASSWORD").ok_or_else(|| {
            AnnotateError::InvalidConfig("OMERO_PASSWORD is not set".to_string())
        })?;
        Ok(Self { username, password })
    }
}
