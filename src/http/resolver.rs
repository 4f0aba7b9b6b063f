//! Maps a parsed request onto a file under the document root or a
//! credential action.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::auth::{CredentialCache, LoginForm, Registration};
use crate::config::RouteConfig;
use crate::http::mapped::{MapGauge, MappedFile};
use crate::http::parser::ParseError;
use crate::http::request::{Method, Request};

/// World-readable permission bit.
const OTHER_READ: u32 = 0o004;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Register,
}

/// What the server decided to answer.
#[derive(Debug)]
pub enum Outcome {
    BadRequest,
    NotFound,
    Forbidden,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalError,
    StaticFile(MappedFile),
    /// A credential action ran; `page` is the result page to serve.
    CredentialAction {
        action: Action,
        succeeded: bool,
        page: MappedFile,
    },
}

impl From<ParseError> for Outcome {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::TooLarge => Outcome::PayloadTooLarge,
            ParseError::Finished => Outcome::InternalError,
            ParseError::Incomplete
            | ParseError::MalformedLine
            | ParseError::InvalidRequest
            | ParseError::InvalidMethod
            | ParseError::InvalidUrl
            | ParseError::UnsupportedVersion
            | ParseError::InvalidHeader
            | ParseError::InvalidContentLength => Outcome::BadRequest,
        }
    }
}

pub struct Resolver {
    doc_root: PathBuf,
    routes: RouteConfig,
    credentials: Arc<CredentialCache>,
    gauge: MapGauge,
}

impl Resolver {
    pub fn new(
        doc_root: impl Into<PathBuf>,
        routes: RouteConfig,
        credentials: Arc<CredentialCache>,
        gauge: MapGauge,
    ) -> Self {
        Self {
            doc_root: doc_root.into(),
            routes,
            credentials,
            gauge,
        }
    }

    pub fn doc_root(&self) -> &Path {
        &self.doc_root
    }

    pub fn resolve(&self, request: &Request) -> Outcome {
        let path = request.path_only();

        if request.method == Method::POST
            && let Some(action) = self.action_for(path)
        {
            return self.run_action(action, request);
        }

        match request.method {
            Method::GET | Method::HEAD | Method::POST => {}
            Method::PUT
            | Method::DELETE
            | Method::TRACE
            | Method::OPTIONS
            | Method::CONNECT => return Outcome::MethodNotAllowed,
        }

        let page = self.page_for(path);
        match self.open(page) {
            Ok(file) => Outcome::StaticFile(file),
            Err(outcome) => outcome,
        }
    }

    fn action_for(&self, path: &str) -> Option<Action> {
        if path == self.routes.login {
            Some(Action::Login)
        } else if path == self.routes.register {
            Some(Action::Register)
        } else {
            None
        }
    }

    /// Applies aliases and the default page.
    fn page_for<'a>(&'a self, path: &'a str) -> &'a str {
        if let Some(page) = self.routes.aliases.get(path) {
            return page;
        }
        if path == "/" {
            return &self.routes.default_page;
        }
        path
    }

    fn run_action(&self, action: Action, request: &Request) -> Outcome {
        let succeeded = match LoginForm::parse(&request.body) {
            None => {
                tracing::debug!(?action, "Credential form is missing fields");
                false
            }
            Some(form) => match action {
                Action::Login => self.credentials.verify(&form.user, &form.password),
                Action::Register => match self.credentials.register(&form.user, &form.password) {
                    Ok(Registration::Created) => {
                        tracing::info!(user = %form.user, "Registered new user");
                        true
                    }
                    Ok(Registration::AlreadyExists) => false,
                    Err(e) => {
                        tracing::warn!(user = %form.user, error = %e, "Failed to store credentials");
                        false
                    }
                },
            },
        };

        let page = match (action, succeeded) {
            (Action::Login, true) => &self.routes.login_success,
            (Action::Login, false) => &self.routes.login_failure,
            (Action::Register, true) => &self.routes.register_success,
            (Action::Register, false) => &self.routes.register_failure,
        };

        match self.open(page) {
            Ok(page) => Outcome::CredentialAction {
                action,
                succeeded,
                page,
            },
            Err(outcome) => outcome,
        }
    }

    /// Joins a URL path onto the document root, refusing to leave it.
    pub fn compose(&self, url_path: &str) -> Option<PathBuf> {
        let mut full = self.doc_root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(full)
    }

    fn open(&self, url_path: &str) -> Result<MappedFile, Outcome> {
        let Some(full) = self.compose(url_path) else {
            tracing::warn!(path = url_path, "Rejected path outside the document root");
            return Err(Outcome::Forbidden);
        };

        let meta = match std::fs::metadata(&full) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Outcome::NotFound),
            Err(e) => {
                tracing::debug!(path = %full.display(), error = %e, "Cannot stat file");
                return Err(Outcome::Forbidden);
            }
        };

        if meta.is_dir() || meta.permissions().mode() & OTHER_READ == 0 {
            return Err(Outcome::Forbidden);
        }

        MappedFile::open(&full, &self.gauge).map_err(|e| {
            tracing::error!(path = %full.display(), error = %e, "Failed to map file");
            Outcome::InternalError
        })
    }
}
