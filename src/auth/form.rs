/// Form field carrying the username.
pub const USER_FIELD: &str = "user";
/// Form field carrying the password.
pub const PASSWORD_FIELD: &str = "password";

/// Credentials submitted as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub user: String,
    pub password: String,
}

impl LoginForm {
    /// Decodes `user=..&password=..`. Both fields must be present and non-empty.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let mut user = None;
        let mut password = None;

        for (key, value) in form_urlencoded::parse(body) {
            match key.as_ref() {
                USER_FIELD => user = Some(value.into_owned()),
                PASSWORD_FIELD => password = Some(value.into_owned()),
                _ => {}
            }
        }

        match (user, password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some(Self { user, password })
            }
            _ => None,
        }
    }
}
