use uuid::Uuid;

use crate::{Error, STUB_UUID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub Uuid);

impl AuthToken {
    pub fn stub() -> AuthToken {
        AuthToken(STUB_UUID)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct SignUp {
    pub fullname: String,
    pub email: String,
    pub password: String,
}

impl SignUp {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.fullname)?;
        crate::validate_string(&self.email)?;
        crate::validate_string(&self.password)?;
        if self.fullname.chars().count() < 3 {
            return Err(Error::InvalidFullname(self.fullname.clone()));
        }
        if !is_valid_email(&self.email) {
            return Err(Error::InvalidEmail(self.email.clone()));
        }
        if !is_valid_password(&self.password) {
            return Err(Error::InvalidPassword);
        }
        Ok(())
    }

    /// Username a new account gets before disambiguation: the local part of its email
    pub fn base_username(&self) -> &str {
        self.email
            .split_once('@')
            .map(|(local, _)| local)
            .unwrap_or(&self.email)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl SignIn {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.email)?;
        crate::validate_string(&self.password)?;
        Ok(())
    }
}

/// What a successful sign-up or sign-in returns
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Session {
    pub access_token: AuthToken,
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// word chunks separated by single dots or dashes
fn is_dotted_words(s: &str) -> bool {
    !s.is_empty()
        && s.split(|c| c == '.' || c == '-')
            .all(|w| !w.is_empty() && w.chars().all(is_word_char))
}

fn is_valid_email(email: &str) -> bool {
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };
    let tld = match domain.rsplit_once('.') {
        Some((_, tld)) => tld,
        None => return false,
    };
    is_dotted_words(local)
        && is_dotted_words(domain)
        && (2..=3).contains(&tld.len())
        && tld.chars().all(is_word_char)
}

fn is_valid_password(password: &str) -> bool {
    (6..=20).contains(&password.chars().count())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
}
