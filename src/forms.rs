//! Validation of submitted forms. A form either cleans into the values to
//! persist or yields field-level error messages for redisplay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::auth::UserStore;
use crate::store::{Store, slugify};

const REQUIRED: &str = "This field is required.";
const MAX_NAME_LEN: usize = 128;
const MAX_URL_LEN: usize = 200;
const MAX_USERNAME_LEN: usize = 150;

/// Field name to messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

fn required<'a>(errors: &mut FormErrors, field: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

/// Prefixes `http://` when no scheme is given and checks there is a host.
fn clean_url(errors: &mut FormErrors, field: &str, raw: &str) -> String {
    let url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let host = url
        .split_once("://")
        .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or_default())
        .unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        errors.add(field, "Enter a valid URL.");
    }
    max_length(errors, field, &url, MAX_URL_LEN);
    url
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

impl CategoryForm {
    /// Returns the cleaned category name.
    pub fn validate(&self, store: &Store) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let name = required(&mut errors, "name", &self.name);

        if !name.is_empty() {
            max_length(&mut errors, "name", name, MAX_NAME_LEN);
            if slugify(name).is_empty() {
                errors.add("name", "Name must contain at least one letter or digit.");
            } else if store.category_exists(name) {
                errors.add("name", "Category with this Name already exists.");
            }
        }

        errors.into_result(name.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPage {
    pub title: String,
    pub url: String,
}

impl PageForm {
    pub fn validate(&self) -> Result<CleanPage, FormErrors> {
        let mut errors = FormErrors::default();

        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", title, MAX_NAME_LEN);

        let url = required(&mut errors, "url", &self.url);
        let url = if url.is_empty() {
            String::new()
        } else {
            clean_url(&mut errors, "url", url)
        };

        errors.into_result(CleanPage {
            title: title.to_string(),
            url,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanUser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl UserForm {
    pub fn validate(&self, users: &UserStore) -> Result<CleanUser, FormErrors> {
        let mut errors = FormErrors::default();

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty() {
            max_length(&mut errors, "username", username, MAX_USERNAME_LEN);
            if !username
                .chars()
                .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
            {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, \
                     numbers, and @/./+/-/_ characters.",
                );
            } else if users.username_taken(username) {
                errors.add("username", "A user with that username already exists.");
            }
        }

        let email = self.email.trim();
        if !email.is_empty() {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                errors.add("email", "Enter a valid email address.");
            }
        }

        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }

        errors.into_result(CleanUser {
            username: username.to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserProfileForm {
    #[serde(default)]
    pub website: String,
}

impl UserProfileForm {
    /// Returns the cleaned website, if one was given.
    pub fn validate(&self) -> Result<Option<String>, FormErrors> {
        let mut errors = FormErrors::default();
        let website = self.website.trim();
        let website = (!website.is_empty()).then(|| clean_url(&mut errors, "website", website));
        errors.into_result(website)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration posts carry both user and profile fields in one body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(flatten)]
    pub user: UserForm,
    #[serde(flatten)]
    pub profile: UserProfileForm,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::NewUser;

    #[test]
    fn category_name_is_required() {
        let form = CategoryForm { name: "   ".into() };
        let errors = form.validate(&Store::new()).unwrap_err();
        assert_eq!(errors.get("name"), [REQUIRED.to_string()]);
    }

    #[test]
    fn category_name_is_trimmed_and_unique() {
        let store = Store::new();
        let form = CategoryForm { name: "  Rust  ".into() };
        assert_eq!(form.validate(&store), Ok("Rust".to_string()));

        store.create_category("Rust").unwrap();
        let errors = form.validate(&store).unwrap_err();
        assert_eq!(
            errors.get("name"),
            ["Category with this Name already exists.".to_string()]
        );
    }

    #[test]
    fn category_name_length_and_slug() {
        let long = CategoryForm { name: "x".repeat(129) };
        let errors = long.validate(&Store::new()).unwrap_err();
        assert_eq!(
            errors.get("name"),
            ["Ensure this value has at most 128 characters (it has 129).".to_string()]
        );

        let symbols = CategoryForm { name: "!!!".into() };
        assert!(symbols.validate(&Store::new()).is_err());
    }

    #[test]
    fn page_url_gets_scheme() {
        let form = PageForm {
            title: "Rust Book".into(),
            url: "doc.rust-lang.org/book/".into(),
        };
        assert_eq!(
            form.validate(),
            Ok(CleanPage {
                title: "Rust Book".into(),
                url: "http://doc.rust-lang.org/book/".into(),
            })
        );

        let secure = PageForm {
            title: "Crates".into(),
            url: "https://crates.io".into(),
        };
        assert_eq!(secure.validate().unwrap().url, "https://crates.io");
    }

    #[test]
    fn page_reports_every_bad_field() {
        let form = PageForm {
            title: String::new(),
            url: "http://".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("title"), [REQUIRED.to_string()]);
        assert_eq!(errors.get("url"), ["Enter a valid URL.".to_string()]);

        let spaced = PageForm {
            title: "t".into(),
            url: "exa mple.com".into(),
        };
        assert!(spaced.validate().is_err());
    }

    #[test]
    fn user_form_checks_fields() {
        let users = UserStore::new();
        users
            .register(NewUser {
                username: "taken".into(),
                email: None,
                password: "pw".into(),
                website: None,
            })
            .unwrap();

        let form = UserForm {
            username: "taken".into(),
            email: "nope".into(),
            password: String::new(),
        };
        let errors = form.validate(&users).unwrap_err();
        assert_eq!(
            errors.get("username"),
            ["A user with that username already exists.".to_string()]
        );
        assert_eq!(errors.get("email"), ["Enter a valid email address.".to_string()]);
        assert_eq!(errors.get("password"), [REQUIRED.to_string()]);

        let bad_chars = UserForm {
            username: "no spaces".into(),
            email: String::new(),
            password: "pw".into(),
        };
        assert!(bad_chars.validate(&users).unwrap_err().get("username")[0]
            .starts_with("Enter a valid username."));
    }

    #[test]
    fn user_form_cleans() {
        let form = UserForm {
            username: " leif ".into(),
            email: "leif@example.com".into(),
            password: "secret".into(),
        };
        assert_eq!(
            form.validate(&UserStore::new()),
            Ok(CleanUser {
                username: "leif".into(),
                email: Some("leif@example.com".into()),
                password: "secret".into(),
            })
        );
    }

    #[test]
    fn profile_website_is_optional() {
        assert_eq!(UserProfileForm::default().validate(), Ok(None));
        let form = UserProfileForm {
            website: "www.example.com".into(),
        };
        assert_eq!(form.validate(), Ok(Some("http://www.example.com".into())));
    }

    #[test]
    fn password_is_never_serialized() {
        let form = UserForm {
            username: "leif".into(),
            email: String::new(),
            password: "secret".into(),
        };
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
    }
}
