// Typed request inputs and their validation. A failed validation yields field-level
// messages that handlers render back into the submitted form.

use axum::extract::Multipart;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::AppResult;
use crate::media::{image_extension, Upload};

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Field name -> messages, plus messages that belong to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();

        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if username.chars().count() > USERNAME_MAX_LEN {
            errors.add("username", format!("Ensure this value has at most {} characters.", USERNAME_MAX_LEN));
        } else if !USERNAME_RE.is_match(username) {
            errors.add("username", "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.add("email", "This field is required.");
        } else if !EMAIL_RE.is_match(email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", "This field is required.");
        } else {
            if self.password1.chars().count() < PASSWORD_MIN_LEN {
                errors.add("password1", format!("This password is too short. It must contain at least {} characters.", PASSWORD_MIN_LEN));
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password1", "This password is entirely numeric.");
            }
        }

        if self.password2.is_empty() {
            errors.add("password2", "This field is required.");
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", "This field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()
    }
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

fn validate_image(errors: &mut FormErrors, field: &str, upload: &Upload) {
    if upload.is_empty() {
        errors.add(field, "The submitted file is empty.");
    } else if image_extension(&upload.file_name).is_none() {
        errors.add(field, "Upload a valid image. Supported formats: jpg, jpeg, png, gif, webp.");
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub image: Option<Upload>,
    pub caption: String,
}

impl PostForm {
    pub fn from_fields(mut fields: MultipartFields) -> Self {
        Self {
            image: fields.take_file("image"),
            caption: fields.take_text("caption").trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        match &self.image {
            Some(upload) => validate_image(&mut errors, "image", upload),
            None => errors.add("image", "This field is required."),
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub bio: String,
    pub profile_pic: Option<Upload>,
}

impl ProfileForm {
    pub fn from_fields(mut fields: MultipartFields) -> Self {
        Self {
            bio: fields.take_text("bio").trim().to_string(),
            profile_pic: fields.take_file("profile_pic"),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if let Some(upload) = &self.profile_pic {
            validate_image(&mut errors, "profile_pic", upload);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageForm {
    pub text: String,
    pub image: Option<Upload>,
}

impl MessageForm {
    pub fn from_fields(mut fields: MultipartFields) -> Self {
        Self {
            text: fields.take_text("text").trim().to_string(),
            image: fields.take_file("image"),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        match &self.image {
            Some(upload) => validate_image(&mut errors, "image", upload),
            None if self.text.is_empty() => errors.add_non_field("A message needs text or an image."),
            None => {}
        }
        errors.into_result()
    }
}

/// Post-detail page form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    pub comment: Option<String>,
}

/// Asynchronous comment endpoint body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentTextForm {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareForm {
    #[serde(default)]
    pub user_id: String,
}

impl ShareForm {
    pub fn recipient(&self) -> Option<i64> {
        self.user_id.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Text and file parts of a multipart body, keyed by field name.
#[derive(Debug, Default)]
pub struct MultipartFields {
    text: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartFields {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut fields = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    // Browsers send an empty, nameless part for an untouched file input.
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    fields.files.insert(name, Upload { file_name, bytes });
                }
                None => {
                    let value = field.text().await?;
                    fields.text.insert(name, value);
                }
            }
        }
        Ok(fields)
    }

    pub fn take_text(&mut self, name: &str) -> String {
        self.text.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub(crate) fn with_text(mut self, name: &str, value: &str) -> Self {
        self.text.insert(name.to_string(), value.to_string());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_file(mut self, name: &str, file_name: &str, bytes: &'static [u8]) -> Self {
        self.files.insert(
            name.to_string(),
            Upload {
                file_name: file_name.to_string(),
                bytes: axum::body::Bytes::from_static(bytes),
            },
        );
        self
    }
}
