//! Form decoding, validation and the form context handed to templates

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use folio_store::{Comment, FieldMeta, Group, GroupId, Post, PostView};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::error::HttpError;
use crate::media::decode_image_type;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// A file part of a multipart submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Submitted form fields, from either an urlencoded or a multipart body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            files: HashMap::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, HttpError> {
        let mut data = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| HttpError::bad_request(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| HttpError::bad_request(e.body_text()))?;
                    // An untouched file input still submits an empty part
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    data.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| HttpError::bad_request(e.body_text()))?;
                    data.fields.insert(name, text);
                }
            }
        }
        Ok(data)
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| HttpError::bad_request(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| HttpError::bad_request(e.body_text()))?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)
            .map_err(|e| HttpError::bad_request(format!("malformed form body: {}", e)))?;
        Ok(Self::from_pairs(pairs))
    }
}

/// Field-level validation failures
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[error("invalid form submission: {errors:?}")]
pub struct FormErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.errors.get(field).cloned().unwrap_or_default()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }
}

/// One `<option>` of a select field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Kinds of input widget a field renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Widget {
    Textarea,
    Select,
    File,
}

/// Everything a template needs to draw one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldContext {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub kind: Widget,
    pub is_textarea: bool,
    pub is_select: bool,
    pub is_file: bool,
    pub required: bool,
    pub value: String,
    pub errors: Vec<String>,
    pub choices: Vec<Choice>,
}

impl FieldContext {
    fn new(meta: FieldMeta, kind: Widget, required: bool) -> Self {
        Self {
            name: meta.name,
            label: meta.label,
            help_text: meta.help_text,
            kind,
            is_textarea: kind == Widget::Textarea,
            is_select: kind == Widget::Select,
            is_file: kind == Widget::File,
            required,
            value: String::new(),
            errors: Vec::new(),
            choices: Vec::new(),
        }
    }

    fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    fn errors(mut self, errors: &FormErrors) -> Self {
        self.errors = errors.for_field(self.name);
        self
    }
}

/// A form as presented to a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormContext {
    pub fields: Vec<FieldContext>,
    pub has_errors: bool,
    pub multipart: bool,
}

impl FormContext {
    pub fn field(&self, name: &str) -> Option<&FieldContext> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Raw values of the post form, before or after submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormValues {
    pub text: String,
    pub group: String,
}

impl PostFormValues {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            text: data.field(Post::TEXT.name).unwrap_or_default().to_string(),
            group: data.field(Post::GROUP.name).unwrap_or_default().to_string(),
        }
    }

    pub fn from_post(post: &PostView) -> Self {
        Self {
            text: post.post.text.clone(),
            group: post
                .post
                .group_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

/// A validated post submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<UploadedFile>,
}

impl PostForm {
    /// Validate against the groups a post may be filed under
    pub fn validate(data: &FormData, groups: &[Group]) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let text = data.field(Post::TEXT.name).unwrap_or_default().trim().to_string();
        if text.is_empty() {
            errors.add_error(Post::TEXT.name, REQUIRED);
        }

        let raw_group = data.field(Post::GROUP.name).unwrap_or_default().trim();
        let group = if raw_group.is_empty() {
            None
        } else {
            match raw_group
                .parse::<i64>()
                .ok()
                .map(GroupId)
                .filter(|id| groups.iter().any(|g| g.id == *id))
            {
                Some(id) => Some(id),
                None => {
                    errors.add_error(Post::GROUP.name, INVALID_CHOICE);
                    None
                }
            }
        };

        let image = data.file(Post::IMAGE.name).cloned();
        if let Some(file) = &image {
            if decode_image_type(&file.data).is_none() {
                errors.add_error(Post::IMAGE.name, INVALID_IMAGE);
            }
        }

        if errors.is_empty() {
            Ok(Self { text, group, image })
        } else {
            Err(errors)
        }
    }

    pub fn context(values: &PostFormValues, groups: &[Group], errors: &FormErrors) -> FormContext {
        let mut group_field = FieldContext::new(Post::GROUP, Widget::Select, false)
            .value(values.group.clone())
            .errors(errors);
        group_field.choices = groups
            .iter()
            .map(|g| Choice {
                value: g.id.to_string(),
                label: g.title.clone(),
                selected: g.id.to_string() == values.group,
            })
            .collect();

        FormContext {
            fields: vec![
                FieldContext::new(Post::TEXT, Widget::Textarea, true)
                    .value(values.text.clone())
                    .errors(errors),
                group_field,
                FieldContext::new(Post::IMAGE, Widget::File, false).errors(errors),
            ],
            has_errors: !errors.is_empty(),
            multipart: true,
        }
    }
}

/// A validated comment submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(data: &FormData) -> Result<Self, FormErrors> {
        let text = data.field(Comment::TEXT.name).unwrap_or_default().trim().to_string();
        if text.is_empty() {
            let mut errors = FormErrors::new();
            errors.add_error(Comment::TEXT.name, REQUIRED);
            return Err(errors);
        }
        Ok(Self { text })
    }

    /// The empty comment form shown under a post
    pub fn context() -> FormContext {
        FormContext {
            fields: vec![FieldContext::new(Comment::TEXT, Widget::Textarea, true)],
            has_errors: false,
            multipart: false,
        }
    }
}
