//! Post listings, detail, authoring and comments

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use folio_store::{
    Group, NewComment, NewPost, PostChanges, PostId, PostScope, PostView, User,
};
use serde_json::json;
use tracing::{debug, info};

use super::{parse_post_id, post_detail_url, posts_page, profile_url, Found, PageParam};
use crate::auth::{CurrentViewer, RequireUser};
use crate::error::{HttpError, HttpResult};
use crate::forms::{CommentForm, FormData, FormErrors, PostForm, PostFormValues, UploadedFile};
use crate::media::post_image_path;
use crate::render::render_page;
use crate::AppState;

/// All posts, newest first. Served through the page cache, so the context
/// never depends on who is asking.
pub async fn index(
    State(state): State<AppState>,
    PageParam(query): PageParam,
) -> HttpResult<Response> {
    let page_obj = posts_page(&state, PostScope::All, query).await?;
    render_page(
        state.renderer.as_ref(),
        "posts/index.html",
        json!({ "viewer": null, "page_obj": page_obj }),
    )
}

pub async fn group_posts(
    State(state): State<AppState>,
    current: CurrentViewer,
    Path(slug): Path<String>,
    PageParam(query): PageParam,
) -> HttpResult<Response> {
    let group = state
        .store
        .group_by_slug(&slug)
        .await?
        .ok_or_else(|| HttpError::not_found(format!("group '{}'", slug)))?;
    let page_obj = posts_page(&state, PostScope::Group(group.id), query).await?;
    render_page(
        state.renderer.as_ref(),
        "posts/group_list.html",
        json!({
            "viewer": current.context(),
            "group": group,
            "page_obj": page_obj,
        }),
    )
}

async fn load_post(state: &AppState, raw_id: &str) -> HttpResult<PostView> {
    let post_id = parse_post_id(raw_id)?;
    state
        .store
        .post(post_id)
        .await?
        .ok_or_else(|| HttpError::not_found(format!("post {}", post_id)))
}

pub async fn post_detail(
    State(state): State<AppState>,
    current: CurrentViewer,
    Path(post_id): Path<String>,
) -> HttpResult<Response> {
    let selected_post = load_post(&state, &post_id).await?;
    let count = state
        .store
        .count_posts(PostScope::Author(selected_post.author.id))
        .await?;
    let comments = state.store.comments_for(selected_post.id()).await?;
    let can_edit = current.viewer.is(selected_post.author.id);
    render_page(
        state.renderer.as_ref(),
        "posts/post_detail.html",
        json!({
            "viewer": current.context(),
            "selected_post": selected_post,
            "count": count,
            "comments": comments,
            "form": CommentForm::context(),
            "can_edit": can_edit,
        }),
    )
}

fn render_post_form(
    state: &AppState,
    user: &User,
    values: &PostFormValues,
    groups: &[Group],
    errors: &FormErrors,
    editing: Option<PostId>,
) -> HttpResult<Response> {
    render_page(
        state.renderer.as_ref(),
        "posts/create_post.html",
        json!({
            "viewer": { "id": user.id, "username": user.username },
            "form": PostForm::context(values, groups, errors),
            "is_edit": editing.is_some(),
            "post_id": editing,
        }),
    )
}

async fn store_image(state: &AppState, image: Option<UploadedFile>) -> HttpResult<Option<String>> {
    match image {
        Some(file) => {
            let path = state
                .media
                .save(&post_image_path(&file.file_name), &file.data)
                .await?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

pub async fn post_create_form(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> HttpResult<Response> {
    let groups = state.store.groups().await?;
    render_post_form(
        &state,
        &user,
        &PostFormValues::default(),
        &groups,
        &FormErrors::new(),
        None,
    )
}

/// The author is always the requester, whatever the body says
pub async fn post_create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    data: FormData,
) -> HttpResult<Response> {
    let groups = state.store.groups().await?;
    let form = match PostForm::validate(&data, &groups) {
        Ok(form) => form,
        Err(errors) => {
            debug!("rejected new post from {}: {}", user.username, errors);
            return render_post_form(
                &state,
                &user,
                &PostFormValues::from_data(&data),
                &groups,
                &errors,
                None,
            );
        }
    };

    let image = store_image(&state, form.image).await?;
    let post = state
        .store
        .create_post(NewPost {
            text: form.text,
            author_id: user.id,
            group_id: form.group,
            image,
        })
        .await?;
    info!("user {} published post {}", user.username, post.id());
    Ok(Found::to(profile_url(&user.username)).into_response())
}

/// Anyone but the author is sent back to the post itself
fn author_or_redirect(current: &CurrentViewer, post: &PostView) -> Result<User, Found> {
    match &current.user {
        Some(user) if user.id == post.author.id => Ok(user.clone()),
        _ => Err(Found::to(post_detail_url(post.id()))),
    }
}

pub async fn post_edit_form(
    State(state): State<AppState>,
    current: CurrentViewer,
    Path(post_id): Path<String>,
) -> HttpResult<Response> {
    let post = load_post(&state, &post_id).await?;
    let user = match author_or_redirect(&current, &post) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect.into_response()),
    };
    let groups = state.store.groups().await?;
    render_post_form(
        &state,
        &user,
        &PostFormValues::from_post(&post),
        &groups,
        &FormErrors::new(),
        Some(post.id()),
    )
}

/// Publication date and author are left untouched
pub async fn post_edit(
    State(state): State<AppState>,
    current: CurrentViewer,
    Path(post_id): Path<String>,
    data: FormData,
) -> HttpResult<Response> {
    let post = load_post(&state, &post_id).await?;
    let user = match author_or_redirect(&current, &post) {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect.into_response()),
    };
    let groups = state.store.groups().await?;
    let form = match PostForm::validate(&data, &groups) {
        Ok(form) => form,
        Err(errors) => {
            return render_post_form(
                &state,
                &user,
                &PostFormValues::from_data(&data),
                &groups,
                &errors,
                Some(post.id()),
            );
        }
    };

    let image = store_image(&state, form.image).await?;
    state
        .store
        .update_post(
            post.id(),
            PostChanges {
                text: form.text,
                group_id: form.group,
                image,
            },
        )
        .await?;
    info!("user {} edited post {}", user.username, post.id());
    Ok(Found::to(post_detail_url(post.id())).into_response())
}

/// Invalid comments are dropped without a word; the requester always lands
/// back on the post.
pub async fn add_comment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
    data: FormData,
) -> HttpResult<Response> {
    let post = load_post(&state, &post_id).await?;
    match CommentForm::validate(&data) {
        Ok(form) => {
            state
                .store
                .create_comment(NewComment {
                    post_id: post.id(),
                    author_id: user.id,
                    text: form.text,
                })
                .await?;
            info!("user {} commented on post {}", user.username, post.id());
        }
        Err(errors) => debug!("dropped comment on post {}: {}", post.id(), errors),
    }
    Ok(Found::to(post_detail_url(post.id())).into_response())
}
