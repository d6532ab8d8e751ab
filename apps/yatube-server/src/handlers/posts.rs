//! Post pages: listings, detail, create and edit.

use std::collections::HashMap;

use actix_web::{HttpMessage, HttpRequest, HttpResponse, http::StatusCode, http::header, web};
use serde::Deserialize;
use url::form_urlencoded;
use uuid::Uuid;

use yatube_core::DomainError;
use yatube_core::domain::{Group, Post, PostView, User};
use yatube_core::error::RepoError;
use yatube_core::forms::{
    FIELD_GROUP, FIELD_REVISION, FIELD_TEXT, FieldErrors, FormError, PostForm,
};
use yatube_core::pagination::{PAGE_SIZE, Page, Paginator};
use yatube_core::ports::PostFilter;
use yatube_shared::dto::{
    AuthorResponse, GroupChoice, GroupPostsResponse, GroupResponse, IndexResponse,
    PostDetailResponse, PostFormFields, PostFormResponse, PostPage, PostResponse,
    ProfileResponse,
};

use crate::middleware::auth::{Identity, login_redirect};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// `?page=` as typed by the visitor; parsed leniently by the paginator.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page_obj = listing(&state, PostFilter::All, query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(IndexResponse { page_obj }))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("group", &slug))?;

    let page_obj = listing(&state, PostFilter::Group(group.id), query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(GroupPostsResponse {
        group: render_group(&group),
        page_obj,
    }))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", &username))?;

    let page_obj = listing(&state, PostFilter::Author(author.id), query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        author: render_author(&author),
        post_count: page_obj.total,
        page_obj,
    }))
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let post = find_post(&state, post_id).await?;

    let mut views = load_views(&state, vec![post]).await?;
    let view = views
        .pop()
        .ok_or_else(|| DomainError::not_found("post", post_id))?;

    Ok(HttpResponse::Ok().json(PostDetailResponse {
        post: render_post(view),
    }))
}

/// GET /create/
pub async fn create_form(
    req: HttpRequest,
    identity: Identity,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    current_user(&state, &identity, &req).await?;

    form_page(&state, StatusCode::OK, None, PostForm::default(), FieldErrors::default()).await
}

/// POST /create/
pub async fn create_submit(
    req: HttpRequest,
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let author = current_user(&state, &identity, &req).await?;
    let form = read_form(&req, &body)?;

    let draft = match form.validate(state.groups.as_ref()).await {
        Ok(draft) => draft,
        Err(FormError::Invalid(errors)) => {
            tracing::debug!(author = %author.username, ?errors, "Rejected new post");
            return form_page(&state, StatusCode::UNPROCESSABLE_ENTITY, None, form, errors).await;
        }
        Err(FormError::Repo(e)) => return Err(e.into()),
    };

    let group_id = draft.group_id();
    let post = Post::new(author.id, draft.text, group_id);
    let post = state.posts.insert(post).await?;

    tracing::info!(post_id = %post.id, author = %author.username, "Post created");

    Ok(redirect(&format!("/profile/{}/", author.username)))
}

/// GET /posts/{post_id}/edit/
pub async fn edit_form(
    req: HttpRequest,
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let editor = current_user(&state, &identity, &req).await?;
    let post = find_post(&state, path.into_inner()).await?;

    if !post.is_authored_by(editor.id) {
        return Ok(deny_edit(&post, &editor));
    }

    let group = match post.group_id {
        Some(group_id) => state.groups.find_by_id(group_id).await?,
        None => None,
    };
    let form = PostForm::from_post(&post, group.as_ref());

    form_page(&state, StatusCode::OK, Some(post.id), form, FieldErrors::default()).await
}

/// POST /posts/{post_id}/edit/
pub async fn edit_submit(
    req: HttpRequest,
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let editor = current_user(&state, &identity, &req).await?;
    let post = find_post(&state, path.into_inner()).await?;

    // Checked before the body is even looked at.
    if !post.is_authored_by(editor.id) {
        return Ok(deny_edit(&post, &editor));
    }

    let form = read_form(&req, &body)?;
    let draft = match form.validate(state.groups.as_ref()).await {
        Ok(draft) => draft,
        Err(FormError::Invalid(errors)) => {
            tracing::debug!(post_id = %post.id, ?errors, "Rejected post edit");
            return form_page(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(post.id),
                form,
                errors,
            )
            .await;
        }
        Err(FormError::Repo(e)) => return Err(e.into()),
    };

    let updated = state
        .posts
        .update_content(post.id, &draft.text, draft.group_id(), draft.revision)
        .await
        .map_err(|e| match e {
            RepoError::Stale => AppError::from(DomainError::EditConflict { post_id: post.id }),
            other => AppError::from(other),
        })?;

    tracing::info!(post_id = %updated.id, revision = updated.revision, "Post edited");

    Ok(redirect(&detail_url(updated.id)))
}

/// Count, window, fetch and resolve one page of a listing.
async fn listing(
    state: &AppState,
    filter: PostFilter,
    requested: Option<&str>,
) -> AppResult<PostPage> {
    let total = state.posts.count(filter).await?;
    let window = Paginator::new(total, PAGE_SIZE).window(requested);

    let posts = state
        .posts
        .list(filter, window.offset(), window.limit())
        .await?;
    let views = load_views(state, posts).await?;

    Ok(render_page(window.fill(views)))
}

/// Attach authors and groups to posts with one batch lookup each.
async fn load_views(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut group_ids: Vec<Uuid> = posts.iter().filter_map(|p| p.group_id).collect();
    group_ids.sort_unstable();
    group_ids.dedup();

    let authors: HashMap<Uuid, User> = state
        .users
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();
    let groups: HashMap<Uuid, Group> = state
        .groups
        .find_by_ids(&group_ids)
        .await?
        .into_iter()
        .map(|group| (group.id, group))
        .collect();

    posts
        .into_iter()
        .map(|post| -> AppResult<PostView> {
            let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("Post {} references a missing author", post.id))
            })?;
            let group = post.group_id.and_then(|id| groups.get(&id).cloned());
            Ok(PostView {
                post,
                author,
                group,
            })
        })
        .collect()
}

async fn find_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("post", post_id))?;
    Ok(post)
}

/// The caller's user record. A token for a user that no longer exists is
/// treated like no token at all.
async fn current_user(state: &AppState, identity: &Identity, req: &HttpRequest) -> AppResult<User> {
    match state.users.find_by_id(identity.user_id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::debug!(
                user_id = %identity.user_id,
                username = %identity.username,
                "Token refers to an unknown user"
            );
            Err(AppError::LoginRequired(login_redirect(
                &state.login_url,
                req.path(),
            )))
        }
    }
}

/// Someone else's post: send them back to it without a word.
fn deny_edit(post: &Post, editor: &User) -> HttpResponse {
    tracing::warn!(post_id = %post.id, editor = %editor.username, "Edit attempt by non-author");
    redirect(&detail_url(post.id))
}

async fn form_page(
    state: &AppState,
    status: StatusCode,
    post_id: Option<Uuid>,
    form: PostForm,
    errors: FieldErrors,
) -> AppResult<HttpResponse> {
    let group_choices = state
        .groups
        .list_all()
        .await?
        .into_iter()
        .map(|group| GroupChoice {
            slug: group.slug,
            title: group.title,
        })
        .collect();

    Ok(HttpResponse::build(status).json(PostFormResponse {
        is_edit: post_id.is_some(),
        post_id,
        form: PostFormFields {
            text: form.text,
            group: form.group,
            revision: form.revision,
        },
        errors: errors.into_inner(),
        group_choices,
    }))
}

/// Decode a submitted post form, url-encoded or JSON.
fn read_form(req: &HttpRequest, body: &[u8]) -> AppResult<PostForm> {
    let content_type = req.content_type();

    if content_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        Ok(parse_urlencoded(body))
    } else if content_type.eq_ignore_ascii_case("application/json") {
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {e}")))
    } else {
        Err(AppError::UnsupportedMediaType(format!(
            "Expected a form or JSON body, got {content_type:?}"
        )))
    }
}

/// Unknown keys are ignored; a repeated key keeps its last value.
fn parse_urlencoded(body: &[u8]) -> PostForm {
    let mut form = PostForm::default();
    for (key, value) in form_urlencoded::parse(body) {
        match &*key {
            FIELD_TEXT => form.text = value.into_owned(),
            FIELD_GROUP => form.group = Some(value.into_owned()),
            FIELD_REVISION => form.revision = Some(value.into_owned()),
            _ => {}
        }
    }
    form
}

fn detail_url(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn render_author(user: &User) -> AuthorResponse {
    AuthorResponse {
        id: user.id,
        username: user.username.clone(),
    }
}

fn render_group(group: &Group) -> GroupResponse {
    GroupResponse {
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

fn render_post(view: PostView) -> PostResponse {
    PostResponse {
        id: view.post.id,
        text: view.post.text,
        pub_date: view.post.pub_date,
        revision: view.post.revision,
        author: render_author(&view.author),
        group: view.group.as_ref().map(render_group),
    }
}

fn render_page(page: Page<PostView>) -> PostPage {
    let page = page.map(render_post);
    PostPage {
        posts: page.items,
        number: page.number,
        num_pages: page.num_pages,
        total: page.total,
        has_next: page.has_next,
        has_previous: page.has_previous,
        next_page_number: page.next_page_number,
        previous_page_number: page.previous_page_number,
    }
}
