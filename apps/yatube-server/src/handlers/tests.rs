use std::sync::Arc;

use actix_web::{
    App, dev::ServiceResponse, http::StatusCode, http::header, middleware::from_fn, test, web,
};
use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use yatube_core::domain::{Group, Post, User};
use yatube_core::forms::{MSG_INVALID_CHOICE, MSG_INVALID_NUMBER, MSG_REQUIRED};
use yatube_core::ports::{PostFilter, TokenService};
use yatube_infra::{JwtConfig, JwtTokenService};
use yatube_shared::ErrorResponse;
use yatube_shared::dto::{
    GroupPostsResponse, HealthResponse, IndexResponse, PostDetailResponse, PostFormResponse,
    ProfileResponse,
};

use super::{configure_routes, not_found};
use crate::config::DEFAULT_LOGIN_URL;
use crate::observability::{REQUEST_ID_HEADER, request_id};
use crate::state::AppState;

struct Fixture {
    state: AppState,
    tokens: Arc<dyn TokenService>,
    leo: User,
    mia: User,
    cats: Group,
    dogs: Group,
}

impl Fixture {
    async fn new() -> Self {
        let state = AppState::in_memory(DEFAULT_LOGIN_URL.to_string());
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(JwtConfig {
            secret: "handler-tests".to_string(),
            expiration_hours: 1,
            issuer: "yatube".to_string(),
        }));

        let leo = state.users.insert(User::new("leo")).await.unwrap();
        let mia = state.users.insert(User::new("mia")).await.unwrap();
        let cats = state
            .groups
            .insert(Group::new("Cats", "cats", "All about cats"))
            .await
            .unwrap();
        let dogs = state
            .groups
            .insert(Group::new("Dogs", "dogs", "All about dogs"))
            .await
            .unwrap();

        Self {
            state,
            tokens,
            leo,
            mia,
            cats,
            dogs,
        }
    }

    fn bearer(&self, user: &User) -> (header::HeaderName, String) {
        let token = self.tokens.generate_token(user.id, &user.username).unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Insert `count` posts, each a minute older than the previous one.
    async fn seed(&self, author: &User, group: Option<&Group>, count: i64) -> Vec<Post> {
        let mut posts = Vec::new();
        for i in 0..count {
            let mut post = Post::new(
                author.id,
                format!("Post number {i}"),
                group.map(|g| g.id),
            );
            post.pub_date = Utc::now() - TimeDelta::minutes(i);
            posts.push(self.state.posts.insert(post).await.unwrap());
        }
        posts
    }

    async fn post_count(&self, filter: PostFilter) -> u64 {
        self.state.posts.count(filter).await.unwrap()
    }
}

macro_rules! init_app {
    ($fixture:expr) => {
        test::init_service(
            App::new()
                .wrap(from_fn(request_id))
                .app_data(web::Data::new($fixture.state.clone()))
                .app_data(web::Data::new($fixture.tokens.clone()))
                .configure(configure_routes)
                .default_service(web::to(not_found)),
        )
        .await
    };
}

fn location<B>(resp: &ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[actix_web::test]
async fn test_index_splits_posts_into_pages_of_ten() {
    let fx = Fixture::new().await;
    fx.seed(&fx.leo, None, 13).await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.page_obj.posts.len(), 10);
    assert_eq!(body.page_obj.number, 1);
    assert_eq!(body.page_obj.num_pages, 2);
    assert_eq!(body.page_obj.next_page_number, Some(2));
    assert_eq!(body.page_obj.posts[0].text, "Post number 0");

    let req = test::TestRequest::get().uri("/?page=2").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.page_obj.posts.len(), 3);
    assert!(body.page_obj.has_previous);
    assert!(!body.page_obj.has_next);
    assert_eq!(body.page_obj.posts[2].text, "Post number 12");
}

#[actix_web::test]
async fn test_bad_page_numbers_never_fail() {
    let fx = Fixture::new().await;
    fx.seed(&fx.leo, None, 13).await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/?page=abc").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.page_obj.number, 1);
    assert_eq!(body.page_obj.posts.len(), 10);

    let req = test::TestRequest::get().uri("/?page=99").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.page_obj.number, 2);
    assert_eq!(body.page_obj.posts.len(), 3);

    let req = test::TestRequest::get().uri("/?page=-4").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.page_obj.number, 1);
}

#[actix_web::test]
async fn test_empty_index_has_one_empty_page() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: IndexResponse = test::call_and_read_body_json(&app, req).await;
    assert!(body.page_obj.posts.is_empty());
    assert_eq!(body.page_obj.num_pages, 1);
}

#[actix_web::test]
async fn test_group_listing_only_shows_that_group() {
    let fx = Fixture::new().await;
    fx.seed(&fx.leo, Some(&fx.cats), 2).await;
    fx.seed(&fx.mia, Some(&fx.dogs), 3).await;
    fx.seed(&fx.mia, None, 1).await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/group/cats/").to_request();
    let body: GroupPostsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.group.title, "Cats");
    assert_eq!(body.page_obj.total, 2);
    assert!(
        body.page_obj
            .posts
            .iter()
            .all(|p| p.group.as_ref().map(|g| g.slug.as_str()) == Some("cats"))
    );
}

#[actix_web::test]
async fn test_unknown_pages_are_not_found() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    for uri in [
        "/group/birds/",
        "/profile/nobody/",
        "/posts/00000000-0000-0000-0000-000000000000/",
        "/posts/not-a-uuid/",
        "/no/such/route/",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.status, 404);
    }
}

#[actix_web::test]
async fn test_profile_lists_author_posts_with_count() {
    let fx = Fixture::new().await;
    fx.seed(&fx.leo, None, 12).await;
    fx.seed(&fx.mia, None, 4).await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/profile/leo/").to_request();
    let body: ProfileResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.author.username, "leo");
    assert_eq!(body.post_count, 12);
    assert_eq!(body.page_obj.posts.len(), 10);
    assert!(body.page_obj.posts.iter().all(|p| p.author.id == fx.leo.id));
}

#[actix_web::test]
async fn test_post_detail_resolves_author_and_group() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, Some(&fx.cats), 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body: PostDetailResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.post.id, post.id);
    assert_eq!(body.post.author.username, "leo");
    assert_eq!(body.post.group.unwrap().slug, "cats");
}

#[actix_web::test]
async fn test_create_requires_login() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/create/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");

    let req = test::TestRequest::post()
        .uri("/create/")
        .set_form([("text", "sneaky")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(fx.post_count(PostFilter::All).await, 0);
}

#[actix_web::test]
async fn test_token_for_unknown_user_counts_as_anonymous() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);
    let ghost = User::new("ghost");

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header(fx.bearer(&ghost))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
}

#[actix_web::test]
async fn test_create_form_lists_group_choices() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header(fx.bearer(&fx.leo))
        .to_request();
    let body: PostFormResponse = test::call_and_read_body_json(&app, req).await;
    assert!(!body.is_edit);
    assert!(body.form.text.is_empty());
    let slugs: Vec<&str> = body.group_choices.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, ["cats", "dogs"]);
}

#[actix_web::test]
async fn test_create_without_group_redirects_to_profile() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "  Hello, world  "), ("group", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");

    let posts = fx.state.posts.list(PostFilter::Author(fx.leo.id), 0, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "Hello, world");
    assert_eq!(posts[0].group_id, None);
}

#[actix_web::test]
async fn test_create_accepts_json_with_group() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(fx.bearer(&fx.mia))
        .set_json(serde_json::json!({ "text": "Woof", "group": "dogs" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    assert_eq!(fx.post_count(PostFilter::Group(fx.dogs.id)).await, 1);
    assert_eq!(fx.post_count(PostFilter::Author(fx.mia.id)).await, 1);
}

#[actix_web::test]
async fn test_create_rejects_blank_text() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "   "), ("group", "cats")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: PostFormResponse = test::read_body_json(resp).await;
    assert_eq!(body.errors["text"], [MSG_REQUIRED]);
    assert_eq!(body.form.group.as_deref(), Some("cats"));
    assert_eq!(fx.post_count(PostFilter::All).await, 0);
}

#[actix_web::test]
async fn test_create_rejects_unknown_group() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri("/create/")
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "Tweet"), ("group", "birds")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: PostFormResponse = test::read_body_json(resp).await;
    assert_eq!(body.errors["group"], [MSG_INVALID_CHOICE]);
    assert!(!body.errors.contains_key("text"));
    assert_eq!(fx.post_count(PostFilter::All).await, 0);
}

#[actix_web::test]
async fn test_edit_requires_login() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let uri = format!("/posts/{}/edit/", post.id);
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/auth/login/?next={uri}"));
}

#[actix_web::test]
async fn test_edit_form_is_prefilled_for_author() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, Some(&fx.cats), 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .to_request();
    let body: PostFormResponse = test::call_and_read_body_json(&app, req).await;
    assert!(body.is_edit);
    assert_eq!(body.post_id, Some(post.id));
    assert_eq!(body.form.text, post.text);
    assert_eq!(body.form.group.as_deref(), Some("cats"));
    assert_eq!(body.form.revision.as_deref(), Some("1"));
}

#[actix_web::test]
async fn test_edit_of_missing_post_is_not_found() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", Uuid::new_v4()))
        .insert_header(fx.bearer(&fx.leo))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_non_author_is_sent_back_to_post() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);
    let detail = format!("/posts/{}/", post.id);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.mia))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.mia))
        .set_form([("text", "hijacked")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), detail);

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_web::test]
async fn test_author_edit_moves_post_between_groups() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, Some(&fx.cats), 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "Now about dogs"), ("group", "dogs"), ("revision", "1")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let req = test::TestRequest::get().uri("/group/cats/").to_request();
    let cats: GroupPostsResponse = test::call_and_read_body_json(&app, req).await;
    assert!(cats.page_obj.posts.is_empty());

    let req = test::TestRequest::get().uri("/group/dogs/").to_request();
    let dogs: GroupPostsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(dogs.page_obj.posts.len(), 1);

    let edited = &dogs.page_obj.posts[0];
    assert_eq!(edited.id, post.id);
    assert_eq!(edited.text, "Now about dogs");
    assert_eq!(edited.revision, 2);
    assert_eq!(edited.pub_date, post.pub_date);
    assert_eq!(edited.author.id, fx.leo.id);
}

#[actix_web::test]
async fn test_invalid_edit_leaves_post_unchanged() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: PostFormResponse = test::read_body_json(resp).await;
    assert!(body.is_edit);
    assert_eq!(body.errors["text"], [MSG_REQUIRED]);

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_web::test]
async fn test_stale_edit_is_a_conflict() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    fx.state
        .posts
        .update_content(post.id, "edited elsewhere", None, Some(1))
        .await
        .unwrap();
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "my version"), ("revision", "1")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "edited elsewhere");
    assert_eq!(stored.revision, 2);
}

#[actix_web::test]
async fn test_edit_without_revision_overwrites() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    fx.state
        .posts
        .update_content(post.id, "edited elsewhere", None, None)
        .await
        .unwrap();
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "last write")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "last write");
    assert_eq!(stored.revision, 3);
}

#[actix_web::test]
async fn test_blank_revision_overwrites() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "new text"), ("group", ""), ("revision", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "new text");
    assert_eq!(stored.revision, 2);
}

#[actix_web::test]
async fn test_non_numeric_revision_is_rejected() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .set_form([("text", "new text"), ("revision", "latest")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: PostFormResponse = test::read_body_json(resp).await;
    assert_eq!(body.errors["revision"], [MSG_INVALID_NUMBER]);
    assert_eq!(body.form.revision.as_deref(), Some("latest"));

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_web::test]
async fn test_non_author_redirect_ignores_body() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.mia))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("not a form")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_web::test]
async fn test_author_edit_with_unknown_body_type() {
    let fx = Fixture::new().await;
    let post = fx.seed(&fx.leo, None, 1).await.remove(0);
    let app = init_app!(fx);

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/edit/", post.id))
        .insert_header(fx.bearer(&fx.leo))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("new text")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, 415);

    let stored = fx.state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored, post);
}

#[actix_web::test]
async fn test_health_reports_storage() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get().uri("/health/").to_request();
    let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.status, "ok");
    assert_eq!(body.storage, "memory");
}

#[actix_web::test]
async fn test_request_id_is_echoed() {
    let fx = Fixture::new().await;
    let app = init_app!(fx);

    let req = test::TestRequest::get()
        .uri("/health/")
        .insert_header((REQUEST_ID_HEADER, "abc-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");

    let req = test::TestRequest::get().uri("/health/").to_request();
    let resp = test::call_service(&app, req).await;
    let generated = resp.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
    assert!(Uuid::parse_str(generated).is_ok());
}
