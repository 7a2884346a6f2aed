use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use paw_client::visibility::{PostBody, view_post};
use paw_client::{
    Category, LoginRequest, Mutation, NewComment, NewPost, NutritionRequest, PawClient,
    PawClientError, ProfileUpdate, Resource, Session,
};

#[derive(Default)]
struct StubState {
    posts: Vec<Value>,
    hits: HashMap<String, usize>,
    next_id: u64,
}

type Stub = Arc<Mutex<StubState>>;

fn post_json(id: &str, author: &str, premium: bool) -> Value {
    json!({
        "_id": id,
        "authorId": { "_id": author, "name": format!("Name {author}") },
        "title": format!("title {id}"),
        "content": format!("content of {id}"),
        "category": "Tip",
        "isPremium": premium,
        "PremiumAmount": if premium { json!(5.0) } else { Value::Null },
        "upvote": [],
        "downvote": [],
        "PaidByUserPostId": [],
        "comments": [],
        "createdAt": "2024-10-01T10:00:00.000Z"
    })
}

fn user_json(id: &str, role: &str) -> Value {
    json!({
        "_id": id,
        "name": format!("Name {id}"),
        "email": format!("{id}@gmail.com"),
        "role": role,
        "followers": [],
        "following": []
    })
}

fn viewer(headers: &HeaderMap) -> Option<&'static str> {
    match headers.get(AUTHORIZATION)?.to_str().ok()? {
        "Bearer T" => Some("u1"),
        "Bearer A" => Some("a1"),
        _ => None,
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized" })),
    )
        .into_response()
}

fn ack() -> Response {
    Json(json!({ "success": true })).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Post not found" })),
    )
        .into_response()
}

async fn count_hits(State(stub): State<Stub>, req: Request, next: Next) -> Response {
    let key = format!("{} {}", req.method(), req.uri().path());
    *stub
        .lock()
        .expect("stub lock")
        .hits
        .entry(key)
        .or_default() += 1;
    next.run(req).await
}

async fn login(Json(body): Json<Value>) -> Response {
    let credentials = (body["email"].as_str(), body["password"].as_str());
    let (token, user) = match credentials {
        (Some("user1@gmail.com"), Some("123456789")) => ("T", json!({
            "_id": "u1", "name": "Name u1", "email": "user1@gmail.com", "role": "user"
        })),
        (Some("admin@gmail.com"), Some("123456789")) => ("A", json!({
            "_id": "a1", "name": "Name a1", "email": "admin@gmail.com", "role": "admin"
        })),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Invalid credentials" })),
            )
                .into_response();
        }
    };
    Json(json!({ "success": true, "token": token, "data": user })).into_response()
}

async fn list_posts(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let viewer = viewer(&headers);
    let posts: Vec<Value> = stub
        .lock()
        .expect("stub lock")
        .posts
        .iter()
        .cloned()
        .map(|mut post| {
            let premium = post["isPremium"].as_bool().unwrap_or(false);
            let author = post["authorId"]["_id"].as_str().map(str::to_string);
            let paid = post["PaidByUserPostId"]
                .as_array()
                .is_some_and(|ids| ids.iter().any(|id| id.as_str() == viewer));
            if premium && viewer.is_none_or(|v| author.as_deref() != Some(v)) && !paid {
                if let Some(obj) = post.as_object_mut() {
                    obj.remove("content");
                }
            }
            post
        })
        .collect();
    Json(json!({ "success": true, "data": posts })).into_response()
}

async fn my_posts(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    let Some(viewer) = viewer(&headers) else {
        return unauthorized();
    };
    let posts: Vec<Value> = stub
        .lock()
        .expect("stub lock")
        .posts
        .iter()
        .filter(|post| post["authorId"]["_id"] == viewer)
        .cloned()
        .collect();
    Json(json!({ "success": true, "data": posts })).into_response()
}

async fn create_post(State(stub): State<Stub>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(viewer) = viewer(&headers) else {
        return unauthorized();
    };
    let body = String::from_utf8_lossy(&body);
    if !body.contains("name=\"formData\"") || !body.contains(&format!("\"authorId\":\"{viewer}\""))
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Failed to create post" })),
        )
            .into_response();
    }

    let mut state = stub.lock().expect("stub lock");
    state.next_id += 1;
    let created = post_json(&format!("new{}", state.next_id), viewer, false);
    state.posts.push(created.clone());
    Json(json!({ "success": true, "data": created })).into_response()
}

async fn delete_post(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if viewer(&headers).is_none() {
        return unauthorized();
    }
    let mut state = stub.lock().expect("stub lock");
    let before = state.posts.len();
    state.posts.retain(|post| post["_id"] != id.as_str());
    if state.posts.len() == before {
        return not_found();
    }
    ack()
}

async fn vote(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path((action, id)): Path<(String, String)>,
) -> Response {
    let Some(viewer) = viewer(&headers) else {
        return unauthorized();
    };
    let (add, remove) = match action.as_str() {
        "upvote" => ("upvote", "downvote"),
        _ => ("downvote", "upvote"),
    };
    let mut state = stub.lock().expect("stub lock");
    let Some(post) = state.posts.iter_mut().find(|post| post["_id"] == id.as_str()) else {
        return not_found();
    };
    if let Some(ids) = post[remove].as_array_mut() {
        ids.retain(|v| v != viewer);
    }
    if let Some(ids) = post[add].as_array_mut() {
        if !ids.iter().any(|v| v == viewer) {
            ids.push(json!(viewer));
        }
    }
    ack()
}

async fn upvote(state: State<Stub>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    vote(state, headers, Path(("upvote".to_string(), id))).await
}

async fn downvote(state: State<Stub>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    vote(state, headers, Path(("downvote".to_string(), id))).await
}

async fn follow(headers: HeaderMap) -> Response {
    if viewer(&headers).is_none() {
        return unauthorized();
    }
    ack()
}

async fn comment(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let Some(viewer) = viewer(&headers) else {
        return unauthorized();
    };
    let data = &body["commentData"];
    Json(json!({
        "success": true,
        "data": {
            "_id": "c1",
            "postId": data["postId"],
            "authorId": viewer,
            "content": data["content"],
            "createdAt": "2024-10-02T10:00:00Z"
        }
    }))
    .into_response()
}

async fn payment(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if viewer(&headers).is_none() {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": { "payment_url": format!("https://pay.example.com/checkout/{id}") }
    }))
    .into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let user = match viewer(&headers) {
        Some("a1") => user_json("a1", "admin"),
        Some(id) => user_json(id, "user"),
        None => return unauthorized(),
    };
    Json(json!({ "success": true, "data": user })).into_response()
}

async fn update_me(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let Some(viewer) = viewer(&headers) else {
        return unauthorized();
    };
    let mut user = user_json(viewer, "user");
    if let Some(phone) = body["userdata"]["phone"].as_str() {
        user["phone"] = json!(phone);
    }
    Json(json!({ "success": true, "data": user })).into_response()
}

async fn all_users(headers: HeaderMap) -> Response {
    if viewer(&headers) != Some("a1") {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": [user_json("u1", "user"), user_json("a1", "admin")]
    }))
    .into_response()
}

async fn delete_user(headers: HeaderMap) -> Response {
    if viewer(&headers) != Some("a1") {
        return unauthorized();
    }
    ack()
}

async fn nutrition_pdf(headers: HeaderMap) -> Response {
    if viewer(&headers).is_none() {
        return unauthorized();
    }
    (
        [(axum::http::header::CONTENT_TYPE, "application/pdf")],
        b"%PDF-1.4 stub".to_vec(),
    )
        .into_response()
}

struct Backend {
    base_url: String,
    stub: Stub,
}

impl Backend {
    async fn start() -> Self {
        let stub: Stub = Arc::new(Mutex::new(StubState {
            posts: vec![post_json("p1", "u1", false), post_json("p2", "u2", true)],
            ..StubState::default()
        }));

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/pet/posts", get(list_posts).post(create_post))
            .route("/pet/posts/MyContents", get(my_posts))
            .route("/pet/posts/comments", post(comment))
            .route("/pet/posts/{id}", delete(delete_post))
            .route("/pet/posts/upvote/{id}", post(upvote))
            .route("/pet/posts/downvote/{id}", post(downvote))
            .route("/pet/posts/following/{id}", post(follow))
            .route("/pet/posts/payment/{id}", post(payment))
            .route("/users/me", get(me))
            .route("/users/me/update", put(update_me))
            .route("/users/allUsers", get(all_users))
            .route("/users/allUsers/{id}", delete(delete_user))
            .route("/Nutrition/generate-pdf", post(nutrition_pdf))
            .with_state(stub.clone());
        let app = Router::new()
            .nest("/api", api)
            .layer(middleware::from_fn_with_state(stub.clone(), count_hits));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub backend");
        });

        Self {
            base_url: format!("http://{addr}/api"),
            stub,
        }
    }

    fn client(&self) -> PawClient {
        PawClient::new(self.base_url.clone(), Session::in_memory()).expect("client must build")
    }

    fn hits(&self, key: &str) -> usize {
        self.stub
            .lock()
            .expect("stub lock")
            .hits
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

async fn logged_in(backend: &Backend, email: &str) -> PawClient {
    let client = backend.client();
    client
        .login(&LoginRequest {
            email: email.to_string(),
            password: "123456789".to_string(),
        })
        .await
        .expect("login must succeed");
    client
}

const GET_POSTS: &str = "GET /api/pet/posts";
const GET_MY_POSTS: &str = "GET /api/pet/posts/MyContents";
const GET_ME: &str = "GET /api/users/me";
const GET_USERS: &str = "GET /api/users/allUsers";

#[tokio::test]
async fn login_stores_token_and_lands_on_user_page() {
    let backend = Backend::start().await;
    let client = backend.client();

    let auth = client
        .login(&LoginRequest {
            email: "user1@gmail.com".to_string(),
            password: "123456789".to_string(),
        })
        .await
        .expect("login must succeed");

    assert_eq!(auth.token, "T");
    assert_eq!(auth.landing_path(), "/user");
    assert_eq!(client.session().token().as_deref(), Some("T"));
    assert_eq!(client.session().viewer_id().as_deref(), Some("u1"));
}

#[tokio::test]
async fn rejected_login_surfaces_server_message_and_keeps_session_empty() {
    let backend = Backend::start().await;
    let client = backend.client();

    let err = client
        .login(&LoginRequest {
            email: "user1@gmail.com".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .expect_err("login must fail");

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(client.session().token().is_none());
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let backend = Backend::start().await;
    let client = backend.client();

    client.posts().await.expect("first read");
    client.posts().await.expect("second read");

    assert_eq!(backend.hits(GET_POSTS), 1);
}

#[tokio::test]
async fn concurrent_reads_share_one_request() {
    let backend = Backend::start().await;
    let client = backend.client();

    let (a, b, c) = tokio::join!(client.posts(), client.posts(), client.posts());

    assert_eq!(a.expect("read a").len(), 2);
    assert!(b.is_ok() && c.is_ok());
    assert_eq!(backend.hits(GET_POSTS), 1);
}

#[tokio::test]
async fn upvote_refreshes_feed_and_is_not_double_counted() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    client.posts().await.expect("initial read");
    client.upvote("p1").await.expect("first upvote");
    client.upvote("p1").await.expect("second upvote");

    let posts = client.posts().await.expect("read after upvote");
    let p1 = posts.iter().find(|p| p.id == "p1").expect("p1 present");
    assert_eq!(p1.tally().up, 1);
    assert_eq!(backend.hits(GET_POSTS), 2);

    client.downvote("p1").await.expect("downvote");
    let posts = client.posts().await.expect("read after downvote");
    let p1 = posts.iter().find(|p| p.id == "p1").expect("p1 present");
    assert_eq!((p1.tally().up, p1.tally().down), (0, 1));
}

#[tokio::test]
async fn delete_post_refreshes_both_post_lists() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    assert_eq!(client.my_posts().await.expect("my posts").len(), 1);
    client.posts().await.expect("posts");

    client.delete_post("p1").await.expect("delete must succeed");

    assert!(client.my_posts().await.expect("my posts").is_empty());
    assert!(
        !client
            .posts()
            .await
            .expect("posts")
            .iter()
            .any(|p| p.id == "p1")
    );
    assert_eq!(backend.hits(GET_MY_POSTS), 2);
    assert_eq!(backend.hits(GET_POSTS), 2);
}

#[tokio::test]
async fn failed_mutation_leaves_cache_untouched() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    client.posts().await.expect("posts");
    let err = client
        .delete_post("missing")
        .await
        .expect_err("delete must fail");
    assert_eq!(err.to_string(), "Post not found");

    client.posts().await.expect("posts");
    assert_eq!(backend.hits(GET_POSTS), 1);
    assert!(!client.query_state(Resource::Posts).is_stale);
}

#[tokio::test]
async fn premium_content_stays_hidden_until_paid() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;
    let viewer = client.session().viewer_id();

    let posts = client.posts().await.expect("posts");
    let premium = posts.iter().find(|p| p.id == "p2").expect("p2 present");
    assert!(premium.content.is_none());
    assert_eq!(
        view_post(premium, viewer.as_deref(), true).body,
        PostBody::Paywalled
    );

    let payment = client.pay_for_post("p2").await.expect("payment");
    assert_eq!(payment.payment_url, "https://pay.example.com/checkout/p2");
    client.posts().await.expect("posts");
    assert_eq!(backend.hits(GET_POSTS), 2);
}

#[tokio::test]
async fn protected_read_without_token_sends_no_request() {
    let backend = Backend::start().await;
    let client = backend.client();

    let err = client.my_posts().await.expect_err("must fail");
    assert!(matches!(err, PawClientError::MissingToken));
    assert!(err.is_unauthorized());
    assert_eq!(backend.hits(GET_MY_POSTS), 0);
}

#[tokio::test]
async fn logout_drops_current_user_and_blocks_protected_reads() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    assert_eq!(client.current_user().await.expect("me").id, "u1");
    client.logout().expect("logout");

    let err = client.current_user().await.expect_err("must fail");
    assert!(matches!(err, PawClientError::MissingToken));
    assert_eq!(backend.hits(GET_ME), 1);
    assert!(client.session().profile().is_none());
}

#[tokio::test]
async fn admin_user_list_does_not_survive_switch_to_plain_user() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "admin@gmail.com").await;

    assert_eq!(client.all_users().await.expect("admin users").len(), 2);
    client.logout().expect("logout");
    client
        .login(&LoginRequest {
            email: "user1@gmail.com".to_string(),
            password: "123456789".to_string(),
        })
        .await
        .expect("user login");

    let err = client.all_users().await.expect_err("plain user must be refused");
    assert_eq!(err.status(), Some(401));
    assert_eq!(backend.hits(GET_USERS), 2);
    assert!(client.query_state(Resource::AllUsers).data.is_none());
}

#[tokio::test]
async fn feed_read_anonymously_is_refetched_after_login() {
    let backend = Backend::start().await;
    backend
        .stub
        .lock()
        .expect("stub lock")
        .posts
        .push(post_json("p3", "u1", true));
    let client = backend.client();

    let posts = client.posts().await.expect("anonymous feed");
    let own = posts.iter().find(|p| p.id == "p3").expect("p3 present");
    assert!(own.content.is_none());

    client
        .login(&LoginRequest {
            email: "user1@gmail.com".to_string(),
            password: "123456789".to_string(),
        })
        .await
        .expect("login");
    let viewer = client.session().viewer_id();

    let posts = client.posts().await.expect("feed after login");
    let own = posts.iter().find(|p| p.id == "p3").expect("p3 present");
    assert_eq!(
        view_post(own, viewer.as_deref(), true).body,
        PostBody::Full("content of p3".to_string())
    );
    assert_eq!(backend.hits(GET_POSTS), 2);
}

#[tokio::test]
async fn unreachable_backend_surfaces_network_error() {
    let client = PawClient::new("http://127.0.0.1:9/api", Session::in_memory())
        .expect("client must build");

    let err = client.posts().await.expect_err("read must fail");
    assert!(matches!(err, PawClientError::Network(_)), "{err:?}");

    let state = client.query_state(Resource::Posts);
    assert!(state.error.is_some());
    assert!(state.data.is_none());
    assert!(state.is_stale);
    assert!(!state.is_validating);
}

#[tokio::test]
async fn profile_update_refreshes_current_user_only() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    client.current_user().await.expect("me");
    client.posts().await.expect("posts");

    let updated = client
        .update_profile(&ProfileUpdate {
            phone: Some("555-0100".to_string()),
            ..ProfileUpdate::default()
        })
        .await
        .expect("update");
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));

    client.current_user().await.expect("me");
    client.posts().await.expect("posts");
    assert_eq!(backend.hits(GET_ME), 2);
    assert_eq!(backend.hits(GET_POSTS), 1);
}

#[tokio::test]
async fn admin_dashboard_counts_and_user_deletion() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "admin@gmail.com").await;

    let totals = client.dashboard_totals().await.expect("totals");
    assert_eq!((totals.users, totals.posts), (2, 2));

    client.delete_user("u1").await.expect("delete user");
    client.all_users().await.expect("users");
    assert_eq!(backend.hits(GET_USERS), 2);
}

#[tokio::test]
async fn create_post_and_comment_refresh_the_feed() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;

    client.posts().await.expect("posts");
    let created = client
        .create_post(&NewPost {
            title: "Raw diet".to_string(),
            content: "<p>notes</p>".to_string(),
            category: Category::Tip,
            is_premium: false,
            image: None,
        })
        .await
        .expect("create post");
    assert_eq!(created.author.id, "u1");
    assert_eq!(client.posts().await.expect("posts").len(), 3);

    let comment = client
        .create_comment(&NewComment {
            post_id: created.id.clone(),
            content: "nice".to_string(),
        })
        .await
        .expect("comment");
    assert_eq!(comment.post_id, created.id);

    client.follow_author(&created.id).await.expect("follow");
    client.posts().await.expect("posts");
    assert_eq!(backend.hits(GET_POSTS), 3);
}

#[tokio::test]
async fn nutrition_pdf_returns_bytes_and_invalidates_nothing() {
    let backend = Backend::start().await;
    let client = logged_in(&backend, "user1@gmail.com").await;
    assert!(Mutation::GenerateNutritionPdf.invalidates().is_empty());

    client.posts().await.expect("posts");
    let pdf = client
        .generate_nutrition_pdf(&NutritionRequest {
            pet_type: "dog".to_string(),
            age: 3,
            weight: 12.5,
        })
        .await
        .expect("pdf");

    assert!(pdf.starts_with(b"%PDF"));
    client.posts().await.expect("posts");
    assert_eq!(backend.hits(GET_POSTS), 1);
}
