//! End-to-end tests over the HTTP surface: real app data wiring, token
//! extraction, multipart parsing and response headers.

mod common;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{test, web, App, Error};
use blog_service::handlers;
use blog_service::middleware::TokenValidator;
use blog_service::models::Identity;
use blog_service::notify::Notifier;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;

const SECRET: &str = "http-test-secret";
const BOUNDARY: &str = "----blog-service-test-boundary";

#[derive(Serialize)]
struct Claims {
    sub: String,
    is_staff: bool,
    is_superuser: bool,
    exp: usize,
}

fn bearer(identity: &Identity) -> (&'static str, String) {
    let token = encode(
        &Header::default(),
        &Claims {
            sub: identity.id.to_string(),
            is_staff: identity.is_staff,
            is_superuser: identity.is_superuser,
            exp: 4_102_444_800, // 2100-01-01
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    ("Authorization", format!("Bearer {}", token))
}

/// The same app data and routing as the server binary.
fn app(
    env: &common::TestEnv,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let notifier: Arc<dyn Notifier> = env.notifier.clone();
    App::new()
        .app_data(web::Data::new(env.pool.clone()))
        .app_data(web::Data::new(env.files.clone()))
        .app_data(web::Data::new(notifier))
        .app_data(web::Data::new(TokenValidator::new(SECRET)))
        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/posts")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::list_posts))
                                .route(web::post().to(handlers::create_post)),
                        )
                        .service(
                            web::resource("/{post_id}")
                                .route(web::get().to(handlers::get_post))
                                .route(web::post().to(handlers::update_post))
                                .route(web::delete().to(handlers::delete_post)),
                        ),
                )
                .route(
                    "/documents/{document_id}/download",
                    web::get().to(handlers::download_document),
                ),
        )
}

fn text_part(name: &str, value: &str) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
        BOUNDARY, name, value
    )
}

fn file_part(name: &str, file_name: &str, bytes: &str) -> String {
    format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n{}\r\n",
        BOUNDARY, name, file_name, bytes
    )
}

fn multipart_headers() -> (&'static str, String) {
    (
        "Content-Type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    )
}

#[tokio::test]
async fn create_and_list_round_trip_over_http() {
    let env = common::TestEnv::new().await;
    let author = common::staff();
    let app = test::init_service(app(&env)).await;

    let body = format!(
        "{}{}{}{}{}--{}--\r\n",
        text_part("title", "Release notes"),
        text_part("content", "What changed this week"),
        text_part("is_public", "true"),
        text_part("document_description", "the changelog"),
        file_part("document", "changelog.txt", "v2 highlights"),
        BOUNDARY
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&author))
        .insert_header(multipart_headers())
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let created: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(created["title"], "Release notes");
    assert_eq!(created["author_id"], author.id.to_string());
    assert_eq!(created["documents"][0]["file_name"], "changelog.txt");
    assert_eq!(created["documents"][0]["description"], "the changelog");

    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let listed: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

#[tokio::test]
async fn non_staff_create_is_forbidden_over_http() {
    let env = common::TestEnv::new().await;
    let app = test::init_service(app(&env)).await;

    let body = format!(
        "{}{}--{}--\r\n",
        text_part("title", "Not allowed"),
        text_part("content", "should never land"),
        BOUNDARY
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&common::regular()))
        .insert_header(multipart_headers())
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(env.count("posts").await, 0);
}

#[tokio::test]
async fn download_quotes_the_suggested_filename() {
    let env = common::TestEnv::new().await;
    let author = common::staff();
    let post = env
        .posts()
        .create(
            &author,
            common::post_input("Minutes", false, vec![]),
            vec![common::upload("meeting notes.txt", b"agenda and actions")],
        )
        .await
        .unwrap();
    let document_id = post.documents[0].id;
    let app = test::init_service(app(&env)).await;

    let uri = format!("/api/v1/documents/{}/download", document_id);

    // Downloads always require a caller.
    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&author))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Disposition").unwrap(),
        "inline; filename=\"meeting notes.txt\""
    );
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"agenda and actions");
}
