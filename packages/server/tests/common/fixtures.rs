//! Test fixtures: signed-in users and upload bodies.

use axum::{
    body::Body,
    http::{header, Method, Request},
};
use legalbot_core::common::UserId;
use legalbot_core::domains::auth::Role;
use legalbot_core::kernel::{InMemoryStore, MockAuthService};

use super::request;

pub const MULTIPART_BOUNDARY: &str = "legalbot-test-boundary";

/// A user id plus a bearer token the mock auth service accepts
pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

impl TestUser {
    pub fn new(name: &str) -> Self {
        Self {
            id: UserId::new(),
            token: format!("token-{}", name),
        }
    }

    pub fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

/// Mock auth service that accepts the token of every given user
pub fn auth_for(users: &[&TestUser]) -> MockAuthService {
    users
        .iter()
        .fold(MockAuthService::new(), |auth, user| auth.with_token(&user.token, user.id))
}

/// Store with a profile of `role` for `user`
pub fn store_with_role(user: &TestUser, role: Role) -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_profile(user.id, role);
    store
}

/// One multipart field
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

/// `POST /api/laws/upload-word` request carrying `parts`
pub fn upload_request(parts: &[Part<'_>], token: Option<&str>) -> Request<Body> {
    request(Method::POST, "/api/laws/upload-word", token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}
