//! Accounts, tokens and book ratings.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use bookstore_api::{
    entities::UserRole,
    errors::ServiceError,
    services::{orders::CreateOrderInput, ratings::NewRating},
};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn register_then_login_and_edit_profile() {
    let app = TestApp::new().await;
    let registration = json!({
        "username": "bookworm",
        "email": "Bookworm@Example.com",
        "password": "correct horse battery",
        "fullName": "Book Worm",
        "address": "7 Shelf Row",
    });

    let response = app
        .request(Method::POST, "/api/v1/auth/register", Some(registration.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["data"]["user"]["email"], "bookworm@example.com");
    assert_eq!(body["data"]["user"]["role"], "USER");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert_eq!(body["data"]["token"]["token_type"], "Bearer");

    let response = app
        .request(Method::POST, "/api/v1/auth/register", Some(registration), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["message"], "User already exists");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "bookworm@example.com", "password": "wrong password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid credentials");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "bookworm@example.com", "password": "correct horse battery" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["data"]["token"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::PUT,
            "/api/v1/auth/profile",
            Some(json!({ "fullName": "B. Worm", "phone": "555-0100" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/auth/profile", None, Some(&token))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["fullName"], "B. Worm");
    assert_eq!(body["data"]["phone"], "555-0100");
    assert_eq!(body["data"]["address"], "7 Shelf Row");

    // Registration creates the cart along with the account.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "ab",
                "email": "not-an-email",
                "password": "short",
                "fullName": "X",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_forged_tokens() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Authentication required");

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some("not.a.jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn one_rating_per_reader_and_book() {
    let app = TestApp::new().await;
    let reader = app.seed_user(UserRole::User).await;
    let book = app.seed_book("Frankenstein", dec!(9), 2).await;
    let ratings = &app.services().ratings;

    let first = ratings
        .create_rating(
            reader.model.id,
            NewRating {
                book_id: book.id,
                stars: 3,
                content: Some("Uneven".into()),
                replace_if_exists: false,
            },
        )
        .await
        .unwrap();

    let response = app
        .request_as(
            &reader,
            Method::POST,
            "/api/v1/ratings",
            Some(json!({ "bookId": book.id, "stars": 5 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["message"], "You have reviewed this book before");

    let replaced = ratings
        .create_rating(
            reader.model.id,
            NewRating {
                book_id: book.id,
                stars: 5,
                content: None,
                replace_if_exists: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced.id, first.id);
    assert_eq!(replaced.stars, 5);

    let err = ratings
        .create_rating(
            reader.model.id,
            NewRating {
                book_id: book.id,
                stars: 6,
                content: None,
                replace_if_exists: true,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/ratings/book/{}/average", book.id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["average"], 5.0);
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn readers_edit_only_their_ratings_and_admins_moderate() {
    let app = TestApp::new().await;
    let author = app.seed_user(UserRole::User).await;
    let other = app.seed_user(UserRole::User).await;
    let admin = app.seed_user(UserRole::Admin).await;
    let book = app.seed_book("Dracula", dec!(8), 2).await;

    let response = app
        .request_as(
            &author,
            Method::POST,
            "/api/v1/ratings",
            Some(json!({ "bookId": book.id, "stars": 4, "content": "Spooky" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let rating_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request_as(
            &other,
            Method::PATCH,
            &format!("/api/v1/ratings/{rating_id}"),
            Some(json!({ "stars": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request_as(
            &author,
            Method::PATCH,
            &format!("/api/v1/ratings/{rating_id}"),
            Some(json!({ "stars": 2 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["stars"], 2);
    assert_eq!(body["data"]["content"], "Spooky");

    let response = app
        .request_as(&author, Method::GET, "/api/v1/ratings/my-ratings", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .request_as(&author, Method::GET, "/api/v1/ratings/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as(&admin, Method::GET, "/api/v1/ratings/all", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_as(
            &admin,
            Method::DELETE,
            &format!("/api/v1/ratings/admin/{rating_id}"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, &format!("/api/v1/ratings/book/{}", book.id), None, None)
        .await;
    let body = response_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn password_change_requires_the_current_password() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "username": "rotator",
                "email": "rotator@example.com",
                "password": "first secret",
                "fullName": "Key Rotator",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let token = body["data"]["token"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(
            Method::PUT,
            "/api/v1/auth/change-password",
            Some(json!({ "currentPassword": "guessed wrong", "newPassword": "second secret" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Current password is incorrect");

    let response = app
        .request(
            Method::PUT,
            "/api/v1/auth/change-password",
            Some(json!({ "currentPassword": "first secret", "newPassword": "tiny" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/auth/change-password",
            Some(json!({ "currentPassword": "first secret", "newPassword": "second secret" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Password changed successfully");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "rotator@example.com", "password": "first secret" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "rotator@example.com", "password": "second secret" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admins_manage_accounts_but_keep_order_history() {
    let app = TestApp::new().await;
    let admin = app.seed_user(UserRole::Admin).await;
    let buyer = app.seed_user(UserRole::User).await;
    let browser = app.seed_user(UserRole::User).await;
    let method = app.seed_payment_method("Credit Card", true).await;
    let book = app.seed_book("Middlemarch", dec!(11), 4).await;

    let response = app
        .request_as(&browser, Method::GET, "/api/v1/users", None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as(&admin, Method::GET, "/api/v1/users", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let response = app
        .request_as(
            &admin,
            Method::GET,
            &format!("/api/v1/users/{}", browser.model.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], browser.model.email);
    assert!(body["data"].get("passwordHash").is_none());

    let response = app
        .request_as(
            &admin,
            Method::PATCH,
            &format!("/api/v1/users/{}", browser.model.id),
            Some(json!({ "role": "ADMIN", "fullName": "Promoted Reader" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["role"], "ADMIN");
    assert_eq!(body["data"]["fullName"], "Promoted Reader");

    let response = app
        .request_as(
            &admin,
            Method::PATCH,
            &format!("/api/v1/users/{}", browser.model.id),
            Some(json!({ "email": buyer.model.email })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    app.put_in_cart(buyer.model.id, &book, 1).await;
    app.services()
        .orders
        .create_order(
            buyer.model.id,
            CreateOrderInput {
                shipping_address: "2 Quay Street".into(),
                payment_method_id: method.id,
                cart_item_ids: None,
            },
        )
        .await
        .unwrap();

    let response = app
        .request_as(
            &admin,
            Method::DELETE,
            &format!("/api/v1/users/{}", buyer.model.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Cannot delete user because they have 1 order(s) in history. \
         Consider deactivating the account instead."
    );

    let response = app
        .request_as(
            &admin,
            Method::DELETE,
            &format!("/api/v1/users/{}", admin.model.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as(
            &admin,
            Method::DELETE,
            &format!("/api/v1/users/{}", browser.model.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "User deleted successfully");

    let response = app
        .request_as(
            &admin,
            Method::GET,
            &format!("/api/v1/users/{}", browser.model.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn readers_vote_on_each_others_ratings() {
    let app = TestApp::new().await;
    let author = app.seed_user(UserRole::User).await;
    let voter = app.seed_user(UserRole::User).await;
    let book = app.seed_book("Emma", dec!(7), 2).await;

    let response = app
        .request_as(
            &author,
            Method::GET,
            &format!("/api/v1/ratings/my-rating/{}", book.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "No rating found for this book");
    assert!(body["data"].is_null());

    let rating = app
        .services()
        .ratings
        .create_rating(
            author.model.id,
            NewRating {
                book_id: book.id,
                stars: 4,
                content: Some("Witty".into()),
                replace_if_exists: false,
            },
        )
        .await
        .unwrap();
    let vote_uri = format!("/api/v1/ratings/{}/vote", rating.id);

    let response = app
        .request_as(
            &author,
            Method::GET,
            &format!("/api/v1/ratings/my-rating/{}", book.id),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["message"], "User rating fetched successfully");
    assert_eq!(body["data"]["id"], rating.id.to_string());

    let response = app
        .request_as(&author, Method::POST, &vote_uri, Some(json!({ "voteType": 1 })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "You cannot vote on your own rating");

    let response = app
        .request_as(&voter, Method::POST, &vote_uri, Some(json!({ "voteType": 2 })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request_as(&voter, Method::POST, &vote_uri, Some(json!({ "voteType": 1 })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Vote created successfully");
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(body["data"]["downvotes"], 0);

    // Repeating the same vote withdraws it
    let response = app
        .request_as(&voter, Method::POST, &vote_uri, Some(json!({ "voteType": 1 })))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["message"], "Vote removed successfully");
    assert_eq!(body["data"]["upvotes"], 0);

    app.request_as(&voter, Method::POST, &vote_uri, Some(json!({ "voteType": -1 })))
        .await;
    let response = app
        .request_as(&voter, Method::POST, &vote_uri, Some(json!({ "voteType": 1 })))
        .await;
    let body = response_json(response).await;
    assert_eq!(body["message"], "Vote updated successfully");
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(body["data"]["downvotes"], 0);

    let response = app
        .request_as(&voter, Method::GET, &vote_uri, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["voteType"], 1);
    assert_eq!(body["data"]["upvotes"], 1);

    let response = app
        .request(Method::GET, &format!("/api/v1/ratings/book/{}", book.id), None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["upvotes"], 1);
    assert_eq!(body["data"][0]["downvotes"], 0);

    let response = app
        .request_as(&voter, Method::DELETE, &vote_uri, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request_as(&voter, Method::DELETE, &vote_uri, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Vote not found");

    let response = app
        .request_as(&voter, Method::GET, &vote_uri, None)
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["voteType"].is_null());
    assert_eq!(body["data"]["upvotes"], 0);

    let response = app
        .request_as(
            &voter,
            Method::POST,
            &format!("/api/v1/ratings/{}/vote", uuid::Uuid::new_v4()),
            Some(json!({ "voteType": 1 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
