//! A small user management API served through the HTTP adapter.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use hapic::prelude::*;
use http::{header, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
#[error("user {0} not found")]
struct UserNotFound(i64);

#[derive(Debug, thiserror::Error)]
#[error("database is down")]
struct DatabaseDown;

#[derive(Default)]
struct Users {
    rows: Mutex<Vec<Value>>,
}

impl Users {
    fn seeded() -> Arc<Self> {
        let users = Self::default();
        users.add("Alice", "alice@example.org");
        users.add("Bob", "bob@example.org");
        Arc::new(users)
    }

    fn add(&self, name: &str, email: &str) -> Value {
        let mut rows = self.rows.lock().unwrap();
        let user = json!({"id": rows.len() + 1, "name": name, "email": email});
        rows.push(user.clone());
        user
    }

    fn get(&self, id: i64) -> Result<Value, UserNotFound> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|user| user["id"] == id)
            .cloned()
            .ok_or(UserNotFound(id))
    }

    fn all(&self) -> Vec<Value> {
        self.rows.lock().unwrap().clone()
    }
}

fn user_schema() -> Arc<Schema> {
    Schema::builder("UserSchema")
        .field("id", Field::integer().required())
        .field("name", Field::string().required())
        .field("email", Field::string().required())
        .build()
}

fn user_path_schema() -> Arc<Schema> {
    Schema::builder("UserPathSchema")
        .field("id", Field::integer().required().minimum(1))
        .build()
}

fn user_create_schema() -> Arc<Schema> {
    Schema::builder("UserCreateSchema")
        .field("name", Field::string().required().min_length(2))
        .field("email", Field::string().required())
        .build()
}

struct Api {
    hapic: Hapic<HttpContext>,
    router: HttpRouter,
}

fn api() -> Api {
    let users = Users::seeded();
    let hapic = Hapic::<HttpContext>::new(ExecutionMode::Cooperative);

    let store = Arc::clone(&users);
    let get_user = hapic
        .controller("get_user")
        .input_path(user_path_schema())
        .output_body(user_schema())
        .handle_exception::<UserNotFound>(StatusCode::NOT_FOUND)
        .with_api_doc(ApiDoc::new().description("Obtain one user").tag("users"))
        .async_handler(move |_request, data| {
            let store = Arc::clone(&store);
            async move {
                let id = data.path["id"].as_i64().unwrap_or_default();
                Ok(Reply::from(store.get(id)?))
            }
        })
        .unwrap();

    let store = Arc::clone(&users);
    let create_user = hapic
        .controller("create_user")
        .input_body(user_create_schema())
        .output_body_with(
            user_schema(),
            OutputOptions::new().default_http_code(StatusCode::CREATED),
        )
        .with_api_doc(ApiDoc::new().tag("users"))
        .async_handler(move |_request, data| {
            let store = Arc::clone(&store);
            async move {
                let name = data.body["name"].as_str().unwrap_or_default();
                let email = data.body["email"].as_str().unwrap_or_default();
                Ok(Reply::from(store.add(name, email)))
            }
        })
        .unwrap();

    let store = Arc::clone(&users);
    let list_users = hapic
        .controller("list_users")
        .output_stream(user_schema())
        .with_api_doc(ApiDoc::new().tag("users"))
        .async_handler(move |_request, _data| {
            let rows = store.all();
            async move { Ok(Reply::stream(stream::iter(rows))) }
        })
        .unwrap();

    let delete_user = hapic
        .controller("delete_user")
        .input_path(user_path_schema())
        .output_body_with(
            user_schema(),
            OutputOptions::new().default_http_code(StatusCode::NO_CONTENT),
        )
        .async_handler(|_request, _data| async { Ok(Reply::from(Value::Null)) })
        .unwrap();

    let avatar = hapic
        .controller("get_avatar")
        .input_path(user_path_schema())
        .output_file(["image/png"])
        .async_handler(|_request, _data| async {
            Ok(Reply::from(
                HapicFile::from_bytes(&b"\x89PNG"[..], "image/png").with_file_name("avatar.png"),
            ))
        })
        .unwrap();

    let upload = hapic
        .controller("upload_avatar")
        .input_path(user_path_schema())
        .input_forms(
            Schema::builder("AvatarFormSchema")
                .field("caption", Field::string().missing(""))
                .build(),
        )
        .input_files(
            Schema::builder("AvatarFileSchema")
                .field("avatar", Field::file().required())
                .build(),
        )
        .async_handler(|_request, data| async move {
            let file = &data.files["avatar"];
            Ok(Reply::from(json!({
                "caption": data.forms["caption"],
                "file_name": file.file_name,
                "size": file.len(),
            })))
        })
        .unwrap();

    let health = hapic
        .controller("health")
        .with_api_doc(ApiDoc::new().disable())
        .async_handler(|_request, _data| async { Err(DatabaseDown.into()) })
        .unwrap();

    let mut router = HttpRouter::new();
    router.route(Method::GET, "/users", &list_users);
    router.route(Method::POST, "/users", &create_user);
    router.route(Method::GET, "/users/:id", &get_user);
    router.route(Method::DELETE, "/users/:id", &delete_user);
    router.route(Method::GET, "/users/:id/avatar", &avatar);
    router.route(Method::PUT, "/users/:id/avatar", &upload);
    router.route(Method::GET, "/health", &health);
    hapic.set_context(router.context()).unwrap();

    Api { hapic, router }
}

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::get(uri).body(Full::new(Bytes::new())).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Full<Bytes>> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn send(api: &Api, request: Request<Full<Bytes>>) -> (StatusCode, Bytes) {
    let response = api.router.dispatch(request).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn send_json(api: &Api, request: Request<Full<Bytes>>) -> (StatusCode, Value) {
    let (status, body) = send(api, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_user() {
    let api = api();
    let (status, body) = send_json(&api, get("/users/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"id": 1, "name": "Alice", "email": "alice@example.org"})
    );
}

#[tokio::test]
async fn test_get_user_invalid_path() {
    let api = api();
    let (status, body) = send_json(&api, get("/users/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error of input data");
    assert_eq!(body["details"]["id"], json!(["Not a valid integer."]));
}

#[tokio::test]
async fn test_get_user_not_found() {
    let api = api();
    let (status, body) = send_json(&api, get("/users/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "user 99 not found");
}

#[tokio::test]
async fn test_create_user() {
    let api = api();
    let request = post_json("/users", &json!({"name": "Carol", "email": "carol@example.org"}));
    let (status, body) = send_json(&api, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 3);

    let request = post_json("/users", &json!({"name": "C"}));
    let (status, body) = send_json(&api, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        json!({
            "name": ["Shorter than minimum length 2."],
            "email": ["Missing data for required field."]
        })
    );
}

#[tokio::test]
async fn test_create_user_not_json() {
    let api = api();
    let request = Request::post("/users")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from_static(b"Carol")))
        .unwrap();
    let (status, body) = send_json(&api, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], json!({"_schema": ["Invalid input type."]}));
}

#[tokio::test]
async fn test_list_users_streams_lines() {
    let api = api();
    let response = api.router.dispatch(get("/users")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-ndjson");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let lines: Vec<&str> = std::str::from_utf8(&body).unwrap().lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        r#"{"id":1,"name":"Alice","email":"alice@example.org"}"#
    );
}

#[tokio::test]
async fn test_delete_user_no_content() {
    let api = api();
    let request = Request::delete("/users/1").body(Full::new(Bytes::new())).unwrap();
    let (status, body) = send(&api, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_file_output() {
    let api = api();
    let response = api.router.dispatch(get("/users/1/avatar")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"\x89PNG");
}

#[tokio::test]
async fn test_multipart_upload() {
    let api = api();
    let boundary = "avatar-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
         me at the beach\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         PNG!\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::put("/users/1/avatar")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap();

    let (status, body) = send_json(&api, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"caption": "me at the beach", "file_name": "me.png", "size": 4})
    );
}

#[tokio::test]
async fn test_multipart_upload_missing_file() {
    let api = api();
    let request = Request::put("/users/1/avatar")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::from_static(b"caption=hello")))
        .unwrap();

    let (status, body) = send_json(&api, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["avatar"],
        json!(["Missing data for required field."])
    );
}

#[tokio::test]
async fn test_routing_errors() {
    let api = api();
    let (status, _) = send(&api, get("/groups")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::patch("/users/1").body(Full::new(Bytes::new())).unwrap();
    let (status, _) = send(&api, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unmapped_handler_error() {
    let api = api();
    let (status, body) = send_json(&api, get("/health")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal Server Error");
}

#[test]
fn test_generate_doc() {
    let api = api();
    let doc = api
        .hapic
        .generate_doc("User management", "Users and their avatars")
        .unwrap();
    assert_eq!(doc.swagger, "2.0");
    assert_eq!(doc.info.title, "User management");

    let paths: Vec<&str> = doc.paths.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["/users/{id}", "/users", "/users/{id}/avatar"]);

    let users = &doc.paths["/users"];
    assert!(users.get.is_some());
    assert!(users.post.is_some());

    let get_user = doc.paths["/users/{id}"].get.as_ref().unwrap();
    assert_eq!(get_user.description.as_deref(), Some("Obtain one user"));
    assert_eq!(get_user.tags, vec!["users"]);
    assert!(get_user.responses.contains_key("404"));

    let delete_user = doc.paths["/users/{id}"].delete.as_ref().unwrap();
    assert!(delete_user.responses["204"].schema.is_none());

    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(
        json["paths"]["/users"]["get"]["responses"]["200"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/definitions/UserSchema"}})
    );
    assert_eq!(
        json["paths"]["/users/{id}/avatar"]["get"]["responses"]["200"]["schema"],
        json!({"type": "file"})
    );
    assert!(json["definitions"].get("UserCreateSchema").is_some());

    let upload = doc.paths["/users/{id}/avatar"].put.as_ref().unwrap();
    assert_eq!(upload.consumes, vec!["multipart/form-data"]);
    let avatar = upload.parameters.iter().find(|p| p.name == "avatar").unwrap();
    assert_eq!(avatar.param_type.as_deref(), Some("file"));
    assert!(avatar.required);
}
