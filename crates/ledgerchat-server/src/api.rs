use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use ledgerchat_shared::types::{validate_room_id, Message, SchemaId};
use ledgerchat_store::{ChatRoom, CreateRoom, RoomRegistry};
use ledgerchat_stream::StreamSync;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    /// `None` when the ledger gateway could not be initialised.
    pub streams: Option<Arc<StreamSync>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    fn streams(&self) -> Result<&StreamSync, ServerError> {
        self.streams
            .as_deref()
            .ok_or(ServerError::GatewayUnavailable)
    }

    /// An explicit schema id from the request, or the configured default.
    fn schema_id(&self, requested: Option<&str>) -> Result<SchemaId, ServerError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => SchemaId::parse(raw).map_err(|e| ServerError::BadRequest(e.to_string())),
            None => Ok(self.config.chat_schema_id),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/create-room", post(create_room))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/:room_name", get(get_room))
        .route("/api/streams/register-schema", post(register_schema))
        .route("/api/streams/publish-message", post(publish_message))
        .route("/api/streams/messages/:room_id", get(room_messages))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    gateway_initialized: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        gateway_initialized: state.streams.is_some(),
    })
}

// ─── Room registry ───

async fn create_room(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoom>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatRoom>), ServerError> {
    let req = json_body(payload)?;
    let room = state.rooms.create_or_update(req).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> Result<Json<ChatRoom>, ServerError> {
    Ok(Json(state.rooms.get(&room_name).await?))
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<ChatRoom>> {
    Json(state.rooms.list().await)
}

// ─── Streams ───

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterSchemaRequest {
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    schema_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterSchemaResponse {
    tx_hash: Option<String>,
    already_registered: bool,
}

async fn register_schema(
    State(state): State<AppState>,
    payload: Result<Json<RegisterSchemaRequest>, JsonRejection>,
) -> Result<Json<RegisterSchemaResponse>, ServerError> {
    let streams = state.streams()?;
    let req = json_body(payload)?;
    if let Some(room_id) = req.room_id.as_deref() {
        validate_room_id(room_id).map_err(|e| ServerError::BadRequest(e.to_string()))?;
    }
    let schema_id = state.schema_id(req.schema_id.as_deref())?;

    let definition = streams.codec().schema().definition();
    let tx = streams.register_schema(&schema_id, &definition).await?;

    info!(
        room = req.room_name.as_deref().unwrap_or_default(),
        room_id = req.room_id.as_deref().unwrap_or_default(),
        schema = %schema_id,
        already_registered = tx.is_none(),
        "Schema registration requested"
    );
    Ok(Json(RegisterSchemaResponse {
        tx_hash: tx.map(|tx| tx.to_hex()),
        already_registered: tx.is_none(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    sender_address: String,
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    schema_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    tx_hash: String,
    timestamp: u64,
}

async fn publish_message(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> Result<Json<PublishResponse>, ServerError> {
    let streams = state.streams()?;
    let req = json_body(payload)?;
    let schema_id = state.schema_id(req.schema_id.as_deref())?;

    let published = streams
        .publish(
            &req.text,
            &req.sender_name,
            &req.sender_address,
            &req.room_id,
            &schema_id.to_hex(),
        )
        .await?;

    Ok(Json(PublishResponse {
        tx_hash: published.tx_hash.to_hex(),
        timestamp: published.timestamp,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    schema_id: Option<String>,
}

/// A message as served over HTTP. There is no `sender` field: the server
/// has no viewer, so clients attribute by `senderAddress` themselves.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomMessage {
    id: String,
    text: String,
    timestamp: u64,
    sender_name: String,
    sender_address: String,
    room_id: String,
}

impl From<Message> for RoomMessage {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            text: msg.text,
            timestamp: msg.timestamp,
            sender_name: msg.sender_name,
            sender_address: msg.sender_address,
            room_id: msg.room_id,
        }
    }
}

/// Every message of a room, oldest first.
async fn room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<RoomMessage>>, ServerError> {
    let streams = state.streams()?;
    let schema_id = state.schema_id(query.schema_id.as_deref())?;
    let messages = streams.fetch_messages(&schema_id, &room_id).await?;
    Ok(Json(messages.into_iter().map(RoomMessage::from).collect()))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use ledgerchat_shared::codec::ChatCodec;
    use ledgerchat_shared::identity::PublisherIdentity;
    use ledgerchat_shared::types::{Address, Sender};
    use ledgerchat_store::RoomStore;
    use ledgerchat_stream::{LocalLedger, StreamSync, Viewer};

    fn schema_hex() -> String {
        format!("0x{}", "ab".repeat(32))
    }

    async fn app_state(with_gateway: bool) -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RoomStore::open(dir.path().join("rooms.json")).await.unwrap();
        let config = ServerConfig {
            chat_schema_id: SchemaId([0xab; 32]),
            ..ServerConfig::default()
        };
        let streams = with_gateway.then(|| {
            let gateway = LocalLedger::new().gateway(Some(PublisherIdentity::generate()));
            Arc::new(StreamSync::for_gateway(
                Arc::new(gateway),
                Arc::new(ChatCodec::standard()),
                config.sync_options(),
            ))
        });
        let state = AppState {
            rooms: Arc::new(RoomRegistry::new(store)),
            streams,
            config: Arc::new(config),
        };
        (state, dir)
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_gateway() {
        let (state, _dir) = app_state(false).await;
        let (status, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["gatewayInitialized"], false);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

        let (state, _dir) = app_state(true).await;
        let (_, body) = send(&state, "GET", "/health", None).await;
        assert_eq!(body["gatewayInitialized"], true);
    }

    #[tokio::test]
    async fn test_room_lifecycle() {
        let (state, _dir) = app_state(false).await;

        let (status, room) = send(
            &state,
            "POST",
            "/api/create-room",
            Some(json!({ "roomName": "general", "schemaId": schema_hex(), "metadata": { "topic": "chat" } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(room["roomName"], "general");
        assert_eq!(room["metadata"]["topic"], "chat");
        assert!(room["createdAt"].is_string());

        let (status, rooms) = send(&state, "GET", "/api/rooms", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rooms.as_array().unwrap().len(), 1);

        let (status, fetched) = send(&state, "GET", "/api/rooms/general", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["schemaId"], schema_hex());

        let (status, err) = send(&state, "GET", "/api/rooms/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["error"], "Room 'missing' not found");
    }

    #[tokio::test]
    async fn test_create_room_validation() {
        let (state, _dir) = app_state(false).await;

        let (status, err) = send(
            &state,
            "POST",
            "/api/create-room",
            Some(json!({ "roomName": "general", "schemaId": "0x1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["error"].as_str().unwrap().contains("schemaId"));

        let (status, err) = send(
            &state,
            "POST",
            "/api/create-room",
            Some(json!({ "roomName": "  ", "schemaId": schema_hex() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["error"].is_string());

        let (status, _) = send(&state, "POST", "/api/create-room", Some(json!("nope"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_streams_unavailable_without_gateway() {
        let (state, _dir) = app_state(false).await;

        let (status, err) = send(
            &state,
            "POST",
            "/api/streams/publish-message",
            Some(json!({
                "text": "hi",
                "senderName": "alice",
                "senderAddress": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                "roomId": "general",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err["error"], "Ledger gateway not initialized");

        let (status, _) = send(&state, "GET", "/api/streams/messages/general", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = send(
            &state,
            "POST",
            "/api/streams/register-schema",
            Some(json!({ "roomName": "general", "roomId": "general" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_input() {
        let (state, _dir) = app_state(true).await;
        let (status, err) = send(
            &state,
            "POST",
            "/api/streams/publish-message",
            Some(json!({
                "text": "",
                "senderName": "alice",
                "senderAddress": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                "roomId": "general",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err["error"].is_string());

        let (status, _) = send(
            &state,
            "GET",
            "/api/streams/messages/general?schemaId=0xzz",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_publish_without_prior_registration() {
        let (state, _dir) = app_state(true).await;

        let (status, published) = send(
            &state,
            "POST",
            "/api/streams/publish-message",
            Some(json!({
                "text": "first",
                "senderName": "bob",
                "senderAddress": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                "roomId": "lobby",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(published["txHash"].is_string());

        let (status, messages) = send(&state, "GET", "/api/streams/messages/lobby", None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["text"], "first");

        // The schema is now on the ledger, so an explicit registration is a no-op.
        let (status, register) = send(
            &state,
            "POST",
            "/api/streams/register-schema",
            Some(json!({ "roomName": "lobby", "roomId": "lobby" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(register["alreadyRegistered"], true);
    }

    #[tokio::test]
    async fn test_end_to_end_chat() {
        let (state, _dir) = app_state(true).await;

        let (status, _) = send(
            &state,
            "POST",
            "/api/create-room",
            Some(json!({ "roomName": "general", "schemaId": schema_hex() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, rooms) = send(&state, "GET", "/api/rooms", None).await;
        assert_eq!(rooms.as_array().unwrap().len(), 1);

        let register = json!({ "roomName": "general", "roomId": "general", "schemaId": schema_hex() });
        let (status, first) = send(
            &state,
            "POST",
            "/api/streams/register-schema",
            Some(register.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["alreadyRegistered"], false);
        assert!(first["txHash"].is_string());
        let (_, second) = send(&state, "POST", "/api/streams/register-schema", Some(register)).await;
        assert_eq!(second["alreadyRegistered"], true);
        assert!(second["txHash"].is_null());

        let (status, published) = send(
            &state,
            "POST",
            "/api/streams/publish-message",
            Some(json!({
                "text": "hi",
                "senderName": "alice",
                "senderAddress": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
                "roomId": "general",
                "schemaId": schema_hex(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(published["txHash"].as_str().unwrap().starts_with("0x"));
        assert!(published["timestamp"].as_u64().unwrap() > 0);

        // Without a schemaId the configured one is used.
        let (status, messages) = send(&state, "GET", "/api/streams/messages/general", None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["text"], "hi");
        assert!(messages[0].get("sender").is_none());
        assert_eq!(
            messages[0]["senderAddress"].as_str().unwrap().to_lowercase(),
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        );
        assert_eq!(messages[0]["roomId"], "general");

        // A subscriber keyed on the same address sees its own message.
        let streams = state.streams.clone().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        streams
            .subscribe(
                move |batch| {
                    let _ = tx.send(batch);
                },
                SchemaId([0xab; 32]),
                "general",
                Viewer::Address(Address::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()),
                None,
            )
            .unwrap();
        assert!(streams.poll_now().await);
        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text, "hi");
        assert_eq!(batch[0].sender, Sender::Me);
        streams.unsubscribe();
    }
}
