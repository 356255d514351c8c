//! Endpoint declarations and procedures of the reference service.
//!
//! Each endpoint is declared once by a constructor function below. The
//! server registers procedures on them in [`router`]; clients call
//! `.remote(..)` on the very same values.

use axum::Router;
use serde::{Deserialize, Serialize};
use srpc_core::{
    Endpoint, Method, ProcedureError, ReadEndpoint, RequestContext, StatusCode, Validate,
    WireError, WriteEndpoint,
};

/// Longest note accepted by `POST /notes`, in characters.
pub const MAX_NOTE_CHARS: usize = 280;

// ===== Request / response types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub server: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetRequest {
    pub name: String,
}

impl Validate for GreetRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub greeting: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub text: String,
}

impl Validate for Echo {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
}

impl Validate for Note {}

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("note has {0} characters, at most {MAX_NOTE_CHARS} are accepted")]
    TooLong(usize),
}

impl ProcedureError for NoteError {
    fn wire_error(&self) -> Option<WireError> {
        match self {
            NoteError::TooLong(_) => Some(WireError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                self.to_string(),
            )),
        }
    }
}

// ===== Endpoints =====

pub fn health() -> ReadEndpoint<Health> {
    ReadEndpoint::json(Method::GET, "/health")
}

pub fn greet() -> Endpoint<GreetRequest, Greeting> {
    Endpoint::json(Method::POST, "/greet")
}

pub fn echo() -> Endpoint<Echo, Echo> {
    Endpoint::json(Method::GET, "/echo")
}

pub fn notes() -> WriteEndpoint<Note> {
    WriteEndpoint::json(Method::POST, "/notes")
}

// ===== Procedures =====

async fn health_check(_ctx: RequestContext) -> Result<Health, WireError> {
    Ok(Health {
        status: "ok".to_string(),
        server: "srpc-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn say_hello(_ctx: RequestContext, req: GreetRequest) -> Result<Greeting, WireError> {
    Ok(Greeting {
        greeting: format!("Hello, {}!", req.name),
    })
}

async fn echo_back(_ctx: RequestContext, req: Echo) -> Result<Echo, WireError> {
    Ok(req)
}

async fn take_note(_ctx: RequestContext, note: Note) -> Result<(), NoteError> {
    let chars = note.text.chars().count();
    if chars > MAX_NOTE_CHARS {
        return Err(NoteError::TooLong(chars));
    }
    tracing::debug!(chars, "note accepted");
    Ok(())
}

/// Router with every service endpoint registered.
pub fn router() -> Router {
    let app = Router::new();
    let app = health().register(app, health_check);
    let app = greet().register(app, say_hello);
    let app = echo().register(app, echo_back);
    notes().register(app, take_note)
}
