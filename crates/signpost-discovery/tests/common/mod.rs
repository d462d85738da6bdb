// crates/signpost-discovery/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for signpost-discovery tests.
// Purpose: Provide signing, key-document, and local-server builders.
// Dependencies: base64, ed25519-dalek, serde_json, signpost-core, tiny_http
// ============================================================================

//! ## Overview
//! Provides deterministic Ed25519 test keys, compact-token signing, DID and
//! key-set document builders, and a canned-route HTTP server for exercising
//! the discovery pipeline end to end.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted; not every helper is used by every test binary."
)]

use std::collections::HashMap;
use std::thread;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use serde_json::Value;
use serde_json::json;
use signpost_core::HashAlgorithm;
use signpost_core::hashing::canonical_json_bytes;
use signpost_core::hashing::hash_bytes;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Deterministic signing key used by most tests.
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// A second, unrelated signing key for wrong-key scenarios.
pub fn other_signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

/// Base64url form of a key's public bytes, as published in JWKs.
pub fn public_jwk_x(key: &SigningKey) -> String {
    Base64Url.encode(key.verifying_key().to_bytes())
}

// ============================================================================
// SECTION: Token Signing
// ============================================================================

/// Signs a compact verification token over catalog bytes.
pub fn sign_catalog_token(
    key: &SigningKey,
    kid: &str,
    issuer: &str,
    iat: i64,
    exp: i64,
    catalog_bytes: &[u8],
) -> String {
    let value: Value = serde_json::from_slice(catalog_bytes).unwrap();
    let canonical = canonical_json_bytes(&value).unwrap();
    let digest = hash_bytes(HashAlgorithm::Sha256, &canonical);
    let header = json!({"alg": "EdDSA", "typ": "JWT", "kid": kid});
    let claims = json!({
        "iss": issuer,
        "iat": iat,
        "exp": exp,
        "catalog_hash": digest.to_string(),
    });
    let signing_input = format!(
        "{}.{}",
        Base64Url.encode(serde_json::to_vec(&header).unwrap()),
        Base64Url.encode(serde_json::to_vec(&claims).unwrap()),
    );
    let signature = key.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", Base64Url.encode(signature.to_bytes()))
}

// ============================================================================
// SECTION: Key Documents
// ============================================================================

/// Builds a DID document publishing one key under the given id fragment.
pub fn did_document(issuer: &str, kid: &str, key: &SigningKey) -> Value {
    json!({
        "id": issuer,
        "verificationMethod": [{
            "id": format!("{issuer}#{kid}"),
            "type": "JsonWebKey2020",
            "controller": issuer,
            "publicKeyJwk": {
                "kty": "OKP",
                "crv": "Ed25519",
                "x": public_jwk_x(key)
            }
        }]
    })
}

/// Builds a flat key-set document publishing one key under the given kid.
pub fn key_set_document(kid: &str, key: &SigningKey) -> Value {
    json!({
        "keys": [{
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": kid,
            "x": public_jwk_x(key)
        }]
    })
}

// ============================================================================
// SECTION: Canned-Route Server
// ============================================================================

/// One canned response for a route.
pub enum Route {
    /// Static body with status and extra headers.
    Static {
        /// HTTP status code.
        status: u16,
        /// Response body bytes.
        body: Vec<u8>,
        /// Extra response headers.
        headers: Vec<(String, String)>,
    },
    /// JSON-RPC responder echoing the request id around a fixed result.
    Rpc {
        /// Result payload returned for every request.
        result: Value,
    },
    /// JSON-RPC error responder echoing the request id.
    RpcError {
        /// Error code returned verbatim.
        code: i64,
        /// Error message.
        message: String,
    },
}

/// JSON route helper.
pub fn json_route(value: &Value) -> Route {
    Route::Static {
        status: 200,
        body: serde_json::to_vec(value).unwrap(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
    }
}

/// JSON route helper with extra headers.
pub fn json_route_with_headers(value: &Value, headers: Vec<(String, String)>) -> Route {
    let mut all = vec![("Content-Type".to_string(), "application/json".to_string())];
    all.extend(headers);
    Route::Static {
        status: 200,
        body: serde_json::to_vec(value).unwrap(),
        headers: all,
    }
}

/// Raw-bytes route helper.
pub fn bytes_route(body: Vec<u8>) -> Route {
    Route::Static {
        status: 200,
        body,
        headers: Vec::new(),
    }
}

/// Binds a local server and returns its base URL before routes are built.
pub fn bind_server() -> (Server, String) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    (server, base)
}

/// Serves canned routes until the process exits. Unknown paths get 404.
pub fn serve_routes(server: Server, routes: HashMap<String, Route>) {
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let path = request.url().to_string();
            match routes.get(&path) {
                Some(Route::Static {
                    status,
                    body,
                    headers,
                }) => {
                    let mut response =
                        Response::from_data(body.clone()).with_status_code(*status);
                    for (name, value) in headers {
                        let header =
                            Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap();
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                Some(Route::Rpc {
                    result,
                }) => {
                    let envelope = read_envelope(&mut request);
                    let reply = json!({
                        "jsonrpc": "2.0",
                        "id": envelope["id"],
                        "result": result,
                    });
                    let _ = request.respond(json_response(&reply));
                }
                Some(Route::RpcError {
                    code,
                    message,
                }) => {
                    let envelope = read_envelope(&mut request);
                    let reply = json!({
                        "jsonrpc": "2.0",
                        "id": envelope["id"],
                        "error": {"code": code, "message": message},
                    });
                    let _ = request.respond(json_response(&reply));
                }
                None => {
                    let _ = request.respond(Response::from_string("not found").with_status_code(404));
                }
            }
        }
    });
}

/// Reads and parses a request body as JSON.
fn read_envelope(request: &mut tiny_http::Request) -> Value {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    serde_json::from_str(&body).unwrap_or(Value::Null)
}

/// Builds a JSON response with the right content type.
fn json_response(value: &Value) -> Response<std::io::Cursor<Vec<u8>>> {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
    Response::from_data(serde_json::to_vec(value).unwrap()).with_header(header)
}

// ============================================================================
// SECTION: Catalog Builders
// ============================================================================

/// Builds a catalog document with the given tool records.
pub fn catalog_json(tools: Vec<Value>) -> Value {
    json!({
        "version": "1.0",
        "metadata": {"title": "Test Catalog", "generator": "signpost-tests"},
        "tools": tools
    })
}

/// Builds a tool record pointing at the given server base URL.
pub fn tool_json(name: &str, base_url: &str, capabilities: Vec<&str>) -> Value {
    json!({
        "name": name,
        "description": format!("Test tool {name}"),
        "spec_url": format!("{base_url}/specs/{name}.json"),
        "x-mcp-tool": {
            "server_url": base_url,
            "capabilities": capabilities
        }
    })
}
