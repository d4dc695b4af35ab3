//! LSP server main loop with request/notification dispatch.
//!
//! Uses `lsp-server` (synchronous, crossbeam-based) for the transport.
//! No async runtime needed.

use std::path::PathBuf;

use lsp_server::{Connection, Message, Notification, Response};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument,
    Notification as _, PublishDiagnostics,
};
use lsp_types::request::SemanticTokensFullRequest;
use lsp_types::{
    PublishDiagnosticsParams, SaveOptions, SemanticTokens, SemanticTokensFullOptions,
    SemanticTokensLegend, SemanticTokensOptions, SemanticTokensResult, ServerCapabilities,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, Uri,
};
use tracing::{debug, info};

use crate::diagnostics;
use crate::document::DocumentState;
use crate::semantic_tokens;

/// Run the LSP server over stdio until shutdown.
pub fn run(max_errors: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (connection, io_threads) = Connection::stdio();

    // ── Initialize handshake ──────────────────────────────────────────
    let server_capabilities = build_capabilities();
    let init_json = serde_json::to_value(&server_capabilities)?;
    connection.initialize(init_json)?;
    info!("redmatch language server initialised");

    // ── Main loop ─────────────────────────────────────────────────────
    let mut doc_state = DocumentState::new();

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    break;
                }
                handle_request(&connection, &doc_state, req)?;
            }
            Message::Notification(not) => {
                handle_notification(&connection, &mut doc_state, max_errors, not)?;
            }
            Message::Response(_) => {
                // Ignore responses (we don't send requests to the client)
            }
        }
    }

    io_threads.join()?;
    info!("redmatch language server stopped");
    Ok(())
}

pub fn build_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(true),
                })),
                ..Default::default()
            },
        )),
        semantic_tokens_provider: Some(
            lsp_types::SemanticTokensServerCapabilities::SemanticTokensOptions(
                SemanticTokensOptions {
                    full: Some(SemanticTokensFullOptions::Delta { delta: Some(false) }),
                    legend: SemanticTokensLegend {
                        token_types: semantic_tokens::TOKEN_TYPES.to_vec(),
                        token_modifiers: semantic_tokens::TOKEN_MODIFIERS.to_vec(),
                    },
                    ..Default::default()
                },
            ),
        ),
        ..Default::default()
    }
}

fn handle_request(
    connection: &Connection,
    doc_state: &DocumentState,
    req: lsp_server::Request,
) -> Result<(), Box<dyn std::error::Error>> {
    use lsp_types::request::Request as _;

    if req.method == SemanticTokensFullRequest::METHOD {
        let params: lsp_types::SemanticTokensParams = serde_json::from_value(req.params.clone())?;
        let content = get_document_content(doc_state, &params.text_document.uri);
        let data = semantic_tokens::compute_semantic_tokens(&content);
        debug!(uri = %params.text_document.uri.as_str(), tokens = data.len(), "semantic tokens");
        let result = SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        });
        let resp = Response::new_ok(req.id, serde_json::to_value(result)?);
        connection.sender.send(Message::Response(resp))?;
    } else {
        // Unknown request -- method not found
        let resp = Response::new_err(
            req.id,
            lsp_server::ErrorCode::MethodNotFound as i32,
            format!("method not found: {}", req.method),
        );
        connection.sender.send(Message::Response(resp))?;
    }
    Ok(())
}

/// Get document content either from open documents or from disk.
fn get_document_content(doc_state: &DocumentState, uri: &Uri) -> String {
    if let Some(doc) = doc_state.get(uri.as_str()) {
        doc.content.clone()
    } else {
        let path = uri_to_path(uri);
        std::fs::read_to_string(&path).unwrap_or_default()
    }
}

fn handle_notification(
    connection: &Connection,
    doc_state: &mut DocumentState,
    max_errors: usize,
    not: Notification,
) -> Result<(), Box<dyn std::error::Error>> {
    match not.method.as_str() {
        m if m == DidOpenTextDocument::METHOD => {
            let params: lsp_types::DidOpenTextDocumentParams = serde_json::from_value(not.params)?;
            let uri = params.text_document.uri;
            debug!(uri = %uri.as_str(), "did_open");
            let diags = diagnostics::compute_diagnostics(&params.text_document.text, max_errors);
            doc_state.open(
                uri.as_str(),
                params.text_document.version,
                params.text_document.text,
            );
            publish_diagnostics(connection, uri, diags)?;
        }
        m if m == DidChangeTextDocument::METHOD => {
            let params: lsp_types::DidChangeTextDocumentParams =
                serde_json::from_value(not.params)?;
            let uri = params.text_document.uri;
            debug!(uri = %uri.as_str(), version = params.text_document.version, "did_change");
            // FULL sync: last content change has the entire document
            if let Some(change) = params.content_changes.into_iter().last() {
                doc_state.change(uri.as_str(), params.text_document.version, change.text);
            }
            let content = get_document_content(doc_state, &uri);
            let diags = diagnostics::compute_diagnostics(&content, max_errors);
            publish_diagnostics(connection, uri, diags)?;
        }
        m if m == DidSaveTextDocument::METHOD => {
            let params: lsp_types::DidSaveTextDocumentParams = serde_json::from_value(not.params)?;
            let uri = params.text_document.uri;
            debug!(uri = %uri.as_str(), "did_save");
            if let Some(text) = params.text {
                let version = doc_state.get(uri.as_str()).map_or(0, |d| d.version);
                doc_state.change(uri.as_str(), version, text);
            }
            let content = get_document_content(doc_state, &uri);
            let diags = diagnostics::compute_diagnostics(&content, max_errors);
            publish_diagnostics(connection, uri, diags)?;
        }
        m if m == DidCloseTextDocument::METHOD => {
            let params: lsp_types::DidCloseTextDocumentParams = serde_json::from_value(not.params)?;
            debug!(uri = %params.text_document.uri.as_str(), "did_close");
            doc_state.close(params.text_document.uri.as_str());
            // Clear diagnostics for closed file
            publish_diagnostics(connection, params.text_document.uri, Vec::new())?;
        }
        _ => {
            // Unknown notification -- ignore
        }
    }
    Ok(())
}

/// Send `textDocument/publishDiagnostics` notification to the client.
fn publish_diagnostics(
    connection: &Connection,
    uri: Uri,
    diagnostics: Vec<lsp_types::Diagnostic>,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = PublishDiagnosticsParams {
        uri,
        diagnostics,
        version: None,
    };
    let not = Notification::new(PublishDiagnostics::METHOD.to_string(), params);
    connection.sender.send(Message::Notification(not))?;
    Ok(())
}

/// Convert a file:// URI to a file system path.
fn uri_to_path(uri: &Uri) -> PathBuf {
    let s = uri.as_str();
    if let Some(path) = s.strip_prefix("file://") {
        let decoded = percent_decode(path);
        // On Unix: file:///foo/bar -> /foo/bar
        // On Windows: file:///C:/foo -> C:/foo (strip leading /)
        #[cfg(windows)]
        {
            let decoded = decoded.strip_prefix('/').unwrap_or(&decoded);
            PathBuf::from(decoded)
        }
        #[cfg(not(windows))]
        {
            PathBuf::from(decoded)
        }
    } else {
        PathBuf::from(s)
    }
}

/// Decode percent-encoded characters in a URI path (e.g. `%20` → ` `).
fn percent_decode(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    let mut iter = input.bytes();
    while let Some(b) = iter.next() {
        if b != b'%' {
            bytes.push(b);
            continue;
        }
        let hi = iter.next();
        let lo = iter.next();
        match (hi.and_then(hex_val), lo.and_then(hex_val)) {
            (Some(h), Some(l)) => bytes.push(h << 4 | l),
            _ => {
                // Malformed percent encoding -- pass through
                bytes.push(b'%');
                bytes.extend(hi);
                bytes.extend(lo);
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
