//! Request/response bodies for the HTTP surface (spec §6).

use prbuddy_core::Message;
use prbuddy_llm::ModelDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct AssistRequest {
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
    pub input: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistResponse {
    pub response: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearRequest {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveDraftRequest {
    pub branch: String,
    pub commit: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadDraftRequest {
    pub branch: String,
    pub commit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadDraftResponse {
    pub status: &'static str,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatResponse {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelListEntry {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<ModelDescriptor> for ModelListEntry {
    fn from(descriptor: ModelDescriptor) -> Self {
        ModelListEntry {
            name: descriptor.name,
            extra: descriptor.extra,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetModelRequest {
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetModelResponse {
    pub status: &'static str,
    pub active_model: String,
}
